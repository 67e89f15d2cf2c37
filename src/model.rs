use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Calendar day — all availability logic is day-granular.
pub type Day = NaiveDate;

/// Commission rate applied when a property has none configured.
pub const DEFAULT_COMMISSION_RATE: f64 = 10.0;

/// A check-in/check-out pair. `check_out` is strictly after `check_in`.
///
/// Two boundary semantics exist and are kept deliberately separate:
/// `occupancy_days`/`overlaps` treat the stay as half-open
/// `[check_in, check_out)` and drive conflict detection, while
/// `blocked_days` includes the check-out day and drives what a manual
/// date picker greys out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: Day,
    pub check_out: Day,
}

impl Stay {
    pub fn new(check_in: Day, check_out: Day) -> Self {
        debug_assert!(check_in < check_out, "Stay check_in must be before check_out");
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }

    /// Occupancy overlap: half-open on both sides, so back-to-back
    /// turnover (one stay ending the day another begins) never overlaps.
    pub fn overlaps(&self, other: &Stay) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// Days occupied for conflict purposes: `[check_in, check_out)`.
    pub fn occupancy_days(&self) -> impl Iterator<Item = Day> {
        let end = self.check_out;
        self.check_in.iter_days().take_while(move |d| *d < end)
    }

    /// Days a date picker greys out: check-in through check-out inclusive.
    pub fn blocked_days(&self) -> impl Iterator<Item = Day> {
        let end = self.check_out;
        self.check_in.iter_days().take_while(move |d| *d <= end)
    }

    pub fn contains_day(&self, day: Day) -> bool {
        self.check_in <= day && day < self.check_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Active,
    Maintenance,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanerKind {
    Individual,
    Company,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
    pub location: Option<String>,
    pub status: PropertyStatus,
    /// Management commission as a percentage of gross reservation income.
    pub commission_percentage: Option<f64>,
}

impl Property {
    /// Split a gross amount into (commission, owner payout).
    pub fn commission_split(&self, amount: f64) -> (f64, f64) {
        let rate = self.commission_percentage.unwrap_or(DEFAULT_COMMISSION_RATE);
        let commission = amount * rate / 100.0;
        (commission, amount - commission)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub property_id: Ulid,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub check_in: Day,
    pub check_out: Day,
    /// Derived from the stay at creation time.
    pub nights: u32,
    pub total_amount: Option<f64>,
    pub status: ReservationStatus,
    /// Free-text platform label ("airbnb", "booking", "manual", ...).
    pub source: Option<String>,
    /// UID of the originating feed event, when imported. Dedup key.
    pub external_ref: Option<String>,
    pub notes: Option<String>,
}

impl Reservation {
    pub fn stay(&self) -> Stay {
        Stay::new(self.check_in, self.check_out)
    }

    /// Confirmed and completed stays both occupy the calendar.
    pub fn occupies_calendar(&self) -> bool {
        matches!(
            self.status,
            ReservationStatus::Confirmed | ReservationStatus::Completed
        )
    }
}

/// Guest and billing fields for reservation creation; id, nights and
/// status are derived by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewReservation {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub total_amount: Option<f64>,
    pub source: Option<String>,
    pub external_ref: Option<String>,
    pub notes: Option<String>,
}

/// Cleaning window within the checkout day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for TimeWindow {
    /// The 11:00–16:00 window used when a task has no explicit one.
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningTask {
    pub id: Ulid,
    /// Set when the task was derived from a checkout; at most one task
    /// per reservation.
    pub reservation_id: Option<Ulid>,
    pub property_id: Ulid,
    pub cleaner_id: Option<Ulid>,
    pub cleaning_date: Day,
    pub window: TimeWindow,
    pub status: TaskStatus,
    pub priority: Priority,
    pub notes: Option<String>,
    pub whatsapp_sent: bool,
    pub whatsapp_sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cleaner {
    pub id: Ulid,
    pub name: String,
    pub phone: String,
    pub kind: CleanerKind,
    pub active: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Ulid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Ulid,
    pub user_id: Ulid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub related_id: Option<Ulid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// One registered external calendar feed for a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFeed {
    pub id: Ulid,
    pub property_id: Ulid,
    /// Platform label carried onto imported reservations.
    pub platform: String,
    pub ical_url: String,
    pub active: bool,
}

// ── Operation result types ───────────────────────────────────────

/// Outcome of an availability check for a candidate stay.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityReport {
    /// Reservations whose occupancy collides with the candidate.
    pub conflicts: Vec<Reservation>,
}

impl AvailabilityReport {
    pub fn is_available(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Outcome of one lifecycle sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Reservations transitioned confirmed → completed.
    pub completed: u32,
    /// Notification rows written.
    pub notified: u32,
}
