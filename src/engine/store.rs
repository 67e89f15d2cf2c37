use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

/// Failure surfaced by the backing relational store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Narrow data-access interface over the hosted relational store.
///
/// Only the operations the engine needs: select-with-filter, insert,
/// update-by-id, and single-row existence probes. No transactions.
#[async_trait]
pub trait Store: Send + Sync {
    // ── properties ───────────────────────────────────────

    async fn properties(&self) -> Result<Vec<Property>, StoreError>;
    async fn property(&self, id: Ulid) -> Result<Option<Property>, StoreError>;
    async fn insert_property(&self, property: Property) -> Result<(), StoreError>;

    // ── reservations ─────────────────────────────────────

    async fn reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError>;
    async fn insert_reservation(&self, reservation: Reservation) -> Result<(), StoreError>;

    /// Rows for one property with status in `statuses`.
    async fn reservations_for_property(
        &self,
        property_id: Ulid,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Confirmed rows with `check_out >= from`, ascending by check-out.
    async fn confirmed_checking_out_from(&self, from: Day)
        -> Result<Vec<Reservation>, StoreError>;

    /// Confirmed rows with `check_out < before`.
    async fn confirmed_checked_out_before(
        &self,
        before: Day,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Earliest confirmed check-in on the property at or after `from`.
    async fn next_confirmed_check_in(
        &self,
        property_id: Ulid,
        from: Day,
    ) -> Result<Option<Reservation>, StoreError>;

    /// Existence probe on the feed dedup key.
    async fn reservation_by_external_ref(
        &self,
        property_id: Ulid,
        external_ref: &str,
    ) -> Result<Option<Reservation>, StoreError>;

    async fn set_reservation_status(
        &self,
        ids: &[Ulid],
        status: ReservationStatus,
    ) -> Result<(), StoreError>;

    // ── cleaning tasks ───────────────────────────────────

    /// At most one task references a reservation; this is the probe the
    /// synchronizer runs before creating one.
    async fn cleaning_task_for_reservation(
        &self,
        reservation_id: Ulid,
    ) -> Result<Option<CleaningTask>, StoreError>;

    async fn insert_cleaning_task(&self, task: CleaningTask) -> Result<(), StoreError>;
    async fn cleaning_tasks(&self) -> Result<Vec<CleaningTask>, StoreError>;

    // ── cleaners / profiles / notifications / feeds ──────

    async fn active_cleaners(&self) -> Result<Vec<Cleaner>, StoreError>;
    async fn insert_cleaner(&self, cleaner: Cleaner) -> Result<(), StoreError>;

    async fn profiles_with_role(&self, role: Role) -> Result<Vec<Profile>, StoreError>;
    async fn insert_profile(&self, profile: Profile) -> Result<(), StoreError>;

    async fn insert_notifications(
        &self,
        notifications: Vec<Notification>,
    ) -> Result<(), StoreError>;
    async fn notifications_for_user(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn active_feeds(&self) -> Result<Vec<PlatformFeed>, StoreError>;
    async fn insert_feed(&self, feed: PlatformFeed) -> Result<(), StoreError>;
}

/// Startup seed for the bundled in-memory store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub cleaners: Vec<Cleaner>,
    #[serde(default)]
    pub feeds: Vec<PlatformFeed>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    #[serde(default)]
    pub cleaning_tasks: Vec<CleaningTask>,
}

/// DashMap-backed store used by the binary and the tests.
#[derive(Default)]
pub struct InMemoryStore {
    properties: DashMap<Ulid, Property>,
    reservations: DashMap<Ulid, Reservation>,
    cleaning_tasks: DashMap<Ulid, CleaningTask>,
    cleaners: DashMap<Ulid, Cleaner>,
    profiles: DashMap<Ulid, Profile>,
    notifications: DashMap<Ulid, Notification>,
    feeds: DashMap<Ulid, PlatformFeed>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_snapshot(&self, snapshot: Snapshot) {
        for p in snapshot.properties {
            self.properties.insert(p.id, p);
        }
        for p in snapshot.profiles {
            self.profiles.insert(p.id, p);
        }
        for c in snapshot.cleaners {
            self.cleaners.insert(c.id, c);
        }
        for f in snapshot.feeds {
            self.feeds.insert(f.id, f);
        }
        for r in snapshot.reservations {
            self.reservations.insert(r.id, r);
        }
        for t in snapshot.cleaning_tasks {
            self.cleaning_tasks.insert(t.id, t);
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn properties(&self) -> Result<Vec<Property>, StoreError> {
        let mut rows: Vec<Property> = self.properties.iter().map(|e| e.value().clone()).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn property(&self, id: Ulid) -> Result<Option<Property>, StoreError> {
        Ok(self.properties.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_property(&self, property: Property) -> Result<(), StoreError> {
        self.properties.insert(property.id, property);
        Ok(())
    }

    async fn reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        Ok(self.reservations.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_reservation(&self, reservation: Reservation) -> Result<(), StoreError> {
        self.reservations.insert(reservation.id, reservation);
        Ok(())
    }

    async fn reservations_for_property(
        &self,
        property_id: Ulid,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut rows: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|e| {
                e.value().property_id == property_id && statuses.contains(&e.value().status)
            })
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|r| r.check_in);
        Ok(rows)
    }

    async fn confirmed_checking_out_from(
        &self,
        from: Day,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut rows: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|e| {
                e.value().status == ReservationStatus::Confirmed && e.value().check_out >= from
            })
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|r| r.check_out);
        Ok(rows)
    }

    async fn confirmed_checked_out_before(
        &self,
        before: Day,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut rows: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|e| {
                e.value().status == ReservationStatus::Confirmed && e.value().check_out < before
            })
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|r| r.check_out);
        Ok(rows)
    }

    async fn next_confirmed_check_in(
        &self,
        property_id: Ulid,
        from: Day,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .reservations
            .iter()
            .filter(|e| {
                let r = e.value();
                r.property_id == property_id
                    && r.status == ReservationStatus::Confirmed
                    && r.check_in >= from
            })
            .map(|e| e.value().clone())
            .min_by_key(|r| r.check_in))
    }

    async fn reservation_by_external_ref(
        &self,
        property_id: Ulid,
        external_ref: &str,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .reservations
            .iter()
            .find(|e| {
                let r = e.value();
                r.property_id == property_id && r.external_ref.as_deref() == Some(external_ref)
            })
            .map(|e| e.value().clone()))
    }

    async fn set_reservation_status(
        &self,
        ids: &[Ulid],
        status: ReservationStatus,
    ) -> Result<(), StoreError> {
        for id in ids {
            if let Some(mut row) = self.reservations.get_mut(id) {
                row.status = status;
            }
        }
        Ok(())
    }

    async fn cleaning_task_for_reservation(
        &self,
        reservation_id: Ulid,
    ) -> Result<Option<CleaningTask>, StoreError> {
        Ok(self
            .cleaning_tasks
            .iter()
            .find(|e| e.value().reservation_id == Some(reservation_id))
            .map(|e| e.value().clone()))
    }

    async fn insert_cleaning_task(&self, task: CleaningTask) -> Result<(), StoreError> {
        self.cleaning_tasks.insert(task.id, task);
        Ok(())
    }

    async fn cleaning_tasks(&self) -> Result<Vec<CleaningTask>, StoreError> {
        let mut rows: Vec<CleaningTask> = self
            .cleaning_tasks
            .iter()
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|t| t.cleaning_date);
        Ok(rows)
    }

    async fn active_cleaners(&self) -> Result<Vec<Cleaner>, StoreError> {
        let mut rows: Vec<Cleaner> = self
            .cleaners
            .iter()
            .filter(|e| e.value().active)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn insert_cleaner(&self, cleaner: Cleaner) -> Result<(), StoreError> {
        self.cleaners.insert(cleaner.id, cleaner);
        Ok(())
    }

    async fn profiles_with_role(&self, role: Role) -> Result<Vec<Profile>, StoreError> {
        Ok(self
            .profiles
            .iter()
            .filter(|e| e.value().role == role)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn insert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.profiles.insert(profile.id, profile);
        Ok(())
    }

    async fn insert_notifications(
        &self,
        notifications: Vec<Notification>,
    ) -> Result<(), StoreError> {
        for n in notifications {
            self.notifications.insert(n.id, n);
        }
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .notifications
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn active_feeds(&self) -> Result<Vec<PlatformFeed>, StoreError> {
        Ok(self
            .feeds
            .iter()
            .filter(|e| e.value().active)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn insert_feed(&self, feed: PlatformFeed) -> Result<(), StoreError> {
        self.feeds.insert(feed.id, feed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Day {
        s.parse().unwrap()
    }

    fn reservation(
        property_id: Ulid,
        check_in: &str,
        check_out: &str,
        status: ReservationStatus,
    ) -> Reservation {
        let stay = Stay::new(d(check_in), d(check_out));
        Reservation {
            id: Ulid::new(),
            property_id,
            guest_name: None,
            guest_email: None,
            guest_phone: None,
            check_in: stay.check_in,
            check_out: stay.check_out,
            nights: stay.nights(),
            total_amount: None,
            status,
            source: None,
            external_ref: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn status_filter_on_property_reservations() {
        let store = InMemoryStore::new();
        let pid = Ulid::new();
        store
            .insert_reservation(reservation(pid, "2024-06-01", "2024-06-05", ReservationStatus::Confirmed))
            .await
            .unwrap();
        store
            .insert_reservation(reservation(pid, "2024-06-10", "2024-06-12", ReservationStatus::Cancelled))
            .await
            .unwrap();

        let active = store
            .reservations_for_property(
                pid,
                &[ReservationStatus::Confirmed, ReservationStatus::Completed],
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn checkout_horizon_is_ordered_and_filtered() {
        let store = InMemoryStore::new();
        let pid = Ulid::new();
        store
            .insert_reservation(reservation(pid, "2024-06-20", "2024-06-25", ReservationStatus::Confirmed))
            .await
            .unwrap();
        store
            .insert_reservation(reservation(pid, "2024-06-01", "2024-06-10", ReservationStatus::Confirmed))
            .await
            .unwrap();
        store
            .insert_reservation(reservation(pid, "2024-05-01", "2024-05-05", ReservationStatus::Confirmed))
            .await
            .unwrap();

        let horizon = store
            .confirmed_checking_out_from(d("2024-06-01"))
            .await
            .unwrap();
        assert_eq!(horizon.len(), 2);
        assert_eq!(horizon[0].check_out, d("2024-06-10"));
        assert_eq!(horizon[1].check_out, d("2024-06-25"));
    }

    #[tokio::test]
    async fn next_check_in_picks_earliest_on_or_after() {
        let store = InMemoryStore::new();
        let pid = Ulid::new();
        store
            .insert_reservation(reservation(pid, "2024-06-15", "2024-06-20", ReservationStatus::Confirmed))
            .await
            .unwrap();
        store
            .insert_reservation(reservation(pid, "2024-06-10", "2024-06-15", ReservationStatus::Confirmed))
            .await
            .unwrap();

        let next = store
            .next_confirmed_check_in(pid, d("2024-06-10"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.check_in, d("2024-06-10"));

        let none = store
            .next_confirmed_check_in(pid, d("2024-07-01"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn external_ref_probe_is_scoped_to_property() {
        let store = InMemoryStore::new();
        let pid = Ulid::new();
        let mut r = reservation(pid, "2024-06-01", "2024-06-05", ReservationStatus::Confirmed);
        r.external_ref = Some("uid-1".into());
        store.insert_reservation(r).await.unwrap();

        assert!(store
            .reservation_by_external_ref(pid, "uid-1")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .reservation_by_external_ref(Ulid::new(), "uid-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn bulk_status_update_skips_unknown_ids() {
        let store = InMemoryStore::new();
        let pid = Ulid::new();
        let r = reservation(pid, "2024-06-01", "2024-06-05", ReservationStatus::Confirmed);
        let id = r.id;
        store.insert_reservation(r).await.unwrap();

        store
            .set_reservation_status(&[id, Ulid::new()], ReservationStatus::Completed)
            .await
            .unwrap();
        let row = store.reservation(id).await.unwrap().unwrap();
        assert_eq!(row.status, ReservationStatus::Completed);
    }

    #[tokio::test]
    async fn snapshot_load_populates_tables() {
        let store = InMemoryStore::new();
        let pid = Ulid::new();
        let snapshot = Snapshot {
            properties: vec![Property {
                id: pid,
                owner_id: Ulid::new(),
                name: "Loft".into(),
                location: None,
                status: PropertyStatus::Active,
                commission_percentage: None,
            }],
            reservations: vec![reservation(
                pid,
                "2024-06-01",
                "2024-06-05",
                ReservationStatus::Confirmed,
            )],
            ..Default::default()
        };
        store.load_snapshot(snapshot);

        assert_eq!(store.properties().await.unwrap().len(), 1);
        assert_eq!(
            store
                .reservations_for_property(pid, &[ReservationStatus::Confirmed])
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
