use std::collections::BTreeSet;

use ulid::Ulid;

use crate::model::*;

use super::calendar::blocked_day_set;
use super::conflict::{find_conflicts, validate_stay};
use super::{Engine, EngineError};

/// Statuses that occupy the calendar for conflict purposes.
pub(super) const OCCUPYING: [ReservationStatus; 2] =
    [ReservationStatus::Confirmed, ReservationStatus::Completed];

impl Engine {
    /// Conflict check for a candidate stay on a property.
    ///
    /// Side-effect-free; returns every colliding reservation so the
    /// caller can show diagnostics. Rejects a stay whose check-out is
    /// not after its check-in before touching the store.
    pub async fn check_availability(
        &self,
        property_id: Ulid,
        stay: Stay,
    ) -> Result<AvailabilityReport, EngineError> {
        validate_stay(&stay)?;
        let existing = self
            .store
            .reservations_for_property(property_id, &OCCUPYING)
            .await?;
        let conflicts: Vec<Reservation> = find_conflicts(&stay, &existing)
            .into_iter()
            .cloned()
            .collect();
        if !conflicts.is_empty() {
            metrics::counter!(crate::observability::CONFLICTS_DETECTED_TOTAL).increment(1);
        }
        Ok(AvailabilityReport { conflicts })
    }

    /// Days a manual date picker greys out for a property: every day of
    /// every confirmed/completed stay, check-out day included. This is
    /// display-only; conflict detection uses half-open occupancy and is
    /// more permissive at the boundaries.
    pub async fn blocked_days(&self, property_id: Ulid) -> Result<BTreeSet<Day>, EngineError> {
        let existing = self
            .store
            .reservations_for_property(property_id, &OCCUPYING)
            .await?;
        Ok(blocked_day_set(existing.iter().map(|r| r.stay())))
    }
}
