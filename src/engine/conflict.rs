use chrono::Utc;

use crate::model::*;

use super::EngineError;

/// Today at the UTC midnight boundary.
pub fn today_utc() -> Day {
    Utc::now().date_naive()
}

pub(crate) fn validate_stay(stay: &Stay) -> Result<(), EngineError> {
    use crate::limits::*;
    if stay.check_out <= stay.check_in {
        return Err(EngineError::InvalidStay("check_out must be after check_in"));
    }
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(())
}

/// Reservations whose occupancy collides with the candidate stay.
///
/// Only rows with status in {confirmed, completed} count; both sides are
/// half-open day intervals, so a candidate may check in the day an
/// existing stay checks out and vice versa.
pub(crate) fn find_conflicts<'a>(
    candidate: &Stay,
    existing: &'a [Reservation],
) -> Vec<&'a Reservation> {
    existing
        .iter()
        .filter(|r| r.occupies_calendar() && r.stay().overlaps(candidate))
        .collect()
}

pub(crate) fn check_no_conflict(
    candidate: &Stay,
    existing: &[Reservation],
) -> Result<(), EngineError> {
    let conflicts = find_conflicts(candidate, existing);
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Conflict(
            conflicts.iter().map(|r| r.id).collect(),
        ))
    }
}
