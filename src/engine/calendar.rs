use std::collections::BTreeSet;

use crate::model::{Day, Stay};

// ── Day-set algebra ───────────────────────────────────────────────
//
// Two boundary semantics, both intentional:
//
//  * Blocked-display: every day of a stay including the check-out day.
//    Drives `occupied_days`/`blocked_day_set`, consumed by date pickers
//    that grey out any day touched by a reservation.
//  * Candidate-probe: a candidate stay is tested on `[check_in,
//    check_out)` only, so a candidate may end on a blocked day.
//    Consumed by the manual-entry path before submission.
//
// Conflict detection proper does not use the blocked set at all; it
// compares half-open stays directly (`Stay::overlaps`), which permits
// same-day turnover in both directions.

/// Every calendar day of a stay, check-in through check-out inclusive.
pub fn occupied_days(stay: Stay) -> BTreeSet<Day> {
    stay.blocked_days().collect()
}

/// Union of `occupied_days` across many stays.
pub fn blocked_day_set<I>(stays: I) -> BTreeSet<Day>
where
    I: IntoIterator<Item = Stay>,
{
    let mut blocked = BTreeSet::new();
    for stay in stays {
        blocked.extend(stay.blocked_days());
    }
    blocked
}

/// Candidate-probe test: true if any day in `[check_in, check_out)` of
/// the candidate is present in the blocked set. The candidate's own
/// check-out day is deliberately not probed.
pub fn candidate_overlaps_blocked(candidate: Stay, blocked: &BTreeSet<Day>) -> bool {
    candidate.occupancy_days().any(|day| blocked.contains(&day))
}
