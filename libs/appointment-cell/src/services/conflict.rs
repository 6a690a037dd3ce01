// libs/appointment-cell/src/services/conflict.rs
use chrono::{Duration, NaiveDateTime};

use crate::models::Appointment;

/// Half-open interval overlap: [a1, a2) and [b1, b2) conflict iff
/// a1 < b2 && b1 < a2. Back-to-back appointments (a2 == b1) do not.
pub fn intervals_overlap(
    a1: NaiveDateTime,
    a2: NaiveDateTime,
    b1: NaiveDateTime,
    b2: NaiveDateTime,
) -> bool {
    a1 < b2 && b1 < a2
}

/// All existing appointments that block a candidate interval. Only
/// slot-occupying statuses count; rejected and cancelled appointments
/// are released and ignored. The full list comes back so the caller
/// can report exactly what blocks the request.
pub fn find_conflicts<'a>(
    candidate_start: NaiveDateTime,
    duration: Duration,
    existing: &'a [Appointment],
) -> Vec<&'a Appointment> {
    let candidate_end = candidate_start + duration;

    existing
        .iter()
        .filter(|apt| apt.status.is_active())
        .filter(|apt| {
            intervals_overlap(candidate_start, candidate_end, apt.start(), apt.end(duration))
        })
        .collect()
}
