// libs/appointment-cell/src/services/slots.rs
use chrono::{NaiveTime, Timelike};

use crate::models::{Appointment, TimeSlot, WorkingHours, TIME_FORMAT};
use crate::services::conflict;

/// Generate the ordered grid of bookable start times for a working day.
/// The end boundary is inclusive: a slot that starts exactly at
/// `end_of_day` is part of the grid. Empty when start > end.
pub fn generate_slots(hours: &WorkingHours) -> Vec<NaiveTime> {
    if hours.interval_minutes == 0 {
        return Vec::new();
    }

    // Work in minutes-from-midnight so stepping can never wrap past
    // midnight into an infinite loop.
    let start = hours.start_of_day.num_seconds_from_midnight() / 60;
    let end = hours.end_of_day.num_seconds_from_midnight() / 60;

    let mut slots = Vec::new();
    let mut current = start;
    while current <= end {
        if let Some(time) = NaiveTime::from_hms_opt(current / 60, current % 60, 0) {
            slots.push(time);
        }
        current += hours.interval_minutes;
    }

    slots
}

/// The day grid annotated with availability, given the doctor's active
/// appointments for that date. Released appointments never block a slot.
pub fn day_schedule(hours: &WorkingHours, existing: &[Appointment]) -> Vec<TimeSlot> {
    let duration = hours.slot_duration();

    generate_slots(hours)
        .into_iter()
        .map(|time| {
            // Blocked when the slot's own interval overlaps any active
            // appointment. Date equality is the caller's concern; the
            // grid has no date component.
            let blocking = existing.iter().find(|apt| {
                apt.status.is_active()
                    && conflict::intervals_overlap(
                        apt.date.and_time(time),
                        apt.date.and_time(time) + duration,
                        apt.start(),
                        apt.end(duration),
                    )
            });

            TimeSlot {
                time: time.format(TIME_FORMAT).to_string(),
                available: blocking.is_none(),
                appointment_id: blocking.map(|apt| apt.id),
                status: blocking.map(|apt| apt.status),
            }
        })
        .collect()
}
