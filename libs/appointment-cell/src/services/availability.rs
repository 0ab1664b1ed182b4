//! Candidate slot grid of a professional for one calendar date.
//!
//! Everything here is pure: the same rules and date always give the same grid.
//! Arithmetic is done in minutes since midnight so a window can never wrap
//! into the next day.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use shared_models::WorkingDay;

pub const SLOT_MINUTES: u32 = 30;

/// 0 = Sunday .. 6 = Saturday, straight from the calendar date.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

fn time_at(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// `start, start + 30, …` while the slot start is strictly before `end`.
/// A window that is empty or inverted yields nothing.
pub fn generate_time_slots(start: NaiveTime, end: NaiveTime) -> Vec<NaiveTime> {
    let end = minutes_of(end);
    (minutes_of(start)..end)
        .step_by(SLOT_MINUTES as usize)
        .filter_map(time_at)
        .collect()
}

/// Grid for `date`, or empty when the professional does not work that weekday.
pub fn candidate_slots(working_days: &[WorkingDay], date: NaiveDate) -> Vec<NaiveTime> {
    let weekday = day_of_week(date);

    // Rules are unique per weekday; should duplicates slip in, the last one wins.
    working_days
        .iter()
        .rev()
        .find(|rule| rule.day_of_week == weekday)
        .map(|rule| generate_time_slots(rule.start_time, rule.end_time))
        .unwrap_or_default()
}
