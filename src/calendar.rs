use chrono::{Datelike, NaiveDate, Weekday};

/// Fixed-date national holidays as (month, day).
const NATIONAL_HOLIDAYS: [(u32, u32); 3] = [
    (1, 26),  // Republic Day
    (8, 15),  // Independence Day
    (10, 2),  // Gandhi Jayanti
];

pub fn is_holiday(date: NaiveDate) -> bool {
    NATIONAL_HOLIDAYS.contains(&(date.month(), date.day()))
}

/// Weekdays that are not national holidays. Advisory only: attendance can
/// still be taken on any date.
pub fn is_working_day(date: NaiveDate) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !is_holiday(date)
}
