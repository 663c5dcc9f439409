//! Simulation calendar: the day horizon, weekday seasonality, and send times.

use crate::error::{SimError, SimResult};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Hour of day at which campaign sends begin.
pub const SEND_HOUR: i64 = 9;

/// Purchase-probability multipliers, Monday first.
pub const WEEKDAY_MULTIPLIERS: [f64; 7] = [1.00, 0.98, 0.99, 1.02, 1.08, 1.15, 1.05];

/// Inclusive range of calendar days covered by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Horizon {
    pub fn new(start: NaiveDate, end: NaiveDate) -> SimResult<Self> {
        if end < start {
            return Err(SimError::InvalidConfig(format!(
                "end_date {end} is before start_date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of days in the horizon, both endpoints included.
    pub fn len_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn date_at(&self, day_index: usize) -> NaiveDate {
        self.start + Duration::days(day_index as i64)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len_days()).map(move |i| self.date_at(i))
    }

    /// Signed day offset of `date` from the horizon start.
    pub fn offset_of(&self, date: NaiveDate) -> i64 {
        (date - self.start).num_days()
    }
}

pub fn weekday_multiplier(date: NaiveDate) -> f64 {
    WEEKDAY_MULTIPLIERS[date.weekday().num_days_from_monday() as usize]
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Campaign send time on `date`: 09:00. Also the holdout anchor.
pub fn send_time(date: NaiveDate) -> NaiveDateTime {
    midnight(date) + Duration::hours(SEND_HOUR)
}

pub fn at_minute(date: NaiveDate, minute_of_day: i64) -> NaiveDateTime {
    midnight(date) + Duration::minutes(minute_of_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn horizon_counts_both_endpoints() {
        let h = Horizon::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();
        assert_eq!(h.len_days(), 91);
        assert_eq!(h.days().last(), Some(date(2024, 3, 31)));
        assert_eq!(h.offset_of(date(2024, 1, 11)), 10);
    }

    #[test]
    fn inverted_horizon_is_rejected() {
        assert!(Horizon::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn weekday_table_is_monday_first() {
        // 2024-01-06 is a Saturday.
        assert_eq!(weekday_multiplier(date(2024, 1, 6)), 1.15);
        assert_eq!(weekday_multiplier(date(2024, 1, 1)), 1.00);
    }

    #[test]
    fn send_time_is_nine_am() {
        let ts = send_time(date(2024, 1, 10));
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2024-01-10 09:00");
    }
}
