//! Trading-day calendar: weekends plus configured market holidays.

use crate::error::ConvertError;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::{HashMap, HashSet};

/// Upper bound on the forward scan. Real market calendars never have a
/// holiday run anywhere close to this long.
const MAX_ADVANCE_DAYS: u32 = 30;

/// Year-agnostic recurring holidays as (month, day).
const FIXED_HOLIDAYS: &[(u32, u32)] = &[
    (1, 26),  // Republic Day
    (8, 15),  // Independence Day
    (10, 2),  // Gandhi Jayanti
];

pub struct TradingCalendar {
    fixed_holidays: HashSet<(u32, u32)>,
    year_holidays: HashMap<i32, HashSet<NaiveDate>>,
}

impl TradingCalendar {
    pub fn new(
        fixed_holidays: HashSet<(u32, u32)>,
        year_holidays: HashMap<i32, HashSet<NaiveDate>>,
    ) -> Self {
        Self {
            fixed_holidays,
            year_holidays,
        }
    }

    /// Membership check is a pure function of the date.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        if self.fixed_holidays.contains(&(date.month(), date.day())) {
            return true;
        }
        self.year_holidays
            .get(&date.year())
            .is_some_and(|days| days.contains(&date))
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// Returns the first trading day on or after `date`.
    pub fn next_trading_day(&self, date: NaiveDate) -> Result<NaiveDate, ConvertError> {
        let mut candidate = date;
        for _ in 0..=MAX_ADVANCE_DAYS {
            if self.is_trading_day(candidate) {
                return Ok(candidate);
            }
            candidate = candidate + Days::new(1);
        }
        Err(ConvertError::CalendarUnbounded {
            start: date,
            limit: MAX_ADVANCE_DAYS,
        })
    }
}

impl Default for TradingCalendar {
    /// Indian market holidays. Year-specific entries cover the statement
    /// years this tool is normally run against; other years fall back to
    /// weekends plus the fixed set.
    fn default() -> Self {
        let mut year_holidays: HashMap<i32, HashSet<NaiveDate>> = HashMap::new();
        year_holidays.insert(
            2024,
            dates(2024, &[(3, 25), (11, 1)]),
        );
        year_holidays.insert(
            2025,
            dates(
                2025,
                &[
                    (4, 10),
                    (4, 14),
                    (4, 18),
                    (5, 1),
                    (8, 15),
                    (8, 27),
                    (10, 2),
                    (10, 21),
                    (10, 22),
                    (11, 5),
                    (12, 25),
                ],
            ),
        );

        Self {
            fixed_holidays: FIXED_HOLIDAYS.iter().copied().collect(),
            year_holidays,
        }
    }
}

fn dates(year: i32, month_days: &[(u32, u32)]) -> HashSet<NaiveDate> {
    month_days
        .iter()
        .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(year, m, d))
        .collect()
}
