use chrono::{Datelike, NaiveDate};
use std::fmt;

const QUARTER_START_MONTHS: [u32; 4] = [1, 4, 7, 10];

/// Remote collection bucket keyed by year and quarter-start month, rendered as `2024-10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Season {
    pub year: i32,
    pub month: u32,
}

impl Season {
    /// The bucket whose quarter contains `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let month = (date.month0() / 3) * 3 + 1;
        Self {
            year: date.year(),
            month,
        }
    }

    /// All buckets from the first quarter of `start_year` through the bucket
    /// containing `today`, oldest first. Empty when `start_year` lies in the future.
    pub fn history(start_year: i32, today: NaiveDate) -> Vec<Season> {
        let current = Self::containing(today);
        (start_year..=current.year)
            .flat_map(|year| {
                QUARTER_START_MONTHS
                    .iter()
                    .map(move |&month| Season { year, month })
            })
            .filter(|season| *season <= current)
            .collect()
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}
