use std::fmt;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;

use crate::error::{AppError, AppResult};

const GIT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Inclusive range of calendar days that rewritten commits are spread over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::Configuration(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: Option<&str>, end: Option<&str>) -> AppResult<Self> {
        let default = Self::default();
        let start = match start {
            Some(value) => parse_date(value)?,
            None => default.start,
        };
        let end = match end {
            Some(value) => parse_date(value)?,
            None => default.end,
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Picks a uniform day in the window, then an hour, minute and second independently.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> CommitTimestamp {
        let span = (self.end - self.start).num_days() as u64;
        let date = self.start + Days::new(rng.gen_range(0..=span));

        let hour = rng.gen_range(0..=23);
        let minute = rng.gen_range(0..=59);
        let second = rng.gen_range(0..=59);
        let time = NaiveTime::from_hms_opt(hour, minute, second).unwrap_or_default();

        CommitTimestamp(date.and_time(time))
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap_or_default(),
        }
    }
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        AppError::Configuration(format!("invalid date '{value}' (expected YYYY-MM-DD): {err}"))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitTimestamp(pub NaiveDateTime);

impl CommitTimestamp {
    /// Local-time form accepted by `GIT_AUTHOR_DATE` and `GIT_COMMITTER_DATE`.
    pub fn to_git_date(&self) -> String {
        self.0.format(GIT_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for CommitTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_git_date())
    }
}
