use chrono::NaiveDate;
use thiserror::Error;

/// Caller errors. Messy task data never ends up here; it is dropped item by item instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlannerError {
    #[error("window start {start} is after window end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    #[error("window of {days} days exceeds the limit of {limit} days")]
    WindowTooLarge { days: i64, limit: i64 },
    #[error("unable to parse `{input}` as a YYYY-MM-DD date")]
    InvalidDate { input: String },
}

pub type Result<T> = std::result::Result<T, PlannerError>;
