use chrono::NaiveDate;
use thiserror::Error;

/// Failures that reach the boundary of a render or submit cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    #[error("could not parse date '{0}'")]
    InvalidDate(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
}

impl DashboardError {
    pub fn store(err: anyhow::Error) -> Self {
        DashboardError::StoreUnavailable(format!("{:#}", err))
    }

    /// Input errors are the user's to fix; store errors are not.
    pub fn is_validation(&self) -> bool {
        !matches!(self, DashboardError::StoreUnavailable(_))
    }
}
