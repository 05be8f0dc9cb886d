use chrono::{Duration, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Which installation category a view focuses on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    Combined,
    /// WC-MI report.
    TypeA,
    /// DT report.
    TypeB,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            ViewMode::Combined => ViewMode::TypeA,
            ViewMode::TypeA => ViewMode::TypeB,
            ViewMode::TypeB => ViewMode::Combined,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewMode::Combined => "WC-MI + DT",
            ViewMode::TypeA => "WC-MI",
            ViewMode::TypeB => "DT",
        }
    }

    pub fn shows_type_a(self) -> bool {
        matches!(self, ViewMode::Combined | ViewMode::TypeA)
    }

    pub fn shows_type_b(self) -> bool {
        matches!(self, ViewMode::Combined | ViewMode::TypeB)
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "combined" | "all" => Ok(ViewMode::Combined),
            "type-a" | "a" | "wc" | "wc-mi" => Ok(ViewMode::TypeA),
            "type-b" | "b" | "dt" => Ok(ViewMode::TypeB),
            other => Err(format!("unknown view mode '{}'", other)),
        }
    }
}

/// Everything one render needs, passed explicitly instead of held as page state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardRequest {
    pub view_mode: ViewMode,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub package: Option<String>,
}

impl DashboardRequest {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            view_mode: ViewMode::default(),
            start,
            end,
            package: None,
        }
    }

    /// The `days`-long window ending on `end`.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        let start = end.checked_sub_signed(Duration::days(span)).unwrap_or(NaiveDate::MIN);
        Self::new(start, end)
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.start > self.end {
            return Err(DashboardError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Moves the window by whole window lengths; negative goes back in time.
    /// Stays put when the move would leave the calendar.
    pub fn shift(&mut self, windows: i64) {
        let step = self
            .span_days()
            .max(1)
            .checked_mul(windows)
            .and_then(TimeDelta::try_days);
        let Some(step) = step else { return };
        if let (Some(start), Some(end)) = (self.start.checked_add_signed(step), self.end.checked_add_signed(step)) {
            self.start = start;
            self.end = end;
        }
    }

    pub fn widen(&mut self, days: i64) {
        let start = TimeDelta::try_days(days).and_then(|d| self.start.checked_sub_signed(d));
        if let Some(start) = start.filter(|s| *s <= self.end) {
            self.start = start;
        }
    }
}
