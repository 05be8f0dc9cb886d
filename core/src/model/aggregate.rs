use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::observation::Counts;

/// One day of the dense series, summed across the packages in scope.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatedRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: Counts,
    pub total_installed: u64,
    pub total_workforce: u64,
}

impl AggregatedRow {
    pub fn new(date: NaiveDate, counts: Counts) -> Self {
        Self {
            date,
            counts,
            total_installed: counts.total_installed(),
            total_workforce: counts.total_workforce(),
        }
    }

    pub fn zero(date: NaiveDate) -> Self {
        Self::new(date, Counts::default())
    }
}

/// Dense, ascending rows covering `start..=end`. The aggregator always
/// produces at least one row; consumers still tolerate none.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AggregatedSeries {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub package: Option<String>,
    pub rows: Vec<AggregatedRow>,
}

impl AggregatedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }
}
