use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::input::{lenient_count, MAX_COUNT};

/// The six numeric fields tracked for one package on one day. Sums saturate
/// at `u64::MAX`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Counts {
    /// WC-MI meters installed.
    #[serde(deserialize_with = "lenient_count")]
    pub installed_type_a: u64,
    /// DT meters installed.
    #[serde(deserialize_with = "lenient_count")]
    pub installed_type_b: u64,
    /// CI manpower.
    #[serde(deserialize_with = "lenient_count")]
    pub workforce_a: u64,
    /// MI manpower.
    #[serde(deserialize_with = "lenient_count")]
    pub workforce_b: u64,
    /// In-house manpower.
    #[serde(deserialize_with = "lenient_count")]
    pub workforce_c: u64,
    /// Supervisory staff.
    #[serde(deserialize_with = "lenient_count")]
    pub workforce_d: u64,
}

impl Counts {
    pub fn total_installed(&self) -> u64 {
        self.installed_type_a.saturating_add(self.installed_type_b)
    }

    pub fn total_workforce(&self) -> u64 {
        self.workforce_a
            .saturating_add(self.workforce_b)
            .saturating_add(self.workforce_c)
            .saturating_add(self.workforce_d)
    }

    pub fn add(&mut self, other: &Counts) {
        self.installed_type_a = self.installed_type_a.saturating_add(other.installed_type_a);
        self.installed_type_b = self.installed_type_b.saturating_add(other.installed_type_b);
        self.workforce_a = self.workforce_a.saturating_add(other.workforce_a);
        self.workforce_b = self.workforce_b.saturating_add(other.workforce_b);
        self.workforce_c = self.workforce_c.saturating_add(other.workforce_c);
        self.workforce_d = self.workforce_d.saturating_add(other.workforce_d);
    }

    /// Every field limited to [`MAX_COUNT`], the most a store can hold.
    pub fn capped(self) -> Counts {
        Counts {
            installed_type_a: self.installed_type_a.min(MAX_COUNT),
            installed_type_b: self.installed_type_b.min(MAX_COUNT),
            workforce_a: self.workforce_a.min(MAX_COUNT),
            workforce_b: self.workforce_b.min(MAX_COUNT),
            workforce_c: self.workforce_c.min(MAX_COUNT),
            workforce_d: self.workforce_d.min(MAX_COUNT),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Counts::default()
    }
}

/// One stored row. `(date, package)` is the natural key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub date: NaiveDate,
    pub package: String,
    #[serde(flatten)]
    pub counts: Counts,
}

impl Observation {
    /// Counts are capped so every backend stores them unchanged.
    pub fn new(date: NaiveDate, package: impl Into<String>, counts: Counts) -> Self {
        Self {
            date,
            package: package.into(),
            counts: counts.capped(),
        }
    }

    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.package.as_str())
    }

    pub fn same_key(&self, other: &Observation) -> bool {
        self.key() == other.key()
    }
}
