use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

pub const DEFAULT_PACKAGES: [&str; 4] = ["TN-95", "TN-96", "TN-97", "TN-98"];

/// The fixed set of organisational packages records may be attributed to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct PackageCatalog {
    names: Vec<String>,
}

impl Default for PackageCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_PACKAGES.iter().map(|s| s.to_string()).collect())
    }
}

impl PackageCatalog {
    pub fn new(names: Vec<String>) -> Self {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.dedup();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Returns the canonical spelling of `input`, matched case-insensitively.
    pub fn resolve(&self, input: &str) -> Result<String, DashboardError> {
        let wanted = input.trim();
        self.names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| DashboardError::UnknownPackage(wanted.to_string()))
    }

    /// Package after `current` in catalogue order, `None` meaning "all packages".
    pub fn cycle(&self, current: Option<&str>) -> Option<String> {
        match current {
            None => self.names.first().cloned(),
            Some(cur) => {
                let pos = self.names.iter().position(|n| n == cur)?;
                self.names.get(pos + 1).cloned()
            }
        }
    }
}
