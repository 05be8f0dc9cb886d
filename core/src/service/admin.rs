use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DashboardError;
use crate::input::{expand_key, parse_args, parse_non_negative_int};
use crate::model::observation::{Counts, Observation};
use crate::model::package::PackageCatalog;
use crate::time::parse_report_date;

pub const FORM_KEYS: [&str; 9] = ["date", "package", "pkg", "wc", "dt", "ci", "mi", "inhouse", "sup"];

/// Raw admin input for one `(date, package)` record, before validation.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ObservationForm {
    pub date: String,
    pub package: String,
    pub installed_type_a: Option<String>,
    pub installed_type_b: Option<String>,
    pub workforce_a: Option<String>,
    pub workforce_b: Option<String>,
    pub workforce_c: Option<String>,
    pub workforce_d: Option<String>,
}

impl ObservationForm {
    /// Builds a form from `key:value` words such as `date:today pkg:TN-95 wc:12`.
    /// Unknown keys come back as warnings.
    pub fn from_args(args: &[String]) -> (Self, Vec<String>) {
        let parsed = parse_args(args);
        let mut form = ObservationForm::default();
        let mut warnings = Vec::new();

        if !parsed.free_text.is_empty() {
            warnings.push(format!("Ignoring '{}'", parsed.free_text));
        }

        let mut entries: Vec<_> = parsed.metadata.into_iter().collect();
        entries.sort();
        for (key, value) in entries {
            let full_key = match expand_key(&key, &FORM_KEYS) {
                Ok(k) => k,
                Err(e) => {
                    warnings.push(e.to_string());
                    continue;
                }
            };
            match full_key.as_str() {
                "date" => form.date = value,
                "package" | "pkg" => form.package = value,
                "wc" => form.installed_type_a = Some(value),
                "dt" => form.installed_type_b = Some(value),
                "ci" => form.workforce_a = Some(value),
                "mi" => form.workforce_b = Some(value),
                "inhouse" => form.workforce_c = Some(value),
                "sup" => form.workforce_d = Some(value),
                _ => {}
            }
        }
        (form, warnings)
    }

    /// Rejects bad dates and unknown packages; numbers are coerced, never rejected.
    pub fn validate(&self, catalog: &PackageCatalog, today: NaiveDate) -> Result<Observation, DashboardError> {
        let date = if self.date.trim().is_empty() {
            today
        } else {
            parse_report_date(&self.date, today)?
        };
        let package = catalog.resolve(&self.package)?;

        let count = |raw: &Option<String>| raw.as_deref().map(parse_non_negative_int).unwrap_or(0);
        let counts = Counts {
            installed_type_a: count(&self.installed_type_a),
            installed_type_b: count(&self.installed_type_b),
            workforce_a: count(&self.workforce_a),
            workforce_b: count(&self.workforce_b),
            workforce_c: count(&self.workforce_c),
            workforce_d: count(&self.workforce_d),
        };
        Ok(Observation::new(date, package, counts))
    }
}

/// Outcome of applying a whole sheet through the admin path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub applied: usize,
    pub skipped: Vec<String>,
}

impl ImportReport {
    pub fn skip(&mut self, reason: String) {
        warn!(%reason, "import row skipped");
        self.skipped.push(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_args_expands_prefixes() {
        let (form, warnings) = ObservationForm::from_args(&args(&[
            "da:2024-05-01",
            "pkg:tn-95",
            "wc:12",
            "dt:3",
            "in:1",
            "su:2",
        ]));
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(form.date, "2024-05-01");
        assert_eq!(form.package, "tn-95");
        assert_eq!(form.installed_type_a.as_deref(), Some("12"));
        assert_eq!(form.workforce_c.as_deref(), Some("1"));
        assert_eq!(form.workforce_d.as_deref(), Some("2"));
    }

    #[test]
    fn test_from_args_reports_unknown_keys() {
        let (_, warnings) = ObservationForm::from_args(&args(&["zz:1", "d:4", "stray"]));
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_validate_coerces_numbers() {
        let form = ObservationForm {
            date: "2024-05-01".into(),
            package: "tn-96".into(),
            installed_type_a: Some("7".into()),
            installed_type_b: Some("lots".into()),
            workforce_a: Some("-2".into()),
            ..ObservationForm::default()
        };
        let obs = form.validate(&PackageCatalog::default(), today()).unwrap();
        assert_eq!(obs.package, "TN-96");
        assert_eq!(obs.counts.installed_type_a, 7);
        assert_eq!(obs.counts.installed_type_b, 0);
        assert_eq!(obs.counts.workforce_a, 0);
        assert_eq!(obs.counts.workforce_d, 0);
    }

    #[test]
    fn test_validate_defaults_date_to_today() {
        let form = ObservationForm { package: "TN-95".into(), ..ObservationForm::default() };
        assert_eq!(form.validate(&PackageCatalog::default(), today()).unwrap().date, today());
    }

    #[test]
    fn test_validate_rejects_unknown_package_and_bad_date() {
        let catalog = PackageCatalog::default();
        let bad_pkg = ObservationForm { package: "XX-1".into(), ..ObservationForm::default() };
        assert_eq!(
            bad_pkg.validate(&catalog, today()),
            Err(DashboardError::UnknownPackage("XX-1".into()))
        );

        let bad_date = ObservationForm {
            date: "someday".into(),
            package: "TN-95".into(),
            ..ObservationForm::default()
        };
        assert!(matches!(bad_date.validate(&catalog, today()), Err(DashboardError::InvalidDate(_))));
    }
}
