use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::input::parse_non_negative_int;
use crate::model::observation::{Counts, Observation};
use crate::repository::file::{default_data_dir, replace_file, with_store_lock};
use crate::repository::traits::{merge_observation, sort_observations, ObservationRepository};
use crate::time::{parse_report_date, today};

const DEFAULT_FILE_NAME: &str = "observations.csv";

/// A sheet row as exported by hand. Every cell is read as text and coerced,
/// and the historical column titles are accepted.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SheetRow {
    #[serde(alias = "Date", alias = "DATE")]
    date: String,
    #[serde(alias = "Package", alias = "PACKAGE", alias = "pkg")]
    package: String,
    #[serde(alias = "WC-MI", alias = "WC_MI", alias = "wc_mi", alias = "WC")]
    installed_type_a: String,
    #[serde(alias = "DT", alias = "dt")]
    installed_type_b: String,
    #[serde(alias = "CI", alias = "ci")]
    workforce_a: String,
    #[serde(alias = "MI", alias = "mi")]
    workforce_b: String,
    #[serde(alias = "In-House", alias = "In_House", alias = "in_house", alias = "Inhouse")]
    workforce_c: String,
    #[serde(alias = "Supervisory", alias = "supervisory", alias = "Supervisor")]
    workforce_d: String,
    /// Long-format sheets carry one row per meter type instead of two columns.
    #[serde(alias = "Meter_Type", alias = "meter_type")]
    meter_type: Option<String>,
    #[serde(alias = "Installed")]
    installed: String,
}

impl SheetRow {
    fn counts(&self) -> Counts {
        let mut counts = Counts {
            installed_type_a: parse_non_negative_int(&self.installed_type_a),
            installed_type_b: parse_non_negative_int(&self.installed_type_b),
            workforce_a: parse_non_negative_int(&self.workforce_a),
            workforce_b: parse_non_negative_int(&self.workforce_b),
            workforce_c: parse_non_negative_int(&self.workforce_c),
            workforce_d: parse_non_negative_int(&self.workforce_d),
        };
        if let Some(meter_type) = &self.meter_type {
            let installed = parse_non_negative_int(&self.installed);
            match meter_type.trim().to_uppercase().as_str() {
                "WC-MI" | "WC" | "WC_MI" => counts.installed_type_a += installed,
                "DT" => counts.installed_type_b += installed,
                _ => {}
            }
        }
        counts
    }
}

#[derive(Serialize)]
struct SheetRecord<'a> {
    date: String,
    package: &'a str,
    installed_type_a: u64,
    installed_type_b: u64,
    workforce_a: u64,
    workforce_b: u64,
    workforce_c: u64,
    workforce_d: u64,
}

impl<'a> From<&'a Observation> for SheetRecord<'a> {
    fn from(o: &'a Observation) -> Self {
        Self {
            date: o.date.format("%Y-%m-%d").to_string(),
            package: &o.package,
            installed_type_a: o.counts.installed_type_a,
            installed_type_b: o.counts.installed_type_b,
            workforce_a: o.counts.workforce_a,
            workforce_b: o.counts.workforce_b,
            workforce_c: o.counts.workforce_c,
            workforce_d: o.counts.workforce_d,
        }
    }
}

/// Result of reading a sheet: the rows that made it, and why others did not.
#[derive(Debug, Default)]
pub struct SheetLoad {
    pub observations: Vec<Observation>,
    pub skipped: Vec<String>,
}

/// Reads a sheet, summing rows that share a `(date, package)`.
pub fn load_sheet<R: Read>(reader: R) -> Result<SheetLoad> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let anchor = today();
    let mut merged: BTreeMap<(NaiveDate, String), Counts> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (line_num, result) in csv_reader.deserialize::<SheetRow>().enumerate() {
        let line = line_num + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(line, error = %e, "unreadable sheet row");
                skipped.push(format!("line {}: {}", line, e));
                continue;
            }
        };
        if row.date.is_empty() && row.package.is_empty() {
            continue;
        }
        let date = match parse_report_date(&row.date, anchor) {
            Ok(date) => date,
            Err(e) => {
                warn!(line, error = %e, "sheet row without a usable date");
                skipped.push(format!("line {}: {}", line, e));
                continue;
            }
        };
        let package = row.package.trim().to_string();
        if package.is_empty() {
            skipped.push(format!("line {}: missing package", line));
            continue;
        }
        merged.entry((date, package)).or_default().add(&row.counts());
    }

    let observations = merged
        .into_iter()
        .map(|((date, package), counts)| Observation::new(date, package, counts))
        .collect();
    Ok(SheetLoad { observations, skipped })
}

pub fn load_sheet_file(path: &Path) -> Result<SheetLoad> {
    let file = File::open(path).with_context(|| format!("opening sheet {}", path.display()))?;
    load_sheet(file).with_context(|| format!("reading sheet {}", path.display()))
}

/// Observations kept as a CSV sheet, so the same file can be opened in a
/// spreadsheet program.
#[derive(Clone)]
pub struct CsvObservationRepository {
    file_path: PathBuf,
}

impl CsvObservationRepository {
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut path = match base_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        fs::create_dir_all(&path)
            .with_context(|| format!("creating data directory {}", path.display()))?;
        path.push(DEFAULT_FILE_NAME);

        let repo = CsvObservationRepository { file_path: path };
        with_store_lock(&repo.file_path, || {
            if repo.file_path.exists() {
                return Ok(());
            }
            repo.write_observations(&[])
        })?;
        info!(path = %repo.file_path.display(), "CSV observation store opened");
        Ok(repo)
    }

    fn read_observations(&self) -> Result<Vec<Observation>> {
        let load = load_sheet_file(&self.file_path)?;
        if !load.skipped.is_empty() {
            debug!(skipped = load.skipped.len(), "sheet rows ignored on read");
        }
        Ok(load.observations)
    }

    fn write_observations(&self, observations: &[Observation]) -> Result<()> {
        replace_file(&self.file_path, |w| {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(w);
            writer.write_record([
                "date",
                "package",
                "installed_type_a",
                "installed_type_b",
                "workforce_a",
                "workforce_b",
                "workforce_c",
                "workforce_d",
            ])?;
            for observation in observations {
                writer.serialize(SheetRecord::from(observation))?;
            }
            writer.flush()?;
            Ok(())
        })
    }
}

impl ObservationRepository for CsvObservationRepository {
    fn list(&self) -> Result<Vec<Observation>> {
        let mut observations = self.read_observations()?;
        sort_observations(&mut observations);
        Ok(observations)
    }

    fn get(&self, date: NaiveDate, package: &str) -> Result<Option<Observation>> {
        let observations = self.read_observations()?;
        Ok(observations.into_iter().find(|o| o.key() == (date, package)))
    }

    fn upsert(&self, observation: Observation) -> Result<()> {
        with_store_lock(&self.file_path, || {
            let mut observations = self.read_observations()?;
            merge_observation(&mut observations, observation);
            sort_observations(&mut observations);
            self.write_observations(&observations)
        })
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.file_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn test_load_sheet_with_historical_headers() {
        let sheet = "\
Date,Package,WC-MI,DT,CI,MI,In-House,Supervisory
2024-05-01,TN-95,120,4,6,3,2,1
01-05-2024,TN-96,x,,2,2,2,2
";
        let load = load_sheet(sheet.as_bytes()).unwrap();
        assert!(load.skipped.is_empty());
        assert_eq!(load.observations.len(), 2);

        let first = &load.observations[0];
        assert_eq!(first.key(), (d(1), "TN-95"));
        assert_eq!(first.counts.installed_type_a, 120);
        assert_eq!(first.counts.total_workforce(), 12);

        let second = &load.observations[1];
        assert_eq!(second.counts.installed_type_a, 0);
        assert_eq!(second.counts.installed_type_b, 0);
        assert_eq!(second.counts.workforce_d, 2);
    }

    #[test]
    fn test_load_long_format_sums_meter_types() {
        let sheet = "\
date,package,Meter_Type,Installed
2024-05-02,TN-95,WC-MI,30
2024-05-02,TN-95,DT,7
";
        let load = load_sheet(sheet.as_bytes()).unwrap();
        assert_eq!(load.observations.len(), 1);
        let counts = load.observations[0].counts;
        assert_eq!(counts.installed_type_a, 30);
        assert_eq!(counts.installed_type_b, 7);
    }

    #[test]
    fn test_load_long_format_ignores_pending_and_planned() {
        let sheet = "\
date,package,Meter_Type,Installed,Pending,Planned
2024-05-02,TN-96,WC-MI,12,40,52
2024-05-02,TN-96,DT,3,1,4
";
        let load = load_sheet(sheet.as_bytes()).unwrap();
        assert!(load.skipped.is_empty());
        let counts = load.observations[0].counts;
        assert_eq!(counts.total_installed(), 15);
        assert_eq!(counts.total_workforce(), 0);
    }

    #[test]
    fn test_load_skips_bad_dates() {
        let sheet = "\
date,package,installed_type_a
someday,TN-95,1
2024-05-03,,1
2024-05-03,TN-95,1
";
        let load = load_sheet(sheet.as_bytes()).unwrap();
        assert_eq!(load.observations.len(), 1);
        assert_eq!(load.skipped.len(), 2);
    }

    #[test]
    fn test_csv_and_json_stores_share_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let csv_repo = CsvObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();
        let json_repo =
            crate::repository::FileObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();

        csv_repo.upsert(Observation::new(d(1), "TN-95", Counts { installed_type_b: 3, ..Counts::default() })).unwrap();
        json_repo.upsert(Observation::new(d(2), "TN-96", Counts::default())).unwrap();

        assert!(!dir.path().join("observations.tmp").exists());
        assert_eq!(csv_repo.list().unwrap().len(), 1);
        assert_eq!(json_repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_csv_store_upsert_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = CsvObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();
        assert!(repo.list().unwrap().is_empty());

        let mut counts = Counts { installed_type_a: 5, workforce_c: 2, ..Counts::default() };
        repo.upsert(Observation::new(d(4), "TN-97", counts)).unwrap();
        counts.installed_type_a = 9;
        repo.upsert(Observation::new(d(4), "TN-97", counts)).unwrap();

        let all = repo.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].counts, counts);
        assert_eq!(repo.get(d(4), "TN-97").unwrap().unwrap().counts.workforce_c, 2);
    }
}
