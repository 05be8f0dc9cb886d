use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::model::observation::{Counts, Observation};
use crate::repository::file::default_data_dir;
use crate::repository::traits::ObservationRepository;

const DEFAULT_FILE_NAME: &str = "observations.db";

const SELECT_COLUMNS: &str = "date, package, installed_type_a, installed_type_b, \
     workforce_a, workforce_b, workforce_c, workforce_d";

/// Observations in a SQLite table with a uniqueness constraint on `(date, package)`.
pub struct SqliteObservationRepository {
    db: Connection,
    label: String,
}

impl SqliteObservationRepository {
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let dir = match base_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        fs::create_dir_all(&dir).context("creating data directory")?;
        let db_path = dir.join(DEFAULT_FILE_NAME);
        let db = Connection::open(&db_path)
            .with_context(|| format!("opening database at {}", db_path.display()))?;
        db.execute_batch("PRAGMA journal_mode=WAL;")?;

        let repo = Self::with_connection(db, format!("sqlite:{}", db_path.display()))?;
        info!(path = %db_path.display(), "SQLite observation store opened");
        Ok(repo)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, "sqlite::memory:".to_string())
    }

    fn with_connection(db: Connection, label: String) -> Result<Self> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS observations (
                date TEXT NOT NULL,
                package TEXT NOT NULL,
                installed_type_a INTEGER NOT NULL DEFAULT 0,
                installed_type_b INTEGER NOT NULL DEFAULT 0,
                workforce_a INTEGER NOT NULL DEFAULT 0,
                workforce_b INTEGER NOT NULL DEFAULT 0,
                workforce_c INTEGER NOT NULL DEFAULT 0,
                workforce_d INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
                UNIQUE (date, package)
            );",
        )
        .context("creating observations table")?;
        Ok(Self { db, label })
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, [i64; 6])> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        [
            row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            row.get::<_, Option<i64>>(5)?.unwrap_or(0),
            row.get::<_, Option<i64>>(6)?.unwrap_or(0),
            row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        ],
    ))
}

fn to_observation((date, package, values): (String, String, [i64; 6])) -> Result<Observation> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .with_context(|| format!("bad date '{}' in observations table", date))?;
    let count = |v: i64| u64::try_from(v).unwrap_or(0);
    Ok(Observation::new(
        date,
        package,
        Counts {
            installed_type_a: count(values[0]),
            installed_type_b: count(values[1]),
            workforce_a: count(values[2]),
            workforce_b: count(values[3]),
            workforce_c: count(values[4]),
            workforce_d: count(values[5]),
        },
    ))
}

// `Observation::new` caps counts at `MAX_COUNT`, so this never clamps.
fn to_sql(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl ObservationRepository for SqliteObservationRepository {
    fn list(&self) -> Result<Vec<Observation>> {
        let mut stmt = self.db.prepare_cached(&format!(
            "SELECT {} FROM observations ORDER BY date, package",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_row)?;
        let mut observations = Vec::new();
        for row in rows {
            observations.push(to_observation(row?)?);
        }
        debug!(rows = observations.len(), "loaded observations");
        Ok(observations)
    }

    fn get(&self, date: NaiveDate, package: &str) -> Result<Option<Observation>> {
        let mut stmt = self.db.prepare_cached(&format!(
            "SELECT {} FROM observations WHERE date = ?1 AND package = ?2",
            SELECT_COLUMNS
        ))?;
        let row = stmt
            .query_row(params![date.format("%Y-%m-%d").to_string(), package], map_row)
            .optional()?;
        row.map(to_observation).transpose()
    }

    fn upsert(&self, observation: Observation) -> Result<()> {
        let c = observation.counts;
        self.db
            .execute(
                "INSERT INTO observations (date, package, installed_type_a, installed_type_b,
                     workforce_a, workforce_b, workforce_c, workforce_d, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, strftime('%s', 'now'))
                 ON CONFLICT(date, package) DO UPDATE SET
                     installed_type_a = ?3, installed_type_b = ?4,
                     workforce_a = ?5, workforce_b = ?6, workforce_c = ?7, workforce_d = ?8,
                     updated_at = strftime('%s', 'now')",
                params![
                    observation.date.format("%Y-%m-%d").to_string(),
                    observation.package,
                    to_sql(c.installed_type_a),
                    to_sql(c.installed_type_b),
                    to_sql(c.workforce_a),
                    to_sql(c.workforce_b),
                    to_sql(c.workforce_c),
                    to_sql(c.workforce_d),
                ],
            )
            .with_context(|| format!("upserting {} {}", observation.date, observation.package))?;
        debug!(date = %observation.date, package = %observation.package, "upserted observation");
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
