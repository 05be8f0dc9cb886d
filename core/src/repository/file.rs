use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use tracing::{debug, info};

use crate::model::observation::Observation;
use crate::repository::traits::{merge_observation, sort_observations, ObservationRepository};

const DEFAULT_FILE_NAME: &str = "observations.json";

pub fn default_data_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home_dir.join(".meterboard"))
}

/// `observations.json` → `observations.json.<suffix>`, so stores sharing a
/// directory never share scratch files.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Replaces `path` in one step so readers never see a half-written file.
pub(crate) fn replace_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp_path = sibling(path, "tmp");
    {
        let file = File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Runs a read-modify-write of `path` while holding an exclusive advisory
/// lock on `<path>.lock`, so writers in other processes queue up behind it.
pub(crate) fn with_store_lock<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let lock_path = sibling(path, "lock");
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("opening {}", lock_path.display()))?;
    FileExt::lock_exclusive(&lock).with_context(|| format!("locking {}", lock_path.display()))?;
    let result = f();
    // Closing the handle releases the lock.
    drop(lock);
    result
}

/// Observations kept as a pretty-printed JSON array.
#[derive(Clone)]
pub struct FileObservationRepository {
    file_path: PathBuf,
}

impl FileObservationRepository {
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut path = match base_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        fs::create_dir_all(&path)
            .with_context(|| format!("creating data directory {}", path.display()))?;
        path.push(DEFAULT_FILE_NAME);

        with_store_lock(&path, || {
            if path.exists() {
                return Ok(());
            }
            replace_file(&path, |w| {
                serde_json::to_writer_pretty(w, &Vec::<Observation>::new())?;
                Ok(())
            })
        })?;

        info!(path = %path.display(), "JSON observation store opened");
        Ok(FileObservationRepository { file_path: path })
    }

    fn read_observations(&self) -> Result<Vec<Observation>> {
        let file = File::open(&self.file_path)
            .with_context(|| format!("opening {}", self.file_path.display()))?;
        let reader = BufReader::new(file);
        let observations = serde_json::from_reader(reader)
            .with_context(|| format!("parsing {}", self.file_path.display()))?;
        Ok(observations)
    }

    fn write_observations(&self, observations: &[Observation]) -> Result<()> {
        replace_file(&self.file_path, |w| {
            serde_json::to_writer_pretty(w, observations)?;
            Ok(())
        })
    }
}

impl ObservationRepository for FileObservationRepository {
    fn list(&self) -> Result<Vec<Observation>> {
        let mut observations = self.read_observations()?;
        sort_observations(&mut observations);
        debug!(rows = observations.len(), "loaded observations");
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
        format!("json:{}", self.file_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::observation::Counts;

    fn obs(day: u32, package: &str, a: u64) -> Observation {
        Observation::new(
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            package,
            Counts { installed_type_a: a, ..Counts::default() },
        )
    }

    #[test]
    fn test_new_creates_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();
        assert!(repo.list().unwrap().is_empty());
        assert!(dir.path().join(DEFAULT_FILE_NAME).exists());
    }

    #[test]
    fn test_upsert_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();

        repo.upsert(obs(1, "TN-95", 5)).unwrap();
        repo.upsert(obs(1, "TN-95", 9)).unwrap();

        let all = repo.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].counts.installed_type_a, 9);
    }

    #[test]
    fn test_list_sorted_by_date_then_package() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();

        repo.upsert(obs(3, "TN-96", 1)).unwrap();
        repo.upsert(obs(1, "TN-96", 1)).unwrap();
        repo.upsert(obs(1, "TN-95", 1)).unwrap();

        let keys: Vec<_> = repo
            .list()
            .unwrap()
            .iter()
            .map(|o| (o.date.format("%d").to_string(), o.package.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("01".to_string(), "TN-95".to_string()),
                ("01".to_string(), "TN-96".to_string()),
                ("03".to_string(), "TN-96".to_string()),
            ]
        );
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();
        repo.upsert(obs(1, "TN-95", 5)).unwrap();
        let before = fs::read_to_string(dir.path().join(DEFAULT_FILE_NAME)).unwrap();

        // A directory where the scratch file belongs makes the write fail.
        fs::create_dir(dir.path().join("observations.json.tmp")).unwrap();
        assert!(repo.upsert(obs(2, "TN-96", 9)).is_err());

        let after = fs::read_to_string(dir.path().join(DEFAULT_FILE_NAME)).unwrap();
        assert_eq!(after, before);
        let all = repo.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].counts.installed_type_a, 5);
    }

    #[test]
    fn test_concurrent_writers_keep_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();

        let handles: Vec<_> = ["TN-95", "TN-96"]
            .into_iter()
            .map(|package| {
                let repo = repo.clone();
                std::thread::spawn(move || {
                    for day in 1..=20 {
                        repo.upsert(obs(day, package, u64::from(day))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(repo.list().unwrap().len(), 40);
    }

    #[test]
    fn test_scratch_files_named_after_store() {
        let path = Path::new("/data/observations.json");
        assert_eq!(sibling(path, "tmp"), PathBuf::from("/data/observations.json.tmp"));
        assert_eq!(sibling(path, "lock"), PathBuf::from("/data/observations.json.lock"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileObservationRepository::new(Some(dir.path().to_path_buf())).unwrap();
        fs::write(dir.path().join(DEFAULT_FILE_NAME), "{ not json").unwrap();
        assert!(repo.list().is_err());
    }
}
