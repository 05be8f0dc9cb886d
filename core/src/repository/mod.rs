pub mod sheet;
pub mod file;
pub mod sqlite;
pub mod traits;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::StoreBackend;

// Re-export
pub use sheet::{load_sheet, load_sheet_file, CsvObservationRepository, SheetLoad};
pub use file::FileObservationRepository;
pub use sqlite::SqliteObservationRepository;
pub use traits::ObservationRepository;

/// Opens the store selected by configuration.
pub fn open(backend: StoreBackend, data_dir: Option<PathBuf>) -> Result<Box<dyn ObservationRepository>> {
    let repo: Box<dyn ObservationRepository> = match backend {
        StoreBackend::Json => Box::new(FileObservationRepository::new(data_dir)?),
        StoreBackend::Csv => Box::new(CsvObservationRepository::new(data_dir)?),
        StoreBackend::Sqlite => Box::new(SqliteObservationRepository::new(data_dir)?),
    };
    Ok(repo)
}
