pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod repository;
pub mod service;
pub mod time;
pub mod usecase;

pub use config::{Config, StoreBackend};
pub use error::DashboardError;
pub use input::{expand_key, parse_args, parse_non_negative_int, ParsedInput};
pub use model::aggregate::{AggregatedRow, AggregatedSeries};
pub use model::observation::{Counts, Observation};
pub use model::package::PackageCatalog;
pub use model::request::{DashboardRequest, ViewMode};
pub use repository::{
    CsvObservationRepository, FileObservationRepository, ObservationRepository, SqliteObservationRepository,
};
pub use service::admin::{ImportReport, ObservationForm};
pub use service::aggregation::aggregate;
pub use service::dashboard_service::DashboardService;
pub use service::dto::{ChartSeries, DashboardView, DisplayTable, Metric};
pub use service::metrics::{format_k, Kpis, PeakDay};
pub use time::{parse_report_date, today};
pub use usecase::dashboard::{DashboardOutcome, DashboardUseCase, SubmitOutcome};
