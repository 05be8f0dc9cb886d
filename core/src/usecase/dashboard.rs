use chrono::NaiveDate;
use tracing::warn;

use crate::error::DashboardError;
use crate::model::observation::Observation;
use crate::model::request::DashboardRequest;
use crate::repository::ObservationRepository;
use crate::service::admin::ObservationForm;
use crate::service::dashboard_service::DashboardService;
use crate::service::dto::DashboardView;

/// What one render cycle produced. Failures are already turned into text.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardOutcome {
    Ready(Box<DashboardView>),
    /// The request itself was wrong; nothing was aggregated.
    Rejected(String),
    /// The store could not be read; show "no data" with the reason.
    Unavailable(String),
}

impl DashboardOutcome {
    pub fn view(&self) -> Option<&DashboardView> {
        match self {
            DashboardOutcome::Ready(view) => Some(view.as_ref()),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            DashboardOutcome::Ready(_) => None,
            DashboardOutcome::Rejected(msg) | DashboardOutcome::Unavailable(msg) => Some(msg.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved(Observation),
    Rejected(String),
    Failed(String),
}

impl SubmitOutcome {
    pub fn message(&self) -> String {
        match self {
            SubmitOutcome::Saved(o) => format!(
                "Saved {} {}: {} installed, {} manpower",
                o.date,
                o.package,
                o.counts.total_installed(),
                o.counts.total_workforce()
            ),
            SubmitOutcome::Rejected(msg) => format!("Rejected: {}", msg),
            SubmitOutcome::Failed(msg) => format!("Not saved: {}", msg),
        }
    }
}

/// Boundary of a single render or submit: nothing past here returns an error.
pub struct DashboardUseCase<'a, R: ObservationRepository> {
    service: &'a mut DashboardService<R>,
}

impl<'a, R: ObservationRepository> DashboardUseCase<'a, R> {
    pub fn new(service: &'a mut DashboardService<R>) -> Self {
        Self { service }
    }

    pub fn render(&mut self, request: &DashboardRequest) -> DashboardOutcome {
        match self.service.view(request) {
            Ok(view) => DashboardOutcome::Ready(Box::new(view)),
            Err(e) if e.is_validation() => DashboardOutcome::Rejected(e.to_string()),
            Err(e) => {
                warn!(error = %e, "dashboard degraded to no data");
                DashboardOutcome::Unavailable(e.to_string())
            }
        }
    }

    pub fn submit(&mut self, form: &ObservationForm, today: NaiveDate) -> SubmitOutcome {
        match self.service.submit(form, today) {
            Ok(observation) => SubmitOutcome::Saved(observation),
            Err(e @ DashboardError::StoreUnavailable(_)) => SubmitOutcome::Failed(e.to_string()),
            Err(e) => SubmitOutcome::Rejected(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::package::PackageCatalog;
    use crate::model::request::ViewMode;
    use crate::repository::SqliteObservationRepository;
    use crate::service::dto::Metric;
    use anyhow::{anyhow, Result};

    struct UnreachableRepo;

    impl ObservationRepository for UnreachableRepo {
        fn list(&self) -> Result<Vec<Observation>> {
            Err(anyhow!("connection refused"))
        }
        fn get(&self, _date: NaiveDate, _package: &str) -> Result<Option<Observation>> {
            Err(anyhow!("connection refused"))
        }
        fn upsert(&self, _observation: Observation) -> Result<()> {
            Err(anyhow!("connection refused"))
        }
        fn describe(&self) -> String {
            "unreachable".to_string()
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn sqlite_service() -> DashboardService<SqliteObservationRepository> {
        DashboardService::new(SqliteObservationRepository::in_memory().unwrap(), PackageCatalog::default())
    }

    fn submit(svc: &mut DashboardService<SqliteObservationRepository>, args: &[&str]) -> SubmitOutcome {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let (form, warnings) = ObservationForm::from_args(&args);
        assert!(warnings.is_empty(), "{:?}", warnings);
        DashboardUseCase::new(svc).submit(&form, d(20))
    }

    #[test]
    fn test_render_end_to_end() {
        let mut svc = sqlite_service();
        submit(&mut svc, &["date:2024-05-01", "pkg:TN-95", "wc:10", "dt:2", "ci:3", "sup:1"]);
        submit(&mut svc, &["date:2024-05-01", "pkg:TN-96", "wc:20", "mi:4"]);
        submit(&mut svc, &["date:2024-05-03", "pkg:TN-95", "wc:30"]);

        let outcome = DashboardUseCase::new(&mut svc).render(&DashboardRequest::new(d(1), d(4)));
        let view = outcome.view().expect("view");

        assert_eq!(view.series.len(), 4);
        assert_eq!(view.kpis.grand_total_installed, 62);
        assert_eq!(view.kpis.peak_installed_day.date, d(1));
        assert_eq!(view.kpis.peak_installed_day.value, 32);
        assert_eq!(view.kpis.peak_workforce_day.date, d(1));
        assert_eq!(view.table.columns.len(), 4);
        assert_eq!(view.table.rows[0].values, vec![32, 0, 30, 0]);
        assert_eq!(view.chart.total_workforce, vec![8, 0, 0, 0]);
    }

    #[test]
    fn test_render_filtered_category_view() {
        let mut svc = sqlite_service();
        submit(&mut svc, &["date:2024-05-01", "pkg:TN-95", "wc:10", "dt:2"]);
        submit(&mut svc, &["date:2024-05-01", "pkg:TN-96", "wc:20", "dt:9"]);

        let mut request = DashboardRequest::new(d(1), d(2));
        request.package = Some("TN-96".into());
        request.view_mode = ViewMode::TypeB;
        let outcome = DashboardUseCase::new(&mut svc).render(&request);
        let view = outcome.view().expect("view");

        assert_eq!(view.kpis.total_type_b, 9);
        assert_eq!(view.kpis.grand_total_installed, 29);
        assert!(!view.table.metrics().contains(&Metric::InstalledTypeA));
        assert_eq!(view.chart.installed_type_b, Some(vec![9, 0]));
    }

    #[test]
    fn test_render_rejects_inverted_range() {
        let mut svc = sqlite_service();
        let outcome = DashboardUseCase::new(&mut svc).render(&DashboardRequest::new(d(9), d(1)));
        assert!(matches!(outcome, DashboardOutcome::Rejected(_)));
        assert!(outcome.view().is_none());
        assert!(outcome.message().unwrap().contains("after end date"));
    }

    #[test]
    fn test_render_rejects_unknown_package() {
        let mut svc = sqlite_service();
        let mut request = DashboardRequest::new(d(1), d(2));
        request.package = Some("TN-00".into());
        let outcome = DashboardUseCase::new(&mut svc).render(&request);
        assert_eq!(outcome, DashboardOutcome::Rejected("unknown package 'TN-00'".to_string()));
    }

    #[test]
    fn test_unreachable_store_degrades() {
        let mut svc = DashboardService::new(UnreachableRepo, PackageCatalog::default());
        let mut usecase = DashboardUseCase::new(&mut svc);

        let outcome = usecase.render(&DashboardRequest::new(d(1), d(2)));
        assert!(matches!(outcome, DashboardOutcome::Unavailable(_)));

        let form = ObservationForm { package: "TN-95".into(), ..ObservationForm::default() };
        let submitted = usecase.submit(&form, d(1));
        assert!(matches!(submitted, SubmitOutcome::Failed(_)));
        assert!(submitted.message().contains("connection refused"));
    }

    #[test]
    fn test_submit_rejection_message() {
        let mut svc = sqlite_service();
        let form = ObservationForm { package: "nope".into(), ..ObservationForm::default() };
        let outcome = DashboardUseCase::new(&mut svc).submit(&form, d(1));
        assert_eq!(outcome.message(), "Rejected: unknown package 'nope'");
    }
}
