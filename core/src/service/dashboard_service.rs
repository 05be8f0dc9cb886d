use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::DashboardError;
use crate::model::aggregate::AggregatedSeries;
use crate::model::observation::{Counts, Observation};
use crate::model::package::PackageCatalog;
use crate::model::request::DashboardRequest;
use crate::repository::{ObservationRepository, SheetLoad};
use crate::service::admin::{ImportReport, ObservationForm};
use crate::service::aggregation::aggregate;
use crate::service::cache::{AggregationCache, CacheKey};
use crate::service::dto::DashboardView;

/// Read and write paths over one record store, sharing the aggregation cache.
pub struct DashboardService<R: ObservationRepository> {
    repo: R,
    catalog: PackageCatalog,
    cache: AggregationCache,
}

impl<R: ObservationRepository> DashboardService<R> {
    pub fn new(repo: R, catalog: PackageCatalog) -> Self {
        Self {
            repo,
            catalog,
            cache: AggregationCache::new(),
        }
    }

    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn cache(&self) -> &AggregationCache {
        &self.cache
    }

    /// Canonical package name for a filter, or `None` for all packages.
    pub fn resolve_package(&self, package: Option<&str>) -> Result<Option<String>, DashboardError> {
        package.map(|p| self.catalog.resolve(p)).transpose()
    }

    pub fn series(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        package: Option<&str>,
    ) -> Result<AggregatedSeries, DashboardError> {
        if start > end {
            return Err(DashboardError::InvalidRange { start, end });
        }
        let package = self.resolve_package(package)?;
        let key = CacheKey::new(start, end, package.as_deref());
        if let Some(series) = self.cache.get(&key) {
            return Ok(series.clone());
        }

        let observations = self.repo.list().map_err(|e| {
            warn!(store = %self.repo.describe(), error = %e, "read failed");
            DashboardError::store(e)
        })?;
        let series = aggregate(&observations, start, end, package.as_deref())?;
        self.cache.insert(key, series.clone());
        Ok(series)
    }

    pub fn view(&mut self, request: &DashboardRequest) -> Result<DashboardView, DashboardError> {
        request.validate()?;
        let series = self.series(request.start, request.end, request.package.as_deref())?;
        let mut request = request.clone();
        request.package = series.package.clone();
        Ok(DashboardView::build(request, series))
    }

    pub fn list(&self, package: Option<&str>) -> Result<Vec<Observation>, DashboardError> {
        let package = self.resolve_package(package)?;
        let mut observations = self.repo.list().map_err(DashboardError::store)?;
        if let Some(p) = package {
            observations.retain(|o| o.package == p);
        }
        Ok(observations)
    }

    /// Validates a form and upserts the result.
    pub fn submit(&mut self, form: &ObservationForm, today: NaiveDate) -> Result<Observation, DashboardError> {
        let observation = form.validate(&self.catalog, today)?;
        self.record(observation.clone())?;
        Ok(observation)
    }

    /// Upserts an already validated observation and drops cached aggregates.
    pub fn record(&mut self, observation: Observation) -> Result<(), DashboardError> {
        if !self.catalog.contains(&observation.package) {
            return Err(DashboardError::UnknownPackage(observation.package));
        }
        let (date, package) = (observation.date, observation.package.clone());
        self.repo.upsert(observation).map_err(|e| {
            warn!(store = %self.repo.describe(), error = %e, "write failed");
            DashboardError::store(e)
        })?;
        self.cache.invalidate();
        info!(%date, %package, "observation saved");
        Ok(())
    }

    /// Applies every sheet row as an admin write. Rows that only differ in the
    /// spelling of their package are summed first. Rows for unknown packages
    /// are skipped; a store failure stops the import.
    pub fn import(&mut self, load: SheetLoad) -> Result<ImportReport, DashboardError> {
        let mut report = ImportReport::default();
        for reason in load.skipped {
            report.skip(reason);
        }

        let mut merged: BTreeMap<(NaiveDate, String), Counts> = BTreeMap::new();
        for observation in load.observations {
            match self.catalog.resolve(&observation.package) {
                Ok(canonical) => merged
                    .entry((observation.date, canonical))
                    .or_default()
                    .add(&observation.counts),
                Err(e) => report.skip(format!("{} {}: {}", observation.date, observation.package, e)),
            }
        }

        let mut result = Ok(());
        for ((date, package), counts) in merged {
            if let Err(e) = self.repo.upsert(Observation::new(date, package, counts)) {
                result = Err(DashboardError::store(e));
                break;
            }
            report.applied += 1;
        }

        if report.applied > 0 {
            self.cache.invalidate();
        }
        info!(applied = report.applied, skipped = report.skipped.len(), "import finished");
        result.map(|_| report)
    }
}
