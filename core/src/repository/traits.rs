use anyhow::Result;
use chrono::NaiveDate;

use crate::model::observation::Observation;

pub trait ObservationRepository {
    /// Every stored row, sorted by date then package.
    fn list(&self) -> Result<Vec<Observation>>;
    fn get(&self, date: NaiveDate, package: &str) -> Result<Option<Observation>>;
    /// Inserts, or overwrites the counts of the row with the same `(date, package)`.
    fn upsert(&self, observation: Observation) -> Result<()>;
    fn describe(&self) -> String;
}

impl<R: ObservationRepository + ?Sized> ObservationRepository for Box<R> {
    fn list(&self) -> Result<Vec<Observation>> {
        (**self).list()
    }

    fn get(&self, date: NaiveDate, package: &str) -> Result<Option<Observation>> {
        (**self).get(date, package)
    }

    fn upsert(&self, observation: Observation) -> Result<()> {
        (**self).upsert(observation)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

pub(crate) fn sort_observations(observations: &mut [Observation]) {
    observations.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.package.cmp(&b.package)));
}

/// Applies upsert semantics to an in-memory row set.
pub(crate) fn merge_observation(observations: &mut Vec<Observation>, observation: Observation) {
    if let Some(pos) = observations.iter().position(|o| o.same_key(&observation)) {
        observations[pos].counts = observation.counts;
    } else {
        observations.push(observation);
    }
}
