use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::DashboardError;
use crate::model::aggregate::{AggregatedRow, AggregatedSeries};
use crate::model::observation::{Counts, Observation};
use crate::time::calendar_days;

/// Sums observations per day over `start..=end`, optionally for one package,
/// and fills every day without data with a zero row.
pub fn aggregate(
    observations: &[Observation],
    start: NaiveDate,
    end: NaiveDate,
    package: Option<&str>,
) -> Result<AggregatedSeries, DashboardError> {
    if start > end {
        return Err(DashboardError::InvalidRange { start, end });
    }

    let mut by_date: BTreeMap<NaiveDate, Counts> = BTreeMap::new();
    let in_scope = observations
        .iter()
        .filter(|o| o.date >= start && o.date <= end)
        .filter(|o| package.map_or(true, |p| o.package == p));
    for observation in in_scope {
        by_date.entry(observation.date).or_default().add(&observation.counts);
    }
    let days_with_data = by_date.len();

    let rows: Vec<AggregatedRow> = calendar_days(start, end)
        .map(|date| match by_date.get(&date) {
            Some(counts) => AggregatedRow::new(date, *counts),
            None => AggregatedRow::zero(date),
        })
        .collect();

    debug!(
        %start,
        %end,
        package = package.unwrap_or("all"),
        days = rows.len(),
        days_with_data,
        "aggregated observations"
    );

    Ok(AggregatedSeries {
        start,
        end,
        package: package.map(str::to_string),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn obs(day: u32, package: &str, a: u64, b: u64, wf: [u64; 4]) -> Observation {
        Observation::new(
            d(day),
            package,
            Counts {
                installed_type_a: a,
                installed_type_b: b,
                workforce_a: wf[0],
                workforce_b: wf[1],
                workforce_c: wf[2],
                workforce_d: wf[3],
            },
        )
    }

    fn sample() -> Vec<Observation> {
        vec![
            obs(1, "TN-95", 10, 2, [3, 2, 1, 1]),
            obs(1, "TN-96", 5, 0, [1, 1, 0, 1]),
            obs(3, "TN-95", 7, 1, [2, 2, 2, 0]),
            obs(9, "TN-96", 100, 100, [9, 9, 9, 9]),
        ]
    }

    #[test]
    fn test_dense_length_matches_day_count() {
        let series = aggregate(&sample(), d(1), d(5), None).unwrap();
        assert_eq!(series.len(), 5);
        let dates: Vec<_> = series.dates().collect();
        assert_eq!(dates, vec![d(1), d(2), d(3), d(4), d(5)]);
    }

    #[test]
    fn test_sums_across_packages() {
        let series = aggregate(&sample(), d(1), d(3), None).unwrap();
        let day1 = series.rows[0];
        assert_eq!(day1.counts.installed_type_a, 15);
        assert_eq!(day1.counts.installed_type_b, 2);
        assert_eq!(day1.total_installed, 17);
        assert_eq!(day1.total_workforce, 10);

        let day2 = series.rows[1];
        assert_eq!(day2, AggregatedRow::zero(d(2)));
    }

    #[test]
    fn test_totals_are_exact_on_every_row() {
        let series = aggregate(&sample(), d(1), d(10), None).unwrap();
        for row in &series.rows {
            assert_eq!(row.total_installed, row.counts.installed_type_a + row.counts.installed_type_b);
            assert_eq!(
                row.total_workforce,
                row.counts.workforce_a + row.counts.workforce_b + row.counts.workforce_c + row.counts.workforce_d
            );
        }
    }

    #[test]
    fn test_package_filter() {
        let series = aggregate(&sample(), d(1), d(10), Some("TN-95")).unwrap();
        let installed: u64 = series.rows.iter().map(|r| r.total_installed).sum();
        assert_eq!(installed, 10 + 2 + 7 + 1);
        assert_eq!(series.package.as_deref(), Some("TN-95"));
    }

    #[test]
    fn test_empty_range_is_zero_filled() {
        let series = aggregate(&sample(), d(20), d(26), None).unwrap();
        assert_eq!(series.len(), 7);
        assert!(series.rows.iter().all(|r| r.counts.is_zero() && r.total_installed == 0));

        let nothing = aggregate(&[], d(1), d(1), None).unwrap();
        assert_eq!(nothing.len(), 1);
    }

    #[test]
    fn test_huge_counts_across_packages_saturate() {
        let huge = crate::input::parse_non_negative_int("18446744073709551615");
        let rows = vec![
            obs(1, "TN-95", huge, 0, [0; 4]),
            obs(1, "TN-96", huge, 1, [0; 4]),
            obs(1, "TN-97", huge, 0, [0; 4]),
        ];
        let series = aggregate(&rows, d(1), d(1), None).unwrap();
        assert_eq!(series.rows[0].counts.installed_type_a, u64::MAX);
        assert_eq!(series.rows[0].total_installed, u64::MAX);
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert_eq!(
            aggregate(&sample(), d(5), d(1), None),
            Err(DashboardError::InvalidRange { start: d(5), end: d(1) })
        );
    }
}
