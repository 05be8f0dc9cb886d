use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::aggregate::{AggregatedRow, AggregatedSeries};
use crate::model::request::{DashboardRequest, ViewMode};
use crate::service::metrics::{format_k, Kpis};
use crate::time::column_label;

/// Rows of the summary table, in display order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalInstalled,
    InstalledTypeA,
    InstalledTypeB,
    TotalWorkforce,
    WorkforceA,
    WorkforceB,
    WorkforceC,
    WorkforceD,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::TotalInstalled,
        Metric::InstalledTypeA,
        Metric::InstalledTypeB,
        Metric::TotalWorkforce,
        Metric::WorkforceA,
        Metric::WorkforceB,
        Metric::WorkforceC,
        Metric::WorkforceD,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalInstalled => "Total Installed",
            Metric::InstalledTypeA => "WC-MI",
            Metric::InstalledTypeB => "DT",
            Metric::TotalWorkforce => "Total Manpower",
            Metric::WorkforceA => "CI",
            Metric::WorkforceB => "MI",
            Metric::WorkforceC => "In-House",
            Metric::WorkforceD => "Supervisory",
        }
    }

    pub fn value(self, row: &AggregatedRow) -> u64 {
        match self {
            Metric::TotalInstalled => row.total_installed,
            Metric::InstalledTypeA => row.counts.installed_type_a,
            Metric::InstalledTypeB => row.counts.installed_type_b,
            Metric::TotalWorkforce => row.total_workforce,
            Metric::WorkforceA => row.counts.workforce_a,
            Metric::WorkforceB => row.counts.workforce_b,
            Metric::WorkforceC => row.counts.workforce_c,
            Metric::WorkforceD => row.counts.workforce_d,
        }
    }

    pub fn visible_in(self, mode: ViewMode) -> bool {
        match self {
            Metric::InstalledTypeA => mode.shows_type_a(),
            Metric::InstalledTypeB => mode.shows_type_b(),
            _ => true,
        }
    }
}

/// Per-date series for the chart: grouped bars per installation category,
/// a line for total workforce.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    pub dates: Vec<NaiveDate>,
    pub installed_type_a: Option<Vec<u64>>,
    pub installed_type_b: Option<Vec<u64>>,
    /// Bar-top labels, already `format_k`-ed.
    pub total_labels: Vec<String>,
    pub total_workforce: Vec<u64>,
}

impl ChartSeries {
    pub fn from_series(series: &AggregatedSeries, mode: ViewMode) -> Self {
        let rows = &series.rows;
        let pick = |f: fn(&AggregatedRow) -> u64| rows.iter().map(f).collect::<Vec<_>>();
        let type_a = pick(|r| r.counts.installed_type_a);
        let type_b = pick(|r| r.counts.installed_type_b);

        let totals = match mode {
            ViewMode::Combined => pick(|r| r.total_installed),
            ViewMode::TypeA => type_a.clone(),
            ViewMode::TypeB => type_b.clone(),
        };

        Self {
            dates: series.dates().collect(),
            total_labels: totals.into_iter().map(format_k).collect(),
            installed_type_a: mode.shows_type_a().then_some(type_a),
            installed_type_b: mode.shows_type_b().then_some(type_b),
            total_workforce: pick(|r| r.total_workforce),
        }
    }

    pub fn max_bar(&self) -> u64 {
        let a = self.installed_type_a.iter().flatten();
        let b = self.installed_type_b.iter().flatten();
        a.chain(b).copied().max().unwrap_or(0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub metric: Metric,
    pub label: String,
    pub values: Vec<u64>,
}

/// Metrics as rows, dates as columns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisplayTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl DisplayTable {
    pub fn from_series(series: &AggregatedSeries, mode: ViewMode) -> Self {
        let columns = series.dates().map(column_label).collect();
        let rows = Metric::ALL
            .iter()
            .filter(|m| m.visible_in(mode))
            .map(|&metric| TableRow {
                metric,
                label: metric.label().to_string(),
                values: series.rows.iter().map(|r| metric.value(r)).collect(),
            })
            .collect();
        Self { columns, rows }
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.rows.iter().map(|r| r.metric).collect()
    }
}

/// Everything a front end needs for one render.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub request: DashboardRequest,
    pub kpis: Kpis,
    pub chart: ChartSeries,
    pub table: DisplayTable,
    pub series: AggregatedSeries,
}

impl DashboardView {
    pub fn build(request: DashboardRequest, series: AggregatedSeries) -> Self {
        let mode = request.view_mode;
        Self {
            kpis: Kpis::from_series(&series),
            chart: ChartSeries::from_series(&series, mode),
            table: DisplayTable::from_series(&series, mode),
            request,
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::observation::Counts;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn series() -> AggregatedSeries {
        let rows = vec![
            AggregatedRow::new(
                d(6),
                Counts {
                    installed_type_a: 1200,
                    installed_type_b: 40,
                    workforce_a: 1,
                    workforce_b: 2,
                    workforce_c: 3,
                    workforce_d: 4,
                },
            ),
            AggregatedRow::zero(d(7)),
        ];
        AggregatedSeries { start: d(6), end: d(7), package: None, rows }
    }

    #[test]
    fn test_table_fixed_metric_order() {
        let table = DisplayTable::from_series(&series(), ViewMode::Combined);
        assert_eq!(table.columns, vec!["06-May", "07-May"]);
        assert_eq!(table.metrics(), Metric::ALL.to_vec());
        assert_eq!(table.rows[0].values, vec![1240, 0]);
        assert_eq!(table.rows[3].values, vec![10, 0]);
        assert_eq!(table.rows[7].label, "Supervisory");
    }

    #[test]
    fn test_table_category_view_hides_other_type() {
        let table = DisplayTable::from_series(&series(), ViewMode::TypeB);
        let metrics = table.metrics();
        assert!(!metrics.contains(&Metric::InstalledTypeA));
        assert!(metrics.contains(&Metric::InstalledTypeB));
        assert_eq!(metrics.len(), 7);
    }

    #[test]
    fn test_chart_series() {
        let chart = ChartSeries::from_series(&series(), ViewMode::Combined);
        assert_eq!(chart.dates, vec![d(6), d(7)]);
        assert_eq!(chart.installed_type_a, Some(vec![1200, 0]));
        assert_eq!(chart.installed_type_b, Some(vec![40, 0]));
        assert_eq!(chart.total_labels, vec!["1.2k", "0"]);
        assert_eq!(chart.total_workforce, vec![10, 0]);
        assert_eq!(chart.max_bar(), 1200);

        let only_dt = ChartSeries::from_series(&series(), ViewMode::TypeB);
        assert_eq!(only_dt.installed_type_a, None);
        assert_eq!(only_dt.total_labels, vec!["40", "0"]);
        assert_eq!(only_dt.max_bar(), 40);
    }
}
