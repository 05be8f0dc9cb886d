use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::aggregate::{AggregatedRow, AggregatedSeries};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakDay {
    pub date: NaiveDate,
    pub value: u64,
}

/// Scalar figures shown above the chart.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kpis {
    pub grand_total_installed: u64,
    pub grand_total_workforce: u64,
    pub total_type_a: u64,
    pub total_type_b: u64,
    pub peak_installed_day: PeakDay,
    pub peak_workforce_day: PeakDay,
    pub peak_type_a_day: PeakDay,
    pub peak_type_b_day: PeakDay,
}

impl Kpis {
    pub fn from_series(series: &AggregatedSeries) -> Self {
        let rows = &series.rows;
        let first = rows.first().map_or(series.start, |r| r.date);
        Self {
            grand_total_installed: total_by(rows, |r| r.total_installed),
            grand_total_workforce: total_by(rows, |r| r.total_workforce),
            total_type_a: total_by(rows, |r| r.counts.installed_type_a),
            total_type_b: total_by(rows, |r| r.counts.installed_type_b),
            peak_installed_day: peak_by(rows, first, |r| r.total_installed),
            peak_workforce_day: peak_by(rows, first, |r| r.total_workforce),
            peak_type_a_day: peak_by(rows, first, |r| r.counts.installed_type_a),
            peak_type_b_day: peak_by(rows, first, |r| r.counts.installed_type_b),
        }
    }
}

fn total_by<F>(rows: &[AggregatedRow], value: F) -> u64
where
    F: Fn(&AggregatedRow) -> u64,
{
    rows.iter().map(value).fold(0, u64::saturating_add)
}

/// Highest value, earliest date on ties. With no positive value the first
/// date is reported with zero.
pub fn peak_by<F>(rows: &[AggregatedRow], fallback: NaiveDate, value: F) -> PeakDay
where
    F: Fn(&AggregatedRow) -> u64,
{
    let mut best = PeakDay { date: fallback, value: 0 };
    let mut seen = false;
    for row in rows {
        let v = value(row);
        if !seen || v > best.value {
            best = PeakDay { date: row.date, value: v };
            seen = true;
        }
    }
    best
}

/// `12345` → `12.3k`; below a thousand the plain integer.
pub fn format_k(value: u64) -> String {
    if value >= 1000 {
        format!("{:.1}k", value as f64 / 1000.0)
    } else {
        value.to_string()
    }
}
