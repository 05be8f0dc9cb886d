use tabled::builder::Builder;
use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Alignment, Color, Modify, Style};
use tabled::{Table, Tabled};

use meterboard_core::{format_k, DashboardOutcome, DashboardView, ImportReport, Observation};

#[derive(Tabled)]
struct ObservationRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "WC-MI")]
    type_a: u64,
    #[tabled(rename = "DT")]
    type_b: u64,
    #[tabled(rename = "CI")]
    wf_a: u64,
    #[tabled(rename = "MI")]
    wf_b: u64,
    #[tabled(rename = "In-House")]
    wf_c: u64,
    #[tabled(rename = "Supervisory")]
    wf_d: u64,
}

pub fn show_observations(observations: &[Observation]) {
    if observations.is_empty() {
        println!("No records found.");
        return;
    }

    let rows = observations.iter().map(|o| ObservationRow {
        date: o.date.format("%Y-%m-%d").to_string(),
        package: o.package.clone(),
        type_a: o.counts.installed_type_a,
        type_b: o.counts.installed_type_b,
        wf_a: o.counts.workforce_a,
        wf_b: o.counts.workforce_b,
        wf_c: o.counts.workforce_c,
        wf_d: o.counts.workforce_d,
    });

    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    println!("{}", table);
}

pub fn show_outcome(outcome: &DashboardOutcome) {
    match outcome {
        DashboardOutcome::Ready(view) => show_view(view),
        DashboardOutcome::Rejected(msg) => println!("Error: {}", msg),
        DashboardOutcome::Unavailable(msg) => {
            println!("No data available.");
            println!("  {}", msg);
        }
    }
}

fn show_view(view: &DashboardView) {
    let request = &view.request;
    let kpis = &view.kpis;
    let scope = request.package.as_deref().unwrap_or("All packages");

    println!(
        "\n\x1b[1;36m{} progress\x1b[0m  {} → {}  ({})",
        request.view_mode.title(),
        request.start.format("%d-%b-%Y"),
        request.end.format("%d-%b-%Y"),
        scope
    );

    let mode = request.view_mode;
    let (total, peak) = if mode.shows_type_a() && mode.shows_type_b() {
        (kpis.grand_total_installed, kpis.peak_installed_day)
    } else if mode.shows_type_a() {
        (kpis.total_type_a, kpis.peak_type_a_day)
    } else {
        (kpis.total_type_b, kpis.peak_type_b_day)
    };
    println!(
        "  Installed: {}   Peak day: {} ({})   Peak manpower: {} ({})",
        format_k(total),
        peak.date.format("%d-%b"),
        format_k(peak.value),
        kpis.peak_workforce_day.date.format("%d-%b"),
        format_k(kpis.peak_workforce_day.value),
    );

    let mut builder = Builder::default();
    let mut header = vec!["Metric".to_string()];
    header.extend(view.table.columns.iter().cloned());
    builder.push_record(header);
    for row in &view.table.rows {
        let mut record = vec![row.label.clone()];
        record.extend(row.values.iter().map(|v| format_k(*v)));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN))
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()));
    println!("{}", table);
}

pub fn show_import(report: &ImportReport) {
    println!("Imported {} record(s).", report.applied);
    if !report.skipped.is_empty() {
        println!("Skipped {}:", report.skipped.len());
        for reason in &report.skipped {
            println!("  - {}", reason);
        }
    }
}
