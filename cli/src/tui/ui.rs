use meterboard_core::{format_k, DashboardView, Kpis, PeakDay, ViewMode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, BorderType, Borders, Chart, Dataset, GraphType, Paragraph, Row,
        Table,
    },
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::tui::app::{App, InputMode};

// --- THEME ---
struct Theme {
    primary: Color,
    muted: Color,
    text: Color,
    type_a: Color,
    type_b: Color,
    workforce: Color,
    alert: Color,
}

const THEME: Theme = Theme {
    primary: Color::Cyan,
    muted: Color::DarkGray,
    text: Color::White,
    type_a: Color::Blue,
    type_b: Color::Yellow,
    workforce: Color::Green,
    alert: Color::Red,
};

const DATE_COLUMN_WIDTH: u16 = 7;

pub fn draw(f: &mut Frame, app: &App) {
    let size = f.area();
    let input_height = if matches!(app.input_mode, InputMode::Editing) { 3 } else { 0 };

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Length(4),            // KPIs
            Constraint::Min(10),              // Charts
            Constraint::Length(11),           // Summary table
            Constraint::Length(input_height), // Admin entry
            Constraint::Length(1),            // Footer / status
        ])
        .split(size);

    draw_header(f, app, main_chunks[0]);

    match app.outcome.view() {
        Some(view) => {
            draw_kpis(f, view, main_chunks[1]);

            let chart_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(main_chunks[2]);
            draw_bars(f, view, chart_chunks[0]);
            draw_workforce(f, view, chart_chunks[1]);

            draw_table(f, view, main_chunks[3]);
        }
        None => {
            let msg = app.outcome.message().unwrap_or_default();
            let body = Paragraph::new(vec![
                Line::from(Span::styled("No data available", Style::default().add_modifier(Modifier::BOLD))),
                Line::from(""),
                Line::from(Span::styled(msg.to_string(), Style::default().fg(THEME.alert))),
            ])
            .alignment(Alignment::Center)
            .block(rounded(" Dashboard "));
            f.render_widget(body, main_chunks[2]);
        }
    }

    if matches!(app.input_mode, InputMode::Editing) {
        let input = Paragraph::new(app.input.as_str())
            .style(Style::default().fg(THEME.type_b))
            .block(rounded(" Record (key:value, Enter to save, Esc to cancel) "));
        f.render_widget(input, main_chunks[4]);
        let typed: String = app.input.chars().take(app.cursor_position).collect();
        let cursor_x = main_chunks[4].x + 1 + typed.width() as u16;
        f.set_cursor_position((cursor_x, main_chunks[4].y + 1));
    }

    let footer = match &app.status {
        Some(status) => Line::from(Span::styled(status.as_str(), Style::default().fg(THEME.text))),
        None => Line::from(vec![
            Span::styled("←/→ ", Style::default().fg(THEME.text)),
            Span::raw("range  "),
            Span::styled("+/- ", Style::default().fg(THEME.text)),
            Span::raw("width  "),
            Span::styled("p ", Style::default().fg(THEME.text)),
            Span::raw("package  "),
            Span::styled("v ", Style::default().fg(THEME.text)),
            Span::raw("view  "),
            Span::styled("a ", Style::default().fg(THEME.text)),
            Span::raw("record  "),
            Span::styled("q ", Style::default().fg(THEME.text)),
            Span::raw("quit"),
        ]),
    };
    f.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center).style(Style::default().fg(THEME.muted)),
        main_chunks[5],
    );
}

fn rounded(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(THEME.muted))
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let request = &app.request;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(1)])
        .split(area);

    let title = Paragraph::new(Span::styled(
        format!("METERBOARD · {}", request.view_mode.title()),
        Style::default().fg(THEME.primary).add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(THEME.muted)));
    f.render_widget(title, chunks[0]);

    let nav = Paragraph::new(Line::from(vec![
        Span::styled(app.package_label().to_string(), Style::default().fg(THEME.type_b)),
        Span::raw("   "),
        Span::styled(" < ", Style::default().fg(THEME.text)),
        Span::styled(
            format!(
                "{} → {} ({}d)",
                request.start.format("%d-%b-%Y"),
                request.end.format("%d-%b-%Y"),
                request.span_days()
            ),
            Style::default().fg(THEME.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" > ", Style::default().fg(THEME.text)),
    ]))
    .alignment(Alignment::Right)
    .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(THEME.muted)));
    f.render_widget(nav, chunks[1]);
}

fn kpi_lines(label: &str, total: u64, peak: PeakDay, color: Color) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled(format!("{}: ", label), Style::default().fg(THEME.muted)),
            Span::styled(format_k(total), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::styled("Peak: ", Style::default().fg(THEME.muted)),
            Span::raw(format!("{} on {}", format_k(peak.value), peak.date.format("%d-%b"))),
        ]),
    ]
}

fn draw_kpis(f: &mut Frame, view: &DashboardView, area: Rect) {
    let kpis: &Kpis = &view.kpis;
    let mut cards = Vec::new();
    match view.request.view_mode {
        ViewMode::Combined => {
            cards.push(("Installed", kpis.grand_total_installed, kpis.peak_installed_day, THEME.primary));
            cards.push(("WC-MI", kpis.total_type_a, kpis.peak_type_a_day, THEME.type_a));
            cards.push(("DT", kpis.total_type_b, kpis.peak_type_b_day, THEME.type_b));
        }
        ViewMode::TypeA => cards.push(("WC-MI", kpis.total_type_a, kpis.peak_type_a_day, THEME.type_a)),
        ViewMode::TypeB => cards.push(("DT", kpis.total_type_b, kpis.peak_type_b_day, THEME.type_b)),
    }
    cards.push(("Manpower", kpis.grand_total_workforce, kpis.peak_workforce_day, THEME.workforce));

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, cards.len() as u32); cards.len()])
        .split(area);

    for (i, (label, total, peak, color)) in cards.into_iter().enumerate() {
        let card = Paragraph::new(kpi_lines(label, total, peak, color)).block(rounded(""));
        f.render_widget(card, chunks[i]);
    }
}

fn draw_bars(f: &mut Frame, view: &DashboardView, area: Rect) {
    let chart = &view.chart;
    let mut groups = Vec::new();

    for (i, date) in chart.dates.iter().enumerate() {
        let mut bars = Vec::new();
        if let Some(values) = &chart.installed_type_a {
            bars.push(
                Bar::default()
                    .value(values[i])
                    .style(Style::default().fg(THEME.type_a))
                    .text_value(if values[i] > 0 { format_k(values[i]) } else { String::new() }),
            );
        }
        if let Some(values) = &chart.installed_type_b {
            bars.push(
                Bar::default()
                    .value(values[i])
                    .style(Style::default().fg(THEME.type_b))
                    .text_value(if values[i] > 0 { format_k(values[i]) } else { String::new() }),
            );
        }
        let label = format!("{} {}", date.format("%d"), chart.total_labels[i]);
        groups.push((label, bars));
    }

    let title = Line::from(vec![
        Span::raw(" Installed per day  "),
        Span::styled("■ WC-MI ", Style::default().fg(THEME.type_a)),
        Span::styled("■ DT ", Style::default().fg(THEME.type_b)),
    ]);

    let mut bar_chart = BarChart::default()
        .block(rounded("").title(title))
        .bar_width(3)
        .bar_gap(0)
        .group_gap(2)
        .max(chart.max_bar().max(1));
    for (label, bars) in &groups {
        bar_chart = bar_chart.data(BarGroup::default().label(Line::from(label.as_str())).bars(bars));
    }

    f.render_widget(bar_chart, area);
}

fn draw_workforce(f: &mut Frame, view: &DashboardView, area: Rect) {
    let chart = &view.chart;
    let points: Vec<(f64, f64)> = chart
        .total_workforce
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v as f64))
        .collect();
    let max_y = chart.total_workforce.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;
    let max_x = (points.len().max(2) - 1) as f64;

    let first = chart.dates.first().map(|d| d.format("%d-%b").to_string()).unwrap_or_default();
    let last = chart.dates.last().map(|d| d.format("%d-%b").to_string()).unwrap_or_default();

    let dataset = Dataset::default()
        .name("Manpower")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(THEME.workforce))
        .data(&points);

    let line_chart = Chart::new(vec![dataset])
        .block(rounded(" Manpower "))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(THEME.muted))
                .bounds([0.0, max_x])
                .labels(vec![first, last]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(THEME.muted))
                .bounds([0.0, max_y])
                .labels(vec!["0".to_string(), format_k(max_y as u64)]),
        );
    f.render_widget(line_chart, area);
}

fn draw_table(f: &mut Frame, view: &DashboardView, area: Rect) {
    let table = &view.table;
    let label_width = table
        .rows
        .iter()
        .map(|r| r.label.as_str().width())
        .max()
        .unwrap_or(6)
        .max(6) as u16
        + 1;

    // Most recent days win when the window does not fit.
    let room = area.width.saturating_sub(label_width + 2) / (DATE_COLUMN_WIDTH + 1);
    let visible = (room as usize).min(table.columns.len());
    let skip = table.columns.len() - visible;

    let mut header = vec![Span::styled("Metric", Style::default().fg(THEME.muted))];
    header.extend(table.columns[skip..].iter().map(|c| Span::raw(c.clone())));

    let rows: Vec<Row> = table
        .rows
        .iter()
        .map(|r| {
            let mut cells = vec![Span::styled(r.label.clone(), Style::default().add_modifier(Modifier::BOLD))];
            cells.extend(r.values[skip..].iter().map(|v| Span::raw(format!("{:>6}", format_k(*v)))));
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(label_width)];
    widths.extend(std::iter::repeat(Constraint::Length(DATE_COLUMN_WIDTH)).take(visible));

    let widget = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().fg(THEME.type_b)))
        .block(rounded(" Daily Summary "));
    f.render_widget(widget, area);
}
