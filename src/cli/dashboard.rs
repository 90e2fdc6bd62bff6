use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph},
    Frame,
};

use crate::error::Result;
use crate::fmt::{amount, compact, percent};
use crate::loader::DataSource;
use crate::scheduler::{refresh, Refresh, RefreshTimer};
use crate::settings::Settings;
use crate::tui::{
    amount_span, run_app, App, AppAction, CURRENT_WEEK_COLOR, ERROR_STYLE, FOOTER_STYLE,
    HEADER_STYLE, OFFERED_COLOR, REALIZED_COLOR, TARGET_COLOR,
};

/// Longest wait between redraws, so the countdown in the footer keeps moving.
const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

struct Dashboard {
    settings: Settings,
    source: DataSource,
    timer: RefreshTimer,
    latest: Option<Refresh>,
    last_error: Option<String>,
}

impl Dashboard {
    fn new(settings: Settings, source: DataSource) -> Self {
        let interval = Duration::from_secs(settings.refresh_secs.max(1));
        Self {
            settings,
            source,
            timer: RefreshTimer::new(interval),
            latest: None,
            last_error: None,
        }
    }

    /// Run one cycle. On failure the previous snapshot stays on screen.
    fn refresh_now(&mut self) {
        self.timer.mark(Instant::now());
        match refresh(&self.source, &self.settings, chrono::Local::now()) {
            Ok(result) => {
                if self
                    .latest
                    .as_ref()
                    .is_some_and(|prev| prev.fingerprint == result.fingerprint)
                {
                    tracing::debug!("source data unchanged since last refresh");
                }
                self.latest = Some(result);
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed, keeping previous snapshot");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn draw_chart(&self, frame: &mut Frame, area: Rect, data: &Refresh) {
        let snap = &data.snapshot;
        let start = self.settings.start_week as f64;
        let end = self.settings.end_week as f64;
        let (x_min, x_max) = if start == end {
            (start - 0.5, end + 0.5)
        } else {
            (start, end)
        };

        let realized: Vec<(f64, f64)> = snap
            .weekly_realized
            .iter()
            .map(|(w, v)| (*w as f64, *v))
            .collect();
        let offered: Vec<(f64, f64)> = snap
            .weekly_offered
            .iter()
            .map(|(w, v)| (*w as f64, *v))
            .collect();
        let target = [
            (x_min, snap.dynamic_weekly_target),
            (x_max, snap.dynamic_weekly_target),
        ];

        let max_val = realized
            .iter()
            .chain(offered.iter())
            .map(|(_, v)| *v)
            .fold(snap.dynamic_weekly_target, f64::max);
        let (top_tick, mid_tick) = y_axis_ticks(max_val);

        let current = snap.current_week as f64;
        let current_marker = [(current, 0.0), (current, top_tick)];

        let mut datasets = vec![
            Dataset::default()
                .name("Offers sent")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(OFFERED_COLOR))
                .data(&offered),
            Dataset::default()
                .name("Weekly target")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(TARGET_COLOR))
                .data(&target),
            Dataset::default()
                .name("Realized")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(REALIZED_COLOR))
                .data(&realized),
        ];
        if (x_min..=x_max).contains(&current) {
            datasets.push(
                Dataset::default()
                    .name("Current week")
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(CURRENT_WEEK_COLOR))
                    .data(&current_marker),
            );
        }

        let week_labels: Vec<Span> = week_label_positions(self.settings.start_week, self.settings.end_week)
            .into_iter()
            .map(|w| {
                if w == snap.current_week {
                    Span::styled(
                        format!("W{w}"),
                        Style::default()
                            .fg(CURRENT_WEEK_COLOR)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw(format!("W{w}"))
                }
            })
            .collect();

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .title("Weekly realization")
                    .title_style(Style::default().add_modifier(Modifier::BOLD))
                    .borders(Borders::NONE),
            )
            .x_axis(
                Axis::default()
                    .style(FOOTER_STYLE)
                    .bounds([x_min, x_max])
                    .labels(week_labels),
            )
            .y_axis(
                Axis::default()
                    .style(FOOTER_STYLE)
                    .bounds([0.0, top_tick])
                    .labels(vec![
                        Span::raw("0"),
                        Span::raw(compact(mid_tick)),
                        Span::raw(compact(top_tick)),
                    ]),
            );
        frame.render_widget(chart, area);
    }

    fn draw_goal_panel(&self, frame: &mut Frame, area: Rect, data: &Refresh) {
        let snap = &data.snapshot;
        let currency = &self.settings.currency;

        let [gauge_area, text_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Fill(1)]).areas(area);

        let gauge = Gauge::default()
            .block(Block::default().title("Goal completion").borders(Borders::ALL))
            .gauge_style(Style::default().fg(REALIZED_COLOR))
            .ratio(snap.goal_fraction.clamp(0.0, 1.0))
            .label(percent(snap.goal_fraction));
        frame.render_widget(gauge, gauge_area);

        let hr = &snap.hit_rate;
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("Hit rate: {:.1}%", hr.rate),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "(Sold: {}, Rejected: {}, Offers: {})",
                    hr.approved, hr.rejected, hr.offered
                ),
                FOOTER_STYLE,
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw("Weekly target  "),
                Span::styled(
                    amount(snap.dynamic_weekly_target, currency),
                    Style::default().fg(TARGET_COLOR),
                ),
            ]),
            Line::from(format!(
                "Week {}, {} weeks left",
                snap.current_week, snap.remaining_weeks
            )),
        ];
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), text_area);
    }

    fn draw_cards(&self, frame: &mut Frame, area: Rect, data: &Refresh) {
        let snap = &data.snapshot;
        let currency = &self.settings.currency;
        let columns: [Rect; 5] = Layout::horizontal([Constraint::Ratio(1, 5); 5]).areas(area);

        let mut cards: Vec<(String, String, f64)> = snap
            .top_products
            .iter()
            .map(|p| (p.name.clone(), format!("{} sold", p.count), p.total))
            .collect();
        while cards.len() < 3 {
            cards.push((String::from("-"), String::new(), 0.0));
        }
        cards.push((
            "Offers sent".to_string(),
            format!("{} open", snap.offered_count),
            snap.offered_total,
        ));
        cards.push((
            "Products sold".to_string(),
            format!("{} sold", snap.total_count),
            snap.total_sold,
        ));

        for ((title, subtitle, total), col) in cards.into_iter().zip(columns) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(FOOTER_STYLE)
                .title(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)))
                .title_alignment(Alignment::Center);
            let body = vec![
                Line::from(subtitle),
                Line::from(amount_span(total, currency)),
            ];
            frame.render_widget(
                Paragraph::new(body).alignment(Alignment::Center).block(block),
                col,
            );
        }
    }

    fn draw_progress(&self, frame: &mut Frame, area: Rect, data: &Refresh) {
        let snap = &data.snapshot;
        let currency = &self.settings.currency;
        let label = format!(
            "{} / {}",
            amount(snap.total_sold, currency),
            amount(snap.goal, currency)
        );
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(format!("Total: {}", amount(snap.total_sold, currency)))
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_style(FOOTER_STYLE),
            )
            .gauge_style(Style::default().fg(REALIZED_COLOR))
            .ratio(snap.goal_fraction.clamp(0.0, 1.0))
            .label(label);
        frame.render_widget(gauge, area);
    }

    fn footer_line(&self) -> Line<'static> {
        let remaining = self.timer.remaining(Instant::now()).as_secs();
        let countdown = format!("next refresh in {}:{:02}", remaining / 60, remaining % 60);
        if let Some(err) = &self.last_error {
            let shown = match &self.latest {
                Some(r) => format!(" (showing data from {})", r.refreshed_at.format("%H:%M:%S")),
                None => String::new(),
            };
            return Line::from(Span::styled(
                format!(" Refresh failed: {err}{shown}  {countdown}  r=retry  q=quit"),
                ERROR_STYLE,
            ));
        }
        let refreshed = self
            .latest
            .as_ref()
            .map(|r| {
                let skipped = r.skips.bad_prices + r.skips.bad_dates;
                let mut text = format!("updated {}, {} rows", r.refreshed_at.format("%H:%M:%S"), r.rows);
                if skipped > 0 {
                    text.push_str(&format!(" ({skipped} unreadable values)"));
                }
                text
            })
            .unwrap_or_else(|| "loading".to_string());
        Line::from(Span::styled(
            format!(" {refreshed}  {countdown}  r=refresh  q=quit"),
            FOOTER_STYLE,
        ))
    }
}

impl App for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, sep, main_area, cards_area, progress_area, footer_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", self.settings.title)).style(HEADER_STYLE),
            header_area,
        );
        let sep_line = "━".repeat(area.width as usize);
        frame.render_widget(Paragraph::new(sep_line).style(FOOTER_STYLE), sep);

        if let Some(data) = &self.latest {
            let [chart_area, goal_area] =
                Layout::horizontal([Constraint::Percentage(67), Constraint::Percentage(33)])
                    .areas(main_area);
            self.draw_chart(frame, chart_area, data);
            self.draw_goal_panel(frame, goal_area, data);
            self.draw_cards(frame, cards_area, data);
            self.draw_progress(frame, progress_area, data);
        } else {
            let msg = if self.last_error.is_some() {
                " No data yet."
            } else {
                " Fetching sales data..."
            };
            frame.render_widget(Paragraph::new(msg), main_area);
        }

        frame.render_widget(Paragraph::new(self.footer_line()), footer_area);
    }

    fn handle_key(&mut self, code: KeyCode) -> AppAction {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => AppAction::Quit,
            KeyCode::Char('r') => {
                self.refresh_now();
                AppAction::Continue
            }
            _ => AppAction::Continue,
        }
    }

    fn tick(&mut self) -> bool {
        if self.timer.is_due(Instant::now()) {
            self.refresh_now();
            return true;
        }
        false
    }

    fn poll_timeout(&self) -> Duration {
        self.timer.remaining(Instant::now()).min(REDRAW_INTERVAL)
    }
}

/// Pick round y-axis tick values (top and mid) for the largest plotted value.
fn y_axis_ticks(max_val: f64) -> (f64, f64) {
    let steps = [
        1000.0, 2500.0, 5000.0, 10000.0, 25000.0, 50000.0, 100000.0, 250000.0, 500000.0,
        1000000.0, 2500000.0, 5000000.0, 10000000.0,
    ];
    let top = steps
        .iter()
        .copied()
        .find(|&s| s >= max_val)
        .unwrap_or(max_val);
    (top, top / 2.0)
}

/// Weeks that get an x-axis label. Ratatui spreads labels evenly, so long
/// ranges only label the ends and the middle.
fn week_label_positions(start: u32, end: u32) -> Vec<u32> {
    if end - start < 12 {
        (start..=end).collect()
    } else {
        vec![start, start + (end - start) / 2, end]
    }
}

pub fn run(settings: Settings) -> Result<()> {
    let source = super::prepare(&settings)?;
    tracing::info!(source = %source.describe(), refresh_secs = settings.refresh_secs, "starting dashboard");
    let mut dashboard = Dashboard::new(settings, source);
    run_app(&mut dashboard)
}
