use std::time::{Duration, Instant};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::{amount, percent};
use crate::reports::ReportSnapshot;
use crate::scheduler::{refresh, RefreshTimer};
use crate::settings::Settings;

pub fn summary_table(snapshot: &ReportSnapshot, currency: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Sold".green().bold()),
        Cell::new(format!(
            "{} ({} sold)",
            amount(snapshot.total_sold, currency),
            snapshot.total_count
        )),
    ]);
    table.add_row(vec![Cell::new("Goal"), Cell::new(amount(snapshot.goal, currency))]);
    table.add_row(vec![
        Cell::new("Completion".bold()),
        Cell::new(percent(snapshot.goal_fraction)),
    ]);
    table.add_row(vec![
        Cell::new("Remaining"),
        Cell::new(amount(snapshot.remaining_goal, currency)),
    ]);
    table.add_row(vec![
        Cell::new("Weekly target".red().bold()),
        Cell::new(format!(
            "{} ({} weeks left after week {})",
            amount(snapshot.dynamic_weekly_target, currency),
            snapshot.remaining_weeks,
            snapshot.current_week
        )),
    ]);
    table.add_row(vec![
        Cell::new("Offers sent"),
        Cell::new(format!(
            "{} ({} open)",
            amount(snapshot.offered_total, currency),
            snapshot.offered_count
        )),
    ]);
    let hr = &snapshot.hit_rate;
    table.add_row(vec![
        Cell::new("Hit rate".bold()),
        Cell::new(format!(
            "{:.1}% (sold: {}, rejected: {}, offers: {})",
            hr.rate, hr.approved, hr.rejected, hr.offered
        )),
    ]);
    table
}

pub fn weekly_table(snapshot: &ReportSnapshot, currency: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Week", "Realized", "Offers sent"]);
    for (week, realized) in &snapshot.weekly_realized {
        let offered = snapshot.weekly_offered.get(week).copied().unwrap_or(0.0);
        let label = if *week == snapshot.current_week {
            format!("{week} *")
        } else {
            week.to_string()
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(amount(*realized, currency)),
            Cell::new(amount(offered, currency)),
        ]);
    }
    table
}

pub fn products_table(snapshot: &ReportSnapshot, currency: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Product", "Sold", "Total"]);
    for (i, product) in snapshot.top_products.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&product.name),
            Cell::new(product.count),
            Cell::new(amount(product.total, currency)),
        ]);
    }
    table
}

pub fn render_text(title: &str, snapshot: &ReportSnapshot, currency: &str) -> String {
    format!(
        "{}\n{}\n\nWeekly\n{}\n\nTop products\n{}",
        title.bold(),
        summary_table(snapshot, currency),
        weekly_table(snapshot, currency),
        products_table(snapshot, currency),
    )
}

fn print_once(settings: &Settings, source: &crate::loader::DataSource, json: bool) -> Result<()> {
    let result = refresh(source, settings, chrono::Local::now())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result.snapshot)?);
    } else {
        println!("{}", render_text(&settings.title, &result.snapshot, &settings.currency));
    }
    Ok(())
}

pub fn run(settings: &Settings, json: bool, watch: bool) -> Result<()> {
    let source = super::prepare(settings)?;
    if !watch {
        return print_once(settings, &source, json);
    }

    let mut timer = RefreshTimer::new(Duration::from_secs(settings.refresh_secs.max(1)));
    loop {
        let now = Instant::now();
        if timer.is_due(now) {
            timer.mark(now);
            // A failed cycle is reported and retried on the next tick.
            if let Err(e) = print_once(settings, &source, json) {
                tracing::warn!(error = %e, "refresh failed");
                eprintln!("Error: {e}");
            }
        }
        std::thread::sleep(timer.remaining(Instant::now()));
    }
}
