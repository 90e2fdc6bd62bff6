use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::importer::{parse_records, CoercionSkips};
use crate::loader::DataSource;
use crate::reports::{build_report, current_iso_week, ReportSnapshot};
use crate::settings::Settings;

/// Fixed-interval trigger for refresh cycles. The caller owns the clock so
/// the timer can be driven by any event loop.
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    interval: Duration,
    last_run: Option<Instant>,
}

impl RefreshTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// True before the first cycle and whenever a full interval has elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_run {
            None => Duration::ZERO,
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// Record that a cycle ran at `now`, successful or not.
    pub fn mark(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}

/// Everything one refresh cycle produces.
pub struct Refresh {
    pub snapshot: ReportSnapshot,
    pub fingerprint: String,
    pub rows: usize,
    pub skips: CoercionSkips,
    pub refreshed_at: DateTime<Local>,
}

/// One full cycle: validate configuration, fetch, coerce, aggregate.
pub fn refresh(source: &DataSource, settings: &Settings, now: DateTime<Local>) -> Result<Refresh> {
    let config = settings.report_config();
    config.validate()?;

    let fetched = source.fetch()?;
    let parsed = parse_records(&fetched.table, &settings.columns)?;
    let current_week = current_iso_week(now.date_naive());
    let snapshot = build_report(&parsed.records, &config, current_week)?;

    tracing::info!(
        rows = fetched.table.rows.len(),
        bad_prices = parsed.skips.bad_prices,
        bad_dates = parsed.skips.bad_dates,
        total_sold = snapshot.total_sold,
        current_week,
        "refresh complete"
    );

    Ok(Refresh {
        snapshot,
        fingerprint: fetched.fingerprint,
        rows: fetched.table.rows.len(),
        skips: parsed.skips,
        refreshed_at: now,
    })
}
