use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{Result, SalesError};
use crate::models::SaleRecord;
use crate::settings::StatusLabels;

/// Number of products shown in the ranking.
pub const TOP_PRODUCTS: usize = 3;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub goal: f64,
    pub start_week: u32,
    pub end_week: u32,
    pub product_catalog: Vec<String>,
    pub statuses: StatusLabels,
}

impl ReportConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.goal.is_finite() || self.goal < 0.0 {
            return Err(SalesError::Configuration(format!(
                "goal must be a non-negative amount, got {}",
                self.goal
            )));
        }
        for week in [self.start_week, self.end_week] {
            if !(1..=53).contains(&week) {
                return Err(SalesError::Configuration(format!(
                    "week {week} is outside 1..=53"
                )));
            }
        }
        if self.start_week > self.end_week {
            return Err(SalesError::Configuration(format!(
                "start week {} is after end week {}",
                self.start_week, self.end_week
            )));
        }
        Ok(())
    }

    pub fn weeks(&self) -> std::ops::RangeInclusive<u32> {
        self.start_week..=self.end_week
    }

    fn in_range(&self, week: u32) -> bool {
        self.weeks().contains(&week)
    }
}

pub fn current_iso_week(today: NaiveDate) -> u32 {
    today.iso_week().week()
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRate {
    /// Percentage in [0, 100].
    pub rate: f64,
    pub approved: usize,
    pub rejected: usize,
    pub offered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTotal {
    pub name: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub total_sold: f64,
    pub total_count: usize,
    pub goal: f64,
    pub goal_fraction: f64,
    pub weekly_realized: BTreeMap<u32, f64>,
    pub weekly_offered: BTreeMap<u32, f64>,
    pub offered_total: f64,
    pub offered_count: usize,
    pub current_week: u32,
    pub remaining_weeks: usize,
    pub remaining_goal: f64,
    pub dynamic_weekly_target: f64,
    pub hit_rate: HitRate,
    pub top_products: Vec<ProductTotal>,
}

// ---------------------------------------------------------------------------
// Status normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    Approved,
    Offer,
    Rejected,
}

/// First character upper case, the rest lower case.
pub fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Trim, capitalize and apply the typo allowlist, then classify. Statuses
/// outside the vocabulary return `None`.
pub fn normalize_status(raw: &str, labels: &StatusLabels) -> Option<StatusBucket> {
    let mut status = capitalize(raw.trim());
    if let Some(fixed) = labels
        .typos
        .iter()
        .find(|(typo, _)| capitalize(typo.trim()) == status)
        .map(|(_, fixed)| capitalize(fixed.trim()))
    {
        status = fixed;
    }
    if status == capitalize(labels.approved.trim()) {
        Some(StatusBucket::Approved)
    } else if status == capitalize(labels.offer.trim()) {
        Some(StatusBucket::Offer)
    } else if status == capitalize(labels.rejected.trim()) {
        Some(StatusBucket::Rejected)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A complete record whose raw status equals `label` exactly.
struct Sale<'a> {
    product: &'a str,
    price: f64,
    week: u32,
}

fn partition<'a>(records: &'a [SaleRecord], label: &str) -> Vec<Sale<'a>> {
    records
        .iter()
        .filter(|r| r.status.as_deref() == Some(label) && r.is_complete())
        .filter_map(|r| {
            Some(Sale {
                product: r.product.as_deref()?,
                price: r.price?,
                week: r.week()?,
            })
        })
        .collect()
}

fn weekly_series(sales: &[Sale], config: &ReportConfig) -> BTreeMap<u32, f64> {
    let mut series: BTreeMap<u32, f64> = config.weeks().map(|w| (w, 0.0)).collect();
    for sale in sales {
        if let Some(total) = series.get_mut(&sale.week) {
            *total += sale.price;
        }
    }
    series
}

fn dynamic_target(config: &ReportConfig, total_sold: f64, current_week: u32) -> (usize, f64, f64) {
    let remaining_weeks = config.weeks().filter(|w| *w > current_week).count();
    let remaining_goal = (config.goal - total_sold).max(0.0);
    let target = if remaining_weeks > 0 {
        remaining_goal / remaining_weeks as f64
    } else {
        remaining_goal
    };
    (remaining_weeks, remaining_goal, target)
}

fn hit_rate(records: &[SaleRecord], config: &ReportConfig) -> HitRate {
    let (mut approved, mut rejected, mut offered) = (0usize, 0usize, 0usize);
    for record in records {
        if !record.week().is_some_and(|w| config.in_range(w)) {
            continue;
        }
        let bucket = record
            .status
            .as_deref()
            .and_then(|s| normalize_status(s, &config.statuses));
        match bucket {
            Some(StatusBucket::Approved) => approved += 1,
            Some(StatusBucket::Rejected) => rejected += 1,
            Some(StatusBucket::Offer) => offered += 1,
            None => {}
        }
    }
    let total = approved + rejected + offered;
    let rate = if total > 0 {
        approved as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    HitRate {
        rate,
        approved,
        rejected,
        offered,
    }
}

fn top_products(approved: &[Sale], catalog: &[String]) -> Vec<ProductTotal> {
    let mut grouped: HashMap<&str, (f64, usize)> = HashMap::new();
    for sale in approved {
        let entry = grouped.entry(sale.product).or_default();
        entry.0 += sale.price;
        entry.1 += 1;
    }

    let mut ranked: Vec<ProductTotal> = catalog
        .iter()
        .map(|name| {
            let (total, count) = grouped.get(name.as_str()).copied().unwrap_or((0.0, 0));
            ProductTotal {
                name: name.clone(),
                total,
                count,
            }
        })
        .collect();
    // Stable sort: equal totals keep catalog order.
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    ranked.truncate(TOP_PRODUCTS);
    ranked
}

/// Compute the full report for one refresh cycle.
pub fn build_report(
    records: &[SaleRecord],
    config: &ReportConfig,
    current_week: u32,
) -> Result<ReportSnapshot> {
    config.validate()?;

    let approved = partition(records, &config.statuses.approved);
    let offered = partition(records, &config.statuses.offer);

    let total_sold = approved.iter().fold(0.0, |acc, s| acc + s.price);
    let goal_fraction = if config.goal != 0.0 {
        total_sold / config.goal
    } else {
        0.0
    };
    let (remaining_weeks, remaining_goal, dynamic_weekly_target) =
        dynamic_target(config, total_sold, current_week);

    Ok(ReportSnapshot {
        total_sold,
        total_count: approved.len(),
        goal: config.goal,
        goal_fraction,
        weekly_realized: weekly_series(&approved, config),
        weekly_offered: weekly_series(&offered, config),
        offered_total: offered.iter().fold(0.0, |acc, s| acc + s.price),
        offered_count: offered.len(),
        current_week,
        remaining_weeks,
        remaining_goal,
        dynamic_weekly_target,
        hit_rate: hit_rate(records, config),
        top_products: top_products(&approved, &config.product_catalog),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A date in the given ISO week of 2025 (the Wednesday).
    fn date_in_week(week: u32) -> NaiveDate {
        NaiveDate::from_isoywd_opt(2025, week, chrono::Weekday::Wed).unwrap()
    }

    fn record(product: &str, price: Option<f64>, status: &str, week: Option<u32>) -> SaleRecord {
        SaleRecord {
            product: Some(product.to_string()),
            price,
            sale_date: week.map(date_in_week),
            status: Some(status.to_string()),
        }
    }

    fn config(catalog: &[&str], goal: f64) -> ReportConfig {
        ReportConfig {
            goal,
            start_week: 18,
            end_week: 26,
            product_catalog: catalog.iter().map(|s| s.to_string()).collect(),
            statuses: StatusLabels::default(),
        }
    }

    fn worked_example() -> Vec<SaleRecord> {
        vec![
            record("A", Some(100.0), "Approved", Some(20)),
            record("B", Some(50.0), "Approved", Some(20)),
            record("A", Some(30.0), "Offer", Some(21)),
        ]
    }

    #[test]
    fn test_worked_example() {
        let report = build_report(&worked_example(), &config(&["A", "B"], 100.0), 21).unwrap();
        assert_eq!(report.total_sold, 150.0);
        assert_eq!(report.total_count, 2);
        assert_eq!(report.goal_fraction, 1.5);
        assert_eq!(report.weekly_realized[&20], 150.0);
        assert_eq!(report.weekly_realized[&18], 0.0);
        assert_eq!(report.weekly_realized[&26], 0.0);
        assert_eq!(report.weekly_offered[&21], 30.0);
        assert_eq!(report.weekly_offered[&20], 0.0);
        assert_eq!(report.remaining_weeks, 5);
        assert_eq!(report.remaining_goal, 0.0);
        assert_eq!(report.dynamic_weekly_target, 0.0);
        assert_eq!(
            report.top_products,
            vec![
                ProductTotal { name: "A".into(), total: 100.0, count: 1 },
                ProductTotal { name: "B".into(), total: 50.0, count: 1 },
            ]
        );
        assert_eq!(report.offered_total, 30.0);
        assert_eq!(report.offered_count, 1);
    }

    #[test]
    fn test_empty_totals_are_positive_zero() {
        let report = build_report(&[], &config(&["A"], 100.0), 20).unwrap();
        assert!(report.total_sold.is_sign_positive());
        assert!(report.offered_total.is_sign_positive());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"totalSold\":0.0"), "got: {json}");
        assert!(json.contains("\"offeredTotal\":0.0"), "got: {json}");
    }

    #[test]
    fn test_weekly_series_covers_whole_range_in_order() {
        let report = build_report(&[], &config(&[], 100.0), 18).unwrap();
        let weeks: Vec<u32> = report.weekly_realized.keys().copied().collect();
        assert_eq!(weeks, (18..=26).collect::<Vec<_>>());
        assert_eq!(report.weekly_offered.len(), 9);
        assert!(report.weekly_realized.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_sales_outside_range_count_toward_total_only() {
        let records = vec![
            record("A", Some(100.0), "Approved", Some(20)),
            record("A", Some(40.0), "Approved", Some(30)),
        ];
        let report = build_report(&records, &config(&["A"], 1000.0), 20).unwrap();
        let weekly_sum: f64 = report.weekly_realized.values().sum();
        assert_eq!(report.total_sold, 140.0);
        assert_eq!(weekly_sum, 100.0);
        assert!(weekly_sum <= report.total_sold);
    }

    #[test]
    fn test_zero_goal_gives_zero_fraction() {
        let report = build_report(&worked_example(), &config(&["A"], 0.0), 21).unwrap();
        assert_eq!(report.goal_fraction, 0.0);
        assert_eq!(report.remaining_goal, 0.0);
    }

    #[test]
    fn test_dynamic_target_spreads_over_remaining_weeks() {
        let records = vec![record("A", Some(100.0), "Approved", Some(19))];
        let report = build_report(&records, &config(&["A"], 1100.0), 21).unwrap();
        assert_eq!(report.remaining_weeks, 5);
        assert_eq!(report.remaining_goal, 1000.0);
        assert_eq!(report.dynamic_weekly_target, 200.0);
    }

    #[test]
    fn test_dynamic_target_undivided_when_no_weeks_remain() {
        let records = vec![record("A", Some(100.0), "Approved", Some(19))];
        let report = build_report(&records, &config(&["A"], 1100.0), 26).unwrap();
        assert_eq!(report.remaining_weeks, 0);
        assert_eq!(report.dynamic_weekly_target, report.remaining_goal);
        assert_eq!(report.dynamic_weekly_target, 1000.0);

        let report = build_report(&records, &config(&["A"], 1100.0), 40).unwrap();
        assert_eq!(report.dynamic_weekly_target, 1000.0);
    }

    #[test]
    fn test_incomplete_records_are_dropped_from_partitions() {
        let mut no_product = record("A", Some(10.0), "Approved", Some(20));
        no_product.product = None;
        let records = vec![
            no_product,
            record("A", None, "Approved", Some(20)),
            record("A", Some(10.0), "Approved", None),
            record("A", None, "Offer", Some(20)),
        ];
        let report = build_report(&records, &config(&["A"], 100.0), 20).unwrap();
        assert_eq!(report.total_sold, 0.0);
        assert_eq!(report.total_count, 0);
        assert_eq!(report.offered_count, 0);
    }

    #[test]
    fn test_partition_matches_raw_status_exactly() {
        let records = vec![record("A", Some(10.0), " approved", Some(20))];
        let report = build_report(&records, &config(&["A"], 100.0), 20).unwrap();
        assert_eq!(report.total_sold, 0.0);
        // Hit rate normalizes, so the same row still counts as approved there.
        assert_eq!(report.hit_rate.approved, 1);
    }

    #[test]
    fn test_malformed_price_still_counts_in_hit_rate() {
        let records = vec![
            record("A", None, "Approved", Some(20)),
            record("A", Some(10.0), "Rejected", Some(21)),
        ];
        let report = build_report(&records, &config(&["A"], 100.0), 20).unwrap();
        assert_eq!(report.total_sold, 0.0);
        assert_eq!(report.top_products[0].total, 0.0);
        assert_eq!(report.hit_rate.approved, 1);
        assert_eq!(report.hit_rate.rejected, 1);
        assert_eq!(report.hit_rate.rate, 50.0);
    }

    #[test]
    fn test_hit_rate_ignores_out_of_range_and_unknown() {
        let records = vec![
            record("A", Some(1.0), "Approved", Some(20)),
            record("A", Some(1.0), "Offer", Some(22)),
            record("A", Some(1.0), "Offer", Some(22)),
            record("A", Some(1.0), "Approved", Some(30)),
            record("A", Some(1.0), "Approved", None),
            record("A", Some(1.0), "Cancelled", Some(20)),
        ];
        let report = build_report(&records, &config(&["A"], 100.0), 20).unwrap();
        assert_eq!(report.hit_rate.approved, 1);
        assert_eq!(report.hit_rate.offered, 2);
        assert_eq!(report.hit_rate.rejected, 0);
        assert!((report.hit_rate.rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_rate_zero_without_weeks_in_range() {
        let records = vec![record("A", Some(1.0), "Approved", Some(40))];
        let report = build_report(&records, &config(&["A"], 100.0), 20).unwrap();
        assert_eq!(report.hit_rate.rate, 0.0);
        assert_eq!(report.hit_rate.approved, 0);
    }

    #[test]
    fn test_top_products_limited_to_catalog() {
        let records = vec![
            record("A", Some(10.0), "Approved", Some(20)),
            record("B", Some(30.0), "Approved", Some(20)),
            record("B", Some(5.0), "Approved", Some(21)),
            record("Z", Some(999.0), "Approved", Some(20)),
            record("D", Some(20.0), "Approved", Some(20)),
        ];
        let report = build_report(&records, &config(&["A", "B", "C", "D"], 100.0), 20).unwrap();
        let names: Vec<&str> = report.top_products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "D", "A"]);
        assert_eq!(report.top_products[0].count, 2);
        assert_eq!(report.top_products[0].total, 35.0);
        // Uncatalogued sales still count toward the goal.
        assert_eq!(report.total_sold, 1064.0);
    }

    #[test]
    fn test_top_products_pads_with_unsold_catalog_entries() {
        let records = vec![record("B", Some(10.0), "Approved", Some(20))];
        let report = build_report(&records, &config(&["A", "B", "C", "D"], 100.0), 20).unwrap();
        let names: Vec<&str> = report.top_products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(report.top_products[1].count, 0);
    }

    #[test]
    fn test_top_products_short_catalog() {
        let report = build_report(&[], &config(&["A"], 100.0), 20).unwrap();
        assert_eq!(report.top_products.len(), 1);
        let report = build_report(&[], &config(&[], 100.0), 20).unwrap();
        assert!(report.top_products.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut c = config(&["A"], 100.0);
        c.start_week = 27;
        let err = build_report(&[], &c, 20).err().unwrap();
        assert!(matches!(err, SalesError::Configuration(_)));

        let mut c = config(&["A"], -1.0);
        assert!(build_report(&[], &c, 20).is_err());
        c.goal = f64::NAN;
        assert!(build_report(&[], &c, 20).is_err());

        let mut c = config(&["A"], 100.0);
        c.end_week = 54;
        assert!(build_report(&[], &c, 20).is_err());
    }

    #[test]
    fn test_single_week_range() {
        let mut c = config(&["A"], 100.0);
        c.start_week = 20;
        c.end_week = 20;
        let report = build_report(&worked_example(), &c, 19).unwrap();
        assert_eq!(report.weekly_realized.len(), 1);
        assert_eq!(report.remaining_weeks, 1);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("aPPROVED"), "Approved");
        assert_eq!(capitalize("ørsted"), "Ørsted");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_normalize_status() {
        let labels = StatusLabels::default();
        assert_eq!(normalize_status("  approved ", &labels), Some(StatusBucket::Approved));
        assert_eq!(normalize_status("OFFER", &labels), Some(StatusBucket::Offer));
        assert_eq!(normalize_status("Rejected", &labels), Some(StatusBucket::Rejected));
        assert_eq!(normalize_status("Rejcted", &labels), None);
        assert_eq!(normalize_status("", &labels), None);
    }

    #[test]
    fn test_normalize_status_typo_allowlist() {
        let labels = crate::settings::Settings::danish().statuses;
        assert_eq!(normalize_status("aflsag", &labels), Some(StatusBucket::Rejected));
        assert_eq!(normalize_status(" Afslag", &labels), Some(StatusBucket::Rejected));
        assert_eq!(normalize_status("godkendt", &labels), Some(StatusBucket::Approved));
        // Only listed typos are corrected.
        assert_eq!(normalize_status("Afsalg", &labels), None);
    }

    #[test]
    fn test_hit_rate_bounds() {
        let records = vec![
            record("A", Some(1.0), "Approved", Some(18)),
            record("A", Some(1.0), "approved", Some(26)),
        ];
        let report = build_report(&records, &config(&["A"], 100.0), 20).unwrap();
        assert_eq!(report.hit_rate.rate, 100.0);
    }

    #[test]
    fn test_current_iso_week() {
        assert_eq!(current_iso_week(NaiveDate::from_ymd_opt(2025, 5, 14).unwrap()), 20);
        assert_eq!(current_iso_week(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap()), 1);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let report = build_report(&worked_example(), &config(&["A", "B"], 100.0), 21).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalSold"], 150.0);
        assert_eq!(json["weeklyRealized"]["20"], 150.0);
        assert_eq!(json["hitRate"]["approved"], 2);
        assert_eq!(json["topProducts"][0]["name"], "A");
    }
}
