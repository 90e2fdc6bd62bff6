use chrono::NaiveDate;

use crate::error::{Result, SalesError};
use crate::models::{RawTable, SaleRecord};
use crate::settings::ColumnMap;

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

/// Parse a price cell. Anything that is not a plain finite number is missing.
pub fn parse_price(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a date cell day-first: `14-05-2025`, `14/05/2025`, `14.05.25`.
/// A four-digit leading component is read as ISO `2025-05-14`. A trailing
/// time of day is ignored.
pub fn parse_date_dmy(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(|c: char| c == ' ' || c == 'T').next()?;
    let parts: Vec<&str> = date_part.split(['-', '/', '.']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    let (y, m, d) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[1], parts[0])
    };
    let year: i32 = match y.len() {
        2 => 2000 + y.parse::<i32>().ok()?,
        4 => y.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Table -> records
// ---------------------------------------------------------------------------

/// Counts of cells that were present but could not be coerced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoercionSkips {
    pub bad_prices: usize,
    pub bad_dates: usize,
}

pub struct ParsedTable {
    pub records: Vec<SaleRecord>,
    pub skips: CoercionSkips,
}

struct ColumnIndexes {
    product: usize,
    price: usize,
    sale_date: usize,
    status: usize,
}

fn locate_columns(table: &RawTable, columns: &ColumnMap) -> Result<ColumnIndexes> {
    let find = |name: &str| {
        table.column_index(name).ok_or_else(|| {
            SalesError::SourceUnavailable(format!("worksheet has no `{name}` column"))
        })
    };
    Ok(ColumnIndexes {
        product: find(&columns.product)?,
        price: find(&columns.price)?,
        sale_date: find(&columns.sale_date)?,
        status: find(&columns.status)?,
    })
}

/// Coerce every row of the table into a `SaleRecord`. Per-field failures
/// become missing values; only a missing header column is an error.
pub fn parse_records(table: &RawTable, columns: &ColumnMap) -> Result<ParsedTable> {
    let idx = locate_columns(table, columns)?;
    let mut skips = CoercionSkips::default();

    let records = table
        .rows
        .iter()
        .map(|row| {
            let price_cell = &row[idx.price];
            let price = parse_price(price_cell);
            if price.is_none() && !price_cell.trim().is_empty() {
                skips.bad_prices += 1;
            }
            let date_cell = &row[idx.sale_date];
            let sale_date = parse_date_dmy(date_cell);
            if sale_date.is_none() && !date_cell.trim().is_empty() {
                skips.bad_dates += 1;
            }
            let status = &row[idx.status];
            SaleRecord {
                product: non_blank(&row[idx.product]),
                price,
                sale_date,
                status: if status.trim().is_empty() {
                    None
                } else {
                    Some(status.clone())
                },
            }
        })
        .collect();

    if skips.bad_prices > 0 || skips.bad_dates > 0 {
        tracing::debug!(
            bad_prices = skips.bad_prices,
            bad_dates = skips.bad_dates,
            "cells treated as missing"
        );
    }

    Ok(ParsedTable { records, skips })
}
