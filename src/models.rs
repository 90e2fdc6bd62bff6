use chrono::{Datelike, NaiveDate};

/// Cells as handed over by a data source, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from a header row and data rows. Short rows are padded
    /// with empty cells and rows with nothing but whitespace are dropped.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Self {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// One sale or offer line after per-field coercion. Any field may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub product: Option<String>,
    pub price: Option<f64>,
    pub sale_date: Option<NaiveDate>,
    /// Raw status cell, untrimmed.
    pub status: Option<String>,
}

impl SaleRecord {
    /// ISO-8601 week number of the sale date.
    pub fn week(&self) -> Option<u32> {
        self.sale_date.map(|d| d.iso_week().week())
    }

    /// Product, price and date are all present.
    pub fn is_complete(&self) -> bool {
        self.product.is_some() && self.price.is_some() && self.sale_date.is_some()
    }
}
