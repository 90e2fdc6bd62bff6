use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, SalesError};
use crate::models::RawTable;
use crate::settings::{shellexpand_path, SourceSettings};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Fetched table
// ---------------------------------------------------------------------------

pub struct FetchedTable {
    pub table: RawTable,
    /// SHA-256 over the header and cell contents.
    pub fingerprint: String,
}

impl FetchedTable {
    fn new(table: RawTable) -> Self {
        let fingerprint = fingerprint(&table);
        Self { table, fingerprint }
    }
}

pub fn fingerprint(table: &RawTable) -> String {
    let mut hasher = Sha256::new();
    for row in std::iter::once(&table.headers).chain(table.rows.iter()) {
        for cell in row {
            hasher.update(cell.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Google Sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Credentials {
    AccessToken(String),
    ApiKey(String),
    None,
}

impl Credentials {
    /// Read credentials from the named environment variables, preferring the
    /// bearer token when both are set.
    pub fn from_env(access_token_env: &str, api_key_env: &str) -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(token) = read(access_token_env) {
            Credentials::AccessToken(token)
        } else if let Some(key) = read(api_key_env) {
            Credentials::ApiKey(key)
        } else {
            Credentials::None
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Credentials::AccessToken(_) => "bearer token",
            Credentials::ApiKey(_) => "API key",
            Credentials::None => "none",
        }
    }
}

/// Authenticated connection to the Sheets API. Built once and reused by
/// every refresh cycle.
pub struct SheetsClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetsClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SalesError::SourceUnavailable(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_http(http, base_url, credentials))
    }

    pub fn with_http(http: Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Read every populated cell of `worksheet` as formatted text.
    pub fn fetch_worksheet(&self, sheet_id: &str, worksheet: &str) -> Result<RawTable> {
        if sheet_id.trim().is_empty() {
            return Err(SalesError::SourceUnavailable(
                "no sheet_id configured".to_string(),
            ));
        }
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SalesError::Configuration(format!("invalid Sheets base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SalesError::Configuration("Sheets base URL cannot hold a path".into()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", sheet_id, "values", worksheet]);
        // Raw numbers for prices; dates keep their display text (day-first).
        let mut req = self.http.get(url).query(&[
            ("valueRenderOption", "UNFORMATTED_VALUE"),
            ("dateTimeRenderOption", "FORMATTED_STRING"),
        ]);
        match &self.credentials {
            Credentials::AccessToken(token) => req = req.bearer_auth(token),
            Credentials::ApiKey(key) => req = req.query(&[("key", key)]),
            Credentials::None => {}
        }

        tracing::debug!(%sheet_id, %worksheet, "requesting worksheet values");
        let resp = req
            .send()
            .map_err(|e| SalesError::SourceUnavailable(format!("network error: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SalesError::SourceUnavailable(describe_status(status, worksheet)));
        }
        let body: ValueRange = resp
            .json()
            .map_err(|e| SalesError::SourceUnavailable(format!("unexpected response: {e}")))?;
        Ok(table_from_values(body.values))
    }
}

fn describe_status(status: StatusCode, worksheet: &str) -> String {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authorization failed ({status})")
        }
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
            format!("sheet or worksheet `{worksheet}` not found ({status})")
        }
        _ => format!("request failed ({status})"),
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn table_from_values(values: Vec<Vec<serde_json::Value>>) -> RawTable {
    let mut rows = values
        .into_iter()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    RawTable::new(headers, rows.collect())
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable> {
    let unavailable = |e: csv::Error| {
        SalesError::SourceUnavailable(format!("cannot read {}: {e}", path.display()))
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(unavailable)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(unavailable)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(unavailable)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable::new(headers, rows))
}

/// Excel stores dates as days since 1899-12-30 (the 1900 leap year bug).
#[cfg(any(feature = "xlsx", test))]
pub fn excel_serial_to_date(serial: f64) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

#[cfg(feature = "xlsx")]
fn read_xlsx(path: &Path, worksheet: Option<&str>) -> Result<RawTable> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(path).map_err(|e| {
        SalesError::SourceUnavailable(format!("cannot open {}: {e}", path.display()))
    })?;
    let name = match worksheet {
        Some(name) => name.to_string(),
        None => workbook.sheet_names().first().cloned().ok_or_else(|| {
            SalesError::SourceUnavailable(format!("{} has no worksheets", path.display()))
        })?,
    };
    let range = workbook.worksheet_range(&name).map_err(|e| {
        SalesError::SourceUnavailable(format!("worksheet `{name}` not readable: {e}"))
    })?;

    let text = |cell: &Data| match cell {
        Data::String(s) | Data::DateTimeIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        _ => String::new(),
    };
    let mut rows = range.rows().map(|row| row.iter().map(text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    Ok(RawTable::new(headers, rows.collect()))
}

#[cfg(not(feature = "xlsx"))]
fn read_xlsx(path: &Path, _worksheet: Option<&str>) -> Result<RawTable> {
    Err(SalesError::SourceUnavailable(format!(
        "{}: XLSX support requires the 'xlsx' feature",
        path.display()
    )))
}

// ---------------------------------------------------------------------------
// Data source
// ---------------------------------------------------------------------------

pub enum DataSource {
    GoogleSheet {
        client: SheetsClient,
        sheet_id: String,
        worksheet: String,
    },
    File {
        path: PathBuf,
        worksheet: Option<String>,
    },
}

impl DataSource {
    pub fn from_settings(source: &SourceSettings) -> Result<Self> {
        match source {
            SourceSettings::GoogleSheet {
                sheet_id,
                worksheet,
                access_token_env,
                api_key_env,
                base_url,
            } => {
                let credentials = Credentials::from_env(access_token_env, api_key_env);
                Ok(DataSource::GoogleSheet {
                    client: SheetsClient::new(base_url, credentials)?,
                    sheet_id: sheet_id.clone(),
                    worksheet: worksheet.clone(),
                })
            }
            SourceSettings::File { path, worksheet } => Ok(DataSource::File {
                path: shellexpand_path(path),
                worksheet: worksheet.clone(),
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::GoogleSheet {
                sheet_id, worksheet, ..
            } => format!("Google Sheet {sheet_id} / {worksheet}"),
            DataSource::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn fetch(&self) -> Result<FetchedTable> {
        let table = match self {
            DataSource::GoogleSheet {
                client,
                sheet_id,
                worksheet,
            } => client.fetch_worksheet(sheet_id, worksheet)?,
            DataSource::File { path, worksheet } => {
                let is_xlsx = path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls"));
                if is_xlsx {
                    read_xlsx(path, worksheet.as_deref())?
                } else {
                    read_csv(path)?
                }
            }
        };
        tracing::info!(
            source = %self.describe(),
            rows = table.rows.len(),
            "fetched table"
        );
        Ok(FetchedTable::new(table))
    }
}
