use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SalesError};
use crate::reports::ReportConfig;

pub const DEFAULT_PRODUCT_CATALOG: &[&str] = &[
    "Leadpage",
    "Klaviyo FirstFlow",
    "Meta Lead Ads",
    "Domæne",
    "Projektpakke",
    "CRO-analyse",
    "Konkurrentanalyse",
    "Ekstra kampagner",
    "Cookieløsning",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_goal")]
    pub goal: f64,
    #[serde(default = "default_start_week")]
    pub start_week: u32,
    #[serde(default = "default_end_week")]
    pub end_week: u32,
    #[serde(default = "default_product_catalog")]
    pub product_catalog: Vec<String>,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub columns: ColumnMap,
    #[serde(default)]
    pub statuses: StatusLabels,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

fn default_title() -> String {
    "Sales dashboard".to_string()
}

fn default_goal() -> f64 {
    82465.0
}

fn default_start_week() -> u32 {
    18
}

fn default_end_week() -> u32 {
    26
}

fn default_product_catalog() -> Vec<String> {
    DEFAULT_PRODUCT_CATALOG.iter().map(|p| p.to_string()).collect()
}

fn default_refresh_secs() -> u64 {
    300
}

fn default_currency() -> String {
    "kr.".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: default_title(),
            goal: default_goal(),
            start_week: default_start_week(),
            end_week: default_end_week(),
            product_catalog: default_product_catalog(),
            refresh_secs: default_refresh_secs(),
            currency: default_currency(),
            columns: ColumnMap::default(),
            statuses: StatusLabels::default(),
            source: SourceSettings::default(),
            log_file: None,
        }
    }
}

impl Settings {
    /// Vocabulary of the Danish "Salg" worksheet the dashboard was first built for.
    pub fn danish() -> Self {
        Self {
            title: "Salg - Q2 mål".to_string(),
            columns: ColumnMap {
                product: "Produkt".into(),
                price: "Pris".into(),
                sale_date: "Dato for salg".into(),
                status: "Status".into(),
            },
            statuses: StatusLabels {
                approved: "Godkendt".into(),
                offer: "Tilbud".into(),
                rejected: "Afslag".into(),
                typos: BTreeMap::from([("Aflsag".to_string(), "Afslag".to_string())]),
            },
            source: SourceSettings::GoogleSheet {
                sheet_id: String::new(),
                worksheet: "Salg".into(),
                access_token_env: default_access_token_env(),
                api_key_env: default_api_key_env(),
                base_url: default_sheets_base_url(),
            },
            ..Self::default()
        }
    }

    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            goal: self.goal,
            start_week: self.start_week,
            end_week: self.end_week,
            product_catalog: self.product_catalog.clone(),
            statuses: self.statuses.clone(),
        }
    }
}

/// Header names of the four columns the report reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub product: String,
    pub price: String,
    pub sale_date: String,
    pub status: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            product: "Product".into(),
            price: "Price".into(),
            sale_date: "SaleDate".into(),
            status: "Status".into(),
        }
    }
}

/// Status vocabulary. `typos` maps known misspellings (after capitalization)
/// to the label they stand for; it is an allowlist, not a fuzzy match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLabels {
    pub approved: String,
    pub offer: String,
    pub rejected: String,
    #[serde(default)]
    pub typos: BTreeMap<String, String>,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            approved: "Approved".into(),
            offer: "Offer".into(),
            rejected: "Rejected".into(),
            typos: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    GoogleSheet {
        sheet_id: String,
        worksheet: String,
        /// Environment variable holding an OAuth bearer token.
        #[serde(default = "default_access_token_env")]
        access_token_env: String,
        /// Environment variable holding an API key (public sheets only).
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default = "default_sheets_base_url")]
        base_url: String,
    },
    File {
        path: String,
        /// Worksheet name for XLSX workbooks; ignored for CSV.
        #[serde(default)]
        worksheet: Option<String>,
    },
}

fn default_access_token_env() -> String {
    "SALESTRACK_ACCESS_TOKEN".to_string()
}

fn default_api_key_env() -> String {
    "SALESTRACK_API_KEY".to_string()
}

pub fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self::GoogleSheet {
            sheet_id: String::new(),
            worksheet: "Sales".into(),
            access_token_env: default_access_token_env(),
            api_key_env: default_api_key_env(),
            base_url: default_sheets_base_url(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("salestrack")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn default_log_path() -> PathBuf {
    config_dir().join("salestrack.log")
}

/// Load settings from `path`. A missing file yields defaults; a file that
/// exists but does not parse is a configuration error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        SalesError::Configuration(format!("cannot parse {}: {e}", path.display()))
    })
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> PathBuf {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1));
        }
    }
    PathBuf::from(path)
}
