use std::path::Path;

use crate::error::Result;
use crate::fmt::amount;
use crate::loader::Credentials;
use crate::settings::{Settings, SourceSettings};

pub fn run(settings: &Settings, path: &Path) -> Result<()> {
    let file_state = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("Settings:   {}{file_state}", path.display());
    println!("Title:      {}", settings.title);
    println!("Goal:       {}", amount(settings.goal, &settings.currency));
    println!("Weeks:      {}-{}", settings.start_week, settings.end_week);
    println!("Products:   {}", settings.product_catalog.join(", "));
    println!("Refresh:    every {}s", settings.refresh_secs);
    println!(
        "Statuses:   {} / {} / {}",
        settings.statuses.approved, settings.statuses.offer, settings.statuses.rejected
    );
    println!(
        "Columns:    {}, {}, {}, {}",
        settings.columns.product,
        settings.columns.price,
        settings.columns.sale_date,
        settings.columns.status
    );

    println!();
    match &settings.source {
        SourceSettings::GoogleSheet {
            sheet_id,
            worksheet,
            access_token_env,
            api_key_env,
            ..
        } => {
            let sheet = if sheet_id.is_empty() { "(not set)" } else { sheet_id.as_str() };
            let credentials = Credentials::from_env(access_token_env, api_key_env);
            println!("Source:      Google Sheet");
            println!("Sheet:       {sheet}");
            println!("Worksheet:   {worksheet}");
            println!(
                "Credentials: {} (from {access_token_env} or {api_key_env})",
                credentials.describe()
            );
        }
        SourceSettings::File { path, worksheet } => {
            println!("Source:      file");
            println!("Path:        {path}");
            if let Some(ws) = worksheet {
                println!("Worksheet:   {ws}");
            }
        }
    }

    if let Err(e) = settings.report_config().validate() {
        println!();
        println!("Warning: {e}");
    }
    Ok(())
}
