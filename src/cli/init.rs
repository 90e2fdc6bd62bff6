use std::path::Path;

use crate::error::{Result, SalesError};
use crate::settings::{save_settings, Settings};

pub fn run(path: &Path, danish: bool, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(SalesError::Other(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let settings = if danish {
        Settings::danish()
    } else {
        Settings::default()
    };
    save_settings(&settings, path)?;

    println!("Wrote settings to {}", path.display());
    println!("Set `source` to your sheet or file, then run `salestrack report`.");
    Ok(())
}
