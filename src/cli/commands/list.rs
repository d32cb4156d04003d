//! List command implementation.

use crate::cli::Output;
use crate::config::{available_configs, list_available_niches, Settings};
use anyhow::Result;

/// Run the list command.
pub fn run_list(settings: &Settings) -> Result<()> {
    let config_dir = settings.config_dir();
    let niches = list_available_niches(&config_dir);

    if niches.is_empty() {
        Output::info(&format!(
            "No video configurations found in {}. Add a <niche>.yaml file there to get started.",
            config_dir.display()
        ));
        return Ok(());
    }

    Output::header(&format!("Available Niches ({})", niches.len()));
    println!();
    for niche in &niches {
        Output::list_item(niche);
    }

    println!();
    Output::kv("Config directory", &config_dir.display().to_string());
    Output::kv("Config files", &available_configs(&config_dir).len().to_string());

    Ok(())
}
