use anyhow::{Context, Result};
use daycal_core::config::DaycalConfig;
use owo_colors::OwoColorize;

use crate::commands::App;

pub fn show(app: &App) -> Result<()> {
    let config = &app.config;
    let config_path = DaycalConfig::config_path()?;

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());
    println!("  Events:  {}", config.store_path().display());
    println!("  Cache:   {}", config.cache_path().display());

    println!();
    println!("{}", "Settings".bold());
    println!("  collection         {}", config.collection);
    println!(
        "  default_color      {}",
        config
            .default_color
            .as_deref()
            .unwrap_or(daycal_core::DEFAULT_COLOR)
    );
    println!("  max_span_days      {}", config.max_span_days);
    println!("  show_week_numbers  {}", config.show_week_numbers);

    Ok(())
}

pub fn set(app: &App, key: &str, value: &str) -> Result<()> {
    let mut config = app.config.clone();
    config.set(key, value)?;
    config.save().context("Failed to save config")?;

    println!("{} {} = {}", "✓".green(), key, value.trim());
    Ok(())
}
