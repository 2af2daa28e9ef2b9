use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::{Config, VALID_KEYS};

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();
    let options = config.feed_options();

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "  (not created yet, showing defaults)".dimmed());
    }
    println!();
    println!("{}", "defaults".bold());
    println!("  start_mode: {}", options.start_mode.to_string().cyan());
    println!("  autoplay: {}", config.autoplay().to_string().cyan());
    println!("{}", "feed".bold());
    println!("  render_buffer: {}", options.render_buffer.to_string().cyan());
    println!("  preload_ahead: {}", options.preload_ahead.to_string().cyan());
    println!(
        "  visibility_threshold: {}",
        options.visibility_threshold.to_string().cyan()
    );
    println!(
        "  annotation_ms: {}",
        options.annotation_visible.as_millis().to_string().cyan()
    );
    println!(
        "  annotation_fade_ms: {}",
        options.annotation_fade.as_millis().to_string().cyan()
    );
    println!(
        "  rebuild_settle_ms: {}",
        options.rebuild_settle.as_millis().to_string().cyan()
    );
    println!(
        "  jump_settle_ms: {}",
        options.jump_settle.as_millis().to_string().cyan()
    );
    println!();
    println!("{} {}", "Valid keys:".dimmed(), VALID_KEYS.join(", ").dimmed());
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!(
        "{} Set {} = {} in {}",
        "✓".green(),
        key.bold(),
        value.cyan(),
        path.display()
    );
    Ok(())
}
