use anyhow::{Context, Result};
use colored::Colorize;

use crate::feed::{OriginalOrder, source_for};

/// Fetch a list and report what the feed would make of it.
pub fn run(location: &str) -> Result<()> {
    let source = source_for(location);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    let text = runtime
        .block_on(source.fetch())
        .with_context(|| format!("Failed to load videos from {location}"))?;

    let order = OriginalOrder::parse(&text);
    if order.is_empty() {
        anyhow::bail!("No videos found in {location}");
    }

    let report = summarize(&order);
    println!("{} {}", "List:".bold(), source.describe());
    println!("  {} {}", "videos:".bold(), report.videos);
    println!("  {} {}", "unique:".bold(), report.unique);
    if report.blank_lines > 0 {
        println!(
            "  {} {}",
            "blank lines skipped:".bold(),
            report.blank_lines.to_string().dimmed()
        );
    }
    if order.duplicates().is_empty() {
        println!("{} No duplicate URLs", "✓".green());
    } else {
        println!(
            "{} {} duplicate line(s), jumps resolve to the first occurrence:",
            "!".yellow(),
            order.duplicates().len()
        );
        for duplicate in order.duplicates() {
            println!(
                "  line {} -> line {}  {}",
                duplicate.line.to_string().yellow(),
                duplicate.first_line,
                duplicate.url.dimmed()
            );
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct Report {
    videos: usize,
    unique: usize,
    blank_lines: usize,
}

fn summarize(order: &OriginalOrder) -> Report {
    Report {
        videos: order.len(),
        unique: order.len() - order.duplicates().len(),
        blank_lines: order.blank_lines(),
    }
}
