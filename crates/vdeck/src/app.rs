use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

use crate::cli::SessionArgs;
use crate::config::{AutoplayPolicy, Config};
use crate::feed::{Feed, FeedOptions, FeedStatus, NavigationError, PlayMode, source_for};
use crate::terminal::TerminalHost;

/// How often queued host events are delivered to the feed.
const EVENT_PUMP_INTERVAL: Duration = Duration::from_millis(16);

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Next,
    Prev,
    Jump(String),
    Toggle,
    Tap,
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(input: &str) -> Self {
        let input = input.trim();
        let (word, rest) = input
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((input, ""));
        match word.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "n" | "next" | "j" | "down" => Self::Next,
            "p" | "prev" | "k" | "up" => Self::Prev,
            "g" | "jump" | "goto" => Self::Jump(rest.to_string()),
            "t" | "toggle" | "mode" => Self::Toggle,
            "tap" => Self::Tap,
            "s" | "status" => Self::Status,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            // A bare number is a jump, like typing into the line input.
            _ if word.chars().all(|c| c.is_ascii_digit()) => Self::Jump(word.to_string()),
            _ => Self::Unknown(word.to_string()),
        }
    }
}

pub fn run(location: &str, args: SessionArgs, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let options = resolve_options(&config, &args);
    let policy = args.autoplay.unwrap_or_else(|| config.autoplay());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    let local = LocalSet::new();
    local.block_on(
        &runtime,
        session(location, options, policy, args.line, quiet),
    )
}

/// CLI flags override config; config overrides built-in defaults.
fn resolve_options(config: &Config, args: &SessionArgs) -> FeedOptions {
    let mut options = config.feed_options();
    if args.sequential {
        options.start_mode = PlayMode::Sequential;
    } else if args.random {
        options.start_mode = PlayMode::Random;
    }
    if args.seed.is_some() {
        options.seed = args.seed;
    }
    options
}

/// Directory relative video paths are resolved against.
fn base_dir(location: &str) -> Option<PathBuf> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return None;
    }
    Path::new(location).parent().map(Path::to_path_buf)
}

async fn session(
    location: &str,
    options: FeedOptions,
    policy: AutoplayPolicy,
    start_line: Option<usize>,
    quiet: bool,
) -> anyhow::Result<()> {
    let host = Rc::new(TerminalHost::new(policy, base_dir(location), quiet));
    let feed = Feed::new(host.clone(), options);

    let source = source_for(location);
    if let Err(err) = feed.load(source.as_ref()).await {
        let message = host.fatal_error().unwrap_or_else(|| err.to_string());
        anyhow::bail!(message);
    }

    if !quiet {
        println!(
            "{} {} videos from {} ({} order, autoplay {}). Type {} for commands.",
            "Loaded".green().bold(),
            feed.len(),
            source.describe(),
            feed.mode(),
            policy,
            "help".cyan()
        );
    }

    let pump = {
        let host = Rc::clone(&host);
        let feed = feed.clone();
        tokio::task::spawn_local(async move {
            loop {
                for event in host.drain_events() {
                    feed.dispatch(event);
                }
                tokio::time::sleep(EVENT_PUMP_INTERVAL).await;
            }
        })
    };

    if let Some(line) = start_line {
        report(feed.jump_to_line(line).await);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(input) = lines.next_line().await? {
        match Command::parse(&input) {
            Command::Quit => break,
            Command::Empty => {}
            Command::Next => {
                if !host.scroll_by(1) {
                    println!("{}", "End of the feed".dimmed());
                }
            }
            Command::Prev => {
                if !host.scroll_by(-1) {
                    println!("{}", "Start of the feed".dimmed());
                }
            }
            Command::Jump(target) => {
                let feed = feed.clone();
                tokio::task::spawn_local(async move {
                    report(feed.jump_to_input(&target).await);
                });
            }
            Command::Toggle => {
                let feed = feed.clone();
                tokio::task::spawn_local(async move {
                    match feed.toggle_mode().await {
                        Ok(mode) => println!("{} {}", "Order:".bold(), mode.to_string().cyan()),
                        Err(err) => report::<()>(Err(err)),
                    }
                });
            }
            Command::Tap => {
                host.tap();
            }
            Command::Status => print_status(&feed.status(), host.describe_centered()),
            Command::Help => print_help(),
            Command::Unknown(word) => {
                println!(
                    "{} Unknown command: {word}. Type {} for commands.",
                    "!".yellow(),
                    "help".cyan()
                );
            }
        }
    }

    pump.abort();
    debug!("Session ended");
    Ok(())
}

/// Navigation failures are already alerted by the host; only busy is
/// reported here.
fn report<T>(result: Result<T, NavigationError>) {
    match result {
        Ok(_) => {}
        Err(NavigationError::Busy) => {
            println!("{}", "Still navigating, try again in a moment".dimmed());
        }
        Err(err) => debug!("Navigation failed: {err}"),
    }
}

fn print_status(status: &FeedStatus, centered: Option<String>) {
    println!("{}", "Status".bold());
    println!("  order: {}", status.mode.to_string().cyan());
    println!(
        "  position: {} of {}",
        status.active_index + 1,
        status.len
    );
    if let Some(line) = status.current_line {
        println!("  line: {line}");
    }
    match status.playing_line {
        Some(line) => println!("  playing: line {}", line.to_string().green()),
        None => println!("  playing: {}", "nothing".dimmed()),
    }
    if let Some(centered) = centered {
        println!("  on screen: {centered}");
    }
    let mounted: Vec<String> = status
        .mounted
        .iter()
        .map(|index| (index + 1).to_string())
        .collect();
    println!("  mounted positions: {}", mounted.join(", ").dimmed());
    if status.rebuilding || status.jumping {
        println!(
            "  busy: {}{}",
            if status.rebuilding { "rebuilding " } else { "" },
            if status.jumping { "navigating" } else { "" }
        );
    }
    if status.dropped_rebuilds > 0 {
        println!(
            "  coalesced rebuilds: {}",
            status.dropped_rebuilds.to_string().dimmed()
        );
    }
}

fn print_help() {
    println!("{}", "Commands".bold());
    let rows = [
        ("n, next", "scroll down one video"),
        ("p, prev", "scroll up one video"),
        ("g N, jump N, N", "jump to line N of the list"),
        ("t, toggle", "switch between random and sequential order"),
        ("tap", "play or pause the video on screen"),
        ("s, status", "show where you are"),
        ("h, help", "show this help"),
        ("q, quit", "leave"),
    ];
    for (keys, text) in rows {
        println!("  {} {text}", format!("{keys:<16}").cyan());
    }
}
