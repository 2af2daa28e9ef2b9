mod app;
mod cli;
mod commands;
mod terminal;

use clap::Parser;
use env_logger::Env;
use vdeck::{config, feed};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level().as_str()))
        .format_timestamp_millis()
        .init();

    log::debug!("Starting vdeck v{}", env!("CARGO_PKG_VERSION"));
    cli.run()
}
