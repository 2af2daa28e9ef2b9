use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::config::AutoplayPolicy;

#[derive(Parser)]
#[command(name = "vdeck")]
#[command(author, version, about)]
#[command(long_about = "A vertical video feed driven by a plain list of URLs.\n\n\
    Put one video URL per line in a text file and scroll through them.\n\n\
    Examples:\n  \
    vdeck videos.txt                  Open the feed in random order\n  \
    vdeck videos.txt --sequential     Keep the list order\n  \
    vdeck videos.txt --line 12        Start at line 12 of the list\n  \
    vdeck check videos.txt            Validate a list without playing it")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Video list to open (file path or http(s) URL)
    pub list: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Start in list order
    #[arg(long, global = false, conflicts_with = "random")]
    pub sequential: bool,

    /// Start in random order
    #[arg(long, global = false)]
    pub random: bool,

    /// Jump to a line of the list (1-indexed) once loaded
    #[arg(long, global = false)]
    pub line: Option<usize>,

    /// Seed the shuffle for a reproducible random order
    #[arg(long, global = false)]
    pub seed: Option<u64>,

    /// How the player answers unmuted autoplay
    #[arg(long, global = false, value_enum)]
    pub autoplay: Option<AutoplayPolicy>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a list and report entries, blank lines and duplicates
    Check {
        /// Video list to check (file path or http(s) URL)
        list: String,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.start_mode, defaults.autoplay, feed.render_buffer)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// Flags that shape the interactive session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionArgs {
    pub sequential: bool,
    pub random: bool,
    pub line: Option<usize>,
    pub seed: Option<u64>,
    pub autoplay: Option<AutoplayPolicy>,
}

impl Cli {
    /// Default log filter for `-q` / `-v` / `-vv`.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Warn;
        }
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Check { list }) => crate::commands::check::run(&list),
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("vdeck {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            None => {
                if let Some(list) = self.list {
                    let args = SessionArgs {
                        sequential: self.sequential,
                        random: self.random,
                        line: self.line,
                        seed: self.seed,
                        autoplay: self.autoplay,
                    };
                    crate::app::run(&list, args, self.quiet)
                } else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}
