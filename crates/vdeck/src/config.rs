use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::{FeedOptions, PlayMode};

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "vdeck";

pub const VALID_KEYS: &[&str] = &[
    "defaults.start_mode",
    "defaults.autoplay",
    "feed.render_buffer",
    "feed.preload_ahead",
    "feed.visibility_threshold",
    "feed.annotation_ms",
    "feed.annotation_fade_ms",
    "feed.rebuild_settle_ms",
    "feed.jump_settle_ms",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed: Option<FeedConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoplay: Option<AutoplayPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_buffer: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preload_ahead: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_threshold: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_fade_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebuild_settle_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_settle_ms: Option<u64>,
}

/// How the terminal player answers unmuted autoplay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AutoplayPolicy {
    /// Everything may start with sound.
    #[default]
    Allow,
    /// Only muted playback may start on its own, like most browsers.
    Muted,
    /// Every start is refused.
    Block,
}

impl AutoplayPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "allow" => Some(Self::Allow),
            "muted" => Some(Self::Muted),
            "block" => Some(Self::Block),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Muted => "muted",
            Self::Block => "block",
        }
    }
}

impl std::fmt::Display for AutoplayPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `vdeck config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# vdeck configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.start_mode" => {
                let Some(mode) = PlayMode::from_name(value) else {
                    anyhow::bail!("Invalid start_mode: {value}. Must be 'random' or 'sequential'.");
                };
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .start_mode = Some(mode.name().to_string());
            }
            "defaults.autoplay" => {
                let Some(policy) = AutoplayPolicy::from_name(value) else {
                    anyhow::bail!(
                        "Invalid autoplay policy: {value}. Must be 'allow', 'muted', or 'block'."
                    );
                };
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .autoplay = Some(policy);
            }
            "feed.render_buffer" => {
                let buffer = parse_number::<usize>(key, value)?;
                if !valid_render_buffer(buffer) {
                    anyhow::bail!("Invalid render_buffer: {value}. Must be at least 1.");
                }
                self.feed_mut().render_buffer = Some(buffer);
            }
            "feed.preload_ahead" => {
                self.feed_mut().preload_ahead = Some(parse_number(key, value)?);
            }
            "feed.visibility_threshold" => {
                let threshold = parse_number::<f32>(key, value)?;
                if !valid_threshold(threshold) {
                    anyhow::bail!(
                        "Invalid visibility_threshold: {value}. Must be greater than 0 and at most 1."
                    );
                }
                self.feed_mut().visibility_threshold = Some(threshold);
            }
            "feed.annotation_ms" => {
                self.feed_mut().annotation_ms = Some(parse_number(key, value)?);
            }
            "feed.annotation_fade_ms" => {
                self.feed_mut().annotation_fade_ms = Some(parse_number(key, value)?);
            }
            "feed.rebuild_settle_ms" => {
                self.feed_mut().rebuild_settle_ms = Some(parse_number(key, value)?);
            }
            "feed.jump_settle_ms" => {
                self.feed_mut().jump_settle_ms = Some(parse_number(key, value)?);
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: {}",
                VALID_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    fn feed_mut(&mut self) -> &mut FeedConfig {
        self.feed.get_or_insert_with(FeedConfig::default)
    }

    pub fn start_mode(&self) -> Option<PlayMode> {
        self.defaults
            .as_ref()
            .and_then(|d| d.start_mode.as_deref())
            .and_then(PlayMode::from_name)
    }

    pub fn autoplay(&self) -> AutoplayPolicy {
        self.defaults
            .as_ref()
            .and_then(|d| d.autoplay)
            .unwrap_or_default()
    }

    /// Feed options with configured values over the built-in defaults.
    pub fn feed_options(&self) -> FeedOptions {
        let mut options = FeedOptions::default();
        if let Some(mode) = self.start_mode() {
            options.start_mode = mode;
        }
        let Some(feed) = &self.feed else {
            return options;
        };
        let millis = Duration::from_millis;
        match feed.render_buffer {
            Some(buffer) if valid_render_buffer(buffer) => options.render_buffer = buffer,
            Some(buffer) => warn!(
                "Ignoring feed.render_buffer {buffer} from config, using {}",
                options.render_buffer
            ),
            None => {}
        }
        if let Some(ahead) = feed.preload_ahead {
            options.preload_ahead = ahead;
        }
        match feed.visibility_threshold {
            Some(threshold) if valid_threshold(threshold) => {
                options.visibility_threshold = threshold;
            }
            Some(threshold) => warn!(
                "Ignoring feed.visibility_threshold {threshold} from config, using {}",
                options.visibility_threshold
            ),
            None => {}
        }
        if let Some(ms) = feed.annotation_ms {
            options.annotation_visible = millis(ms);
        }
        if let Some(ms) = feed.annotation_fade_ms {
            options.annotation_fade = millis(ms);
        }
        if let Some(ms) = feed.rebuild_settle_ms {
            options.rebuild_settle = millis(ms);
        }
        if let Some(ms) = feed.jump_settle_ms {
            options.jump_settle = millis(ms);
        }
        options
    }
}

fn valid_render_buffer(buffer: usize) -> bool {
    buffer >= 1
}

/// Greater than 0 and at most 1. Rejects NaN.
fn valid_threshold(threshold: f32) -> bool {
    threshold > 0.0 && threshold <= 1.0
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {key}: {value}. Must be a number."))
}
