//! Monitor configuration, read from `~/.tabwatch/config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//!
//! ```toml
//! [poll]
//! interval_ms = 1000
//! idle_confirm_polls = 2
//!
//! [summary]
//! max_length = 200
//! command = ["claude", "-p", "Summarize this terminal output in one sentence."]
//!
//! [sessions]
//! tracked_keywords = ["claude", "claude-code", "npx claude"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::classifier::DEFAULT_IDLE_CONFIRM_POLLS;
use crate::error::{MonitorError, Result};
use crate::registry::{RegistryPolicy, DEFAULT_TAIL_MAX_CHARS};
use crate::source::DEFAULT_TRACKED_KEYWORDS;
use crate::summary::{DEFAULT_SUMMARY_INPUT_CHARS, DEFAULT_SUMMARY_MAX_LENGTH};
use crate::trigger::DEFAULT_COMPARE_WINDOW_CHARS;

const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".tabwatch/config.toml";
const DEFAULT_LOG_RELATIVE_DIR: &str = ".tabwatch/logs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
    #[serde(default = "default_tail_chars")]
    pub tail_chars: usize,
    #[serde(default = "default_compare_window_chars")]
    pub compare_window_chars: usize,
    #[serde(default = "default_idle_confirm_polls")]
    pub idle_confirm_polls: u32,
    /// Upper bound for any single call out to tmux or a summarizer command.
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            tick_ms: default_tick_ms(),
            tail_lines: default_tail_lines(),
            tail_chars: default_tail_chars(),
            compare_window_chars: default_compare_window_chars(),
            idle_confirm_polls: default_idle_confirm_polls(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_max_length")]
    pub max_length: usize,
    #[serde(default = "default_summary_input_chars")]
    pub input_chars: usize,
    /// Program and arguments; the shaped tail is written to its stdin.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_length: default_summary_max_length(),
            input_chars: default_summary_input_chars(),
            command: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_tracked_keywords")]
    pub tracked_keywords: Vec<String>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            tracked_keywords: default_tracked_keywords(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.poll.tick_ms)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.poll.collaborator_timeout_ms)
    }

    pub fn registry_policy(&self) -> RegistryPolicy {
        RegistryPolicy {
            idle_confirm_polls: self.poll.idle_confirm_polls,
            compare_window_chars: self.poll.compare_window_chars,
            tail_max_chars: self.poll.tail_chars,
        }
    }

    /// Replaces values that would stall or disable the loop with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = PollConfig::default();
        if self.poll.interval_ms == 0 {
            warn!("poll.interval_ms must be positive; using default");
            self.poll.interval_ms = defaults.interval_ms;
        }
        if self.poll.tick_ms == 0 {
            warn!("poll.tick_ms must be positive; using default");
            self.poll.tick_ms = defaults.tick_ms;
        }
        if self.poll.idle_confirm_polls == 0 {
            warn!("poll.idle_confirm_polls must be at least 1; using default");
            self.poll.idle_confirm_polls = defaults.idle_confirm_polls;
        }
        if self.poll.compare_window_chars == 0 {
            warn!("poll.compare_window_chars must be positive; using default");
            self.poll.compare_window_chars = defaults.compare_window_chars;
        }
        if matches!(&self.summary.command, Some(command) if command.is_empty()) {
            warn!("summary.command is empty; ignoring it");
            self.summary.command = None;
        }
        self
    }
}

fn default_interval_ms() -> u64 {
    1_000
}

fn default_tick_ms() -> u64 {
    100
}

fn default_tail_lines() -> usize {
    1_000
}

fn default_tail_chars() -> usize {
    DEFAULT_TAIL_MAX_CHARS
}

fn default_compare_window_chars() -> usize {
    DEFAULT_COMPARE_WINDOW_CHARS
}

fn default_idle_confirm_polls() -> u32 {
    DEFAULT_IDLE_CONFIRM_POLLS
}

fn default_collaborator_timeout_ms() -> u64 {
    5_000
}

fn default_summary_max_length() -> usize {
    DEFAULT_SUMMARY_MAX_LENGTH
}

fn default_summary_input_chars() -> usize {
    DEFAULT_SUMMARY_INPUT_CHARS
}

fn default_tracked_keywords() -> Vec<String> {
    DEFAULT_TRACKED_KEYWORDS
        .iter()
        .map(|keyword| keyword.to_string())
        .collect()
}

pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(MonitorError::HomeDirNotFound)?;
    Ok(home.join(DEFAULT_CONFIG_RELATIVE_PATH))
}

pub fn default_log_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(MonitorError::HomeDirNotFound)?;
    Ok(home.join(DEFAULT_LOG_RELATIVE_DIR))
}

pub fn load_config(path: Option<PathBuf>) -> Result<MonitorConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(MonitorConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|err| MonitorError::Io {
        context: format!("reading config {}", config_path.display()),
        source: err,
    })?;
    let config =
        toml::from_str::<MonitorConfig>(&content).map_err(|err| MonitorError::ConfigMalformed {
            path: config_path.clone(),
            details: err.to_string(),
        })?;
    Ok(config.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("missing.toml");
        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(1_000));
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.collaborator_timeout(), Duration::from_secs(5));
        assert_eq!(config.sessions.tracked_keywords.len(), 3);
        assert!(config.summary.command.is_none());
    }

    #[test]
    fn load_config_parses_partial_sections() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
[poll]
interval_ms = 250
idle_confirm_polls = 3

[summary]
command = ["claude", "-p", "Summarize briefly."]

[sessions]
tracked_keywords = ["codex"]
"#,
        )
        .expect("write config");

        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.tick_ms, 100);
        assert_eq!(config.poll.tail_lines, 1_000);
        assert_eq!(config.summary.max_length, 200);
        assert_eq!(
            config.summary.command,
            Some(vec![
                "claude".to_string(),
                "-p".to_string(),
                "Summarize briefly.".to_string()
            ])
        );
        assert_eq!(config.sessions.tracked_keywords, vec!["codex".to_string()]);

        let policy = config.registry_policy();
        assert_eq!(policy.idle_confirm_polls, 3);
        assert_eq!(policy.tail_max_chars, 20_000);
        assert_eq!(policy.compare_window_chars, 1_000);
    }

    #[test]
    fn load_config_rejects_malformed_toml() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[poll\ninterval_ms = ").expect("write config");
        let err = load_config(Some(path)).expect_err("malformed config");
        assert!(matches!(err, MonitorError::ConfigMalformed { .. }));
    }

    #[test]
    fn sanitized_replaces_zero_values() {
        let mut config = MonitorConfig::default();
        config.poll.interval_ms = 0;
        config.poll.tick_ms = 0;
        config.poll.idle_confirm_polls = 0;
        config.summary.command = Some(Vec::new());
        let config = config.sanitized();
        assert_eq!(config.poll.interval_ms, 1_000);
        assert_eq!(config.poll.tick_ms, 100);
        assert_eq!(config.poll.idle_confirm_polls, 2);
        assert!(config.summary.command.is_none());
    }
}
