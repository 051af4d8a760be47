//! Session and source configuration
//!
//! Values come from the process environment, after `.env` and the optional
//! `streamstat.config` file have been merged in. Durations and the report
//! sink can also be asked for on the terminal when they are missing.

use reqwest::Url;
use std::env;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_FILE_VAR: &str = "STREAMSTAT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "streamstat.config";

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing configuration value: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where finished reports are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Console,
    TextFile,
    Jsonl,
}

impl FromStr for SinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "console" => Ok(SinkMode::Console),
            "2" | "file" | "text" => Ok(SinkMode::TextFile),
            "3" | "jsonl" => Ok(SinkMode::Jsonl),
            other => Err(format!("unknown report sink '{}' (expected 1/console, 2/file or 3/jsonl)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub total_run: Duration,
    pub interval: Duration,
    pub sink: SinkMode,
    pub output_dir: PathBuf,
    pub readiness_timeout: Duration,
    pub readiness_poll: Duration,
    pub top_k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Replay,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(SourceKind::Http),
            "replay" => Ok(SourceKind::Replay),
            other => Err(format!("unknown stream source '{}' (expected http or replay)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Http {
        url: Url,
        bearer_token: Option<String>,
        connect_timeout: Duration,
    },
    Replay {
        path: PathBuf,
        pace: Duration,
    },
}

/// Interactive fallback for settings missing from the environment
pub trait SettingsPrompt {
    /// Ask a question; `None` when no more input is available
    fn ask(&mut self, question: &str) -> Option<String>;

    /// Tell the user why the last answer was rejected
    fn reject(&mut self, reason: &str);
}

/// Line-based prompt over any reader/writer pair (stdin/stdout in the binary)
pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> SettingsPrompt for Prompter<R, W> {
    fn ask(&mut self, question: &str) -> Option<String> {
        let _ = write!(self.output, "{} ", question);
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn reject(&mut self, reason: &str) {
        let _ = writeln!(self.output, "Invalid input: {}", reason);
    }
}

/// Merge the settings file into the environment.
///
/// The path comes from `STREAMSTAT_CONFIG` (default `streamstat.config`).
/// Variables already present in the environment are never overridden.
pub fn load_settings_file() {
    let path = env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let path = Path::new(&path);
    if !path.exists() {
        log::debug!("No settings file at {}", path.display());
        return;
    }

    match dotenv::from_path(path) {
        Ok(()) => log::info!("⚙️  Loaded settings from {}", path.display()),
        Err(e) => log::warn!("⚠️  Could not read settings file {}: {}", path.display(), e),
    }
}

fn env_lookup(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

impl SessionConfig {
    pub fn from_env(prompt: Option<&mut dyn SettingsPrompt>) -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup, prompt)
    }

    /// Build the session configuration from any key lookup
    ///
    /// Variables:
    /// - `TOTAL_RUN_SECS` (required, > 0)
    /// - `INTERVAL_SECS` (required, > 0 and <= total)
    /// - `REPORT_SINK` (required: 1/console, 2/file, 3/jsonl)
    /// - `REPORT_OUTPUT_DIR` (default: reports)
    /// - `READINESS_TIMEOUT_SECS` (default: 60)
    /// - `READINESS_POLL_MS` (default: 500)
    /// - `REPORT_TOP_K` (default: 3)
    pub fn from_lookup<F>(lookup: F, mut prompt: Option<&mut dyn SettingsPrompt>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let total_secs = resolve(
            &lookup,
            &mut prompt,
            "TOTAL_RUN_SECS",
            "Total run time in seconds?",
            |s| parse_positive_secs(s),
        )?;

        let interval_secs = resolve(
            &lookup,
            &mut prompt,
            "INTERVAL_SECS",
            "Report interval in seconds?",
            |s| {
                let secs = parse_positive_secs(s)?;
                if secs > total_secs {
                    return Err(format!("interval must not exceed the total run time of {}s", total_secs));
                }
                Ok(secs)
            },
        )?;

        let sink = resolve(
            &lookup,
            &mut prompt,
            "REPORT_SINK",
            "Report output? 1) console 2) text files 3) jsonl",
            |s| s.parse::<SinkMode>(),
        )?;

        let config = Self {
            total_run: Duration::from_secs(total_secs),
            interval: Duration::from_secs(interval_secs),
            sink,
            output_dir: lookup("REPORT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("reports")),
            readiness_timeout: Duration::from_secs(optional(&lookup, "READINESS_TIMEOUT_SECS", 60)?),
            readiness_poll: Duration::from_millis(optional(&lookup, "READINESS_POLL_MS", 500)?),
            top_k: optional(&lookup, "REPORT_TOP_K", 3)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_run.is_zero() {
            return Err(ConfigError::InvalidValue("total run time must be greater than 0".to_string()));
        }
        if self.interval.is_zero() || self.interval > self.total_run {
            return Err(ConfigError::InvalidValue(
                "interval must be greater than 0 and at most the total run time".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigError::InvalidValue("REPORT_TOP_K must be greater than 0".to_string()));
        }
        if self.readiness_poll.is_zero() {
            return Err(ConfigError::InvalidValue("READINESS_POLL_MS must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Number of full windows this session will schedule
    pub fn window_count(&self) -> u64 {
        (self.total_run.as_millis() / self.interval.as_millis().max(1)) as u64
    }
}

impl SourceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Variables:
    /// - `STREAM_SOURCE` (default: http)
    /// - `STREAM_URL`, `STREAM_BEARER_TOKEN`, `CONNECT_TIMEOUT_SECS` (default: 100) for http
    /// - `REPLAY_PATH`, `REPLAY_PACE_MS` (default: 0) for replay
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match lookup("STREAM_SOURCE") {
            Some(raw) => raw
                .parse::<SourceKind>()
                .map_err(|e| ConfigError::InvalidValue(format!("STREAM_SOURCE: {}", e)))?,
            None => SourceKind::Http,
        };

        match kind {
            SourceKind::Http => {
                let raw = lookup("STREAM_URL")
                    .ok_or_else(|| ConfigError::MissingVariable("STREAM_URL".to_string()))?;
                let url = Url::parse(raw.trim())
                    .map_err(|e| ConfigError::InvalidValue(format!("STREAM_URL: {}", e)))?;

                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ConfigError::InvalidValue(
                        "STREAM_URL must start with http:// or https://".to_string(),
                    ));
                }

                Ok(SourceConfig::Http {
                    url,
                    bearer_token: lookup("STREAM_BEARER_TOKEN"),
                    connect_timeout: Duration::from_secs(optional(&lookup, "CONNECT_TIMEOUT_SECS", 100)?),
                })
            }
            SourceKind::Replay => {
                let path = lookup("REPLAY_PATH")
                    .ok_or_else(|| ConfigError::MissingVariable("REPLAY_PATH".to_string()))?;

                Ok(SourceConfig::Replay {
                    path: PathBuf::from(path),
                    pace: Duration::from_millis(optional(&lookup, "REPLAY_PACE_MS", 0)?),
                })
            }
        }
    }
}

fn parse_positive_secs(raw: &str) -> Result<u64, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err("value must be greater than 0".to_string()),
        Ok(secs) => Ok(secs),
        Err(_) => Err(format!("'{}' is not a whole number of seconds", raw.trim())),
    }
}

fn optional<T, F>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}: '{}' is not a valid number", var, raw.trim()))),
        None => Ok(default),
    }
}

/// Look a value up, falling back to asking until the answer parses
fn resolve<T, F, P>(
    lookup: &F,
    prompt: &mut Option<&mut dyn SettingsPrompt>,
    var: &str,
    question: &str,
    parse: P,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, String>,
{
    if let Some(raw) = lookup(var) {
        return parse(&raw).map_err(|e| ConfigError::InvalidValue(format!("{}: {}", var, e)));
    }

    let Some(prompt) = prompt.as_mut() else {
        return Err(ConfigError::MissingVariable(var.to_string()));
    };

    loop {
        let answer = prompt
            .ask(question)
            .ok_or_else(|| ConfigError::MissingVariable(var.to_string()))?;

        match parse(&answer) {
            Ok(value) => return Ok(value),
            Err(reason) => prompt.reject(&reason),
        }
    }
}
