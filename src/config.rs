//! Configuration management for the dictionary pipeline.
//!
//! Settings come from an optional JSON file, environment variables
//! (prefixed with `SOZLUK_`) and command-line arguments, in increasing
//! order of precedence. Secrets are never compiled in.

use crate::error::{Result, SozlukError};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI arguments for the `sozluk` tool.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sozluk",
    version,
    about = "Clauson dictionary ingestion, seeding and translation pipeline",
    long_about = "Translates dictionary entries to Turkish in resumable, credential-rotating\n\
                  batches, splits source files between workers and seeds the dictionary backend.",
    after_help = "EXAMPLES:\n    \
        sozluk split eksik_kelimeler.json --parts 3\n    \
        sozluk translate 0\n    \
        sozluk --config sozluk.json seed --data-dir frontend/public/data"
)]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, global = true, env = "SOZLUK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, env = "SOZLUK_VERBOSE")]
    pub verbose: bool,

    /// Output logs as JSON
    #[arg(long, global = true, env = "SOZLUK_JSON_LOGS")]
    pub json_logs: bool,

    /// Disable progress bar
    #[arg(long, global = true, env = "SOZLUK_NO_PROGRESS")]
    pub no_progress: bool,

    /// What to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the `sozluk` tool.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Translate the input file assigned to one worker
    Translate {
        /// Worker identity; selects the input file and the first API key
        worker_id: usize,

        /// Resume a partially written output file instead of skipping it
        #[arg(long)]
        resume_batches: bool,
    },

    /// Clear the backend and upload every entry file in a directory
    Seed {
        /// Directory with entry JSON files (overrides the config file)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Do not clear existing entries before uploading
        #[arg(long)]
        no_clear: bool,
    },

    /// Split one entry file into contiguous parts, one per worker
    Split {
        /// Entry file to split
        input: PathBuf,

        /// Number of parts
        #[arg(short, long, default_value = "3")]
        parts: usize,

        /// Directory for the parts (defaults to the configured input directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl Args {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Translation service settings.
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Batch sizing.
    #[serde(default)]
    pub batching: BatchingConfig,

    /// Retry settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Worker file assignment.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Seeding endpoint settings.
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Translation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Base URL of the generative language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// API keys, rotated on quota exhaustion.
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Wait ceiling for one completion call.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// File holding a replacement instruction profile.
    #[serde(default)]
    pub instructions_file: Option<PathBuf>,

    /// Pace completion calls to at most this many per minute.
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_keys: Vec::new(),
            timeout: default_timeout(),
            instructions_file: None,
            requests_per_minute: None,
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Batch sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Maximum entries per batch.
    #[serde(default = "default_max_count")]
    pub max_count: usize,

    /// Maximum cumulative `full_entry_text` characters per batch.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_count() -> usize {
    4
}

fn default_max_chars() -> usize {
    15_000
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt for generic failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause after rotating away from a rate-limited key.
    #[serde(with = "humantime_serde", default = "default_rate_limit_delay")]
    pub rate_limit_delay: Duration,

    /// Pause before retrying a generic failure.
    #[serde(with = "humantime_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            rate_limit_delay: default_rate_limit_delay(),
            retry_delay: default_retry_delay(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

/// How an existing output file is treated when a worker starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// An existing output file means the whole file is done.
    #[default]
    WholeFile,
    /// Continue after the entries already present in the output file.
    Batch,
}

/// Worker file assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Directory with the per-worker input files.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Directory for translated output files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Input file names; worker `n` takes `files[n]`.
    #[serde(default = "default_files")]
    pub files: Vec<String>,

    /// Prefix prepended to the input name to form the output name.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Resume policy for existing outputs.
    #[serde(default)]
    pub resume: ResumeMode,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            files: default_files(),
            output_prefix: default_output_prefix(),
            resume: ResumeMode::default(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("parcalar")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("cikti")
}

fn default_files() -> Vec<String> {
    (1..=3).map(|i| format!("part_{i}.json")).collect()
}

fn default_output_prefix() -> String {
    "TURKCE_".to_string()
}

/// Seeding endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Base URL of the backend API; `/seed` and `/seed/clear` are appended.
    #[serde(default = "default_seed_url")]
    pub base_url: String,

    /// Shared secret sent as `X-Admin-Secret`.
    #[serde(default)]
    pub admin_secret: String,

    /// Entries per upload request.
    #[serde(default = "default_seed_batch_size")]
    pub batch_size: usize,

    /// Directory with entry files to upload.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Request timeout.
    #[serde(with = "humantime_serde", default = "default_seed_timeout")]
    pub timeout: Duration,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_seed_url(),
            admin_secret: String::new(),
            batch_size: default_seed_batch_size(),
            data_dir: default_data_dir(),
            timeout: default_seed_timeout(),
        }
    }
}

fn default_seed_url() -> String {
    "http://localhost:8787/api".to_string()
}

fn default_seed_batch_size() -> usize {
    50
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_seed_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SozlukError::InputFileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| SozlukError::JsonParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Create configuration from CLI arguments and the environment.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env(|name| std::env::var(name).ok());

        match &args.command {
            Command::Translate { resume_batches, .. } => {
                if *resume_batches {
                    config.jobs.resume = ResumeMode::Batch;
                }
            }
            Command::Seed { data_dir, .. } => {
                if let Some(dir) = data_dir {
                    config.seed.data_dir = dir.clone();
                }
            }
            Command::Split { .. } => {}
        }

        config.validate(&args.command)?;
        Ok(config)
    }

    /// Override settings from environment variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(keys) = var("SOZLUK_API_KEYS") {
            self.translation.api_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(model) = var("SOZLUK_MODEL") {
            self.translation.model = model;
        }
        if let Some(url) = var("SOZLUK_API_URL") {
            self.translation.base_url = url;
        }
        if let Some(secret) = var("SOZLUK_ADMIN_SECRET") {
            self.seed.admin_secret = secret;
        }
        if let Some(url) = var("SOZLUK_SEED_URL") {
            self.seed.base_url = url;
        }
    }

    /// Validate the settings a command needs.
    pub fn validate(&self, command: &Command) -> Result<()> {
        if self.batching.max_count == 0 || self.batching.max_chars == 0 {
            return Err(SozlukError::InvalidConfig(
                "batch limits must be greater than 0".to_string(),
            ));
        }

        match command {
            Command::Translate { .. } => {
                if self.translation.api_keys.is_empty() {
                    return Err(SozlukError::NoCredentials);
                }
                if self.translation.base_url.is_empty() || self.translation.model.is_empty() {
                    return Err(SozlukError::InvalidConfig(
                        "translation base_url and model cannot be empty".to_string(),
                    ));
                }
                if self.translation.requests_per_minute == Some(0) {
                    return Err(SozlukError::InvalidConfig(
                        "requests_per_minute must be greater than 0".to_string(),
                    ));
                }
            }
            Command::Seed { .. } => {
                if self.seed.base_url.is_empty() {
                    return Err(SozlukError::InvalidConfig(
                        "seed base_url cannot be empty".to_string(),
                    ));
                }
                if self.seed.batch_size == 0 {
                    return Err(SozlukError::InvalidConfig(
                        "seed batch_size must be greater than 0".to_string(),
                    ));
                }
            }
            Command::Split { parts, .. } => {
                if *parts == 0 {
                    return Err(SozlukError::InvalidConfig(
                        "parts must be greater than 0".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Get the request pacing quota, if any.
    pub fn requests_per_minute(&self) -> Option<NonZeroU32> {
        self.translation.requests_per_minute.and_then(NonZeroU32::new)
    }
}

/// Custom serde module for humantime Duration parsing.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // Simple parsing: support "30s", "100ms", or just seconds as number
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate() -> Command {
        Command::Translate {
            worker_id: 0,
            resume_batches: false,
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.batching.max_count, 4);
        assert_eq!(config.batching.max_chars, 15_000);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_secs(5));
        assert_eq!(config.jobs.files, vec!["part_1.json", "part_2.json", "part_3.json"]);
        assert_eq!(config.jobs.resume, ResumeMode::WholeFile);
        assert_eq!(config.seed.batch_size, 50);
    }

    #[test]
    fn test_parse_file_with_durations() {
        let json = r#"{
            "translation": { "api_keys": ["a", "b"], "timeout": "90s" },
            "retry": { "rate_limit_delay": "250ms" },
            "jobs": { "files": ["x.json"], "resume": "batch" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.translation.api_keys.len(), 2);
        assert_eq!(config.translation.timeout, Duration::from_secs(90));
        assert_eq!(config.retry.rate_limit_delay, Duration::from_millis(250));
        assert_eq!(config.retry.retry_delay, Duration::from_secs(5));
        assert_eq!(config.jobs.resume, ResumeMode::Batch);
        assert_eq!(config.translation.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            "SOZLUK_API_KEYS" => Some("k1, k2,,k3".to_string()),
            "SOZLUK_ADMIN_SECRET" => Some("s3cret".to_string()),
            _ => None,
        });

        assert_eq!(config.translation.api_keys, vec!["k1", "k2", "k3"]);
        assert_eq!(config.seed.admin_secret, "s3cret");
        assert_eq!(config.seed.base_url, default_seed_url());
    }

    #[test]
    fn test_validate_translate_requires_keys() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate(&translate()),
            Err(SozlukError::NoCredentials)
        ));

        config.translation.api_keys = vec!["k".to_string()];
        assert!(config.validate(&translate()).is_ok());

        config.translation.requests_per_minute = Some(0);
        assert!(config.validate(&translate()).is_err());
    }

    #[test]
    fn test_validate_split_parts() {
        let config = Config::default();
        let split = |parts| Command::Split {
            input: PathBuf::from("all.json"),
            parts,
            output_dir: None,
        };
        assert!(config.validate(&split(3)).is_ok());
        assert!(config.validate(&split(0)).is_err());
    }

    #[test]
    fn test_cli_requires_worker_id() {
        assert!(Args::try_parse_from(["sozluk", "translate"]).is_err());

        let args = Args::try_parse_from(["sozluk", "--no-progress", "translate", "2"]).unwrap();
        assert!(args.no_progress);
        assert!(matches!(args.command, Command::Translate { worker_id: 2, .. }));
    }
}
