//! # Clauson Sözlük
//!
//! Ingestion, seeding and machine-translation pipeline for the entries of
//! Clauson's etymological dictionary.
//!
//! The translation side is built to run for hours against a rate-limited
//! generative text API: work is split between workers by a numeric
//! identity, every batch is retried and re-keyed as needed, and progress is
//! snapshotted atomically after each batch.
//!
//! ## Features
//!
//! - **Headword normalization**: canonical matching keys for search
//! - **Dual-bounded batching**: by entry count and by text length
//! - **Credential rotation**: switch API keys on quota exhaustion
//! - **Response repair**: unwrap fenced JSON, pass through malformed answers
//! - **Atomic snapshots**: a crash never leaves a truncated output file
//! - **Seeding**: normalized, batched upload to the dictionary backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clauson_sozluk::{Config, GeminiService, JobDriver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.translation.api_keys = vec!["your-api-key".to_string()];
//!
//!     let service = GeminiService::new(&config.translation)?;
//!     let mut driver = JobDriver::from_config(&config, 0, service)?;
//!     let report = driver.run().await?;
//!
//!     report.print_summary();
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Settings are read from a JSON file, environment variables (prefixed with
//! `SOZLUK_`) and command-line arguments. See [`Config`] for all options.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batcher;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod entry;
pub mod error;
pub mod normalize;
pub mod persist;
pub mod processor;
pub mod seeder;
pub mod service;
pub mod split;
pub mod tracker;
pub mod translator;

// Re-exports for convenience
pub use batcher::{make_batches, Batches};
pub use config::{
    Args, BatchingConfig, Command, Config, JobsConfig, ResumeMode, RetryConfig, SeedConfig,
    TranslationConfig,
};
pub use credentials::CredentialRotator;
pub use driver::{JobDriver, JobPlan, JobReport, JobStatus};
pub use entry::{Entry, Field, SeedRecord, TranslatedFields};
pub use error::{Result, SozlukError};
pub use normalize::normalize;
pub use processor::{merge, BatchOutcome, BatchProcessor};
pub use seeder::{SeedReport, Seeder};
pub use service::{CompletionService, ErrorKind, GeminiService, ServiceError};
pub use tracker::{StatsSnapshot, StatsTracker};
pub use translator::{Translation, TranslationClient};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
