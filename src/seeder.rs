//! Upload of entries to the dictionary backend.
//!
//! Entries are normalized and posted to `{base_url}/seed` in fixed-size
//! batches. Uploads are fire-and-forget per batch: a rejected batch is
//! logged and counted, and the run carries on with the next one.

use crate::config::SeedConfig;
use crate::entry::{Entry, SeedRecord};
use crate::error::{Result, SozlukError};
use crate::persist;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Header carrying the shared admin secret.
pub const ADMIN_SECRET_HEADER: &str = "X-Admin-Secret";

/// Counters for one seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Entry files read.
    pub files: usize,
    /// Entry files that could not be read.
    pub skipped_files: usize,
    /// Entries accepted by the backend.
    pub sent: usize,
    /// Batches the backend did not accept.
    pub failed_batches: usize,
    /// Entries in those batches.
    pub failed_items: usize,
}

impl SeedReport {
    /// Print a summary of the run.
    pub fn print_summary(&self) {
        println!("\n{}", "═".repeat(60));
        println!("                    SEEDING COMPLETE");
        println!("{}", "═".repeat(60));
        println!("  Files:            {}", self.files);
        if self.skipped_files > 0 {
            println!("  Skipped files:    {}", self.skipped_files);
        }
        println!("  Entries sent:     {}", self.sent);
        println!("  Failed batches:   {}", self.failed_batches);
        println!("  Failed entries:   {}", self.failed_items);
        println!("{}", "═".repeat(60));
    }
}

/// Client for the seeding endpoints.
#[derive(Debug, Clone)]
pub struct Seeder {
    client: Client,
    base_url: String,
    secret: String,
    batch_size: usize,
}

impl Seeder {
    /// Create a seeder from configuration.
    pub fn new(config: &SeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SozlukError::HttpRequest)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret: config.admin_secret.clone(),
            batch_size: config.batch_size.max(1),
        })
    }

    /// Wipe existing entries. Failures are logged, not returned.
    pub async fn clear(&self) -> bool {
        let url = format!("{}/seed/clear", self.base_url);
        info!(url = %url, "Clearing existing entries");

        match self
            .client
            .post(&url)
            .header(ADMIN_SECRET_HEADER, &self.secret)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => {
                let body = response.text().await.unwrap_or_default();
                debug!(body = %body, "Clear accepted");
                true
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                warn!(status, body = %body, "Clear rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "Clear request failed");
                false
            }
        }
    }

    /// Upload one batch. Returns whether the backend accepted it.
    pub async fn upload(&self, records: &[SeedRecord]) -> bool {
        let url = format!("{}/seed", self.base_url);

        match self
            .client
            .post(&url)
            .header(ADMIN_SECRET_HEADER, &self.secret)
            .json(records)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                error!(size = records.len(), status, body = %body, "Batch rejected");
                false
            }
            Err(e) => {
                error!(size = records.len(), error = %e, "Batch upload failed");
                false
            }
        }
    }

    /// Upload every entry file in `dir`, optionally clearing the backend first.
    ///
    /// Files are read in name order; names containing `copy` are skipped.
    /// Batches span file boundaries.
    pub async fn seed_directory(&self, dir: &Path, clear_first: bool) -> Result<SeedReport> {
        let files = entry_files(dir)?;
        let mut report = SeedReport::default();

        if clear_first {
            self.clear().await;
        }

        let mut pending: Vec<SeedRecord> = Vec::with_capacity(self.batch_size);
        for file in &files {
            info!(file = %file.display(), "Processing file");
            let entries = match persist::load(file) {
                Ok(entries) => entries,
                Err(e) => {
                    error!(file = %file.display(), error = %e, "Skipping unreadable file");
                    report.skipped_files += 1;
                    continue;
                }
            };
            report.files += 1;

            for entry in &entries {
                pending.push(SeedRecord::from(entry));
                if pending.len() >= self.batch_size {
                    self.flush(&mut pending, &mut report).await;
                }
            }
        }
        self.flush(&mut pending, &mut report).await;

        info!(sent = report.sent, failed = report.failed_items, "Seeding finished");
        Ok(report)
    }

    /// Upload already loaded entries in batches.
    pub async fn seed_entries(&self, entries: &[Entry]) -> SeedReport {
        let mut report = SeedReport::default();
        for chunk in entries.chunks(self.batch_size) {
            let mut pending: Vec<SeedRecord> = chunk.iter().map(SeedRecord::from).collect();
            self.flush(&mut pending, &mut report).await;
        }
        report
    }

    async fn flush(&self, pending: &mut Vec<SeedRecord>, report: &mut SeedReport) {
        if pending.is_empty() {
            return;
        }

        if self.upload(pending).await {
            report.sent += pending.len();
            info!(size = pending.len(), total = report.sent, "Batch sent");
        } else {
            report.failed_batches += 1;
            report.failed_items += pending.len();
        }
        pending.clear();
    }
}

/// Entry files in `dir`, sorted by name, without `copy` variants.
pub fn entry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_err = |e| SozlukError::InputFileRead {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for item in std::fs::read_dir(dir).map_err(read_err)? {
        let path = item.map_err(read_err)?.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_copy = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains("copy"));
        if path.is_file() && is_json && !is_copy {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
