//! Per-worker translation job.
//!
//! A worker identity selects one input file and one output file. The
//! driver loads the input, batches it, sends every batch through the
//! [`BatchProcessor`], merges the result back by position and snapshots the
//! accumulated output after each batch.

use crate::batcher::make_batches;
use crate::config::{BatchingConfig, Config, JobsConfig, ResumeMode};
use crate::credentials::CredentialRotator;
use crate::entry::Entry;
use crate::error::{Result, SozlukError};
use crate::persist;
use crate::processor::{merge, BatchProcessor};
use crate::service::CompletionService;
use crate::tracker::{StatsSnapshot, StatsTracker};
use crate::translator::TranslationClient;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Files assigned to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    /// Worker identity.
    pub worker_id: usize,
    /// Entry file to translate.
    pub input: PathBuf,
    /// Where the translated snapshot is written.
    pub output: PathBuf,
}

impl JobPlan {
    /// Resolve the files of `worker_id`, or `None` if it has no file assigned.
    pub fn for_worker(jobs: &JobsConfig, worker_id: usize) -> Option<Self> {
        let file = jobs.files.get(worker_id)?;
        Some(Self {
            worker_id,
            input: jobs.input_dir.join(file),
            output: jobs
                .output_dir
                .join(format!("{}{}", jobs.output_prefix, file)),
        })
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Every entry was processed and written.
    Completed,
    /// The output already existed; nothing was sent.
    AlreadyComplete,
    /// No input file is assigned to this worker identity.
    Unassigned,
    /// The assigned input file does not exist.
    MissingInput,
}

/// Result of one worker run.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Worker identity.
    pub worker_id: usize,
    /// How the job ended.
    pub status: JobStatus,
    /// Output file, when one was assigned.
    pub output: Option<PathBuf>,
    /// Entries in the output file at the end of the run.
    pub entries_written: usize,
    /// Entries taken over from an earlier partial run.
    pub resumed_from: usize,
    /// Counters for this run.
    pub stats: StatsSnapshot,
}

impl JobReport {
    /// Print a summary of the run.
    pub fn print_summary(&self) {
        let s = &self.stats;
        println!("\n{}", "═".repeat(60));
        println!("              WORKER {} ({:?})", self.worker_id, self.status);
        println!("{}", "═".repeat(60));
        if let Some(output) = &self.output {
            println!("  Output:           {}", output.display());
        }
        println!("  Entries written:  {}", self.entries_written);
        if self.resumed_from > 0 {
            println!("  Resumed after:    {}", self.resumed_from);
        }
        println!(
            "  Batches:          {} ({:.1}% translated)",
            s.batches,
            s.translated_rate()
        );
        println!("  Passed through:   {}", s.passthrough_batches);
        println!("  Service calls:    {}", s.calls);
        println!("  Retries:          {}", s.retries);
        println!("  Key switches:     {}", s.rotations);
        println!("  Elapsed Time:     {:.2}s", s.elapsed.as_secs_f64());
        println!("{}", "═".repeat(60));
    }
}

/// Runs the translation job of one worker.
pub struct JobDriver<S> {
    worker_id: usize,
    jobs: JobsConfig,
    batching: BatchingConfig,
    processor: BatchProcessor<S>,
    stats: StatsTracker,
    show_progress: bool,
}

impl<S: CompletionService> JobDriver<S> {
    /// Create a driver around an existing processor.
    pub fn new(config: &Config, worker_id: usize, processor: BatchProcessor<S>) -> Self {
        Self {
            worker_id,
            jobs: config.jobs.clone(),
            batching: config.batching.clone(),
            processor,
            stats: StatsTracker::new(),
            show_progress: false,
        }
    }

    /// Build the processor for `worker_id` from configuration and a service.
    pub fn from_config(config: &Config, worker_id: usize, service: S) -> Result<Self> {
        let rotator = CredentialRotator::new(config.translation.api_keys.clone(), worker_id)?;

        let client = match &config.translation.instructions_file {
            Some(path) => {
                let instructions =
                    std::fs::read_to_string(path).map_err(|e| SozlukError::InputFileRead {
                        path: path.clone(),
                        source: e,
                    })?;
                TranslationClient::with_instructions(service, instructions)
            }
            None => TranslationClient::new(service),
        };

        let mut processor = BatchProcessor::new(client, rotator, config.retry.clone());
        if let Some(per_minute) = config.requests_per_minute() {
            processor = processor.with_rate_limit(per_minute);
        }

        Ok(Self::new(config, worker_id, processor))
    }

    /// Show a progress bar while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// The batch processor.
    pub fn processor(&self) -> &BatchProcessor<S> {
        &self.processor
    }

    /// Run the job to completion.
    ///
    /// Setup problems (no file assigned, missing input) are reported in the
    /// returned [`JobStatus`]; batch failures never end the job.
    pub async fn run(&mut self) -> Result<JobReport> {
        let worker_id = self.worker_id;
        let Some(plan) = JobPlan::for_worker(&self.jobs, worker_id) else {
            warn!(
                worker = worker_id,
                files = self.jobs.files.len(),
                "No input file assigned to this worker"
            );
            return Ok(self.report(JobStatus::Unassigned, None, 0, 0));
        };

        let mut done: Vec<Entry> = Vec::new();
        if plan.output.exists() {
            match self.jobs.resume {
                ResumeMode::WholeFile => {
                    info!(worker = worker_id, output = %plan.output.display(), "Output already complete");
                    return Ok(self.report(JobStatus::AlreadyComplete, Some(plan.output), 0, 0));
                }
                ResumeMode::Batch => done = persist::load(&plan.output)?,
            }
        }

        if !plan.input.exists() {
            error!(worker = worker_id, input = %plan.input.display(), "Input file not found");
            return Ok(self.report(JobStatus::MissingInput, Some(plan.output), 0, 0));
        }

        let mut entries = persist::load(&plan.input)?;
        if !is_prefix_of(&done, &entries) {
            warn!(
                worker = worker_id,
                output = %plan.output.display(),
                "Snapshot does not match the input, starting over"
            );
            done.clear();
        }
        let resumed_from = done.len();
        if plan.output.exists() && resumed_from >= entries.len() {
            info!(worker = worker_id, output = %plan.output.display(), "Output already complete");
            return Ok(self.report(
                JobStatus::AlreadyComplete,
                Some(plan.output),
                resumed_from,
                resumed_from,
            ));
        }
        let remaining = entries.split_off(resumed_from);

        info!(
            worker = worker_id,
            input = %plan.input.display(),
            output = %plan.output.display(),
            entries = remaining.len(),
            resumed_from,
            "Starting translation"
        );

        if let Some(dir) = plan.output.parent() {
            std::fs::create_dir_all(dir).map_err(|e| SozlukError::OutputFileWrite {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        self.stats.set_total_entries(remaining.len());
        let progress = self.progress_bar(remaining.len());

        let mut saved = false;
        let batches = make_batches(remaining, self.batching.max_count, self.batching.max_chars);
        for (index, mut batch) in batches.enumerate() {
            let outcome = self.processor.process(&batch).await;
            merge(&mut batch, &outcome.translation);
            self.stats.record_batch(batch.len(), &outcome);

            let size = batch.len();
            done.extend(batch);

            saved = match persist::save(&done, &plan.output) {
                Ok(()) => true,
                Err(e) => {
                    error!(worker = worker_id, batch = index, error = %e, "Failed to save progress");
                    false
                }
            };

            let snapshot = self.stats.snapshot();
            debug!(
                worker = worker_id,
                batch = index,
                size,
                done = done.len(),
                eta_secs = snapshot.eta().map(|d| d.as_secs()),
                "Batch finished"
            );
            if let Some(pb) = &progress {
                pb.set_message(snapshot.summary());
                pb.inc(size as u64);
            }
        }

        // Covers empty inputs and a failed final snapshot.
        if !saved {
            persist::save(&done, &plan.output)?;
        }

        if let Some(pb) = &progress {
            pb.finish_with_message("Complete!");
        }

        info!(
            worker = worker_id,
            output = %plan.output.display(),
            entries = done.len(),
            "Translation finished"
        );

        Ok(self.report(
            JobStatus::Completed,
            Some(plan.output),
            done.len(),
            resumed_from,
        ))
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{prefix} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░");
        pb.set_style(style);
        pb.set_prefix(format!("P{}", self.worker_id));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    fn report(
        &self,
        status: JobStatus,
        output: Option<PathBuf>,
        entries_written: usize,
        resumed_from: usize,
    ) -> JobReport {
        JobReport {
            worker_id: self.worker_id,
            status,
            output,
            entries_written,
            resumed_from,
            stats: self.stats.snapshot(),
        }
    }
}

/// Whether `done` holds the leading entries of `input`, compared by headword.
fn is_prefix_of(done: &[Entry], input: &[Entry]) -> bool {
    done.len() <= input.len() && done.iter().zip(input).all(|(a, b)| a.word() == b.word())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_plan_for_worker() {
        let jobs = JobsConfig {
            input_dir: PathBuf::from("in"),
            output_dir: PathBuf::from("out"),
            files: vec!["part_1.json".to_string(), "part_2.json".to_string()],
            output_prefix: "TURKCE_".to_string(),
            resume: ResumeMode::WholeFile,
        };

        let plan = JobPlan::for_worker(&jobs, 1).unwrap();
        assert_eq!(plan.input, Path::new("in/part_2.json"));
        assert_eq!(plan.output, Path::new("out/TURKCE_part_2.json"));

        assert!(JobPlan::for_worker(&jobs, 2).is_none());
    }

    #[test]
    fn test_snapshot_prefix() {
        let input: Vec<Entry> = ["a", "b", "c"]
            .iter()
            .map(|w| Entry::new(*w, "m", "t"))
            .collect();

        assert!(is_prefix_of(&[], &input));
        assert!(is_prefix_of(&input[..2], &input));
        assert!(is_prefix_of(&input, &input));
        assert!(!is_prefix_of(&input[1..], &input));

        let mut longer = input.clone();
        longer.push(Entry::new("d", "m", "t"));
        assert!(!is_prefix_of(&longer, &input));
    }
}
