//! Sözlük CLI - dictionary translation and seeding pipeline.
//!
//! Run `sozluk --help` for usage information.

use anyhow::Result;
use clauson_sozluk::{split, Args, Command, Config, GeminiService, JobDriver, Seeder};
use console::style;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments; a missing worker id is a usage error here
    let args = Args::parse_args();

    setup_logging(&args);

    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    match &args.command {
        Command::Translate { worker_id, .. } => translate(&args, &config, *worker_id).await,
        Command::Seed { no_clear, .. } => seed(&args, &config, !*no_clear).await,
        Command::Split {
            input,
            parts,
            output_dir,
        } => {
            let dir = output_dir.as_ref().unwrap_or(&config.jobs.input_dir);
            let written = split::split_file(input, dir, *parts)?;
            if !args.json_logs {
                for (path, count) in &written {
                    println!(
                        "{} {} ({} entries)",
                        style("✓").green().bold(),
                        path.display(),
                        count
                    );
                }
            }
            Ok(())
        }
    }
}

async fn translate(args: &Args, config: &Config, worker_id: usize) -> Result<()> {
    info!(worker = worker_id, model = %config.translation.model, "Starting worker");

    let service = GeminiService::new(&config.translation)?;
    let mut driver = JobDriver::from_config(config, worker_id, service)?
        .with_progress(!args.no_progress && !args.json_logs);

    let report = driver.run().await?;

    if args.json_logs {
        let json_result = serde_json::json!({
            "status": format!("{:?}", report.status),
            "worker": report.worker_id,
            "entries_written": report.entries_written,
            "resumed_from": report.resumed_from,
            "batches": report.stats.batches,
            "translated_batches": report.stats.translated_batches,
            "passthrough_batches": report.stats.passthrough_batches,
            "calls": report.stats.calls,
            "elapsed_seconds": report.stats.elapsed.as_secs_f64(),
        });
        println!("{}", serde_json::to_string(&json_result)?);
    } else {
        report.print_summary();
    }

    Ok(())
}

async fn seed(args: &Args, config: &Config, clear_first: bool) -> Result<()> {
    let seeder = Seeder::new(&config.seed)?;
    let report = seeder
        .seed_directory(&config.seed.data_dir, clear_first)
        .await?;

    if !args.json_logs {
        report.print_summary();
    }

    Ok(())
}

fn setup_logging(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("clauson_sozluk={},sozluk={}", level, level))
    });

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact(),
            )
            .init();
    }
}
