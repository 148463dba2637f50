use anyhow::{Context, Result};
use authburst::analysis::{report, runner};
use authburst::config::{AppConfig, LoggingConfig};
use authburst::detect::DetectionEngine;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "authburst",
    about = "Detect brute-force login bursts in SSH authentication logs",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (default: $AUTHBURST_CONFIG, then /etc/authburst/authburst.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an auth log and report brute-force incidents
    Analyze {
        /// Log file to read, or `-` for stdin
        log: PathBuf,

        /// Year assumed for syslog timestamps
        #[arg(long)]
        year: Option<i32>,

        /// Cluster window in minutes
        #[arg(long, allow_negative_numbers = true)]
        window_minutes: Option<i64>,

        /// Minimum attempts per incident
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<i64>,

        /// Run per-origin detection on a worker pool
        #[arg(long)]
        parallel: bool,

        /// Worker pool size for --parallel
        #[arg(long)]
        workers: Option<usize>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,

        /// Incident file path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also write the ranked summary as JSON to this path
        #[arg(long)]
        summary_output: Option<PathBuf>,

        /// Skip writing the incident file
        #[arg(long)]
        no_export: bool,

        /// Also store the run in this SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List incidents stored by previous runs
    Incidents {
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Maximum number of incidents to list
        #[arg(long, default_value = "20")]
        limit: usize,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Serve stored results over HTTP
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,

        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_tracing(logging: &LoggingConfig, force_json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if force_json || logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(),
    };
    init_tracing(&config.logging, cli.log_json);

    match cli.command {
        Commands::Analyze {
            log,
            year,
            window_minutes,
            threshold,
            parallel,
            workers,
            json,
            output,
            summary_output,
            no_export,
            db,
        } => {
            let mut detector = config.detector.clone();
            if let Some(year) = year {
                detector.assumed_year = year;
            }
            if let Some(window) = window_minutes {
                detector.window_minutes = window;
            }
            if let Some(threshold) = threshold {
                detector.threshold = threshold;
            }
            if let Some(workers) = workers {
                detector.max_workers = workers;
            }

            let params = detector.params().context("invalid detector configuration")?;
            let engine = DetectionEngine::new(params).with_max_workers(detector.max_workers);
            tracing::info!(
                log = %log.display(),
                year = detector.assumed_year,
                window_minutes = detector.window_minutes,
                threshold = detector.threshold,
                parallel,
                "Analyzing auth log"
            );

            let reader = runner::open_source(&log)?;
            let outcome = if parallel {
                runner::analyze_reader_parallel(reader, detector.assumed_year, &engine).await?
            } else {
                runner::analyze_reader(reader, detector.assumed_year, &engine)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", report::format_attempt_counts(&outcome.timeline));
                println!(
                    "{}",
                    report::format_incident_preview(&outcome.incidents, config.output.preview)
                );
                println!(
                    "{}",
                    report::format_top_attackers(&outcome.summary, config.output.top_n)
                );
                let chart = report::render_bar_chart(&outcome.summary, config.output.top_n);
                if !chart.is_empty() {
                    println!("{}", chart);
                }
                if outcome.stats.rejected() > 0 {
                    println!("Skipped {} unparseable lines.", outcome.stats.rejected());
                }
            }

            if !no_export {
                let path = output.unwrap_or(config.output.incidents_path);
                authburst::export::write_incidents(&path, &outcome.incidents)?;
                if !json {
                    println!("Saved detailed incidents to {}", path.display());
                }
            }

            if let Some(path) = summary_output {
                authburst::export::write_summary(&path, &outcome.summary)?;
                if !json {
                    println!("Saved ranked summary to {}", path.display());
                }
            }

            if let Some(db) = db {
                let pool = authburst::storage::open_pool(&db)?;
                let store = authburst::storage::IncidentStore::new(pool);
                let source = if log.as_os_str() == "-" {
                    "stdin".to_string()
                } else {
                    log.display().to_string()
                };
                let run_id = store.save_run(&outcome, &source, &params, detector.assumed_year)?;
                if !json {
                    println!("Stored run {} in {}", run_id, db.display());
                }
            }
        }
        Commands::Incidents { db, limit, json } => {
            let db = db.unwrap_or(config.storage.db_path);
            let pool = authburst::storage::open_pool(&db)?;
            let store = authburst::storage::IncidentStore::new(pool);
            let incidents = store.list_recent(limit)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&incidents)?);
            } else if incidents.is_empty() {
                println!("No incidents stored.");
            } else {
                println!(
                    "{:<18} | {:>5} | {:<19} | {:<19} | Run",
                    "IP", "Count", "First", "Last"
                );
                println!("{:-<18}-|-{:-<5}-|-{:-<19}-|-{:-<19}-|-{:-<36}", "", "", "", "", "");
                for stored in incidents {
                    let i = &stored.incident;
                    println!(
                        "{:<18} | {:>5} | {:<19} | {:<19} | {}",
                        i.origin,
                        i.count,
                        i.first.format("%Y-%m-%d %H:%M:%S"),
                        i.last.format("%Y-%m-%d %H:%M:%S"),
                        stored.run_id
                    );
                }
            }
        }
        Commands::Serve { bind, db } => {
            let db = db.unwrap_or(config.storage.db_path);
            tracing::info!(%bind, "Starting authburst API");
            authburst::serve(&bind, &db).await?;
        }
    }

    Ok(())
}
