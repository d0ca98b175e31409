use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};

use crm_pipeline::app::PipelineUseCase;
use crm_pipeline::config::Config;
use crm_pipeline::infra::FilePipelineOutputAdapter;
use crm_pipeline::observability::init_metrics;
use crm_pipeline::pipeline::processing::entity_resolution::MissingEmailPolicy;
use crm_pipeline::{logging, server};

#[derive(Parser)]
#[command(name = "crm_pipeline")]
#[command(about = "Batch ETL pipeline for CRM exports with company entity resolution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over one input file and export the results
    Run {
        /// Input CSV or JSON file (defaults to the configured path)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Path to the TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for crm_analytics_ready.csv
        #[arg(long)]
        processed_dir: Option<PathBuf>,
        /// Directory for the KPI summary and pipeline metrics
        #[arg(long)]
        reports_dir: Option<PathBuf>,
        /// Minimum similarity for two company names to merge
        #[arg(long)]
        threshold: Option<f64>,
        /// Never consolidate records that lack an email
        #[arg(long)]
        keep_missing_emails_separate: bool,
    },
    /// Start the HTTP upload server
    Serve {
        /// Path to the TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    Config::load(path.map(PathBuf::as_path)).context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            config,
            processed_dir,
            reports_dir,
            threshold,
            keep_missing_emails_separate,
        } => {
            let mut config = load_config(config.as_ref())?;
            let _guard = logging::init_logging(&config.logging);

            if let Some(dir) = processed_dir {
                config.paths.processed_dir = dir;
            }
            if let Some(dir) = reports_dir {
                config.paths.reports_dir = dir;
            }
            if let Some(threshold) = threshold {
                config.entity_resolution.similarity_threshold = threshold;
            }
            if keep_missing_emails_separate {
                config.entity_resolution.missing_email_policy = MissingEmailPolicy::KeepSeparate;
            }
            config.validate()?;

            let input = input.unwrap_or_else(|| config.paths.input.clone());
            let output = Arc::new(FilePipelineOutputAdapter::new(
                config.paths.processed_dir.clone(),
                config.paths.reports_dir.clone(),
            ));

            println!("🔄 Running CRM pipeline on {}...", input.display());
            let run = tokio::task::spawn_blocking(move || {
                PipelineUseCase::from_config(&config.entity_resolution)
                    .with_output(output)
                    .run(&input)
            })
            .await
            .context("Pipeline task panicked")?;

            match run {
                Ok(run) => {
                    println!("\n📊 Pipeline Results (run {}):", run.metrics.run_id);
                    for stage in &run.metrics.stages {
                        println!(
                            "   {:<18} {:>6} rows, {:>3} columns, {:>5} missing",
                            stage.stage, stage.row_count, stage.column_count, stage.missing_values_total
                        );
                    }
                    println!("   KPI groups: {}", run.kpi_summary.len());
                    if let Some(files) = &run.exported {
                        println!("   Processed data: {}", files.processed.display());
                        println!("   KPI summary:    {}", files.kpi_summary.display());
                        println!("   Metrics:        {}", files.metrics.display());
                    }
                    println!("✅ Pipeline execution completed successfully");
                }
                Err(e) => {
                    error!("Pipeline run failed: {:#}", e);
                    println!("❌ {:#}", e);
                    return Err(e);
                }
            }
        }
        Commands::Serve { config, port } => {
            let mut config = load_config(config.as_ref())?;
            let _guard = logging::init_logging(&config.logging);

            if let Some(port) = port {
                config.server.port = port;
            }
            if let Err(e) = init_metrics() {
                warn!("Metrics disabled: {}", e);
            }

            server::start_server(Arc::new(config))
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
        }
    }

    Ok(())
}
