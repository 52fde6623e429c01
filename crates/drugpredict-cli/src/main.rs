//! DrugPredict command-line entry point.
//!
//! `drugpredict run` analyses one target in the foreground;
//! `drugpredict serve` starts the HTTP API.

mod summary;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use drugpredict_analysis::{AnalysisPipeline, AnalysisRequest, LoggingObserver};
use drugpredict_common::Config;
use drugpredict_ingestion::RecordLimit;

#[derive(Parser, Debug)]
#[command(name = "drugpredict")]
#[command(about = "Bioactivity analysis and potency prediction for ChEMBL targets", long_about = None)]
struct Cli {
    /// Config TOML file (defaults to DRUGPREDICT_CONFIG or drugpredict.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full analysis for one target and print a summary
    Run {
        /// Target name or ChEMBL target ID
        #[arg(short, long)]
        target: String,

        /// Maximum records to fetch, or "all"
        #[arg(short, long)]
        limit: Option<RecordLimit>,

        /// Data directory for the CSV artifacts and charts
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Print the full result payload as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Start the HTTP API
    Serve {
        /// Listen address, e.g. 0.0.0.0:5001
        #[arg(short, long)]
        bind: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("Could not load config {}", path.display()))?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config.validate()?;
            Ok(config)
        }
        None => Ok(Config::load()?),
    }
}

async fn run(
    mut config: Config,
    target: String,
    limit: Option<RecordLimit>,
    output_dir: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(dir) = output_dir {
        config.output.data_dir = dir;
    }
    let limit = match limit {
        Some(limit) => limit,
        None => config
            .pipeline
            .default_limit
            .parse()
            .context("Invalid pipeline.default_limit")?,
    };

    let config = Arc::new(config);
    let pipeline = AnalysisPipeline::from_config(config.clone())?;
    let request = AnalysisRequest { target, limit };

    let results = match pipeline.run(&request, &LoggingObserver).await {
        Ok(results) => results,
        Err(e) => {
            let stage = e.stage;
            error!(stage = %stage, "Analysis pipeline failed: {}", e);
            return Err(anyhow::Error::new(e).context(format!("Analysis failed at stage {}", stage)));
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", summary::render_summary(&results));
        println!(
            "\nArtifacts written under {}",
            config.output.data_dir.display()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("drugpredict=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    info!("DrugPredict {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run { target, limit, output_dir, json } => {
            run(config, target, limit, output_dir, json).await
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            drugpredict_web::serve(Arc::new(config)).await
        }
    }
}
