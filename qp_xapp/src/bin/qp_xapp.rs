use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;

use qp_xapp::handler::{InboundMessage, PREDICTION_REQUEST};
use qp_xapp::logging::init_tracing;
use qp_xapp::{LineSink, QpConfig, QpContext};
use tracing::warn;

#[derive(Parser)]
#[command(name = "qp-xapp")]
#[command(about = "QoE predictor - per-cell throughput forecasts for prediction requests", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// CSV file of telemetry rows to seed the store with
    #[arg(long)]
    seed: Option<PathBuf>,
    /// Directory holding per-cell model artifacts
    #[arg(long)]
    models: Option<PathBuf>,
}

fn main() -> qp_xapp::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = QpConfig::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.store.seed_csv = Some(seed);
    }
    if let Some(models) = cli.models {
        config.model.dir = models;
    }

    let context = QpContext::from_config(config)?;
    context.connect()?;

    // One raw payload per line
    let requests = io::stdin().lock().lines().map_while(|line| match line {
        Ok(line) => Some(InboundMessage::new(PREDICTION_REQUEST, line)),
        Err(e) => {
            warn!(error = %e, "failed to read stdin");
            None
        }
    });
    let sink = LineSink::new(io::stdout());
    context.run(requests, &sink);

    eprintln!("{}", qp_xapp::json::to_string(&context.stats())?);
    Ok(())
}
