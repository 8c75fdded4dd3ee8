//! # Paddock CLI (`paddock`)
//!
//! Formula 1 dashboard in the terminal: live standings and schedule from the
//! Ergast-compatible results API, imagery from Wikipedia, and AI commentary
//! from a generative model.
//!
//! ## Usage
//!
//! ```bash
//! paddock --config ./config/paddock.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `paddock dashboard` | Next race, championship leaders, race analysis |
//! | `paddock standings` | Driver and constructor standings |
//! | `paddock circuits` | List circuits |
//! | `paddock circuit <id>` | Last race, records, and image for a circuit |
//! | `paddock driver <id>` | Season results and analysis for a driver |
//! | `paddock track <id>` | Grounded intelligence report for a circuit |
//! | `paddock browse` | Interactive browser |
//! | `paddock serve` | Start the JSON API |
//!
//! Add `--json` to any one-shot command for machine-readable output.
//! Set `GEMINI_API_KEY` to enable AI commentary; without it every AI field
//! shows its fallback text.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paddock::aggregate::Aggregator;
use paddock::config::{self, Config};
use paddock::genai::{self, DisabledModel, GenerativeModel};
use paddock::{browse, report, server};

/// Paddock: a Formula 1 dashboard with AI race insights.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "paddock",
    about = "Paddock: Formula 1 standings, schedule, and AI race insights",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used if it does not exist.
    #[arg(long, global = true, default_value = "./config/paddock.toml")]
    config: PathBuf,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Next race, top drivers, and an AI preview of the race.
    Dashboard,

    /// Current driver and constructor standings.
    Standings,

    /// List circuits.
    Circuits,

    /// Gallery entry for one circuit: last race, AI records, image.
    Circuit {
        /// Circuit ID (e.g. `monza`).
        id: String,
    },

    /// Season results and AI analysis for one driver.
    ///
    /// The driver must appear in the current standings.
    Driver {
        /// Driver ID (e.g. `max_verstappen`).
        id: String,
    },

    /// Grounded intelligence report with sources for one circuit.
    Track {
        /// Circuit ID (e.g. `monza`).
        id: String,
    },

    /// Interactive browser reading commands from stdin.
    Browse,

    /// Start the JSON API server.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "paddock=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        Config::minimal()
    };

    let model: Arc<dyn GenerativeModel> = match genai::create_model(&cfg.insight) {
        Ok(model) => model,
        Err(e) => {
            warn!(error = %e, "insight provider unavailable, AI fields will use fallbacks");
            Arc::new(DisabledModel)
        }
    };
    let aggregator = Aggregator::from_config(&cfg, model)?;

    match cli.command {
        Commands::Dashboard => report::run_dashboard(&aggregator, cli.json).await?,
        Commands::Standings => report::run_standings(&aggregator, cli.json).await?,
        Commands::Circuits => report::run_circuits(&aggregator, cli.json).await?,
        Commands::Circuit { id } => report::run_circuit(&aggregator, &id, cli.json).await?,
        Commands::Driver { id } => report::run_driver(&aggregator, &id, cli.json).await?,
        Commands::Track { id } => report::run_track(&aggregator, &id, cli.json).await?,
        Commands::Browse => browse::run_browse(aggregator).await?,
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            let model_name = aggregator.model_name().to_string();
            server::run_server(&cfg, aggregator, &model_name).await?;
        }
    }

    Ok(())
}
