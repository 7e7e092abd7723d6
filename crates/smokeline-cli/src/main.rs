//! Smokeline command-line interface
//!
//! One binary for both sides of the pipeline: `sensor` runs next to the probe
//! board, `bridge` runs next to the display, and the remaining commands talk
//! to the durable API directly.

use anyhow::Result;
use clap::{Parser, Subcommand};
use smokeline_core::{SensorMode, SmokelineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{bridge, sensor, state};

#[derive(Parser)]
#[command(name = "smokeline")]
#[command(about = "Smoker telemetry: sensor host, display bridge and cooking flag")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "smokeline.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sensor source and local relay
    Sensor {
        /// Reading source: `emulator` or `hardware`
        #[arg(short, long)]
        mode: Option<SensorMode>,

        /// Local relay listen address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run the display bridge and state sync
    Bridge {
        /// Local relay URL to read from
        #[arg(short, long)]
        relay_url: Option<String>,
    },

    /// Toggle the cooking flag and broadcast it
    Toggle,

    /// Show the current cooking session
    State,

    /// Print stored readings
    History {
        /// Session id; defaults to the current session
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = SmokelineConfig::load(&cli.config)?;

    match cli.command {
        Commands::Sensor { mode, bind } => {
            if let Some(mode) = mode {
                config.sensor.mode = mode;
            }
            if let Some(bind) = bind {
                config.relay.bind = bind;
            }
            sensor::run(&config).await?;
        }

        Commands::Bridge { relay_url } => {
            if let Some(relay_url) = relay_url {
                config.bridge.relay_url = relay_url;
            }
            bridge::run(&config).await?;
        }

        Commands::Toggle => state::toggle(&config).await?,

        Commands::State => state::show(&config).await?,

        Commands::History { id } => state::history(&config, id.as_deref()).await?,
    }

    Ok(())
}
