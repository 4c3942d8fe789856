use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parley: voice channel session tooling.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter override (e.g. debug, parley_voice=trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Estimate call quality from network measurements.
    Mos {
        /// Round-trip time in milliseconds.
        #[arg(long)]
        rtt: f64,
        /// Packet loss in percent.
        #[arg(long, default_value_t = 0.0)]
        loss: f64,
        /// Jitter in milliseconds.
        #[arg(long, default_value_t = 0.0)]
        jitter: f64,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Print the config file location.
    Path,
    /// Write the commented default config.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config as TOML.
    Show,
    /// Check the config file for out-of-range values.
    Validate,
}

pub fn parse() -> Args {
    Args::parse()
}
