//! SafeWatch CLI - Command-line interface
//!
//! Exercises the SafeWatch location pipeline without a device: measure
//! distances, replay recorded tracks, and manage the config file.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use safewatch::geo::Coordinate;

use commands::config::ConfigCommands;
use commands::replay::ReplayArgs;

#[derive(Parser)]
#[command(name = "safewatch")]
#[command(version = safewatch::VERSION)]
#[command(about = "Background location monitoring and significant-change detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Great-circle distance between two points, in meters
    Distance {
        /// First point as "lat,lon"
        #[arg(allow_hyphen_values = true)]
        from: Coordinate,

        /// Second point as "lat,lon"
        #[arg(allow_hyphen_values = true)]
        to: Coordinate,
    },

    /// Replay a recorded track through a location monitor
    Replay(ReplayArgs),

    /// Manage ~/.safewatch/config.ini
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Distance { from, to } => commands::distance::run(from, to),
        Commands::Replay(args) => commands::replay::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
