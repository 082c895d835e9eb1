//! CLI commands

mod serve;
mod show;

pub use serve::serve;
pub use show::show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Rotor - run registry model versions locally behind a predictions API
#[derive(Parser)]
#[command(name = "rotor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the predictions API server
    Serve {
        /// Port to serve the API on
        #[arg(long, short)]
        port: Option<u16>,

        /// Address to listen on
        #[arg(long, short = 'l', alias = "listen")]
        host: Option<String>,

        /// Configuration file (YAML or JSON)
        #[arg(long, short, env = "ROTOR_CONFIG")]
        config: Option<PathBuf>,

        /// Directory for prediction records
        #[arg(long, env = "ROTOR_PREDICTIONS_DIR")]
        predictions_dir: Option<PathBuf>,
    },

    /// Print a stored prediction record
    Show {
        /// Prediction id
        id: String,

        /// Configuration file (YAML or JSON)
        #[arg(long, short, env = "ROTOR_CONFIG")]
        config: Option<PathBuf>,

        /// Directory for prediction records
        #[arg(long, env = "ROTOR_PREDICTIONS_DIR")]
        predictions_dir: Option<PathBuf>,
    },
}
