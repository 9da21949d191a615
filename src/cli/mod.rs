//! CLI Module
//!
//! Command-line interface for the Segue playback controller.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::player::PlayerImplType;

/// Segue - gapless dual-player playback with arbitrated audio effects
#[derive(Parser, Debug)]
#[command(name = "segue")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "segue.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Player implementation selectable on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplArg {
    Standard,
    Opensl,
    Hybrid,
}

impl From<ImplArg> for PlayerImplType {
    fn from(arg: ImplArg) -> Self {
        match arg {
            ImplArg::Standard => PlayerImplType::Standard,
            ImplArg::Opensl => PlayerImplType::OpenSl,
            ImplArg::Hybrid => PlayerImplType::Hybrid,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play one or two tracks back to back on the simulated platform
    #[command(name = "play")]
    Play {
        /// Tracks for slot 0 and slot 1 (WAV files are measured, others simulated)
        #[arg(required = true, num_args = 1..=2)]
        tracks: Vec<String>,

        /// Player implementation (defaults to the configured one)
        #[arg(short, long, value_enum)]
        r#impl: Option<ImplArg>,

        /// Simulated clock step in milliseconds
        #[arg(long, default_value_t = 1000)]
        step_ms: i32,
    },

    /// List playable WAV tracks under a directory
    #[command(name = "scan")]
    Scan {
        /// Directory to scan
        dir: PathBuf,
    },

    /// Show which effects a player implementation provides
    #[command(name = "effects")]
    Effects {
        #[arg(short, long, value_enum, default_value = "standard")]
        r#impl: ImplArg,
    },

    /// Inspect or reset a state snapshot
    #[command(name = "state")]
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Manage the configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum StateAction {
    /// Print a snapshot
    Show {
        /// Snapshot file
        path: PathBuf,
    },
    /// Overwrite a snapshot with default state
    Reset {
        /// Snapshot file
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Destination
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
