//! Segue CLI - Gapless Playback Controller
//!
//! Command-line interface for the Segue playback controller.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use segue::cli::{commands, Cli, Commands, ConfigAction, StateAction};
use segue::config::SegueConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Segue v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => {
            let config = SegueConfig::load(&cli.config)
                .with_context(|| format!("loading config {}", cli.config.display()))?;
            handle_command(cmd, &config)
        }
        None => {
            println!("Segue v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &SegueConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Play {
            tracks,
            r#impl,
            step_ms,
        } => commands::play(config, &tracks, r#impl.map(Into::into), step_ms)
            .context("playback failed"),
        Commands::Scan { dir } => {
            commands::scan(&dir).with_context(|| format!("scanning {}", dir.display()))
        }
        Commands::Effects { r#impl } => Ok(commands::effects(r#impl.into())?),
        Commands::State { action } => match action {
            StateAction::Show { path } => commands::show_state(&path)
                .with_context(|| format!("reading snapshot {}", path.display())),
            StateAction::Reset { path } => commands::reset_state(&path)
                .with_context(|| format!("resetting snapshot {}", path.display())),
        },
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => commands::init_config(&path, force)
                .with_context(|| format!("writing config {}", path.display())),
        },
    }
}
