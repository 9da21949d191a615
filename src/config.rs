//! Configuration
//!
//! Startup settings for the `segue` binary, stored as JSON. A missing file
//! yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegueError};
use crate::player::sim::DEFAULT_TRACK_DURATION_MS;
use crate::player::PlayerImplType;
use crate::state::stores::StateStores;

/// Where track metadata comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSourceKind {
    /// WAV headers read from disk; other locators fall back to the
    /// simulated track length
    #[default]
    Wav,
    /// Every track gets the simulated track length
    Catalog,
}

/// Segue startup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegueConfig {
    pub player_impl: PlayerImplType,
    pub looping: bool,
    pub volume: f32,
    pub aux_send_level: f32,
    /// Snapshot restored at startup and written on exit
    pub snapshot_path: Option<PathBuf>,
    /// Length of simulated tracks in milliseconds
    pub simulated_track_ms: i32,
    pub metadata_source: MetadataSourceKind,
}

impl Default for SegueConfig {
    fn default() -> Self {
        Self {
            player_impl: PlayerImplType::Standard,
            looping: false,
            volume: 1.0,
            aux_send_level: 1.0,
            snapshot_path: None,
            simulated_track_ms: DEFAULT_TRACK_DURATION_MS,
            metadata_source: MetadataSourceKind::Wav,
        }
    }
}

impl SegueConfig {
    /// Load from `path`, or the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SegueError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: SegueConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| SegueError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(SegueError::invalid_argument(
                "volume",
                format!("{} is outside 0..=1", self.volume),
            ));
        }
        if !(0.0..=1.0).contains(&self.aux_send_level) {
            return Err(SegueError::invalid_argument(
                "aux_send_level",
                format!("{} is outside 0..=1", self.aux_send_level),
            ));
        }
        if self.simulated_track_ms <= 0 {
            return Err(SegueError::invalid_argument(
                "simulated_track_ms",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Fresh stores carrying the configured player preferences.
    pub fn initial_stores(&self) -> StateStores {
        let mut stores = StateStores::default();
        stores.player.impl_type = self.player_impl;
        stores.player.looping = self.looping;
        stores.player.volume_left = self.volume;
        stores.player.volume_right = self.volume;
        stores.player.aux_send_level = self.aux_send_level;
        stores
    }
}
