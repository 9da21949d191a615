//! Persisted state snapshots
//!
//! A snapshot is a JSON document holding every [`StateStores`] value plus an
//! id, a timestamp and a SHA-256 checksum of the serialized stores. Loading
//! verifies the checksum and the schema version before handing the stores
//! back.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Result, SegueError};
use crate::state::stores::StateStores;

/// Current snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";

/// Saved controller state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    pub id: Uuid,

    pub saved_at: DateTime<Utc>,

    /// Hex SHA-256 of the serialized `stores`
    pub checksum: String,

    pub stores: StateStores,
}

fn default_schema_version() -> String {
    SNAPSHOT_SCHEMA_VERSION.to_string()
}

fn checksum_of(stores: &StateStores) -> Result<String> {
    let content = serde_json::to_vec(stores)?;
    Ok(format!("{:x}", Sha256::digest(&content)))
}

fn schema_major(version: &str) -> Option<&str> {
    version.split('.').next()
}

impl Snapshot {
    /// Capture `stores` now.
    pub fn capture(stores: &StateStores) -> Result<Self> {
        Ok(Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            id: Uuid::new_v4(),
            saved_at: Utc::now(),
            checksum: checksum_of(stores)?,
            stores: stores.clone(),
        })
    }

    /// Check the schema version and the checksum.
    pub fn verify(&self) -> Result<()> {
        if schema_major(&self.schema_version) != schema_major(SNAPSHOT_SCHEMA_VERSION) {
            return Err(SegueError::UnsupportedSchema {
                version: self.schema_version.clone(),
            });
        }
        let actual = checksum_of(&self.stores)?;
        if actual != self.checksum {
            return Err(SegueError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Write the snapshot to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SegueError::FileWriteError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| SegueError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!("Saved snapshot {} to {}", self.id, path.display());
        Ok(())
    }

    /// Read and verify a snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SegueError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let snapshot: Snapshot = serde_json::from_str(&content)?;
        snapshot.verify()?;

        debug!(
            "Loaded snapshot {} saved at {}",
            snapshot.id, snapshot.saved_at
        );
        Ok(snapshot)
    }
}

/// Capture `stores` and write them to `path`.
pub fn save_snapshot(path: &Path, stores: &StateStores) -> Result<Snapshot> {
    let snapshot = Snapshot::capture(stores)?;
    snapshot.save(path)?;
    Ok(snapshot)
}

/// Load the stores saved at `path`.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    Snapshot::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SlotIndex;
    use crate::player::PlayerImplType;
    use crate::state::stores::AuxEffectType;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn customized() -> StateStores {
        let mut stores = StateStores::default();
        stores.bass_boost.enabled = true;
        stores.bass_boost.set_normalized_strength(0.3).unwrap();
        stores.equalizer.set_normalized_band_level(1, 0.9).unwrap();
        stores.environmental_reverb.set_preset(4).unwrap();
        stores.pre_amp.set_ui_level(0.8).unwrap();
        stores.player.impl_type = PlayerImplType::Hybrid;
        stores.player.aux_effect = AuxEffectType::EnvironmentalReverb;
        stores.player.volume_left = 0.25;
        stores.player.set_media_uri(SlotIndex::Zero, "file:///music/a.wav");
        stores.hq_visualizer.capture_fft = true;
        stores
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("snapshot.json");
        let stores = customized();

        let saved = save_snapshot(&path, &stores).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(loaded, saved);
        assert_eq!(loaded.stores, stores);
        assert_eq!(loaded.schema_version, SNAPSHOT_SCHEMA_VERSION);
    }

    #[test]
    fn test_tampered_snapshot_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let mut snapshot = Snapshot::capture(&customized()).unwrap();
        snapshot.stores.player.looping = true;
        snapshot.save(&path).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert_eq!(err.error_code(), "CHECKSUM_MISMATCH");
    }

    #[test]
    fn test_unknown_schema_rejected() {
        let mut snapshot = Snapshot::capture(&StateStores::default()).unwrap();
        snapshot.schema_version = "2.0.0".to_string();
        let err = snapshot.verify().unwrap_err();
        assert!(matches!(err, SegueError::UnsupportedSchema { .. }));

        snapshot.schema_version = "1.4.0".to_string();
        assert!(snapshot.verify().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_snapshot(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SegueError::FileReadError { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_snapshot_ids_are_unique() {
        let stores = StateStores::default();
        let a = Snapshot::capture(&stores).unwrap();
        let b = Snapshot::capture(&stores).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.checksum, b.checksum);
    }
}
