//! State Management Module
//!
//! Provides the controller's state stores, normalized UI parameters and
//! snapshot persistence.

pub mod normalize;
pub mod snapshot;
pub mod stores;

pub use normalize::{preamp_level_from_ui, preamp_level_to_ui, LinearNormalizer};
pub use snapshot::{load_snapshot, save_snapshot, Snapshot, SNAPSHOT_SCHEMA_VERSION};
pub use stores::{
    AuxEffectType, BassBoostStore, EffectStore, EnvReverbStore, EqualizerStore,
    HQEqualizerStore, HQVisualizerStore, LoudnessEnhancerStore, PlayerStore, PreAmpStore,
    PresetReverbStore, StateStores, VirtualizerStore, VisualizerStore,
    ENV_REVERB_PRESET_CUSTOM,
};
