//! Audio effects
//!
//! Effect handles and the control-arbitration protocol:
//! - [`EffectRegistry`]: shared bindings per (session, effect type)
//! - [`EffectHandle`]: one user's handle, arbitrated by creation order
//! - [`EffectFactory`]: per-implementation capabilities
//! - settings value bags and preset tables

pub mod binding;
pub mod factory;
pub mod handle;
pub mod presets;
pub mod settings;
pub mod status;

pub use binding::{BindingKey, EffectRegistry, HandleId, SessionId, GLOBAL_SESSION};
pub use factory::EffectFactory;
pub use handle::{
    BassBoost, EffectHandle, EnvironmentalReverb, Equalizer, HQEqualizer, HQVisualizer,
    LoudnessEnhancer, PreAmp, PresetReverb, Virtualizer, Visualizer,
};
pub use settings::{
    BassBoostSettings, EffectParams, EffectSettings, EffectType, EnvReverbParam,
    EnvironmentalReverbSettings, EqualizerSettings, HQEqualizerSettings, HQVisualizerSettings,
    LoudnessEnhancerSettings, MeasurementMode, PreAmpSettings, PresetReverbSettings,
    ReverbPreset, ScalingMode, VirtualizerSettings, VisualizerSettings, WindowType,
    PRESET_UNDEFINED,
};
pub use status::EffectStatus;
