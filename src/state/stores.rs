//! State stores
//!
//! The controller's authoritative copy of every user-facing setting. Effect
//! handles come and go; the stores survive them and are re-applied whenever a
//! handle is (re)created.

use serde::{Deserialize, Serialize};

use crate::audiofx::presets::{self, EQUALIZER_PRESET_NORMAL};
use crate::audiofx::settings::{
    BassBoostSettings, EnvReverbParam, EnvironmentalReverbSettings, EqualizerSettings,
    HQEqualizerSettings, LoudnessEnhancerSettings, PreAmpSettings, PresetReverbSettings,
    ScalingMode, VirtualizerSettings, WindowType, BAND_LEVEL_RANGE, PRESET_UNDEFINED,
    STRENGTH_RANGE, TARGET_GAIN_RANGE,
};
use crate::engine::SlotIndex;
use crate::error::{Result, SegueError};
use crate::player::PlayerImplType;
use crate::state::normalize::{preamp_level_from_ui, preamp_level_to_ui, LinearNormalizer};

/// Enabled flag plus the settings to apply to the effect handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectStore<S> {
    pub enabled: bool,
    pub settings: S,
}

impl<S> EffectStore<S> {
    pub fn new(settings: S) -> Self {
        Self {
            enabled: false,
            settings,
        }
    }
}

pub type BassBoostStore = EffectStore<BassBoostSettings>;
pub type VirtualizerStore = EffectStore<VirtualizerSettings>;
pub type EqualizerStore = EffectStore<EqualizerSettings>;
pub type HQEqualizerStore = EffectStore<HQEqualizerSettings>;
pub type LoudnessEnhancerStore = EffectStore<LoudnessEnhancerSettings>;
pub type PresetReverbStore = EffectStore<PresetReverbSettings>;
pub type PreAmpStore = EffectStore<PreAmpSettings>;

// ============================================================================
// Strength effects
// ============================================================================

macro_rules! strength_store {
    ($settings:ty) => {
        impl EffectStore<$settings> {
            pub fn normalized_strength(&self) -> f32 {
                LinearNormalizer::from_range(&STRENGTH_RANGE).normalize(self.settings.strength)
            }

            pub fn set_normalized_strength(&mut self, value: f32) -> Result<()> {
                self.settings.strength =
                    LinearNormalizer::from_range(&STRENGTH_RANGE).denormalize("strength", value)?;
                Ok(())
            }
        }
    };
}

strength_store!(BassBoostSettings);
strength_store!(VirtualizerSettings);

// ============================================================================
// Equalizers
// ============================================================================

macro_rules! equalizer_store {
    ($settings:ty) => {
        impl EffectStore<$settings> {
            fn band_index(&self, band: i32) -> Result<usize> {
                usize::try_from(band)
                    .ok()
                    .filter(|b| *b < self.settings.band_levels.len())
                    .ok_or_else(|| {
                        SegueError::invalid_argument(
                            "band",
                            format!("{} is not a band of this equalizer", band),
                        )
                    })
            }

            pub fn normalized_band_level(&self, band: i32) -> Result<f32> {
                let level = self.settings.band_levels[self.band_index(band)?];
                Ok(LinearNormalizer::from_range(&BAND_LEVEL_RANGE).normalize(level))
            }

            /// Set one band; the store no longer reflects a named preset.
            pub fn set_normalized_band_level(&mut self, band: i32, value: f32) -> Result<()> {
                let index = self.band_index(band)?;
                let level = LinearNormalizer::from_range(&BAND_LEVEL_RANGE)
                    .denormalize("band_level", value)?;
                self.settings.band_levels[index] = level;
                self.settings.cur_preset = PRESET_UNDEFINED;
                Ok(())
            }

            /// Replace every band with the levels of `preset`.
            pub fn use_preset(&mut self, preset: i32) -> Result<()> {
                let settings = u16::try_from(preset)
                    .ok()
                    .and_then(<$settings>::from_preset)
                    .ok_or_else(|| {
                        SegueError::invalid_argument(
                            "preset",
                            format!("unknown equalizer preset {}", preset),
                        )
                    })?;
                self.settings = settings;
                Ok(())
            }
        }
    };
}

equalizer_store!(EqualizerSettings);
equalizer_store!(HQEqualizerSettings);

// ============================================================================
// Loudness, pre-amp
// ============================================================================

impl LoudnessEnhancerStore {
    pub fn normalized_target_gain(&self) -> f32 {
        LinearNormalizer::from_range(&TARGET_GAIN_RANGE).normalize(self.settings.target_gain_mb)
    }

    pub fn set_normalized_target_gain(&mut self, value: f32) -> Result<()> {
        self.settings.target_gain_mb = LinearNormalizer::from_range(&TARGET_GAIN_RANGE)
            .denormalize("target_gain_mb", value)?;
        Ok(())
    }
}

impl PreAmpStore {
    /// Level on the logarithmic UI scale.
    pub fn ui_level(&self) -> f32 {
        preamp_level_to_ui(self.settings.level)
    }

    pub fn set_ui_level(&mut self, value: f32) -> Result<()> {
        let settings = PreAmpSettings {
            level: preamp_level_from_ui(value),
        };
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }
}

// ============================================================================
// Environmental reverb
// ============================================================================

/// Sentinel preset meaning "custom parameters".
pub const ENV_REVERB_PRESET_CUSTOM: i32 = -1;

/// Environmental reverb store; tracks the room preset the parameters came
/// from, or [`ENV_REVERB_PRESET_CUSTOM`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvReverbStore {
    pub enabled: bool,
    pub preset: i32,
    pub settings: EnvironmentalReverbSettings,
}

impl Default for EnvReverbStore {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: 0,
            settings: EnvironmentalReverbSettings::default(),
        }
    }
}

impl EnvReverbStore {
    /// Select a room preset. A non-negative index loads that preset's
    /// parameters; [`ENV_REVERB_PRESET_CUSTOM`] keeps the current ones.
    pub fn set_preset(&mut self, preset: i32) -> Result<()> {
        if preset >= 0 {
            let room = presets::env_reverb_preset(preset).ok_or_else(|| {
                SegueError::invalid_argument(
                    "preset",
                    format!("unknown environmental reverb preset {}", preset),
                )
            })?;
            self.settings = room.settings;
        } else if preset != ENV_REVERB_PRESET_CUSTOM {
            return Err(SegueError::invalid_argument(
                "preset",
                format!("unknown environmental reverb preset {}", preset),
            ));
        }
        self.preset = preset;
        Ok(())
    }

    pub fn normalized_parameter(&self, param: EnvReverbParam) -> f32 {
        let (min, max) = param.range();
        LinearNormalizer::new(min, max).normalize(self.settings.get(param))
    }

    /// Set one parameter; the store becomes a custom room.
    pub fn set_normalized_parameter(&mut self, param: EnvReverbParam, value: f32) -> Result<()> {
        let (min, max) = param.range();
        let raw = LinearNormalizer::new(min, max).denormalize(param.name(), value)?;
        self.settings.set(param, raw)?;
        self.preset = ENV_REVERB_PRESET_CUSTOM;
        Ok(())
    }
}

// ============================================================================
// Visualizers
// ============================================================================

/// Visualizer preferences. Stored and notified only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisualizerStore {
    pub capture_waveform: bool,
    pub capture_fft: bool,
    pub scaling_mode: ScalingMode,
    pub measure_peak: bool,
    pub measure_rms: bool,
}

/// High-quality visualizer preferences. Stored and notified only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HQVisualizerStore {
    pub capture_waveform: bool,
    pub capture_fft: bool,
    pub window_type: WindowType,
}

impl Default for HQVisualizerStore {
    fn default() -> Self {
        Self {
            capture_waveform: false,
            capture_fft: false,
            window_type: WindowType::Rectangular,
        }
    }
}

// ============================================================================
// Player
// ============================================================================

/// Which reverb feeds the players' auxiliary send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxEffectType {
    #[default]
    None,
    EnvironmentalReverb,
    PresetReverb,
}

impl AuxEffectType {
    pub fn code(self) -> i32 {
        match self {
            AuxEffectType::None => 0,
            AuxEffectType::EnvironmentalReverb => 1,
            AuxEffectType::PresetReverb => 2,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(AuxEffectType::None),
            1 => Ok(AuxEffectType::EnvironmentalReverb),
            2 => Ok(AuxEffectType::PresetReverb),
            other => Err(SegueError::invalid_argument(
                "aux_effect_type",
                format!("unknown aux effect type {}", other),
            )),
        }
    }
}

/// Player-wide preferences plus the media picked for each slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStore {
    pub aux_send_level: f32,
    pub volume_left: f32,
    pub volume_right: f32,
    pub looping: bool,
    pub impl_type: PlayerImplType,
    pub aux_effect: AuxEffectType,
    pub media_uris: [Option<String>; 2],
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self {
            aux_send_level: 1.0,
            volume_left: 1.0,
            volume_right: 1.0,
            looping: false,
            impl_type: PlayerImplType::Standard,
            aux_effect: AuxEffectType::None,
            media_uris: [None, None],
        }
    }
}

impl PlayerStore {
    pub fn media_uri(&self, slot: SlotIndex) -> Option<&str> {
        self.media_uris[slot.index()].as_deref()
    }

    pub fn set_media_uri(&mut self, slot: SlotIndex, uri: impl Into<String>) {
        self.media_uris[slot.index()] = Some(uri.into());
    }
}

// ============================================================================
// Aggregate
// ============================================================================

/// Every store the controller owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateStores {
    pub player: PlayerStore,
    pub bass_boost: BassBoostStore,
    pub virtualizer: VirtualizerStore,
    pub equalizer: EqualizerStore,
    pub loudness_enhancer: LoudnessEnhancerStore,
    pub environmental_reverb: EnvReverbStore,
    pub preset_reverb: PresetReverbStore,
    pub visualizer: VisualizerStore,
    pub hq_equalizer: HQEqualizerStore,
    pub pre_amp: PreAmpStore,
    pub hq_visualizer: HQVisualizerStore,
}

impl Default for StateStores {
    fn default() -> Self {
        Self {
            player: PlayerStore::default(),
            bass_boost: BassBoostStore::default(),
            virtualizer: VirtualizerStore::default(),
            equalizer: EqualizerSettings::from_preset(EQUALIZER_PRESET_NORMAL)
                .map(EffectStore::new)
                .unwrap_or_default(),
            loudness_enhancer: LoudnessEnhancerStore::default(),
            environmental_reverb: EnvReverbStore::default(),
            preset_reverb: PresetReverbStore::default(),
            visualizer: VisualizerStore::default(),
            hq_equalizer: HQEqualizerSettings::from_preset(EQUALIZER_PRESET_NORMAL)
                .map(EffectStore::new)
                .unwrap_or_default(),
            pre_amp: PreAmpStore::default(),
            hq_visualizer: HQVisualizerStore::default(),
        }
    }
}
