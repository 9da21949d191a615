//! Effect settings value bags
//!
//! One settings struct per effect type, each with a documented valid range
//! and a `validate()` that rejects out-of-range values with
//! [`SegueError::InvalidArgument`]. Settings are plain values: handles copy
//! them in and out of the shared binding.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::audiofx::presets;
use crate::error::{Result, SegueError};

// ============================================================================
// Ranges
// ============================================================================

/// Bass boost and virtualizer strength, per mille.
pub const STRENGTH_RANGE: RangeInclusive<i16> = 0..=1000;

/// Equalizer band level range in millibels.
pub const BAND_LEVEL_RANGE: RangeInclusive<i16> = -1500..=1500;

/// Marks an equalizer whose band levels do not match any preset.
pub const PRESET_UNDEFINED: u16 = 0xFFFF;

pub const EQUALIZER_NUM_BANDS: u16 = 5;
pub const HQ_EQUALIZER_NUM_BANDS: u16 = 10;

/// Loudness enhancer target gain range in millibels.
pub const TARGET_GAIN_RANGE: RangeInclusive<i32> = 0..=1000;

/// Pre-amp linear level range.
pub const PREAMP_LEVEL_RANGE: RangeInclusive<f32> = 0.0..=10.0;

pub const VISUALIZER_CAPTURE_SIZE_RANGE: RangeInclusive<u32> = 128..=1024;
pub const HQ_VISUALIZER_CAPTURE_SIZE_RANGE: RangeInclusive<u32> = 128..=4096;

pub const ROOM_LEVEL_RANGE: RangeInclusive<i16> = -9000..=0;
pub const ROOM_HF_LEVEL_RANGE: RangeInclusive<i16> = -9000..=0;
pub const DECAY_TIME_RANGE: RangeInclusive<i32> = 100..=7000;
pub const DECAY_HF_RATIO_RANGE: RangeInclusive<i16> = 100..=2000;
pub const REFLECTIONS_LEVEL_RANGE: RangeInclusive<i16> = 0..=0;
pub const REFLECTIONS_DELAY_RANGE: RangeInclusive<i32> = 0..=0;
pub const REVERB_LEVEL_RANGE: RangeInclusive<i16> = -9000..=2000;
pub const REVERB_DELAY_RANGE: RangeInclusive<i32> = 0..=0;
pub const DIFFUSION_RANGE: RangeInclusive<i16> = 0..=1000;
pub const DENSITY_RANGE: RangeInclusive<i16> = 0..=1000;

pub(crate) fn check_range<T>(name: &str, value: T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SegueError::invalid_argument(
            name,
            format!("{} is outside {}..={}", value, range.start(), range.end()),
        ))
    }
}

// ============================================================================
// Effect Types
// ============================================================================

/// Every effect kind the arbitration protocol knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    BassBoost,
    Virtualizer,
    Equalizer,
    LoudnessEnhancer,
    EnvironmentalReverb,
    PresetReverb,
    Visualizer,
    #[serde(rename = "hq_equalizer")]
    HQEqualizer,
    PreAmp,
    #[serde(rename = "hq_visualizer")]
    HQVisualizer,
}

impl EffectType {
    pub const ALL: [EffectType; 10] = [
        EffectType::BassBoost,
        EffectType::Virtualizer,
        EffectType::Equalizer,
        EffectType::LoudnessEnhancer,
        EffectType::EnvironmentalReverb,
        EffectType::PresetReverb,
        EffectType::Visualizer,
        EffectType::HQEqualizer,
        EffectType::PreAmp,
        EffectType::HQVisualizer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectType::BassBoost => "BassBoost",
            EffectType::Virtualizer => "Virtualizer",
            EffectType::Equalizer => "Equalizer",
            EffectType::LoudnessEnhancer => "LoudnessEnhancer",
            EffectType::EnvironmentalReverb => "EnvironmentalReverb",
            EffectType::PresetReverb => "PresetReverb",
            EffectType::Visualizer => "Visualizer",
            EffectType::HQEqualizer => "HQEqualizer",
            EffectType::PreAmp => "PreAmp",
            EffectType::HQVisualizer => "HQVisualizer",
        }
    }

    /// Effects created on a player's audio session rather than the global
    /// output mix.
    pub fn is_player_bound(self) -> bool {
        matches!(
            self,
            EffectType::BassBoost
                | EffectType::Virtualizer
                | EffectType::Equalizer
                | EffectType::LoudnessEnhancer
                | EffectType::Visualizer
        )
    }

    /// Effects players feed through an aux send.
    pub fn is_auxiliary(self) -> bool {
        matches!(
            self,
            EffectType::EnvironmentalReverb | EffectType::PresetReverb
        )
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Settings Trait
// ============================================================================

/// Settings of one effect type.
pub trait EffectParams: Clone + fmt::Debug + PartialEq + Default + 'static {
    const TYPE: EffectType;

    fn validate(&self) -> Result<()>;

    fn into_settings(self) -> EffectSettings;

    fn from_settings(settings: &EffectSettings) -> Option<&Self>;
}

macro_rules! effect_params {
    ($settings:ty, $variant:ident) => {
        impl EffectParams for $settings {
            const TYPE: EffectType = EffectType::$variant;

            fn validate(&self) -> Result<()> {
                <$settings>::validate(self)
            }

            fn into_settings(self) -> EffectSettings {
                EffectSettings::$variant(self)
            }

            fn from_settings(settings: &EffectSettings) -> Option<&Self> {
                match settings {
                    EffectSettings::$variant(s) => Some(s),
                    _ => None,
                }
            }
        }
    };
}

/// Settings of any effect type, as held by a binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectSettings {
    BassBoost(BassBoostSettings),
    Virtualizer(VirtualizerSettings),
    Equalizer(EqualizerSettings),
    LoudnessEnhancer(LoudnessEnhancerSettings),
    EnvironmentalReverb(EnvironmentalReverbSettings),
    PresetReverb(PresetReverbSettings),
    Visualizer(VisualizerSettings),
    #[serde(rename = "hq_equalizer")]
    HQEqualizer(HQEqualizerSettings),
    PreAmp(PreAmpSettings),
    #[serde(rename = "hq_visualizer")]
    HQVisualizer(HQVisualizerSettings),
}

impl EffectSettings {
    pub fn effect_type(&self) -> EffectType {
        match self {
            EffectSettings::BassBoost(_) => EffectType::BassBoost,
            EffectSettings::Virtualizer(_) => EffectType::Virtualizer,
            EffectSettings::Equalizer(_) => EffectType::Equalizer,
            EffectSettings::LoudnessEnhancer(_) => EffectType::LoudnessEnhancer,
            EffectSettings::EnvironmentalReverb(_) => EffectType::EnvironmentalReverb,
            EffectSettings::PresetReverb(_) => EffectType::PresetReverb,
            EffectSettings::Visualizer(_) => EffectType::Visualizer,
            EffectSettings::HQEqualizer(_) => EffectType::HQEqualizer,
            EffectSettings::PreAmp(_) => EffectType::PreAmp,
            EffectSettings::HQVisualizer(_) => EffectType::HQVisualizer,
        }
    }

    /// Default settings of `effect_type`.
    pub fn default_for(effect_type: EffectType) -> EffectSettings {
        match effect_type {
            EffectType::BassBoost => BassBoostSettings::default().into_settings(),
            EffectType::Virtualizer => VirtualizerSettings::default().into_settings(),
            EffectType::Equalizer => EqualizerSettings::default().into_settings(),
            EffectType::LoudnessEnhancer => LoudnessEnhancerSettings::default().into_settings(),
            EffectType::EnvironmentalReverb => {
                EnvironmentalReverbSettings::default().into_settings()
            }
            EffectType::PresetReverb => PresetReverbSettings::default().into_settings(),
            EffectType::Visualizer => VisualizerSettings::default().into_settings(),
            EffectType::HQEqualizer => HQEqualizerSettings::default().into_settings(),
            EffectType::PreAmp => PreAmpSettings::default().into_settings(),
            EffectType::HQVisualizer => HQVisualizerSettings::default().into_settings(),
        }
    }
}

// ============================================================================
// Strength Effects
// ============================================================================

/// Bass boost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BassBoostSettings {
    /// Strength: 0 to 1000
    pub strength: i16,
}

impl BassBoostSettings {
    pub fn validate(&self) -> Result<()> {
        check_range("strength", self.strength, &STRENGTH_RANGE)
    }
}

effect_params!(BassBoostSettings, BassBoost);

/// Virtualizer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VirtualizerSettings {
    /// Strength: 0 to 1000
    pub strength: i16,
}

impl VirtualizerSettings {
    pub fn validate(&self) -> Result<()> {
        check_range("strength", self.strength, &STRENGTH_RANGE)
    }
}

effect_params!(VirtualizerSettings, Virtualizer);

// ============================================================================
// Equalizers
// ============================================================================

fn validate_bands(
    cur_preset: u16,
    num_bands: u16,
    band_levels: &[i16],
    expected_bands: u16,
    num_presets: usize,
) -> Result<()> {
    if num_bands != expected_bands {
        return Err(SegueError::invalid_argument(
            "num_bands",
            format!("expected {} bands, got {}", expected_bands, num_bands),
        ));
    }
    if band_levels.len() != usize::from(num_bands) {
        return Err(SegueError::invalid_argument(
            "band_levels",
            format!("expected {} levels, got {}", num_bands, band_levels.len()),
        ));
    }
    for level in band_levels {
        check_range("band_level", *level, &BAND_LEVEL_RANGE)?;
    }
    if cur_preset != PRESET_UNDEFINED && usize::from(cur_preset) >= num_presets {
        return Err(SegueError::invalid_argument(
            "cur_preset",
            format!("preset {} does not exist", cur_preset),
        ));
    }
    Ok(())
}

/// 5-band equalizer parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualizerSettings {
    /// Current preset index, or [`PRESET_UNDEFINED`]
    pub cur_preset: u16,
    pub num_bands: u16,
    /// Band levels in millibels
    pub band_levels: Vec<i16>,
}

impl Default for EqualizerSettings {
    fn default() -> Self {
        Self::from_preset(presets::EQUALIZER_PRESET_FLAT)
            .unwrap_or_else(|| Self {
                cur_preset: PRESET_UNDEFINED,
                num_bands: EQUALIZER_NUM_BANDS,
                band_levels: vec![0; usize::from(EQUALIZER_NUM_BANDS)],
            })
    }
}

impl EqualizerSettings {
    /// Settings of a preset from the default table.
    pub fn from_preset(preset: u16) -> Option<Self> {
        presets::equalizer_preset(preset).map(|p| Self {
            cur_preset: preset,
            num_bands: EQUALIZER_NUM_BANDS,
            band_levels: p.band_levels.to_vec(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_bands(
            self.cur_preset,
            self.num_bands,
            &self.band_levels,
            EQUALIZER_NUM_BANDS,
            presets::EQUALIZER_PRESETS.len(),
        )
    }
}

effect_params!(EqualizerSettings, Equalizer);

/// 10-band high-quality equalizer parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HQEqualizerSettings {
    /// Current preset index, or [`PRESET_UNDEFINED`]
    pub cur_preset: u16,
    pub num_bands: u16,
    /// Band levels in millibels
    pub band_levels: Vec<i16>,
}

impl Default for HQEqualizerSettings {
    fn default() -> Self {
        Self::from_preset(presets::EQUALIZER_PRESET_FLAT)
            .unwrap_or_else(|| Self {
                cur_preset: PRESET_UNDEFINED,
                num_bands: HQ_EQUALIZER_NUM_BANDS,
                band_levels: vec![0; usize::from(HQ_EQUALIZER_NUM_BANDS)],
            })
    }
}

impl HQEqualizerSettings {
    pub fn from_preset(preset: u16) -> Option<Self> {
        presets::hq_equalizer_preset(preset).map(|p| Self {
            cur_preset: preset,
            num_bands: HQ_EQUALIZER_NUM_BANDS,
            band_levels: p.band_levels.to_vec(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_bands(
            self.cur_preset,
            self.num_bands,
            &self.band_levels,
            HQ_EQUALIZER_NUM_BANDS,
            presets::HQ_EQUALIZER_PRESETS.len(),
        )
    }
}

effect_params!(HQEqualizerSettings, HQEqualizer);

// ============================================================================
// Loudness / Pre-Amp
// ============================================================================

/// Loudness enhancer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoudnessEnhancerSettings {
    /// Target gain in millibels
    pub target_gain_mb: i32,
}

impl LoudnessEnhancerSettings {
    pub fn validate(&self) -> Result<()> {
        check_range("target_gain_mb", self.target_gain_mb, &TARGET_GAIN_RANGE)
    }
}

effect_params!(LoudnessEnhancerSettings, LoudnessEnhancer);

/// Pre-amplifier parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreAmpSettings {
    /// Linear gain: 0.0 to 10.0
    pub level: f32,
}

impl Default for PreAmpSettings {
    fn default() -> Self {
        Self { level: 1.0 }
    }
}

impl PreAmpSettings {
    pub fn validate(&self) -> Result<()> {
        if self.level.is_nan() {
            return Err(SegueError::invalid_argument("level", "NaN"));
        }
        check_range("level", self.level, &PREAMP_LEVEL_RANGE)
    }
}

effect_params!(PreAmpSettings, PreAmp);

// ============================================================================
// Reverbs
// ============================================================================

/// Environmental reverb parameters (levels in millibels, times in ms,
/// ratios and diffusion/density per mille).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentalReverbSettings {
    pub room_level: i16,
    pub room_hf_level: i16,
    pub decay_time: i32,
    pub decay_hf_ratio: i16,
    pub reflections_level: i16,
    pub reflections_delay: i32,
    pub reverb_level: i16,
    pub reverb_delay: i32,
    pub diffusion: i16,
    pub density: i16,
}

impl Default for EnvironmentalReverbSettings {
    fn default() -> Self {
        presets::env_reverb_preset(0)
            .map(|p| p.settings)
            .unwrap_or(Self {
                room_level: -9000,
                room_hf_level: 0,
                decay_time: 1000,
                decay_hf_ratio: 500,
                reflections_level: 0,
                reflections_delay: 0,
                reverb_level: -9000,
                reverb_delay: 0,
                diffusion: 1000,
                density: 1000,
            })
    }
}

impl EnvironmentalReverbSettings {
    pub fn validate(&self) -> Result<()> {
        check_range("room_level", self.room_level, &ROOM_LEVEL_RANGE)?;
        check_range("room_hf_level", self.room_hf_level, &ROOM_HF_LEVEL_RANGE)?;
        check_range("decay_time", self.decay_time, &DECAY_TIME_RANGE)?;
        check_range("decay_hf_ratio", self.decay_hf_ratio, &DECAY_HF_RATIO_RANGE)?;
        check_range(
            "reflections_level",
            self.reflections_level,
            &REFLECTIONS_LEVEL_RANGE,
        )?;
        check_range(
            "reflections_delay",
            self.reflections_delay,
            &REFLECTIONS_DELAY_RANGE,
        )?;
        check_range("reverb_level", self.reverb_level, &REVERB_LEVEL_RANGE)?;
        check_range("reverb_delay", self.reverb_delay, &REVERB_DELAY_RANGE)?;
        check_range("diffusion", self.diffusion, &DIFFUSION_RANGE)?;
        check_range("density", self.density, &DENSITY_RANGE)
    }

    /// Read one parameter by index.
    pub fn get(&self, param: EnvReverbParam) -> i32 {
        match param {
            EnvReverbParam::DecayHfRatio => i32::from(self.decay_hf_ratio),
            EnvReverbParam::DecayTime => self.decay_time,
            EnvReverbParam::Density => i32::from(self.density),
            EnvReverbParam::Diffusion => i32::from(self.diffusion),
            EnvReverbParam::ReflectionsDelay => self.reflections_delay,
            EnvReverbParam::ReflectionsLevel => i32::from(self.reflections_level),
            EnvReverbParam::ReverbDelay => self.reverb_delay,
            EnvReverbParam::ReverbLevel => i32::from(self.reverb_level),
            EnvReverbParam::RoomHfLevel => i32::from(self.room_hf_level),
            EnvReverbParam::RoomLevel => i32::from(self.room_level),
        }
    }

    /// Write one parameter by index. Values that do not fit the field's
    /// width are rejected the same way as out-of-range values.
    pub fn set(&mut self, param: EnvReverbParam, value: i32) -> Result<()> {
        let (min, max) = param.range();
        check_range(param.name(), value, &(min..=max))?;
        // in range, so the narrowing below cannot truncate
        let narrow = value as i16;
        match param {
            EnvReverbParam::DecayHfRatio => self.decay_hf_ratio = narrow,
            EnvReverbParam::DecayTime => self.decay_time = value,
            EnvReverbParam::Density => self.density = narrow,
            EnvReverbParam::Diffusion => self.diffusion = narrow,
            EnvReverbParam::ReflectionsDelay => self.reflections_delay = value,
            EnvReverbParam::ReflectionsLevel => self.reflections_level = narrow,
            EnvReverbParam::ReverbDelay => self.reverb_delay = value,
            EnvReverbParam::ReverbLevel => self.reverb_level = narrow,
            EnvReverbParam::RoomHfLevel => self.room_hf_level = narrow,
            EnvReverbParam::RoomLevel => self.room_level = narrow,
        }
        Ok(())
    }
}

effect_params!(EnvironmentalReverbSettings, EnvironmentalReverb);

/// Environmental reverb parameters addressable by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvReverbParam {
    DecayHfRatio,
    DecayTime,
    Density,
    Diffusion,
    ReflectionsDelay,
    ReflectionsLevel,
    ReverbDelay,
    ReverbLevel,
    RoomHfLevel,
    RoomLevel,
}

impl EnvReverbParam {
    pub const ALL: [EnvReverbParam; 10] = [
        EnvReverbParam::DecayHfRatio,
        EnvReverbParam::DecayTime,
        EnvReverbParam::Density,
        EnvReverbParam::Diffusion,
        EnvReverbParam::ReflectionsDelay,
        EnvReverbParam::ReflectionsLevel,
        EnvReverbParam::ReverbDelay,
        EnvReverbParam::ReverbLevel,
        EnvReverbParam::RoomHfLevel,
        EnvReverbParam::RoomLevel,
    ];

    pub fn index(self) -> i32 {
        match self {
            EnvReverbParam::DecayHfRatio => 0,
            EnvReverbParam::DecayTime => 1,
            EnvReverbParam::Density => 2,
            EnvReverbParam::Diffusion => 3,
            EnvReverbParam::ReflectionsDelay => 4,
            EnvReverbParam::ReflectionsLevel => 5,
            EnvReverbParam::ReverbDelay => 6,
            EnvReverbParam::ReverbLevel => 7,
            EnvReverbParam::RoomHfLevel => 8,
            EnvReverbParam::RoomLevel => 9,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.index() == index)
    }

    pub fn name(self) -> &'static str {
        match self {
            EnvReverbParam::DecayHfRatio => "decay_hf_ratio",
            EnvReverbParam::DecayTime => "decay_time",
            EnvReverbParam::Density => "density",
            EnvReverbParam::Diffusion => "diffusion",
            EnvReverbParam::ReflectionsDelay => "reflections_delay",
            EnvReverbParam::ReflectionsLevel => "reflections_level",
            EnvReverbParam::ReverbDelay => "reverb_delay",
            EnvReverbParam::ReverbLevel => "reverb_level",
            EnvReverbParam::RoomHfLevel => "room_hf_level",
            EnvReverbParam::RoomLevel => "room_level",
        }
    }

    /// Valid range as `(min, max)`.
    pub fn range(self) -> (i32, i32) {
        fn widen(r: RangeInclusive<i16>) -> (i32, i32) {
            (i32::from(*r.start()), i32::from(*r.end()))
        }
        match self {
            EnvReverbParam::DecayHfRatio => widen(DECAY_HF_RATIO_RANGE),
            EnvReverbParam::DecayTime => (*DECAY_TIME_RANGE.start(), *DECAY_TIME_RANGE.end()),
            EnvReverbParam::Density => widen(DENSITY_RANGE),
            EnvReverbParam::Diffusion => widen(DIFFUSION_RANGE),
            EnvReverbParam::ReflectionsDelay => (
                *REFLECTIONS_DELAY_RANGE.start(),
                *REFLECTIONS_DELAY_RANGE.end(),
            ),
            EnvReverbParam::ReflectionsLevel => widen(REFLECTIONS_LEVEL_RANGE),
            EnvReverbParam::ReverbDelay => {
                (*REVERB_DELAY_RANGE.start(), *REVERB_DELAY_RANGE.end())
            }
            EnvReverbParam::ReverbLevel => widen(REVERB_LEVEL_RANGE),
            EnvReverbParam::RoomHfLevel => widen(ROOM_HF_LEVEL_RANGE),
            EnvReverbParam::RoomLevel => widen(ROOM_LEVEL_RANGE),
        }
    }
}

/// Preset reverb presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    #[default]
    None,
    SmallRoom,
    MediumRoom,
    LargeRoom,
    MediumHall,
    LargeHall,
    Plate,
}

impl ReverbPreset {
    pub const ALL: [ReverbPreset; 7] = [
        ReverbPreset::None,
        ReverbPreset::SmallRoom,
        ReverbPreset::MediumRoom,
        ReverbPreset::LargeRoom,
        ReverbPreset::MediumHall,
        ReverbPreset::LargeHall,
        ReverbPreset::Plate,
    ];

    pub fn code(self) -> i16 {
        match self {
            ReverbPreset::None => 0,
            ReverbPreset::SmallRoom => 1,
            ReverbPreset::MediumRoom => 2,
            ReverbPreset::LargeRoom => 3,
            ReverbPreset::MediumHall => 4,
            ReverbPreset::LargeHall => 5,
            ReverbPreset::Plate => 6,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| i32::from(p.code()) == code)
            .ok_or_else(|| {
                SegueError::invalid_argument("preset", format!("unknown reverb preset {}", code))
            })
    }
}

/// Preset reverb parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresetReverbSettings {
    pub preset: ReverbPreset,
}

impl PresetReverbSettings {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

effect_params!(PresetReverbSettings, PresetReverb);

// ============================================================================
// Visualizers
// ============================================================================

/// How captured waveforms are scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    #[default]
    Normalized,
    AsPlayed,
}

impl ScalingMode {
    pub fn code(self) -> i32 {
        match self {
            ScalingMode::Normalized => 0,
            ScalingMode::AsPlayed => 1,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(ScalingMode::Normalized),
            1 => Ok(ScalingMode::AsPlayed),
            other => Err(SegueError::invalid_argument(
                "scaling_mode",
                format!("unknown scaling mode {}", other),
            )),
        }
    }
}

/// Which level measurements a visualizer performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMode {
    #[default]
    None,
    PeakRms,
}

/// Visualizer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizerSettings {
    /// Capture size in samples, a power of two
    pub capture_size: u32,
    pub scaling_mode: ScalingMode,
    pub measurement_mode: MeasurementMode,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            capture_size: *VISUALIZER_CAPTURE_SIZE_RANGE.end(),
            scaling_mode: ScalingMode::Normalized,
            measurement_mode: MeasurementMode::None,
        }
    }
}

fn validate_capture_size(size: u32, range: &RangeInclusive<u32>) -> Result<()> {
    check_range("capture_size", size, range)?;
    if !size.is_power_of_two() {
        return Err(SegueError::invalid_argument(
            "capture_size",
            format!("{} is not a power of two", size),
        ));
    }
    Ok(())
}

impl VisualizerSettings {
    pub fn validate(&self) -> Result<()> {
        validate_capture_size(self.capture_size, &VISUALIZER_CAPTURE_SIZE_RANGE)
    }
}

effect_params!(VisualizerSettings, Visualizer);

/// FFT window applied by the high-quality visualizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
    FlatTop,
}

impl WindowType {
    pub const ALL: [WindowType; 5] = [
        WindowType::Rectangular,
        WindowType::Hann,
        WindowType::Hamming,
        WindowType::Blackman,
        WindowType::FlatTop,
    ];

    pub fn code(self) -> i32 {
        match self {
            WindowType::Rectangular => 0,
            WindowType::Hann => 1,
            WindowType::Hamming => 2,
            WindowType::Blackman => 3,
            WindowType::FlatTop => 4,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|w| w.code() == code)
            .ok_or_else(|| {
                SegueError::invalid_argument("window_type", format!("unknown window {}", code))
            })
    }
}

/// High-quality visualizer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HQVisualizerSettings {
    /// Capture size in samples, a power of two
    pub capture_size: u32,
    pub window_type: WindowType,
}

impl Default for HQVisualizerSettings {
    fn default() -> Self {
        Self {
            capture_size: 2048,
            window_type: WindowType::Hann,
        }
    }
}

impl HQVisualizerSettings {
    pub fn validate(&self) -> Result<()> {
        validate_capture_size(self.capture_size, &HQ_VISUALIZER_CAPTURE_SIZE_RANGE)
    }
}

effect_params!(HQVisualizerSettings, HQVisualizer);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        for effect_type in EffectType::ALL {
            let settings = EffectSettings::default_for(effect_type);
            assert_eq!(settings.effect_type(), effect_type);
            let valid = match &settings {
                EffectSettings::BassBoost(s) => s.validate(),
                EffectSettings::Virtualizer(s) => s.validate(),
                EffectSettings::Equalizer(s) => s.validate(),
                EffectSettings::LoudnessEnhancer(s) => s.validate(),
                EffectSettings::EnvironmentalReverb(s) => s.validate(),
                EffectSettings::PresetReverb(s) => s.validate(),
                EffectSettings::Visualizer(s) => s.validate(),
                EffectSettings::HQEqualizer(s) => s.validate(),
                EffectSettings::PreAmp(s) => s.validate(),
                EffectSettings::HQVisualizer(s) => s.validate(),
            };
            assert!(valid.is_ok(), "{} defaults invalid", effect_type);
        }
    }

    #[test]
    fn test_strength_range() {
        assert!(BassBoostSettings { strength: 1000 }.validate().is_ok());
        let err = BassBoostSettings { strength: 1001 }.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert!(VirtualizerSettings { strength: -1 }.validate().is_err());
    }

    #[test]
    fn test_equalizer_validation() {
        let mut eq = EqualizerSettings::default();
        eq.band_levels[2] = 1600;
        assert!(eq.validate().is_err());

        let mut eq = EqualizerSettings::default();
        eq.band_levels.pop();
        assert!(eq.validate().is_err());

        let mut eq = EqualizerSettings::default();
        eq.cur_preset = PRESET_UNDEFINED;
        assert!(eq.validate().is_ok());
        eq.cur_preset = 10;
        assert!(eq.validate().is_err());
    }

    #[test]
    fn test_env_reverb_param_by_index() {
        let mut reverb = EnvironmentalReverbSettings::default();
        let param = EnvReverbParam::from_index(1).unwrap();
        assert_eq!(param, EnvReverbParam::DecayTime);

        reverb.set(param, 2500).unwrap();
        assert_eq!(reverb.get(param), 2500);
        assert!(reverb.set(param, 50).is_err());
        assert_eq!(reverb.decay_time, 2500);

        assert!(EnvReverbParam::from_index(10).is_none());
    }

    #[test]
    fn test_capture_size_power_of_two() {
        let mut vis = VisualizerSettings::default();
        vis.capture_size = 512;
        assert!(vis.validate().is_ok());
        vis.capture_size = 500;
        assert!(vis.validate().is_err());
        vis.capture_size = 2048;
        assert!(vis.validate().is_err());

        let hq = HQVisualizerSettings {
            capture_size: 4096,
            ..Default::default()
        };
        assert!(hq.validate().is_ok());
    }

    #[test]
    fn test_preamp_rejects_nan() {
        assert!(PreAmpSettings { level: f32::NAN }.validate().is_err());
        assert!(PreAmpSettings { level: 10.5 }.validate().is_err());
        assert!(PreAmpSettings { level: 0.0 }.validate().is_ok());
    }

    #[test]
    fn test_settings_serde_tagged() {
        let settings = BassBoostSettings { strength: 300 }.into_settings();
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"type\":\"bass_boost\""));
        let back: EffectSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
