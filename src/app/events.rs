//! Application events
//!
//! Requests and notifications travel in one envelope, [`AppEvent`], with the
//! numeric codes UIs already speak. Requests are decoded into typed
//! [`AppCommand`]s before the controller acts on them.
//!
//! Float arguments travel as the raw IEEE-754 bits of an `f32` in an `i32`
//! slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::audiofx::settings::{EffectType, EnvReverbParam, ReverbPreset, ScalingMode, WindowType};
use crate::engine::SlotIndex;
use crate::error::{Result, SegueError};
use crate::player::{PlayerImplType, PlayerState};
use crate::state::stores::AuxEffectType;

// ========================================================================
// Codes
// ========================================================================

/// Event categories. Notifications use `200 + (request category - 100)`.
pub mod category {
    pub const NAVIGATION_DRAWER: i32 = 10;

    pub const PLAYER_CONTROL: i32 = 100;
    pub const BASSBOOST: i32 = 101;
    pub const VIRTUALIZER: i32 = 102;
    pub const EQUALIZER: i32 = 103;
    pub const LOUDNESS_ENHANCER: i32 = 104;
    pub const ENVIRONMENTAL_REVERB: i32 = 105;
    pub const PRESET_REVERB: i32 = 106;
    pub const VISUALIZER: i32 = 107;
    pub const HQ_EQUALIZER: i32 = 108;
    pub const PRE_AMP: i32 = 109;
    pub const HQ_VISUALIZER: i32 = 110;

    pub const NOTIFY_PLAYER_CONTROL: i32 = 200;
    pub const NOTIFY_BASSBOOST: i32 = 201;
    pub const NOTIFY_VIRTUALIZER: i32 = 202;
    pub const NOTIFY_EQUALIZER: i32 = 203;
    pub const NOTIFY_LOUDNESS_ENHANCER: i32 = 204;
    pub const NOTIFY_ENVIRONMENTAL_REVERB: i32 = 205;
    pub const NOTIFY_PRESET_REVERB: i32 = 206;
    pub const NOTIFY_VISUALIZER: i32 = 207;
    pub const NOTIFY_HQ_EQUALIZER: i32 = 208;
    pub const NOTIFY_PRE_AMP: i32 = 209;
    pub const NOTIFY_HQ_VISUALIZER: i32 = 210;

    /// Notification category answering requests of `category`.
    pub const fn notify(category: i32) -> i32 {
        200 + (category - 100)
    }
}

pub mod navigation {
    pub const SELECT_PAGE: i32 = 0;
    /// arg1: section, arg2: enabled (0/1)
    pub const CLICK_ITEM_ENABLE_SWITCH: i32 = 1;
    /// arg1: player implementation type code
    pub const PLAYER_SET_IMPL_TYPE: i32 = 20;

    pub const SECTION_BASSBOOST: i32 = 1;
    pub const SECTION_VIRTUALIZER: i32 = 2;
    pub const SECTION_EQUALIZER: i32 = 3;
    pub const SECTION_LOUDNESS_ENHANCER: i32 = 4;
    pub const SECTION_PRESET_REVERB: i32 = 5;
    pub const SECTION_ENVIRONMENTAL_REVERB: i32 = 6;
    pub const SECTION_VISUALIZER: i32 = 7;
    pub const SECTION_HQ_EQUALIZER: i32 = 8;
    pub const SECTION_HQ_VISUALIZER: i32 = 9;
}

pub mod player {
    /// arg1: slot, extra `uri`
    pub const SONG_PICKED: i32 = 0;
    pub const CREATE: i32 = 1;
    pub const SET_DATA_SOURCE: i32 = 2;
    pub const PREPARE: i32 = 3;
    pub const PREPARE_ASYNC: i32 = 4;
    pub const START: i32 = 5;
    pub const PAUSE: i32 = 6;
    pub const STOP: i32 = 7;
    pub const RESET: i32 = 8;
    pub const RELEASE: i32 = 9;
    /// arg2: normalized position (float bits)
    pub const SEEK_TO: i32 = 10;
    pub const SET_VOLUME_LEFT: i32 = 11;
    pub const SET_VOLUME_RIGHT: i32 = 12;
    /// arg1: 0/1
    pub const SET_LOOPING: i32 = 13;
    /// arg1: aux effect type code
    pub const ATTACH_AUX_EFFECT: i32 = 14;
    pub const SET_AUX_SEND_LEVEL: i32 = 15;

    /// arg1: slot, arg2: state code
    pub const PLAYER_STATE_CHANGED: i32 = 0;
    /// arg1: slot, extras `what` and `extra`
    pub const PLAYER_INFO: i32 = 1;
    /// arg1: slot, extras `what` and `extra`
    pub const PLAYER_ERROR: i32 = 2;
    /// arg1: slot or [`NO_SLOT`], extras `operation`, `exception` and
    /// `description`
    pub const EXCEPTION_OCCURRED: i32 = 3;

    /// Slot argument of failures not tied to a player.
    pub const NO_SLOT: i32 = -1;
}

/// Request and notification codes shared by the effect categories.
pub mod effect {
    /// arg1: 0/1
    pub const SET_ENABLED: i32 = 0;
    /// arg2: normalized strength (bass boost, virtualizer)
    pub const SET_STRENGTH: i32 = 1;
    /// arg2: normalized target gain (loudness enhancer)
    pub const SET_TARGET_GAIN: i32 = 1;
    /// arg1: preset (equalizers, reverbs)
    pub const SET_PRESET: i32 = 1;
    /// arg1: UI level as float bits (pre-amp)
    pub const SET_LEVEL: i32 = 1;
    /// arg1: band, arg2: normalized level (equalizers)
    pub const SET_BAND_LEVEL: i32 = 2;
    /// arg1: parameter index, arg2: normalized value (environmental reverb)
    pub const SET_PARAMETER: i32 = 2;

    pub const ENABLED_STATE_UPDATED: i32 = 0;
    pub const STRENGTH_UPDATED: i32 = 1;
    pub const TARGET_GAIN_UPDATED: i32 = 1;
    pub const PRESET_UPDATED: i32 = 1;
    pub const LEVEL_UPDATED: i32 = 1;
    pub const BAND_LEVEL_UPDATED: i32 = 2;
    pub const PARAMETER_UPDATED: i32 = 2;

    /// Parameter index meaning "every parameter changed".
    pub const PARAM_INDEX_ALL: i32 = 10;
    /// Band index meaning "every band changed".
    pub const BAND_INDEX_ALL: i32 = -1;
}

/// Visualizer requests; each is answered by a notification with the same
/// code and the new value in arg1.
pub mod visualizer {
    pub const SET_WAVEFORM_ENABLED: i32 = 0;
    pub const SET_FFT_ENABLED: i32 = 1;
    pub const SET_SCALING_MODE: i32 = 2;
    pub const SET_MEASURE_PEAK_ENABLED: i32 = 3;
    pub const SET_MEASURE_RMS_ENABLED: i32 = 4;
}

pub mod hq_visualizer {
    pub const SET_WAVEFORM_ENABLED: i32 = 0;
    pub const SET_FFT_ENABLED: i32 = 1;
    pub const SET_WINDOW_TYPE: i32 = 2;
}

/// Keys of [`AppEvent::extras`].
pub mod extra {
    pub const URI: &str = "uri";
    pub const WHAT: &str = "what";
    pub const EXTRA: &str = "extra";
    pub const OPERATION: &str = "operation";
    pub const EXCEPTION: &str = "exception";
    pub const DESCRIPTION: &str = "description";
}

// ========================================================================
// Envelope
// ========================================================================

/// One request or notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEvent {
    pub category: i32,
    pub event: i32,
    pub arg1: i32,
    pub arg2: i32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl AppEvent {
    pub fn new(category: i32, event: i32) -> Self {
        Self {
            category,
            event,
            ..Self::default()
        }
    }

    pub fn with_arg1(mut self, arg1: i32) -> Self {
        self.arg1 = arg1;
        self
    }

    pub fn with_arg2(mut self, arg2: i32) -> Self {
        self.arg2 = arg2;
        self
    }

    pub fn with_float_arg1(self, value: f32) -> Self {
        self.with_arg1(float_to_arg(value))
    }

    pub fn with_float_arg2(self, value: f32) -> Self {
        self.with_arg2(float_to_arg(value))
    }

    pub fn with_extra(mut self, key: &str, value: impl ToString) -> Self {
        self.extras.insert(key.to_string(), value.to_string());
        self
    }

    pub fn float_arg1(&self) -> f32 {
        arg_to_float(self.arg1)
    }

    pub fn float_arg2(&self) -> f32 {
        arg_to_float(self.arg2)
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    pub fn extra_int(&self, key: &str) -> Option<i32> {
        self.extra(key).and_then(|v| v.parse().ok())
    }

    pub fn is_notification(&self) -> bool {
        self.category >= category::NOTIFY_PLAYER_CONTROL
    }

    // --------------------------------------------------------------------
    // Notifications
    // --------------------------------------------------------------------

    pub fn player_state_changed(slot: SlotIndex, state: PlayerState) -> Self {
        Self::new(category::NOTIFY_PLAYER_CONTROL, player::PLAYER_STATE_CHANGED)
            .with_arg1(slot.index() as i32)
            .with_arg2(state.code())
    }

    pub fn player_info(slot: SlotIndex, what: i32, extra_code: i32) -> Self {
        Self::new(category::NOTIFY_PLAYER_CONTROL, player::PLAYER_INFO)
            .with_arg1(slot.index() as i32)
            .with_extra(extra::WHAT, what)
            .with_extra(extra::EXTRA, extra_code)
    }

    pub fn player_error(slot: SlotIndex, what: i32, extra_code: i32) -> Self {
        Self::new(category::NOTIFY_PLAYER_CONTROL, player::PLAYER_ERROR)
            .with_arg1(slot.index() as i32)
            .with_extra(extra::WHAT, what)
            .with_extra(extra::EXTRA, extra_code)
    }

    pub fn exception_occurred(
        slot: Option<SlotIndex>,
        operation: &str,
        error: &SegueError,
    ) -> Self {
        let slot = slot.map_or(player::NO_SLOT, |s| s.index() as i32);
        Self::new(category::NOTIFY_PLAYER_CONTROL, player::EXCEPTION_OCCURRED)
            .with_arg1(slot)
            .with_extra(extra::OPERATION, operation)
            .with_extra(extra::EXCEPTION, error.error_code())
            .with_extra(extra::DESCRIPTION, error)
    }

    /// Notification in the category answering `request_category`.
    pub fn effect_notification(request_category: i32, event: i32, arg1: i32) -> Self {
        Self::new(category::notify(request_category), event).with_arg1(arg1)
    }
}

fn float_to_arg(value: f32) -> i32 {
    value.to_bits() as i32
}

fn arg_to_float(arg: i32) -> f32 {
    f32::from_bits(arg as u32)
}

// ========================================================================
// Commands
// ========================================================================

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    SelectPage(i32),
    SetPlayerImplType(PlayerImplType),
    SetEffectEnabled { effect: EffectType, enabled: bool },

    SongPicked { slot: SlotIndex, uri: String },
    CreatePlayers,
    SetDataSource,
    Prepare,
    PrepareAsync,
    Start,
    Pause,
    Stop,
    Reset,
    Release,
    SeekTo(f32),
    SetVolumeLeft(f32),
    SetVolumeRight(f32),
    SetLooping(bool),
    AttachAuxEffect(AuxEffectType),
    SetAuxSendLevel(f32),

    /// Bass boost or virtualizer
    SetStrength { effect: EffectType, value: f32 },
    SetTargetGain(f32),
    /// Equalizer or HQ equalizer
    SetEqualizerPreset { effect: EffectType, preset: i32 },
    SetEqualizerBandLevel { effect: EffectType, band: i32, value: f32 },
    SetEnvReverbPreset(i32),
    SetEnvReverbParameter { param: EnvReverbParam, value: f32 },
    SetPresetReverbPreset(ReverbPreset),
    SetPreAmpLevel(f32),

    SetVisualizerWaveform(bool),
    SetVisualizerFft(bool),
    SetVisualizerScalingMode(ScalingMode),
    SetVisualizerMeasurePeak(bool),
    SetVisualizerMeasureRms(bool),
    SetHQVisualizerWaveform(bool),
    SetHQVisualizerFft(bool),
    SetHQVisualizerWindowType(WindowType),
}

fn section_effect(section: i32) -> Option<EffectType> {
    match section {
        navigation::SECTION_BASSBOOST => Some(EffectType::BassBoost),
        navigation::SECTION_VIRTUALIZER => Some(EffectType::Virtualizer),
        navigation::SECTION_EQUALIZER => Some(EffectType::Equalizer),
        navigation::SECTION_LOUDNESS_ENHANCER => Some(EffectType::LoudnessEnhancer),
        navigation::SECTION_PRESET_REVERB => Some(EffectType::PresetReverb),
        navigation::SECTION_ENVIRONMENTAL_REVERB => Some(EffectType::EnvironmentalReverb),
        navigation::SECTION_HQ_EQUALIZER => Some(EffectType::HQEqualizer),
        _ => None,
    }
}

/// Request category of an effect.
pub fn effect_category(effect: EffectType) -> i32 {
    match effect {
        EffectType::BassBoost => category::BASSBOOST,
        EffectType::Virtualizer => category::VIRTUALIZER,
        EffectType::Equalizer => category::EQUALIZER,
        EffectType::LoudnessEnhancer => category::LOUDNESS_ENHANCER,
        EffectType::EnvironmentalReverb => category::ENVIRONMENTAL_REVERB,
        EffectType::PresetReverb => category::PRESET_REVERB,
        EffectType::Visualizer => category::VISUALIZER,
        EffectType::HQEqualizer => category::HQ_EQUALIZER,
        EffectType::PreAmp => category::PRE_AMP,
        EffectType::HQVisualizer => category::HQ_VISUALIZER,
    }
}

impl AppCommand {
    /// Decode a request. Unknown codes, notifications and sections without
    /// an enable switch yield `Ok(None)`; malformed arguments are an
    /// `InvalidArgument` error.
    pub fn decode(event: &AppEvent) -> Result<Option<AppCommand>> {
        let flag = event.arg1 != 0;
        let command = match event.category {
            category::NAVIGATION_DRAWER => match event.event {
                navigation::SELECT_PAGE => Some(AppCommand::SelectPage(event.arg1)),
                navigation::CLICK_ITEM_ENABLE_SWITCH => {
                    section_effect(event.arg1).map(|effect| AppCommand::SetEffectEnabled {
                        effect,
                        enabled: event.arg2 != 0,
                    })
                }
                navigation::PLAYER_SET_IMPL_TYPE => Some(AppCommand::SetPlayerImplType(
                    PlayerImplType::from_code(event.arg1)?,
                )),
                _ => None,
            },
            category::PLAYER_CONTROL => Self::decode_player(event)?,
            category::BASSBOOST | category::VIRTUALIZER => {
                let effect = if event.category == category::BASSBOOST {
                    EffectType::BassBoost
                } else {
                    EffectType::Virtualizer
                };
                match event.event {
                    effect::SET_ENABLED => Some(AppCommand::SetEffectEnabled { effect, enabled: flag }),
                    effect::SET_STRENGTH => Some(AppCommand::SetStrength {
                        effect,
                        value: event.float_arg2(),
                    }),
                    _ => None,
                }
            }
            category::EQUALIZER | category::HQ_EQUALIZER => {
                let effect = if event.category == category::EQUALIZER {
                    EffectType::Equalizer
                } else {
                    EffectType::HQEqualizer
                };
                match event.event {
                    effect::SET_ENABLED => Some(AppCommand::SetEffectEnabled { effect, enabled: flag }),
                    effect::SET_PRESET => Some(AppCommand::SetEqualizerPreset {
                        effect,
                        preset: event.arg1,
                    }),
                    effect::SET_BAND_LEVEL => Some(AppCommand::SetEqualizerBandLevel {
                        effect,
                        band: event.arg1,
                        value: event.float_arg2(),
                    }),
                    _ => None,
                }
            }
            category::LOUDNESS_ENHANCER => match event.event {
                effect::SET_ENABLED => Some(AppCommand::SetEffectEnabled {
                    effect: EffectType::LoudnessEnhancer,
                    enabled: flag,
                }),
                effect::SET_TARGET_GAIN => Some(AppCommand::SetTargetGain(event.float_arg2())),
                _ => None,
            },
            category::ENVIRONMENTAL_REVERB => match event.event {
                effect::SET_ENABLED => Some(AppCommand::SetEffectEnabled {
                    effect: EffectType::EnvironmentalReverb,
                    enabled: flag,
                }),
                effect::SET_PRESET => Some(AppCommand::SetEnvReverbPreset(event.arg1)),
                effect::SET_PARAMETER => {
                    let param = EnvReverbParam::from_index(event.arg1).ok_or_else(|| {
                        SegueError::invalid_argument(
                            "param",
                            format!("unknown environmental reverb parameter {}", event.arg1),
                        )
                    })?;
                    Some(AppCommand::SetEnvReverbParameter {
                        param,
                        value: event.float_arg2(),
                    })
                }
                _ => None,
            },
            category::PRESET_REVERB => match event.event {
                effect::SET_ENABLED => Some(AppCommand::SetEffectEnabled {
                    effect: EffectType::PresetReverb,
                    enabled: flag,
                }),
                effect::SET_PRESET => Some(AppCommand::SetPresetReverbPreset(
                    ReverbPreset::from_code(event.arg1)?,
                )),
                _ => None,
            },
            category::PRE_AMP => match event.event {
                effect::SET_ENABLED => Some(AppCommand::SetEffectEnabled {
                    effect: EffectType::PreAmp,
                    enabled: flag,
                }),
                effect::SET_LEVEL => Some(AppCommand::SetPreAmpLevel(event.float_arg1())),
                _ => None,
            },
            category::VISUALIZER => match event.event {
                visualizer::SET_WAVEFORM_ENABLED => Some(AppCommand::SetVisualizerWaveform(flag)),
                visualizer::SET_FFT_ENABLED => Some(AppCommand::SetVisualizerFft(flag)),
                visualizer::SET_SCALING_MODE => Some(AppCommand::SetVisualizerScalingMode(
                    ScalingMode::from_code(event.arg1)?,
                )),
                visualizer::SET_MEASURE_PEAK_ENABLED => {
                    Some(AppCommand::SetVisualizerMeasurePeak(flag))
                }
                visualizer::SET_MEASURE_RMS_ENABLED => Some(AppCommand::SetVisualizerMeasureRms(flag)),
                _ => None,
            },
            category::HQ_VISUALIZER => match event.event {
                hq_visualizer::SET_WAVEFORM_ENABLED => Some(AppCommand::SetHQVisualizerWaveform(flag)),
                hq_visualizer::SET_FFT_ENABLED => Some(AppCommand::SetHQVisualizerFft(flag)),
                hq_visualizer::SET_WINDOW_TYPE => Some(AppCommand::SetHQVisualizerWindowType(
                    WindowType::from_code(event.arg1)?,
                )),
                _ => None,
            },
            _ => None,
        };
        Ok(command)
    }

    fn decode_player(event: &AppEvent) -> Result<Option<AppCommand>> {
        let command = match event.event {
            player::SONG_PICKED => {
                let slot = SlotIndex::from_arg(event.arg1)?;
                let uri = event
                    .extra(extra::URI)
                    .ok_or_else(|| SegueError::invalid_argument("uri", "missing"))?;
                AppCommand::SongPicked {
                    slot,
                    uri: uri.to_string(),
                }
            }
            player::CREATE => AppCommand::CreatePlayers,
            player::SET_DATA_SOURCE => AppCommand::SetDataSource,
            player::PREPARE => AppCommand::Prepare,
            player::PREPARE_ASYNC => AppCommand::PrepareAsync,
            player::START => AppCommand::Start,
            player::PAUSE => AppCommand::Pause,
            player::STOP => AppCommand::Stop,
            player::RESET => AppCommand::Reset,
            player::RELEASE => AppCommand::Release,
            player::SEEK_TO => AppCommand::SeekTo(event.float_arg2()),
            player::SET_VOLUME_LEFT => AppCommand::SetVolumeLeft(event.float_arg2()),
            player::SET_VOLUME_RIGHT => AppCommand::SetVolumeRight(event.float_arg2()),
            player::SET_LOOPING => AppCommand::SetLooping(event.arg1 != 0),
            player::ATTACH_AUX_EFFECT => {
                AppCommand::AttachAuxEffect(AuxEffectType::from_code(event.arg1)?)
            }
            player::SET_AUX_SEND_LEVEL => AppCommand::SetAuxSendLevel(event.float_arg2()),
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}
