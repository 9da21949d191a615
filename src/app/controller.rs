//! Application controller
//!
//! Owns the state stores, the gapless engine and every effect handle the
//! application holds. Requests arrive as [`AppEvent`]s; each one updates the
//! stores, pushes the change to the engine or the effect handles and
//! publishes notifications on the [`EventBus`].
//!
//! Failures of player or effect operations never abort a request. They are
//! published as `EXCEPTION_OCCURRED` notifications and whatever the request
//! already changed stays changed. Malformed requests are returned as
//! `InvalidArgument` errors, and a broken foreground invariant is returned as
//! a fatal `InvariantViolation`.
//!
//! # Example
//!
//! ```
//! use segue::app::{category, player, AppController, AppEvent};
//! use segue::player::{CatalogMetadataSource, SimulatedPlatform};
//!
//! let platform = SimulatedPlatform::new();
//! let mut controller = AppController::new(
//!     Box::new(platform.clone()),
//!     Box::new(CatalogMetadataSource::with_fallback(60_000)),
//! )
//! .unwrap();
//! let notifications = controller.subscribe();
//!
//! controller
//!     .dispatch(&AppEvent::new(category::PLAYER_CONTROL, player::CREATE))
//!     .unwrap();
//! assert!(!notifications.drain().is_empty());
//! ```

use std::path::Path;

use log::{debug, info, warn};

use crate::app::bus::{EventBus, Subscription};
use crate::app::events::{self, category, effect, AppCommand, AppEvent};
use crate::audiofx::{
    BassBoost, EffectFactory, EffectHandle, EffectParams, EffectType, EnvironmentalReverb,
    Equalizer, HQEqualizer, HQVisualizer, LoudnessEnhancer, PreAmp, PresetReverb, SessionId,
    Virtualizer, Visualizer, GLOBAL_SESSION,
};
use crate::engine::{EngineOutput, GaplessEngine, PlaybackOptions, SlotIndex};
use crate::error::{Result, SegueError};
use crate::player::{MediaPlatform, MetadataSource, PlayerFactory, PlayerImplType, PlayerState};
use crate::state::snapshot::{load_snapshot, save_snapshot, Snapshot};
use crate::state::stores::{AuxEffectType, PlayerStore, StateStores};

/// Which slot, if any, is audibly playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Foreground {
    #[default]
    Inactive,
    Player(SlotIndex),
}

/// Effects re-applied from the stores whenever players are created.
const APPLIED_ON_CREATE: [EffectType; 8] = [
    EffectType::BassBoost,
    EffectType::Virtualizer,
    EffectType::Equalizer,
    EffectType::LoudnessEnhancer,
    EffectType::EnvironmentalReverb,
    EffectType::PresetReverb,
    EffectType::HQEqualizer,
    EffectType::PreAmp,
];

#[derive(Debug, Default)]
struct EffectHandles {
    bass_boost: Option<BassBoost>,
    virtualizer: Option<Virtualizer>,
    equalizer: Option<Equalizer>,
    loudness_enhancer: Option<LoudnessEnhancer>,
    environmental_reverb: Option<EnvironmentalReverb>,
    preset_reverb: Option<PresetReverb>,
    visualizer: Option<Visualizer>,
    hq_equalizer: Option<HQEqualizer>,
    pre_amp: Option<PreAmp>,
    hq_visualizer: Option<HQVisualizer>,
}

impl EffectHandles {
    fn is_held(&self, effect: EffectType) -> bool {
        match effect {
            EffectType::BassBoost => self.bass_boost.is_some(),
            EffectType::Virtualizer => self.virtualizer.is_some(),
            EffectType::Equalizer => self.equalizer.is_some(),
            EffectType::LoudnessEnhancer => self.loudness_enhancer.is_some(),
            EffectType::EnvironmentalReverb => self.environmental_reverb.is_some(),
            EffectType::PresetReverb => self.preset_reverb.is_some(),
            EffectType::Visualizer => self.visualizer.is_some(),
            EffectType::HQEqualizer => self.hq_equalizer.is_some(),
            EffectType::PreAmp => self.pre_amp.is_some(),
            EffectType::HQVisualizer => self.hq_visualizer.is_some(),
        }
    }
}

/// Create the handle if the effect is wanted, push the stored settings and
/// the enabled flag, and let go of the handle once the effect is disabled.
fn apply_effect<S: EffectParams>(
    handle: &mut Option<EffectHandle<S>>,
    factory: &EffectFactory,
    session: Option<SessionId>,
    enabled: bool,
    settings: &S,
) -> Result<()> {
    if enabled && handle.is_none() {
        match session {
            Some(session) => *handle = factory.create::<S>(session)?,
            None => {
                debug!("{} waits for players to exist", S::TYPE);
                return Ok(());
            }
        }
    }
    let Some(h) = handle.as_ref() else {
        return Ok(());
    };

    let result = h.set_properties(settings).and_then(|()| {
        let status = h.set_enabled(enabled)?;
        if !status.is_success() {
            warn!("{}: set_enabled({}) returned {}", S::TYPE, enabled, status);
        }
        Ok(())
    });

    if !enabled {
        *handle = None;
    }
    result
}

fn playback_options(store: &PlayerStore) -> PlaybackOptions {
    PlaybackOptions {
        looping: store.looping,
        volume_left: store.volume_left,
        volume_right: store.volume_right,
        aux_send_level: store.aux_send_level,
        ..PlaybackOptions::default()
    }
}

/// Event-driven coordinator of stores, engine and effects.
pub struct AppController {
    platform: Box<dyn MediaPlatform>,
    metadata: Box<dyn MetadataSource>,
    player_factory: Box<dyn PlayerFactory>,
    effect_factory: EffectFactory,
    engine: GaplessEngine,
    stores: StateStores,
    effects: EffectHandles,
    bus: EventBus,
    foreground: Foreground,
}

impl AppController {
    pub fn new(platform: Box<dyn MediaPlatform>, metadata: Box<dyn MetadataSource>) -> Result<Self> {
        Self::with_stores(platform, metadata, StateStores::default())
    }

    /// Controller starting from previously saved stores. Players are not
    /// created until a `CREATE` request arrives.
    pub fn with_stores(
        platform: Box<dyn MediaPlatform>,
        metadata: Box<dyn MetadataSource>,
        stores: StateStores,
    ) -> Result<Self> {
        let impl_type = stores.player.impl_type;
        let player_factory = platform.create_factory(impl_type)?;
        info!("controller ready with {} players", impl_type);
        Ok(Self {
            platform,
            metadata,
            player_factory,
            effect_factory: EffectFactory::new(impl_type),
            engine: GaplessEngine::new(playback_options(&stores.player)),
            stores,
            effects: EffectHandles::default(),
            bus: EventBus::new(),
            foreground: Foreground::Inactive,
        })
    }

    /// Controller restored from the snapshot at `path`.
    pub fn with_snapshot(
        platform: Box<dyn MediaPlatform>,
        metadata: Box<dyn MetadataSource>,
        path: &Path,
    ) -> Result<Self> {
        let snapshot = load_snapshot(path)?;
        info!("restoring state from snapshot {}", snapshot.id);
        Self::with_stores(platform, metadata, snapshot.stores)
    }

    /// Persist the stores to `path`.
    pub fn save_state(&self, path: &Path) -> Result<Snapshot> {
        save_snapshot(path, &self.stores)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn stores(&self) -> &StateStores {
        &self.stores
    }

    pub fn engine(&self) -> &GaplessEngine {
        &self.engine
    }

    pub fn foreground(&self) -> Foreground {
        self.foreground
    }

    pub fn impl_type(&self) -> PlayerImplType {
        self.stores.player.impl_type
    }

    /// The factory the controller creates its effects with. Handles created
    /// here compete with the controller's own for control.
    pub fn effect_factory(&self) -> &EffectFactory {
        &self.effect_factory
    }

    /// Whether the controller currently holds a handle for `effect`.
    pub fn holds_effect(&self, effect: EffectType) -> bool {
        self.effects.is_held(effect)
    }

    /// Session player-bound effects attach to, once players exist.
    pub fn player_session(&self) -> Option<SessionId> {
        self.engine
            .slot(SlotIndex::Zero)
            .player()
            .and_then(|p| p.audio_session_id().ok())
    }

    fn effect_session(&self, effect: EffectType) -> Option<SessionId> {
        if effect.is_player_bound() {
            self.player_session()
        } else {
            Some(GLOBAL_SESSION)
        }
    }

    // ========================================================================
    // Visualizers
    // ========================================================================

    /// The visualizer on the player session, created on first use.
    pub fn create_visualizer(&mut self) -> Result<Option<&Visualizer>> {
        if self.effects.visualizer.is_none() {
            let Some(session) = self.effect_session(EffectType::Visualizer) else {
                return Ok(None);
            };
            self.effects.visualizer = self.effect_factory.create(session)?;
        }
        Ok(self.effects.visualizer.as_ref())
    }

    /// The high-quality visualizer on the global session, created on first use.
    pub fn create_hq_visualizer(&mut self) -> Result<Option<&HQVisualizer>> {
        if self.effects.hq_visualizer.is_none() {
            self.effects.hq_visualizer = self.effect_factory.create(GLOBAL_SESSION)?;
        }
        Ok(self.effects.hq_visualizer.as_ref())
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Handle one request.
    pub fn dispatch(&mut self, event: &AppEvent) -> Result<()> {
        match AppCommand::decode(event)? {
            Some(command) => self.execute(command),
            None => {
                debug!("ignoring event {}/{}", event.category, event.event);
                Ok(())
            }
        }
    }

    /// Deliver queued platform callbacks. Returns how many were delivered.
    pub fn pump(&mut self) -> Result<usize> {
        let events = self.player_factory.poll_events();
        let delivered = events.len();
        if delivered > 0 {
            self.engine.dispatch_backend_events(events);
            self.drain_engine()?;
        }
        Ok(delivered)
    }

    /// Pump until the platform has nothing more to say.
    pub fn run_until_idle(&mut self) -> Result<usize> {
        let mut total = 0;
        loop {
            let delivered = self.pump()?;
            if delivered == 0 {
                return Ok(total);
            }
            total += delivered;
        }
    }

    /// Handle one decoded request.
    pub fn execute(&mut self, command: AppCommand) -> Result<()> {
        debug!("execute {:?}", command);
        match command {
            AppCommand::SelectPage(page) => debug!("page {} selected", page),
            AppCommand::SetPlayerImplType(impl_type) => self.set_player_impl_type(impl_type, false)?,
            AppCommand::SetEffectEnabled { effect, enabled } => {
                self.set_effect_enabled(effect, enabled)?
            }
            AppCommand::SongPicked { slot, uri } => {
                info!("{}: picked {}", slot, uri);
                self.stores.player.set_media_uri(slot, uri);
            }
            AppCommand::CreatePlayers => self.create_players()?,
            AppCommand::SetDataSource => {
                for slot in SlotIndex::BOTH {
                    if let Some(uri) = self.stores.player.media_uri(slot).map(str::to_owned) {
                        self.engine.set_data_source(slot, &uri, self.metadata.as_ref());
                    }
                }
            }
            AppCommand::Prepare => {
                for slot in SlotIndex::BOTH {
                    self.engine.prepare(slot);
                }
            }
            AppCommand::PrepareAsync => {
                for slot in SlotIndex::BOTH {
                    self.engine.prepare_async(slot);
                }
            }
            AppCommand::Start => self.engine.start(),
            AppCommand::Pause => self.engine.pause(),
            AppCommand::Stop => self.engine.stop(),
            AppCommand::Reset => self.engine.reset(),
            AppCommand::Release => self.release_all(),
            AppCommand::SeekTo(position) => self.engine.seek_to(position),
            AppCommand::SetVolumeLeft(volume) => {
                self.stores.player.volume_left = volume;
                self.engine.set_volume_left(volume);
            }
            AppCommand::SetVolumeRight(volume) => {
                self.stores.player.volume_right = volume;
                self.engine.set_volume_right(volume);
            }
            AppCommand::SetLooping(looping) => {
                self.stores.player.looping = looping;
                self.engine.set_looping(looping);
            }
            AppCommand::AttachAuxEffect(aux) => self.attach_aux_effect(aux),
            AppCommand::SetAuxSendLevel(level) => {
                self.stores.player.aux_send_level = level;
                self.engine.set_aux_send_level(level);
            }
            AppCommand::SetStrength { effect, value } => self.set_strength(effect, value)?,
            AppCommand::SetTargetGain(value) => self.set_target_gain(value)?,
            AppCommand::SetEqualizerPreset { effect, preset } => {
                self.set_equalizer_preset(effect, preset)?
            }
            AppCommand::SetEqualizerBandLevel {
                effect,
                band,
                value,
            } => self.set_equalizer_band_level(effect, band, value)?,
            AppCommand::SetEnvReverbPreset(preset) => self.set_env_reverb_preset(preset)?,
            AppCommand::SetEnvReverbParameter { param, value } => {
                self.stores
                    .environmental_reverb
                    .set_normalized_parameter(param, value)?;
                let raw = self.stores.environmental_reverb.settings.get(param);
                if let Some(h) = &self.effects.environmental_reverb {
                    let result = h.set_parameter(param, raw);
                    self.report("setParameter", result)?;
                }
                self.notify(category::ENVIRONMENTAL_REVERB, effect::PARAMETER_UPDATED, param.index());
                self.notify(category::ENVIRONMENTAL_REVERB, effect::PRESET_UPDATED, 0);
            }
            AppCommand::SetPresetReverbPreset(preset) => {
                self.stores.preset_reverb.settings.preset = preset;
                if let Some(h) = &self.effects.preset_reverb {
                    let result = h.set_preset(preset);
                    self.report("setPreset", result)?;
                }
                self.notify(category::PRESET_REVERB, effect::PRESET_UPDATED, 0);
            }
            AppCommand::SetPreAmpLevel(value) => {
                self.stores.pre_amp.set_ui_level(value)?;
                let level = self.stores.pre_amp.settings.level;
                if let Some(h) = &self.effects.pre_amp {
                    let result = h.set_level(level);
                    self.report("setLevel", result)?;
                }
                self.notify(category::PRE_AMP, effect::LEVEL_UPDATED, 0);
            }
            AppCommand::SetVisualizerWaveform(on) => {
                self.stores.visualizer.capture_waveform = on;
                self.notify(category::VISUALIZER, events::visualizer::SET_WAVEFORM_ENABLED, i32::from(on));
            }
            AppCommand::SetVisualizerFft(on) => {
                self.stores.visualizer.capture_fft = on;
                self.notify(category::VISUALIZER, events::visualizer::SET_FFT_ENABLED, i32::from(on));
            }
            AppCommand::SetVisualizerScalingMode(mode) => {
                self.stores.visualizer.scaling_mode = mode;
                self.notify(category::VISUALIZER, events::visualizer::SET_SCALING_MODE, mode.code());
            }
            AppCommand::SetVisualizerMeasurePeak(on) => {
                self.stores.visualizer.measure_peak = on;
                self.notify(
                    category::VISUALIZER,
                    events::visualizer::SET_MEASURE_PEAK_ENABLED,
                    i32::from(on),
                );
            }
            AppCommand::SetVisualizerMeasureRms(on) => {
                self.stores.visualizer.measure_rms = on;
                self.notify(
                    category::VISUALIZER,
                    events::visualizer::SET_MEASURE_RMS_ENABLED,
                    i32::from(on),
                );
            }
            AppCommand::SetHQVisualizerWaveform(on) => {
                self.stores.hq_visualizer.capture_waveform = on;
                self.notify(
                    category::HQ_VISUALIZER,
                    events::hq_visualizer::SET_WAVEFORM_ENABLED,
                    i32::from(on),
                );
            }
            AppCommand::SetHQVisualizerFft(on) => {
                self.stores.hq_visualizer.capture_fft = on;
                self.notify(
                    category::HQ_VISUALIZER,
                    events::hq_visualizer::SET_FFT_ENABLED,
                    i32::from(on),
                );
            }
            AppCommand::SetHQVisualizerWindowType(window) => {
                self.stores.hq_visualizer.window_type = window;
                self.notify(
                    category::HQ_VISUALIZER,
                    events::hq_visualizer::SET_WINDOW_TYPE,
                    window.code(),
                );
            }
        }
        self.drain_engine()
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    fn notify(&self, request_category: i32, event: i32, arg1: i32) {
        self.bus
            .emit(AppEvent::effect_notification(request_category, event, arg1));
    }

    /// Turn a failed player or effect operation into a notification. Only
    /// fatal errors are handed back.
    fn report(&self, operation: &str, result: Result<()>) -> Result<()> {
        self.report_at(None, operation, result)
    }

    /// [`Self::report`] for an operation on the player in `slot`.
    fn report_at(
        &self,
        slot: Option<SlotIndex>,
        operation: &str,
        result: Result<()>,
    ) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                match slot {
                    Some(slot) => warn!("{}: {} failed: {}", slot, operation, e),
                    None => warn!("{} failed: {}", operation, e),
                }
                self.bus
                    .emit(AppEvent::exception_occurred(slot, operation, &e));
                Ok(())
            }
        }
    }

    fn drain_engine(&mut self) -> Result<()> {
        for output in self.engine.take_outputs() {
            match output {
                EngineOutput::StateChanged { slot, state } => {
                    self.bus.emit(AppEvent::player_state_changed(slot, state));
                    self.update_foreground()?;
                }
                EngineOutput::PlayerInfo { slot, what, extra } => {
                    self.bus.emit(AppEvent::player_info(slot, what, extra));
                }
                EngineOutput::PlayerError { slot, what, extra } => {
                    self.bus.emit(AppEvent::player_error(slot, what, extra));
                }
                EngineOutput::OperationFailed {
                    slot,
                    operation,
                    error,
                } => self.report_at(Some(slot), &operation, Err(error))?,
            }
        }
        Ok(())
    }

    fn update_foreground(&mut self) -> Result<()> {
        let active = self.engine.active_index();
        let required = if self.engine.state(active) == PlayerState::Started {
            if self.engine.slot(active).metadata().is_none() {
                return Err(SegueError::InvariantViolation {
                    reason: format!("{} is playing without media metadata", active),
                });
            }
            Foreground::Player(active)
        } else {
            Foreground::Inactive
        };

        if required != self.foreground {
            info!("foreground {:?} -> {:?}", self.foreground, required);
            self.foreground = required;
        }
        Ok(())
    }

    // ========================================================================
    // Players
    // ========================================================================

    fn release_all(&mut self) {
        self.engine.release();
        self.effects = EffectHandles::default();
        info!("released all players and effects");
    }

    fn create_players(&mut self) -> Result<()> {
        self.release_all();
        self.engine.create(self.player_factory.as_mut());
        self.drain_engine()?;

        for effect in APPLIED_ON_CREATE {
            let result = self.apply(effect);
            self.report(&format!("apply {}", effect), result)?;
        }
        self.set_effect_enabled(EffectType::PreAmp, true)
    }

    /// Switch player implementation. Everything the old implementation
    /// created is released; players have to be created again.
    pub fn set_player_impl_type(&mut self, impl_type: PlayerImplType, force: bool) -> Result<()> {
        if !force && impl_type == self.stores.player.impl_type {
            debug!("player implementation already {}", impl_type);
            return Ok(());
        }

        let factory = match self.platform.create_factory(impl_type) {
            Ok(factory) => factory,
            Err(e) => return self.report("setPlayerImplType", Err(e)),
        };

        self.release_all();
        self.drain_engine()?;
        self.player_factory = factory;
        self.effect_factory = EffectFactory::new(impl_type);
        self.stores.player.impl_type = impl_type;
        info!("player implementation switched to {}", impl_type);
        Ok(())
    }

    fn aux_effect_id(&self) -> i32 {
        let id = match self.stores.player.aux_effect {
            AuxEffectType::None => None,
            AuxEffectType::EnvironmentalReverb => self
                .effects
                .environmental_reverb
                .as_ref()
                .and_then(|h| h.id().ok()),
            AuxEffectType::PresetReverb => {
                self.effects.preset_reverb.as_ref().and_then(|h| h.id().ok())
            }
        };
        id.unwrap_or(0)
    }

    fn attach_aux_effect(&mut self, aux: AuxEffectType) {
        if aux == self.stores.player.aux_effect {
            return;
        }
        self.stores.player.aux_effect = aux;
        let effect_id = self.aux_effect_id();
        debug!("attaching aux effect {:?} (id {})", aux, effect_id);
        self.engine.attach_aux_effect(effect_id);
    }

    // ========================================================================
    // Effects
    // ========================================================================

    fn apply(&mut self, effect: EffectType) -> Result<()> {
        let session = self.effect_session(effect);
        let factory = &self.effect_factory;
        let stores = &self.stores;
        let handles = &mut self.effects;

        match effect {
            EffectType::BassBoost => apply_effect(
                &mut handles.bass_boost,
                factory,
                session,
                stores.bass_boost.enabled,
                &stores.bass_boost.settings,
            ),
            EffectType::Virtualizer => apply_effect(
                &mut handles.virtualizer,
                factory,
                session,
                stores.virtualizer.enabled,
                &stores.virtualizer.settings,
            ),
            EffectType::Equalizer => apply_effect(
                &mut handles.equalizer,
                factory,
                session,
                stores.equalizer.enabled,
                &stores.equalizer.settings,
            ),
            EffectType::LoudnessEnhancer => apply_effect(
                &mut handles.loudness_enhancer,
                factory,
                session,
                stores.loudness_enhancer.enabled,
                &stores.loudness_enhancer.settings,
            ),
            EffectType::EnvironmentalReverb => apply_effect(
                &mut handles.environmental_reverb,
                factory,
                session,
                stores.environmental_reverb.enabled,
                &stores.environmental_reverb.settings,
            ),
            EffectType::PresetReverb => apply_effect(
                &mut handles.preset_reverb,
                factory,
                session,
                stores.preset_reverb.enabled,
                &stores.preset_reverb.settings,
            ),
            EffectType::HQEqualizer => apply_effect(
                &mut handles.hq_equalizer,
                factory,
                session,
                stores.hq_equalizer.enabled,
                &stores.hq_equalizer.settings,
            ),
            EffectType::PreAmp => apply_effect(
                &mut handles.pre_amp,
                factory,
                session,
                stores.pre_amp.enabled,
                &stores.pre_amp.settings,
            ),
            EffectType::Visualizer | EffectType::HQVisualizer => Ok(()),
        }?;

        if effect.is_auxiliary() {
            let effect_id = self.aux_effect_id();
            self.engine.set_aux_effect_on_prepare(effect_id);
        }
        Ok(())
    }

    fn set_effect_enabled(&mut self, effect: EffectType, enabled: bool) -> Result<()> {
        let flag = match effect {
            EffectType::BassBoost => &mut self.stores.bass_boost.enabled,
            EffectType::Virtualizer => &mut self.stores.virtualizer.enabled,
            EffectType::Equalizer => &mut self.stores.equalizer.enabled,
            EffectType::LoudnessEnhancer => &mut self.stores.loudness_enhancer.enabled,
            EffectType::EnvironmentalReverb => &mut self.stores.environmental_reverb.enabled,
            EffectType::PresetReverb => &mut self.stores.preset_reverb.enabled,
            EffectType::HQEqualizer => &mut self.stores.hq_equalizer.enabled,
            EffectType::PreAmp => &mut self.stores.pre_amp.enabled,
            EffectType::Visualizer | EffectType::HQVisualizer => {
                debug!("{} has no enable switch", effect);
                return Ok(());
            }
        };
        *flag = enabled;

        let result = self.apply(effect);
        self.report(&format!("set{}Enabled", effect.name()), result)?;
        self.notify(
            events::effect_category(effect),
            effect::ENABLED_STATE_UPDATED,
            i32::from(enabled),
        );
        Ok(())
    }

    fn set_strength(&mut self, effect: EffectType, value: f32) -> Result<()> {
        let result = match effect {
            EffectType::BassBoost => {
                self.stores.bass_boost.set_normalized_strength(value)?;
                let strength = self.stores.bass_boost.settings.strength;
                self.effects
                    .bass_boost
                    .as_ref()
                    .map_or(Ok(()), |h| h.set_strength(strength))
            }
            EffectType::Virtualizer => {
                self.stores.virtualizer.set_normalized_strength(value)?;
                let strength = self.stores.virtualizer.settings.strength;
                self.effects
                    .virtualizer
                    .as_ref()
                    .map_or(Ok(()), |h| h.set_strength(strength))
            }
            other => {
                return Err(SegueError::invalid_argument(
                    "effect",
                    format!("{} has no strength", other),
                ))
            }
        };
        self.report("setStrength", result)?;
        self.notify(events::effect_category(effect), effect::STRENGTH_UPDATED, 0);
        Ok(())
    }

    fn set_target_gain(&mut self, value: f32) -> Result<()> {
        self.stores.loudness_enhancer.set_normalized_target_gain(value)?;
        let gain = self.stores.loudness_enhancer.settings.target_gain_mb;
        if let Some(h) = &self.effects.loudness_enhancer {
            let result = h.set_target_gain(gain);
            self.report("setTargetGain", result)?;
        }
        self.notify(category::LOUDNESS_ENHANCER, effect::TARGET_GAIN_UPDATED, 0);
        Ok(())
    }

    fn set_equalizer_preset(&mut self, effect: EffectType, preset: i32) -> Result<()> {
        let result = match effect {
            EffectType::Equalizer => {
                self.stores.equalizer.use_preset(preset)?;
                let preset = self.stores.equalizer.settings.cur_preset;
                self.effects
                    .equalizer
                    .as_ref()
                    .map_or(Ok(()), |h| h.use_preset(preset))
            }
            EffectType::HQEqualizer => {
                self.stores.hq_equalizer.use_preset(preset)?;
                let preset = self.stores.hq_equalizer.settings.cur_preset;
                self.effects
                    .hq_equalizer
                    .as_ref()
                    .map_or(Ok(()), |h| h.use_preset(preset))
            }
            other => {
                return Err(SegueError::invalid_argument(
                    "effect",
                    format!("{} has no equalizer presets", other),
                ))
            }
        };
        self.report("usePreset", result)?;
        let request_category = events::effect_category(effect);
        self.notify(request_category, effect::PRESET_UPDATED, preset);
        self.notify(request_category, effect::BAND_LEVEL_UPDATED, effect::BAND_INDEX_ALL);
        Ok(())
    }

    fn set_equalizer_band_level(&mut self, effect: EffectType, band: i32, value: f32) -> Result<()> {
        let result = match effect {
            EffectType::Equalizer => {
                self.stores.equalizer.set_normalized_band_level(band, value)?;
                let level = self.stores.equalizer.settings.band_levels[band as usize];
                self.effects
                    .equalizer
                    .as_ref()
                    .map_or(Ok(()), |h| h.set_band_level(band as u16, level))
            }
            EffectType::HQEqualizer => {
                self.stores.hq_equalizer.set_normalized_band_level(band, value)?;
                let level = self.stores.hq_equalizer.settings.band_levels[band as usize];
                self.effects
                    .hq_equalizer
                    .as_ref()
                    .map_or(Ok(()), |h| h.set_band_level(band as u16, level))
            }
            other => {
                return Err(SegueError::invalid_argument(
                    "effect",
                    format!("{} has no bands", other),
                ))
            }
        };
        self.report("setBandLevel", result)?;
        self.notify(events::effect_category(effect), effect::BAND_LEVEL_UPDATED, band);
        Ok(())
    }

    fn set_env_reverb_preset(&mut self, preset: i32) -> Result<()> {
        self.stores.environmental_reverb.set_preset(preset)?;
        let settings = self.stores.environmental_reverb.settings;
        if let Some(h) = &self.effects.environmental_reverb {
            let result = h.set_properties(&settings);
            self.report("setProperties", result)?;
        }
        self.notify(category::ENVIRONMENTAL_REVERB, effect::PRESET_UPDATED, 0);
        self.notify(
            category::ENVIRONMENTAL_REVERB,
            effect::PARAMETER_UPDATED,
            effect::PARAM_INDEX_ALL,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{navigation, player};
    use crate::audiofx::{BassBoostSettings, EffectStatus};
    use crate::player::{CatalogMetadataSource, SimulatedPlatform};
    use approx::assert_relative_eq;

    fn controller() -> (SimulatedPlatform, AppController, Subscription) {
        let platform = SimulatedPlatform::new();
        let controller = AppController::new(
            Box::new(platform.clone()),
            Box::new(CatalogMetadataSource::with_fallback(10_000)),
        )
        .unwrap();
        let notes = controller.subscribe();
        (platform, controller, notes)
    }

    fn send(controller: &mut AppController, event: AppEvent) {
        controller.dispatch(&event).unwrap();
    }

    fn player_event(code: i32) -> AppEvent {
        AppEvent::new(category::PLAYER_CONTROL, code)
    }

    fn exceptions(notes: &[AppEvent]) -> Vec<&AppEvent> {
        notes
            .iter()
            .filter(|e| {
                e.category == category::NOTIFY_PLAYER_CONTROL
                    && e.event == player::EXCEPTION_OCCURRED
            })
            .collect()
    }

    #[test]
    fn test_create_enables_preamp_only_when_supported() {
        let (_platform, mut c, notes) = controller();
        send(&mut c, player_event(player::CREATE));

        assert!(c.stores().pre_amp.enabled);
        // standard players have no pre-amp
        assert!(!c.holds_effect(EffectType::PreAmp));
        assert_eq!(c.engine().state(SlotIndex::Zero), PlayerState::Idle);

        let notes = notes.drain();
        assert!(notes.iter().any(|e| e.category == category::NOTIFY_PRE_AMP
            && e.event == effect::ENABLED_STATE_UPDATED
            && e.arg1 == 1));
        assert!(exceptions(&notes).is_empty());
    }

    #[test]
    fn test_enable_before_create_is_deferred() {
        let (_platform, mut c, _notes) = controller();
        c.execute(AppCommand::SetEffectEnabled {
            effect: EffectType::BassBoost,
            enabled: true,
        })
        .unwrap();
        assert!(c.stores().bass_boost.enabled);
        assert!(!c.holds_effect(EffectType::BassBoost));

        c.execute(AppCommand::CreatePlayers).unwrap();
        assert!(c.holds_effect(EffectType::BassBoost));
    }

    // ------------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------------

    #[test]
    fn test_enable_disable_releases_handle() {
        let (_platform, mut c, notes) = controller();
        c.execute(AppCommand::CreatePlayers).unwrap();
        notes.drain();

        let on = AppEvent::new(category::NAVIGATION_DRAWER, navigation::CLICK_ITEM_ENABLE_SWITCH)
            .with_arg1(navigation::SECTION_BASSBOOST)
            .with_arg2(1);
        send(&mut c, on);
        assert!(c.holds_effect(EffectType::BassBoost));
        let session = c.player_session().unwrap();
        let key = crate::audiofx::BindingKey {
            session,
            effect_type: EffectType::BassBoost,
        };
        assert_eq!(c.effect_factory().registry().enabled(key), Some(true));

        send(&mut c, AppEvent::new(category::BASSBOOST, effect::SET_ENABLED).with_arg1(0));
        assert!(!c.holds_effect(EffectType::BassBoost));
        assert_eq!(c.effect_factory().registry().binding_count(), 0);

        let updates: Vec<i32> = notes
            .drain()
            .into_iter()
            .filter(|e| e.category == category::NOTIFY_BASSBOOST)
            .map(|e| e.arg1)
            .collect();
        assert_eq!(updates, vec![1, 0]);
    }

    #[test]
    fn test_strength_reaches_handle() {
        let (_platform, mut c, _notes) = controller();
        c.execute(AppCommand::CreatePlayers).unwrap();
        c.execute(AppCommand::SetEffectEnabled {
            effect: EffectType::Virtualizer,
            enabled: true,
        })
        .unwrap();
        send(
            &mut c,
            AppEvent::new(category::VIRTUALIZER, effect::SET_STRENGTH).with_float_arg2(0.4),
        );
        assert_eq!(c.stores().virtualizer.settings.strength, 400);
        let h = c.effects.virtualizer.as_ref().unwrap();
        assert_eq!(h.rounded_strength().unwrap(), 400);
    }

    #[test]
    fn test_lost_control_becomes_exception_notification() {
        let (_platform, mut c, notes) = controller();
        c.execute(AppCommand::CreatePlayers).unwrap();
        c.execute(AppCommand::SetEffectEnabled {
            effect: EffectType::BassBoost,
            enabled: true,
        })
        .unwrap();
        notes.drain();

        let session = c.player_session().unwrap();
        let other = c
            .effect_factory()
            .create::<BassBoostSettings>(session)
            .unwrap()
            .unwrap();
        assert!(other.has_control().unwrap());

        send(
            &mut c,
            AppEvent::new(category::BASSBOOST, effect::SET_STRENGTH).with_float_arg2(0.9),
        );
        // store keeps the new value even though the write was rejected
        assert_eq!(c.stores().bass_boost.settings.strength, 900);
        let notes = notes.drain();
        let errors = exceptions(&notes);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].extra(events::extra::EXCEPTION), Some("UNSUPPORTED_OPERATION"));

        // enabling while another handle holds control is a soft failure
        let h = c.effects.bass_boost.as_ref().unwrap();
        assert_eq!(h.set_enabled(false).unwrap(), EffectStatus::InvalidOperation);
    }

    #[test]
    fn test_out_of_range_normalized_value_is_rejected() {
        let (_platform, mut c, _notes) = controller();
        let event = AppEvent::new(category::BASSBOOST, effect::SET_STRENGTH).with_float_arg2(1.5);
        let err = c.dispatch(&event).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert_eq!(c.stores().bass_boost.settings.strength, 0);
    }

    #[test]
    fn test_equalizer_preset_notifications() {
        let (_platform, mut c, notes) = controller();
        send(&mut c, AppEvent::new(category::EQUALIZER, effect::SET_PRESET).with_arg1(2));
        assert_eq!(c.stores().equalizer.settings.cur_preset, 2);
        let notes: Vec<(i32, i32)> = notes.drain().into_iter().map(|e| (e.event, e.arg1)).collect();
        assert_eq!(
            notes,
            vec![
                (effect::PRESET_UPDATED, 2),
                (effect::BAND_LEVEL_UPDATED, effect::BAND_INDEX_ALL)
            ]
        );
    }

    #[test]
    fn test_env_reverb_parameter_makes_custom_room() {
        let (_platform, mut c, notes) = controller();
        send(
            &mut c,
            AppEvent::new(category::ENVIRONMENTAL_REVERB, effect::SET_PARAMETER)
                .with_arg1(2)
                .with_float_arg2(0.25),
        );
        assert_eq!(c.stores().environmental_reverb.preset, -1);
        assert_eq!(c.stores().environmental_reverb.settings.density, 250);
        let events: Vec<(i32, i32)> = notes.drain().into_iter().map(|e| (e.event, e.arg1)).collect();
        assert_eq!(
            events,
            vec![(effect::PARAMETER_UPDATED, 2), (effect::PRESET_UPDATED, 0)]
        );
    }

    #[test]
    fn test_preamp_level_ui_mapping() {
        let (_platform, mut c, _notes) = controller();
        send(&mut c, AppEvent::new(category::PRE_AMP, effect::SET_LEVEL).with_float_arg1(0.5));
        assert_relative_eq!(c.stores().pre_amp.settings.level, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_visualizer_store_is_only_notified() {
        let (_platform, mut c, notes) = controller();
        send(
            &mut c,
            AppEvent::new(category::HQ_VISUALIZER, events::hq_visualizer::SET_WINDOW_TYPE)
                .with_arg1(3),
        );
        assert_eq!(
            c.stores().hq_visualizer.window_type,
            crate::audiofx::WindowType::Blackman
        );
        assert!(!c.holds_effect(EffectType::HQVisualizer));
        let note = notes.try_recv().unwrap();
        assert_eq!(note.category, category::NOTIFY_HQ_VISUALIZER);
        assert_eq!(note.arg1, 3);
    }

    #[test]
    fn test_create_visualizers_lazily() {
        let (_platform, mut c, _notes) = controller();
        // no players yet, so no session for the visualizer
        assert!(c.create_visualizer().unwrap().is_none());
        // standard players have no HQ visualizer
        assert!(c.create_hq_visualizer().unwrap().is_none());

        c.execute(AppCommand::CreatePlayers).unwrap();
        let id = c.create_visualizer().unwrap().unwrap().handle_id();
        assert_eq!(c.create_visualizer().unwrap().unwrap().handle_id(), id);
    }

    // ------------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------------

    #[test]
    fn test_impl_type_switch_releases_everything() {
        let (platform, mut c, _notes) = controller();
        c.execute(AppCommand::CreatePlayers).unwrap();
        assert_eq!(platform.live_decoders(), 2);

        c.execute(AppCommand::SetPlayerImplType(PlayerImplType::Hybrid))
            .unwrap();
        assert_eq!(c.impl_type(), PlayerImplType::Hybrid);
        assert_eq!(platform.live_decoders(), 0);
        assert!(!c.engine().slot(SlotIndex::Zero).has_player());

        c.execute(AppCommand::CreatePlayers).unwrap();
        assert!(c.holds_effect(EffectType::PreAmp));
    }

    #[test]
    fn test_same_impl_type_is_noop_unless_forced() {
        let (platform, mut c, _notes) = controller();
        c.execute(AppCommand::CreatePlayers).unwrap();
        c.set_player_impl_type(PlayerImplType::Standard, false).unwrap();
        assert_eq!(platform.live_decoders(), 2);
        c.set_player_impl_type(PlayerImplType::Standard, true).unwrap();
        assert_eq!(platform.live_decoders(), 0);
    }

    #[test]
    fn test_volume_and_looping_reach_both_players() {
        let (platform, mut c, _notes) = controller();
        c.execute(AppCommand::CreatePlayers).unwrap();
        send(
            &mut c,
            player_event(player::SET_VOLUME_LEFT).with_float_arg2(0.5),
        );
        send(&mut c, player_event(player::SET_LOOPING).with_arg1(1));
        for slot in SlotIndex::BOTH {
            let id = c.engine().player_id(slot).unwrap();
            assert_eq!(platform.volume(id), (0.5, 1.0));
            // looping reaches the platform once the player is prepared
            assert!(c.engine().slot(slot).player().unwrap().is_looping());
            assert!(!platform.is_looping(id));
        }
        assert!(c.stores().player.looping);

        for (slot, uri) in [(0, "sim://a"), (1, "sim://b")] {
            send(
                &mut c,
                player_event(player::SONG_PICKED)
                    .with_arg1(slot)
                    .with_extra(events::extra::URI, uri),
            );
        }
        send(&mut c, player_event(player::SET_DATA_SOURCE));
        send(&mut c, player_event(player::PREPARE));
        c.run_until_idle().unwrap();
        for slot in SlotIndex::BOTH {
            let id = c.engine().player_id(slot).unwrap();
            assert!(platform.is_looping(id));
        }
    }

    #[test]
    fn test_player_failure_names_its_slot() {
        let (_platform, mut c, notes) = controller();
        c.execute(AppCommand::CreatePlayers).unwrap();
        notes.drain();

        // slot 1 has no data source, so only its prepare fails
        c.execute(AppCommand::SongPicked {
            slot: SlotIndex::Zero,
            uri: "sim://a".to_string(),
        })
        .unwrap();
        c.execute(AppCommand::SetDataSource).unwrap();
        c.execute(AppCommand::Prepare).unwrap();

        let notes = notes.drain();
        let errors = exceptions(&notes);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].arg1, 1);
        assert_eq!(errors[0].extra(events::extra::OPERATION), Some("prepare"));
    }

    #[test]
    fn test_foreground_follows_active_slot() {
        let (platform, mut c, _notes) = controller();
        for (slot, uri) in [(0, "sim://a"), (1, "sim://b")] {
            send(
                &mut c,
                player_event(player::SONG_PICKED)
                    .with_arg1(slot)
                    .with_extra(events::extra::URI, uri),
            );
        }
        send(&mut c, player_event(player::CREATE));
        send(&mut c, player_event(player::SET_DATA_SOURCE));
        send(&mut c, player_event(player::PREPARE));
        c.run_until_idle().unwrap();
        assert_eq!(c.foreground(), Foreground::Inactive);

        send(&mut c, player_event(player::START));
        assert_eq!(c.foreground(), Foreground::Player(SlotIndex::Zero));

        let id = c.engine().player_id(SlotIndex::Zero).unwrap();
        platform.complete_playback(id);
        c.run_until_idle().unwrap();
        assert_eq!(c.foreground(), Foreground::Player(SlotIndex::One));

        send(&mut c, player_event(player::PAUSE));
        assert_eq!(c.foreground(), Foreground::Inactive);
    }
}
