//! Gapless dual-player engine
//!
//! Two player slots alternate as the active player. When both slots are
//! prepared they are chained to each other, so a natural completion of the
//! active slot hands playback to the other slot without a gap.
//!
//! Player operations never propagate errors to the caller. A failing
//! operation is reported as an [`EngineOutput::OperationFailed`] and the
//! engine carries on; state changes and platform callbacks are reported the
//! same way. The owner drains the outputs with [`GaplessEngine::take_outputs`].
//!
//! # Example
//!
//! ```
//! use segue::engine::{GaplessEngine, PlaybackOptions, SlotIndex};
//! use segue::player::{
//!     CatalogMetadataSource, MediaPlatform, PlayerFactory, PlayerImplType, SimulatedPlatform,
//! };
//!
//! let platform = SimulatedPlatform::new();
//! let mut factory = platform.create_factory(PlayerImplType::Standard).unwrap();
//! let metadata = CatalogMetadataSource::with_fallback(60_000);
//!
//! let mut engine = GaplessEngine::new(PlaybackOptions::default());
//! engine.create(factory.as_mut());
//! engine.set_data_source(SlotIndex::Zero, "sim://a", &metadata);
//! engine.set_data_source(SlotIndex::One, "sim://b", &metadata);
//! engine.prepare(SlotIndex::Zero);
//! engine.prepare(SlotIndex::One);
//! engine.dispatch_backend_events(factory.poll_events());
//!
//! assert!(engine.session().next_player_prepared);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::engine::slot::{GaplessSession, PlaybackOptions, PlayerEvent, PlayerSlot, SlotIndex};
use crate::error::SegueError;
use crate::player::{
    BackendEvent, BasicPlayer, ChainHandoff, MetadataSource, NextPlayerRef, PlayerEventKind,
    PlayerFactory, PlayerId, PlayerState,
};

/// Something the owner of the engine should hear about.
#[derive(Debug)]
pub enum EngineOutput {
    StateChanged {
        slot: SlotIndex,
        state: PlayerState,
    },
    PlayerInfo {
        slot: SlotIndex,
        what: i32,
        extra: i32,
    },
    PlayerError {
        slot: SlotIndex,
        what: i32,
        extra: i32,
    },
    OperationFailed {
        slot: SlotIndex,
        operation: String,
        error: SegueError,
    },
}

type Inbox = Rc<RefCell<VecDeque<PlayerEvent>>>;

/// Dual-slot gapless playback engine.
#[derive(Debug)]
pub struct GaplessEngine {
    slots: [PlayerSlot; 2],
    session: GaplessSession,
    options: PlaybackOptions,
    inbox: Inbox,
    outputs: Vec<EngineOutput>,
}

impl GaplessEngine {
    pub fn new(options: PlaybackOptions) -> Self {
        Self {
            slots: [PlayerSlot::default(), PlayerSlot::default()],
            session: GaplessSession::default(),
            options,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            outputs: Vec::new(),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn session(&self) -> &GaplessSession {
        &self.session
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    pub fn active_index(&self) -> SlotIndex {
        self.session.active
    }

    pub fn slot(&self, index: SlotIndex) -> &PlayerSlot {
        &self.slots[index.index()]
    }

    pub fn active_slot(&self) -> &PlayerSlot {
        self.slot(self.session.active)
    }

    pub fn state(&self, index: SlotIndex) -> PlayerState {
        self.slot(index).state
    }

    pub fn player_id(&self, index: SlotIndex) -> Option<PlayerId> {
        self.slot(index).player.as_ref().map(BasicPlayer::id)
    }

    /// Drain everything reported since the last call.
    pub fn take_outputs(&mut self) -> Vec<EngineOutput> {
        std::mem::take(&mut self.outputs)
    }

    /// Duration of the active slot in milliseconds, 0 unless its player
    /// holds decoded media.
    pub fn active_duration(&self) -> i32 {
        let slot = self.active_slot();
        let readable = matches!(
            slot.state,
            PlayerState::Prepared
                | PlayerState::Started
                | PlayerState::Paused
                | PlayerState::PlaybackCompleted
                | PlayerState::Stopped
        );
        match (&slot.player, readable) {
            (Some(player), true) => player.duration().unwrap_or(0),
            _ => 0,
        }
    }

    /// Position of the active slot in milliseconds.
    pub fn active_position(&self) -> i32 {
        let slot = self.active_slot();
        let readable = matches!(
            slot.state,
            PlayerState::Started | PlayerState::Paused | PlayerState::PlaybackCompleted
        );
        match (&slot.player, readable) {
            (Some(player), true) => player.current_position().unwrap_or(0),
            _ => 0,
        }
    }

    /// Active position as a fraction of the active duration, in `[0, 1]`.
    pub fn normalized_position(&self) -> f32 {
        let duration = self.active_duration();
        if duration <= 0 {
            return 0.0;
        }
        (self.active_position() as f32 / duration as f32).clamp(0.0, 1.0)
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    fn set_state(&mut self, index: SlotIndex, state: PlayerState) {
        let slot = &mut self.slots[index.index()];
        if slot.state == state {
            return;
        }
        debug!("{}: {} -> {}", index, slot.state, state);
        slot.state = state;
        self.outputs.push(EngineOutput::StateChanged { slot: index, state });
    }

    fn fail(&mut self, index: SlotIndex, operation: impl Into<String>, error: SegueError) {
        let operation = operation.into();
        warn!("{}: {} failed: {}", index, operation, error);
        self.outputs.push(EngineOutput::OperationFailed {
            slot: index,
            operation,
            error,
        });
    }

    /// Run `f` against the slot's player, reporting a failure under `operation`.
    /// Returns `false` when there is no player or the call failed.
    fn with_player(
        &mut self,
        index: SlotIndex,
        operation: &str,
        f: impl FnOnce(&mut BasicPlayer) -> crate::error::Result<()>,
    ) -> bool {
        let result = match self.slots[index.index()].player.as_mut() {
            Some(player) => f(player),
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.fail(index, operation, e);
                false
            }
        }
    }

    // ========================================================================
    // Creation and teardown
    // ========================================================================

    /// Release whatever the slots hold and create a fresh pair of players.
    ///
    /// With a factory whose players share an audio session, slot 1 joins the
    /// session of slot 0 so player-bound effects cover both slots.
    pub fn create(&mut self, factory: &mut dyn PlayerFactory) {
        self.release();

        for index in SlotIndex::BOTH {
            match factory.create_player() {
                Ok(mut player) => {
                    let slot = &mut self.slots[index.index()];
                    slot.bump_generation();
                    register_listeners(&self.inbox, index, slot.generation, &mut player);
                    info!("{}: created {}", index, player.id());
                    slot.player = Some(player);
                }
                Err(e) => self.fail(index, "create", e),
            }
        }

        if factory.impl_type().shares_audio_session() {
            let session_id = self.slots[0]
                .player
                .as_ref()
                .and_then(|p| p.audio_session_id().ok());
            if let Some(session_id) = session_id {
                self.with_player(SlotIndex::One, "setAudioSessionId", |p| {
                    p.set_audio_session_id(session_id)
                });
            }
        }

        for index in SlotIndex::BOTH {
            if self.slots[index.index()].player.is_some() {
                self.apply_output_options(index);
                self.set_state(index, PlayerState::Idle);
            }
        }
    }

    /// Set the data source of one slot.
    ///
    /// Metadata is fetched first; a slot only becomes Initialized once both
    /// the metadata and the platform accepted the locator.
    pub fn set_data_source(&mut self, index: SlotIndex, uri: &str, source: &dyn MetadataSource) {
        if self.slots[index.index()].player.is_none() {
            debug!("{}: no player, data source ignored", index);
            return;
        }

        let metadata = match source.fetch(uri) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.fail(index, "setDataSource", e);
                return;
            }
        };

        if self.with_player(index, "setDataSource", |p| p.set_data_source(uri)) {
            let slot = &mut self.slots[index.index()];
            slot.media_uri = Some(uri.to_string());
            slot.metadata = Some(metadata);
            self.set_state(index, PlayerState::Initialized);
        }
    }

    pub fn prepare(&mut self, index: SlotIndex) {
        if self.with_player(index, "prepare", BasicPlayer::prepare) {
            self.set_state(index, PlayerState::Prepared);
        }
    }

    pub fn prepare_async(&mut self, index: SlotIndex) {
        if self.with_player(index, "prepareAsync", BasicPlayer::prepare_async) {
            self.set_state(index, PlayerState::Preparing);
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start the active slot, first honouring a swap left pending by a
    /// completion that happened while the active slot was not playing.
    pub fn start(&mut self) {
        if self.session.swap_pending {
            self.session.swap_pending = false;
            if !self.options.looping {
                self.swap_active(self.session.active);
            }
        }
        self.start_slot(self.session.active);
    }

    fn start_slot(&mut self, index: SlotIndex) {
        if self.state(index) == PlayerState::Error {
            debug!("{}: start skipped in error state", index);
            return;
        }
        if self.with_player(index, "start", BasicPlayer::start) {
            self.set_state(index, PlayerState::Started);
        }
    }

    pub fn pause(&mut self) {
        let index = self.session.active;
        if self.state(index) == PlayerState::Error {
            debug!("{}: pause skipped in error state", index);
            return;
        }
        if self.with_player(index, "pause", BasicPlayer::pause) {
            self.set_state(index, PlayerState::Paused);
        }
    }

    /// Stop both slots and reset the gapless variables.
    pub fn stop(&mut self) {
        for index in SlotIndex::BOTH {
            if self.state(index) == PlayerState::Error {
                continue;
            }
            if self.with_player(index, "stop", BasicPlayer::stop) {
                self.set_state(index, PlayerState::Stopped);
            }
        }
        self.session.reset();
    }

    /// Reset both slots to Idle, dropping their media.
    pub fn reset(&mut self) {
        for index in SlotIndex::BOTH {
            self.reset_slot(index);
        }
        self.session.reset();
    }

    fn reset_slot(&mut self, index: SlotIndex) {
        if !self.with_player(index, "reset", BasicPlayer::reset) {
            return;
        }
        let slot = &mut self.slots[index.index()];
        slot.media_uri = None;
        slot.metadata = None;
        slot.chained_next = None;
        slot.bump_generation();
        if let Some(player) = slot.player.as_mut() {
            register_listeners(&self.inbox, index, slot.generation, player);
        }
        self.set_state(index, PlayerState::Idle);
    }

    /// Release both slots. A failing platform release is reported but the
    /// slot still ends up released.
    pub fn release(&mut self) {
        for index in SlotIndex::BOTH {
            self.release_slot(index);
        }
        self.session.reset();
    }

    fn release_slot(&mut self, index: SlotIndex) {
        let slot = &mut self.slots[index.index()];
        let Some(mut player) = slot.player.take() else {
            return;
        };
        slot.media_uri = None;
        slot.metadata = None;
        slot.chained_next = None;
        slot.bump_generation();

        let id = player.id();
        if let Err(e) = player.release() {
            self.fail(index, "release", e);
        }
        info!("{}: released {}", index, id);
        self.set_state(index, PlayerState::End);
    }

    /// Seek the active slot to a fraction of its duration.
    pub fn seek_to(&mut self, normalized: f32) {
        let index = self.session.active;
        let msec = (normalized * self.active_duration() as f32) as i32;
        let operation = format!("seekTo(msec = {})", msec);
        if self.with_player(index, &operation, |p| p.seek_to(msec)) {
            self.session.swap_pending = false;
        }
    }

    // ========================================================================
    // Output parameters
    // ========================================================================

    pub fn set_volume(&mut self, left: f32, right: f32) {
        self.options.volume_left = left;
        self.options.volume_right = right;
        for index in SlotIndex::BOTH {
            self.with_player(index, "setVolume", |p| p.set_volume(left, right));
        }
    }

    pub fn set_volume_left(&mut self, left: f32) {
        self.set_volume(left, self.options.volume_right);
    }

    pub fn set_volume_right(&mut self, right: f32) {
        self.set_volume(self.options.volume_left, right);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.options.looping = looping;
        for index in SlotIndex::BOTH {
            self.with_player(index, "setLooping", |p| p.set_looping(looping));
        }
    }

    pub fn set_aux_send_level(&mut self, level: f32) {
        self.options.aux_send_level = level;
        for index in SlotIndex::BOTH {
            self.with_player(index, "setAuxEffectSendLevel", |p| {
                p.set_aux_effect_send_level(level)
            });
        }
    }

    /// Attach an auxiliary effect (0 detaches) to every slot holding
    /// prepared media. Other slots pick it up when they become prepared.
    pub fn attach_aux_effect(&mut self, effect_id: i32) {
        self.options.aux_effect_id = effect_id;
        for index in SlotIndex::BOTH {
            if holds_media(self.state(index)) {
                self.with_player(index, "attachAuxEffect", |p| p.attach_aux_effect(effect_id));
            }
        }
    }

    /// Change the effect id attached to slots as they become prepared,
    /// leaving slots that already hold media untouched.
    pub fn set_aux_effect_on_prepare(&mut self, effect_id: i32) {
        self.options.aux_effect_id = effect_id;
    }

    fn apply_output_options(&mut self, index: SlotIndex) {
        let options = self.options;
        self.with_player(index, "setLooping", |p| p.set_looping(options.looping));
        self.with_player(index, "setVolume", |p| {
            p.set_volume(options.volume_left, options.volume_right)
        });
        self.with_player(index, "setAuxEffectSendLevel", |p| {
            p.set_aux_effect_send_level(options.aux_send_level)
        });
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    fn slot_of(&self, id: PlayerId) -> Option<SlotIndex> {
        SlotIndex::BOTH
            .into_iter()
            .find(|index| self.player_id(*index) == Some(id))
    }

    /// Route platform callbacks to their players and react to whatever the
    /// players' listeners reported.
    pub fn dispatch_backend_events(&mut self, events: Vec<BackendEvent>) {
        for event in events {
            let Some(index) = self.slot_of(event.player) else {
                debug!("dropping {} for unowned {}", event.kind.name(), event.player);
                continue;
            };

            let handoff = self.slots[index.index()]
                .player
                .as_mut()
                .and_then(|p| p.deliver(event));
            if let Some(handoff) = handoff {
                self.honour_handoff(index, handoff);
            }
            self.process_inbox();
        }
    }

    fn honour_handoff(&mut self, from: SlotIndex, handoff: ChainHandoff) {
        let Some(to) = self.slot_of(handoff.next) else {
            warn!("{}: chained {} is no longer owned", from, handoff.next);
            return;
        };
        debug!(
            "{}: handing playback to {} ({})",
            from,
            to,
            if handoff.native { "native" } else { "emulated" }
        );
        if handoff.native {
            self.with_player(to, "start", BasicPlayer::mark_started_by_chain);
        } else {
            self.with_player(to, "start", BasicPlayer::start);
        }
    }

    fn process_inbox(&mut self) {
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            match next {
                Some(event) => self.on_player_event(event),
                None => break,
            }
        }
    }

    fn on_player_event(&mut self, event: PlayerEvent) {
        let slot = &self.slots[event.slot.index()];
        if slot.player.is_none() || slot.generation != event.generation {
            debug!(
                "{}: dropping stale {} (generation {} != {})",
                event.slot,
                event.kind.name(),
                event.generation,
                slot.generation
            );
            return;
        }

        match event.kind {
            PlayerEventKind::Prepared => self.on_prepared(event.slot),
            PlayerEventKind::Completion => self.on_completion(event.slot),
            PlayerEventKind::Error { what, extra } => {
                self.outputs.push(EngineOutput::PlayerError {
                    slot: event.slot,
                    what,
                    extra,
                });
                self.set_state(event.slot, PlayerState::Error);
                self.disarm_handover(event.slot);
            }
            PlayerEventKind::Info { what, extra } => {
                self.outputs.push(EngineOutput::PlayerInfo {
                    slot: event.slot,
                    what,
                    extra,
                });
            }
            PlayerEventKind::SeekComplete | PlayerEventKind::BufferingUpdate { .. } => {
                debug!("{}: {}", event.slot, event.kind.name());
            }
        }
    }

    fn on_prepared(&mut self, index: SlotIndex) {
        self.set_state(index, PlayerState::Prepared);
        self.apply_output_options(index);
        let effect_id = self.options.aux_effect_id;
        self.with_player(index, "attachAuxEffect", |p| p.attach_aux_effect(effect_id));

        let both_prepared = SlotIndex::BOTH
            .into_iter()
            .all(|i| self.state(i) == PlayerState::Prepared);
        if both_prepared {
            self.cross_chain();
        }
    }

    /// Chain both slots to each other.
    fn cross_chain(&mut self) {
        let refs = SlotIndex::BOTH.map(|index| {
            self.slots[index.index()].player.as_ref().map(|p| NextPlayerRef {
                id: p.id(),
                state: p.state(),
            })
        });

        let mut chained = true;
        for index in SlotIndex::BOTH {
            let other = index.other();
            let next = refs[other.index()];
            if self.with_player(index, "setNextMediaPlayer", |p| p.set_next_player(next)) {
                self.slots[index.index()].chained_next = Some(other);
            } else {
                chained = false;
            }
        }

        if chained && !self.session.next_player_prepared {
            info!("both slots prepared, gapless hand-over armed");
        }
        self.session.next_player_prepared = chained;
    }

    fn on_completion(&mut self, index: SlotIndex) {
        let was = self.state(index);
        if was != PlayerState::Error {
            self.set_state(index, PlayerState::PlaybackCompleted);
        }

        if was == PlayerState::Started {
            if self.swap_active(index) {
                let active = self.session.active;
                self.set_state(active, PlayerState::Started);
            }
        } else {
            self.session.swap_pending = true;
        }
    }

    /// Drop the chain between the slots once `errored` can no longer play,
    /// so the other slot never hands playback over to it.
    fn disarm_handover(&mut self, errored: SlotIndex) {
        if self.session.next_player_prepared {
            warn!("{}: error, gapless hand-over disarmed", errored);
        }
        self.session.next_player_prepared = false;
        self.slots[errored.index()].chained_next = None;

        let survivor = errored.other();
        let chained = self.slots[survivor.index()].chained_next.take().is_some();
        if chained && !self.state(survivor).rejects_next_player() {
            self.with_player(survivor, "setNextMediaPlayer", |p| p.set_next_player(None));
        }
    }

    /// Make the other slot active if it is chained, prepared and not in
    /// Error.
    fn swap_active(&mut self, from: SlotIndex) -> bool {
        let to = from.other();
        if !self.session.next_player_prepared || self.state(to) == PlayerState::Error {
            return false;
        }
        self.session.active = to;
        info!("active slot {} -> {}", from, to);
        true
    }
}

fn holds_media(state: PlayerState) -> bool {
    matches!(
        state,
        PlayerState::Prepared
            | PlayerState::Started
            | PlayerState::Paused
            | PlayerState::PlaybackCompleted
    )
}

/// Route every callback of `player` into the engine inbox, stamped with
/// `generation`.
fn register_listeners(inbox: &Inbox, slot: SlotIndex, generation: u32, player: &mut BasicPlayer) {
    let post = {
        let inbox = Rc::clone(inbox);
        Rc::new(move |kind: PlayerEventKind| {
            inbox.borrow_mut().push_back(PlayerEvent {
                slot,
                generation,
                kind,
            });
        })
    };

    let p = Rc::clone(&post);
    player.set_on_prepared(move || p(PlayerEventKind::Prepared));
    let p = Rc::clone(&post);
    player.set_on_completion(move || p(PlayerEventKind::Completion));
    let p = Rc::clone(&post);
    player.set_on_error(move |what, extra| p(PlayerEventKind::Error { what, extra }));
    let p = Rc::clone(&post);
    player.set_on_info(move |what, extra| p(PlayerEventKind::Info { what, extra }));
    let p = Rc::clone(&post);
    player.set_on_seek_complete(move || p(PlayerEventKind::SeekComplete));
    player.set_on_buffering_update(move |percent| post(PlayerEventKind::BufferingUpdate { percent }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{CatalogMetadataSource, MediaPlatform, PlayerImplType, SimulatedPlatform};

    struct Rig {
        platform: SimulatedPlatform,
        factory: Box<dyn PlayerFactory>,
        metadata: CatalogMetadataSource,
        engine: GaplessEngine,
    }

    impl Rig {
        fn new(platform: SimulatedPlatform) -> Self {
            platform.set_default_duration(10_000);
            let factory = platform.create_factory(PlayerImplType::Standard).unwrap();
            let mut rig = Self {
                platform,
                factory,
                metadata: CatalogMetadataSource::with_fallback(10_000),
                engine: GaplessEngine::new(PlaybackOptions::default()),
            };
            rig.engine.create(rig.factory.as_mut());
            rig
        }

        fn pump(&mut self) {
            let events = self.factory.poll_events();
            self.engine.dispatch_backend_events(events);
        }

        fn load(&mut self, index: SlotIndex, uri: &str) {
            self.engine.set_data_source(index, uri, &self.metadata);
        }

        fn prepared_pair(mut self) -> Self {
            self.load(SlotIndex::Zero, "sim://a");
            self.load(SlotIndex::One, "sim://b");
            self.engine.prepare(SlotIndex::Zero);
            self.engine.prepare(SlotIndex::One);
            self.pump();
            self
        }

        fn id(&self, index: SlotIndex) -> PlayerId {
            self.engine.player_id(index).unwrap()
        }
    }

    fn failures(outputs: &[EngineOutput]) -> Vec<String> {
        outputs
            .iter()
            .filter_map(|o| match o {
                EngineOutput::OperationFailed { operation, .. } => Some(operation.clone()),
                _ => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    #[test]
    fn test_create_yields_two_idle_slots() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Idle);
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Idle);
        assert_eq!(rig.platform.live_decoders(), 2);

        let outputs = rig.engine.take_outputs();
        assert!(failures(&outputs).is_empty());
    }

    #[test]
    fn test_standard_players_share_session() {
        let rig = Rig::new(SimulatedPlatform::new());
        let s0 = rig.platform.session_id(rig.id(SlotIndex::Zero));
        let s1 = rig.platform.session_id(rig.id(SlotIndex::One));
        assert_eq!(s0, s1);
    }

    #[test]
    fn test_recreate_releases_previous_players() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        let old = rig.id(SlotIndex::Zero);
        rig.engine.create(rig.factory.as_mut());
        assert!(rig.platform.is_released(old));
        assert_eq!(rig.platform.live_decoders(), 2);
    }

    // ------------------------------------------------------------------------
    // Preparation and chaining
    // ------------------------------------------------------------------------

    #[test]
    fn test_both_prepared_arms_handover() {
        let rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        assert!(rig.engine.session().next_player_prepared);
        assert_eq!(
            rig.engine.slot(SlotIndex::Zero).chained_next(),
            Some(SlotIndex::One)
        );
        assert_eq!(
            rig.platform.native_next(rig.id(SlotIndex::One)),
            Some(rig.id(SlotIndex::Zero))
        );
    }

    #[test]
    fn test_single_prepared_does_not_arm() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        rig.load(SlotIndex::Zero, "sim://a");
        rig.engine.prepare_async(SlotIndex::Zero);
        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Preparing);
        rig.pump();
        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Prepared);
        assert!(!rig.engine.session().next_player_prepared);
    }

    #[test]
    fn test_metadata_failure_leaves_slot_idle() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        rig.metadata = CatalogMetadataSource::new();
        rig.engine.take_outputs();
        rig.load(SlotIndex::Zero, "sim://missing");

        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Idle);
        assert!(rig.engine.slot(SlotIndex::Zero).metadata().is_none());
        assert_eq!(failures(&rig.engine.take_outputs()), vec!["setDataSource"]);
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    #[test]
    fn test_native_handover_on_completion() {
        let mut rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        rig.engine.start();
        rig.platform.complete_playback(rig.id(SlotIndex::Zero));
        rig.pump();

        assert_eq!(rig.engine.active_index(), SlotIndex::One);
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Started);
        assert_eq!(
            rig.engine.state(SlotIndex::Zero),
            PlayerState::PlaybackCompleted
        );
        assert!(rig.platform.is_playing(rig.id(SlotIndex::One)));
    }

    #[test]
    fn test_emulated_handover_on_completion() {
        let platform = SimulatedPlatform::new().with_native_chaining(false);
        let mut rig = Rig::new(platform).prepared_pair();
        rig.engine.start();
        rig.platform.complete_playback(rig.id(SlotIndex::Zero));
        rig.pump();

        assert_eq!(rig.engine.active_index(), SlotIndex::One);
        assert!(rig.platform.is_playing(rig.id(SlotIndex::One)));
    }

    #[test]
    fn test_completion_while_paused_defers_swap() {
        let mut rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        rig.engine.start();
        rig.engine.pause();
        let id = rig.id(SlotIndex::Zero);
        rig.platform.inject(id, PlayerEventKind::Completion);
        rig.pump();

        assert!(rig.engine.session().swap_pending);
        assert_eq!(rig.engine.active_index(), SlotIndex::Zero);

        rig.engine.start();
        assert!(!rig.engine.session().swap_pending);
        assert_eq!(rig.engine.active_index(), SlotIndex::One);
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Started);
    }

    #[test]
    fn test_seek_clears_pending_swap() {
        let mut rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        rig.engine.start();
        rig.engine.pause();
        rig.platform.inject(rig.id(SlotIndex::Zero), PlayerEventKind::Completion);
        rig.pump();
        assert!(rig.engine.session().swap_pending);

        rig.engine.seek_to(0.5);
        assert!(!rig.engine.session().swap_pending);
        assert_eq!(rig.platform.position(rig.id(SlotIndex::Zero)), 5_000);
    }

    #[test]
    fn test_stop_resets_session() {
        let mut rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        rig.engine.start();
        rig.engine.stop();
        assert_eq!(*rig.engine.session(), GaplessSession::default());
        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Stopped);
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Stopped);
    }

    #[test]
    fn test_reset_drops_stale_callbacks() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        rig.load(SlotIndex::Zero, "sim://a");
        rig.engine.prepare_async(SlotIndex::Zero);
        rig.engine.reset();
        rig.pump();

        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Idle);
        assert!(rig.engine.slot(SlotIndex::Zero).media_uri().is_none());
    }

    #[test]
    fn test_release_reports_failure_but_ends() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        rig.platform.fail_next("release");
        rig.engine.take_outputs();
        rig.engine.release();

        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::End);
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::End);
        assert!(!rig.engine.slot(SlotIndex::Zero).has_player());
        assert_eq!(failures(&rig.engine.take_outputs()), vec!["release"]);
    }

    #[test]
    fn test_error_callback_moves_slot_to_error() {
        let mut rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        rig.engine.start();
        rig.engine.take_outputs();
        rig.platform.report_error(rig.id(SlotIndex::Zero), 1, -1004);
        rig.pump();

        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Error);
        let outputs = rig.engine.take_outputs();
        assert!(matches!(
            outputs[0],
            EngineOutput::PlayerError {
                slot: SlotIndex::Zero,
                what: 1,
                extra: -1004
            }
        ));

        // start is skipped in error state
        rig.engine.start();
        assert_eq!(rig.engine.state(SlotIndex::Zero), PlayerState::Error);
    }

    #[test]
    fn test_error_on_next_slot_disarms_handover() {
        let mut rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        rig.engine.start();
        rig.platform.report_error(rig.id(SlotIndex::One), 1, -1004);
        rig.pump();

        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Error);
        assert!(!rig.engine.session().next_player_prepared);
        assert_eq!(rig.engine.slot(SlotIndex::Zero).chained_next(), None);
        assert_eq!(rig.platform.native_next(rig.id(SlotIndex::Zero)), None);

        rig.platform.complete_playback(rig.id(SlotIndex::Zero));
        rig.pump();

        assert_eq!(rig.engine.active_index(), SlotIndex::Zero);
        assert_eq!(
            rig.engine.state(SlotIndex::Zero),
            PlayerState::PlaybackCompleted
        );
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Error);
        assert!(!rig.platform.is_playing(rig.id(SlotIndex::One)));
        assert!(failures(&rig.engine.take_outputs()).is_empty());
    }

    #[test]
    fn test_error_on_next_slot_without_native_chaining() {
        let platform = SimulatedPlatform::new().with_native_chaining(false);
        let mut rig = Rig::new(platform).prepared_pair();
        rig.engine.start();
        rig.platform.report_error(rig.id(SlotIndex::One), 1, -1004);
        rig.pump();
        rig.platform.complete_playback(rig.id(SlotIndex::Zero));
        rig.pump();

        assert_eq!(rig.engine.active_index(), SlotIndex::Zero);
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Error);
        assert!(!rig.platform.is_playing(rig.id(SlotIndex::One)));
    }

    #[test]
    fn test_pending_swap_never_targets_error_slot() {
        let mut rig = Rig::new(SimulatedPlatform::new()).prepared_pair();
        rig.engine.start();
        rig.engine.pause();
        rig.platform.inject(rig.id(SlotIndex::Zero), PlayerEventKind::Completion);
        rig.pump();
        assert!(rig.engine.session().swap_pending);

        rig.platform.report_error(rig.id(SlotIndex::One), 1, -1004);
        rig.pump();
        rig.engine.start();

        assert_eq!(rig.engine.active_index(), SlotIndex::Zero);
        assert_eq!(rig.engine.state(SlotIndex::One), PlayerState::Error);
    }

    // ------------------------------------------------------------------------
    // Output parameters
    // ------------------------------------------------------------------------

    #[test]
    fn test_aux_effect_attached_on_prepare() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        rig.engine.attach_aux_effect(42);
        assert_eq!(rig.platform.aux_effect(rig.id(SlotIndex::Zero)), 0);

        let rig = rig.prepared_pair();
        assert_eq!(rig.platform.aux_effect(rig.id(SlotIndex::Zero)), 42);
        assert_eq!(rig.platform.aux_effect(rig.id(SlotIndex::One)), 42);
    }

    #[test]
    fn test_volume_applies_to_both_slots() {
        let mut rig = Rig::new(SimulatedPlatform::new());
        rig.engine.set_volume_left(0.25);
        assert_eq!(rig.platform.volume(rig.id(SlotIndex::Zero)), (0.25, 1.0));
        assert_eq!(rig.platform.volume(rig.id(SlotIndex::One)), (0.25, 1.0));
    }
}
