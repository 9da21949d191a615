//! Uniform player over a platform backend
//!
//! [`BasicPlayer`] enforces the lifecycle guards, hides platform defects
//! (stale duration/position before prepare, invalid aux send levels) and
//! provides the next-player hookup used for gapless transitions.

use log::{debug, warn};

use crate::error::{Result, SegueError};
use crate::player::backend::{BackendEvent, MediaBackend, PlayerId};
use crate::player::events::{Listeners, PlayerEventKind};
use crate::player::state::PlayerState;

/// Aux send level substituted for NaN or negative input.
pub const AUX_SEND_LEVEL_DISABLED: f32 = f32::INFINITY;

/// Snapshot of a would-be next player, taken by the owner of both players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPlayerRef {
    pub id: PlayerId,
    pub state: PlayerState,
}

/// Returned from [`BasicPlayer::deliver`] when a completion hands playback to
/// the chained next player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHandoff {
    pub next: PlayerId,
    /// The platform already started `next`; otherwise the owner must start it.
    pub native: bool,
}

/// Player abstraction over one [`MediaBackend`].
pub struct BasicPlayer {
    backend: Box<dyn MediaBackend>,
    state: PlayerState,
    looping: bool,
    prepared_once: bool,
    next: Option<PlayerId>,
    listeners: Listeners,
}

impl BasicPlayer {
    pub fn new(backend: Box<dyn MediaBackend>) -> Self {
        Self {
            backend,
            state: PlayerState::Idle,
            looping: false,
            prepared_once: false,
            next: None,
            listeners: Listeners::default(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.backend.id()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// The chained next player, if any.
    pub fn next_player(&self) -> Option<PlayerId> {
        self.next
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn ensure_alive(&self, operation: &str) -> Result<()> {
        if self.state == PlayerState::End {
            return Err(SegueError::illegal_state(operation, self.state));
        }
        Ok(())
    }

    fn ensure(&self, operation: &str, allowed: bool) -> Result<()> {
        self.ensure_alive(operation)?;
        if !allowed {
            return Err(SegueError::illegal_state(operation, self.state));
        }
        Ok(())
    }

    fn transition(&mut self, to: PlayerState) {
        if self.state != to {
            debug!("{}: {} -> {}", self.id(), self.state, to);
            self.state = to;
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn set_data_source(&mut self, uri: &str) -> Result<()> {
        self.ensure("set_data_source", self.state == PlayerState::Idle)?;
        self.backend.set_data_source(uri)?;
        self.transition(PlayerState::Initialized);
        Ok(())
    }

    /// Synchronous prepare.
    pub fn prepare(&mut self) -> Result<()> {
        self.ensure("prepare", self.state.can_prepare())?;
        self.backend.set_looping(self.looping)?;
        self.backend.prepare()?;
        self.prepared_once = true;
        self.transition(PlayerState::Prepared);
        Ok(())
    }

    /// Non-blocking prepare; the prepared callback finishes the transition.
    pub fn prepare_async(&mut self) -> Result<()> {
        self.ensure("prepare_async", self.state.can_prepare())?;
        self.backend.set_looping(self.looping)?;
        self.backend.prepare_async()?;
        self.transition(PlayerState::Preparing);
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure("start", self.state.can_start())?;
        self.backend.start()?;
        self.transition(PlayerState::Started);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure("pause", self.state.can_pause())?;
        self.backend.pause()?;
        self.transition(PlayerState::Paused);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.ensure("stop", self.state.can_stop())?;
        self.backend.stop()?;
        self.transition(PlayerState::Stopped);
        Ok(())
    }

    /// Back to Idle from any live state. Chaining is dropped.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_alive("reset")?;
        self.backend.reset()?;
        self.next = None;
        self.prepared_once = false;
        self.transition(PlayerState::Idle);
        Ok(())
    }

    /// Terminal release. Every listener is dropped.
    ///
    /// Releasing twice is a no-op; a failing platform release of a player
    /// already in Error is logged and otherwise ignored.
    pub fn release(&mut self) -> Result<()> {
        if self.state == PlayerState::End {
            return Ok(());
        }

        self.listeners.clear();
        self.next = None;
        let was = self.state;
        let result = self.backend.release();
        self.transition(PlayerState::End);

        match result {
            Err(e) if was == PlayerState::Error => {
                warn!("{}: ignoring release failure after error: {}", self.id(), e);
                Ok(())
            }
            other => other,
        }
    }

    /// Marks a player the platform already started through native chaining.
    pub fn mark_started_by_chain(&mut self) -> Result<()> {
        self.ensure("start", self.state.can_start())?;
        self.transition(PlayerState::Started);
        Ok(())
    }

    // ========================================================================
    // Position
    // ========================================================================

    /// Seek in milliseconds. Quietly ignored before the player is prepared.
    pub fn seek_to(&mut self, msec: i32) -> Result<()> {
        self.ensure_alive("seek_to")?;
        if !self.state.is_prepared() {
            debug!("{}: seek ignored while {}", self.id(), self.state);
            return Ok(());
        }
        self.backend.seek_to(msec.max(0))
    }

    /// Duration in milliseconds; 0 until the first prepare completes.
    pub fn duration(&self) -> Result<i32> {
        self.ensure_alive("duration")?;
        if !self.prepared_once {
            return Ok(0);
        }
        Ok(self.backend.duration().max(0))
    }

    /// Position in milliseconds, never beyond the duration; 0 until the
    /// first prepare completes.
    pub fn current_position(&self) -> Result<i32> {
        let duration = self.duration()?;
        if !self.prepared_once {
            return Ok(0);
        }
        Ok(self.backend.current_position().clamp(0, duration))
    }

    // ========================================================================
    // Output parameters
    // ========================================================================

    /// Channel volumes, clamped to `[0, 1]`; NaN becomes 0.
    pub fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        self.ensure_alive("set_volume")?;
        self.backend
            .set_volume(sanitize_volume(left), sanitize_volume(right))
    }

    /// Stored immediately and pushed to the platform on every prepare.
    pub fn set_looping(&mut self, looping: bool) -> Result<()> {
        self.ensure_alive("set_looping")?;
        self.looping = looping;
        if self.state.is_prepared() || self.state == PlayerState::Preparing {
            self.backend.set_looping(looping)?;
        }
        Ok(())
    }

    /// Attach an auxiliary effect by id; 0 detaches.
    pub fn attach_aux_effect(&mut self, effect_id: i32) -> Result<()> {
        self.ensure_alive("attach_aux_effect")?;
        self.backend.attach_aux_effect(effect_id)
    }

    /// NaN and negative levels become [`AUX_SEND_LEVEL_DISABLED`]; other
    /// values are clamped to `[0, 1]`.
    pub fn set_aux_effect_send_level(&mut self, level: f32) -> Result<()> {
        self.ensure_alive("set_aux_effect_send_level")?;
        self.backend
            .set_aux_effect_send_level(sanitize_aux_send_level(level))
    }

    pub fn audio_session_id(&self) -> Result<i32> {
        self.ensure_alive("audio_session_id")?;
        Ok(self.backend.audio_session_id())
    }

    /// Only accepted while Idle.
    pub fn set_audio_session_id(&mut self, session_id: i32) -> Result<()> {
        self.ensure(
            "set_audio_session_id",
            self.state == PlayerState::Idle,
        )?;
        self.backend.set_audio_session_id(session_id)
    }

    // ========================================================================
    // Chaining
    // ========================================================================

    /// Chain `next` to start when this player completes; `None` unchains.
    pub fn set_next_player(&mut self, next: Option<NextPlayerRef>) -> Result<()> {
        self.ensure("set_next_player", !self.state.rejects_next_player())?;

        if let Some(next) = next {
            if next.id == self.id() {
                return Err(SegueError::invalid_argument(
                    "next",
                    "a player cannot be its own next player",
                ));
            }
            if !next.state.can_be_chained() {
                return Err(SegueError::illegal_state(
                    "chain next player",
                    next.state,
                ));
            }
        }

        let id = next.map(|n| n.id);
        if self.backend.supports_native_chaining() {
            self.backend.set_next(id)?;
        }
        self.next = id;
        Ok(())
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    pub fn set_on_prepared(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.on_prepared = Some(Box::new(listener));
    }

    pub fn set_on_completion(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.on_completion = Some(Box::new(listener));
    }

    pub fn set_on_error(&mut self, listener: impl FnMut(i32, i32) + 'static) {
        self.listeners.on_error = Some(Box::new(listener));
    }

    pub fn set_on_info(&mut self, listener: impl FnMut(i32, i32) + 'static) {
        self.listeners.on_info = Some(Box::new(listener));
    }

    pub fn set_on_seek_complete(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.on_seek_complete = Some(Box::new(listener));
    }

    pub fn set_on_buffering_update(&mut self, listener: impl FnMut(i32) + 'static) {
        self.listeners.on_buffering_update = Some(Box::new(listener));
    }

    /// Deliver a platform callback on the controller thread.
    ///
    /// Applies the state change, fires the matching listener once, and on a
    /// natural completion of a playing, non-looping chained player returns the
    /// handoff the owner must honour.
    pub fn deliver(&mut self, event: BackendEvent) -> Option<ChainHandoff> {
        if self.state == PlayerState::End {
            debug!("{}: dropping {} after release", self.id(), event.kind.name());
            return None;
        }
        if event.epoch != self.backend.epoch() {
            debug!(
                "{}: dropping stale {} (epoch {} != {})",
                self.id(),
                event.kind.name(),
                event.epoch,
                self.backend.epoch()
            );
            return None;
        }

        let mut handoff = None;
        match event.kind {
            PlayerEventKind::Prepared => match self.state {
                PlayerState::Preparing | PlayerState::Prepared => {
                    self.prepared_once = true;
                    self.transition(PlayerState::Prepared);
                }
                other => {
                    debug!("{}: prepared callback ignored while {}", self.id(), other);
                    return None;
                }
            },
            PlayerEventKind::Completion => {
                if self.state != PlayerState::Error && !self.looping {
                    let was_playing = self.state == PlayerState::Started;
                    self.transition(PlayerState::PlaybackCompleted);
                    if was_playing {
                        handoff = self.next.map(|next| ChainHandoff {
                            next,
                            native: self.backend.supports_native_chaining(),
                        });
                    }
                }
            }
            PlayerEventKind::Error { what, extra } => {
                warn!("{}: platform error what={} extra={}", self.id(), what, extra);
                self.transition(PlayerState::Error);
            }
            PlayerEventKind::Info { .. }
            | PlayerEventKind::SeekComplete
            | PlayerEventKind::BufferingUpdate { .. } => {}
        }

        self.listeners.fire(&event.kind);
        handoff
    }
}

impl std::fmt::Debug for BasicPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicPlayer")
            .field("id", &self.id())
            .field("state", &self.state)
            .field("looping", &self.looping)
            .field("next", &self.next)
            .finish()
    }
}

fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

fn sanitize_aux_send_level(level: f32) -> f32 {
    if level.is_nan() || level < 0.0 {
        AUX_SEND_LEVEL_DISABLED
    } else {
        level.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::sim::SimulatedPlatform;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn player(platform: &SimulatedPlatform) -> BasicPlayer {
        BasicPlayer::new(Box::new(platform.create_backend()))
    }

    fn prepared_player(platform: &SimulatedPlatform) -> BasicPlayer {
        let mut p = player(platform);
        p.set_data_source("sim://track-a").unwrap();
        p.prepare().unwrap();
        p
    }

    // ------------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------------

    #[test]
    fn test_start_requires_prepared() {
        let platform = SimulatedPlatform::new();
        let mut p = player(&platform);

        let err = p.start().unwrap_err();
        assert_eq!(err.error_code(), "ILLEGAL_STATE");
        assert_eq!(p.state(), PlayerState::Idle);
    }

    #[test]
    fn test_full_lifecycle() {
        let platform = SimulatedPlatform::new();
        let mut p = prepared_player(&platform);

        p.start().unwrap();
        assert_eq!(p.state(), PlayerState::Started);
        p.pause().unwrap();
        p.pause().unwrap();
        assert_eq!(p.state(), PlayerState::Paused);
        p.stop().unwrap();
        assert_eq!(p.state(), PlayerState::Stopped);
        assert!(p.start().is_err());
        p.prepare().unwrap();
        p.start().unwrap();
        p.reset().unwrap();
        assert_eq!(p.state(), PlayerState::Idle);
        p.release().unwrap();
        assert_eq!(p.state(), PlayerState::End);
    }

    #[test]
    fn test_operations_after_release_fail() {
        let platform = SimulatedPlatform::new();
        let mut p = prepared_player(&platform);
        p.release().unwrap();

        assert!(p.start().is_err());
        assert!(p.reset().is_err());
        assert!(p.duration().is_err());
        assert!(p.set_volume(0.5, 0.5).is_err());
        // releasing again is harmless
        assert!(p.release().is_ok());
    }

    #[test]
    fn test_release_failure_after_error_is_quiet() {
        let platform = SimulatedPlatform::new();
        let mut p = prepared_player(&platform);
        platform.report_error(p.id(), 1, -1004);
        for ev in platform.drain_events() {
            p.deliver(ev);
        }
        assert_eq!(p.state(), PlayerState::Error);

        platform.fail_next("release");
        assert!(p.release().is_ok());
        assert_eq!(p.state(), PlayerState::End);
    }

    // ------------------------------------------------------------------------
    // Platform defect guards
    // ------------------------------------------------------------------------

    #[test]
    fn test_duration_and_position_zero_before_prepared() {
        let platform = SimulatedPlatform::new();
        platform.set_stale_values(123_456, 777);
        let mut p = player(&platform);

        assert_eq!(p.duration().unwrap(), 0);
        assert_eq!(p.current_position().unwrap(), 0);

        p.set_data_source("sim://track-a").unwrap();
        p.prepare_async().unwrap();
        assert_eq!(p.duration().unwrap(), 0);
        assert_eq!(p.current_position().unwrap(), 0);
    }

    #[test]
    fn test_aux_send_level_sanitized() {
        let platform = SimulatedPlatform::new();
        let mut p = player(&platform);

        p.set_aux_effect_send_level(f32::NAN).unwrap();
        assert_eq!(platform.aux_send_level(p.id()), AUX_SEND_LEVEL_DISABLED);

        p.set_aux_effect_send_level(-0.5).unwrap();
        assert_eq!(platform.aux_send_level(p.id()), AUX_SEND_LEVEL_DISABLED);

        p.set_aux_effect_send_level(0.25).unwrap();
        assert_eq!(platform.aux_send_level(p.id()), 0.25);
    }

    #[test]
    fn test_seek_before_prepared_is_noop() {
        let platform = SimulatedPlatform::new();
        let mut p = player(&platform);
        p.seek_to(5_000).unwrap();
        assert_eq!(platform.pending_events(), 0);
    }

    // ------------------------------------------------------------------------
    // Chaining
    // ------------------------------------------------------------------------

    #[test]
    fn test_set_next_player_rules() {
        let platform = SimulatedPlatform::new();
        let mut a = player(&platform);
        let b = prepared_player(&platform);
        let next = NextPlayerRef {
            id: b.id(),
            state: b.state(),
        };

        // Idle player cannot chain
        assert!(a.set_next_player(Some(next)).is_err());

        a.set_data_source("sim://track-b").unwrap();
        a.prepare().unwrap();
        a.set_next_player(Some(next)).unwrap();
        assert_eq!(a.next_player(), Some(b.id()));

        let own = NextPlayerRef {
            id: a.id(),
            state: PlayerState::Prepared,
        };
        assert!(a.set_next_player(Some(own)).is_err());

        let started = NextPlayerRef {
            id: b.id(),
            state: PlayerState::Started,
        };
        assert!(a.set_next_player(Some(started)).is_err());
    }

    #[test]
    fn test_completion_hands_off_when_not_looping() {
        let platform = SimulatedPlatform::new().with_native_chaining(false);
        let mut a = prepared_player(&platform);
        let b = prepared_player(&platform);
        a.set_next_player(Some(NextPlayerRef {
            id: b.id(),
            state: b.state(),
        }))
        .unwrap();
        a.start().unwrap();
        platform.drain_events();

        platform.complete_playback(a.id());
        let handoff = platform
            .drain_events()
            .into_iter()
            .filter_map(|ev| a.deliver(ev))
            .next();

        assert_eq!(
            handoff,
            Some(ChainHandoff {
                next: b.id(),
                native: false
            })
        );
        assert_eq!(a.state(), PlayerState::PlaybackCompleted);
    }

    #[test]
    fn test_no_handoff_while_looping() {
        let platform = SimulatedPlatform::new();
        let mut a = prepared_player(&platform);
        let b = prepared_player(&platform);
        a.set_next_player(Some(NextPlayerRef {
            id: b.id(),
            state: b.state(),
        }))
        .unwrap();
        a.set_looping(true).unwrap();
        a.start().unwrap();
        platform.drain_events();

        platform.inject(a.id(), PlayerEventKind::Completion);
        let handoffs: Vec<_> = platform
            .drain_events()
            .into_iter()
            .filter_map(|ev| a.deliver(ev))
            .collect();
        assert!(handoffs.is_empty());
        assert_eq!(a.state(), PlayerState::Started);
    }

    // ------------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------------

    #[test]
    fn test_prepared_callback_fires_once() {
        let platform = SimulatedPlatform::new();
        let mut p = player(&platform);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        p.set_on_prepared(move || *c.borrow_mut() += 1);

        p.set_data_source("sim://track-a").unwrap();
        p.prepare_async().unwrap();
        for ev in platform.drain_events() {
            p.deliver(ev);
        }

        assert_eq!(*count.borrow(), 1);
        assert_eq!(p.state(), PlayerState::Prepared);
    }

    #[test]
    fn test_stale_callback_after_reset_is_dropped() {
        let platform = SimulatedPlatform::new();
        let mut p = player(&platform);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        p.set_on_prepared(move || *c.borrow_mut() += 1);

        p.set_data_source("sim://track-a").unwrap();
        p.prepare_async().unwrap();
        p.reset().unwrap();
        for ev in platform.drain_events() {
            p.deliver(ev);
        }

        assert_eq!(*count.borrow(), 0);
        assert_eq!(p.state(), PlayerState::Idle);
    }

    #[test]
    fn test_release_clears_listeners() {
        let platform = SimulatedPlatform::new();
        let mut p = player(&platform);
        p.set_on_prepared(|| {});
        p.set_on_completion(|| {});
        p.set_on_error(|_, _| {});
        assert_eq!(p.listener_count(), 3);

        p.release().unwrap();
        assert_eq!(p.listener_count(), 0);
    }
}
