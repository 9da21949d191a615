//! In-process simulated platform
//!
//! Stands in for the platform decoder pipeline so the player protocol can be
//! driven deterministically. Callbacks are queued and only reach players when
//! the owner drains them, which models the funnel onto the controller thread.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use log::{debug, info};

use crate::error::{Result, SegueError};
use crate::player::backend::{BackendEvent, MediaBackend, PlayerId, PlayerImplType};
use crate::player::basic::BasicPlayer;
use crate::player::events::{PlayerEventKind, MEDIA_INFO_STARTED_AS_NEXT};
use crate::player::factory::{MediaPlatform, PlayerFactory};

/// Track length used for unknown data sources.
pub const DEFAULT_TRACK_DURATION_MS: i32 = 180_000;

const FIRST_SESSION_ID: i32 = 100;

#[derive(Debug, Clone)]
struct Decoder {
    epoch: u32,
    uri: Option<String>,
    prepared: bool,
    loaded: bool,
    playing: bool,
    looping: bool,
    position_ms: i32,
    duration_ms: i32,
    volume: (f32, f32),
    aux_effect_id: i32,
    aux_send_level: f32,
    session_id: i32,
    next: Option<PlayerId>,
    released: bool,
}

#[derive(Debug)]
struct PlatformState {
    next_player_id: u32,
    next_session_id: i32,
    decoders: BTreeMap<PlayerId, Decoder>,
    events: VecDeque<BackendEvent>,
    durations: HashMap<String, i32>,
    default_duration_ms: i32,
    stale_duration_ms: i32,
    stale_position_ms: i32,
    native_chaining: bool,
    failures: HashMap<String, usize>,
}

impl PlatformState {
    fn push(&mut self, player: PlayerId, kind: PlayerEventKind) {
        let epoch = self.decoders.get(&player).map(|d| d.epoch).unwrap_or(0);
        self.events.push_back(BackendEvent {
            player,
            epoch,
            kind,
        });
    }

    fn take_failure(&mut self, operation: &str) -> Result<()> {
        if let Some(remaining) = self.failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SegueError::platform(operation, "injected platform failure"));
            }
        }
        Ok(())
    }

    fn decoder(&mut self, id: PlayerId) -> Result<&mut Decoder> {
        self.decoders
            .get_mut(&id)
            .ok_or_else(|| SegueError::platform("lookup", format!("{} does not exist", id)))
    }

    fn finish(&mut self, id: PlayerId) {
        let native = self.native_chaining;
        let (looping, next) = match self.decoders.get_mut(&id) {
            Some(d) if d.playing && !d.released => {
                d.position_ms = d.duration_ms;
                (d.looping, d.next)
            }
            _ => return,
        };

        if looping {
            if let Some(d) = self.decoders.get_mut(&id) {
                d.position_ms = 0;
            }
            return;
        }

        if let Some(d) = self.decoders.get_mut(&id) {
            d.playing = false;
        }

        let mut handed_over = None;
        if native {
            if let Some(next_id) = next {
                if let Some(n) = self.decoders.get_mut(&next_id) {
                    if n.prepared && !n.released {
                        n.playing = true;
                        n.position_ms = 0;
                        handed_over = Some(next_id);
                    }
                }
            }
        }

        self.push(id, PlayerEventKind::Completion);
        if let Some(next_id) = handed_over {
            debug!("platform: {} handed playback to {}", id, next_id);
            self.push(
                next_id,
                PlayerEventKind::Info {
                    what: MEDIA_INFO_STARTED_AS_NEXT,
                    extra: 0,
                },
            );
        }
    }
}

/// Shared simulated platform. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    state: Rc<RefCell<PlatformState>>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PlatformState {
                next_player_id: 1,
                next_session_id: FIRST_SESSION_ID,
                decoders: BTreeMap::new(),
                events: VecDeque::new(),
                durations: HashMap::new(),
                default_duration_ms: DEFAULT_TRACK_DURATION_MS,
                stale_duration_ms: 0,
                stale_position_ms: 0,
                native_chaining: true,
                failures: HashMap::new(),
            })),
        }
    }

    /// Whether completion hands playback over to the next player natively.
    pub fn with_native_chaining(self, enabled: bool) -> Self {
        self.state.borrow_mut().native_chaining = enabled;
        self
    }

    pub fn set_default_duration(&self, duration_ms: i32) {
        self.state.borrow_mut().default_duration_ms = duration_ms;
    }

    pub fn set_track_duration(&self, uri: &str, duration_ms: i32) {
        self.state
            .borrow_mut()
            .durations
            .insert(uri.to_string(), duration_ms);
    }

    /// Values reported by decoders that have not been prepared yet.
    pub fn set_stale_values(&self, duration_ms: i32, position_ms: i32) {
        let mut s = self.state.borrow_mut();
        s.stale_duration_ms = duration_ms;
        s.stale_position_ms = position_ms;
    }

    /// Make the next call of `operation` on any backend fail.
    pub fn fail_next(&self, operation: &str) {
        *self
            .state
            .borrow_mut()
            .failures
            .entry(operation.to_string())
            .or_insert(0) += 1;
    }

    pub fn create_backend(&self) -> SimulatedBackend {
        let mut s = self.state.borrow_mut();
        let id = PlayerId(s.next_player_id);
        s.next_player_id += 1;
        let session_id = s.next_session_id;
        s.next_session_id += 1;
        s.decoders.insert(
            id,
            Decoder {
                epoch: 0,
                uri: None,
                prepared: false,
                loaded: false,
                playing: false,
                looping: false,
                position_ms: 0,
                duration_ms: 0,
                volume: (1.0, 1.0),
                aux_effect_id: 0,
                aux_send_level: 0.0,
                session_id,
                next: None,
                released: false,
            },
        );
        SimulatedBackend {
            platform: self.clone(),
            id,
        }
    }

    // ========================================================================
    // Callback queue
    // ========================================================================

    pub fn drain_events(&self) -> Vec<BackendEvent> {
        self.state.borrow_mut().events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.state.borrow().events.len()
    }

    /// Queue a raw callback stamped with the decoder's current epoch.
    pub fn inject(&self, id: PlayerId, kind: PlayerEventKind) {
        self.state.borrow_mut().push(id, kind);
    }

    /// Natural end of stream for a playing decoder.
    pub fn complete_playback(&self, id: PlayerId) {
        self.state.borrow_mut().finish(id);
    }

    pub fn report_error(&self, id: PlayerId, what: i32, extra: i32) {
        let mut s = self.state.borrow_mut();
        if let Some(d) = s.decoders.get_mut(&id) {
            d.playing = false;
        }
        s.push(id, PlayerEventKind::Error { what, extra });
    }

    /// Advance every playing decoder; decoders reaching their end complete.
    pub fn advance(&self, msec: i32) {
        let mut s = self.state.borrow_mut();
        let mut finished = Vec::new();
        for (id, d) in s.decoders.iter_mut() {
            if d.playing && !d.released {
                d.position_ms = d.position_ms.saturating_add(msec);
                if d.position_ms >= d.duration_ms {
                    finished.push(*id);
                }
            }
        }
        for id in finished {
            s.finish(id);
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    fn with_decoder<T>(&self, id: PlayerId, f: impl FnOnce(&Decoder) -> T) -> Option<T> {
        self.state.borrow().decoders.get(&id).map(f)
    }

    pub fn is_playing(&self, id: PlayerId) -> bool {
        self.with_decoder(id, |d| d.playing).unwrap_or(false)
    }

    pub fn is_released(&self, id: PlayerId) -> bool {
        self.with_decoder(id, |d| d.released).unwrap_or(true)
    }

    pub fn position(&self, id: PlayerId) -> i32 {
        self.with_decoder(id, |d| d.position_ms).unwrap_or(0)
    }

    pub fn volume(&self, id: PlayerId) -> (f32, f32) {
        self.with_decoder(id, |d| d.volume).unwrap_or((0.0, 0.0))
    }

    pub fn is_looping(&self, id: PlayerId) -> bool {
        self.with_decoder(id, |d| d.looping).unwrap_or(false)
    }

    pub fn aux_effect(&self, id: PlayerId) -> i32 {
        self.with_decoder(id, |d| d.aux_effect_id).unwrap_or(0)
    }

    pub fn aux_send_level(&self, id: PlayerId) -> f32 {
        self.with_decoder(id, |d| d.aux_send_level).unwrap_or(0.0)
    }

    pub fn session_id(&self, id: PlayerId) -> i32 {
        self.with_decoder(id, |d| d.session_id).unwrap_or(0)
    }

    /// Next player registered natively with the platform.
    pub fn native_next(&self, id: PlayerId) -> Option<PlayerId> {
        self.with_decoder(id, |d| d.next).flatten()
    }

    pub fn data_source(&self, id: PlayerId) -> Option<String> {
        self.with_decoder(id, |d| d.uri.clone()).flatten()
    }

    /// Number of decoders that have not been released.
    pub fn live_decoders(&self) -> usize {
        self.state
            .borrow()
            .decoders
            .values()
            .filter(|d| !d.released)
            .count()
    }
}

impl MediaPlatform for SimulatedPlatform {
    fn create_factory(&self, impl_type: PlayerImplType) -> Result<Box<dyn PlayerFactory>> {
        info!("platform: creating {} player factory", impl_type);
        Ok(Box::new(SimulatedPlayerFactory {
            platform: self.clone(),
            impl_type,
        }))
    }
}

/// Player factory producing [`SimulatedBackend`]s.
#[derive(Debug, Clone)]
pub struct SimulatedPlayerFactory {
    platform: SimulatedPlatform,
    impl_type: PlayerImplType,
}

impl PlayerFactory for SimulatedPlayerFactory {
    fn impl_type(&self) -> PlayerImplType {
        self.impl_type
    }

    fn create_player(&mut self) -> Result<BasicPlayer> {
        self.platform.state.borrow_mut().take_failure("create_player")?;
        Ok(BasicPlayer::new(Box::new(self.platform.create_backend())))
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        self.platform.drain_events()
    }
}

/// One simulated decoder.
#[derive(Debug)]
pub struct SimulatedBackend {
    platform: SimulatedPlatform,
    id: PlayerId,
}

impl SimulatedBackend {
    fn op<T>(&mut self, operation: &str, f: impl FnOnce(&mut PlatformState, PlayerId) -> Result<T>) -> Result<T> {
        let mut s = self.platform.state.borrow_mut();
        s.take_failure(operation)?;
        f(&mut *s, self.id)
    }
}

impl MediaBackend for SimulatedBackend {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn epoch(&self) -> u32 {
        self.platform.with_decoder(self.id, |d| d.epoch).unwrap_or(0)
    }

    fn set_data_source(&mut self, uri: &str) -> Result<()> {
        self.op("set_data_source", |s, id| {
            let duration = s.durations.get(uri).copied().unwrap_or(s.default_duration_ms);
            let d = s.decoder(id)?;
            d.uri = Some(uri.to_string());
            d.duration_ms = duration;
            Ok(())
        })
    }

    fn prepare(&mut self) -> Result<()> {
        self.op("prepare", |s, id| {
            let d = s.decoder(id)?;
            d.prepared = true;
            d.loaded = true;
            d.position_ms = 0;
            s.push(id, PlayerEventKind::Prepared);
            Ok(())
        })
    }

    fn prepare_async(&mut self) -> Result<()> {
        self.op("prepare_async", |s, id| {
            let d = s.decoder(id)?;
            d.prepared = true;
            d.loaded = true;
            d.position_ms = 0;
            s.push(id, PlayerEventKind::Prepared);
            Ok(())
        })
    }

    fn start(&mut self) -> Result<()> {
        self.op("start", |s, id| {
            let d = s.decoder(id)?;
            if d.position_ms >= d.duration_ms {
                d.position_ms = 0;
            }
            d.playing = true;
            Ok(())
        })
    }

    fn pause(&mut self) -> Result<()> {
        self.op("pause", |s, id| {
            s.decoder(id)?.playing = false;
            Ok(())
        })
    }

    fn stop(&mut self) -> Result<()> {
        self.op("stop", |s, id| {
            let d = s.decoder(id)?;
            d.playing = false;
            d.prepared = false;
            Ok(())
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.op("reset", |s, id| {
            let d = s.decoder(id)?;
            d.epoch += 1;
            d.uri = None;
            d.prepared = false;
            d.loaded = false;
            d.playing = false;
            d.position_ms = 0;
            d.duration_ms = 0;
            d.next = None;
            Ok(())
        })
    }

    fn release(&mut self) -> Result<()> {
        self.op("release", |s, id| {
            let d = s.decoder(id)?;
            d.epoch += 1;
            d.playing = false;
            d.next = None;
            d.released = true;
            Ok(())
        })
    }

    fn seek_to(&mut self, msec: i32) -> Result<()> {
        self.op("seek_to", |s, id| {
            let d = s.decoder(id)?;
            d.position_ms = msec.clamp(0, d.duration_ms);
            s.push(id, PlayerEventKind::SeekComplete);
            Ok(())
        })
    }

    fn duration(&self) -> i32 {
        let s = self.platform.state.borrow();
        match s.decoders.get(&self.id) {
            Some(d) if d.loaded => d.duration_ms,
            _ => s.stale_duration_ms,
        }
    }

    fn current_position(&self) -> i32 {
        let s = self.platform.state.borrow();
        match s.decoders.get(&self.id) {
            Some(d) if d.loaded => d.position_ms,
            _ => s.stale_position_ms,
        }
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        self.op("set_volume", |s, id| {
            s.decoder(id)?.volume = (left, right);
            Ok(())
        })
    }

    fn set_looping(&mut self, looping: bool) -> Result<()> {
        self.op("set_looping", |s, id| {
            s.decoder(id)?.looping = looping;
            Ok(())
        })
    }

    fn attach_aux_effect(&mut self, effect_id: i32) -> Result<()> {
        self.op("attach_aux_effect", |s, id| {
            s.decoder(id)?.aux_effect_id = effect_id;
            Ok(())
        })
    }

    fn set_aux_effect_send_level(&mut self, level: f32) -> Result<()> {
        self.op("set_aux_effect_send_level", |s, id| {
            s.decoder(id)?.aux_send_level = level;
            Ok(())
        })
    }

    fn audio_session_id(&self) -> i32 {
        self.platform.session_id(self.id)
    }

    fn set_audio_session_id(&mut self, session_id: i32) -> Result<()> {
        self.op("set_audio_session_id", |s, id| {
            s.decoder(id)?.session_id = session_id;
            Ok(())
        })
    }

    fn supports_native_chaining(&self) -> bool {
        self.platform.state.borrow().native_chaining
    }

    fn set_next(&mut self, next: Option<PlayerId>) -> Result<()> {
        self.op("set_next", |s, id| {
            s.decoder(id)?.next = next;
            Ok(())
        })
    }
}
