//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::{info, warn};
use walkdir::WalkDir;

use crate::app::{category, extra, player, AppController, AppEvent, Foreground, Subscription};
use crate::audiofx::EffectFactory;
use crate::config::{MetadataSourceKind, SegueConfig};
use crate::error::{Result, SegueError};
use crate::player::{
    CatalogMetadataSource, MediaMetadata, MetadataSource, PlayerImplType, PlayerState,
    SimulatedPlatform, WavMetadataSource,
};
use crate::state::{load_snapshot, save_snapshot, StateStores};

/// WAV files are measured; anything else gets the simulated length.
struct TrackMetadataSource {
    kind: MetadataSourceKind,
    fallback: CatalogMetadataSource,
}

impl TrackMetadataSource {
    fn new(config: &SegueConfig) -> Self {
        Self {
            kind: config.metadata_source,
            fallback: CatalogMetadataSource::with_fallback(config.simulated_track_ms),
        }
    }
}

fn is_wav(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("wav"))
}

impl MetadataSource for TrackMetadataSource {
    fn fetch(&self, uri: &str) -> Result<MediaMetadata> {
        match self.kind {
            MetadataSourceKind::Wav if is_wav(uri) => WavMetadataSource.fetch(uri),
            _ => self.fallback.fetch(uri),
        }
    }
}

fn format_ms(ms: i32) -> String {
    format!("{}:{:02}.{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
}

fn print_notifications(notes: &Subscription) {
    for note in notes.drain() {
        if note.category != category::NOTIFY_PLAYER_CONTROL {
            continue;
        }
        match note.event {
            player::PLAYER_STATE_CHANGED => {
                let state = PlayerState::from_code(note.arg2)
                    .map_or_else(|| note.arg2.to_string(), |s| s.to_string());
                println!("  slot{} -> {}", note.arg1, state);
            }
            player::EXCEPTION_OCCURRED if note.arg1 == player::NO_SLOT => println!(
                "  ! {} failed: {}",
                note.extra(extra::OPERATION).unwrap_or("?"),
                note.extra(extra::DESCRIPTION).unwrap_or("?")
            ),
            player::EXCEPTION_OCCURRED => println!(
                "  ! slot{} {} failed: {}",
                note.arg1,
                note.extra(extra::OPERATION).unwrap_or("?"),
                note.extra(extra::DESCRIPTION).unwrap_or("?")
            ),
            player::PLAYER_ERROR => println!(
                "  ! slot{} error what={} extra={}",
                note.arg1,
                note.extra(extra::WHAT).unwrap_or("?"),
                note.extra(extra::EXTRA).unwrap_or("?")
            ),
            _ => {}
        }
    }
}

/// Play one or two tracks back to back and report the hand-over.
pub fn play(
    config: &SegueConfig,
    tracks: &[String],
    impl_type: Option<PlayerImplType>,
    step_ms: i32,
) -> Result<()> {
    if step_ms <= 0 {
        return Err(SegueError::invalid_argument("step_ms", "must be positive"));
    }

    let platform = SimulatedPlatform::new();
    platform.set_default_duration(config.simulated_track_ms);
    let metadata = TrackMetadataSource::new(config);

    let mut total_ms = 0;
    for track in tracks {
        let meta = metadata.fetch(track)?;
        println!("{}: {} ({})", track, meta.title, format_ms(meta.duration_ms));
        platform.set_track_duration(track, meta.duration_ms);
        total_ms += meta.duration_ms;
    }

    let snapshot = config.snapshot_path.as_deref().filter(|p| p.exists());
    let mut controller = match snapshot {
        Some(path) => {
            AppController::with_snapshot(Box::new(platform.clone()), Box::new(metadata), path)?
        }
        None => AppController::with_stores(
            Box::new(platform.clone()),
            Box::new(metadata),
            config.initial_stores(),
        )?,
    };
    if let Some(impl_type) = impl_type {
        controller.set_player_impl_type(impl_type, false)?;
    }
    info!("Playing {} track(s) on {} players", tracks.len(), controller.impl_type());

    let notes = controller.subscribe();
    for (slot, track) in tracks.iter().enumerate() {
        controller.dispatch(
            &AppEvent::new(category::PLAYER_CONTROL, player::SONG_PICKED)
                .with_arg1(slot as i32)
                .with_extra(extra::URI, track),
        )?;
    }
    for request in [
        player::CREATE,
        player::SET_DATA_SOURCE,
        player::PREPARE_ASYNC,
    ] {
        controller.dispatch(&AppEvent::new(category::PLAYER_CONTROL, request))?;
    }
    controller.run_until_idle()?;
    controller.dispatch(&AppEvent::new(category::PLAYER_CONTROL, player::START))?;
    print_notifications(&notes);

    // Both slots stay chained to each other, so the last track hands back to
    // the first one; stop once every track had its turn.
    let mut elapsed = 0;
    let mut current = controller.foreground();
    while elapsed < total_ms && controller.foreground() != Foreground::Inactive {
        platform.advance(step_ms);
        elapsed += step_ms;
        controller.run_until_idle()?;
        print_notifications(&notes);

        let now = controller.foreground();
        if now != current && elapsed < total_ms {
            if let Foreground::Player(slot) = now {
                println!("[{}] now playing {}", format_ms(elapsed), slot);
            }
        }
        current = now;
    }

    if elapsed < total_ms {
        warn!("Playback went inactive after {}", format_ms(elapsed));
    }
    for request in [player::STOP, player::RELEASE] {
        controller.dispatch(&AppEvent::new(category::PLAYER_CONTROL, request))?;
    }
    print_notifications(&notes);
    println!("Finished after {}", format_ms(elapsed));

    if let Some(path) = &config.snapshot_path {
        let snapshot = controller.save_state(path)?;
        println!("State saved: {} ({})", path.display(), snapshot.id);
    }
    Ok(())
}

/// List WAV tracks under `dir`.
pub fn scan(dir: &Path) -> Result<()> {
    info!("Scanning {}", dir.display());

    let mut found = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_wav(&path.to_string_lossy()) {
            continue;
        }
        match WavMetadataSource::read(path) {
            Ok(meta) => {
                found += 1;
                println!(
                    "{}  {}  {} Hz  {} ch  {}",
                    format_ms(meta.duration_ms),
                    meta.title,
                    meta.sample_rate.unwrap_or(0),
                    meta.channels.unwrap_or(0),
                    path.display()
                );
            }
            Err(e) => warn!("{}", e),
        }
    }

    println!("{} playable track(s)", found);
    Ok(())
}

/// Print the effects `impl_type` provides.
pub fn effects(impl_type: PlayerImplType) -> Result<()> {
    let factory = EffectFactory::new(impl_type);
    println!("Effects on {} players:", impl_type);
    for effect in crate::audiofx::EffectType::ALL {
        let mark = if factory.is_supported(effect) { "yes" } else { "no" };
        println!("  {:<22} {}", effect.to_string(), mark);
    }
    Ok(())
}

/// Print a snapshot.
pub fn show_state(path: &Path) -> Result<()> {
    let snapshot = load_snapshot(path)?;
    println!("Snapshot: {}", snapshot.id);
    println!("Saved at: {}", snapshot.saved_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Schema version: {}", snapshot.schema_version);
    println!("{}", serde_json::to_string_pretty(&snapshot.stores)?);
    Ok(())
}

/// Overwrite a snapshot with default stores.
pub fn reset_state(path: &Path) -> Result<()> {
    let snapshot = save_snapshot(path, &StateStores::default())?;
    println!("State reset: {} ({})", path.display(), snapshot.id);
    Ok(())
}

/// Write the default configuration.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(SegueError::invalid_argument(
            "path",
            format!("{} exists; use --force to overwrite", path.display()),
        ));
    }
    SegueConfig::default().save(path)?;
    println!("Config written: {}", path.display());
    Ok(())
}
