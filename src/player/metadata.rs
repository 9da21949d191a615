//! Media metadata lookup
//!
//! Metadata is fetched synchronously while a data source is set, so by the
//! time a slot can reach Started its metadata is known.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use hound::WavReader;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegueError};

/// What the "now playing" indicator needs about a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub uri: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub duration_ms: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
}

/// Synchronous metadata lookup by content locator.
pub trait MetadataSource {
    fn fetch(&self, uri: &str) -> Result<MediaMetadata>;
}

/// Title derived from the last path segment of a locator.
pub fn title_from_uri(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match last.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => last.to_string(),
    }
}

/// Reads duration and format from WAV headers.
///
/// Accepts plain paths and `file://` locators.
#[derive(Debug, Clone, Default)]
pub struct WavMetadataSource;

impl WavMetadataSource {
    fn path_of(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }

    /// Metadata for a WAV file on disk.
    pub fn read(path: &Path) -> Result<MediaMetadata> {
        let uri = path.display().to_string();
        let reader = WavReader::open(path).map_err(|e| SegueError::MetadataUnavailable {
            uri: uri.clone(),
            reason: format!("failed to open WAV file: {}", e),
            source: Some(Box::new(e)),
        })?;

        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(SegueError::MetadataUnavailable {
                uri,
                reason: "sample rate is zero".to_string(),
                source: None,
            });
        }

        // duration() counts frames, not interleaved samples
        let frames = u64::from(reader.duration());
        let duration_ms = (frames * 1000 / u64::from(spec.sample_rate)).min(i32::MAX as u64) as i32;

        Ok(MediaMetadata {
            title: title_from_uri(&uri),
            uri,
            artist: None,
            duration_ms,
            sample_rate: Some(spec.sample_rate),
            channels: Some(spec.channels),
        })
    }
}

impl MetadataSource for WavMetadataSource {
    fn fetch(&self, uri: &str) -> Result<MediaMetadata> {
        let mut metadata = Self::read(&Self::path_of(uri))?;
        metadata.uri = uri.to_string();
        Ok(metadata)
    }
}

/// In-memory catalogue, optionally synthesising entries for unknown locators.
#[derive(Debug, Clone, Default)]
pub struct CatalogMetadataSource {
    entries: HashMap<String, MediaMetadata>,
    fallback_duration_ms: Option<i32>,
}

impl CatalogMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown locators resolve to a synthetic entry of this length.
    pub fn with_fallback(duration_ms: i32) -> Self {
        Self {
            entries: HashMap::new(),
            fallback_duration_ms: Some(duration_ms),
        }
    }

    pub fn insert(&mut self, metadata: MediaMetadata) {
        self.entries.insert(metadata.uri.clone(), metadata);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataSource for CatalogMetadataSource {
    fn fetch(&self, uri: &str) -> Result<MediaMetadata> {
        if let Some(found) = self.entries.get(uri) {
            return Ok(found.clone());
        }
        match self.fallback_duration_ms {
            Some(duration_ms) => Ok(MediaMetadata {
                uri: uri.to_string(),
                title: title_from_uri(uri),
                artist: None,
                duration_ms,
                sample_rate: None,
                channels: None,
            }),
            None => Err(SegueError::MetadataUnavailable {
                uri: uri.to_string(),
                reason: "not in catalogue".to_string(),
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, frames: u32) {
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(0i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_title_from_uri() {
        assert_eq!(title_from_uri("file:///music/01 Intro.wav"), "01 Intro");
        assert_eq!(title_from_uri("sim://track-a"), "track-a");
        assert_eq!(title_from_uri("noext"), "noext");
    }

    #[test]
    fn test_wav_metadata_duration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("half-second.wav");
        write_wav(&path, 48_000, 24_000);

        let meta = WavMetadataSource.fetch(&format!("file://{}", path.display())).unwrap();
        assert_eq!(meta.duration_ms, 500);
        assert_eq!(meta.channels, Some(2));
        assert_eq!(meta.title, "half-second");
    }

    #[test]
    fn test_wav_metadata_missing_file() {
        let err = WavMetadataSource.fetch("/nonexistent/file.wav").unwrap_err();
        assert_eq!(err.error_code(), "METADATA_UNAVAILABLE");
    }

    #[test]
    fn test_catalog_fallback() {
        let strict = CatalogMetadataSource::new();
        assert!(strict.fetch("sim://x").is_err());

        let lenient = CatalogMetadataSource::with_fallback(1_000);
        assert_eq!(lenient.fetch("sim://x").unwrap().duration_ms, 1_000);
    }
}
