pub mod transcribe;
pub mod youtube;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::video_id::VideoId;

pub use transcribe::TranscribeProvider;
pub use youtube::YouTubeProvider;

/// One timed caption line.
///
/// Providers hand entries back sorted by `start` ascending; nothing
/// downstream re-sorts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionEntry {
    /// Caption text
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

/// Metadata about one available caption track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionTrack {
    /// Language code (e.g. "zh-Hant", "en")
    pub code: String,
    /// Display name of the language
    pub name: String,
    /// Whether the track was auto-generated by the platform
    pub is_generated: bool,
    /// Whether the platform can translate the track
    pub is_translatable: bool,
}

/// Entries plus the language a provider actually used
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Caption entries in start-time order
    pub entries: Vec<CaptionEntry>,
    /// Language code of the track actually returned; may differ from the
    /// requested one, so callers can detect the mismatch
    pub language_used: String,
}

/// A caption retrieval backend.
///
/// The orchestrator in `fetcher` only sees this trait, so concrete
/// backends can be swapped for test doubles.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Fetch captions for a video, trying `preferred` then `fallbacks`.
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferred: &str,
        fallbacks: &[String],
    ) -> Result<FetchResult, ProviderError>;
}
