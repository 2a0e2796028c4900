/// YouTube Transcript Fetcher
///
/// Caption acquisition and normalization library: validates video
/// references, fetches caption tracks with language fallback, falls back
/// to speech transcription when no track exists, and renders flat or
/// chapter-structured transcript text.

pub mod chapters;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod metadata;
pub mod providers;
pub mod video_id;

// Re-export main types for easy access
pub use crate::chapters::{Chapter, RenderedTranscript};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{ProviderError, TranscriptError};
pub use crate::fetcher::{TranscriptEntries, TranscriptFetcher, TranscriptText};
pub use crate::metadata::{MetadataFetcher, MetadataSource, VideoMetadata};
pub use crate::providers::{
    CaptionEntry, CaptionProvider, CaptionTrack, FetchResult, TranscribeProvider, YouTubeProvider,
};
pub use crate::video_id::VideoId;
