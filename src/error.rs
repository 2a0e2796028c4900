use thiserror::Error;

/// Errors raised by a concrete caption provider.
///
/// These never cross the orchestrator boundary: `fetcher` reclassifies
/// them into [`TranscriptError`] before returning to the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No caption tracks exist for the video.
    #[error("no subtitles available for video {0}")]
    NotFound(String),

    /// The platform reports captions explicitly turned off.
    #[error("subtitles are disabled for video {0}")]
    Disabled(String),

    /// The video itself is missing, private, or otherwise inaccessible.
    #[error("video {0} is unavailable: {1}")]
    Unavailable(String, String),

    /// Transport or parse failure with the detail text preserved.
    #[error("{0}")]
    Other(String),
}

/// Caller-facing error taxonomy.
///
/// External callers key their handling on these variants, so the mapping
/// from provider failures must stay coarse and stable.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The input was not a recognizable video URL or 11-character id.
    #[error("invalid YouTube URL or video id: {0}")]
    InvalidVideoId(String),

    /// The video is missing, private, or unavailable.
    #[error("video not found: {0}")]
    VideoNotFound(String),

    /// No caption track matched, or an unclassified provider failure.
    #[error("no {language} transcript found for video {video_id}")]
    TranscriptNotFound { video_id: String, language: String },

    /// Captions are intentionally turned off for the video.
    #[error("transcripts are disabled for video {0}")]
    TranscriptDisabled(String),

    /// Unexpected internal failure; detail goes to logs, not callers.
    #[error("internal error: {0}")]
    Internal(String),
}
