use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::chapters;
use crate::config::Config;
use crate::error::{ProviderError, TranscriptError};
use crate::metadata::{MetadataFetcher, MetadataSource};
use crate::providers::{
    CaptionEntry, CaptionProvider, CaptionTrack, FetchResult, TranscribeProvider, YouTubeProvider,
};
use crate::video_id::VideoId;

/// Structured transcript result with raw entries
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntries {
    /// Validated video id
    pub video_id: String,
    /// Language code actually used
    pub language: String,
    /// Caption entries in start-time order
    pub entries: Vec<CaptionEntry>,
    /// Total covered duration in seconds
    pub duration: f64,
}

/// Rendered transcript result
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptText {
    /// Validated video id
    pub video_id: String,
    /// Language code actually used
    pub language: String,
    /// Flat text, or Markdown when chapters were requested and found
    pub text: String,
    /// Video title, present only when chapter output was produced
    pub title: Option<String>,
    /// Whether the output is chapter-structured
    pub has_chapters: bool,
}

/// Orchestrates caption acquisition across the provider tiers.
///
/// Strictly two sequential attempts: the primary provider (which walks
/// the language list internally), then the transcription fallback when
/// one is configured. No other retries. Provider-native errors never
/// leak past this boundary; they are reclassified into
/// [`TranscriptError`].
pub struct TranscriptFetcher {
    config: Config,
    primary: Arc<dyn CaptionProvider>,
    secondary: Option<Arc<dyn CaptionProvider>>,
    metadata: Arc<dyn MetadataSource>,
    youtube: YouTubeProvider,
}

impl TranscriptFetcher {
    /// Build the standard provider stack from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let youtube = YouTubeProvider::new(&config.youtube)?;
        let metadata: Arc<dyn MetadataSource> = Arc::new(MetadataFetcher::new(youtube.clone()));

        let secondary: Option<Arc<dyn CaptionProvider>> = match &config.transcribe.api_url {
            Some(url) => {
                info!("🎤 Transcription fallback enabled: {}", url);
                Some(Arc::new(TranscribeProvider::new(
                    url.clone(),
                    &config.transcribe,
                    metadata.clone(),
                )?))
            }
            None => None,
        };

        Ok(Self {
            primary: Arc::new(youtube.clone()),
            secondary,
            metadata,
            youtube,
            config,
        })
    }

    /// Build a fetcher with injected providers and metadata source.
    pub fn with_components(
        config: Config,
        primary: Arc<dyn CaptionProvider>,
        secondary: Option<Arc<dyn CaptionProvider>>,
        metadata: Arc<dyn MetadataSource>,
    ) -> Result<Self> {
        let youtube = YouTubeProvider::new(&config.youtube)?;
        Ok(Self {
            config,
            primary,
            secondary,
            metadata,
            youtube,
        })
    }

    /// Fetch caption entries for a raw URL or id.
    pub async fn fetch_entries(
        &self,
        raw_url_or_id: &str,
        language: Option<&str>,
    ) -> Result<TranscriptEntries, TranscriptError> {
        let video_id = VideoId::parse(raw_url_or_id)?;
        let preferred = language.unwrap_or(&self.config.languages.default_language);

        let result = self.fetch_with_fallback(&video_id, preferred).await?;
        let duration = total_duration(&result.entries);

        Ok(TranscriptEntries {
            video_id: video_id.to_string(),
            language: result.language_used,
            entries: result.entries,
            duration,
        })
    }

    /// Fetch a transcript rendered as flat text or, when requested and
    /// available, a chapter-structured Markdown document.
    pub async fn fetch_text(
        &self,
        raw_url_or_id: &str,
        language: Option<&str>,
        include_chapters: bool,
    ) -> Result<TranscriptText, TranscriptError> {
        let video_id = VideoId::parse(raw_url_or_id)?;
        let preferred = language.unwrap_or(&self.config.languages.default_language);

        let result = self.fetch_with_fallback(&video_id, preferred).await?;

        // Metadata is enrichment: any failure inside degrades to empty
        // metadata and flat text, never to a failed request.
        let (title, chapter_list) = if include_chapters {
            let metadata = self.metadata.fetch(&video_id).await;
            (metadata.title, metadata.chapters)
        } else {
            (None, Vec::new())
        };

        let rendered = chapters::render(&result.entries, &chapter_list, title, include_chapters);

        Ok(TranscriptText {
            video_id: video_id.to_string(),
            language: result.language_used,
            text: rendered.text,
            title: rendered.title,
            has_chapters: rendered.has_chapters,
        })
    }

    /// List available caption tracks for a raw URL or id.
    pub async fn available_languages(
        &self,
        raw_url_or_id: &str,
    ) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let video_id = VideoId::parse(raw_url_or_id)?;

        self.youtube.list_tracks(&video_id).await.map_err(|e| {
            classify_provider_error(e, &video_id, &self.config.languages.default_language)
        })
    }

    async fn fetch_with_fallback(
        &self,
        video_id: &VideoId,
        preferred: &str,
    ) -> Result<FetchResult, TranscriptError> {
        let fallbacks = &self.config.languages.fallback_languages;

        let primary_error = match self.primary.fetch(video_id, preferred, fallbacks).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if let Some(secondary) = &self.secondary {
            info!(
                "Primary provider failed ({}), trying transcription fallback for {}",
                primary_error, video_id
            );
            match secondary.fetch(video_id, preferred, fallbacks).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    // Best-effort tier: the failure is logged and the
                    // original primary classification is what surfaces.
                    error!("Transcription fallback also failed: {}", e);
                }
            }
        }

        Err(classify_provider_error(
            primary_error,
            video_id,
            preferred,
        ))
    }
}

/// Map a provider failure onto the caller-facing taxonomy.
///
/// The provider's native errors are richer and noisier than what callers
/// key on, so unstructured failures are classified by message substring
/// and anything unrecognized becomes `TranscriptNotFound`.
fn classify_provider_error(
    error: ProviderError,
    video_id: &VideoId,
    language: &str,
) -> TranscriptError {
    match error {
        ProviderError::Unavailable(id, _) => TranscriptError::VideoNotFound(id),
        ProviderError::Disabled(id) => TranscriptError::TranscriptDisabled(id),
        ProviderError::NotFound(id) => TranscriptError::TranscriptNotFound {
            video_id: id,
            language: language.to_string(),
        },
        ProviderError::Other(message) => {
            let lowered = message.to_lowercase();
            if lowered.contains("private") || lowered.contains("unavailable") {
                TranscriptError::VideoNotFound(video_id.to_string())
            } else if lowered.contains("disabled") {
                TranscriptError::TranscriptDisabled(video_id.to_string())
            } else {
                if !lowered.contains("no subtitle") {
                    error!("Failed to get transcript for {}: {}", video_id, message);
                }
                TranscriptError::TranscriptNotFound {
                    video_id: video_id.to_string(),
                    language: language.to_string(),
                }
            }
        }
    }
}

fn total_duration(entries: &[CaptionEntry]) -> f64 {
    entries
        .iter()
        .map(|e| e.start + e.duration)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::Chapter;
    use crate::config::ConfigBuilder;
    use crate::metadata::VideoMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ID: &str = "dQw4w9WgXcQ";

    /// What a mock provider does on each call
    enum MockBehavior {
        Succeed { language: &'static str },
        FailNotFound,
        FailDisabled,
        FailUnavailable,
        FailOther { message: &'static str },
    }

    struct MockProvider {
        behavior: MockBehavior,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CaptionProvider for MockProvider {
        async fn fetch(
            &self,
            video_id: &VideoId,
            _preferred: &str,
            _fallbacks: &[String],
        ) -> Result<FetchResult, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                MockBehavior::Succeed { language } => Ok(FetchResult {
                    entries: vec![
                        CaptionEntry {
                            text: "hello".to_string(),
                            start: 0.0,
                            duration: 1.0,
                        },
                        CaptionEntry {
                            text: "world".to_string(),
                            start: 1.0,
                            duration: 1.0,
                        },
                    ],
                    language_used: language.to_string(),
                }),
                MockBehavior::FailNotFound => {
                    Err(ProviderError::NotFound(video_id.to_string()))
                }
                MockBehavior::FailDisabled => {
                    Err(ProviderError::Disabled(video_id.to_string()))
                }
                MockBehavior::FailUnavailable => Err(ProviderError::Unavailable(
                    video_id.to_string(),
                    "Video unavailable".to_string(),
                )),
                MockBehavior::FailOther { message } => {
                    Err(ProviderError::Other(message.to_string()))
                }
            }
        }
    }

    struct MockMetadata {
        metadata: VideoMetadata,
    }

    #[async_trait]
    impl MetadataSource for MockMetadata {
        async fn fetch(&self, _video_id: &VideoId) -> VideoMetadata {
            self.metadata.clone()
        }
    }

    fn empty_metadata() -> Arc<dyn MetadataSource> {
        Arc::new(MockMetadata {
            metadata: VideoMetadata::default(),
        })
    }

    fn fetcher(
        primary: Arc<MockProvider>,
        secondary: Option<Arc<MockProvider>>,
        metadata: Arc<dyn MetadataSource>,
    ) -> TranscriptFetcher {
        let config = ConfigBuilder::new()
            .with_default_language("zh-Hant")
            .with_fallback_languages(vec!["en".to_string()])
            .build();
        TranscriptFetcher::with_components(
            config,
            primary,
            secondary.map(|s| s as Arc<dyn CaptionProvider>),
            metadata,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = MockProvider::new(MockBehavior::Succeed { language: "en" });
        let secondary = MockProvider::new(MockBehavior::Succeed { language: "ja" });
        let fetcher = fetcher(primary.clone(), Some(secondary.clone()), empty_metadata());

        let result = fetcher.fetch_entries(ID, Some("zh-Hant")).await.unwrap();
        assert_eq!(result.language, "en");
        assert_eq!(result.video_id, ID);
        assert!(!result.entries.is_empty());
        assert_eq!(result.duration, 2.0);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_without_secondary() {
        let primary = MockProvider::new(MockBehavior::FailNotFound);
        let fetcher = fetcher(primary.clone(), None, empty_metadata());

        let error = fetcher.fetch_entries(ID, Some("zh-Hant")).await.unwrap_err();
        match error {
            TranscriptError::TranscriptNotFound { video_id, language } => {
                assert_eq!(video_id, ID);
                assert_eq!(language, "zh-Hant");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_secondary_rescues_primary_failure() {
        let primary = MockProvider::new(MockBehavior::FailNotFound);
        let secondary = MockProvider::new(MockBehavior::Succeed { language: "ja" });
        let fetcher = fetcher(primary.clone(), Some(secondary.clone()), empty_metadata());

        let result = fetcher.fetch_entries(ID, Some("zh-Hant")).await.unwrap();
        // Language comes from the secondary's detection, not the request.
        assert_eq!(result.language, "ja");
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_both_tiers_failing_reports_original_classification() {
        let primary = MockProvider::new(MockBehavior::FailDisabled);
        let secondary = MockProvider::new(MockBehavior::FailOther {
            message: "whisper backend exploded",
        });
        let fetcher = fetcher(primary.clone(), Some(secondary.clone()), empty_metadata());

        let error = fetcher.fetch_entries(ID, None).await.unwrap_err();
        assert!(matches!(error, TranscriptError::TranscriptDisabled(_)));
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_maps_to_video_not_found() {
        let primary = MockProvider::new(MockBehavior::FailUnavailable);
        let fetcher = fetcher(primary, None, empty_metadata());

        let error = fetcher.fetch_entries(ID, None).await.unwrap_err();
        assert!(matches!(error, TranscriptError::VideoNotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_id_fails_before_any_provider_call() {
        let primary = MockProvider::new(MockBehavior::Succeed { language: "en" });
        let fetcher = fetcher(primary.clone(), None, empty_metadata());

        let error = fetcher
            .fetch_entries("not-a-valid-id", None)
            .await
            .unwrap_err();
        assert!(matches!(error, TranscriptError::InvalidVideoId(_)));
        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_text_flat() {
        let primary = MockProvider::new(MockBehavior::Succeed { language: "en" });
        let fetcher = fetcher(primary, None, empty_metadata());

        let result = fetcher.fetch_text(ID, Some("zh-Hant"), false).await.unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.language, "en");
        assert!(!result.has_chapters);
        assert!(result.title.is_none());
    }

    #[tokio::test]
    async fn test_fetch_text_with_chapters() {
        let primary = MockProvider::new(MockBehavior::Succeed { language: "en" });
        let metadata = Arc::new(MockMetadata {
            metadata: VideoMetadata {
                title: Some("A Video".to_string()),
                chapters: vec![
                    Chapter {
                        title: "Intro".to_string(),
                        start_offset: 0.0,
                    },
                    Chapter {
                        title: "Body".to_string(),
                        start_offset: 0.5,
                    },
                ],
                language: None,
            },
        });
        let fetcher = fetcher(primary, None, metadata);

        let result = fetcher.fetch_text(ID, Some("en"), true).await.unwrap();
        assert!(result.has_chapters);
        assert_eq!(result.title.as_deref(), Some("A Video"));
        assert_eq!(result.text, "## Intro\n\nhello\n\n## Body\n\nworld\n");
    }

    #[tokio::test]
    async fn test_fetch_text_degrades_when_metadata_empty() {
        // Metadata fetch failures surface as empty metadata; the request
        // still succeeds with flat text.
        let primary = MockProvider::new(MockBehavior::Succeed { language: "en" });
        let fetcher = fetcher(primary, None, empty_metadata());

        let result = fetcher.fetch_text(ID, Some("en"), true).await.unwrap();
        assert_eq!(result.text, "hello world");
        assert!(!result.has_chapters);
    }

    #[test]
    fn test_classification_by_message_substring() {
        let id = VideoId::parse(ID).unwrap();

        let cases = [
            ("This video is private", "video_not_found"),
            ("Video unavailable in your region", "video_not_found"),
            ("no subtitles available for video x", "transcript_not_found"),
            ("Subtitles are disabled for this video", "transcript_disabled"),
            ("some inscrutable transport error", "transcript_not_found"),
        ];

        for (message, expected) in cases {
            let classified =
                classify_provider_error(ProviderError::Other(message.to_string()), &id, "en");
            let actual = match classified {
                TranscriptError::VideoNotFound(_) => "video_not_found",
                TranscriptError::TranscriptNotFound { .. } => "transcript_not_found",
                TranscriptError::TranscriptDisabled(_) => "transcript_disabled",
                other => panic!("unexpected classification: {:?}", other),
            };
            assert_eq!(actual, expected, "message: {}", message);
        }
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(total_duration(&[]), 0.0);

        let entries = tokio_test::block_on(async {
            MockProvider::new(MockBehavior::Succeed { language: "en" })
                .fetch(&VideoId::parse(ID).unwrap(), "en", &[])
                .await
                .unwrap()
                .entries
        });
        assert_eq!(total_duration(&entries), 2.0);
    }
}
