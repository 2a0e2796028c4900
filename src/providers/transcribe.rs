use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::TranscribeConfig;
use crate::error::ProviderError;
use crate::metadata::MetadataSource;
use crate::providers::{CaptionEntry, CaptionProvider, FetchResult};
use crate::video_id::VideoId;

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    video_id: &'a str,
    language: &'a str,
}

/// Speech-transcription fallback provider.
///
/// Submits a video to an external transcription backend and waits for
/// the normalized entry list. Transcription runs for minutes on long
/// videos, so the request carries its own generous timeout instead of
/// the client-wide one; the bound is still fixed so a stuck backend
/// cannot block forever.
pub struct TranscribeProvider {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
    metadata: Arc<dyn MetadataSource>,
}

impl TranscribeProvider {
    pub fn new(
        base_url: String,
        config: &TranscribeConfig,
        metadata: Arc<dyn MetadataSource>,
    ) -> Result<Self> {
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(config.timeout_seconds),
            client: reqwest::Client::builder().build()?,
            metadata,
        })
    }

    /// Best-effort probe for the video's spoken language; falls back to
    /// the requested preferred language when the probe comes up empty.
    async fn detect_language(&self, video_id: &VideoId, preferred: &str) -> String {
        match self.metadata.fetch(video_id).await.language {
            Some(language) => {
                info!("🌐 Detected spoken language for {}: {}", video_id, language);
                language
            }
            None => {
                warn!(
                    "Could not detect spoken language for {}, using '{}'",
                    video_id, preferred
                );
                preferred.to_string()
            }
        }
    }
}

#[async_trait]
impl CaptionProvider for TranscribeProvider {
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferred: &str,
        _fallbacks: &[String],
    ) -> Result<FetchResult, ProviderError> {
        let language = self.detect_language(video_id, preferred).await;

        let url = format!(
            "{}/api/v1/transcribe-youtube",
            self.base_url.trim_end_matches('/')
        );

        info!(
            "🎤 Submitting {} for transcription in '{}'",
            video_id, language
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&TranscribeRequest {
                video_id: video_id.as_str(),
                language: &language,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Other(format!("transcription request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Other(format!(
                "transcription backend returned HTTP {}",
                response.status()
            )));
        }

        let entries: Vec<CaptionEntry> = response.json().await.map_err(|e| {
            ProviderError::Other(format!("failed to parse transcription response: {}", e))
        })?;

        info!(
            "✅ Transcription returned {} entries for {}",
            entries.len(),
            video_id
        );

        Ok(FetchResult {
            entries,
            language_used: language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::VideoMetadata;

    struct FixedMetadata {
        language: Option<String>,
    }

    #[async_trait]
    impl MetadataSource for FixedMetadata {
        async fn fetch(&self, _video_id: &VideoId) -> VideoMetadata {
            VideoMetadata {
                title: None,
                chapters: Vec::new(),
                language: self.language.clone(),
            }
        }
    }

    fn provider(language: Option<String>) -> TranscribeProvider {
        TranscribeProvider::new(
            "http://localhost:9000/".to_string(),
            &TranscribeConfig {
                api_url: Some("http://localhost:9000/".to_string()),
                timeout_seconds: 300,
            },
            Arc::new(FixedMetadata { language }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_detect_language_uses_probe() {
        let provider = provider(Some("ja".to_string()));
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(provider.detect_language(&id, "zh-Hant").await, "ja");
    }

    #[tokio::test]
    async fn test_detect_language_falls_back_to_preferred() {
        let provider = provider(None);
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(provider.detect_language(&id, "zh-Hant").await, "zh-Hant");
    }

    #[test]
    fn test_request_payload_shape() {
        let request = TranscribeRequest {
            video_id: "dQw4w9WgXcQ",
            language: "zh-Hant",
        };
        let payload = serde_json::to_value(&request).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"video_id": "dQw4w9WgXcQ", "language": "zh-Hant"})
        );
    }

    #[test]
    fn test_transcribe_timeout_exceeds_request_timeout() {
        let provider = provider(None);
        assert!(provider.timeout >= Duration::from_secs(300));
    }
}
