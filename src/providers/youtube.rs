use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::YouTubeConfig;
use crate::error::ProviderError;
use crate::providers::{CaptionEntry, CaptionProvider, CaptionTrack, FetchResult};
use crate::video_id::VideoId;

const WATCH_URL: &str = "https://www.youtube.com/watch?v={video_id}";
const INNERTUBE_API_URL: &str = "https://www.youtube.com/youtubei/v1/player?key={api_key}";

/// One caption track as listed in the player response
#[derive(Debug, Clone)]
struct TrackInfo {
    code: String,
    name: String,
    base_url: String,
    is_translatable: bool,
}

/// Available tracks split by origin; platform listing order is preserved
#[derive(Debug, Clone, Default)]
struct TrackList {
    manual: Vec<TrackInfo>,
    generated: Vec<TrackInfo>,
}

/// Video details consumed by the metadata fetcher
#[derive(Debug, Clone, Default)]
pub struct VideoDetails {
    /// Video title
    pub title: Option<String>,
    /// Full description text
    pub description: String,
    /// Spoken language reported by the platform, when present
    pub language: Option<String>,
}

/// Primary caption provider talking to YouTube's public player API.
///
/// The HTTP client is constructed once and is safe for concurrent reuse;
/// everything else is request-scoped.
#[derive(Clone)]
pub struct YouTubeProvider {
    client: reqwest::Client,
}

impl YouTubeProvider {
    pub fn new(config: &YouTubeConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US"),
        );

        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_seconds));

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// List available caption tracks: manual tracks first, then generated
    /// tracks whose language code is not already covered.
    pub async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, ProviderError> {
        let player = self.player_response(video_id).await?;
        check_playability(video_id, &player)?;
        let tracks = extract_tracks(video_id, &player)?;

        let mut listing: Vec<CaptionTrack> = tracks
            .manual
            .iter()
            .map(|t| CaptionTrack {
                code: t.code.clone(),
                name: t.name.clone(),
                is_generated: false,
                is_translatable: t.is_translatable,
            })
            .collect();

        for track in &tracks.generated {
            if listing.iter().any(|l| l.code == track.code) {
                continue;
            }
            listing.push(CaptionTrack {
                code: track.code.clone(),
                name: track.name.clone(),
                is_generated: true,
                is_translatable: track.is_translatable,
            });
        }

        Ok(listing)
    }

    /// Best-effort probe for title, description, and spoken language.
    pub async fn video_details(&self, video_id: &VideoId) -> Result<VideoDetails, ProviderError> {
        let player = self.player_response(video_id).await?;
        check_playability(video_id, &player)?;

        let details = player.get("videoDetails");

        let title = details
            .and_then(|d| d.get("title"))
            .and_then(|t| t.as_str())
            .map(|t| t.to_string());

        let description = details
            .and_then(|d| d.get("shortDescription"))
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        let language = player
            .get("microformat")
            .and_then(|m| m.get("playerMicroformatRenderer"))
            .and_then(|m| m.get("defaultAudioLanguage"))
            .and_then(|l| l.as_str())
            .map(|l| l.to_string());

        Ok(VideoDetails {
            title,
            description,
            language,
        })
    }

    async fn player_response(&self, video_id: &VideoId) -> Result<Value, ProviderError> {
        let html = self.fetch_watch_html(video_id).await?;
        let api_key = extract_innertube_api_key(&html, video_id)?;
        self.fetch_innertube_data(video_id, &api_key).await
    }

    async fn fetch_watch_html(&self, video_id: &VideoId) -> Result<String, ProviderError> {
        let url = WATCH_URL.replace("{video_id}", video_id.as_str());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Other(format!("failed to fetch watch page: {}", e)))?;

        check_http_status(&response, video_id)?;

        response
            .text()
            .await
            .map_err(|e| ProviderError::Other(format!("failed to read watch page: {}", e)))
    }

    async fn fetch_innertube_data(
        &self,
        video_id: &VideoId,
        api_key: &str,
    ) -> Result<Value, ProviderError> {
        let url = INNERTUBE_API_URL.replace("{api_key}", api_key);

        let context = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": video_id.as_str()
        });

        let response = self
            .client
            .post(&url)
            .json(&context)
            .send()
            .await
            .map_err(|e| ProviderError::Other(format!("failed to fetch player data: {}", e)))?;

        check_http_status(&response, video_id)?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("failed to parse player response: {}", e)))
    }

    /// Download the selected track as json3 and parse it into entries.
    ///
    /// The payload is staged in a request-scoped temp directory, released
    /// on every exit path when `staging` drops.
    async fn download_entries(
        &self,
        video_id: &VideoId,
        track: &TrackInfo,
    ) -> Result<Vec<CaptionEntry>, ProviderError> {
        let url = format!("{}&fmt=json3", track.base_url.replace("&fmt=srv3", ""));

        debug!("Downloading {} captions for {}", track.code, video_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Other(format!("failed to download captions: {}", e)))?;

        check_http_status(&response, video_id)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Other(format!("failed to read captions: {}", e)))?;

        let staging = tempfile::tempdir()
            .map_err(|e| ProviderError::Other(format!("failed to create staging dir: {}", e)))?;
        let path = staging
            .path()
            .join(format!("{}.{}.json3", video_id, track.code));

        tokio::fs::write(&path, &body)
            .await
            .map_err(|e| ProviderError::Other(format!("failed to stage captions: {}", e)))?;
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ProviderError::Other(format!("failed to read staged captions: {}", e)))?;

        let payload: Value = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::Other(format!("failed to parse json3 captions: {}", e)))?;

        Ok(parse_json3(&payload))
    }
}

#[async_trait]
impl CaptionProvider for YouTubeProvider {
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferred: &str,
        fallbacks: &[String],
    ) -> Result<FetchResult, ProviderError> {
        let player = self.player_response(video_id).await?;
        check_playability(video_id, &player)?;
        let tracks = extract_tracks(video_id, &player)?;

        let (track, is_generated) = select_track(&tracks, preferred, fallbacks)
            .ok_or_else(|| ProviderError::NotFound(video_id.to_string()))?;

        if track.code != preferred {
            warn!(
                "⚠️ No '{}' track for {}, using '{}' instead",
                preferred, video_id, track.code
            );
        }
        info!(
            "🎬 Selected {} '{}' track for {}",
            if is_generated { "auto-generated" } else { "manual" },
            track.code,
            video_id
        );

        let entries = self.download_entries(video_id, track).await?;

        Ok(FetchResult {
            entries,
            language_used: track.code.clone(),
        })
    }
}

fn check_http_status(response: &reqwest::Response, video_id: &VideoId) -> Result<(), ProviderError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::Other(format!(
            "rate limited while fetching {}",
            video_id
        )));
    }
    if !status.is_success() {
        return Err(ProviderError::Other(format!(
            "HTTP {} while fetching {}",
            status, video_id
        )));
    }
    Ok(())
}

fn extract_innertube_api_key(html: &str, video_id: &VideoId) -> Result<String, ProviderError> {
    static KEY_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = KEY_RE.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("key pattern is valid")
    });

    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|k| k.as_str().to_string())
        .ok_or_else(|| {
            ProviderError::Other(format!("watch page for {} is unparsable", video_id))
        })
}

/// Map a non-OK playability status onto the provider taxonomy.
fn check_playability(video_id: &VideoId, player: &Value) -> Result<(), ProviderError> {
    let playability = match player.get("playabilityStatus") {
        Some(p) => p,
        None => return Ok(()),
    };

    let status = playability
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("");

    if status == "OK" || status.is_empty() {
        return Ok(());
    }

    let reason = playability
        .get("reason")
        .and_then(|r| r.as_str())
        .unwrap_or("")
        .to_string();

    // Private, removed, region-locked, login-walled: the video itself is
    // inaccessible, whatever the precise reason text says.
    Err(ProviderError::Unavailable(video_id.to_string(), reason))
}

fn extract_tracks(video_id: &VideoId, player: &Value) -> Result<TrackList, ProviderError> {
    let renderer = player
        .get("captions")
        .and_then(|c| c.get("playerCaptionsTracklistRenderer"));

    // The platform omits the whole renderer when the uploader turned
    // captions off.
    let renderer = match renderer {
        Some(r) => r,
        None => return Err(ProviderError::Disabled(video_id.to_string())),
    };

    let mut tracks = TrackList::default();

    if let Some(caption_tracks) = renderer.get("captionTracks").and_then(|t| t.as_array()) {
        for caption in caption_tracks {
            let code = match caption.get("languageCode").and_then(|c| c.as_str()) {
                Some(c) => c.to_string(),
                None => continue,
            };

            let base_url = match caption.get("baseUrl").and_then(|u| u.as_str()) {
                Some(u) => u.to_string(),
                None => continue,
            };

            let name = caption
                .get("name")
                .and_then(|n| n.get("runs"))
                .and_then(|r| r.as_array())
                .and_then(|arr| arr.first())
                .and_then(|r| r.get("text"))
                .and_then(|t| t.as_str())
                .unwrap_or(&code)
                .to_string();

            let is_generated = caption
                .get("kind")
                .and_then(|k| k.as_str())
                .map(|k| k == "asr")
                .unwrap_or(false);

            let is_translatable = caption
                .get("isTranslatable")
                .and_then(|t| t.as_bool())
                .unwrap_or(false);

            let track = TrackInfo {
                code,
                name,
                base_url,
                is_translatable,
            };

            if is_generated {
                tracks.generated.push(track);
            } else {
                tracks.manual.push(track);
            }
        }
    }

    if tracks.manual.is_empty() && tracks.generated.is_empty() {
        return Err(ProviderError::NotFound(video_id.to_string()));
    }

    Ok(tracks)
}

/// Pick a track for the requested language list.
///
/// For each language in order, a manual track wins over an auto-generated
/// one; across languages the list order always wins. When nothing in the
/// list matches, any available track (manual before auto) is returned so
/// the caller still gets something usable — the code actually used is
/// reported back. Language codes compare by exact case-sensitive match.
fn select_track<'a>(
    tracks: &'a TrackList,
    preferred: &str,
    fallbacks: &[String],
) -> Option<(&'a TrackInfo, bool)> {
    let requested = std::iter::once(preferred).chain(fallbacks.iter().map(|s| s.as_str()));

    for language in requested {
        if let Some(track) = tracks.manual.iter().find(|t| t.code == language) {
            return Some((track, false));
        }
        if let Some(track) = tracks.generated.iter().find(|t| t.code == language) {
            return Some((track, true));
        }
    }

    if let Some(track) = tracks.manual.first() {
        return Some((track, false));
    }
    tracks.generated.first().map(|t| (t, true))
}

/// Parse a json3 caption payload into entries.
///
/// Each timed event's segments are concatenated and trimmed; events with
/// no resulting text are layout-only cues and are dropped. Wire times are
/// integer milliseconds.
fn parse_json3(payload: &Value) -> Vec<CaptionEntry> {
    let events = match payload.get("events").and_then(|e| e.as_array()) {
        Some(events) => events,
        None => return Vec::new(),
    };

    let mut entries = Vec::new();

    for event in events {
        let segs = match event.get("segs").and_then(|s| s.as_array()) {
            Some(segs) if !segs.is_empty() => segs,
            _ => continue,
        };

        let text: String = segs
            .iter()
            .filter_map(|seg| seg.get("utf8").and_then(|u| u.as_str()))
            .collect();
        let text = text.trim().to_string();
        if text.is_empty() {
            continue;
        }

        let start_ms = event.get("tStartMs").and_then(|t| t.as_i64()).unwrap_or(0);
        let duration_ms = event
            .get("dDurationMs")
            .and_then(|d| d.as_i64())
            .unwrap_or(0);

        entries.push(CaptionEntry {
            text,
            start: start_ms as f64 / 1000.0,
            duration: duration_ms as f64 / 1000.0,
        });
    }

    entries
}
