use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::TranscriptError;

/// A validated YouTube video identifier.
///
/// Always exactly 11 characters from `[A-Za-z0-9_-]`. The only way to
/// construct one is [`VideoId::parse`], so downstream code never
/// re-checks the shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

/// Fast-path extraction patterns, tried in order.
///
/// Each pattern anchors the candidate on both sides so an overlong id
/// (e.g. a 12-character `v=` value) is never silently truncated to a
/// valid-looking prefix.
fn extraction_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtube\.com/watch\?[^#]*&v=)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
            r"youtu\.be/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
            r"(?:embed/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
            r"(?:/v/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
            r"(?:live/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("extraction pattern is valid"))
        .collect()
    })
}

fn is_valid_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl VideoId {
    /// Extract and validate a video id from a raw URL or bare id.
    ///
    /// Two tiers: an ordered list of cheap pattern matchers covering the
    /// common URL shapes, then a generic structural URL parse for
    /// anything the patterns miss. Both tiers recognize every supported
    /// shape; an id is accepted only if the extracted candidate matches
    /// the exact 11-character pattern.
    pub fn parse(raw: &str) -> Result<VideoId, TranscriptError> {
        let input = raw.trim();

        // Bare 11-character id needs no extraction.
        if is_valid_id(input) {
            return Ok(VideoId(input.to_string()));
        }

        for pattern in extraction_patterns() {
            if let Some(captures) = pattern.captures(input) {
                if let Some(candidate) = captures.get(1) {
                    if is_valid_id(candidate.as_str()) {
                        return Ok(VideoId(candidate.as_str().to_string()));
                    }
                }
            }
        }

        if let Some(candidate) = Self::extract_from_parsed_url(input) {
            if is_valid_id(&candidate) {
                return Ok(VideoId(candidate));
            }
        }

        Err(TranscriptError::InvalidVideoId(raw.to_string()))
    }

    /// Structural fallback: parse host/path/query and pull the id out of
    /// the known slots. The URL shapes are a loosely specified moving
    /// target, so this tier covers the same shapes as the patterns above.
    fn extract_from_parsed_url(input: &str) -> Option<String> {
        let with_scheme;
        let url_str = if input.starts_with("http://") || input.starts_with("https://") {
            input
        } else if input.contains("youtube.com") || input.contains("youtu.be") {
            with_scheme = format!("https://{}", input);
            &with_scheme
        } else {
            return None;
        };

        let url = Url::parse(url_str).ok()?;
        let host = url.host_str()?;

        // Short-host form: the id is the first path segment.
        if host == "youtu.be" || host.ends_with(".youtu.be") {
            return url
                .path_segments()
                .and_then(|mut segments| segments.next())
                .map(|s| s.to_string());
        }

        if !(host == "youtube.com" || host.ends_with(".youtube.com")) {
            return None;
        }

        // Long-host query form: watch?v=ID in any parameter position.
        if let Some(id) = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.to_string())
        {
            return Some(id);
        }

        // Path-segment forms: embed/ID, v/ID, live/ID.
        let segments: Vec<&str> = url.path_segments()?.collect();
        if segments.len() >= 2 && matches!(segments[0], "embed" | "v" | "live") {
            return Some(segments[1].to_string());
        }

        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
