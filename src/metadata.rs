use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::chapters::Chapter;
use crate::providers::youtube::YouTubeProvider;
use crate::video_id::VideoId;

/// Title, chapters, and spoken language for a video
#[derive(Debug, Clone, Default)]
pub struct VideoMetadata {
    /// Video title, when the probe succeeded
    pub title: Option<String>,
    /// Chapter markers sorted by start offset; empty when the video has none
    pub chapters: Vec<Chapter>,
    /// Spoken language reported by the platform, when present
    pub language: Option<String>,
}

/// Source of video metadata, swappable for test doubles
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for a video. Never fails: metadata is enrichment,
    /// so any upstream error degrades to empty metadata.
    async fn fetch(&self, video_id: &VideoId) -> VideoMetadata;
}

/// Fetches title and chapter markers through the player API.
///
/// Chapters come from timestamp lines in the video description, which is
/// the platform's own chapter mechanism: the first marker must sit at
/// 0:00 and at least three markers must be present, otherwise the video
/// has no chapters.
#[derive(Clone)]
pub struct MetadataFetcher {
    provider: YouTubeProvider,
}

impl MetadataFetcher {
    pub fn new(provider: YouTubeProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl MetadataSource for MetadataFetcher {
    async fn fetch(&self, video_id: &VideoId) -> VideoMetadata {
        match self.provider.video_details(video_id).await {
            Ok(details) => {
                let chapters = parse_description_chapters(&details.description);
                debug!(
                    "Metadata for {}: title={:?}, {} chapters",
                    video_id,
                    details.title,
                    chapters.len()
                );
                VideoMetadata {
                    title: details.title,
                    chapters,
                    language: details.language,
                }
            }
            Err(e) => {
                warn!("⚠️ Could not fetch metadata for {}: {}", video_id, e);
                VideoMetadata::default()
            }
        }
    }
}

/// Extract chapter markers from description timestamp lines.
fn parse_description_chapters(description: &str) -> Vec<Chapter> {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    let re = LINE_RE.get_or_init(|| {
        // "0:00 Intro", "(1:02:30) Outro", "12:34 - Title"
        Regex::new(r"^\s*\(?((?:\d{1,2}:)?\d{1,2}:\d{2})\)?\s*[-–:]?\s*(\S.*?)\s*$")
            .expect("chapter line pattern is valid")
    });

    let mut chapters: Vec<Chapter> = Vec::new();

    for line in description.lines() {
        let captures = match re.captures(line) {
            Some(c) => c,
            None => continue,
        };

        let start_offset = match parse_timestamp(&captures[1]) {
            Some(seconds) => seconds,
            None => continue,
        };

        chapters.push(Chapter {
            title: captures[2].to_string(),
            start_offset,
        });
    }

    chapters.sort_by(|a, b| {
        a.start_offset
            .partial_cmp(&b.start_offset)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Platform rule: chapters only exist when the list starts at 0:00
    // and has at least three markers.
    let valid = chapters.len() >= 3 && chapters[0].start_offset == 0.0;
    if !valid {
        return Vec::new();
    }

    chapters
}

/// Parse "m:ss" or "h:mm:ss" into seconds.
fn parse_timestamp(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.split(':').collect();

    let seconds = match parts.as_slice() {
        [m, s] => {
            let minutes: u64 = m.parse().ok()?;
            let secs: u64 = s.parse().ok()?;
            if secs >= 60 {
                return None;
            }
            minutes * 60 + secs
        }
        [h, m, s] => {
            let hours: u64 = h.parse().ok()?;
            let minutes: u64 = m.parse().ok()?;
            let secs: u64 = s.parse().ok()?;
            if minutes >= 60 || secs >= 60 {
                return None;
            }
            hours * 3600 + minutes * 60 + secs
        }
        _ => return None,
    };

    Some(seconds as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("0:00"), Some(0.0));
        assert_eq!(parse_timestamp("2:05"), Some(125.0));
        assert_eq!(parse_timestamp("1:02:30"), Some(3750.0));
        assert_eq!(parse_timestamp("90"), None);
        assert_eq!(parse_timestamp("1:75"), None);
        assert_eq!(parse_timestamp("a:bc"), None);
    }

    #[test]
    fn test_parse_description_chapters() {
        let description = "\
Check out the gear I use below!

0:00 Intro
2:30 - Getting Started
10:45 Deep Dive
1:00:00 Wrap Up

Thanks for watching!";

        let chapters = parse_description_chapters(description);
        assert_eq!(chapters.len(), 4);
        assert_eq!(chapters[0].title, "Intro");
        assert_eq!(chapters[0].start_offset, 0.0);
        assert_eq!(chapters[1].title, "Getting Started");
        assert_eq!(chapters[1].start_offset, 150.0);
        assert_eq!(chapters[3].start_offset, 3600.0);
    }

    #[test]
    fn test_chapters_require_zero_start() {
        let description = "1:00 One\n2:00 Two\n3:00 Three";
        assert!(parse_description_chapters(description).is_empty());
    }

    #[test]
    fn test_chapters_require_three_markers() {
        let description = "0:00 Intro\n5:00 Outro";
        assert!(parse_description_chapters(description).is_empty());
    }

    #[test]
    fn test_chapters_sorted_by_offset() {
        let description = "0:00 Intro\n10:00 Late\n5:00 Middle";
        let chapters = parse_description_chapters(description);
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[1].title, "Middle");
        assert_eq!(chapters[2].title, "Late");
    }

    #[test]
    fn test_non_timestamp_lines_ignored() {
        let description = "Buy my course at https://example.com\nNo chapters here.";
        assert!(parse_description_chapters(description).is_empty());
    }
}
