/// Chapter markers and chapter-aware transcript rendering
///
/// Partitions caption entries by chapter boundary and renders either flat
/// text or a Markdown document with one H2 heading per chapter.
use serde::{Deserialize, Serialize};

use crate::providers::CaptionEntry;

/// A named time-range marker within a video's timeline.
///
/// A video's chapter list is ordered by `start_offset` ascending and
/// non-overlapping: each chapter extends until the next one's start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    /// Chapter title
    pub title: String,
    /// Start time in seconds from the beginning of the video
    pub start_offset: f64,
}

/// Rendered transcript text plus chapter metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTranscript {
    /// Flat text or Markdown, depending on the chapter mode
    pub text: String,
    /// Video title, present only in chapter mode
    pub title: Option<String>,
    /// Whether at least one chapter produced output
    pub has_chapters: bool,
}

/// Render caption entries as flat text or a chapter-structured document.
///
/// Without chapters (not requested, or none available) all entry texts
/// are joined with single spaces. With chapters, each chapter that
/// received at least one entry becomes an H2 heading followed by its
/// joined text; empty chapters are skipped entirely.
pub fn render(
    entries: &[CaptionEntry],
    chapters: &[Chapter],
    title: Option<String>,
    chapters_requested: bool,
) -> RenderedTranscript {
    if !chapters_requested || chapters.is_empty() {
        return RenderedTranscript {
            text: flat_text(entries),
            title: None,
            has_chapters: false,
        };
    }

    let mut sorted: Vec<&Chapter> = chapters.iter().collect();
    sorted.sort_by(|a, b| {
        a.start_offset
            .partial_cmp(&b.start_offset)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let assigned = assign_to_chapters(entries, &sorted);

    let mut lines: Vec<String> = Vec::new();
    let mut emitted = 0usize;

    for (chapter, chapter_entries) in sorted.iter().zip(&assigned) {
        if chapter_entries.is_empty() {
            continue;
        }

        lines.push(format!("## {}", chapter.title));
        lines.push(String::new());
        lines.push(joined_text(chapter_entries));
        lines.push(String::new());
        emitted += 1;
    }

    RenderedTranscript {
        text: lines.join("\n"),
        title,
        has_chapters: emitted > 0,
    }
}

/// Assign each entry to the last chapter whose start is not after the
/// entry's start. Entries before the first chapter's start go to the
/// first chapter; that is a rendering policy, not a platform guarantee.
fn assign_to_chapters<'a>(
    entries: &'a [CaptionEntry],
    sorted_chapters: &[&Chapter],
) -> Vec<Vec<&'a CaptionEntry>> {
    let mut assigned: Vec<Vec<&CaptionEntry>> = vec![Vec::new(); sorted_chapters.len()];

    for entry in entries {
        let mut index = 0;
        for (i, chapter) in sorted_chapters.iter().enumerate() {
            if entry.start >= chapter.start_offset {
                index = i;
            } else {
                break;
            }
        }
        assigned[index].push(entry);
    }

    assigned
}

fn joined_text(entries: &[&CaptionEntry]) -> String {
    entries
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn flat_text(entries: &[CaptionEntry]) -> String {
    entries
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
