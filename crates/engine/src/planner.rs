//! Pagination decisions: filler pages before chapters and page-break segments.

use memoir_core::styled::{self, Paragraph};
use memoir_core::{ChapterSettings, PAGE_BREAK_MARKER, PagePlacement, TextDefaults};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterStart {
    pub blank_pages_before: usize,
}

/// Decides whether a filler page must precede a chapter. `current_page_index`
/// is the number of pages already emitted; even means the next page is a left page.
pub fn plan_chapter_start(settings: &ChapterSettings, current_page_index: usize) -> ChapterStart {
    let next_is_left = current_page_index % 2 == 0;
    let blank_pages_before = match settings.placement {
        PagePlacement::Right if next_is_left => 1,
        PagePlacement::Left if !next_is_left => 1,
        _ => 0,
    };
    ChapterStart { blank_pages_before }
}

/// Content between two page-break markers, laid out continuously.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub paragraphs: Vec<Paragraph>,
}

impl Segment {
    fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        let text = paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n");
        Self { text, paragraphs }
    }
}

/// Splits block content at page-break markers. Whitespace-only segments are
/// dropped, so adjacent markers collapse into a single boundary.
pub fn plan_block_segments(raw_content: &str) -> Vec<Segment> {
    if styled::looks_like_envelope(raw_content)
        && let Ok(paragraphs) = styled::parse_envelope(raw_content)
    {
        return split_paragraphs(paragraphs)
            .into_iter()
            .filter(|paragraphs| !paragraphs.iter().all(Paragraph::is_blank))
            .map(Segment::from_paragraphs)
            .collect();
    }

    raw_content
        .split(PAGE_BREAK_MARKER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let paragraphs = styled::parse(part);
            Segment::from_paragraphs(paragraphs)
        })
        .collect()
}

/// Hard page boundaries a block contributes: one between consecutive segments.
pub fn page_breaks(segments: &[Segment]) -> usize {
    segments.len().saturating_sub(1)
}

/// Height of one `empty_lines_before` spacer line.
pub fn spacer_height(defaults: &TextDefaults) -> f64 {
    defaults.line_height * defaults.font_size
}

fn split_paragraphs(paragraphs: Vec<Paragraph>) -> Vec<Vec<Paragraph>> {
    let mut segments: Vec<Vec<Paragraph>> = vec![Vec::new()];

    for paragraph in paragraphs {
        let mut current = Paragraph::default();
        let mut saw_marker = false;

        for run in paragraph.runs {
            let mut pieces = run.text.split(PAGE_BREAK_MARKER);
            if let Some(first) = pieces.next()
                && !first.is_empty()
            {
                current.runs.push(run.with_text(first));
            }
            for piece in pieces {
                saw_marker = true;
                if !current.runs.is_empty()
                    && let Some(segment) = segments.last_mut()
                {
                    segment.push(std::mem::take(&mut current));
                }
                segments.push(Vec::new());
                if !piece.is_empty() {
                    current.runs.push(run.with_text(piece));
                }
            }
        }

        // Empty paragraphs are blank lines, unless a marker emptied them.
        if (!current.runs.is_empty() || !saw_marker)
            && let Some(segment) = segments.last_mut()
        {
            segment.push(current);
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoir_core::styled::{StyledRun, to_envelope};

    fn settings(placement: PagePlacement) -> ChapterSettings {
        ChapterSettings {
            placement,
            ..ChapterSettings::default()
        }
    }

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn always_right_inserts_filler_on_even_index() {
        let right = settings(PagePlacement::Right);
        assert_eq!(plan_chapter_start(&right, 2).blank_pages_before, 1);
        assert_eq!(plan_chapter_start(&right, 3).blank_pages_before, 0);
        assert_eq!(plan_chapter_start(&right, 0).blank_pages_before, 1);
    }

    #[test]
    fn always_left_inserts_filler_on_odd_index() {
        let left = settings(PagePlacement::Left);
        assert_eq!(plan_chapter_start(&left, 3).blank_pages_before, 1);
        assert_eq!(plan_chapter_start(&left, 4).blank_pages_before, 0);
    }

    #[test]
    fn either_never_inserts_filler() {
        let either = settings(PagePlacement::Either);
        for index in 0..4 {
            assert_eq!(plan_chapter_start(&either, index).blank_pages_before, 0);
        }
    }

    #[test]
    fn splits_on_each_marker() {
        let content = format!("A{PAGE_BREAK_MARKER}B{PAGE_BREAK_MARKER}C");
        let segments = plan_block_segments(&content);
        assert_eq!(texts(&segments), vec!["A", "B", "C"]);
        assert_eq!(page_breaks(&segments), 2);
    }

    #[test]
    fn adjacent_markers_collapse() {
        let content = format!("A{PAGE_BREAK_MARKER}{PAGE_BREAK_MARKER}B");
        let segments = plan_block_segments(&content);
        assert_eq!(texts(&segments), vec!["A", "B"]);
        assert_eq!(page_breaks(&segments), 1);
    }

    #[test]
    fn editor_inserted_marker_lines_are_trimmed() {
        let content = format!("Erster Teil\r\n{PAGE_BREAK_MARKER}\r\nZweiter Teil\r\n{PAGE_BREAK_MARKER}\r\n");
        let segments = plan_block_segments(&content);
        assert_eq!(texts(&segments), vec!["Erster Teil", "Zweiter Teil"]);
    }

    #[test]
    fn marker_must_match_verbatim() {
        let content = "A<!--PAGE_BREAK-->B<!-- page_break -->C";
        let segments = plan_block_segments(content);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, content);
    }

    #[test]
    fn empty_content_has_no_segments() {
        assert!(plan_block_segments("").is_empty());
        assert!(plan_block_segments(&format!(" {PAGE_BREAK_MARKER} ")).is_empty());
    }

    #[test]
    fn marker_inside_envelope_run_splits_structure() {
        let bold = StyledRun {
            bold: true,
            ..StyledRun::plain("")
        };
        let content = to_envelope(&[
            Paragraph {
                runs: vec![
                    bold.with_text("Vorher"),
                    StyledRun::plain(format!(" Ende{PAGE_BREAK_MARKER}Anfang")),
                ],
            },
            Paragraph::plain("Nachher"),
        ]);
        let segments = plan_block_segments(&content);
        assert_eq!(texts(&segments), vec!["Vorher Ende", "Anfang\nNachher"]);
        assert!(segments[0].paragraphs[0].runs[0].bold);
    }

    #[test]
    fn envelopes_separated_by_marker_parse_independently() {
        let first = to_envelope(&[Paragraph::plain("Eins")]);
        let second = to_envelope(&[Paragraph::plain("Zwei")]);
        let content = format!("{first}{PAGE_BREAK_MARKER}{second}");
        let segments = plan_block_segments(&content);
        assert_eq!(texts(&segments), vec!["Eins", "Zwei"]);
    }

    #[test]
    fn spacer_height_is_line_height_times_font_size() {
        let defaults = TextDefaults {
            font: "Georgia".to_string(),
            font_size: 12.0,
            line_height: 1.5,
        };
        assert_eq!(spacer_height(&defaults), 18.0);
    }
}
