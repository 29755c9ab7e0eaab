//! Format-preserving text editing.
//!
//! These primitives replace or copy text while keeping run-level styling
//! (font, size, bold/italic/underline, color) and paragraph-level properties
//! (alignment, indent level). They only touch paragraphs and runs; shape
//! geometry, fills and shape properties are never modified here.

use crate::types::{Paragraph, Run, RunStyle, TextFrame};

/// Style of the paragraph's first run, if it has one.
pub fn capture_style(paragraph: &Paragraph) -> Option<RunStyle> {
    paragraph.runs.first().map(|r| r.style.clone())
}

/// Transplant a captured style onto a run.
pub fn apply_style(run: &mut Run, style: &RunStyle) {
    run.style = style.clone();
}

/// Replace the whole text of a frame, keeping the first run's formatting.
///
/// With a styled first run, that run keeps its style and receives `text`;
/// every other run and paragraph is removed. A first paragraph without runs
/// gets a default-styled run. An empty frame gets a new unstyled paragraph.
pub fn replace_text_preserving_format(frame: &mut TextFrame, text: &str) {
    let Some(first) = frame.paragraphs.first_mut() else {
        frame.paragraphs.push(Paragraph::with_text(text));
        return;
    };

    match capture_style(first) {
        Some(style) => {
            first.runs.clear();
            let mut run = Run::new(text);
            apply_style(&mut run, &style);
            first.runs.push(run);
        }
        None => set_paragraph_text(first, text),
    }

    frame.paragraphs.truncate(1);
}

/// Replace a paragraph's runs with one default-styled run. Paragraph
/// properties are kept.
pub fn set_paragraph_text(paragraph: &mut Paragraph, text: &str) {
    paragraph.runs.clear();
    paragraph.runs.push(Run::new(text));
}

/// Copy text and formatting from a layout frame into a slide frame.
///
/// The destination is cleared first. Its remaining empty paragraph receives
/// the first source paragraph; later source paragraphs are appended.
pub fn copy_text_from_layout(destination: &mut TextFrame, source: &TextFrame) {
    clear(destination);

    for (i, src_paragraph) in source.paragraphs.iter().enumerate() {
        let dest_paragraph = if i == 0 && !destination.paragraphs.is_empty() {
            &mut destination.paragraphs[0]
        } else {
            destination.paragraphs.push(Paragraph::new());
            let last = destination.paragraphs.len() - 1;
            &mut destination.paragraphs[last]
        };

        dest_paragraph.alignment = src_paragraph.alignment;
        dest_paragraph.level = src_paragraph.level;

        for src_run in &src_paragraph.runs {
            let mut run = Run::new(src_run.text.clone());
            apply_style(&mut run, &src_run.style);
            dest_paragraph.runs.push(run);
        }
    }
}

/// Append a paragraph at `level` with default run styling, so it picks up
/// the layout's default style for that level.
pub fn append_styled_paragraph<'a>(frame: &'a mut TextFrame, text: &str, level: u8) -> &'a mut Paragraph {
    let mut paragraph = Paragraph::with_text(text);
    paragraph.level = level.min(8);
    frame.paragraphs.push(paragraph);
    let last = frame.paragraphs.len() - 1;
    &mut frame.paragraphs[last]
}

/// Remove all text, leaving a single empty paragraph that keeps the first
/// paragraph's properties.
pub fn clear(frame: &mut TextFrame) {
    frame.paragraphs.truncate(1);
    match frame.paragraphs.first_mut() {
        Some(first) => first.runs.clear(),
        None => frame.paragraphs.push(Paragraph::new()),
    }
}

/// Remove the paragraph at `index`. Returns whether one was removed.
pub fn remove_paragraph(frame: &mut TextFrame, index: usize) -> bool {
    if index < frame.paragraphs.len() {
        frame.paragraphs.remove(index);
        true
    } else {
        log::warn!("Could not delete paragraph {} because it does not exist", index);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alignment, Color};

    fn bold_style() -> RunStyle {
        RunStyle {
            font_name: Some("Calibri".into()),
            size: Some(2400),
            bold: Some(true),
            color: Color::Rgb([0x2D, 0x28, 0x69]),
            ..RunStyle::default()
        }
    }

    fn styled_frame(text: &str, style: RunStyle) -> TextFrame {
        TextFrame {
            paragraphs: vec![Paragraph {
                runs: vec![Run::styled(text, style)],
                ..Paragraph::default()
            }],
            shrink_to_fit: false,
        }
    }

    #[test]
    fn test_replace_keeps_first_run_style() {
        let mut frame = styled_frame("Hello", bold_style());
        replace_text_preserving_format(&mut frame, "Goodbye");

        assert_eq!(frame.paragraphs.len(), 1);
        assert_eq!(frame.paragraphs[0].runs.len(), 1);
        let run = &frame.paragraphs[0].runs[0];
        assert_eq!(run.text, "Goodbye");
        assert_eq!(run.style.bold, Some(true));
        assert_eq!(run.style, bold_style());
    }

    #[test]
    fn test_replace_drops_extra_runs_and_paragraphs() {
        let mut frame = styled_frame("One", bold_style());
        frame.paragraphs[0].runs.push(Run::new(" two"));
        frame.paragraphs[0].alignment = Some(Alignment::Center);
        frame.paragraphs.push(Paragraph::with_text("second"));

        replace_text_preserving_format(&mut frame, "Only");

        assert_eq!(frame.text(), "Only");
        assert_eq!(frame.paragraphs[0].runs.len(), 1);
        assert_eq!(frame.paragraphs[0].alignment, Some(Alignment::Center));
    }

    #[test]
    fn test_replace_paragraph_without_runs() {
        let mut frame = TextFrame::new();
        replace_text_preserving_format(&mut frame, "Agenda");
        assert_eq!(frame.text(), "Agenda");
        assert_eq!(frame.paragraphs[0].runs[0].style, RunStyle::default());
    }

    #[test]
    fn test_replace_empty_frame() {
        let mut frame = TextFrame::empty();
        replace_text_preserving_format(&mut frame, "Created");
        assert_eq!(frame.paragraphs.len(), 1);
        assert_eq!(frame.text(), "Created");
    }

    #[test]
    fn test_copy_text_from_layout_matches_source() {
        let italic = RunStyle {
            italic: Some(true),
            underline: Some(true),
            color: Color::Theme("accent2".into()),
            ..RunStyle::default()
        };
        let source = TextFrame {
            paragraphs: vec![
                Paragraph {
                    runs: vec![Run::styled("Finding: ", bold_style()), Run::styled("{{ title }}", italic.clone())],
                    level: 0,
                    alignment: Some(Alignment::Left),
                    line_spacing: None,
                },
                Paragraph {
                    runs: vec![Run::styled("{{ severity }}", italic)],
                    level: 2,
                    alignment: Some(Alignment::Right),
                    line_spacing: None,
                },
            ],
            shrink_to_fit: false,
        };
        let mut destination = TextFrame::new();

        copy_text_from_layout(&mut destination, &source);

        assert_eq!(destination.paragraphs.len(), 2);
        for (dest, src) in destination.paragraphs.iter().zip(&source.paragraphs) {
            assert_eq!(dest.runs.len(), src.runs.len());
            assert_eq!(dest.level, src.level);
            assert_eq!(dest.alignment, src.alignment);
            for (d, s) in dest.runs.iter().zip(&src.runs) {
                assert_eq!(d.text, s.text);
                assert_eq!(d.style, s.style);
            }
        }
    }

    #[test]
    fn test_copy_text_replaces_existing_destination_text() {
        let mut destination = TextFrame::from_text("old\nlines");
        let source = TextFrame::from_text("new");
        copy_text_from_layout(&mut destination, &source);
        assert_eq!(destination.text(), "new");
    }

    #[test]
    fn test_append_styled_paragraph_uses_default_style() {
        let mut frame = styled_frame("Heading", bold_style());
        append_styled_paragraph(&mut frame, "bullet", 1);
        append_styled_paragraph(&mut frame, "deep", 12);

        assert_eq!(frame.paragraphs.len(), 3);
        assert_eq!(frame.paragraphs[1].level, 1);
        assert_eq!(frame.paragraphs[1].runs[0].style, RunStyle::default());
        assert_eq!(frame.paragraphs[2].level, 8);
    }

    #[test]
    fn test_clear_and_remove_paragraph() {
        let mut frame = TextFrame::from_text("a\nb\nc");
        clear(&mut frame);
        assert_eq!(frame.paragraphs.len(), 1);
        assert!(frame.paragraphs[0].runs.is_empty());

        assert!(remove_paragraph(&mut frame, 0));
        assert!(frame.paragraphs.is_empty());
        assert!(!remove_paragraph(&mut frame, 0));
    }
}
