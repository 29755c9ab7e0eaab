//! Footer, date and slide number pass over generated slides.

use chrono::NaiveDate;

use crate::editor;
use crate::report::ExportSettings;
use crate::types::{Deck, Layout, Run, ShapeKind, ShapeNode, TextField, TextFrame};

/// Layout placeholders relevant to the footer pass, by position in the
/// layout's placeholder list. Later matches win.
#[derive(Debug, Default, PartialEq, Eq)]
struct FooterPlaceholders {
    footer: Option<usize>,
    slide_number: Option<usize>,
    date: Option<usize>,
}

impl FooterPlaceholders {
    fn find(layout: &Layout) -> Self {
        let mut found = Self::default();
        for (position, placeholder) in layout.placeholders().enumerate() {
            if placeholder.name.contains("Footer") {
                found.footer = Some(position);
            }
            if placeholder.name.contains("Slide Number") {
                found.slide_number = Some(position);
            }
            if placeholder.name.contains("Date") {
                found.date = Some(position);
            }
        }
        found
    }
}

/// Add footer text, a slide number field and today's date to every
/// generated slide except the first slide of the deck. Only placeholders the
/// slide's layout defines are added; one at position 0 of the layout's
/// placeholder list is never cloned.
pub fn process_footers(deck: &mut Deck, settings: &ExportSettings, today: NaiveDate) {
    let offset = deck.template_slides.len();
    let date = settings.format_date(today);
    let Deck { layouts, slides, .. } = deck;

    for (i, slide) in slides.iter_mut().enumerate() {
        let slide_number = offset + i + 1;
        if slide_number == 1 {
            continue;
        }
        let Some(layout) = layouts.get(slide.layout_index) else {
            continue;
        };
        let placeholders: Vec<&ShapeNode> = layout.placeholders().collect();
        let found = FooterPlaceholders::find(layout);
        let usable = |position: Option<usize>| {
            position
                .filter(|&p| p > 0)
                .and_then(|p| placeholders.get(p).copied())
        };

        if let Some(source) = usable(found.footer) {
            let index = slide.clone_placeholder(source);
            if let (Some(destination), Some(text)) =
                (slide.shapes[index].text_frame_mut(), source.text_frame())
            {
                editor::copy_text_from_layout(destination, text);
            }
        }

        if let Some(source) = usable(found.slide_number) {
            let index = slide.clone_placeholder(source);
            if let Some(frame) = slide.shapes[index].text_frame_mut() {
                if let Some(paragraph) = frame.paragraphs.first_mut() {
                    paragraph
                        .runs
                        .push(Run::field(TextField::SlideNumber, slide_number.to_string()));
                }
            }
        }

        if let Some(source) = usable(found.date) {
            let index = slide.clone_placeholder(source);
            slide.shapes[index].kind = ShapeKind::Text(TextFrame::from_text(&date));
        }
    }
}
