//! Rich text (HTML) boundary.
//!
//! Report fields edited in the rich text editor arrive as HTML. The core
//! only decides *whether* a value is rich; turning the markup into slide
//! content is delegated to a [`RichTextConverter`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::report::Evidence;
use crate::types::{inches, Geometry, Paragraph, Run, RunStyle, ShapeKind, Slide, TextFrame};

/// Evidence attachments of a record, keyed by friendly name.
pub type EvidenceMap = HashMap<String, Evidence>;

/// Any start, end or self-closing tag.
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").unwrap());

/// Tag with captures for the closing slash and the element name.
static TAG_PARTS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)(?:\s[^<>]*)?/?>").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Evidence reference such as `{{.Screenshot 1}}` on a line of its own.
static EVIDENCE_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{\.(.+?)\}\}$").unwrap());

/// Top of the first evidence caption box.
const EVIDENCE_TOP_INCHES: f64 = 5.6;
const EVIDENCE_HEIGHT_INCHES: f64 = 0.4;

/// Converts rich text into slide content.
pub trait RichTextConverter {
    /// Append the content of `html` to `frame`.
    fn render(&self, html: &str, frame: &mut TextFrame, evidence: &EvidenceMap) -> Result<()>;

    /// Add an evidence attachment to a slide.
    fn insert_evidence(&self, slide: &mut Slide, evidence: &Evidence) -> Result<()>;
}

/// Index evidence by friendly name.
pub fn evidence_map<'a>(items: impl IntoIterator<Item = &'a Evidence>) -> EvidenceMap {
    items
        .into_iter()
        .map(|ev| (ev.friendly_name.clone(), ev.clone()))
        .collect()
}

/// Whether `text` contains at least one markup element.
pub fn is_rich(text: &str) -> bool {
    TAG_REGEX.is_match(text)
}

/// Remove every markup tag, keeping the text between them.
pub fn strip_tags(text: &str) -> String {
    TAG_REGEX.replace_all(text, "").into_owned()
}

/// Decode the character entities the editor produces.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';').filter(|&end| end <= 10) {
            Some(end) => match decode_entity(&tail[1..end]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Converter that keeps the text structure of rich text and drops
/// everything else. Block elements become paragraphs, list items are
/// indented by list depth, and bold/italic/underline carry over to runs.
/// Evidence is added as caption text boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextConverter;

impl PlainTextConverter {
    pub fn new() -> Self {
        Self
    }

    fn paragraphs(html: &str) -> Vec<Paragraph> {
        let mut builder = ParagraphBuilder::default();
        let mut last = 0;

        for caps in TAG_PARTS_REGEX.captures_iter(html) {
            let Some(whole) = caps.get(0) else { continue };
            builder.text(&html[last..whole.start()]);
            last = whole.end();

            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let name = caps
                .get(2)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();
            builder.tag(&name, closing);
        }
        builder.text(&html[last..]);
        builder.finish()
    }

    fn describe(evidence: &Evidence) -> String {
        match (evidence.friendly_name.is_empty(), evidence.caption.is_empty()) {
            (false, false) => format!("{}: {}", evidence.friendly_name, evidence.caption),
            (false, true) => evidence.friendly_name.clone(),
            _ => evidence.caption.clone(),
        }
    }
}

impl RichTextConverter for PlainTextConverter {
    fn render(&self, html: &str, frame: &mut TextFrame, evidence: &EvidenceMap) -> Result<()> {
        for mut paragraph in Self::paragraphs(html) {
            let text = paragraph.text();
            if let Some(caps) = EVIDENCE_REF_REGEX.captures(text.trim()) {
                let name = caps.get(1).map_or("", |m| m.as_str());
                match evidence.get(name) {
                    Some(ev) => paragraph.runs = vec![Run::new(format!("Evidence: {}", Self::describe(ev)))],
                    None => log::warn!("Rich text references unknown evidence '{}'", name),
                }
            }
            frame.paragraphs.push(paragraph);
        }
        Ok(())
    }

    fn insert_evidence(&self, slide: &mut Slide, evidence: &Evidence) -> Result<()> {
        let caption = Self::describe(evidence);
        if caption.is_empty() {
            return Err(Error::RichTextError(format!(
                "evidence '{}' has no name or caption",
                evidence.id
            )));
        }

        let existing = slide
            .shapes
            .iter()
            .filter(|s| s.name.starts_with("Evidence "))
            .count();
        let top = inches(EVIDENCE_TOP_INCHES + EVIDENCE_HEIGHT_INCHES * existing as f64);
        let geometry = Geometry::new(inches(1.0), top, inches(8.0), inches(EVIDENCE_HEIGHT_INCHES));

        slide.add_shape(
            format!("Evidence {}", existing + 1),
            Some(geometry),
            ShapeKind::Text(TextFrame::from_text(&caption)),
        );
        log::debug!("Added evidence caption '{}'", caption);
        Ok(())
    }
}

#[derive(Default)]
struct ParagraphBuilder {
    done: Vec<Paragraph>,
    current: Paragraph,
    list_depth: u8,
    bold: u32,
    italic: u32,
    underline: u32,
}

impl ParagraphBuilder {
    fn style(&self) -> RunStyle {
        let flag = |count: u32| (count > 0).then_some(true);
        RunStyle {
            bold: flag(self.bold),
            italic: flag(self.italic),
            underline: flag(self.underline),
            ..RunStyle::default()
        }
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        let collapsed = WHITESPACE_REGEX.replace_all(&decoded, " ");
        let text = if self.current.runs.is_empty() {
            collapsed.trim_start()
        } else {
            collapsed.as_ref()
        };
        if !text.is_empty() {
            let style = self.style();
            self.current.runs.push(Run::styled(text, style));
        }
    }

    fn tag(&mut self, name: &str, closing: bool) {
        match name {
            "b" | "strong" => adjust(&mut self.bold, closing),
            "i" | "em" => adjust(&mut self.italic, closing),
            "u" => adjust(&mut self.underline, closing),
            "ul" | "ol" => {
                self.flush();
                self.list_depth = if closing {
                    self.list_depth.saturating_sub(1)
                } else {
                    self.list_depth.saturating_add(1)
                };
            }
            "li" => {
                self.flush();
                if !closing {
                    self.current.level = self.list_depth.clamp(1, 8);
                }
            }
            "br" => {
                let level = self.current.level;
                self.flush();
                self.current.level = level;
            }
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "pre"
            | "tr" => self.flush(),
            "td" | "th" if closing => self.text(" "),
            _ => {}
        }
    }

    fn flush(&mut self) {
        let mut paragraph = std::mem::take(&mut self.current);
        if let Some(last) = paragraph.runs.last_mut() {
            let trimmed = last.text.trim_end().len();
            last.text.truncate(trimmed);
        }
        paragraph.runs.retain(|r| !r.text.is_empty());
        if !paragraph.runs.is_empty() {
            self.done.push(paragraph);
        }
    }

    fn finish(mut self) -> Vec<Paragraph> {
        self.flush();
        self.done
    }
}

fn adjust(counter: &mut u32, closing: bool) {
    if closing {
        *counter = counter.saturating_sub(1);
    } else {
        *counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(html: &str) -> TextFrame {
        let mut frame = TextFrame::empty();
        PlainTextConverter::new()
            .render(html, &mut frame, &EvidenceMap::new())
            .unwrap();
        frame
    }

    #[test]
    fn test_is_rich_detects_elements() {
        assert!(is_rich("<p>Hello</p>"));
        assert!(is_rich("line<br/>break"));
        assert!(is_rich("</span>"));
        assert!(!is_rich("a < b and c > d"));
        assert!(!is_rich("Plain text"));
    }

    #[test]
    fn test_strip_tags_and_decode_entities() {
        assert_eq!(strip_tags("<p>Use <b>MFA</b></p>"), "Use MFA");
        assert_eq!(decode_entities("Tom &amp; Jerry &lt;3 &#39;x&#x27;"), "Tom & Jerry <3 'x'");
        assert_eq!(decode_entities("AT&T; & more"), "AT&T; & more");
    }

    #[test]
    fn test_render_paragraphs_and_lists() {
        let frame = render("<p>Intro text</p><ul><li>First</li><li>Second<ul><li>Nested</li></ul></li></ul>");
        let texts: Vec<String> = frame.paragraphs.iter().map(Paragraph::text).collect();
        assert_eq!(texts, vec!["Intro text", "First", "Second", "Nested"]);
        assert_eq!(frame.paragraphs[0].level, 0);
        assert_eq!(frame.paragraphs[1].level, 1);
        assert_eq!(frame.paragraphs[3].level, 2);
    }

    #[test]
    fn test_render_inline_formatting() {
        let frame = render("<p>Enable <strong>MFA</strong> <em>now</em></p>");
        let runs = &frame.paragraphs[0].runs;
        assert_eq!(frame.paragraphs[0].text(), "Enable MFA now");
        assert_eq!(runs[1].text, "MFA");
        assert_eq!(runs[1].style.bold, Some(true));
        assert_eq!(runs[0].style.bold, None);
        assert_eq!(runs.last().unwrap().style.italic, Some(true));
    }

    #[test]
    fn test_render_resolves_evidence_reference() {
        let ev = Evidence {
            id: "7".into(),
            friendly_name: "Screenshot 1".into(),
            caption: "Domain admin shell".into(),
            path: "evidence/shot.png".into(),
        };
        let map = evidence_map([&ev]);
        let mut frame = TextFrame::empty();
        PlainTextConverter
            .render("<p>{{.Screenshot 1}}</p><p>{{.Missing}}</p>", &mut frame, &map)
            .unwrap();
        assert_eq!(frame.paragraphs[0].text(), "Evidence: Screenshot 1: Domain admin shell");
        assert_eq!(frame.paragraphs[1].text(), "{{.Missing}}");
    }

    #[test]
    fn test_insert_evidence_stacks_captions() {
        let mut slide = Slide::default();
        let ev = Evidence {
            friendly_name: "Screenshot".into(),
            ..Evidence::default()
        };
        PlainTextConverter.insert_evidence(&mut slide, &ev).unwrap();
        PlainTextConverter.insert_evidence(&mut slide, &ev).unwrap();

        assert_eq!(slide.shapes.len(), 2);
        assert_eq!(slide.shapes[1].name, "Evidence 2");
        let first = slide.shapes[0].geometry.unwrap();
        let second = slide.shapes[1].geometry.unwrap();
        assert!(second.y > first.y);
        assert!(PlainTextConverter.insert_evidence(&mut slide, &Evidence::default()).is_err());
    }
}
