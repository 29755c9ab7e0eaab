//! Variable substitution over a slide's shape tree.
//!
//! Each paragraph whose text contains `{{ ... }}` is evaluated against a
//! [`RenderContext`]. Plain results replace the paragraph text and keep the
//! first run's style; results containing markup go to the rich text
//! converter. Failures are logged and leave the paragraph as it was.

use minijinja::{Environment, ErrorKind, UndefinedBehavior};

use crate::context::RenderContext;
use crate::editor;
use crate::error::Result;
use crate::rich_text::{is_rich, EvidenceMap, RichTextConverter};
use crate::types::{Layout, Run, ShapeKind, ShapeNode, Slide, TextFrame};

const OPEN_DELIMITER: &str = "{{";
const CLOSE_DELIMITER: &str = "}}";
const NBSP: char = '\u{a0}';

/// Whether `text` contains both expression delimiters.
pub fn has_expression(text: &str) -> bool {
    text.contains(OPEN_DELIMITER) && text.contains(CLOSE_DELIMITER)
}

/// Everything a render pass reads.
#[derive(Clone, Copy)]
pub struct RenderScope<'a> {
    pub context: &'a RenderContext,
    pub converter: &'a dyn RichTextConverter,
    pub evidence: &'a EvidenceMap,
}

impl<'a> RenderScope<'a> {
    pub fn new(
        context: &'a RenderContext,
        converter: &'a dyn RichTextConverter,
        evidence: &'a EvidenceMap,
    ) -> Self {
        Self {
            context,
            converter,
            evidence,
        }
    }
}

/// Expression renderer with strict undefined handling.
pub struct VariableRenderer {
    env: Environment<'static>,
}

impl Default for VariableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    /// Render a standalone expression string.
    pub fn render_text(&self, source: &str, context: &RenderContext) -> Result<String> {
        Ok(self.evaluate(source, context)?)
    }

    fn evaluate(&self, source: &str, context: &RenderContext) -> std::result::Result<String, minijinja::Error> {
        self.env.render_str(source, context.to_template_value())
    }

    /// Render every top-level shape of a slide created from `layout`.
    pub fn render_slide(&self, slide: &mut Slide, layout: &Layout, scope: &RenderScope<'_>) {
        for shape in &mut slide.shapes {
            self.render_shape(shape, Some(layout), scope);
        }
    }

    /// Render one shape and everything below it.
    pub fn render_shape(&self, shape: &mut ShapeNode, layout: Option<&Layout>, scope: &RenderScope<'_>) {
        if let Some(layout) = layout {
            inherit_from_layout(shape, layout);
        }

        match &mut shape.kind {
            ShapeKind::Text(frame) => self.render_text_frame(frame, scope),
            ShapeKind::Table(table) => {
                for cell in table.iter_cells_mut() {
                    self.render_text_frame(&mut cell.text, scope);
                }
            }
            ShapeKind::Group(children) => {
                for child in children {
                    self.render_shape(child, layout, scope);
                }
            }
        }
    }

    /// Render each paragraph of a frame that existed before rendering.
    /// Paragraphs appended by the rich text converter are left alone.
    pub fn render_text_frame(&self, frame: &mut TextFrame, scope: &RenderScope<'_>) {
        let original_count = frame.paragraphs.len();
        let mut index = 0;
        for _ in 0..original_count {
            if self.render_paragraph(frame, index, scope) {
                index += 1;
            }
        }
    }

    /// Returns `false` when the paragraph was removed.
    fn render_paragraph(&self, frame: &mut TextFrame, index: usize, scope: &RenderScope<'_>) -> bool {
        let Some(paragraph) = frame.paragraphs.get(index) else {
            return false;
        };
        let source = paragraph.text().replace(NBSP, " ");
        if !has_expression(&source) {
            return true;
        }

        let rendered = match self.evaluate(&source, scope.context) {
            Ok(rendered) => rendered,
            Err(err) if err.kind() == ErrorKind::UndefinedError => {
                log::error!(
                    "Undefined variable in '{}': {}. Available context keys: {:?}",
                    preview(&source),
                    err,
                    scope.context.keys()
                );
                return true;
            }
            Err(err) => {
                log::warn!("Failed to render expression in paragraph '{}': {}", preview(&source), err);
                return true;
            }
        };

        if has_expression(&rendered) {
            log::warn!(
                "Variable may not have been replaced in '{}'. Available keys: {:?}",
                preview(&source),
                scope.context.keys()
            );
        }

        if is_rich(&rendered) {
            if let Some(paragraph) = frame.paragraphs.get_mut(index) {
                paragraph.runs.clear();
            }
            if let Err(err) = scope.converter.render(&rendered, frame, scope.evidence) {
                log::warn!("Failed to convert rich text in paragraph '{}': {}", preview(&source), err);
                return true;
            }
            let emptied = match frame.paragraphs.get(index) {
                Some(paragraph) => paragraph.text().trim().is_empty(),
                None => {
                    log::debug!("Rich text converter removed paragraph {}", index);
                    return false;
                }
            };
            if emptied {
                frame.paragraphs.remove(index);
                return false;
            }
            return true;
        }

        let Some(paragraph) = frame.paragraphs.get_mut(index) else {
            return false;
        };
        let style = editor::capture_style(paragraph);
        paragraph.runs.clear();
        let mut run = Run::new(rendered);
        if let Some(style) = style {
            editor::apply_style(&mut run, &style);
        }
        paragraph.runs.push(run);
        true
    }
}

/// Fill an empty slide placeholder with the matching layout placeholder's
/// text when that text holds expressions.
fn inherit_from_layout(shape: &mut ShapeNode, layout: &Layout) {
    let Some(idx) = shape.placeholder.as_ref().map(|p| p.idx) else {
        return;
    };
    if !shape.text_frame().is_some_and(TextFrame::is_blank) {
        return;
    }
    let Some(source) = layout.placeholder(idx).and_then(ShapeNode::text_frame) else {
        log::trace!("No layout text for placeholder {} on '{}'", idx, layout.name);
        return;
    };
    if !has_expression(&source.text()) {
        return;
    }
    if let Some(destination) = shape.text_frame_mut() {
        editor::copy_text_from_layout(destination, source);
        log::trace!("Inherited layout text for placeholder {} ('{}')", idx, shape.name);
    }
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}
