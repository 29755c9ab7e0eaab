//! Slide assembly.
//!
//! [`SlideOrchestrator`] walks the enabled slide types in position order and
//! creates each slide either statically (clone a layout and render its
//! expressions) or dynamically (build the content in code). A footer pass
//! then runs over the generated slides.

mod footers;
mod project;
mod report;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::Value;

use crate::context::RenderContext;
use crate::editor;
use crate::error::{Error, Result};
use crate::mapping::{is_known_slide_type, MappingManager, SlideTypeConfig, LAYOUT_TITLE_AND_CONTENT};
use crate::package::{DeckSerializer, TemplateLoader};
use crate::render::{RenderScope, VariableRenderer};
use crate::report::{ExportSettings, ReportData};
use crate::rich_text::{EvidenceMap, RichTextConverter};
use crate::types::{
    inches, Alignment, Deck, Geometry, PlaceholderKind, ShapeKind, Slide, Table, TextFrame,
    VerticalAnchor,
};

pub use footers::process_footers;

/// Slide types produced by project exports.
pub const PROJECT_SLIDE_TYPES: &[&str] = &[
    "title",
    "agenda",
    "introduction",
    "assessment_details",
    "methodology",
    "timeline",
    "attack_path",
];

/// Slide types that create one slide per record and have no static form.
const REPEATED_SLIDE_TYPES: &[&str] = &["observation", "finding"];

/// Header fill of generated tables.
const TABLE_HEADER_FILL: [u8; 3] = [0x2D, 0x28, 0x69];

/// Which record an export is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportKind {
    /// A full report: every built-in slide type.
    #[default]
    Report,
    /// A project: only the project slide types.
    Project,
}

impl ExportKind {
    /// Whether this export has a builder for `slide_type`.
    pub fn handles(&self, slide_type: &str) -> bool {
        match self {
            ExportKind::Report => is_known_slide_type(slide_type),
            ExportKind::Project => PROJECT_SLIDE_TYPES.contains(&slide_type),
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportKind::Report => write!(f, "report"),
            ExportKind::Project => write!(f, "project"),
        }
    }
}

impl FromStr for ExportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(ExportKind::Report),
            "project" => Ok(ExportKind::Project),
            other => Err(Error::ConfigError(format!("Unknown export kind: {}", other))),
        }
    }
}

/// Builds the slides of one export job. Owns the deck until [`finish`].
///
/// [`finish`]: SlideOrchestrator::finish
pub struct SlideOrchestrator<'a> {
    deck: Deck,
    mapping: MappingManager,
    data: &'a ReportData,
    settings: &'a ExportSettings,
    converter: &'a dyn RichTextConverter,
    renderer: VariableRenderer,
    global: RenderContext,
    today: NaiveDate,
}

impl<'a> SlideOrchestrator<'a> {
    /// Create an orchestrator over a loaded deck. The mapping is bound to the
    /// deck's layout count.
    pub fn new(
        deck: Deck,
        mut mapping: MappingManager,
        data: &'a ReportData,
        settings: &'a ExportSettings,
        converter: &'a dyn RichTextConverter,
    ) -> Self {
        mapping.bind_layout_count(deck.layout_count());
        let today = chrono::Local::now().date_naive();
        Self {
            global: RenderContext::global(data, settings, today),
            deck,
            mapping,
            data,
            settings,
            converter,
            renderer: VariableRenderer::new(),
            today,
        }
    }

    /// Use a fixed date instead of today.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self.global = RenderContext::global(self.data, self.settings, today);
        self
    }

    pub fn mapping(&self) -> &MappingManager {
        &self.mapping
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Create every enabled slide, then add footers.
    pub fn build(&mut self, kind: ExportKind) {
        let configs: Vec<SlideTypeConfig> = self
            .mapping
            .ordered_enabled_slides()
            .into_iter()
            .cloned()
            .collect();

        log::info!("Building {} export with {} slide types", kind, configs.len());
        for config in &configs {
            self.process(kind, config);
        }

        process_footers(&mut self.deck, self.settings, self.today);
    }

    /// Give up ownership of the deck.
    pub fn finish(self) -> Deck {
        self.deck
    }

    /// Build all slides and return the finished deck.
    pub fn run(mut self, kind: ExportKind) -> Deck {
        self.build(kind);
        self.finish()
    }

    /// Build all slides and serialize the finished deck.
    pub fn export(self, kind: ExportKind, serializer: &dyn DeckSerializer) -> Result<Vec<u8>> {
        let deck = self.run(kind);
        serializer.serialize(&deck)
    }

    fn process(&mut self, kind: ExportKind, config: &SlideTypeConfig) {
        let slide_type = config.slide_type.as_str();

        if !kind.handles(slide_type) {
            if config.mode.is_static() {
                self.create_static_slide(config);
            } else {
                log::debug!("No dynamic builder for slide type '{}', skipping", slide_type);
            }
            return;
        }

        if config.mode.is_static() {
            if REPEATED_SLIDE_TYPES.contains(&slide_type) {
                log::debug!("Slide type '{}' has no static form, skipping", slide_type);
            } else {
                self.create_static_slide(config);
            }
            return;
        }

        match slide_type {
            "title" => self.build_title(config),
            "agenda" => self.build_agenda(config),
            "introduction" => self.build_introduction(config),
            "assessment_details" => self.build_assessment_details(config),
            "methodology" => self.build_title_only(config, "Methodology"),
            "timeline" => self.build_timeline(config),
            "attack_path" => self.build_title_only(config, "Attack Path Overview"),
            "observations_overview" => self.build_observations_overview(config),
            "observation" => self.build_observations(config),
            "findings_overview" => self.build_findings_overview(config),
            "finding" => self.build_findings(config),
            "recommendations" => self.build_title_only(config, "Recommendations"),
            "next_steps" => self.build_title_only(config, "Next Steps"),
            "final" => self.build_final(config),
            other => log::debug!("No dynamic builder for slide type '{}', skipping", other),
        }
    }

    /// Add a slide on the configured layout. Returns its index in the deck's
    /// generated slides.
    fn add_slide(&mut self, config: &SlideTypeConfig) -> Option<usize> {
        let layout_index = self
            .mapping
            .checked_layout_index(config, LAYOUT_TITLE_AND_CONTENT);
        let index = self.deck.add_slide(layout_index);
        if index.is_none() {
            log::warn!(
                "Layout {} for slide type '{}' does not exist, skipping slide",
                layout_index,
                config.slide_type
            );
        }
        index
    }

    /// Clone the configured layout and render it with the global context.
    fn create_static_slide(&mut self, config: &SlideTypeConfig) {
        let Some(index) = self.add_slide(config) else {
            return;
        };
        let evidence = EvidenceMap::new();
        let scope = RenderScope::new(&self.global, self.converter, &evidence);
        if let Some((slide, layout)) = self.deck.slide_with_layout_mut(index) {
            self.renderer.render_slide(slide, layout, &scope);
        }
    }

    fn build_title_only(&mut self, config: &SlideTypeConfig, title: &str) {
        let Some(index) = self.add_slide(config) else {
            return;
        };
        set_title(&mut self.deck.slides[index], title);
    }
}

/// Title shape: the title placeholder, else placeholder idx 0.
pub(crate) fn title_index(slide: &Slide) -> Option<usize> {
    slide
        .shapes
        .iter()
        .position(|s| {
            matches!(
                s.placeholder.as_ref().map(|p| &p.kind),
                Some(PlaceholderKind::Title | PlaceholderKind::CenterTitle)
            )
        })
        .or_else(|| slide.placeholder_index(0))
}

/// Body shape: placeholder idx 1, else the first text shape that is not
/// the title.
pub(crate) fn body_index(slide: &Slide) -> Option<usize> {
    if let Some(index) = slide.placeholder_index(1) {
        return Some(index);
    }
    let title = title_index(slide);
    slide
        .shapes
        .iter()
        .enumerate()
        .find(|(i, s)| Some(*i) != title && s.text_frame().is_some())
        .map(|(i, _)| i)
}

fn frame_at(slide: &mut Slide, index: usize) -> Option<&mut TextFrame> {
    slide.shapes.get_mut(index)?.text_frame_mut()
}

/// Replace the title text, keeping its formatting.
fn set_title(slide: &mut Slide, text: &str) {
    match title_index(slide).and_then(|i| frame_at(slide, i)) {
        Some(frame) => editor::replace_text_preserving_format(frame, text),
        None => log::debug!("Slide has no title placeholder for '{}'", text),
    }
}

/// The body text frame, set to shrink text on overflow.
fn body_frame(slide: &mut Slide) -> Option<&mut TextFrame> {
    let index = body_index(slide)?;
    let frame = frame_at(slide, index)?;
    frame.shrink_to_fit = true;
    Some(frame)
}

/// Build a table with a filled header row and `rows` empty body rows.
fn header_table(headers: &[&str], widths_inches: &[f64], rows: usize) -> Table {
    let mut table = Table::new(rows + 1, headers.len(), inches(8.0));
    table.column_widths = widths_inches.iter().map(|w| inches(*w)).collect();
    for (column, header) in headers.iter().enumerate() {
        if let Some(cell) = table.cell_mut(0, column) {
            cell.set_text(header);
            cell.fill = Some(TABLE_HEADER_FILL);
        }
    }
    table
}

/// Center every cell horizontally and vertically.
fn center_cells(table: &mut Table) {
    for cell in table.iter_cells_mut() {
        if let Some(paragraph) = cell.text.paragraphs.first_mut() {
            paragraph.alignment = Some(Alignment::Center);
        }
        cell.anchor = Some(VerticalAnchor::Middle);
    }
}

/// Add a table at the standard position.
fn add_table(slide: &mut Slide, table: Table) -> usize {
    let name = format!("Table {}", slide.next_shape_id() - 1);
    let geometry = Geometry::new(inches(1.5), inches(2.0), inches(8.0), inches(0.8));
    slide.add_shape(name, Some(geometry), ShapeKind::Table(table))
}

/// Everything needed to run one export end to end.
#[derive(Debug, Clone, Copy)]
pub struct ExportJob<'a> {
    pub template: &'a Path,
    pub mapping: Option<&'a Value>,
    pub data: &'a ReportData,
    pub settings: &'a ExportSettings,
    pub kind: ExportKind,
    /// Date used for generated dates; `None` means today.
    pub today: Option<NaiveDate>,
}

/// Load the template, build every slide and serialize the result.
///
/// Template load failures and serialization failures are returned; every
/// other problem is logged and worked around.
pub fn export_deck(
    job: &ExportJob<'_>,
    loader: &dyn TemplateLoader,
    serializer: &dyn DeckSerializer,
    converter: &dyn RichTextConverter,
) -> Result<Vec<u8>> {
    let deck = match loader.load(job.template) {
        Ok(deck) => deck,
        Err(err) if err.is_template_missing() => {
            log::error!("Template document could not be loaded: {}", err);
            return Err(err);
        }
        Err(err) => {
            log::error!(
                "Failed to load template {}: {:?}",
                job.template.display(),
                err
            );
            return Err(err);
        }
    };
    log::debug!(
        "Loaded template with {} layouts and {} slides",
        deck.layout_count(),
        deck.template_slides.len()
    );

    let mapping = MappingManager::new(job.mapping);
    let mut orchestrator = SlideOrchestrator::new(deck, mapping, job.data, job.settings, converter);
    if let Some(today) = job.today {
        orchestrator = orchestrator.with_today(today);
    }
    orchestrator.export(job.kind, serializer)
}
