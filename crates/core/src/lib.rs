//! Slide mapping, format-preserving text editing, expression rendering and
//! deck assembly for report outbrief presentations.

pub mod context;
pub mod editor;
pub mod error;
pub mod lint;
pub mod mapping;
pub mod notes;
pub mod orchestrator;
pub mod package;
pub mod render;
pub mod report;
pub mod rich_text;
pub mod types;

pub use context::RenderContext;
pub use error::{Error, Result};
pub use lint::lint;
pub use mapping::{MappingDocument, MappingManager, SlideMode, SlideTypeConfig, ValidationReport};
pub use orchestrator::{export_deck, ExportJob, ExportKind, SlideOrchestrator};
pub use package::{DeckSerializer, TemplateLoader};
pub use render::VariableRenderer;
pub use report::{ExportSettings, ReportData, ReportDate};
pub use rich_text::{PlainTextConverter, RichTextConverter};
pub use types::{Deck, Layout, ShapeKind, ShapeNode, Slide, TextFrame};
