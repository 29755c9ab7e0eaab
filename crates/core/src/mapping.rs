//! Slide mapping configuration.
//!
//! A mapping document assigns each logical slide type a template layout, a
//! render mode, an enabled flag and a position. Mappings are edited by users
//! and stored apart from the template, so everything here degrades to safe
//! defaults instead of failing an export.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Layout index of the title layout in the default mapping.
pub const LAYOUT_TITLE: usize = 0;

/// Layout index of the "Title and Content" layout in the default mapping.
pub const LAYOUT_TITLE_AND_CONTENT: usize = 1;

/// Layout index of the closing layout in the default mapping.
pub const LAYOUT_FINAL: usize = 12;

/// Prefix that marks user-defined slide types.
pub const CUSTOM_PREFIX: &str = "custom_";

/// Slide types that should always be present and enabled.
pub const REQUIRED_SLIDE_TYPES: &[&str] = &["title", "final"];

/// Known slide types and their display labels, in default order.
pub const SLIDE_TYPES: &[(&str, &str)] = &[
    // Project slides
    ("title", "Title Slide"),
    ("agenda", "Agenda"),
    ("introduction", "Team Introduction"),
    ("assessment_details", "Assessment Details"),
    ("methodology", "Methodology"),
    ("timeline", "Assessment Timeline"),
    ("attack_path", "Attack Path Overview"),
    // Report slides
    ("observations_overview", "Positive Observations Overview"),
    ("observation", "Individual Observation Slide"),
    ("findings_overview", "Findings Overview"),
    ("finding", "Individual Finding Slide"),
    ("recommendations", "Recommendations"),
    ("next_steps", "Next Steps"),
    ("final", "Final/Closing Slide"),
];

/// Display label of a known slide type.
pub fn slide_type_label(slide_type: &str) -> Option<&'static str> {
    SLIDE_TYPES
        .iter()
        .find(|(tag, _)| *tag == slide_type)
        .map(|(_, label)| *label)
}

/// Whether `slide_type` is a built-in type or a `custom_` tag.
pub fn is_known_slide_type(slide_type: &str) -> bool {
    slide_type_label(slide_type).is_some() || slide_type.starts_with(CUSTOM_PREFIX)
}

/// How a slide is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlideMode {
    /// Clone the layout and substitute embedded expressions.
    Static,
    /// Build the slide content field by field.
    Dynamic,
    /// Unrecognized mode string, kept so validation can report it.
    Other(String),
}

impl SlideMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Other(other) => other.as_str(),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static)
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for SlideMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "static" => Self::Static,
            "dynamic" => Self::Dynamic,
            _ => Self::Other(value),
        }
    }
}

impl From<SlideMode> for String {
    fn from(mode: SlideMode) -> Self {
        mode.as_str().to_string()
    }
}

fn default_enabled() -> bool {
    true
}

/// Configuration of one slide type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideTypeConfig {
    /// Slide type tag.
    #[serde(rename = "type")]
    pub slide_type: String,

    /// Layout index in the bound template.
    pub layout_index: usize,

    /// Render mode.
    pub mode: SlideMode,

    /// Disabled slide types are not generated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Sort key for slide order.
    pub position: i64,
}

impl SlideTypeConfig {
    /// An enabled slide type configuration.
    pub fn new(slide_type: impl Into<String>, layout_index: usize, mode: SlideMode, position: i64) -> Self {
        Self {
            slide_type: slide_type.into(),
            layout_index,
            mode,
            enabled: true,
            position,
        }
    }
}

fn default_version() -> i64 {
    1
}

/// A versioned, ordered list of slide type configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default = "default_version")]
    pub version: i64,
    pub slides: Vec<SlideTypeConfig>,
}

impl Default for MappingDocument {
    /// The built-in mapping: every known slide type, dynamic, in order.
    fn default() -> Self {
        let slides = SLIDE_TYPES
            .iter()
            .enumerate()
            .map(|(i, (tag, _))| {
                let layout_index = match *tag {
                    "title" => LAYOUT_TITLE,
                    "final" => LAYOUT_FINAL,
                    _ => LAYOUT_TITLE_AND_CONTENT,
                };
                SlideTypeConfig::new(*tag, layout_index, SlideMode::Dynamic, i as i64 + 1)
            })
            .collect();

        Self { version: 1, slides }
    }
}

/// Result of parsing a persisted mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingOutcome {
    /// The document parsed. `skipped` describes entries that were dropped.
    Parsed {
        document: MappingDocument,
        skipped: Vec<String>,
    },
    /// The document was structurally unusable and the built-in default
    /// replaces it.
    Defaulted { reason: String },
}

impl MappingOutcome {
    /// The mapping to use.
    pub fn into_document(self) -> MappingDocument {
        match self {
            Self::Parsed { document, .. } => document,
            Self::Defaulted { .. } => MappingDocument::default(),
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }
}

/// Parse persisted mapping data.
///
/// Structural failures (no data, not an object, no `slides` sequence) and a
/// non-empty `slides` sequence with no parseable entry fall back to the
/// built-in default. Individual entries that fail to parse are skipped.
pub fn parse_mapping(data: Option<&Value>) -> MappingOutcome {
    let Some(object) = data.and_then(Value::as_object) else {
        return MappingOutcome::Defaulted {
            reason: "mapping data is missing or not an object".to_string(),
        };
    };

    let Some(entries) = object.get("slides").and_then(Value::as_array) else {
        return MappingOutcome::Defaulted {
            reason: "mapping data has no slides sequence".to_string(),
        };
    };

    let version = object
        .get("version")
        .and_then(Value::as_i64)
        .unwrap_or_else(default_version);

    let mut slides = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for entry in entries {
        match serde_json::from_value::<SlideTypeConfig>(entry.clone()) {
            Ok(config) => slides.push(config),
            Err(e) => skipped.push(format!("{}: {}", entry, e)),
        }
    }

    if slides.is_empty() && !entries.is_empty() {
        return MappingOutcome::Defaulted {
            reason: format!("none of the {} slide entries could be parsed", entries.len()),
        };
    }

    MappingOutcome::Parsed {
        document: MappingDocument { version, slides },
        skipped,
    }
}

/// Warnings and errors from validating a mapping or template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    /// Append the findings of another report.
    pub fn extend(&mut self, other: ValidationReport) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    /// Split into `(warnings, errors)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.warnings, self.errors)
    }
}

/// Resolves slide types against a mapping document and, optionally, the
/// layout count of the bound template.
#[derive(Debug, Clone)]
pub struct MappingManager {
    document: MappingDocument,
    layout_count: Option<usize>,
}

impl Default for MappingManager {
    fn default() -> Self {
        Self::from_document(MappingDocument::default())
    }
}

impl MappingManager {
    /// Build a manager from persisted mapping data, falling back to the
    /// default mapping when the data is unusable.
    pub fn new(data: Option<&Value>) -> Self {
        let outcome = parse_mapping(data);
        match &outcome {
            MappingOutcome::Defaulted { reason } => {
                log::warn!("Invalid or missing slide mapping data ({}), using defaults", reason);
            }
            MappingOutcome::Parsed { skipped, .. } => {
                for entry in skipped {
                    log::warn!("Failed to parse slide config, skipping: {}", entry);
                }
            }
        }
        Self::from_document(outcome.into_document())
    }

    /// Build a manager over an already-parsed document.
    pub fn from_document(document: MappingDocument) -> Self {
        Self {
            document,
            layout_count: None,
        }
    }

    /// Bind the manager to a template with `count` layouts.
    pub fn with_layout_count(mut self, count: usize) -> Self {
        self.bind_layout_count(count);
        self
    }

    /// Bind an existing manager to a template with `count` layouts.
    pub fn bind_layout_count(&mut self, count: usize) {
        self.layout_count = Some(count);
    }

    /// Layout count of the bound template, if bound.
    pub fn layout_count(&self) -> Option<usize> {
        self.layout_count
    }

    /// All configured slide types in document order.
    pub fn slides(&self) -> &[SlideTypeConfig] {
        &self.document.slides
    }

    pub fn version(&self) -> i64 {
        self.document.version
    }

    /// First configuration for `slide_type`.
    pub fn resolve(&self, slide_type: &str) -> Option<&SlideTypeConfig> {
        self.document
            .slides
            .iter()
            .find(|s| s.slide_type == slide_type)
    }

    /// Layout index for a slide type, or `fallback` when the type is
    /// unknown, disabled, or points past the template's layouts.
    pub fn layout_index_for(&self, slide_type: &str, fallback: usize) -> usize {
        match self.resolve(slide_type) {
            Some(config) => self.checked_layout_index(config, fallback),
            None => {
                log::warn!(
                    "Slide type '{}' is not mapped. Falling back to layout {}.",
                    slide_type,
                    fallback
                );
                fallback
            }
        }
    }

    /// Layout index of a specific configuration entry with the same fallback
    /// rules as [`MappingManager::layout_index_for`].
    pub fn checked_layout_index(&self, config: &SlideTypeConfig, fallback: usize) -> usize {
        if !config.enabled {
            log::warn!(
                "Slide type '{}' is disabled. Falling back to layout {}.",
                config.slide_type,
                fallback
            );
            return fallback;
        }

        if let Some(layout_count) = self.layout_count {
            if config.layout_index >= layout_count {
                log::warn!(
                    "Layout index {} for slide type '{}' exceeds available layouts ({}). Falling back to layout {}.",
                    config.layout_index,
                    config.slide_type,
                    layout_count,
                    fallback
                );
                return fallback;
            }
        }

        config.layout_index
    }

    /// Whether a slide type is enabled. Unmapped types count as enabled.
    pub fn enabled(&self, slide_type: &str) -> bool {
        self.resolve(slide_type).map_or(true, |c| c.enabled)
    }

    /// Enabled slide types sorted by position. Ties keep document order.
    pub fn ordered_enabled_slides(&self) -> Vec<&SlideTypeConfig> {
        let mut enabled: Vec<&SlideTypeConfig> =
            self.document.slides.iter().filter(|s| s.enabled).collect();
        enabled.sort_by_key(|s| s.position);
        enabled
    }

    /// Check the mapping for problems without changing it.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let slides = &self.document.slides;

        let mut seen = HashSet::new();
        let has_duplicates = slides
            .iter()
            .filter(|s| s.enabled)
            .any(|s| !seen.insert(s.position));
        if has_duplicates {
            report
                .warnings
                .push("Duplicate position values found in slide mapping".to_string());
        }

        for slide in slides {
            if !is_known_slide_type(&slide.slide_type) {
                report
                    .warnings
                    .push(format!("Unknown slide type: {}", slide.slide_type));
            }
        }

        for slide in slides {
            if !slide.mode.is_valid() {
                report.errors.push(format!(
                    "Invalid mode '{}' for slide type {}",
                    slide.mode.as_str(),
                    slide.slide_type
                ));
            }
        }

        if let Some(layout_count) = self.layout_count {
            for slide in slides {
                if slide.enabled && slide.layout_index >= layout_count {
                    report.errors.push(format!(
                        "Layout index {} for slide type '{}' exceeds available layouts (0-{})",
                        slide.layout_index,
                        slide.slide_type,
                        layout_count.saturating_sub(1)
                    ));
                }
            }
        }

        for required in REQUIRED_SLIDE_TYPES {
            if !self.resolve(required).is_some_and(|c| c.enabled) {
                report
                    .warnings
                    .push(format!("Required slide type '{}' is not enabled", required));
            }
        }

        report
    }

    /// The mapping document as stored.
    pub fn to_document(&self) -> MappingDocument {
        self.document.clone()
    }

    /// The mapping as a JSON value of the persisted shape.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "version": self.document.version,
            "slides": self.document.slides,
        })
    }
}
