//! Template linting.

use std::path::Path;

use serde_json::Value;

use crate::error::Error;
use crate::mapping::{MappingManager, ValidationReport};
use crate::package::TemplateLoader;

pub const MSG_TEMPLATE_MISSING: &str = "Template file does not exist – upload it again";
pub const MSG_TEMPLATE_HAS_SLIDES: &str = "Template contains slides. If using static slide layouts, this is acceptable. Ensure your slide master contains the layouts you want to reference.";
pub const MSG_UNEXPECTED: &str = "Template rendering failed unexpectedly";

/// Check a template and an optional slide mapping.
///
/// Never fails: every problem, including an unreadable template, ends up in
/// the returned report.
pub fn lint(loader: &dyn TemplateLoader, template: &Path, mapping: Option<&Value>) -> ValidationReport {
    let mut report = ValidationReport::new();

    if !template.exists() {
        log::error!("Template file path did not exist: {}", template.display());
        report.errors.push(MSG_TEMPLATE_MISSING.to_string());
        return report;
    }

    match loader.load(template) {
        Ok(deck) => {
            let slide_count = deck.template_slides.len();
            log::info!("Slide count was {}", slide_count);
            if slide_count > 0 {
                report.warnings.push(MSG_TEMPLATE_HAS_SLIDES.to_string());
            }

            if let Some(data) = mapping {
                let manager = MappingManager::new(Some(data)).with_layout_count(deck.layout_count());
                report.extend(manager.validate());
            }
        }
        Err(err @ (Error::TemplateMissing(_) | Error::TemplateLoad(_))) => {
            log::error!("Template failed linting: {}", err);
            report.errors.push(format!("Linting failed: {}", err));
        }
        Err(err) => {
            log::error!("Template failed linting: {}", err);
            report.errors.push(MSG_UNEXPECTED.to_string());
        }
    }

    log::info!(
        "Linting finished: {} warnings, {} errors",
        report.warnings.len(),
        report.errors.len()
    );
    report
}
