//! Template loading.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use outbrief_core::types::{Deck, Layout, TemplateSlide};
use outbrief_core::{Error, Result, TemplateLoader};

use crate::drawing::parse_shape_tree;
use crate::package::{by_id, rel_type, Package, Relationship, PRESENTATION};
use crate::xml::Element;

/// Loads `.pptx` templates into a [`Deck`].
pub struct PptxReader;

impl PptxReader {
    /// Create a new PPTX reader.
    pub fn new() -> Self {
        Self
    }

    /// Load a template from package bytes.
    ///
    /// Bytes that are not a ZIP archive, or an archive without a
    /// presentation part, are reported as a missing template.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Deck> {
        let package = Package::from_bytes(&bytes)
            .map_err(|e| Error::TemplateMissing(format!("not a presentation package: {}", e)))?;
        if !package.contains(PRESENTATION) {
            return Err(Error::TemplateMissing(format!("package has no {}", PRESENTATION)));
        }

        let mut deck = self.read_package(&package).map_err(|e| match e {
            Error::TemplateMissing(_) | Error::TemplateLoad(_) => e,
            other => Error::TemplateLoad(other.to_string()),
        })?;
        deck.package = bytes;
        Ok(deck)
    }

    fn read_package(&self, package: &Package) -> Result<Deck> {
        let presentation = package.part_xml(PRESENTATION)?;
        let rels = package.relationships(PRESENTATION)?;

        let layouts = self.read_layouts(package, &presentation, &rels)?;
        log::debug!("Read {} slide layouts", layouts.len());

        let mut deck = Deck::new(layouts);
        deck.template_slides = self.read_template_slides(package, &presentation, &rels, &deck.layouts)?;
        deck.notes_master = rels
            .iter()
            .find(|r| rel_type::is(&r.rel_type, rel_type::NOTES_MASTER))
            .map(|r| r.target.clone());

        Ok(deck)
    }

    /// Part names listed by `r:id` in an id list element, e.g. the children
    /// of `sldIdLst`.
    fn listed_parts(list: Option<&Element>, item: &str, rels: &[Relationship]) -> Vec<String> {
        let Some(list) = list else {
            return Vec::new();
        };
        list.children_named(item)
            .filter_map(|entry| {
                let id = entry.attr("r:id")?;
                match by_id(rels, id) {
                    Some(rel) => Some(rel.target.clone()),
                    None => {
                        log::warn!("Relationship {} not found for {}", id, item);
                        None
                    }
                }
            })
            .collect()
    }

    /// Layouts of the first slide master, in the master's order.
    fn read_layouts(
        &self,
        package: &Package,
        presentation: &Element,
        rels: &[Relationship],
    ) -> Result<Vec<Layout>> {
        let masters = Self::listed_parts(presentation.child("sldMasterIdLst"), "sldMasterId", rels);
        let Some(master) = masters.first() else {
            return Err(Error::TemplateLoad("presentation has no slide master".into()));
        };
        if masters.len() > 1 {
            log::debug!("Template has {} slide masters, using the first", masters.len());
        }

        let master_xml = package.part_xml(master)?;
        let master_rels = package.relationships(master)?;
        let layout_parts = Self::listed_parts(master_xml.child("sldLayoutIdLst"), "sldLayoutId", &master_rels);

        let mut layouts = Vec::with_capacity(layout_parts.len());
        for part in layout_parts {
            let xml = package.part_xml(&part)?;
            let c_sld = xml.child("cSld");
            let mut layout = Layout::new(
                c_sld.and_then(|c| c.attr("name")).unwrap_or_default(),
                part.as_str(),
            );
            if let Some(tree) = c_sld.and_then(|c| c.child("spTree")) {
                layout.shapes = parse_shape_tree(tree);
            }
            layouts.push(layout);
        }
        Ok(layouts)
    }

    fn read_template_slides(
        &self,
        package: &Package,
        presentation: &Element,
        rels: &[Relationship],
        layouts: &[Layout],
    ) -> Result<Vec<TemplateSlide>> {
        let parts = Self::listed_parts(presentation.child("sldIdLst"), "sldId", rels);
        let mut slides = Vec::with_capacity(parts.len());
        for part_name in parts {
            let layout_part = package
                .relationships(&part_name)?
                .into_iter()
                .find(|r| rel_type::is(&r.rel_type, rel_type::SLIDE_LAYOUT))
                .map(|r| r.target);
            let layout_index =
                layout_part.and_then(|target| layouts.iter().position(|l| l.part_name == target));
            slides.push(TemplateSlide {
                part_name,
                layout_index,
            });
        }
        Ok(slides)
    }
}

impl Default for PptxReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLoader for PptxReader {
    fn load(&self, path: &Path) -> Result<Deck> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::TemplateMissing(path.display().to_string()));
            }
            Err(e) => {
                return Err(Error::TemplateLoad(format!("{}: {}", path.display(), e)));
            }
        };
        log::debug!("Loading template {} ({} bytes)", path.display(), bytes.len());
        self.read_bytes(bytes)
    }
}

/// Every layout of a template as `(index, name)` pairs, in the order slide
/// mappings refer to them. Returns an empty list when the template cannot
/// be read.
pub fn list_layouts(path: &Path) -> Vec<(usize, String)> {
    match PptxReader::new().load(path) {
        Ok(deck) => deck.layout_names(),
        Err(err) => {
            log::error!("Could not list layouts of {}: {}", path.display(), err);
            Vec::new()
        }
    }
}
