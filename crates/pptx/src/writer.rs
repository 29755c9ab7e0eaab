//! Serializing a finished deck back into a `.pptx` package.
//!
//! Every part of the template package is copied. Each generated slide gets a
//! new slide part related to its layout, and a notes slide when it has notes
//! and the template has a notes master. The content types, the presentation
//! part and its relationships are rewritten to list the new parts.

use outbrief_core::types::{Deck, PlaceholderKind, ShapeNode, Slide, TextFrame};
use outbrief_core::{DeckSerializer, Error, Result};

use crate::drawing::shape_tree;
use crate::package::{
    content_type, extract_number, rel_type, rels_path, relative_target, Package,
    RelationshipsBuilder, CONTENT_TYPES, PRESENTATION, PRESENTATION_RELS,
};
use crate::xml::{self, Element, Node, NS_A, NS_P, NS_R};

/// Slide ids start above this value.
const MIN_SLIDE_ID: u32 = 255;

/// Elements that precede `sldIdLst` in `presentation.xml`.
const BEFORE_SLIDE_ID_LIST: &[&str] = &["sldMasterIdLst", "notesMasterIdLst", "handoutMasterIdLst"];

/// Writes a [`Deck`] as a `.pptx` package.
pub struct PptxWriter;

impl PptxWriter {
    /// Create a new PPTX writer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for PptxWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckSerializer for PptxWriter {
    fn serialize(&self, deck: &Deck) -> Result<Vec<u8>> {
        if deck.package.is_empty() {
            return Err(Error::PackageError("deck has no template package".into()));
        }
        let mut package = Package::from_bytes(&deck.package)?;
        let mut output = PackageUpdate::open(&package)?;

        let with_notes = deck.slides.iter().filter(|s| s.notes.is_some()).count();
        if with_notes > 0 && deck.notes_master.is_none() {
            log::warn!(
                "Template has no notes master, dropping speaker notes of {} slides",
                with_notes
            );
        }

        for slide in &deck.slides {
            output.add_slide(&mut package, deck, slide)?;
        }
        output.save(&mut package)?;

        log::info!("Wrote {} new slides", deck.slides.len());
        package.to_bytes()
    }
}

/// The three package-level parts rewritten for new slides.
struct PackageUpdate {
    content_types: Element,
    presentation: Element,
    presentation_rels: Element,
    next_slide_part: usize,
    next_notes_part: usize,
    next_slide_id: u32,
    next_rel_id: usize,
}

impl PackageUpdate {
    fn open(package: &Package) -> Result<Self> {
        let presentation = package.part_xml(PRESENTATION)?;
        let presentation_rels = package.part_xml(PRESENTATION_RELS)?;

        let next_slide_id = presentation
            .child("sldIdLst")
            .into_iter()
            .flat_map(|list| list.children_named("sldId"))
            .filter_map(|id| id.attr("id")?.parse::<u32>().ok())
            .fold(MIN_SLIDE_ID, u32::max)
            + 1;
        let next_rel_id = presentation_rels
            .children_named("Relationship")
            .filter_map(|rel| extract_number(rel.attr("Id")?))
            .max()
            .unwrap_or(0)
            + 1;

        Ok(Self {
            content_types: package.part_xml(CONTENT_TYPES)?,
            presentation,
            presentation_rels,
            next_slide_part: package.next_part_number("ppt/slides/slide"),
            next_notes_part: package.next_part_number("ppt/notesSlides/notesSlide"),
            next_slide_id,
            next_rel_id,
        })
    }

    fn add_slide(&mut self, package: &mut Package, deck: &Deck, slide: &Slide) -> Result<()> {
        let layout = deck.layouts.get(slide.layout_index).ok_or_else(|| {
            Error::PackageError(format!("slide refers to missing layout {}", slide.layout_index))
        })?;

        let part = format!("ppt/slides/slide{}.xml", self.next_slide_part);
        self.next_slide_part += 1;

        let mut rels = RelationshipsBuilder::new();
        rels.add(rel_type::SLIDE_LAYOUT, &part, &layout.part_name);

        if let (Some(notes), Some(master)) = (&slide.notes, &deck.notes_master) {
            let notes_part = format!("ppt/notesSlides/notesSlide{}.xml", self.next_notes_part);
            self.next_notes_part += 1;

            let mut notes_rels = RelationshipsBuilder::new();
            notes_rels.add(rel_type::NOTES_MASTER, &notes_part, master);
            notes_rels.add(rel_type::SLIDE, &notes_part, &part);
            package.set(&notes_part, xml::write(&notes_element(notes))?);
            package.set(&rels_path(&notes_part), notes_rels.to_bytes()?);
            self.add_override(&notes_part, content_type::NOTES_SLIDE);

            rels.add(rel_type::NOTES_SLIDE, &part, &notes_part);
        }

        package.set(&part, xml::write(&slide_element(slide))?);
        package.set(&rels_path(&part), rels.to_bytes()?);
        self.add_override(&part, content_type::SLIDE);
        self.list_slide(&part);
        Ok(())
    }

    fn add_override(&mut self, part: &str, content_type: &str) {
        self.content_types.push(
            Element::new("Override")
                .with_attr("PartName", format!("/{}", part))
                .with_attr("ContentType", content_type),
        );
    }

    /// Relate the presentation to a slide part and append it to `sldIdLst`.
    fn list_slide(&mut self, part: &str) {
        let rel_id = format!("rId{}", self.next_rel_id);
        self.next_rel_id += 1;
        self.presentation_rels.push(
            Element::new("Relationship")
                .with_attr("Id", rel_id.as_str())
                .with_attr("Type", rel_type::uri(rel_type::SLIDE))
                .with_attr("Target", relative_target(PRESENTATION, part)),
        );

        let entry = Element::new("p:sldId")
            .with_attr("id", self.next_slide_id.to_string())
            .with_attr("r:id", rel_id);
        self.next_slide_id += 1;
        if let Some(list) = slide_id_list(&mut self.presentation) {
            list.push(entry);
        }
    }

    fn save(&self, package: &mut Package) -> Result<()> {
        package.set(CONTENT_TYPES, xml::write(&self.content_types)?);
        package.set(PRESENTATION, xml::write(&self.presentation)?);
        package.set(PRESENTATION_RELS, xml::write(&self.presentation_rels)?);
        Ok(())
    }
}

/// The `sldIdLst` element, inserted in schema order when absent.
fn slide_id_list(presentation: &mut Element) -> Option<&mut Element> {
    if presentation.child("sldIdLst").is_none() {
        let insert_at = presentation
            .children
            .iter()
            .rposition(|node| {
                matches!(node, Node::Element(e) if BEFORE_SLIDE_ID_LIST.contains(&e.local_name()))
            })
            .map_or(0, |i| i + 1);
        presentation
            .children
            .insert(insert_at, Node::Element(Element::new("p:sldIdLst")));
    }
    presentation.child_mut("sldIdLst")
}

fn with_namespaces(name: &str) -> Element {
    Element::new(name)
        .with_attr("xmlns:a", NS_A)
        .with_attr("xmlns:r", NS_R)
        .with_attr("xmlns:p", NS_P)
}

fn slide_element(slide: &Slide) -> Element {
    with_namespaces("p:sld")
        .with_child(Element::new("p:cSld").with_child(shape_tree(&slide.shapes)))
        .with_child(Element::new("p:clrMapOvr").with_child(Element::new("a:masterClrMapping")))
}

fn notes_element(notes: &TextFrame) -> Element {
    let shapes = [
        ShapeNode::placeholder(
            2,
            "Slide Image Placeholder 1",
            PlaceholderKind::Other("sldImg".into()),
            0,
            TextFrame::empty(),
        ),
        ShapeNode::placeholder(3, "Notes Placeholder 2", PlaceholderKind::Body, 1, notes.clone()),
    ];
    with_namespaces("p:notes")
        .with_child(Element::new("p:cSld").with_child(shape_tree(&shapes)))
        .with_child(Element::new("p:clrMapOvr").with_child(Element::new("a:masterClrMapping")))
}
