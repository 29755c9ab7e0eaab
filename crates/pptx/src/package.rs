//! ZIP package access and part relationships.

use std::io::{Cursor, Read, Write};

use outbrief_core::{Error, Result};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::xml::{self, Element};

pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const PRESENTATION: &str = "ppt/presentation.xml";
pub const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Relationship namespace used by `.rels` parts.
pub const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Relationship types, by the last segment of their URI.
pub mod rel_type {
    const BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/";

    pub const SLIDE: &str = "slide";
    pub const SLIDE_LAYOUT: &str = "slideLayout";
    pub const SLIDE_MASTER: &str = "slideMaster";
    pub const NOTES_MASTER: &str = "notesMaster";
    pub const NOTES_SLIDE: &str = "notesSlide";

    /// Full type URI for a short relationship type.
    pub fn uri(short: &str) -> String {
        format!("{}{}", BASE, short)
    }

    /// Whether a type URI is the given short type.
    pub fn is(uri: &str, short: &str) -> bool {
        uri.rsplit('/').next() == Some(short)
    }
}

/// Content types of the parts this crate creates.
pub mod content_type {
    pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const NOTES_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
}

/// A relationship from a `.rels` part, with its target resolved to a part
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Every part of a package, kept in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Read every file entry of a ZIP archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            parts.push((name, content));
        }

        Ok(Self { parts })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.as_slice())
    }

    /// A part decoded as UTF-8 text.
    pub fn part_str(&self, name: &str) -> Result<String> {
        let content = self
            .part(name)
            .ok_or_else(|| Error::PackageError(format!("Part not found in package: {}", name)))?;
        String::from_utf8(content.to_vec())
            .map_err(|e| Error::PackageError(format!("Part '{}' is not UTF-8: {}", name, e)))
    }

    /// A part parsed as XML.
    pub fn part_xml(&self, name: &str) -> Result<Element> {
        xml::parse(&self.part_str(name)?)
    }

    /// Relationships of a part. A part without a `.rels` part has none.
    pub fn relationships(&self, part: &str) -> Result<Vec<Relationship>> {
        let rels = rels_path(part);
        if !self.contains(&rels) {
            return Ok(Vec::new());
        }
        parse_relationships(&self.part_str(&rels)?, part)
    }

    /// Replace a part, or append it when new.
    pub fn set(&mut self, name: &str, content: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = content,
            None => self.parts.push((name.to_string(), content)),
        }
    }

    /// The first free number for parts named `{prefix}{n}.xml`.
    pub fn next_part_number(&self, prefix: &str) -> usize {
        self.parts
            .iter()
            .filter_map(|(name, _)| name.strip_prefix(prefix)?.strip_suffix(".xml")?.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Write the package as a deflated ZIP archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, content) in &self.parts {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
            writer.write_all(content)?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// The `.rels` part holding a part's relationships, e.g.
/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// A target for `to_part` relative to the directory of `from_part`.
pub fn relative_target(from_part: &str, to_part: &str) -> String {
    let from_dir: Vec<&str> = match from_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to: Vec<&str> = to_part.split('/').collect();

    let common = from_dir
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();
    let mut segments: Vec<&str> = vec![".."; from_dir.len() - common];
    segments.extend(&to[common..]);
    segments.join("/")
}

/// Parse a `.rels` part. Internal targets are resolved against `source_part`.
pub fn parse_relationships(content: &str, source_part: &str) -> Result<Vec<Relationship>> {
    let root = xml::parse(content)?;
    let relationships = root
        .children_named("Relationship")
        .map(|rel| {
            let target = rel.attr("Target").unwrap_or_default();
            let external = rel.attr("TargetMode") == Some("External");
            Relationship {
                id: rel.attr("Id").unwrap_or_default().to_string(),
                rel_type: rel.attr("Type").unwrap_or_default().to_string(),
                target: if external {
                    target.to_string()
                } else {
                    resolve_target(source_part, target)
                },
                external,
            }
        })
        .collect();
    Ok(relationships)
}

/// Find a relationship by id.
pub fn by_id<'a>(relationships: &'a [Relationship], id: &str) -> Option<&'a Relationship> {
    relationships.iter().find(|r| r.id == id)
}

/// Extract a trailing number from a string like "rId2" or "slide3.xml".
pub fn extract_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".rels").trim_end_matches(".xml");
    let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    s[s.len() - digits..].parse().ok()
}

/// Builds a new `.rels` part.
#[derive(Debug)]
pub struct RelationshipsBuilder {
    root: Element,
    count: usize,
}

impl RelationshipsBuilder {
    pub fn new() -> Self {
        Self {
            root: Element::new("Relationships").with_attr("xmlns", NS_RELATIONSHIPS),
            count: 0,
        }
    }

    /// Add a relationship of the short type `short_type` from `source_part`
    /// to `target_part`. Returns its id.
    pub fn add(&mut self, short_type: &str, source_part: &str, target_part: &str) -> String {
        self.count += 1;
        let id = format!("rId{}", self.count);
        self.root.push(
            Element::new("Relationship")
                .with_attr("Id", id.as_str())
                .with_attr("Type", rel_type::uri(short_type))
                .with_attr("Target", relative_target(source_part, target_part)),
        );
        id
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        xml::write(&self.root)
    }
}

impl Default for RelationshipsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("rId1"), Some(1));
        assert_eq!(extract_number("rId12"), Some(12));
        assert_eq!(extract_number("slide1.xml"), Some(1));
        assert_eq!(extract_number("slide123.xml"), Some(123));
        assert_eq!(extract_number("nodigits"), None);
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(rels_path("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path(PRESENTATION), PRESENTATION_RELS);
    }

    #[test]
    fn test_resolve_and_relative_targets() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/slideLayout2.xml"
        );
        assert_eq!(resolve_target(PRESENTATION, "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target(PRESENTATION, "/ppt/theme/theme1.xml"), "ppt/theme/theme1.xml");

        assert_eq!(
            relative_target("ppt/slides/slide4.xml", "ppt/slideLayouts/slideLayout2.xml"),
            "../slideLayouts/slideLayout2.xml"
        );
        assert_eq!(relative_target(PRESENTATION, "ppt/slides/slide4.xml"), "slides/slide4.xml");
    }

    #[test]
    fn test_parse_relationships() {
        let rels = parse_relationships(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#,
            "ppt/slides/slide1.xml",
        )
        .unwrap();

        assert_eq!(rels.len(), 2);
        assert!(rel_type::is(&rels[0].rel_type, rel_type::SLIDE_LAYOUT));
        assert!(!rel_type::is(&rels[0].rel_type, rel_type::SLIDE));
        assert_eq!(rels[0].target, "ppt/slideLayouts/slideLayout1.xml");
        assert_eq!(by_id(&rels, "rId2").unwrap().target, "https://example.com");
    }

    #[test]
    fn test_package_round_trip_and_numbering() {
        let mut package = Package::default();
        package.set("ppt/slides/slide1.xml", b"<p:sld/>".to_vec());
        package.set("ppt/slides/slide3.xml", b"<p:sld/>".to_vec());
        package.set("ppt/slides/slide1.xml", b"<p:sld></p:sld>".to_vec());

        assert_eq!(package.next_part_number("ppt/slides/slide"), 4);
        assert_eq!(package.next_part_number("ppt/notesSlides/notesSlide"), 1);

        let reopened = Package::from_bytes(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.part_str("ppt/slides/slide1.xml").unwrap(), "<p:sld></p:sld>");
        assert!(reopened.contains("ppt/slides/slide3.xml"));
        assert!(reopened.part_str("ppt/slides/slide2.xml").is_err());
    }
}
