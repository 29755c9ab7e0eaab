//! Minimal in-memory templates for tests.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#, id, REL, kind, target)
        })
        .collect();
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}">{}</Relationships>"#, RELS_NS, body)
}

fn placeholder(id: u32, name: &str, ph: &str, text: &str) -> String {
    let paragraph = if text.is_empty() {
        "<a:p/>".to_string()
    } else {
        format!(r#"<a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p>"#, text)
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="{}"/><a:ext cx="8229600" cy="500000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        id,
        name,
        ph,
        id * 600_000,
        paragraph
    )
}

fn layout(name: &str, title_type: &str) -> String {
    let shapes = [
        placeholder(2, "Title 1", &format!(r#"<p:ph type="{}"/>"#, title_type), "Click to edit title"),
        placeholder(3, "Content Placeholder 2", r#"<p:ph idx="1"/>"#, ""),
        placeholder(4, "Date Placeholder 3", r#"<p:ph type="dt" sz="half" idx="10"/>"#, ""),
        placeholder(5, "Footer Placeholder 4", r#"<p:ph type="ftr" sz="quarter" idx="11"/>"#, "Confidential"),
        placeholder(6, "Slide Number Placeholder 5", r#"<p:ph type="sldNum" sz="quarter" idx="12"/>"#, ""),
    ]
    .concat();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {}><p:cSld name="{}"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sldLayout>"#,
        NS, name, shapes
    )
}

fn empty_slide(root: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:{root} {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld></p:{root}>"#,
        NS
    )
}

/// Builds a template with one master and two layouts. The master lists
/// `slideLayout2.xml` ("Title Slide") before `slideLayout1.xml`
/// ("Title and Content").
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    existing_slide: bool,
    notes_master: bool,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one slide on "Title and Content".
    pub fn with_existing_slide(mut self) -> Self {
        self.existing_slide = true;
        self
    }

    pub fn with_notes_master(mut self) -> Self {
        self.notes_master = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut parts: Vec<(String, String)> = Vec::new();

        let mut overrides = vec![
            ("/ppt/presentation.xml", "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"),
            ("/ppt/slideMasters/slideMaster1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"),
            ("/ppt/slideLayouts/slideLayout1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"),
            ("/ppt/slideLayouts/slideLayout2.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"),
        ];
        if self.existing_slide {
            overrides.push(("/ppt/slides/slide1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slide+xml"));
        }
        if self.notes_master {
            overrides.push(("/ppt/notesMasters/notesMaster1.xml", "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml"));
        }
        let overrides: String = overrides
            .iter()
            .map(|(part, kind)| format!(r#"<Override PartName="{}" ContentType="{}"/>"#, part, kind))
            .collect();
        parts.push((
            "[Content_Types].xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{}</Types>"#,
                overrides
            ),
        ));
        parts.push((
            "_rels/.rels".into(),
            rels(&[("rId1", "officeDocument", "ppt/presentation.xml")]),
        ));

        let mut presentation_rels = vec![("rId1", "slideMaster", "slideMasters/slideMaster1.xml")];
        let mut lists = r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#.to_string();
        if self.notes_master {
            presentation_rels.push(("rId2", "notesMaster", "notesMasters/notesMaster1.xml"));
            lists.push_str(r#"<p:notesMasterIdLst><p:notesMasterId r:id="rId2"/></p:notesMasterIdLst>"#);
        }
        if self.existing_slide {
            presentation_rels.push(("rId3", "slide", "slides/slide1.xml"));
            lists.push_str(r#"<p:sldIdLst><p:sldId id="256" r:id="rId3"/></p:sldIdLst>"#);
        }
        parts.push((
            "ppt/presentation.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}>{}<p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
                NS, lists
            ),
        ));
        parts.push(("ppt/_rels/presentation.xml.rels".into(), rels(&presentation_rels)));

        parts.push((
            "ppt/slideMasters/slideMaster1.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {}><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId2"/><p:sldLayoutId id="2147483650" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
                NS
            ),
        ));
        parts.push((
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            rels(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "slideLayout", "../slideLayouts/slideLayout2.xml"),
            ]),
        ));

        for (file, name, title_type) in [
            ("slideLayout1.xml", "Title and Content", "title"),
            ("slideLayout2.xml", "Title Slide", "ctrTitle"),
        ] {
            parts.push((format!("ppt/slideLayouts/{}", file), layout(name, title_type)));
            parts.push((
                format!("ppt/slideLayouts/_rels/{}.rels", file),
                rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
            ));
        }

        if self.existing_slide {
            parts.push(("ppt/slides/slide1.xml".into(), empty_slide("sld")));
            parts.push((
                "ppt/slides/_rels/slide1.xml.rels".into(),
                rels(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]),
            ));
        }
        if self.notes_master {
            parts.push(("ppt/notesMasters/notesMaster1.xml".into(), empty_slide("notesMaster")));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
