//! Conversion between DrawingML shape trees and the deck's shape types.

use outbrief_core::types::{
    Alignment, Color, Geometry, Paragraph, Placeholder, PlaceholderKind, Run, RunStyle, ShapeKind,
    ShapeNode, Table, TableCell, TextField, TextFrame, VerticalAnchor,
};

use crate::xml::Element;

/// Field type attribute of a slide number field.
const FIELD_SLIDE_NUMBER: &str = "slidenum";

/// Id attribute written on new slide number fields.
const FIELD_SLIDE_NUMBER_ID: &str = "{B6F15528-21DE-4FAA-801E-634DDDAF4B2B}";

/// URI of table graphic data.
const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

/// Height of a generated table row when the frame height is unknown.
const DEFAULT_ROW_HEIGHT: i64 = 370_840;

// Reading

/// Shapes under an `spTree` or `grpSp` element. Pictures, connectors and
/// charts are skipped.
pub fn parse_shape_tree(tree: &Element) -> Vec<ShapeNode> {
    tree.elements()
        .filter_map(|element| match element.local_name() {
            "sp" => Some(parse_sp(element)),
            "grpSp" => Some(parse_group(element)),
            "graphicFrame" => parse_graphic_frame(element),
            _ => None,
        })
        .collect()
}

fn non_visual(element: &Element, wrapper: &str) -> (u32, String) {
    let c_nv_pr = element.find(&[wrapper, "cNvPr"]);
    let id = c_nv_pr
        .and_then(|e| e.attr("id"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let name = c_nv_pr.and_then(|e| e.attr("name")).unwrap_or_default();
    (id, name.to_string())
}

fn parse_geometry(xfrm: Option<&Element>) -> Option<Geometry> {
    let xfrm = xfrm?;
    let int = |element: Option<&Element>, key: &str| -> Option<i64> { element?.attr(key)?.parse().ok() };
    let off = xfrm.child("off");
    let ext = xfrm.child("ext");
    Some(Geometry::new(
        int(off, "x")?,
        int(off, "y")?,
        int(ext, "cx")?,
        int(ext, "cy")?,
    ))
}

fn parse_placeholder(nv_pr: Option<&Element>) -> Option<Placeholder> {
    let ph = nv_pr?.child("ph")?;
    Some(Placeholder {
        kind: PlaceholderKind::from_ooxml(ph.attr("type")),
        idx: ph.attr("idx").and_then(|v| v.parse().ok()).unwrap_or(0),
    })
}

fn parse_sp(element: &Element) -> ShapeNode {
    let (id, name) = non_visual(element, "nvSpPr");
    ShapeNode {
        id,
        name,
        placeholder: parse_placeholder(element.find(&["nvSpPr", "nvPr"])),
        geometry: parse_geometry(element.find(&["spPr", "xfrm"])),
        kind: ShapeKind::Text(
            element
                .child("txBody")
                .map(parse_text_frame)
                .unwrap_or_else(TextFrame::empty),
        ),
    }
}

fn parse_group(element: &Element) -> ShapeNode {
    let (id, name) = non_visual(element, "nvGrpSpPr");
    ShapeNode {
        id,
        name,
        placeholder: None,
        geometry: parse_geometry(element.find(&["grpSpPr", "xfrm"])),
        kind: ShapeKind::Group(parse_shape_tree(element)),
    }
}

fn parse_graphic_frame(element: &Element) -> Option<ShapeNode> {
    let tbl = element.find(&["graphic", "graphicData", "tbl"])?;
    let (id, name) = non_visual(element, "nvGraphicFramePr");

    let column_widths = tbl
        .child("tblGrid")
        .map(|grid| {
            grid.children_named("gridCol")
                .map(|col| col.attr("w").and_then(|w| w.parse::<i64>().ok()).unwrap_or(0))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let rows = tbl
        .children_named("tr")
        .map(|tr| tr.children_named("tc").map(parse_cell).collect::<Vec<_>>())
        .collect();

    Some(ShapeNode {
        id,
        name,
        placeholder: parse_placeholder(element.find(&["nvGraphicFramePr", "nvPr"])),
        geometry: parse_geometry(element.child("xfrm")),
        kind: ShapeKind::Table(Table { rows, column_widths }),
    })
}

fn parse_cell(tc: &Element) -> TableCell {
    let tc_pr = tc.child("tcPr");
    TableCell {
        text: tc.child("txBody").map(parse_text_frame).unwrap_or_default(),
        fill: tc_pr
            .and_then(|pr| pr.find(&["solidFill", "srgbClr"]))
            .and_then(|clr| clr.attr("val"))
            .and_then(Color::parse_hex),
        anchor: tc_pr.and_then(|pr| pr.attr("anchor")).and_then(|anchor| match anchor {
            "t" => Some(VerticalAnchor::Top),
            "ctr" => Some(VerticalAnchor::Middle),
            "b" => Some(VerticalAnchor::Bottom),
            _ => None,
        }),
    }
}

/// Parse a `txBody` element.
pub fn parse_text_frame(tx_body: &Element) -> TextFrame {
    TextFrame {
        paragraphs: tx_body.children_named("p").map(parse_paragraph).collect(),
        shrink_to_fit: tx_body.find(&["bodyPr", "normAutofit"]).is_some(),
    }
}

fn parse_paragraph(p: &Element) -> Paragraph {
    let mut paragraph = Paragraph::new();

    if let Some(p_pr) = p.child("pPr") {
        paragraph.level = p_pr.attr("lvl").and_then(|v| v.parse().ok()).unwrap_or(0);
        paragraph.alignment = p_pr.attr("algn").and_then(Alignment::from_ooxml);
        paragraph.line_spacing = p_pr
            .find(&["lnSpc", "spcPct"])
            .and_then(|pct| pct.attr("val"))
            .and_then(|v| v.parse::<f32>().ok())
            .map(|v| v / 100_000.0);
    }

    for child in p.elements() {
        let style = || child.child("rPr").map(parse_run_style).unwrap_or_default();
        match child.local_name() {
            "r" => {
                let text = child.child("t").map(Element::text).unwrap_or_default();
                paragraph.runs.push(Run::styled(text, style()));
            }
            "br" => paragraph.runs.push(Run::styled("\n", style())),
            "fld" => {
                let text = child.child("t").map(Element::text).unwrap_or_default();
                let mut run = Run::styled(text, style());
                if child.attr("type") == Some(FIELD_SLIDE_NUMBER) {
                    run.field = Some(TextField::SlideNumber);
                }
                paragraph.runs.push(run);
            }
            _ => {}
        }
    }

    paragraph
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    value.map(|v| v == "1" || v == "true")
}

fn parse_run_style(r_pr: &Element) -> RunStyle {
    let color = match r_pr.child("solidFill") {
        Some(fill) => {
            if let Some(rgb) = fill.child("srgbClr").and_then(|c| c.attr("val")).and_then(Color::parse_hex) {
                Color::Rgb(rgb)
            } else if let Some(scheme) = fill.child("schemeClr").and_then(|c| c.attr("val")) {
                Color::Theme(scheme.to_string())
            } else {
                Color::None
            }
        }
        None => Color::None,
    };

    RunStyle {
        font_name: r_pr
            .child("latin")
            .and_then(|latin| latin.attr("typeface"))
            .map(str::to_string),
        size: r_pr.attr("sz").and_then(|v| v.parse().ok()),
        bold: parse_flag(r_pr.attr("b")),
        italic: parse_flag(r_pr.attr("i")),
        underline: r_pr.attr("u").map(|u| u != "none"),
        color,
    }
}

// Writing

/// The `spTree` element of a slide, with its root group header.
pub fn shape_tree(shapes: &[ShapeNode]) -> Element {
    let mut tree = Element::new("p:spTree")
        .with_child(
            Element::new("p:nvGrpSpPr")
                .with_child(Element::new("p:cNvPr").with_attr("id", "1").with_attr("name", ""))
                .with_child(Element::new("p:cNvGrpSpPr"))
                .with_child(Element::new("p:nvPr")),
        )
        .with_child(Element::new("p:grpSpPr"));
    for shape in shapes {
        tree.push(shape_element(shape));
    }
    tree
}

fn shape_element(shape: &ShapeNode) -> Element {
    match &shape.kind {
        ShapeKind::Text(frame) => sp_element(shape, frame),
        ShapeKind::Table(table) => graphic_frame_element(shape, table),
        ShapeKind::Group(children) => group_element(shape, children),
    }
}

fn c_nv_pr(shape: &ShapeNode) -> Element {
    Element::new("p:cNvPr")
        .with_attr("id", shape.id.to_string())
        .with_attr("name", shape.name.as_str())
}

fn nv_pr(placeholder: Option<&Placeholder>) -> Element {
    let mut nv_pr = Element::new("p:nvPr");
    if let Some(placeholder) = placeholder {
        let mut ph = Element::new("p:ph");
        if let Some(kind) = placeholder.kind.as_ooxml() {
            ph.set_attr("type", kind);
        }
        if placeholder.idx != 0 {
            ph.set_attr("idx", placeholder.idx.to_string());
        }
        nv_pr.push(ph);
    }
    nv_pr
}

fn xfrm(name: &str, geometry: &Geometry, with_children: bool) -> Element {
    let mut xfrm = Element::new(name)
        .with_child(
            Element::new("a:off")
                .with_attr("x", geometry.x.to_string())
                .with_attr("y", geometry.y.to_string()),
        )
        .with_child(
            Element::new("a:ext")
                .with_attr("cx", geometry.cx.to_string())
                .with_attr("cy", geometry.cy.to_string()),
        );
    if with_children {
        xfrm.push(
            Element::new("a:chOff")
                .with_attr("x", geometry.x.to_string())
                .with_attr("y", geometry.y.to_string()),
        );
        xfrm.push(
            Element::new("a:chExt")
                .with_attr("cx", geometry.cx.to_string())
                .with_attr("cy", geometry.cy.to_string()),
        );
    }
    xfrm
}

fn sp_element(shape: &ShapeNode, frame: &TextFrame) -> Element {
    let mut c_nv_sp_pr = Element::new("p:cNvSpPr");
    if shape.is_placeholder() {
        c_nv_sp_pr.push(Element::new("a:spLocks").with_attr("noGrp", "1"));
    } else {
        c_nv_sp_pr.set_attr("txBox", "1");
    }

    let mut sp_pr = Element::new("p:spPr");
    if let Some(geometry) = &shape.geometry {
        sp_pr.push(xfrm("a:xfrm", geometry, false));
        sp_pr.push(
            Element::new("a:prstGeom")
                .with_attr("prst", "rect")
                .with_child(Element::new("a:avLst")),
        );
    }

    let mut sp = Element::new("p:sp")
        .with_child(
            Element::new("p:nvSpPr")
                .with_child(c_nv_pr(shape))
                .with_child(c_nv_sp_pr)
                .with_child(nv_pr(shape.placeholder.as_ref())),
        )
        .with_child(sp_pr);
    if !frame.paragraphs.is_empty() {
        let mut tx_body = text_body("p:txBody", frame);
        if !shape.is_placeholder() {
            if let Some(body_pr) = tx_body.child_mut("bodyPr") {
                body_pr.set_attr("wrap", "square");
            }
        }
        sp.push(tx_body);
    }
    sp
}

fn group_element(shape: &ShapeNode, children: &[ShapeNode]) -> Element {
    let mut grp_sp_pr = Element::new("p:grpSpPr");
    if let Some(geometry) = &shape.geometry {
        grp_sp_pr.push(xfrm("a:xfrm", geometry, true));
    }

    let mut group = Element::new("p:grpSp")
        .with_child(
            Element::new("p:nvGrpSpPr")
                .with_child(c_nv_pr(shape))
                .with_child(Element::new("p:cNvGrpSpPr"))
                .with_child(Element::new("p:nvPr")),
        )
        .with_child(grp_sp_pr);
    for child in children {
        group.push(shape_element(child));
    }
    group
}

fn graphic_frame_element(shape: &ShapeNode, table: &Table) -> Element {
    let geometry = shape.geometry.unwrap_or_default();
    let row_height = match table.rows.len() {
        0 => DEFAULT_ROW_HEIGHT,
        rows => (geometry.cy / rows as i64).max(DEFAULT_ROW_HEIGHT),
    };

    let mut grid = Element::new("a:tblGrid");
    for width in &table.column_widths {
        grid.push(Element::new("a:gridCol").with_attr("w", width.to_string()));
    }

    let mut tbl = Element::new("a:tbl")
        .with_child(
            Element::new("a:tblPr")
                .with_attr("firstRow", "1")
                .with_attr("bandRow", "1"),
        )
        .with_child(grid);
    for row in &table.rows {
        let mut tr = Element::new("a:tr").with_attr("h", row_height.to_string());
        for cell in row {
            tr.push(cell_element(cell));
        }
        tbl.push(tr);
    }

    Element::new("p:graphicFrame")
        .with_child(
            Element::new("p:nvGraphicFramePr")
                .with_child(c_nv_pr(shape))
                .with_child(
                    Element::new("p:cNvGraphicFramePr")
                        .with_child(Element::new("a:graphicFrameLocks").with_attr("noGrp", "1")),
                )
                .with_child(nv_pr(shape.placeholder.as_ref())),
        )
        .with_child(xfrm("p:xfrm", &geometry, false))
        .with_child(
            Element::new("a:graphic").with_child(
                Element::new("a:graphicData")
                    .with_attr("uri", TABLE_URI)
                    .with_child(tbl),
            ),
        )
}

fn cell_element(cell: &TableCell) -> Element {
    let mut tc_pr = Element::new("a:tcPr");
    if let Some(anchor) = cell.anchor {
        tc_pr.set_attr("anchor", anchor.as_ooxml());
    }
    if let Some(fill) = cell.fill {
        tc_pr.push(solid_fill(&Color::Rgb(fill)));
    }

    let mut frame = cell.text.clone();
    if frame.paragraphs.is_empty() {
        frame.paragraphs.push(Paragraph::new());
    }
    Element::new("a:tc")
        .with_child(text_body("a:txBody", &frame))
        .with_child(tc_pr)
}

/// A text body element holding every paragraph of `frame`.
pub fn text_body(name: &str, frame: &TextFrame) -> Element {
    let mut body_pr = Element::new("a:bodyPr");
    if frame.shrink_to_fit {
        body_pr.push(Element::new("a:normAutofit"));
    }

    let mut tx_body = Element::new(name)
        .with_child(body_pr)
        .with_child(Element::new("a:lstStyle"));
    for paragraph in &frame.paragraphs {
        tx_body.push(paragraph_element(paragraph));
    }
    tx_body
}

fn paragraph_element(paragraph: &Paragraph) -> Element {
    let mut p = Element::new("a:p");

    let mut p_pr = Element::new("a:pPr");
    if paragraph.level > 0 {
        p_pr.set_attr("lvl", paragraph.level.to_string());
    }
    if let Some(alignment) = paragraph.alignment {
        p_pr.set_attr("algn", alignment.as_ooxml());
    }
    if let Some(spacing) = paragraph.line_spacing {
        let pct = (spacing * 100_000.0).round() as i64;
        p_pr.push(
            Element::new("a:lnSpc")
                .with_child(Element::new("a:spcPct").with_attr("val", pct.to_string())),
        );
    }
    if !p_pr.attributes.is_empty() || !p_pr.children.is_empty() {
        p.push(p_pr);
    }

    for run in &paragraph.runs {
        push_run(&mut p, run);
    }
    p
}

fn push_run(p: &mut Element, run: &Run) {
    if run.field == Some(TextField::SlideNumber) {
        p.push(
            Element::new("a:fld")
                .with_attr("id", FIELD_SLIDE_NUMBER_ID)
                .with_attr("type", FIELD_SLIDE_NUMBER)
                .with_child(run_properties(&run.style))
                .with_child(Element::new("a:t").with_text(run.text.as_str())),
        );
        return;
    }

    for (i, line) in run.text.split('\n').enumerate() {
        if i > 0 {
            p.push(Element::new("a:br").with_child(run_properties(&run.style)));
        }
        if !line.is_empty() {
            p.push(
                Element::new("a:r")
                    .with_child(run_properties(&run.style))
                    .with_child(Element::new("a:t").with_text(line)),
            );
        }
    }
}

fn solid_fill(color: &Color) -> Element {
    let fill = Element::new("a:solidFill");
    match color {
        Color::Rgb(rgb) => fill.with_child(Element::new("a:srgbClr").with_attr("val", Color::to_hex(*rgb))),
        Color::Theme(scheme) => fill.with_child(Element::new("a:schemeClr").with_attr("val", scheme.as_str())),
        Color::None => fill,
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn run_properties(style: &RunStyle) -> Element {
    let mut r_pr = Element::new("a:rPr").with_attr("lang", "en-US");
    if let Some(size) = style.size {
        r_pr.set_attr("sz", size.to_string());
    }
    if let Some(bold) = style.bold {
        r_pr.set_attr("b", flag(bold));
    }
    if let Some(italic) = style.italic {
        r_pr.set_attr("i", flag(italic));
    }
    if let Some(underline) = style.underline {
        r_pr.set_attr("u", if underline { "sng" } else { "none" });
    }
    r_pr.set_attr("dirty", "0");

    if style.color != Color::None {
        r_pr.push(solid_fill(&style.color));
    }
    if let Some(font) = &style.font_name {
        r_pr.push(Element::new("a:latin").with_attr("typeface", font.as_str()));
    }
    r_pr
}
