//! Domain types for the in-memory presentation deck.
//!
//! A [`Deck`] holds the layouts of the bound template, the slides the
//! template already contained, and the slides generated during an export.
//! Every slide owns its shape tree; shapes are a closed set of variants so
//! traversals match exhaustively.

use serde::{Deserialize, Serialize};

/// English Metric Units per inch, the coordinate unit of the package format.
pub const EMU_PER_INCH: i64 = 914_400;

/// Convert inches to EMU.
pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// A presentation being assembled from a template.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    /// Slide layouts in template order (index is the layout index used by
    /// slide mappings).
    pub layouts: Vec<Layout>,

    /// Slides already present in the template, carried through untouched.
    pub template_slides: Vec<TemplateSlide>,

    /// Slides generated by the export, in presentation order after the
    /// template slides.
    pub slides: Vec<Slide>,

    /// Part name of the notes master, if the template has one.
    pub notes_master: Option<String>,

    /// Raw bytes of the package the deck was loaded from. Serializers copy
    /// untouched parts from here.
    pub package: Vec<u8>,
}

impl Deck {
    /// Create an empty deck over the given layouts.
    pub fn new(layouts: Vec<Layout>) -> Self {
        Self {
            layouts,
            ..Self::default()
        }
    }

    /// Number of layouts available in the bound template.
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Total number of slides including the template's own slides.
    pub fn slide_count(&self) -> usize {
        self.template_slides.len() + self.slides.len()
    }

    /// Instantiate a new slide from the layout at `layout_index` and append it.
    ///
    /// Returns the index of the new slide in [`Deck::slides`], or `None` if
    /// the layout does not exist.
    pub fn add_slide(&mut self, layout_index: usize) -> Option<usize> {
        let layout = self.layouts.get(layout_index)?;
        let slide = Slide::from_layout(layout_index, layout);
        self.slides.push(slide);
        Some(self.slides.len() - 1)
    }

    /// Borrow a generated slide mutably together with its layout.
    pub fn slide_with_layout_mut(&mut self, index: usize) -> Option<(&mut Slide, &Layout)> {
        let slide = self.slides.get_mut(index)?;
        let layout = self.layouts.get(slide.layout_index)?;
        Some((slide, layout))
    }

    /// Layouts as `(index, name)` pairs.
    pub fn layout_names(&self) -> Vec<(usize, String)> {
        self.layouts
            .iter()
            .enumerate()
            .map(|(idx, layout)| (idx, layout.name.clone()))
            .collect()
    }
}

/// A named slide layout from the template.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Display name of the layout ("Title Slide", "Title and Content", ...).
    pub name: String,

    /// Package part name, e.g. `ppt/slideLayouts/slideLayout2.xml`.
    pub part_name: String,

    /// Shapes defined on the layout, including its placeholders.
    pub shapes: Vec<ShapeNode>,
}

impl Layout {
    /// Create a layout with the given name and part.
    pub fn new(name: impl Into<String>, part_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part_name: part_name.into(),
            shapes: Vec::new(),
        }
    }

    /// Placeholder shapes of the layout, in document order.
    pub fn placeholders(&self) -> impl Iterator<Item = &ShapeNode> {
        self.shapes.iter().filter(|s| s.is_placeholder())
    }

    /// Find a placeholder by its placeholder index.
    pub fn placeholder(&self, idx: u32) -> Option<&ShapeNode> {
        self.placeholders()
            .find(|s| s.placeholder.as_ref().map(|p| p.idx) == Some(idx))
    }
}

/// A slide that was already in the template package.
#[derive(Debug, Clone, Default)]
pub struct TemplateSlide {
    /// Package part name of the slide.
    pub part_name: String,

    /// Layout the slide is based on, when it could be resolved.
    pub layout_index: Option<usize>,
}

/// A slide generated during an export.
#[derive(Debug, Clone, Default)]
pub struct Slide {
    /// Index of the layout this slide was created from.
    pub layout_index: usize,

    /// Top-level shapes on the slide.
    pub shapes: Vec<ShapeNode>,

    /// Speaker notes, if any were written.
    pub notes: Option<TextFrame>,
}

impl Slide {
    /// Create a slide from a layout.
    ///
    /// Placeholders of the layout are cloned as empty placeholders that
    /// inherit position and formatting from the layout. Date, footer and
    /// slide-number placeholders are left out; the footer pass adds them.
    pub fn from_layout(layout_index: usize, layout: &Layout) -> Self {
        let mut slide = Self {
            layout_index,
            shapes: Vec::new(),
            notes: None,
        };

        for ph_shape in layout.placeholders() {
            let Some(placeholder) = ph_shape.placeholder.as_ref() else {
                continue;
            };
            if placeholder.kind.is_footer_like() {
                continue;
            }
            slide.clone_placeholder(ph_shape);
        }

        slide
    }

    /// Append an empty copy of a layout placeholder and return its index.
    pub fn clone_placeholder(&mut self, layout_shape: &ShapeNode) -> usize {
        let id = self.next_shape_id();
        self.shapes.push(ShapeNode {
            id,
            name: layout_shape.name.clone(),
            placeholder: layout_shape.placeholder.clone(),
            geometry: None,
            kind: ShapeKind::Text(TextFrame::new()),
        });
        self.shapes.len() - 1
    }

    /// Append a new shape, assigning it the next free shape id.
    pub fn add_shape(
        &mut self,
        name: impl Into<String>,
        geometry: Option<Geometry>,
        kind: ShapeKind,
    ) -> usize {
        let id = self.next_shape_id();
        self.shapes.push(ShapeNode {
            id,
            name: name.into(),
            placeholder: None,
            geometry,
            kind,
        });
        self.shapes.len() - 1
    }

    /// The next unused shape id on this slide. Id 1 is reserved for the
    /// slide's root group.
    pub fn next_shape_id(&self) -> u32 {
        fn max_id(shapes: &[ShapeNode]) -> u32 {
            shapes
                .iter()
                .map(|s| match &s.kind {
                    ShapeKind::Group(children) => s.id.max(max_id(children)),
                    _ => s.id,
                })
                .max()
                .unwrap_or(1)
        }
        max_id(&self.shapes).max(1) + 1
    }

    /// Find a top-level placeholder by placeholder index.
    pub fn placeholder_index(&self, idx: u32) -> Option<usize> {
        self.shapes
            .iter()
            .position(|s| s.placeholder.as_ref().map(|p| p.idx) == Some(idx))
    }

    /// All text on the slide, one line per paragraph, in shape order.
    pub fn all_text(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for shape in &self.shapes {
            shape.collect_text(&mut lines);
        }
        lines
    }

    /// Speaker notes frame, created on first use.
    pub fn notes_frame_mut(&mut self) -> &mut TextFrame {
        self.notes.get_or_insert_with(TextFrame::new)
    }
}

/// A node of a slide's shape tree.
#[derive(Debug, Clone, Default)]
pub struct ShapeNode {
    /// Shape id, unique within the slide.
    pub id: u32,

    /// Shape name ("Title 1", "Footer Placeholder 4", ...).
    pub name: String,

    /// Placeholder info when the shape is a placeholder.
    pub placeholder: Option<Placeholder>,

    /// Explicit position and size. `None` inherits from the layout.
    pub geometry: Option<Geometry>,

    /// The shape's content.
    pub kind: ShapeKind,
}

impl ShapeNode {
    /// Create a plain text shape.
    pub fn text(id: u32, name: impl Into<String>, frame: TextFrame) -> Self {
        Self {
            id,
            name: name.into(),
            placeholder: None,
            geometry: None,
            kind: ShapeKind::Text(frame),
        }
    }

    /// Create a placeholder text shape.
    pub fn placeholder(
        id: u32,
        name: impl Into<String>,
        kind: PlaceholderKind,
        idx: u32,
        frame: TextFrame,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            placeholder: Some(Placeholder { kind, idx }),
            geometry: None,
            kind: ShapeKind::Text(frame),
        }
    }

    /// Whether the shape is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    /// The shape's text frame, if it has one.
    pub fn text_frame(&self) -> Option<&TextFrame> {
        match &self.kind {
            ShapeKind::Text(frame) => Some(frame),
            _ => None,
        }
    }

    /// The shape's text frame, mutably.
    pub fn text_frame_mut(&mut self) -> Option<&mut TextFrame> {
        match &mut self.kind {
            ShapeKind::Text(frame) => Some(frame),
            _ => None,
        }
    }

    /// Text of the shape's own frame, paragraphs joined by newlines.
    pub fn frame_text(&self) -> String {
        self.text_frame().map(TextFrame::text).unwrap_or_default()
    }

    fn collect_text(&self, lines: &mut Vec<String>) {
        match &self.kind {
            ShapeKind::Text(frame) => {
                lines.extend(frame.paragraphs.iter().map(Paragraph::text));
            }
            ShapeKind::Table(table) => {
                for cell in table.rows.iter().flatten() {
                    lines.extend(cell.text.paragraphs.iter().map(Paragraph::text));
                }
            }
            ShapeKind::Group(children) => {
                for child in children {
                    child.collect_text(lines);
                }
            }
        }
    }
}

/// Content variants of a shape.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// A shape holding a text frame.
    Text(TextFrame),
    /// A table whose cells each hold a text frame.
    Table(Table),
    /// A group of child shapes.
    Group(Vec<ShapeNode>),
}

impl Default for ShapeKind {
    fn default() -> Self {
        ShapeKind::Text(TextFrame::new())
    }
}

/// Placeholder designation of a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Placeholder type.
    pub kind: PlaceholderKind,
    /// Placeholder index, used to match slide placeholders to layout ones.
    pub idx: u32,
}

/// Placeholder types as used by the package format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    Title,
    CenterTitle,
    SubTitle,
    Body,
    Object,
    Date,
    Footer,
    SlideNumber,
    Picture,
    Table,
    Chart,
    Other(String),
}

impl PlaceholderKind {
    /// Parse the `type` attribute of a placeholder. A missing type means
    /// an object placeholder.
    pub fn from_ooxml(value: Option<&str>) -> Self {
        match value {
            None | Some("obj") => Self::Object,
            Some("title") => Self::Title,
            Some("ctrTitle") => Self::CenterTitle,
            Some("subTitle") => Self::SubTitle,
            Some("body") => Self::Body,
            Some("dt") => Self::Date,
            Some("ftr") => Self::Footer,
            Some("sldNum") => Self::SlideNumber,
            Some("pic") => Self::Picture,
            Some("tbl") => Self::Table,
            Some("chart") => Self::Chart,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    /// The `type` attribute value, or `None` for object placeholders.
    pub fn as_ooxml(&self) -> Option<&str> {
        match self {
            Self::Object => None,
            Self::Title => Some("title"),
            Self::CenterTitle => Some("ctrTitle"),
            Self::SubTitle => Some("subTitle"),
            Self::Body => Some("body"),
            Self::Date => Some("dt"),
            Self::Footer => Some("ftr"),
            Self::SlideNumber => Some("sldNum"),
            Self::Picture => Some("pic"),
            Self::Table => Some("tbl"),
            Self::Chart => Some("chart"),
            Self::Other(other) => Some(other.as_str()),
        }
    }

    /// Date, footer and slide-number placeholders are not cloned onto new
    /// slides.
    pub fn is_footer_like(&self) -> bool {
        matches!(self, Self::Date | Self::Footer | Self::SlideNumber)
    }
}

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Geometry {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }
}

/// An ordered sequence of paragraphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFrame {
    /// Paragraphs in order.
    pub paragraphs: Vec<Paragraph>,

    /// Shrink text on overflow.
    pub shrink_to_fit: bool,
}

impl TextFrame {
    /// A frame with one empty paragraph, as created for a new placeholder.
    pub fn new() -> Self {
        Self {
            paragraphs: vec![Paragraph::new()],
            shrink_to_fit: false,
        }
    }

    /// A frame with no paragraphs at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A frame with one default-styled paragraph per line of `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            paragraphs: text.split('\n').map(Paragraph::with_text).collect(),
            shrink_to_fit: false,
        }
    }

    /// Full text, paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the frame holds no visible text.
    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }
}

/// A line-level grouping of runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    /// Styled runs in order.
    pub runs: Vec<Run>,

    /// Indent level, 0 through 8.
    pub level: u8,

    /// Horizontal alignment, `None` inherits.
    pub alignment: Option<Alignment>,

    /// Line spacing as a multiple of single spacing, `None` inherits.
    pub line_spacing: Option<f32>,
}

impl Paragraph {
    /// An empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// A paragraph with one default-styled run.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            runs: vec![Run::new(text)],
            ..Self::default()
        }
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Parse the `algn` attribute.
    pub fn from_ooxml(value: &str) -> Option<Self> {
        match value {
            "l" => Some(Self::Left),
            "ctr" => Some(Self::Center),
            "r" => Some(Self::Right),
            "just" => Some(Self::Justify),
            _ => None,
        }
    }

    /// The `algn` attribute value.
    pub fn as_ooxml(&self) -> &'static str {
        match self {
            Self::Left => "l",
            Self::Center => "ctr",
            Self::Right => "r",
            Self::Justify => "just",
        }
    }
}

/// The finest-grained styled text unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    /// Run text. Newlines are written as line breaks.
    pub text: String,

    /// Character formatting.
    pub style: RunStyle,

    /// Set when the run is a self-updating field rather than literal text.
    pub field: Option<TextField>,
}

impl Run {
    /// A default-styled run.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
            field: None,
        }
    }

    /// A run with the given style.
    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
            field: None,
        }
    }

    /// A field run showing `text` until the viewer updates it.
    pub fn field(field: TextField, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
            field: Some(field),
        }
    }
}

/// Self-updating text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    SlideNumber,
}

/// Character formatting of a run. Every field is optional; `None` inherits
/// from the layout or master.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub font_name: Option<String>,
    /// Font size in hundredths of a point.
    pub size: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Color,
}

/// Font color of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    #[default]
    None,
    /// Explicit RGB value.
    Rgb([u8; 3]),
    /// Reference to a theme color slot, e.g. `accent1` or `tx1`.
    Theme(String),
}

impl Color {
    /// Parse a `RRGGBB` hex string, with or without a leading `#`.
    pub fn parse_hex(value: &str) -> Option<[u8; 3]> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some([byte(0)?, byte(2)?, byte(4)?])
    }

    /// Format an RGB value as `RRGGBB`.
    pub fn to_hex(rgb: [u8; 3]) -> String {
        format!("{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
    }
}

/// A grid of table cells.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Rows of cells.
    pub rows: Vec<Vec<TableCell>>,

    /// Column widths in EMU.
    pub column_widths: Vec<i64>,
}

impl Table {
    /// A table of empty cells with equal column widths spanning `width`.
    pub fn new(rows: usize, columns: usize, width: i64) -> Self {
        let column_width = if columns == 0 { 0 } else { width / columns as i64 };
        Self {
            rows: (0..rows)
                .map(|_| (0..columns).map(|_| TableCell::default()).collect())
                .collect(),
            column_widths: vec![column_width; columns],
        }
    }

    /// Borrow a cell mutably.
    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row)?.get_mut(column)
    }

    /// Borrow a cell.
    pub fn cell(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.rows.get(row)?.get(column)
    }

    /// All cells, row by row.
    pub fn iter_cells_mut(&mut self) -> impl Iterator<Item = &mut TableCell> {
        self.rows.iter_mut().flatten()
    }
}

/// A single table cell.
#[derive(Debug, Clone)]
pub struct TableCell {
    /// Cell text.
    pub text: TextFrame,

    /// Solid background fill.
    pub fill: Option<[u8; 3]>,

    /// Vertical anchoring of the cell text.
    pub anchor: Option<VerticalAnchor>,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            text: TextFrame::new(),
            fill: None,
            anchor: None,
        }
    }
}

impl TableCell {
    /// Replace the cell text with a single default-styled paragraph.
    pub fn set_text(&mut self, text: &str) {
        self.text = TextFrame::from_text(text);
    }
}

/// Vertical anchoring of text within a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Middle,
    Bottom,
}

impl VerticalAnchor {
    pub fn as_ooxml(&self) -> &'static str {
        match self {
            Self::Top => "t",
            Self::Middle => "ctr",
            Self::Bottom => "b",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_with_placeholders() -> Layout {
        let mut layout = Layout::new("Title and Content", "ppt/slideLayouts/slideLayout2.xml");
        layout.shapes.push(ShapeNode::placeholder(
            2,
            "Title 1",
            PlaceholderKind::Title,
            0,
            TextFrame::from_text("Click to edit"),
        ));
        layout.shapes.push(ShapeNode::placeholder(
            3,
            "Content Placeholder 2",
            PlaceholderKind::Object,
            1,
            TextFrame::from_text("{{ body }}"),
        ));
        layout.shapes.push(ShapeNode::placeholder(
            4,
            "Footer Placeholder 3",
            PlaceholderKind::Footer,
            11,
            TextFrame::from_text("Confidential"),
        ));
        layout
            .shapes
            .push(ShapeNode::text(5, "Logo Text", TextFrame::from_text("ACME")));
        layout
    }

    #[test]
    fn test_slide_from_layout_clones_empty_placeholders() {
        let layout = layout_with_placeholders();
        let slide = Slide::from_layout(1, &layout);

        assert_eq!(slide.layout_index, 1);
        assert_eq!(slide.shapes.len(), 2);
        assert_eq!(slide.shapes[0].name, "Title 1");
        assert!(slide.shapes.iter().all(|s| s.frame_text().is_empty()));
        assert!(slide.placeholder_index(11).is_none());
    }

    #[test]
    fn test_next_shape_id_accounts_for_groups() {
        let mut slide = Slide::default();
        slide.shapes.push(ShapeNode {
            id: 3,
            name: "Group".into(),
            placeholder: None,
            geometry: None,
            kind: ShapeKind::Group(vec![ShapeNode::text(9, "Inner", TextFrame::new())]),
        });
        assert_eq!(slide.next_shape_id(), 10);
        assert_eq!(Slide::default().next_shape_id(), 2);
    }

    #[test]
    fn test_deck_add_slide_rejects_unknown_layout() {
        let mut deck = Deck::new(vec![layout_with_placeholders()]);
        assert_eq!(deck.add_slide(0), Some(0));
        assert_eq!(deck.add_slide(5), None);
        assert_eq!(deck.slides.len(), 1);
    }

    #[test]
    fn test_notes_frame_created_on_first_use() {
        let mut slide = Slide::default();
        assert!(slide.notes.is_none());

        slide.notes_frame_mut().paragraphs[0].runs.push(Run::new("Speaker"));
        slide.notes_frame_mut().paragraphs.push(Paragraph::with_text("notes"));
        assert_eq!(slide.notes.as_ref().map(|n| n.text()), Some("Speaker\nnotes".to_string()));
    }

    #[test]
    fn test_layout_placeholder_lookup() {
        let layout = layout_with_placeholders();
        assert_eq!(layout.placeholders().count(), 3);
        assert!(layout.placeholders().all(ShapeNode::is_placeholder));
        assert!(!layout.shapes.iter().all(ShapeNode::is_placeholder));
        assert_eq!(layout.placeholder(1).map(|s| s.frame_text()), Some("{{ body }}".to_string()));
        assert!(layout.placeholder(7).is_none());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(Color::parse_hex("#2D2869"), Some([0x2D, 0x28, 0x69]));
        assert_eq!(Color::parse_hex("966fd6"), Some([0x96, 0x6F, 0xD6]));
        assert_eq!(Color::parse_hex("xyz"), None);
        assert_eq!(Color::to_hex([0x2D, 0x28, 0x69]), "2D2869");
    }

    #[test]
    fn test_placeholder_kind_round_trip() {
        for raw in ["title", "ctrTitle", "body", "dt", "ftr", "sldNum", "media"] {
            assert_eq!(PlaceholderKind::from_ooxml(Some(raw)).as_ooxml(), Some(raw));
        }
        assert_eq!(PlaceholderKind::from_ooxml(None), PlaceholderKind::Object);
        assert!(PlaceholderKind::Footer.is_footer_like());
        assert!(!PlaceholderKind::Body.is_footer_like());
    }

    #[test]
    fn test_table_new_splits_width() {
        let mut table = Table::new(2, 2, inches(8.0));
        assert_eq!(table.column_widths, vec![inches(4.0), inches(4.0)]);
        table.cell_mut(1, 1).unwrap().set_text("High");
        assert_eq!(table.cell(1, 1).unwrap().text.text(), "High");
        assert!(table.cell_mut(2, 0).is_none());
    }
}
