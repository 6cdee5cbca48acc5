//! Renderer-neutral document structure: sections of blocks, each block a
//! styled paragraph, a placed image or a table of cells.

use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineSpacing {
    Auto(f32),  // multiplier of the font's natural line height
    Exact(f32), // fixed height in points
}

/// A value resolved when the page it lands on is known.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldCode {
    Page,
    NumPages,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub font_size: f32,
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub field_code: Option<FieldCode>,
    pub is_line_break: bool,
}

#[derive(Clone, Debug)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub alignment: Alignment,
    pub space_before: f32,
    pub space_after: f32,
    pub line_spacing: LineSpacing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

#[derive(Clone, Debug)]
pub struct EmbeddedImage {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub display_width: f32,  // points
    pub display_height: f32, // points
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HorizontalPosition {
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug)]
pub struct ImageBlock {
    pub image: EmbeddedImage,
    pub position: HorizontalPosition,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellVAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellBorder {
    pub present: bool,
    pub width: f32,
}

impl Default for CellBorder {
    fn default() -> Self {
        Self {
            present: false,
            width: 0.5,
        }
    }
}

impl CellBorder {
    pub fn visible(width: f32) -> Self {
        Self {
            present: true,
            width,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellBorders {
    pub top: CellBorder,
    pub bottom: CellBorder,
    pub left: CellBorder,
    pub right: CellBorder,
}

#[derive(Clone, Copy, Debug)]
pub struct CellMargins {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl Default for CellMargins {
    fn default() -> Self {
        // 1.2 mm left/right padding
        Self {
            top: 0.0,
            left: 3.4,
            bottom: 0.0,
            right: 3.4,
        }
    }
}

/// Cell content, one item per cell. Images are anchored at the cell's top-left.
#[derive(Clone, Debug)]
pub enum CellContent {
    Paragraph(Paragraph),
    Image(EmbeddedImage),
}

#[derive(Clone, Debug)]
pub struct TableCell {
    pub content: CellContent,
    pub borders: CellBorders,
}

#[derive(Clone, Debug)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub v_align: CellVAlign,
}

#[derive(Clone, Debug)]
pub struct Table {
    pub col_widths: Vec<f32>, // points
    pub rows: Vec<TableRow>,
    pub cell_margins: CellMargins,
}

impl Table {
    pub fn new(col_widths: Vec<f32>) -> Self {
        Self {
            col_widths,
            rows: Vec::new(),
            cell_margins: CellMargins::default(),
        }
    }

    pub fn width(&self) -> f32 {
        self.col_widths.iter().sum()
    }

    /// Apply the same border set to every cell of the table.
    pub fn set_borders(&mut self, borders: CellBorders) {
        for cell in self.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
            cell.borders = borders;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectionProperties {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub header_distance: f32,
    pub footer_distance: f32,
}

impl SectionProperties {
    pub fn text_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }
}

#[derive(Clone, Debug)]
pub enum Block {
    Paragraph(Paragraph),
    Image(ImageBlock),
    Table(Table),
}

#[derive(Clone, Debug)]
pub struct Section {
    pub properties: SectionProperties,
    /// Primary header band. `None` inherits the previous section's header when rendered.
    pub header: Option<Table>,
    pub footer: Option<Table>,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(properties: SectionProperties) -> Self {
        Self {
            properties,
            header: None,
            footer: None,
            blocks: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Document {
    pub info: DocumentInfo,
    pub sections: Vec<Section>,
}
