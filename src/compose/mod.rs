//! Turns the caller's settings and ordered content list into the
//! renderer-neutral `Document`: one section per page-break-delimited run of
//! content, each with its blocks and optional header/footer band.
//!
//! Nothing here touches the output file; the only I/O is reading image
//! headers through the `ImageProbe`.

mod header_footer;
mod image;
mod styles;
mod table;

pub use header_footer::compose_header_footer;
pub use image::{DEFAULT_DPI, FileImageProbe, ImageInfo, ImageProbe, build_image_block};
pub use styles::{BorderPlacement, StyleDescriptor, resolve_table_style, resolve_text_style};
pub use table::build_table;

use crate::error::Error;
use crate::geometry::{PageGeometry, cm_to_pt};
use crate::input::{ContentElement, DocumentSettings, TableType, is_blank, parse_table_definition};
use crate::model::{Block, Document, DocumentInfo, Section, SectionProperties, Table};

/// Distance from the page edge to the header and footer bands.
pub const HEADER_FOOTER_DISTANCE_CM: f64 = 1.25;

/// Which repeating band of a section a table is placed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    Header,
    Footer,
}

impl Band {
    pub fn name(self) -> &'static str {
        match self {
            Band::Header => "header",
            Band::Footer => "footer",
        }
    }
}

pub fn section_properties(geometry: &PageGeometry) -> SectionProperties {
    SectionProperties {
        page_width: cm_to_pt(geometry.width_cm),
        page_height: cm_to_pt(geometry.height_cm),
        margin_top: cm_to_pt(geometry.margin_top_cm),
        margin_bottom: cm_to_pt(geometry.margin_bottom_cm),
        margin_left: cm_to_pt(geometry.margin_left_cm),
        margin_right: cm_to_pt(geometry.margin_right_cm),
        header_distance: cm_to_pt(HEADER_FOOTER_DISTANCE_CM),
        footer_distance: cm_to_pt(HEADER_FOOTER_DISTANCE_CM),
    }
}

/// Sections built so far plus the one still receiving content.
struct SectionAccumulator {
    closed: Vec<Section>,
    current: Section,
}

impl SectionAccumulator {
    fn new(properties: SectionProperties) -> Self {
        Self {
            closed: Vec::new(),
            current: Section::new(properties),
        }
    }

    fn set_band(&mut self, band: Band, table: Table) {
        let slot = match band {
            Band::Header => &mut self.current.header,
            Band::Footer => &mut self.current.footer,
        };
        if slot.replace(table).is_some() {
            log::warn!(
                "section {}: a later {} replaces the earlier one",
                self.closed.len(),
                band.name()
            );
        }
    }

    fn apply(
        mut self,
        element: &ContentElement,
        geometry: &PageGeometry,
        probe: &dyn ImageProbe,
    ) -> Result<Self, Error> {
        match element {
            ContentElement::Paragraph(p) => {
                if is_blank(p.text.as_deref()) {
                    log::debug!("paragraph: blank text, skipped");
                } else {
                    let style = resolve_text_style(&p.format);
                    let text = p.text.as_deref().unwrap_or_default();
                    self.current
                        .blocks
                        .push(Block::Paragraph(style.paragraph(style.text_runs(text))));
                }
            }
            ContentElement::Image(img) => {
                let block = build_image_block(img, geometry.printable_width_cm(), probe)?;
                self.current.blocks.push(Block::Image(block));
            }
            ContentElement::PageBreak => {
                let next = Section::new(section_properties(geometry));
                let done = std::mem::replace(&mut self.current, next);
                self.closed.push(done);
                log::debug!("page break: section {} opened", self.closed.len());
            }
            ContentElement::Header(h) => {
                if let Some(table) = compose_header_footer(h, Band::Header, probe)? {
                    self.set_band(Band::Header, table);
                }
            }
            ContentElement::Footer(f) => {
                if let Some(table) = compose_header_footer(f, Band::Footer, probe)? {
                    self.set_band(Band::Footer, table);
                }
            }
            ContentElement::Table(t) => {
                let definition = parse_table_definition(&t.table)?;
                let table = build_table(&definition, geometry.printable_width_cm(), probe)?;
                match definition.table_type {
                    TableType::Table => self.current.blocks.push(Block::Table(table)),
                    TableType::Header => self.set_band(Band::Header, table),
                    TableType::Footer => self.set_band(Band::Footer, table),
                }
            }
        }
        Ok(self)
    }

    fn finish(mut self) -> Vec<Section> {
        self.closed.push(self.current);
        self.closed
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|v| !is_blank(Some(v.as_str()))).cloned()
}

/// Build the whole document structure, or fail on the first element that
/// cannot be laid out.
pub fn compose(
    settings: &DocumentSettings,
    content: &[ContentElement],
    probe: &dyn ImageProbe,
) -> Result<Document, Error> {
    let geometry = PageGeometry::from_settings(settings);
    log::debug!(
        "page {:?} {:?}: {:.1} x {:.1} cm, printable width {:.2} cm",
        settings.size,
        settings.orientation,
        geometry.width_cm,
        geometry.height_cm,
        geometry.printable_width_cm(),
    );

    let start = SectionAccumulator::new(section_properties(&geometry));
    let sections = content
        .iter()
        .try_fold(start, |acc, element| acc.apply(element, &geometry, probe))?
        .finish();

    Ok(Document {
        info: DocumentInfo {
            title: non_blank(settings.title.as_ref()),
            author: non_blank(settings.author.as_ref()),
        },
        sections,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::error::ErrorKind;
    use crate::input::{HeaderFooterElement, HeaderFooterStyle, TableElement, TextElement};
    use crate::model::ImageFormat;

    struct NoImages;

    impl ImageProbe for NoImages {
        fn probe(&self, path: &Path) -> Result<ImageInfo, Error> {
            Err(Error::ImageNotFound(path.to_path_buf()))
        }
    }

    struct Square;

    impl ImageProbe for Square {
        fn probe(&self, _: &Path) -> Result<ImageInfo, Error> {
            Ok(ImageInfo {
                format: ImageFormat::Png,
                pixel_width: 10,
                pixel_height: 10,
                dpi_x: DEFAULT_DPI,
                dpi_y: DEFAULT_DPI,
            })
        }
    }

    fn paragraph(text: &str) -> ContentElement {
        ContentElement::Paragraph(TextElement {
            text: Some(text.to_string()),
            ..TextElement::default()
        })
    }

    fn header(text: &str) -> ContentElement {
        ContentElement::Header(HeaderFooterElement {
            text: Some(text.to_string()),
            ..HeaderFooterElement::default()
        })
    }

    fn table(json: &str) -> ContentElement {
        ContentElement::Table(TableElement {
            table: json.to_string(),
        })
    }

    #[test]
    fn page_break_opens_section_with_same_geometry() {
        let settings = DocumentSettings::default();
        let doc = compose(
            &settings,
            &[paragraph("one"), ContentElement::PageBreak, paragraph("two")],
            &NoImages,
        )
        .unwrap();
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].properties, doc.sections[1].properties);
        assert_eq!(doc.sections[0].blocks.len(), 1);
        assert_eq!(doc.sections[1].blocks.len(), 1);
        assert!((doc.sections[0].properties.text_width() - cm_to_pt(16.0)).abs() < 1e-3);
    }

    #[test]
    fn blank_elements_add_no_blocks() {
        let doc = compose(
            &DocumentSettings::default(),
            &[paragraph(""), paragraph("  \t"), header(" "), paragraph("kept")],
            &NoImages,
        )
        .unwrap();
        let section = &doc.sections[0];
        assert_eq!(section.blocks.len(), 1);
        assert!(section.header.is_none());
    }

    #[test]
    fn bands_attach_to_current_section() {
        let doc = compose(
            &DocumentSettings::default(),
            &[
                header("first"),
                paragraph("body"),
                ContentElement::PageBreak,
                paragraph("more"),
            ],
            &NoImages,
        )
        .unwrap();
        assert!(doc.sections[0].header.is_some());
        assert!(doc.sections[1].header.is_none());
    }

    #[test]
    fn table_type_routes_placement() {
        let footer_table = r#"{ "TableType": "Footer", "Columns": [ { "Name": "A", "WidthInCm": 4 } ],
                                "RowData": [ { "A": "x" } ] }"#;
        let body_table = r#"{ "Columns": [ { "Name": "A", "WidthInCm": 4 } ], "RowData": [] }"#;
        let doc = compose(
            &DocumentSettings::default(),
            &[table(footer_table), table(body_table)],
            &NoImages,
        )
        .unwrap();
        let section = &doc.sections[0];
        assert!(section.footer.is_some());
        assert_eq!(section.blocks.len(), 1);
        assert!(matches!(section.blocks[0], Block::Table(_)));
    }

    #[test]
    fn first_failure_aborts_the_build() {
        let wide = r#"{ "Columns": [ { "Name": "A", "WidthInCm": 21 } ], "RowData": [] }"#;
        let err = compose(
            &DocumentSettings::default(),
            &[paragraph("before"), table(wide), paragraph("after")],
            &NoImages,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LayoutConstraint);

        let err = compose(
            &DocumentSettings::default(),
            &[ContentElement::Footer(HeaderFooterElement {
                text: Some("F".into()),
                header_footer_style: HeaderFooterStyle::Unrecognized,
                ..HeaderFooterElement::default()
            })],
            &NoImages,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LayoutConstraint);

        let err = compose(&DocumentSettings::default(), &[table("not json")], &NoImages).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn image_block_uses_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        std::fs::write(&path, b"png").unwrap();
        let doc = compose(
            &DocumentSettings::default(),
            &[ContentElement::Image(crate::input::ImageElement {
                image_path: Some(path),
                ..Default::default()
            })],
            &Square,
        )
        .unwrap();
        assert!(matches!(doc.sections[0].blocks[0], Block::Image(_)));
    }

    #[test]
    fn document_info_skips_blank_values() {
        let settings = DocumentSettings {
            title: Some("Report".into()),
            author: Some("  ".into()),
            ..DocumentSettings::default()
        };
        let doc = compose(&settings, &[], &NoImages).unwrap();
        assert_eq!(doc.info.title.as_deref(), Some("Report"));
        assert_eq!(doc.info.author, None);
        assert_eq!(doc.sections.len(), 1);
    }
}
