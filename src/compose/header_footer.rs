use super::Band;
use super::image::{ImageProbe, existing_file, image_with_height};
use super::styles::{StyleDescriptor, resolve_text_style};
use crate::error::Error;
use crate::geometry::cm_to_pt;
use crate::input::{HeaderFooterElement, HeaderFooterStyle, is_blank};
use crate::model::{
    Alignment, CellBorder, CellBorders, CellContent, CellVAlign, Run, Table, TableCell, TableRow,
};

/// Column widths in centimeters for each layout.
fn layout_widths(style: HeaderFooterStyle) -> Option<&'static [f64]> {
    match style {
        HeaderFooterStyle::Text => Some(&[16.0]),
        HeaderFooterStyle::TextPagenum => Some(&[12.0, 4.0]),
        HeaderFooterStyle::LogoText => Some(&[5.0, 11.0]),
        HeaderFooterStyle::LogoTextPagenum => Some(&[5.0, 7.0, 4.0]),
        HeaderFooterStyle::Unrecognized => None,
    }
}

fn paragraph_cell(style: &StyleDescriptor, runs: Vec<Run>) -> TableCell {
    TableCell {
        content: CellContent::Paragraph(style.paragraph(runs)),
        borders: CellBorders::default(),
    }
}

/// Build the band table for a header or footer element.
/// Blank text yields `Ok(None)`: the element contributes nothing.
pub fn compose_header_footer(
    element: &HeaderFooterElement,
    band: Band,
    probe: &dyn ImageProbe,
) -> Result<Option<Table>, Error> {
    let Some(text) = element.text.as_deref().filter(|t| !is_blank(Some(*t))) else {
        log::debug!("{}: blank text, skipped", band.name());
        return Ok(None);
    };

    let widths = layout_widths(element.header_footer_style)
        .ok_or(Error::UnknownHeaderFooterStyle(band.name()))?;
    let style = resolve_text_style(&element.format);

    let with_logo = matches!(
        element.header_footer_style,
        HeaderFooterStyle::LogoText | HeaderFooterStyle::LogoTextPagenum
    );
    let with_pagenum = matches!(
        element.header_footer_style,
        HeaderFooterStyle::TextPagenum | HeaderFooterStyle::LogoTextPagenum
    );

    let mut cells = Vec::with_capacity(widths.len());
    if with_logo {
        let path = existing_file(element.image_path.as_deref(), Error::MissingGraphics)?;
        let logo = image_with_height(path, probe, element.image_height_in_cm)?;
        cells.push(TableCell {
            content: CellContent::Image(logo),
            borders: CellBorders::default(),
        });
    }
    cells.push(paragraph_cell(&style, style.literal_runs(text)));
    if with_pagenum {
        let right = StyleDescriptor {
            alignment: Alignment::Right,
            ..style.clone()
        };
        cells.push(paragraph_cell(&right, right.page_number_runs()));
    }

    let mut table = Table::new(widths.iter().map(|w| cm_to_pt(*w)).collect());
    table.rows.push(TableRow {
        cells,
        v_align: CellVAlign::Center,
    });

    if element.border_width_in_pt > 0.0 {
        let rule = CellBorder::visible(element.border_width_in_pt);
        let borders = match band {
            Band::Header => CellBorders {
                bottom: rule,
                ..CellBorders::default()
            },
            Band::Footer => CellBorders {
                top: rule,
                ..CellBorders::default()
            },
        };
        table.set_borders(borders);
    }

    log::debug!(
        "{}: {:?} layout, {} columns",
        band.name(),
        element.header_footer_style,
        table.col_widths.len()
    );
    Ok(Some(table))
}
