use std::path::Path;

use super::image::{ImageProbe, existing_file, image_with_height};
use super::styles::{StyleDescriptor, resolve_table_style};
use crate::error::Error;
use crate::geometry::cm_to_pt;
use crate::input::{ColumnDefinition, ColumnKind, TableDefinition};
use crate::model::{CellBorders, CellContent, CellVAlign, Table, TableCell, TableRow};

/// Slack for float noise when comparing summed centimeters.
const WIDTH_EPSILON_CM: f64 = 1e-9;

/// Column widths in points, failing at the first column whose running
/// total no longer fits the printable width.
pub(crate) fn column_widths(
    columns: &[ColumnDefinition],
    printable_width_cm: f64,
) -> Result<Vec<f32>, Error> {
    let mut running_cm = 0.0;
    columns
        .iter()
        .map(|column| {
            running_cm += column.width_in_cm;
            if running_cm > printable_width_cm + WIDTH_EPSILON_CM {
                return Err(Error::TableTooWide {
                    allowed_cm: printable_width_cm,
                    required_cm: running_cm,
                });
            }
            Ok(cm_to_pt(column.width_in_cm))
        })
        .collect()
}

fn text_cell(style: &StyleDescriptor, text: &str) -> TableCell {
    TableCell {
        content: CellContent::Paragraph(style.paragraph(style.text_runs(text))),
        borders: CellBorders::default(),
    }
}

fn data_cell(
    column: &ColumnDefinition,
    value: &str,
    style: &StyleDescriptor,
    probe: &dyn ImageProbe,
) -> Result<TableCell, Error> {
    let content = match column.kind {
        ColumnKind::Text => return Ok(text_cell(style, value)),
        ColumnKind::Image => {
            let path = existing_file(Some(Path::new(value)), Error::ImageNotFound)?;
            CellContent::Image(image_with_height(path, probe, column.height_in_cm)?)
        }
        ColumnKind::PageNum => CellContent::Paragraph(style.paragraph(style.page_number_runs())),
    };
    Ok(TableCell {
        content,
        borders: CellBorders::default(),
    })
}

/// Lay out a parsed table definition against the printable width.
pub fn build_table(
    definition: &TableDefinition,
    printable_width_cm: f64,
    probe: &dyn ImageProbe,
) -> Result<Table, Error> {
    let col_widths = column_widths(&definition.columns, printable_width_cm)?;
    let style = resolve_table_style(&definition.style_settings);
    let mut table = Table::new(col_widths);

    if definition.has_header_row {
        let cells = definition
            .columns
            .iter()
            .map(|c| text_cell(&style, &c.name))
            .collect();
        table.rows.push(TableRow {
            cells,
            v_align: CellVAlign::Center,
        });
    }

    for row_idx in 0..definition.row_data.len() {
        let values = definition.row_values(row_idx)?;
        let cells = definition
            .columns
            .iter()
            .zip(&values)
            .map(|(column, value)| data_cell(column, value, &style, probe))
            .collect::<Result<Vec<_>, _>>()?;
        table.rows.push(TableRow {
            cells,
            v_align: CellVAlign::Center,
        });
    }

    if let Some(borders) = style.cell_borders() {
        table.set_borders(borders);
    }

    log::debug!(
        "table: {} columns, {} rows, {:.1} pt wide",
        table.col_widths.len(),
        table.rows.len(),
        table.width(),
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::compose::image::ImageInfo;
    use crate::error::ErrorKind;
    use crate::input::parse_table_definition;
    use crate::model::{FieldCode, ImageFormat};

    struct SquareProbe;

    impl ImageProbe for SquareProbe {
        fn probe(&self, _: &Path) -> Result<ImageInfo, Error> {
            Ok(ImageInfo {
                format: ImageFormat::Png,
                pixel_width: 100,
                pixel_height: 100,
                dpi_x: 96.0,
                dpi_y: 96.0,
            })
        }
    }

    fn columns(widths: &[f64]) -> Vec<ColumnDefinition> {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| ColumnDefinition {
                name: format!("c{i}"),
                width_in_cm: *w,
                height_in_cm: 0.0,
                kind: ColumnKind::Text,
            })
            .collect()
    }

    #[test]
    fn overflow_reports_partial_sum_at_failing_column() {
        let err = column_widths(&columns(&[6.0, 6.0, 5.0, 10.0]), 16.0).unwrap_err();
        match err {
            Error::TableTooWide {
                allowed_cm,
                required_cm,
            } => {
                assert_eq!(allowed_cm, 16.0);
                assert_eq!(required_cm, 17.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exact_fit_is_allowed() {
        let widths = column_widths(&columns(&[12.0, 4.0]), 16.0).unwrap();
        assert_eq!(widths.len(), 2);
        let widths = column_widths(&columns(&[5.3, 5.3, 5.4]), 16.0).unwrap();
        assert_eq!(widths.len(), 3);
    }

    #[test]
    fn single_overwide_column_fails_before_rows() {
        let def = parse_table_definition(
            r#"{ "Columns": [ { "Name": "A", "WidthInCm": 21, "Type": "Image" } ],
                 "RowData": [ { "A": "/no/such/image.png" } ] }"#,
        )
        .unwrap();
        let err = build_table(&def, 16.0, &SquareProbe).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LayoutConstraint);
        assert!(err.to_string().contains("16 cm wide"), "{err}");
        assert!(err.to_string().contains("21 cm"), "{err}");
    }

    #[test]
    fn header_row_uses_names_as_plain_text() {
        let def = parse_table_definition(
            r#"{ "HasHeaderRow": true,
                 "Columns": [ { "Name": "Logo", "WidthInCm": 3, "HeightInCm": 1, "Type": "Image" },
                              { "Name": "Page", "WidthInCm": 3, "Type": "PageNum" } ],
                 "RowData": [] }"#,
        )
        .unwrap();
        let table = build_table(&def, 16.0, &SquareProbe).unwrap();
        assert_eq!(table.rows.len(), 1);
        for (cell, name) in table.rows[0].cells.iter().zip(["Logo", "Page"]) {
            match &cell.content {
                CellContent::Paragraph(p) => {
                    assert_eq!(p.runs.len(), 1);
                    assert_eq!(p.runs[0].text, name);
                    assert!(p.runs[0].field_code.is_none());
                }
                other => panic!("header cell should be text, got {other:?}"),
            }
        }
    }

    #[test]
    fn data_rows_follow_column_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let logo: PathBuf = dir.path().join("logo.png");
        std::fs::write(&logo, b"png").unwrap();

        let raw = serde_json::json!({
            "Columns": [
                { "Name": "Name", "WidthInCm": 5, "Type": "Text" },
                { "Name": "Logo", "WidthInCm": 3, "HeightInCm": 2, "Type": "Image" },
                { "Name": "Page", "WidthInCm": 3, "Type": "PageNum" }
            ],
            "RowData": [ { "Page": "", "Logo": logo, "Name": "Acme" } ]
        })
        .to_string();
        let def = parse_table_definition(&raw).unwrap();
        let table = build_table(&def, 16.0, &SquareProbe).unwrap();

        let row = &table.rows[0];
        assert_eq!(row.v_align, CellVAlign::Center);
        assert!(matches!(&row.cells[0].content, CellContent::Paragraph(p) if p.runs[0].text == "Acme"));
        match &row.cells[1].content {
            CellContent::Image(img) => {
                assert!((img.display_height - cm_to_pt(2.0)).abs() < 1e-3);
                assert!((img.display_width - cm_to_pt(2.0)).abs() < 1e-3);
            }
            other => panic!("expected image, got {other:?}"),
        }
        match &row.cells[2].content {
            CellContent::Paragraph(p) => {
                assert_eq!(p.runs[0].field_code, Some(FieldCode::Page));
                assert_eq!(p.runs[2].field_code, Some(FieldCode::NumPages));
            }
            other => panic!("expected page field, got {other:?}"),
        }
    }

    #[test]
    fn missing_cell_image_fails() {
        let def = parse_table_definition(
            r#"{ "Columns": [ { "Name": "Logo", "WidthInCm": 3, "HeightInCm": 1, "Type": "Image" } ],
                 "RowData": [ { "Logo": "" } ] }"#,
        )
        .unwrap();
        let err = build_table(&def, 16.0, &SquareProbe).unwrap_err();
        assert!(matches!(err, Error::ImageNotFound(_)));
    }

    #[test]
    fn borders_applied_only_with_positive_width() {
        let with = parse_table_definition(
            r#"{ "StyleSettings": { "BorderWidthInPt": 1, "BorderStyle": "Top" },
                 "Columns": [ { "Name": "A", "WidthInCm": 3 } ],
                 "RowData": [ { "A": "1" }, { "A": "2" } ] }"#,
        )
        .unwrap();
        let table = build_table(&with, 16.0, &SquareProbe).unwrap();
        assert!(table.rows.iter().all(|r| r.cells[0].borders.top.present));
        assert!(table.rows.iter().all(|r| !r.cells[0].borders.bottom.present));

        let without = parse_table_definition(
            r#"{ "StyleSettings": { "BorderWidthInPt": 0, "BorderStyle": "All" },
                 "Columns": [ { "Name": "A", "WidthInCm": 3 } ],
                 "RowData": [ { "A": "1" } ] }"#,
        )
        .unwrap();
        let table = build_table(&without, 16.0, &SquareProbe).unwrap();
        assert_eq!(table.rows[0].cells[0].borders, CellBorders::default());
    }
}
