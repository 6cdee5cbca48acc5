use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Error;
use crate::fonts::FontMap;
use crate::model::{CellBorder, CellContent, CellVAlign, Table, TableRow};

use super::layout::{DrawOp, LineMetrics, TextLine, build_paragraph_lines, line_ops, paragraph_metrics};

/// XObject names of embedded images, by source path.
pub(super) type ImageNames = HashMap<PathBuf, String>;

enum CellLayout<'f> {
    Text {
        lines: Vec<TextLine<'f>>,
        metrics: LineMetrics,
        space_before: f32,
        height: f32,
    },
    Image {
        height: f32,
    },
}

impl CellLayout<'_> {
    fn height(&self) -> f32 {
        match self {
            CellLayout::Text { height, .. } | CellLayout::Image { height } => *height,
        }
    }
}

pub(super) struct RowLayout<'f> {
    pub(super) height: f32,
    cells: Vec<CellLayout<'f>>,
}

pub(super) fn compute_row_layouts<'f>(
    table: &Table,
    fonts: &'f FontMap,
    field_digits: usize,
) -> Result<Vec<RowLayout<'f>>, Error> {
    let cm = &table.cell_margins;
    table
        .rows
        .iter()
        .map(|row| {
            let cells = row
                .cells
                .iter()
                .zip(&table.col_widths)
                .map(|(cell, &col_w)| match &cell.content {
                    CellContent::Paragraph(para) => {
                        let cell_text_w = (col_w - cm.left - cm.right).max(0.0);
                        let lines = build_paragraph_lines(para, fonts, cell_text_w, field_digits)?;
                        let metrics = paragraph_metrics(para, fonts)?;
                        let height = para.space_before
                            + lines.len() as f32 * metrics.line_h
                            + para.space_after;
                        Ok(CellLayout::Text {
                            lines,
                            metrics,
                            space_before: para.space_before,
                            height,
                        })
                    }
                    CellContent::Image(img) => Ok(CellLayout::Image {
                        height: img.display_height,
                    }),
                })
                .collect::<Result<Vec<_>, Error>>()?;

            let content_h = cells.iter().map(CellLayout::height).fold(0.0f32, f32::max);
            Ok(RowLayout {
                height: content_h + cm.top + cm.bottom,
                cells,
            })
        })
        .collect()
}

fn rule(border: &CellBorder, from: (f32, f32), to: (f32, f32)) -> Option<DrawOp<'static>> {
    border.present.then_some(DrawOp::Rule {
        from,
        to,
        width: border.width,
    })
}

/// Draw ops for one row whose top edge sits at `row_top`.
pub(super) fn row_ops<'f>(
    table: &Table,
    row: &TableRow,
    layout: RowLayout<'f>,
    table_left: f32,
    row_top: f32,
    images: &ImageNames,
) -> Vec<DrawOp<'f>> {
    let cm = &table.cell_margins;
    let row_h = layout.height;
    let row_bottom = row_top - row_h;
    let mut ops = Vec::new();

    let mut cell_x = table_left;
    for ((cell, cell_layout), &col_w) in row.cells.iter().zip(layout.cells).zip(&table.col_widths) {
        let text_x = cell_x + cm.left;
        let text_w = (col_w - cm.left - cm.right).max(0.0);

        match (cell_layout, &cell.content) {
            (
                CellLayout::Text {
                    lines,
                    metrics,
                    space_before,
                    height,
                },
                CellContent::Paragraph(para),
            ) => {
                let avail = row_h - cm.top - cm.bottom;
                let offset = match row.v_align {
                    CellVAlign::Top => 0.0,
                    CellVAlign::Center => ((avail - height) / 2.0).max(0.0),
                    CellVAlign::Bottom => (avail - height).max(0.0),
                };
                let first_baseline = row_top - cm.top - offset - space_before - metrics.ascent;
                ops.extend(line_ops(
                    lines,
                    text_x,
                    text_w,
                    first_baseline,
                    metrics.line_h,
                    para.alignment,
                ));
            }
            (CellLayout::Image { .. }, CellContent::Image(img)) => {
                if let Some(name) = images.get(&img.path) {
                    ops.push(DrawOp::Image {
                        name: name.clone(),
                        x: text_x,
                        y: row_top - cm.top - img.display_height,
                        width: img.display_width,
                        height: img.display_height,
                    });
                }
            }
            _ => {}
        }

        let b = &cell.borders;
        let right = cell_x + col_w;
        ops.extend(
            [
                rule(&b.top, (cell_x, row_top), (right, row_top)),
                rule(&b.bottom, (cell_x, row_bottom), (right, row_bottom)),
                rule(&b.left, (cell_x, row_top), (cell_x, row_bottom)),
                rule(&b.right, (right, row_top), (right, row_bottom)),
            ]
            .into_iter()
            .flatten(),
        );

        cell_x = right;
    }
    ops
}

/// All rows stacked from `top`, with no page breaks. Returns the ops and the total height.
pub(super) fn table_block_ops<'f>(
    table: &Table,
    fonts: &'f FontMap,
    field_digits: usize,
    table_left: f32,
    top: f32,
    images: &ImageNames,
) -> Result<(Vec<DrawOp<'f>>, f32), Error> {
    let layouts = compute_row_layouts(table, fonts, field_digits)?;
    let mut ops = Vec::new();
    let mut y = top;
    for (row, layout) in table.rows.iter().zip(layouts) {
        let h = layout.height;
        ops.extend(row_ops(table, row, layout, table_left, y, images));
        y -= h;
    }
    Ok((ops, top - y))
}

/// Total height of a table laid out without page breaks.
pub(super) fn table_height(table: &Table, fonts: &FontMap, field_digits: usize) -> Result<f32, Error> {
    Ok(compute_row_layouts(table, fonts, field_digits)?
        .iter()
        .map(|r| r.height)
        .sum())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pdf_writer::{Pdf, Ref};

    use super::*;
    use crate::fonts::{FontRequest, font_key, register_font};
    use crate::model::{
        Alignment, CellBorders, EmbeddedImage, ImageFormat, LineSpacing, Paragraph, Run, TableCell,
    };

    fn run(text: &str) -> Run {
        Run {
            text: text.to_string(),
            font_size: 10.0,
            font_name: "Courier".to_string(),
            bold: false,
            italic: false,
            underline: false,
            field_code: None,
            is_line_break: false,
        }
    }

    fn fonts() -> FontMap {
        let mut pdf = Pdf::new();
        let mut next = 0;
        let mut alloc = || {
            next += 1;
            Ref::new(next)
        };
        let request = FontRequest {
            family: "Courier",
            bold: false,
            italic: false,
            used_chars: &HashSet::new(),
        };
        let entry = register_font(&mut pdf, &request, "F1".into(), false, &mut alloc);
        HashMap::from([(font_key(&run("")), entry)])
    }

    fn text_cell(text: &str) -> TableCell {
        TableCell {
            content: CellContent::Paragraph(Paragraph {
                runs: vec![run(text)],
                alignment: Alignment::Left,
                space_before: 0.0,
                space_after: 0.0,
                line_spacing: LineSpacing::Exact(12.0),
            }),
            borders: CellBorders::default(),
        }
    }

    fn image_cell(height: f32) -> TableCell {
        TableCell {
            content: CellContent::Image(EmbeddedImage {
                path: PathBuf::from("logo.png"),
                format: ImageFormat::Png,
                pixel_width: 10,
                pixel_height: 10,
                display_width: height,
                display_height: height,
            }),
            borders: CellBorders::default(),
        }
    }

    fn table(rows: Vec<Vec<TableCell>>, widths: Vec<f32>) -> Table {
        let mut t = Table::new(widths);
        t.rows = rows
            .into_iter()
            .map(|cells| TableRow {
                cells,
                v_align: CellVAlign::Center,
            })
            .collect();
        t
    }

    #[test]
    fn row_height_is_tallest_cell() {
        let fonts = fonts();
        // 60pt column minus 6.8pt padding fits 8 Courier chars per line
        let t = table(
            vec![vec![text_cell("aaaa bbbb cccc"), image_cell(30.0)]],
            vec![60.0, 60.0],
        );
        let layouts = compute_row_layouts(&t, &fonts, 1).unwrap();
        assert_eq!(layouts[0].cells.len(), 2);
        assert!((layouts[0].height - 36.0).abs() < 1e-4);

        let t = table(vec![vec![text_cell("x"), image_cell(30.0)]], vec![60.0, 60.0]);
        assert!((table_height(&t, &fonts, 1).unwrap() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn borders_become_rules() {
        let fonts = fonts();
        let mut t = table(vec![vec![text_cell("a"), text_cell("b")]], vec![50.0, 50.0]);
        t.set_borders(CellBorders {
            bottom: CellBorder::visible(1.0),
            ..CellBorders::default()
        });
        let mut images = ImageNames::new();
        images.insert(PathBuf::from("logo.png"), "Im1".into());
        let (ops, height) = table_block_ops(&t, &fonts, 1, 10.0, 100.0, &images).unwrap();
        assert!((height - 12.0).abs() < 1e-4);
        let rules: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rule { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(rules, vec![((10.0, 88.0), (60.0, 88.0)), ((60.0, 88.0), (110.0, 88.0))]);
    }

    #[test]
    fn image_anchors_top_left_inside_padding() {
        let fonts = fonts();
        let t = table(vec![vec![image_cell(20.0)]], vec![50.0]);
        let mut images = ImageNames::new();
        images.insert(PathBuf::from("logo.png"), "Im1".into());
        let (ops, _) = table_block_ops(&t, &fonts, 1, 0.0, 100.0, &images).unwrap();
        match &ops[0] {
            DrawOp::Image { name, x, y, .. } => {
                assert_eq!(name, "Im1");
                assert!((x - 3.4).abs() < 1e-4);
                assert!((y - 80.0).abs() < 1e-4);
            }
            _ => panic!("expected image op"),
        }
    }
}
