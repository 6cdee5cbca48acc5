use std::borrow::Cow;

use pdf_writer::{Content, Name, Str};

use crate::error::Error;
use crate::fonts::{FontEntry, FontMap, lookup};
use crate::model::{Alignment, FieldCode, LineSpacing, Paragraph, Run};

pub(super) struct TextChunk<'f> {
    pub(super) font: &'f FontEntry,
    pub(super) text: String,
    pub(super) field: Option<FieldCode>,
    pub(super) font_size: f32,
    pub(super) x_offset: f32, // x relative to line start
    pub(super) width: f32,
    pub(super) underline: bool,
    pub(super) is_space: bool,
}

impl TextChunk<'_> {
    fn resolved_text(&self, page_num: usize, total_pages: usize) -> Cow<'_, str> {
        match self.field {
            Some(FieldCode::Page) => Cow::Owned(page_num.to_string()),
            Some(FieldCode::NumPages) => Cow::Owned(total_pages.to_string()),
            None => Cow::Borrowed(&self.text),
        }
    }
}

pub(super) struct TextLine<'f> {
    pub(super) chunks: Vec<TextChunk<'f>>,
    pub(super) total_width: f32,
    /// Ends the paragraph or precedes an explicit break; never justified.
    pub(super) hard_end: bool,
}

/// A positioned drawing instruction. Page-number fields inside text stay
/// unresolved until the page is painted.
pub(super) enum DrawOp<'f> {
    Text {
        line: TextLine<'f>,
        x: f32,
        width: f32,
        baseline: f32,
        alignment: Alignment,
    },
    Image {
        name: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Rule {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
    },
}

/// Vertical metrics of one paragraph's lines.
#[derive(Clone, Copy, Debug)]
pub(super) struct LineMetrics {
    pub(super) line_h: f32,
    pub(super) ascent: f32,
}

fn resolve_line_h(ls: LineSpacing, font_size: f32, line_h_ratio: Option<f32>) -> f32 {
    match ls {
        LineSpacing::Auto(mult) => line_h_ratio
            .map(|ratio| font_size * ratio * mult)
            .unwrap_or(font_size * 1.2 * mult),
        LineSpacing::Exact(pts) => pts,
    }
}

/// Metrics from the run with the tallest visual ascent.
pub(super) fn paragraph_metrics(para: &Paragraph, fonts: &FontMap) -> Result<LineMetrics, Error> {
    let mut best_font_size = para.runs.first().map_or(10.0, |r| r.font_size);
    let mut best_ascent = 0.0f32;
    let mut best_line_h_ratio: Option<f32> = None;

    for run in &para.runs {
        let entry = lookup(fonts, run)?;
        let ascent = run.font_size * entry.ascender_ratio.unwrap_or(0.75);
        if ascent > best_ascent {
            best_ascent = ascent;
            best_font_size = run.font_size;
            best_line_h_ratio = entry.line_h_ratio;
        }
    }
    if best_ascent == 0.0 {
        best_ascent = best_font_size * 0.75;
    }
    Ok(LineMetrics {
        line_h: resolve_line_h(para.line_spacing, best_font_size, best_line_h_ratio),
        ascent: best_ascent,
    })
}

/// Alternating runs of whitespace and non-whitespace, in order.
fn tokens(text: &str) -> impl Iterator<Item = (bool, &str)> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_space = first.is_whitespace();
        let end = rest
            .find(|c: char| c.is_whitespace() != is_space)
            .unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        rest = tail;
        Some((is_space, token))
    })
}

fn finish_line<'f>(chunks: &mut Vec<TextChunk<'f>>, hard_end: bool) -> TextLine<'f> {
    while chunks.last().is_some_and(|c| c.is_space) && !hard_end {
        chunks.pop();
    }
    let total_width = chunks.last().map(|c| c.x_offset + c.width).unwrap_or(0.0);
    TextLine {
        chunks: std::mem::take(chunks),
        total_width,
        hard_end,
    }
}

fn chunk<'f>(
    font: &'f FontEntry,
    run: &Run,
    text: String,
    x: f32,
    width: f32,
    is_space: bool,
) -> TextChunk<'f> {
    TextChunk {
        font,
        text,
        field: run.field_code,
        font_size: run.font_size,
        x_offset: x,
        width,
        underline: run.underline,
        is_space,
    }
}

/// Wrap a paragraph's runs into lines no wider than `max_width`.
///
/// Whitespace is kept as written; only the spaces at a soft wrap are
/// dropped. Page-number fields are measured as `field_digits` zeros.
pub(super) fn build_paragraph_lines<'f>(
    para: &Paragraph,
    fonts: &'f FontMap,
    max_width: f32,
    field_digits: usize,
) -> Result<Vec<TextLine<'f>>, Error> {
    let mut lines = Vec::new();
    let mut current: Vec<TextChunk<'f>> = Vec::new();
    let mut x = 0.0f32;
    let mut wrapped = false;

    for run in &para.runs {
        if run.is_line_break {
            lines.push(finish_line(&mut current, true));
            x = 0.0;
            wrapped = false;
            continue;
        }
        let font = lookup(fonts, run)?;

        let pieces: Vec<(bool, String)> = match run.field_code {
            Some(_) => vec![(false, "0".repeat(field_digits.max(1)))],
            None => tokens(&run.text).map(|(s, t)| (s, t.to_string())).collect(),
        };

        for (is_space, text) in pieces {
            let width = font.text_width(&text, run.font_size);
            if is_space {
                if current.is_empty() && wrapped {
                    continue;
                }
            } else if current.iter().any(|c| !c.is_space) && x + width > max_width {
                lines.push(finish_line(&mut current, false));
                x = 0.0;
                wrapped = true;
            }
            current.push(chunk(font, run, text, x, width, is_space));
            x += width;
        }
    }
    lines.push(finish_line(&mut current, true));
    Ok(lines)
}

/// Text block of pre-built lines starting at `first_baseline`, one `line_h` apart.
pub(super) fn line_ops<'f>(
    lines: Vec<TextLine<'f>>,
    x: f32,
    width: f32,
    first_baseline: f32,
    line_h: f32,
    alignment: Alignment,
) -> Vec<DrawOp<'f>> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| DrawOp::Text {
            line,
            x,
            width,
            baseline: first_baseline - i as f32 * line_h,
            alignment,
        })
        .collect()
}

fn paint_line(
    content: &mut Content,
    line: &TextLine,
    x: f32,
    width: f32,
    baseline: f32,
    alignment: Alignment,
    page_num: usize,
    total_pages: usize,
) {
    if line.chunks.is_empty() {
        return;
    }
    let line_start_x = match alignment {
        Alignment::Center => x + (width - line.total_width) / 2.0,
        Alignment::Right => x + width - line.total_width,
        Alignment::Left | Alignment::Justify => x,
    };
    let spaces = line.chunks.iter().filter(|c| c.is_space).count();
    let extra_per_space = if alignment == Alignment::Justify && !line.hard_end && spaces > 0 {
        ((width - line.total_width) / spaces as f32).max(0.0)
    } else {
        0.0
    };

    let mut underlines: Vec<(f32, f32, f32, f32)> = Vec::new();
    let mut cur_font: Option<(&str, f32)> = None;
    let mut shift = 0.0f32;
    let mut td_x = 0.0f32;
    let mut td_y = 0.0f32;

    content.begin_text();
    for chunk in &line.chunks {
        let cx = line_start_x + chunk.x_offset + shift;
        let chunk_w = if chunk.is_space {
            chunk.width + extra_per_space
        } else {
            chunk.width
        };
        if chunk.is_space {
            shift += extra_per_space;
        }

        if !chunk.is_space {
            let pdf_font = chunk.font.pdf_name.as_str();
            if cur_font != Some((pdf_font, chunk.font_size)) {
                content.set_font(Name(pdf_font.as_bytes()), chunk.font_size);
                cur_font = Some((pdf_font, chunk.font_size));
            }
            content.next_line(cx - td_x, baseline - td_y);
            td_x = cx;
            td_y = baseline;
            let text = chunk.resolved_text(page_num, total_pages);
            content.show(Str(&chunk.font.encode(&text)));
        }

        if chunk.underline {
            let thick = (chunk.font_size * 0.05).max(0.5);
            let ul_y = baseline - chunk.font_size * 0.12;
            underlines.push((cx, ul_y - thick, chunk_w, thick));
        }
    }
    content.end_text();

    for (ux, uy, uw, uh) in underlines {
        content.rect(ux, uy, uw, uh).fill_nonzero();
    }
}

/// Paint positioned ops, substituting page-number fields.
pub(super) fn paint_ops(content: &mut Content, ops: &[DrawOp], page_num: usize, total_pages: usize) {
    for op in ops {
        match op {
            DrawOp::Text {
                line,
                x,
                width,
                baseline,
                alignment,
            } => paint_line(content, line, *x, *width, *baseline, *alignment, page_num, total_pages),
            DrawOp::Image {
                name,
                x,
                y,
                width,
                height,
            } => {
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
            DrawOp::Rule { from, to, width } => {
                content.save_state();
                content.set_line_width(*width);
                content.move_to(from.0, from.1);
                content.line_to(to.0, to.1);
                content.stroke();
                content.restore_state();
            }
        }
    }
}
