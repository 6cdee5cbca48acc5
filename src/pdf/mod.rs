//! PDF back end: embeds fonts and images, paginates the section blocks and
//! writes the final byte stream.

mod images;
mod layout;
mod table;

use std::collections::{HashMap, HashSet};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::error::Error;
use crate::fonts::{FontMap, FontRequest, font_key, register_font};
use crate::model::{
    Block, CellContent, Document, EmbeddedImage, HorizontalPosition, ImageBlock, Paragraph, Run,
    Section, SectionProperties, Table,
};

use layout::{DrawOp, build_paragraph_lines, paint_ops, paragraph_metrics};
use table::{ImageNames, compute_row_layouts, row_ops, table_block_ops, table_height};

/// Turns a composed `Document` into output bytes.
pub trait Renderer {
    fn render(&self, doc: &Document) -> Result<Vec<u8>, Error>;
}

/// Renderer writing PDF 1.7 through `pdf-writer`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfRenderer {
    /// Embed system TrueType fonts instead of the standard 14 faces.
    pub unicode: bool,
}

impl PdfRenderer {
    pub fn new(unicode: bool) -> Self {
        Self { unicode }
    }
}

impl Renderer for PdfRenderer {
    fn render(&self, doc: &Document) -> Result<Vec<u8>, Error> {
        render(doc, self.unicode)
    }
}

fn section_tables(section: &Section) -> impl Iterator<Item = &Table> {
    section
        .header
        .iter()
        .chain(section.footer.iter())
        .chain(section.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        }))
}

fn all_paragraphs(doc: &Document) -> impl Iterator<Item = &Paragraph> {
    doc.sections.iter().flat_map(|s| {
        let body = s.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        });
        let cells = section_tables(s)
            .flat_map(|t| t.rows.iter())
            .flat_map(|r| r.cells.iter())
            .filter_map(|c| match &c.content {
                CellContent::Paragraph(p) => Some(p),
                CellContent::Image(_) => None,
            });
        body.chain(cells)
    })
}

fn all_images(doc: &Document) -> impl Iterator<Item = &EmbeddedImage> {
    doc.sections.iter().flat_map(|s| {
        let body = s.blocks.iter().filter_map(|b| match b {
            Block::Image(ib) => Some(&ib.image),
            _ => None,
        });
        let cells = section_tables(s)
            .flat_map(|t| t.rows.iter())
            .flat_map(|r| r.cells.iter())
            .filter_map(|c| match &c.content {
                CellContent::Image(img) => Some(img),
                CellContent::Paragraph(_) => None,
            });
        body.chain(cells)
    })
}

/// Register every font variant the runs use, subset to the characters they need.
fn register_fonts(
    pdf: &mut Pdf,
    runs: &[&Run],
    unicode: bool,
    alloc: &mut impl FnMut() -> Ref,
) -> (FontMap, Vec<(String, Ref)>) {
    let mut used_chars: HashMap<String, HashSet<char>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for run in runs {
        let key = font_key(run);
        let chars = used_chars.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            HashSet::new()
        });
        chars.extend(run.text.chars());
        if run.field_code.is_some() {
            chars.extend('0'..='9');
        }
    }

    let mut fonts = FontMap::new();
    let mut pairs = Vec::new();
    for key in order {
        let Some(run) = runs.iter().find(|r| font_key(r) == key) else {
            continue;
        };
        let pdf_name = format!("F{}", pairs.len() + 1);
        let request = FontRequest {
            family: run.font_name.trim(),
            bold: run.bold,
            italic: run.italic,
            used_chars: &used_chars[&key],
        };
        let entry = register_font(pdf, &request, pdf_name.clone(), unicode, alloc);
        pairs.push((pdf_name, entry.font_ref));
        fonts.insert(key, entry);
    }
    (fonts, pairs)
}

/// A laid-out header or footer band, shared by every page of its section.
struct BandLayout<'f> {
    ops: Vec<DrawOp<'f>>,
    top: f32,
    bottom: f32,
}

fn header_band<'f>(
    table: &Table,
    props: &SectionProperties,
    fonts: &'f FontMap,
    field_digits: usize,
    images: &ImageNames,
) -> Result<BandLayout<'f>, Error> {
    let top = props.page_height - props.header_distance;
    let (ops, height) = table_block_ops(table, fonts, field_digits, props.margin_left, top, images)?;
    Ok(BandLayout {
        ops,
        top,
        bottom: top - height,
    })
}

fn footer_band<'f>(
    table: &Table,
    props: &SectionProperties,
    fonts: &'f FontMap,
    field_digits: usize,
    images: &ImageNames,
) -> Result<BandLayout<'f>, Error> {
    let bottom = props.footer_distance;
    let top = bottom + table_height(table, fonts, field_digits)?;
    let (ops, _) = table_block_ops(table, fonts, field_digits, props.margin_left, top, images)?;
    Ok(BandLayout { ops, top, bottom })
}

struct PageLayout<'f> {
    section: usize,
    ops: Vec<DrawOp<'f>>,
}

/// Flows section blocks down the body area, opening pages as they fill.
struct Paginator<'a, 'f> {
    fonts: &'f FontMap,
    images: &'a ImageNames,
    field_digits: usize,
    pages: Vec<PageLayout<'f>>,
    section: usize,
    body_top: f32,
    body_bottom: f32,
    left: f32,
    width: f32,
    cursor_y: f32,
    at_page_top: bool,
    prev_space_after: f32,
}

impl<'a, 'f> Paginator<'a, 'f> {
    fn new(fonts: &'f FontMap, images: &'a ImageNames, field_digits: usize) -> Self {
        Self {
            fonts,
            images,
            field_digits,
            pages: Vec::new(),
            section: 0,
            body_top: 0.0,
            body_bottom: 0.0,
            left: 0.0,
            width: 0.0,
            cursor_y: 0.0,
            at_page_top: true,
            prev_space_after: 0.0,
        }
    }

    fn start_section(&mut self, section: usize, props: &SectionProperties, body_top: f32, body_bottom: f32) {
        self.section = section;
        self.body_top = body_top;
        self.body_bottom = body_bottom;
        self.left = props.margin_left;
        self.width = props.text_width();
        self.new_page();
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout {
            section: self.section,
            ops: Vec::new(),
        });
        self.cursor_y = self.body_top;
        self.at_page_top = true;
        self.prev_space_after = 0.0;
    }

    fn push(&mut self, op: DrawOp<'f>) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn gap(&self, space_before: f32) -> f32 {
        if self.at_page_top {
            0.0
        } else {
            self.prev_space_after + space_before
        }
    }

    /// Opens a new page unless `height` fits below the cursor or the page is still empty.
    fn ensure_room(&mut self, height: f32) {
        if !self.at_page_top && self.cursor_y - height < self.body_bottom {
            self.new_page();
        }
    }

    /// Moves the cursor past `gap`, or to a fresh page when the first
    /// `height` points of the block would not fit after it.
    fn open_gap(&mut self, gap: f32, height: f32) {
        if self.at_page_top || self.cursor_y - gap - height >= self.body_bottom {
            self.cursor_y -= gap;
        } else {
            self.new_page();
        }
    }

    fn paragraph(&mut self, para: &Paragraph) -> Result<(), Error> {
        let lines = build_paragraph_lines(para, self.fonts, self.width, self.field_digits)?;
        let metrics = paragraph_metrics(para, self.fonts)?;

        self.open_gap(self.gap(para.space_before), metrics.line_h);

        for line in lines {
            self.ensure_room(metrics.line_h);
            self.push(DrawOp::Text {
                line,
                x: self.left,
                width: self.width,
                baseline: self.cursor_y - metrics.ascent,
                alignment: para.alignment,
            });
            self.cursor_y -= metrics.line_h;
            self.at_page_top = false;
        }
        self.prev_space_after = para.space_after;
        Ok(())
    }

    fn image(&mut self, block: &ImageBlock) {
        let Some(name) = self.images.get(&block.image.path).cloned() else {
            return;
        };
        let mut width = block.image.display_width;
        let mut height = block.image.display_height;
        let body_h = self.body_top - self.body_bottom;
        if height > body_h && height > 0.0 {
            let scale = body_h / height;
            log::warn!(
                "image {} is taller than the page body, scaled to {:.0}%",
                block.image.path.display(),
                scale * 100.0
            );
            width *= scale;
            height = body_h;
        }

        self.open_gap(self.gap(0.0), height);

        let x = match block.position {
            HorizontalPosition::Left => self.left,
            HorizontalPosition::Center => self.left + (self.width - width) / 2.0,
            HorizontalPosition::Right => self.left + self.width - width,
        };
        self.push(DrawOp::Image {
            name,
            x,
            y: self.cursor_y - height,
            width,
            height,
        });
        self.cursor_y -= height;
        self.at_page_top = false;
        self.prev_space_after = 0.0;
    }

    fn table(&mut self, table: &Table) -> Result<(), Error> {
        let layouts = compute_row_layouts(table, self.fonts, self.field_digits)?;
        let first_row = layouts.first().map_or(0.0, |l| l.height);
        self.open_gap(self.gap(0.0), first_row);

        for (row, layout) in table.rows.iter().zip(layouts) {
            let height = layout.height;
            self.ensure_room(height);
            let ops = row_ops(table, row, layout, self.left, self.cursor_y, self.images);
            if let Some(page) = self.pages.last_mut() {
                page.ops.extend(ops);
            }
            self.cursor_y -= height;
            self.at_page_top = false;
        }
        self.prev_space_after = 0.0;
        Ok(())
    }
}

struct Pagination<'f> {
    pages: Vec<PageLayout<'f>>,
    bands: Vec<BandLayout<'f>>,
    /// Header and footer band index per section, after inheritance.
    section_bands: Vec<(Option<usize>, Option<usize>)>,
}

fn paginate<'f>(
    doc: &Document,
    fonts: &'f FontMap,
    images: &ImageNames,
    field_digits: usize,
) -> Result<Pagination<'f>, Error> {
    let mut bands: Vec<BandLayout<'f>> = Vec::new();
    let mut section_bands = Vec::with_capacity(doc.sections.len());
    let mut paginator = Paginator::new(fonts, images, field_digits);
    let (mut header, mut footer) = (None, None);

    for (si, section) in doc.sections.iter().enumerate() {
        let props = &section.properties;
        if let Some(t) = &section.header {
            bands.push(header_band(t, props, fonts, field_digits, images)?);
            header = Some(bands.len() - 1);
        }
        if let Some(t) = &section.footer {
            bands.push(footer_band(t, props, fonts, field_digits, images)?);
            footer = Some(bands.len() - 1);
        }
        section_bands.push((header, footer));

        let body_top = header.map_or(props.page_height - props.margin_top, |h| {
            (props.page_height - props.margin_top).min(bands[h].bottom)
        });
        let body_bottom = footer.map_or(props.margin_bottom, |f| props.margin_bottom.max(bands[f].top));
        paginator.start_section(si, props, body_top, body_bottom);

        for block in &section.blocks {
            match block {
                Block::Paragraph(p) => paginator.paragraph(p)?,
                Block::Image(ib) => paginator.image(ib),
                Block::Table(t) => paginator.table(t)?,
            }
        }
    }

    Ok(Pagination {
        pages: paginator.pages,
        bands,
        section_bands,
    })
}

fn digits(n: usize) -> usize {
    n.to_string().len()
}

fn render(doc: &Document, unicode: bool) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: fonts
    let runs: Vec<&Run> = all_paragraphs(doc).flat_map(|p| p.runs.iter()).collect();
    let (fonts, font_pairs) = register_fonts(&mut pdf, &runs, unicode, &mut alloc);
    let t_fonts = t0.elapsed();

    // Phase 2: images
    let (image_names, image_xobjects) = images::embed_images(&mut pdf, all_images(doc), &mut alloc)?;
    let t_images = t0.elapsed();

    // Phase 3: layout; page-number fields are re-measured until the digit count settles
    let mut field_digits = 1;
    let layout = loop {
        let pagination = paginate(doc, &fonts, &image_names, field_digits)?;
        let needed = digits(pagination.pages.len());
        if needed <= field_digits {
            break pagination;
        }
        log::debug!("{} pages need {needed}-digit page fields, laying out again", pagination.pages.len());
        field_digits = needed;
    };
    let t_layout = t0.elapsed();

    // Phase 4: paint
    let n = layout.pages.len();
    let mut page_ids = Vec::with_capacity(n);
    let mut content_ids = Vec::with_capacity(n);
    for page in &layout.pages {
        let mut content = Content::new();
        let (header, footer) = layout.section_bands[page.section];
        for band in [header, footer].into_iter().flatten() {
            paint_ops(&mut content, &layout.bands[band].ops, page_ids.len() + 1, n);
        }
        paint_ops(&mut content, &page.ops, page_ids.len() + 1, n);

        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        let content_id = alloc();
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);
        page_ids.push(alloc());
        content_ids.push(content_id);
    }
    let t_paint = t0.elapsed();

    // Phase 5: document structure
    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for (i, page_layout) in layout.pages.iter().enumerate() {
        let sp = &doc.sections[page_layout.section].properties;
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, sp.page_width, sp.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    if doc.info.title.is_some() || doc.info.author.is_some() {
        let info_id = alloc();
        let mut info = pdf.document_info(info_id);
        if let Some(title) = &doc.info.title {
            info.title(TextStr(title));
        }
        if let Some(author) = &doc.info.author {
            info.author(TextStr(author));
        }
    }

    let t_assembly = t0.elapsed();
    log::info!(
        "Render phases: fonts={:.1}ms, images={:.1}ms, layout={:.1}ms, paint={:.1}ms, assembly={:.1}ms, pages={n}",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_layout - t_images).as_secs_f64() * 1000.0,
        (t_paint - t_layout).as_secs_f64() * 1000.0,
        (t_assembly - t_paint).as_secs_f64() * 1000.0,
    );

    Ok(pdf.finish())
}
