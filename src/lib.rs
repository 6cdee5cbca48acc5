mod compose;
mod error;
mod fonts;
pub mod geometry;
mod input;
pub mod model;
mod output;
mod pdf;

pub use compose::{
    Band, BorderPlacement, DEFAULT_DPI, FileImageProbe, ImageInfo, ImageProbe, StyleDescriptor,
    build_image_block, build_table, compose, compose_header_footer, resolve_table_style,
    resolve_text_style,
};
pub use error::{Error, ErrorKind};
pub use geometry::PageGeometry;
pub use input::{
    ColumnDefinition, ColumnKind, ContentElement, DocumentSettings, FileExistsAction,
    FileProperties, FontStyle, HeaderFooterElement, HeaderFooterStyle, ImageAlignment,
    ImageElement, Options, Orientation, PageSize, ParagraphAlignment, TableBorderStyle,
    TableDefinition, TableElement, TableStyle, TableType, TextElement, TextFormat,
    parse_table_definition,
};
pub use output::resolve_output_path;
pub use pdf::{PdfRenderer, Renderer};

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

/// Outcome of one document build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateResult {
    pub success: bool,
    /// Absolute path of the written file; `None` when the build failed.
    pub file_name: Option<PathBuf>,
}

/// Build the document and write it under `file`, using the PDF renderer and
/// the on-disk image probe.
pub fn create(
    settings: &DocumentSettings,
    content: &[ContentElement],
    file: &FileProperties,
    options: Options,
) -> Result<CreateResult, Error> {
    let renderer = PdfRenderer::new(file.unicode);
    create_with(&renderer, &FileImageProbe, settings, content, file, options)
}

pub fn create_with(
    renderer: &dyn Renderer,
    probe: &dyn ImageProbe,
    settings: &DocumentSettings,
    content: &[ContentElement],
    file: &FileProperties,
    options: Options,
) -> Result<CreateResult, Error> {
    match build(renderer, probe, settings, content, file) {
        Ok(path) => Ok(CreateResult {
            success: true,
            file_name: Some(path),
        }),
        Err(e) if options.throw_error_on_failure => Err(e),
        Err(e) => {
            log::error!("PDF creation failed ({:?}): {e}", e.kind());
            Ok(CreateResult {
                success: false,
                file_name: None,
            })
        }
    }
}

fn build(
    renderer: &dyn Renderer,
    probe: &dyn ImageProbe,
    settings: &DocumentSettings,
    content: &[ContentElement],
    file: &FileProperties,
) -> Result<PathBuf, Error> {
    let t0 = Instant::now();

    let doc = compose(settings, content, probe)?;
    let t_compose = t0.elapsed();

    let path = resolve_output_path(&file.directory, &file.file_name, file.file_exists_action)?;
    let bytes = renderer.render(&doc)?;
    let t_render = t0.elapsed();

    std::fs::write(&path, &bytes)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: compose={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_compose.as_secs_f64() * 1000.0,
        (t_render - t_compose).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );
    log::info!("Wrote {}", path.display());

    Ok(path)
}
