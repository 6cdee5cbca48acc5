use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::geometry::{cm_to_pt, inch_to_cm};
use crate::input::{ImageAlignment, ImageElement};
use crate::model::{EmbeddedImage, HorizontalPosition, ImageBlock, ImageFormat};

/// Resolution assumed for images that carry no density metadata.
pub const DEFAULT_DPI: f64 = 96.0;

/// Header facts about an image file, enough to size it on the page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub dpi_x: f64,
    pub dpi_y: f64,
}

impl ImageInfo {
    pub fn native_width_cm(&self) -> f64 {
        inch_to_cm(self.pixel_width as f64 / self.dpi_x)
    }

    fn aspect(&self) -> f64 {
        if self.pixel_width == 0 {
            1.0
        } else {
            self.pixel_height as f64 / self.pixel_width as f64
        }
    }
}

pub trait ImageProbe {
    fn probe(&self, path: &Path) -> Result<ImageInfo, Error>;
}

/// Bytes read from the front of a file before falling back to the whole file.
const HEADER_PREFIX: u64 = 64 * 1024;

/// Reads JPEG and PNG headers straight from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImageProbe;

impl ImageProbe for FileImageProbe {
    fn probe(&self, path: &Path) -> Result<ImageInfo, Error> {
        let not_found = |_| Error::ImageNotFound(path.to_path_buf());
        let mut head = Vec::new();
        File::open(path)
            .and_then(|f| f.take(HEADER_PREFIX).read_to_end(&mut head))
            .map_err(not_found)?;

        let truncated = head.len() as u64 == HEADER_PREFIX;
        let mut info = parse_header(&head, truncated);
        if info.is_none() && truncated {
            log::debug!("{}: header runs past {HEADER_PREFIX} bytes", path.display());
            info = parse_image_header(&std::fs::read(path).map_err(not_found)?);
        }
        info.ok_or_else(|| Error::InvalidImage {
            path: path.to_path_buf(),
            reason: "not a JPEG or PNG image".to_string(),
        })
    }
}

pub(crate) fn parse_image_header(data: &[u8]) -> Option<ImageInfo> {
    parse_header(data, false)
}

/// `truncated` marks `data` as a prefix of a longer file, so running out of
/// bytes before the image data means the header is incomplete.
fn parse_header(data: &[u8], truncated: bool) -> Option<ImageInfo> {
    if data.starts_with(&[0xFF, 0xD8]) {
        return parse_jpeg(data);
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return parse_png(data, truncated);
    }
    None
}

fn parse_jpeg(data: &[u8]) -> Option<ImageInfo> {
    let mut dpi = (DEFAULT_DPI, DEFAULT_DPI);
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        if marker == 0xD9 {
            break;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;

        // APP0 JFIF: units, x density, y density
        if marker == 0xE0 && i + 16 <= data.len() && &data[i + 4..i + 9] == b"JFIF\0" {
            let units = data[i + 11];
            let xd = u16::from_be_bytes([data[i + 12], data[i + 13]]) as f64;
            let yd = u16::from_be_bytes([data[i + 14], data[i + 15]]) as f64;
            if xd > 0.0 && yd > 0.0 {
                match units {
                    1 => dpi = (xd, yd),
                    2 => dpi = (xd * 2.54, yd * 2.54),
                    _ => {}
                }
            }
        }

        if matches!(marker, 0xC0 | 0xC1 | 0xC2) && i + 9 < data.len() {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some(ImageInfo {
                format: ImageFormat::Jpeg,
                pixel_width: width,
                pixel_height: height,
                dpi_x: dpi.0,
                dpi_y: dpi.1,
            });
        }
        i += 2 + len;
    }
    None
}

fn parse_png(data: &[u8], truncated: bool) -> Option<ImageInfo> {
    if data.len() < 24 {
        return None;
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    let mut dpi = (DEFAULT_DPI, DEFAULT_DPI);

    let mut pos = 8;
    let mut reached_data = false;
    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let kind = &data[pos + 4..pos + 8];
        if kind == b"IDAT" || kind == b"IEND" {
            reached_data = true;
            break;
        }
        // pHYs: pixels per unit x, y, unit (1 = meter)
        if kind == b"pHYs" && len >= 9 && pos + 17 <= data.len() {
            let d = &data[pos + 8..];
            let px = u32::from_be_bytes([d[0], d[1], d[2], d[3]]) as f64;
            let py = u32::from_be_bytes([d[4], d[5], d[6], d[7]]) as f64;
            if d[8] == 1 && px > 0.0 && py > 0.0 {
                dpi = (px * 0.0254, py * 0.0254);
            }
        }
        pos += 12 + len;
    }
    if truncated && !reached_data {
        return None;
    }

    Some(ImageInfo {
        format: ImageFormat::Png,
        pixel_width: width,
        pixel_height: height,
        dpi_x: dpi.0,
        dpi_y: dpi.1,
    })
}

/// The path if it is non-empty and names an existing file; `missing` builds the error otherwise.
pub(crate) fn existing_file(
    path: Option<&Path>,
    missing: impl FnOnce(PathBuf) -> Error,
) -> Result<PathBuf, Error> {
    match path {
        Some(p) if !p.as_os_str().is_empty() && p.is_file() => Ok(p.to_path_buf()),
        other => Err(missing(other.map(Path::to_path_buf).unwrap_or_default())),
    }
}

fn embedded(path: PathBuf, info: &ImageInfo, width_pt: f32, height_pt: f32) -> EmbeddedImage {
    EmbeddedImage {
        path,
        format: info.format,
        pixel_width: info.pixel_width,
        pixel_height: info.pixel_height,
        display_width: width_pt,
        display_height: height_pt,
    }
}

/// An image scaled to a fixed height with its aspect ratio locked.
/// A non-positive height keeps the native size.
pub(crate) fn image_with_height(
    path: PathBuf,
    probe: &dyn ImageProbe,
    height_cm: f64,
) -> Result<EmbeddedImage, Error> {
    let info = probe.probe(&path)?;
    let (width_cm, height_cm) = if height_cm > 0.0 {
        (height_cm / info.aspect(), height_cm)
    } else {
        let w = info.native_width_cm();
        (w, w * info.aspect())
    };
    Ok(embedded(path, &info, cm_to_pt(width_cm), cm_to_pt(height_cm)))
}

/// A free-standing image block, clamped to the printable width.
pub fn build_image_block(
    element: &ImageElement,
    printable_width_cm: f64,
    probe: &dyn ImageProbe,
) -> Result<ImageBlock, Error> {
    let path = existing_file(element.image_path.as_deref(), Error::ImageNotFound)?;
    let info = probe.probe(&path)?;

    let native_cm = info.native_width_cm();
    let width_cm = native_cm.min(printable_width_cm);
    let height_cm = width_cm * info.aspect();
    log::debug!(
        "image {}: {}x{} px at {:.0} dpi, native {native_cm:.2} cm, placed {width_cm:.2} cm",
        path.display(),
        info.pixel_width,
        info.pixel_height,
        info.dpi_x,
    );

    let position = match element.image_alignment {
        ImageAlignment::Left => HorizontalPosition::Left,
        ImageAlignment::Center => HorizontalPosition::Center,
        ImageAlignment::Right => HorizontalPosition::Right,
    };
    Ok(ImageBlock {
        image: embedded(path, &info, cm_to_pt(width_cm), cm_to_pt(height_cm)),
        position,
    })
}
