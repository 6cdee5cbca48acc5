use std::path::Path;

use pdf_writer::{Filter, Pdf, Ref};

use crate::error::Error;
use crate::model::{EmbeddedImage, ImageFormat};

use super::table::ImageNames;

/// Colour channels declared by the first SOF marker of a JPEG stream.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            return data.get(i + 9).copied();
        }
        i += 2 + len;
    }
    None
}

fn invalid(path: &Path, reason: impl ToString) -> Error {
    Error::InvalidImage {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn write_jpeg(pdf: &mut Pdf, xobj_ref: Ref, img: &EmbeddedImage, data: &[u8]) -> Result<(), Error> {
    let components = jpeg_components(data).ok_or_else(|| invalid(&img.path, "no JPEG frame header"))?;
    let mut xobj = pdf.image_xobject(xobj_ref, data);
    xobj.filter(Filter::DctDecode);
    xobj.width(img.pixel_width as i32);
    xobj.height(img.pixel_height as i32);
    match components {
        1 => xobj.color_space().device_gray(),
        4 => xobj.color_space().device_cmyk(),
        _ => xobj.color_space().device_rgb(),
    };
    xobj.bits_per_component(8);
    Ok(())
}

fn write_png(
    pdf: &mut Pdf,
    xobj_ref: Ref,
    img: &EmbeddedImage,
    data: &[u8],
    alloc: &mut dyn FnMut() -> Ref,
) -> Result<(), Error> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| invalid(&img.path, e))?;
    let rgba = decoded.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

    let rgb_data: Vec<u8> = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
    let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

    let smask_ref = if has_alpha {
        let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
        let mask_ref = alloc();
        let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(w as i32);
        mask.height(h as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        Some(mask_ref)
    } else {
        None
    };

    let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
    xobj.filter(Filter::FlateDecode);
    xobj.width(w as i32);
    xobj.height(h as i32);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }
    Ok(())
}

/// Write every distinct image file once and return the XObject names by path
/// together with the resource pairs for the page dictionaries.
pub(super) fn embed_images<'a>(
    pdf: &mut Pdf,
    images: impl IntoIterator<Item = &'a EmbeddedImage>,
    alloc: &mut dyn FnMut() -> Ref,
) -> Result<(ImageNames, Vec<(String, Ref)>), Error> {
    let mut names = ImageNames::new();
    let mut xobjects: Vec<(String, Ref)> = Vec::new();

    for img in images {
        if names.contains_key(&img.path) {
            continue;
        }
        let data = std::fs::read(&img.path).map_err(|_| Error::ImageNotFound(img.path.clone()))?;
        let xobj_ref = alloc();
        match img.format {
            ImageFormat::Jpeg => write_jpeg(pdf, xobj_ref, img, &data)?,
            ImageFormat::Png => write_png(pdf, xobj_ref, img, &data, alloc)?,
        }
        let pdf_name = format!("Im{}", xobjects.len() + 1);
        log::debug!("embedded {} as {pdf_name}", img.path.display());
        names.insert(img.path.clone(), pdf_name.clone());
        xobjects.push((pdf_name, xobj_ref));
    }
    Ok((names, xobjects))
}
