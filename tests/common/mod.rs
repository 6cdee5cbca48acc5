#![allow(dead_code)]

use std::path::{Path, PathBuf};

use pdf_create::{
    ContentElement, FileExistsAction, FileProperties, HeaderFooterElement, HeaderFooterStyle,
    ImageElement, Options, TableElement, TextElement,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Output target in `dir`. Standard fonts keep the runs independent of the host's font set.
pub fn target(dir: &Path, file_name: &str, action: FileExistsAction) -> FileProperties {
    FileProperties {
        directory: dir.to_path_buf(),
        file_name: file_name.to_string(),
        file_exists_action: action,
        unicode: false,
    }
}

pub fn throwing() -> Options {
    Options {
        throw_error_on_failure: true,
    }
}

pub fn soft() -> Options {
    Options {
        throw_error_on_failure: false,
    }
}

/// Write a solid-colour PNG fixture; `alpha < 255` adds an alpha channel.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32, alpha: u8) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([40, 90, 160, alpha]))
        .save(&path)
        .expect("write png fixture");
    path
}

pub fn paragraph(text: &str) -> ContentElement {
    ContentElement::Paragraph(TextElement {
        text: Some(text.to_string()),
        ..TextElement::default()
    })
}

pub fn image(path: &Path) -> ContentElement {
    ContentElement::Image(ImageElement {
        image_path: Some(path.to_path_buf()),
        ..ImageElement::default()
    })
}

pub fn band_element(text: &str, style: HeaderFooterStyle) -> HeaderFooterElement {
    HeaderFooterElement {
        text: Some(text.to_string()),
        header_footer_style: style,
        ..HeaderFooterElement::default()
    }
}

pub fn header(text: &str) -> ContentElement {
    ContentElement::Header(band_element(text, HeaderFooterStyle::Text))
}

pub fn footer(text: &str) -> ContentElement {
    ContentElement::Footer(band_element(text, HeaderFooterStyle::Text))
}

pub fn table(json: &str) -> ContentElement {
    ContentElement::Table(TableElement {
        table: json.to_string(),
    })
}

/// Single text column of the given width with one row per value.
pub fn text_table(width_cm: f64, values: &[&str]) -> ContentElement {
    let rows: Vec<String> = values.iter().map(|v| format!(r#"{{ "Value": "{v}" }}"#)).collect();
    table(&format!(
        r#"{{ "HasHeaderRow": false, "TableType": "Table",
             "Columns": [ {{ "Name": "Value", "WidthInCm": {width_cm}, "Type": "Text" }} ],
             "RowData": [ {} ] }}"#,
        rows.join(", ")
    ))
}

/// Page count from the page tree's `/Count` entry.
pub fn page_count(pdf: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(pdf);
    let start = text.find("/Count ")? + "/Count ".len();
    text[start..]
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()
}

/// Width and height of every `/MediaBox`, in document order.
pub fn media_boxes(pdf: &[u8]) -> Vec<(f32, f32)> {
    let text = String::from_utf8_lossy(pdf);
    text.match_indices("/MediaBox [")
        .filter_map(|(i, m)| {
            let rest = &text[i + m.len()..];
            let end = rest.find(']')?;
            let nums: Vec<f32> = rest[..end]
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            (nums.len() == 4).then(|| (nums[2] - nums[0], nums[3] - nums[1]))
        })
        .collect()
}

/// Number of image XObjects, soft masks included.
pub fn image_xobject_count(pdf: &[u8]) -> usize {
    String::from_utf8_lossy(pdf).matches("/Subtype /Image").count()
}

/// Files currently in `dir`, sorted by name.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
