//! Caller-facing description of a document: page settings, the ordered
//! content list and the output target. Everything here deserializes from
//! the PascalCase JSON shape used by job files.

mod table;

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, de};

pub use table::{
    ColumnDefinition, ColumnKind, TableBorderStyle, TableDefinition, TableStyle, TableType,
    parse_table_definition,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum PageSize {
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
    B5,
    Ledger,
    Legal,
    Letter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DocumentSettings {
    pub title: Option<String>,
    pub author: Option<String>,
    pub size: PageSize,
    pub orientation: Orientation,
    pub margin_left_in_cm: f64,
    pub margin_top_in_cm: f64,
    pub margin_right_in_cm: f64,
    pub margin_bottom_in_cm: f64,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_left_in_cm: 2.5,
            margin_top_in_cm: 2.0,
            margin_right_in_cm: 2.5,
            margin_bottom_in_cm: 2.0,
        }
    }
}

/// What to do when the output file is already there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum FileExistsAction {
    #[default]
    Error,
    Overwrite,
    Rename,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileProperties {
    pub directory: PathBuf,
    pub file_name: String,
    pub file_exists_action: FileExistsAction,
    /// Embed Unicode TrueType fonts instead of the WinAnsi standard fonts.
    pub unicode: bool,
}

impl Default for FileProperties {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_name: "example_file.pdf".to_string(),
            file_exists_action: FileExistsAction::Error,
            unicode: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Options {
    /// Propagate failures as `Err` instead of reporting `success: false`.
    pub throw_error_on_failure: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            throw_error_on_failure: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Underline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum ParagraphAlignment {
    #[default]
    Left,
    Center,
    Justify,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum ImageAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum HeaderFooterStyle {
    #[default]
    Text,
    TextPagenum,
    LogoText,
    LogoTextPagenum,
    /// A style name that did not match any known layout when the job was decoded.
    #[serde(other)]
    Unrecognized,
}

/// Font and paragraph attributes shared by every text-bearing element.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TextFormat {
    pub font_family: String,
    pub font_size: f32,
    pub font_style: FontStyle,
    pub line_spacing_in_pt: f32,
    pub paragraph_alignment: ParagraphAlignment,
    pub spacing_before_in_pt: f32,
    pub spacing_after_in_pt: f32,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            font_family: "Times New Roman".to_string(),
            font_size: 11.0,
            font_style: FontStyle::Regular,
            line_spacing_in_pt: 14.0,
            paragraph_alignment: ParagraphAlignment::Left,
            spacing_before_in_pt: 8.0,
            spacing_after_in_pt: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TextElement {
    pub text: Option<String>,
    #[serde(flatten)]
    pub format: TextFormat,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImageElement {
    pub image_path: Option<PathBuf>,
    pub image_alignment: ImageAlignment,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HeaderFooterElement {
    pub text: Option<String>,
    #[serde(flatten)]
    pub format: TextFormat,
    pub header_footer_style: HeaderFooterStyle,
    pub image_path: Option<PathBuf>,
    pub border_width_in_pt: f32,
    pub image_height_in_cm: f64,
}

impl Default for HeaderFooterElement {
    fn default() -> Self {
        Self {
            text: None,
            format: TextFormat::default(),
            header_footer_style: HeaderFooterStyle::Text,
            image_path: None,
            border_width_in_pt: 0.0,
            image_height_in_cm: 2.5,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableElement {
    /// Raw JSON table definition, decoded when the element is laid out.
    pub table: String,
}

impl Default for TableElement {
    fn default() -> Self {
        Self {
            table: "{}".to_string(),
        }
    }
}

/// One entry of the ordered content list. An entry without a
/// `ContentType` is read as a paragraph.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "ContentType", remote = "Self")]
pub enum ContentElement {
    Paragraph(TextElement),
    Image(ImageElement),
    PageBreak,
    Header(HeaderFooterElement),
    Footer(HeaderFooterElement),
    Table(TableElement),
}

impl<'de> Deserialize<'de> for ContentElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = serde_json::Value::deserialize(deserializer)?;
        if let Some(fields) = value.as_object_mut() {
            fields
                .entry("ContentType")
                .or_insert_with(|| serde_json::Value::from("Paragraph"));
        }
        ContentElement::deserialize(value).map_err(de::Error::custom)
    }
}

/// True when the text is absent or only whitespace.
pub(crate) fn is_blank(text: Option<&str>) -> bool {
    text.is_none_or(|t| t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_list_decodes_from_job_json() {
        let json = r#"[
            { "ContentType": "Header", "Text": "H", "HeaderFooterStyle": "TextPagenum", "BorderWidthInPt": 0.5 },
            { "ContentType": "Paragraph", "Text": "Body", "FontSize": 16, "FontStyle": "Bold" },
            { "ContentType": "PageBreak" },
            { "ContentType": "Image", "ImagePath": "logo.png", "ImageAlignment": "Center" },
            { "ContentType": "Table", "Table": "{}" }
        ]"#;
        let content: Vec<ContentElement> = serde_json::from_str(json).unwrap();
        assert_eq!(content.len(), 5);
        match &content[0] {
            ContentElement::Header(h) => {
                assert_eq!(h.header_footer_style, HeaderFooterStyle::TextPagenum);
                assert_eq!(h.border_width_in_pt, 0.5);
                assert_eq!(h.image_height_in_cm, 2.5);
                assert_eq!(h.format.font_family, "Times New Roman");
            }
            other => panic!("expected header, got {other:?}"),
        }
        match &content[1] {
            ContentElement::Paragraph(p) => {
                assert_eq!(p.format.font_size, 16.0);
                assert_eq!(p.format.font_style, FontStyle::Bold);
                assert_eq!(p.format.line_spacing_in_pt, 14.0);
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
        assert!(matches!(content[2], ContentElement::PageBreak));
        assert!(matches!(
            &content[3],
            ContentElement::Image(ImageElement { image_alignment: ImageAlignment::Center, .. })
        ));
    }

    #[test]
    fn untagged_element_is_a_paragraph() {
        let element: ContentElement = serde_json::from_str(r#"{ "Text": "hello" }"#).unwrap();
        match element {
            ContentElement::Paragraph(p) => {
                assert_eq!(p.text.as_deref(), Some("hello"));
                assert_eq!(p.format.font_family, "Times New Roman");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }

        let err = serde_json::from_str::<ContentElement>(r#"{ "ContentType": "Chart" }"#).unwrap_err();
        assert!(err.to_string().contains("Chart"));
    }

    #[test]
    fn unknown_header_footer_style_is_kept_for_layout() {
        let json = r#"{ "ContentType": "Footer", "Text": "F", "HeaderFooterStyle": "Banner" }"#;
        let element: ContentElement = serde_json::from_str(json).unwrap();
        match element {
            ContentElement::Footer(f) => {
                assert_eq!(f.header_footer_style, HeaderFooterStyle::Unrecognized)
            }
            other => panic!("expected footer, got {other:?}"),
        }
    }

    #[test]
    fn settings_defaults_match_a4_portrait() {
        let settings: DocumentSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.size, PageSize::A4);
        assert_eq!(settings.orientation, Orientation::Portrait);
        assert_eq!(settings.margin_left_in_cm, 2.5);
        assert_eq!(settings.margin_top_in_cm, 2.0);
        let options: Options = serde_json::from_str("{}").unwrap();
        assert!(options.throw_error_on_failure);
    }

    #[test]
    fn blank_text_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("  \n\t")));
        assert!(!is_blank(Some(" x ")));
    }
}
