use serde::Deserialize;
use serde_json::{Map, Value};

use super::FontStyle;
use crate::error::Error;

/// Where a table definition is placed within its section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum TableType {
    #[default]
    Table,
    Header,
    Footer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum ColumnKind {
    #[default]
    Text,
    Image,
    PageNum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum TableBorderStyle {
    #[default]
    None,
    Top,
    Bottom,
    All,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDefinition {
    pub name: String,
    pub width_in_cm: f64,
    #[serde(default)]
    pub height_in_cm: f64,
    #[serde(rename = "Type", default)]
    pub kind: ColumnKind,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TableStyle {
    pub font_family: String,
    pub font_size_in_pt: f32,
    pub font_style: FontStyle,
    /// Exact line spacing; zero or less means single spacing.
    pub line_spacing_in_pt: f32,
    pub spacing_before_in_pt: f32,
    pub spacing_after_in_pt: f32,
    pub border_width_in_pt: f32,
    pub border_style: TableBorderStyle,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            font_family: "Times New Roman".to_string(),
            font_size_in_pt: 10.0,
            font_style: FontStyle::Regular,
            line_spacing_in_pt: 0.0,
            spacing_before_in_pt: 0.0,
            spacing_after_in_pt: 0.0,
            border_width_in_pt: 0.0,
            border_style: TableBorderStyle::None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDefinition {
    #[serde(default)]
    pub has_header_row: bool,
    #[serde(default)]
    pub table_type: TableType,
    #[serde(default)]
    pub style_settings: TableStyle,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub row_data: Vec<Map<String, Value>>,
}

pub fn parse_table_definition(raw: &str) -> Result<TableDefinition, Error> {
    let definition: TableDefinition = serde_json::from_str(raw)?;
    log::debug!(
        "table definition: {} columns, {} rows, header_row={}, type={:?}",
        definition.columns.len(),
        definition.row_data.len(),
        definition.has_header_row,
        definition.table_type,
    );
    Ok(definition)
}

impl TableDefinition {
    /// Values of one data row in column declaration order.
    /// A column without a matching key in the row is an error, not a blank cell.
    pub fn row_values(&self, row_idx: usize) -> Result<Vec<String>, Error> {
        let Some(row) = self.row_data.get(row_idx) else {
            return Ok(Vec::new());
        };

        let unbound = row
            .keys()
            .filter(|k| !self.columns.iter().any(|c| &c.name == *k))
            .count();
        if unbound > 0 {
            log::warn!("table row {row_idx}: {unbound} value(s) not bound to any column");
        }

        self.columns
            .iter()
            .map(|column| {
                let value = row.get(&column.name).ok_or_else(|| Error::MissingRowValue {
                    row: row_idx,
                    column: column.name.clone(),
                })?;
                match value {
                    Value::String(s) => Ok(s.clone()),
                    Value::Null => Ok(String::new()),
                    Value::Number(n) => Ok(n.to_string()),
                    Value::Bool(b) => Ok(b.to_string()),
                    Value::Array(_) | Value::Object(_) => Err(Error::InvalidRowValue {
                        row: row_idx,
                        column: column.name.clone(),
                    }),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const DEFINITION: &str = r#"{
        "HasHeaderRow": true,
        "TableType": "Table",
        "StyleSettings": {
            "FontFamily": "Arial", "FontSizeInPt": 9, "FontStyle": "BoldItalic",
            "LineSpacingInPt": 11, "SpacingBeforeInPt": 2, "SpacingAfterInPt": 1,
            "BorderWidthInPt": 0.5, "BorderStyle": "All"
        },
        "Columns": [
            { "Name": "Product", "WidthInCm": 6, "HeightInCm": 0, "Type": "Text" },
            { "Name": "Logo", "WidthInCm": 3, "HeightInCm": 1.5, "Type": "Image" },
            { "Name": "Page", "WidthInCm": 3, "Type": "PageNum" }
        ],
        "RowData": [
            { "Logo": "logo.png", "Product": "Widget", "Page": "" },
            { "Product": 42, "Logo": null, "Page": true }
        ]
    }"#;

    #[test]
    fn parses_full_definition() {
        let def = parse_table_definition(DEFINITION).unwrap();
        assert!(def.has_header_row);
        assert_eq!(def.table_type, TableType::Table);
        assert_eq!(def.columns.len(), 3);
        assert_eq!(def.columns[1].kind, ColumnKind::Image);
        assert_eq!(def.columns[2].height_in_cm, 0.0);
        assert_eq!(def.style_settings.font_style, FontStyle::BoldItalic);
        assert_eq!(def.style_settings.border_style, TableBorderStyle::All);
    }

    #[test]
    fn row_values_follow_column_order_not_key_order() {
        let def = parse_table_definition(DEFINITION).unwrap();
        assert_eq!(def.row_values(0).unwrap(), vec!["Widget", "logo.png", ""]);
        assert_eq!(def.row_values(1).unwrap(), vec!["42", "", "true"]);
    }

    #[test]
    fn missing_row_key_is_precondition_error() {
        let raw = r#"{ "Columns": [ { "Name": "A", "WidthInCm": 2 }, { "Name": "B", "WidthInCm": 2 } ],
                       "RowData": [ { "A": "x" } ] }"#;
        let def = parse_table_definition(raw).unwrap();
        let err = def.row_values(0).unwrap_err();
        assert!(matches!(&err, Error::MissingRowValue { row: 0, column } if column == "B"));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn style_settings_may_be_omitted() {
        let raw = r#"{ "HasHeaderRow": true, "TableType": "Footer",
                       "Columns": [ { "Name": "Sarake 1", "WidthInCm": 21, "HeightInCm": 0, "Type": "Text" } ],
                       "RowData": [] }"#;
        let def = parse_table_definition(raw).unwrap();
        assert_eq!(def.table_type, TableType::Footer);
        assert_eq!(def.style_settings.font_family, "Times New Roman");
        assert_eq!(def.style_settings.border_style, TableBorderStyle::None);
    }

    #[test]
    fn malformed_payload_fails() {
        for raw in ["", "{}", r#"{ "Columns": "nope" }"#, r#"{ "Columns": [ { "Name": "A" } ] }"#] {
            let err = parse_table_definition(raw).unwrap_err();
            assert!(matches!(err, Error::InvalidTable(_)), "{raw}");
            assert_eq!(err.kind(), ErrorKind::Precondition);
        }
    }
}
