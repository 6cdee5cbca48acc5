use crate::input::{FontStyle, ParagraphAlignment, TableBorderStyle, TableStyle, TextFormat};
use crate::model::{
    Alignment, CellBorder, CellBorders, FieldCode, LineSpacing, Paragraph, Run,
};

/// Which edges of each table cell carry a border rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderPlacement {
    None,
    Top,
    Bottom,
    All,
}

/// A fully resolved text style, shared by every run and paragraph built from one element.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleDescriptor {
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub line_spacing: LineSpacing,
    pub space_before: f32,
    pub space_after: f32,
    pub alignment: Alignment,
    pub border_width: f32,
    pub border_placement: BorderPlacement,
}

/// Bold and italic combine; underline stands alone.
fn font_flags(style: FontStyle) -> (bool, bool, bool) {
    match style {
        FontStyle::Regular => (false, false, false),
        FontStyle::Bold => (true, false, false),
        FontStyle::Italic => (false, true, false),
        FontStyle::BoldItalic => (true, true, false),
        FontStyle::Underline => (false, false, true),
    }
}

fn alignment(a: ParagraphAlignment) -> Alignment {
    match a {
        ParagraphAlignment::Left => Alignment::Left,
        ParagraphAlignment::Center => Alignment::Center,
        ParagraphAlignment::Justify => Alignment::Justify,
        ParagraphAlignment::Right => Alignment::Right,
    }
}

fn line_spacing(pts: f32) -> LineSpacing {
    if pts > 0.0 {
        LineSpacing::Exact(pts)
    } else {
        LineSpacing::Auto(1.0)
    }
}

pub fn resolve_text_style(format: &TextFormat) -> StyleDescriptor {
    let (bold, italic, underline) = font_flags(format.font_style);
    StyleDescriptor {
        font_family: format.font_family.clone(),
        font_size: format.font_size,
        bold,
        italic,
        underline,
        line_spacing: line_spacing(format.line_spacing_in_pt),
        space_before: format.spacing_before_in_pt,
        space_after: format.spacing_after_in_pt,
        alignment: alignment(format.paragraph_alignment),
        border_width: 0.0,
        border_placement: BorderPlacement::None,
    }
}

pub fn resolve_table_style(style: &TableStyle) -> StyleDescriptor {
    let (bold, italic, underline) = font_flags(style.font_style);
    StyleDescriptor {
        font_family: style.font_family.clone(),
        font_size: style.font_size_in_pt,
        bold,
        italic,
        underline,
        line_spacing: line_spacing(style.line_spacing_in_pt),
        space_before: style.spacing_before_in_pt,
        space_after: style.spacing_after_in_pt,
        alignment: Alignment::Left,
        border_width: style.border_width_in_pt,
        border_placement: match style.border_style {
            TableBorderStyle::None => BorderPlacement::None,
            TableBorderStyle::Top => BorderPlacement::Top,
            TableBorderStyle::Bottom => BorderPlacement::Bottom,
            TableBorderStyle::All => BorderPlacement::All,
        },
    }
}

impl StyleDescriptor {
    pub fn run(&self, text: &str) -> Run {
        Run {
            text: text.to_string(),
            font_size: self.font_size,
            font_name: self.font_family.clone(),
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            field_code: None,
            is_line_break: false,
        }
    }

    fn field(&self, code: FieldCode) -> Run {
        Run {
            field_code: Some(code),
            ..self.run("")
        }
    }

    fn line_break(&self) -> Run {
        Run {
            is_line_break: true,
            ..self.run("")
        }
    }

    /// Split text into one run per input line, every whitespace character
    /// kept as a single space, lines joined by explicit breaks. Empty text
    /// still yields one empty run so the line keeps its font metrics.
    pub fn text_runs(&self, text: &str) -> Vec<Run> {
        self.line_runs(text, |line| {
            line.chars()
                .map(|c| if c.is_whitespace() { ' ' } else { c })
                .collect()
        })
    }

    /// Like [`text_runs`](Self::text_runs) but each line keeps its
    /// characters as written.
    pub fn literal_runs(&self, text: &str) -> Vec<Run> {
        self.line_runs(text, str::to_string)
    }

    fn line_runs(&self, text: &str, line_text: impl Fn(&str) -> String) -> Vec<Run> {
        let mut runs = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                runs.push(self.line_break());
            }
            runs.push(self.run(&line_text(line)));
        }
        if runs.is_empty() {
            runs.push(self.run(""));
        }
        runs
    }

    /// "current page (total pages)" as live fields.
    pub fn page_number_runs(&self) -> Vec<Run> {
        vec![
            self.field(FieldCode::Page),
            self.run(" ("),
            self.field(FieldCode::NumPages),
            self.run(")"),
        ]
    }

    pub fn paragraph(&self, runs: Vec<Run>) -> Paragraph {
        Paragraph {
            runs,
            alignment: self.alignment,
            space_before: self.space_before,
            space_after: self.space_after,
            line_spacing: self.line_spacing,
        }
    }

    /// Cell borders for this style, or `None` when no rule is drawn.
    pub fn cell_borders(&self) -> Option<CellBorders> {
        if self.border_width <= 0.0 {
            return None;
        }
        let rule = CellBorder::visible(self.border_width);
        let borders = match self.border_placement {
            BorderPlacement::None => return None,
            BorderPlacement::Top => CellBorders {
                top: rule,
                ..CellBorders::default()
            },
            BorderPlacement::Bottom => CellBorders {
                bottom: rule,
                ..CellBorders::default()
            },
            BorderPlacement::All => CellBorders {
                top: rule,
                bottom: rule,
                left: rule,
                right: rule,
            },
        };
        Some(borders)
    }
}
