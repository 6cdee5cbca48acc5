use crate::input::{DocumentSettings, Orientation, PageSize};

pub const POINTS_PER_INCH: f64 = 72.0;
pub const CM_PER_INCH: f64 = 2.54;

pub fn cm_to_pt(cm: f64) -> f32 {
    (cm / CM_PER_INCH * POINTS_PER_INCH) as f32
}

pub fn pt_to_cm(pt: f32) -> f64 {
    pt as f64 / POINTS_PER_INCH * CM_PER_INCH
}

pub fn inch_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

/// Portrait width and height of a page size class, in millimeters.
fn portrait_mm(size: PageSize) -> (f64, f64) {
    match size {
        PageSize::A0 => (841.0, 1189.0),
        PageSize::A1 => (594.0, 841.0),
        PageSize::A2 => (420.0, 594.0),
        PageSize::A3 => (297.0, 420.0),
        PageSize::A4 => (210.0, 297.0),
        PageSize::A5 => (148.0, 210.0),
        PageSize::A6 => (105.0, 148.0),
        PageSize::B5 => (176.0, 250.0),
        PageSize::Ledger => (431.8, 279.4),
        PageSize::Legal => (215.9, 355.6),
        PageSize::Letter => (215.9, 279.4),
    }
}

/// Physical page geometry derived from the document settings, in centimeters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width_cm: f64,
    pub height_cm: f64,
    pub margin_left_cm: f64,
    pub margin_right_cm: f64,
    pub margin_top_cm: f64,
    pub margin_bottom_cm: f64,
}

impl PageGeometry {
    pub fn from_settings(settings: &DocumentSettings) -> Self {
        let (w_mm, h_mm) = portrait_mm(settings.size);
        let (w_mm, h_mm) = match settings.orientation {
            Orientation::Portrait => (w_mm, h_mm),
            Orientation::Landscape => (h_mm, w_mm),
        };
        Self {
            width_cm: w_mm / 10.0,
            height_cm: h_mm / 10.0,
            margin_left_cm: settings.margin_left_in_cm,
            margin_right_cm: settings.margin_right_in_cm,
            margin_top_cm: settings.margin_top_in_cm,
            margin_bottom_cm: settings.margin_bottom_in_cm,
        }
    }

    pub fn printable_width_cm(&self) -> f64 {
        self.width_cm - self.margin_left_cm - self.margin_right_cm
    }

    pub fn printable_height_cm(&self) -> f64 {
        self.height_cm - self.margin_top_cm - self.margin_bottom_cm
    }
}
