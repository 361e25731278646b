//! Stamp placement relative to each page's own box.

use super::font::StampFont;
use crate::types::WatermarkSpec;

pub const CORNER_FONT_SIZE: f32 = 7.0;
/// Quarter inch from the left/right edges.
pub const CORNER_MARGIN_X: f32 = 18.0;
pub const BOTTOM_BASELINE: f32 = 6.0;
pub const TOP_BASELINE_OFFSET: f32 = 12.0;
pub const CORNER_GRAY: f32 = 0.5;

pub const DIAGONAL_FONT_SIZE: f32 = 36.0;
pub const DIAGONAL_ANGLE_DEG: f32 = 45.0;
pub const DIAGONAL_GRAY: f32 = 0.9;
pub const DIAGONAL_OPACITY: f32 = 0.3;

/// A page rectangle in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    /// US Letter, used when a page declares no MediaBox.
    pub const LETTER: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    /// Normalize a `[llx lly urx ury]` rectangle given in any corner order.
    pub fn from_corners(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            x0: a.min(c),
            y0: b.min(d),
            x1: a.max(c),
            y1: b.max(d),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// One positioned line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedStamp {
    pub text: String,
    pub size: f32,
    /// Baseline origin.
    pub x: f32,
    pub y: f32,
    pub angle_deg: f32,
    pub gray: f32,
    /// `None` draws fully opaque.
    pub opacity: Option<f32>,
}

/// Stamps for one page: bottom-left and top-right corner lines, plus the
/// centered diagonal e-mail when enabled.
pub fn stamp_layout(
    page: PageBox,
    font: &StampFont,
    spec: &WatermarkSpec,
    diagonal: bool,
) -> Vec<PlacedStamp> {
    let text = spec.stamp_text();
    let text_width = font.text_width(&text, CORNER_FONT_SIZE);

    let mut stamps = vec![
        PlacedStamp {
            text: text.clone(),
            size: CORNER_FONT_SIZE,
            x: page.x0 + CORNER_MARGIN_X,
            y: page.y0 + BOTTOM_BASELINE,
            angle_deg: 0.0,
            gray: CORNER_GRAY,
            opacity: None,
        },
        PlacedStamp {
            text,
            size: CORNER_FONT_SIZE,
            x: page.x1 - CORNER_MARGIN_X - text_width,
            y: page.y1 - TOP_BASELINE_OFFSET,
            angle_deg: 0.0,
            gray: CORNER_GRAY,
            opacity: None,
        },
    ];

    if diagonal {
        let email = spec.customer_email.clone();
        let half = font.text_width(&email, DIAGONAL_FONT_SIZE) / 2.0;
        let (sin, cos) = DIAGONAL_ANGLE_DEG.to_radians().sin_cos();
        let center_x = page.x0 + page.width() / 2.0;
        let center_y = page.y0 + page.height() / 2.0;

        stamps.push(PlacedStamp {
            text: email,
            size: DIAGONAL_FONT_SIZE,
            x: center_x - half * cos,
            y: center_y - half * sin,
            angle_deg: DIAGONAL_ANGLE_DEG,
            gray: DIAGONAL_GRAY,
            opacity: Some(DIAGONAL_OPACITY),
        });
    }

    stamps
}
