//! Color science used by the contrast and vision passes.
//!
//! Luminance and contrast follow WCAG 2.1:
//! <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>

mod parse;

pub use parse::{ColorParseError, parse_color, parse_color_alpha};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An sRGB color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 0.0 (transparent) ..= 1.0 (opaque)
    pub a: f64,
}

impl ColorSample {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self {
            r,
            g,
            b,
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Builds a color from float channels, rounding and clamping to `0..=255`.
    pub fn from_channels(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self::rgba(clamp_channel(r), clamp_channel(g), clamp_channel(b), a)
    }

    pub fn luminance(&self) -> f64 {
        luminance(self.r, self.g, self.b)
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= OPAQUE_ALPHA
    }

    pub fn opaque(self) -> Self {
        Self { a: 1.0, ..self }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Source-over compositing of `self` on top of `bottom`.
    pub fn over(self, bottom: ColorSample) -> ColorSample {
        let a_top = self.a;
        let a_bottom = bottom.a;
        let out_a = a_top + a_bottom * (1.0 - a_top);
        if out_a <= 0.0 {
            return ColorSample::TRANSPARENT;
        }
        let channel = |top: u8, bottom: u8| {
            (f64::from(top) * a_top + f64::from(bottom) * a_bottom * (1.0 - a_top)) / out_a
        };
        ColorSample::from_channels(
            channel(self.r, bottom.r),
            channel(self.g, bottom.g),
            channel(self.b, bottom.b),
            out_a,
        )
    }
}

impl fmt::Display for ColorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, round_to(self.a, 3))
        }
    }
}

/// Accumulated alpha at or above this counts as fully opaque.
pub const OPAQUE_ALPHA: f64 = 0.999;

pub fn clamp_channel(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let p = 10f64.powi(decimals);
    (v * p).round() / p
}

/// Relative luminance of an sRGB color.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    let linear = |c: u8| {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Contrast ratio in `1.0..=21.0`. Symmetric in its arguments.
pub fn contrast_ratio(c1: &ColorSample, c2: &ColorSample) -> f64 {
    let l1 = c1.luminance();
    let l2 = c2.luminance();
    let (lighter, darker) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WcagLevel {
    AA,
    AAA,
}

impl WcagLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            WcagLevel::AA => "AA",
            WcagLevel::AAA => "AAA",
        }
    }
}

impl fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WcagLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AA" => Ok(WcagLevel::AA),
            "AAA" => Ok(WcagLevel::AAA),
            other => Err(format!("invalid WCAG level: {other} (expected AA|AAA)")),
        }
    }
}

pub fn required_ratio(level: WcagLevel, large_text: bool) -> f64 {
    match (level, large_text) {
        (WcagLevel::AA, false) => 4.5,
        (WcagLevel::AA, true) => 3.0,
        (WcagLevel::AAA, false) => 7.0,
        (WcagLevel::AAA, true) => 4.5,
    }
}

/// 18px and up, or 14px and up when bold.
pub fn is_large_text(font_size_px: f64, font_weight: u16) -> bool {
    font_size_px >= 18.0 || (font_size_px >= 14.0 && font_weight >= 700)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContrastResult {
    pub ratio: f64,
    pub required_ratio: f64,
    pub passes: bool,
    pub level: WcagLevel,
}

/// The threshold is inclusive: a ratio equal to the requirement passes.
pub fn check_compliance(ratio: f64, large_text: bool, level: WcagLevel) -> ContrastResult {
    let required = required_ratio(level, large_text);
    ContrastResult {
        ratio,
        required_ratio: required,
        passes: ratio >= required,
        level,
    }
}
