//! Effective background color behind an element.
//!
//! Backgrounds are alpha-composited from the element outwards until the stack
//! is opaque. Images and gradients cannot be reduced to one color, so the walk
//! gives up on them and reports where the image sits instead.

use anyhow::Result;

use crate::color::{ColorParseError, ColorSample, OPAQUE_ALPHA, parse_color_alpha};
use crate::page::{NodeId, PageSnapshot, Pseudo, ancestors_inclusive};

/// Channels at or below this count as black for overlay detection.
const NEAR_BLACK_MAX: u8 = 30;
/// Minimum overlay alpha that reliably darkens an arbitrary image.
const OVERLAY_MIN_ALPHA: f64 = 0.55;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The composited background, always fully opaque.
    Opaque(ColorSample),
    /// An element on the walk has a background image or gradient.
    OverImage { ancestor: NodeId, image: String },
    /// A background color on the walk could not be parsed.
    Unparsed { value: String, error: ColorParseError },
}

pub fn resolve(page: &dyn PageSnapshot, node: NodeId) -> Result<Resolution> {
    let mut acc = ColorSample::TRANSPARENT;
    for n in ancestors_inclusive(page, node)? {
        let style = page.computed_style(n, Pseudo::None)?;
        if let Some(image) = style.background_image() {
            return Ok(Resolution::OverImage {
                ancestor: n,
                image: image.to_string(),
            });
        }
        let value = style.get_or("background-color", "transparent");
        let layer = match parse_color_alpha(value) {
            Ok(color) => color,
            Err(error) => {
                return Ok(Resolution::Unparsed {
                    value: value.to_string(),
                    error,
                });
            }
        };
        acc = acc.over(layer);
        if acc.a >= OPAQUE_ALPHA {
            return Ok(Resolution::Opaque(acc.opaque()));
        }
    }
    let base = document_background(page)?;
    Ok(Resolution::Opaque(acc.over(base).opaque()))
}

/// Opaque `body` or `html` background, white when neither sets one.
pub fn document_background(page: &dyn PageSnapshot) -> Result<ColorSample> {
    for wanted in ["body", "html"] {
        for node in page.elements() {
            if page.tag_name(node)? != wanted {
                continue;
            }
            let style = page.computed_style(node, Pseudo::None)?;
            if let Ok(color) = parse_color_alpha(style.get_or("background-color", "transparent")) {
                if color.is_opaque() {
                    return Ok(color);
                }
            }
            break;
        }
    }
    Ok(ColorSample::WHITE)
}

pub fn is_near_black(color: &ColorSample) -> bool {
    color.r <= NEAR_BLACK_MAX && color.g <= NEAR_BLACK_MAX && color.b <= NEAR_BLACK_MAX
}

fn is_dark_overlay(color: &ColorSample) -> bool {
    is_near_black(color) && color.a >= OVERLAY_MIN_ALPHA
}

/// Looks for a dark scrim between `node` and the image on `image_ancestor`.
///
/// Checks solid fills and gradients on the element and every ancestor below
/// the image, their `::before`/`::after` layers, the image element's own
/// pseudo layers, and finally the image value itself (a dark gradient layered
/// in front of the `url(...)`). Returns the worst-case background: the overlay
/// composited over white.
pub fn find_dark_overlay(
    page: &dyn PageSnapshot,
    node: NodeId,
    image_ancestor: NodeId,
    image: &str,
) -> Result<Option<ColorSample>> {
    for n in ancestors_inclusive(page, node)? {
        if n == image_ancestor {
            break;
        }
        for pseudo in [Pseudo::None, Pseudo::Before, Pseudo::After] {
            let style = page.computed_style(n, pseudo)?;
            if let Some(overlay) = overlay_in_layer(
                style.get_or("background-color", "transparent"),
                style.background_image(),
            ) {
                return Ok(Some(flatten(overlay)));
            }
        }
    }
    for pseudo in [Pseudo::Before, Pseudo::After] {
        let style = page.computed_style(image_ancestor, pseudo)?;
        if let Some(overlay) = overlay_in_layer(
            style.get_or("background-color", "transparent"),
            style.background_image(),
        ) {
            return Ok(Some(flatten(overlay)));
        }
    }
    Ok(leading_dark_gradient(image).map(flatten))
}

fn flatten(overlay: ColorSample) -> ColorSample {
    overlay.over(ColorSample::WHITE).opaque()
}

fn overlay_in_layer(background_color: &str, background_image: Option<&str>) -> Option<ColorSample> {
    if let Ok(color) = parse_color_alpha(background_color) {
        if is_dark_overlay(&color) {
            return Some(color);
        }
    }
    background_image.and_then(leading_dark_gradient)
}

const COLOR_FUNCTIONS: [&str; 4] = ["rgba(", "rgb(", "hsla(", "hsl("];

/// The first color stop of the first gradient, if it is a dark overlay and
/// the gradient is layered above any `url(...)` image.
pub fn leading_dark_gradient(value: &str) -> Option<ColorSample> {
    let lower = value.to_ascii_lowercase();
    let gradient_at = lower.find("gradient(")?;
    let url_at = lower.find("url(");
    if url_at.is_some_and(|u| u < gradient_at) {
        return None;
    }

    let rest = &lower[gradient_at..];
    let (offset, _) = COLOR_FUNCTIONS
        .iter()
        .filter_map(|f| rest.find(f).map(|i| (i, *f)))
        .min_by_key(|(i, _)| *i)?;
    let start = gradient_at + offset;
    if url_at.is_some_and(|u| u < start) {
        return None;
    }
    let end = start + lower[start..].find(')')?;
    let color = parse_color_alpha(&lower[start..=end]).ok()?;
    is_dark_overlay(&color).then_some(color)
}
