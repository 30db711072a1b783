use std::fmt;

use super::ColorSample;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// Empty or whitespace-only input.
    Empty,
    /// Hex digits outside `0-9a-f` or an unsupported digit count.
    InvalidHex(String),
    /// A functional notation with missing or non-numeric components.
    InvalidComponent(String),
    /// Not a hex, functional or named color.
    Unrecognized(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty color value"),
            Self::InvalidHex(s) => write!(f, "invalid hex color: {s}"),
            Self::InvalidComponent(s) => write!(f, "invalid color components: {s}"),
            Self::Unrecognized(s) => write!(f, "unrecognized color: {s}"),
        }
    }
}

impl std::error::Error for ColorParseError {}

const NAMED_COLORS: [(&str, ColorSample); 19] = [
    ("black", ColorSample::rgb(0, 0, 0)),
    ("white", ColorSample::rgb(255, 255, 255)),
    ("red", ColorSample::rgb(255, 0, 0)),
    ("green", ColorSample::rgb(0, 128, 0)),
    ("blue", ColorSample::rgb(0, 0, 255)),
    ("yellow", ColorSample::rgb(255, 255, 0)),
    ("orange", ColorSample::rgb(255, 165, 0)),
    ("purple", ColorSample::rgb(128, 0, 128)),
    ("pink", ColorSample::rgb(255, 192, 203)),
    ("gray", ColorSample::rgb(128, 128, 128)),
    ("grey", ColorSample::rgb(128, 128, 128)),
    ("silver", ColorSample::rgb(192, 192, 192)),
    ("maroon", ColorSample::rgb(128, 0, 0)),
    ("navy", ColorSample::rgb(0, 0, 128)),
    ("teal", ColorSample::rgb(0, 128, 128)),
    ("olive", ColorSample::rgb(128, 128, 0)),
    ("lime", ColorSample::rgb(0, 255, 0)),
    ("aqua", ColorSample::rgb(0, 255, 255)),
    // Treated as the page default rather than "no color".
    ("transparent", ColorSample::rgb(255, 255, 255)),
];

/// Parses a CSS color into an opaque sample.
///
/// Alpha in `rgba()`/`hsla()` is ignored here; use [`parse_color_alpha`] when
/// transparency matters.
pub fn parse_color(input: &str) -> Result<ColorSample, ColorParseError> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err(ColorParseError::Empty);
    }
    if s.starts_with("rgb(") || s.starts_with("rgba(") {
        let parts = functional_args(&s)?;
        return rgb_from_parts(&parts, &s).map(ColorSample::opaque);
    }
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return Err(ColorParseError::InvalidHex(s.clone()));
        }
        return match hex.len() {
            3 | 6 => parse_hex(hex, &s),
            _ => Err(ColorParseError::InvalidHex(s.clone())),
        };
    }
    if s.starts_with("hsl(") || s.starts_with("hsla(") {
        let parts = functional_args(&s)?;
        return hsl_from_parts(&parts, &s).map(ColorSample::opaque);
    }
    named_color(&s).ok_or(ColorParseError::Unrecognized(s))
}

/// Parses a CSS color keeping its alpha channel.
///
/// Unlike [`parse_color`], `transparent` is fully transparent and 4/8 digit
/// hex forms are accepted.
pub fn parse_color_alpha(input: &str) -> Result<ColorSample, ColorParseError> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err(ColorParseError::Empty);
    }
    if s == "transparent" {
        return Ok(ColorSample::TRANSPARENT);
    }
    if s.starts_with("rgb(") || s.starts_with("rgba(") {
        let parts = functional_args(&s)?;
        return rgb_from_parts(&parts, &s);
    }
    if s.starts_with("hsl(") || s.starts_with("hsla(") {
        let parts = functional_args(&s)?;
        return hsl_from_parts(&parts, &s);
    }
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return Err(ColorParseError::InvalidHex(s.clone()));
        }
        return match hex.len() {
            3 | 6 => parse_hex(hex, &s),
            4 | 8 => {
                let split = hex.len() / 4 * 3;
                let rgb = parse_hex(&hex[..split], &s)?;
                let alpha = parse_hex_component(&hex[split..], &s)?;
                Ok(ColorSample::rgba(rgb.r, rgb.g, rgb.b, f64::from(alpha) / 255.0))
            }
            _ => Err(ColorParseError::InvalidHex(s.clone())),
        };
    }
    named_color(&s).ok_or(ColorParseError::Unrecognized(s))
}

fn named_color(s: &str) -> Option<ColorSample> {
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == s)
        .map(|(_, color)| *color)
}

fn parse_hex(hex: &str, original: &str) -> Result<ColorSample, ColorParseError> {
    let (r, g, b) = match hex.len() {
        3 => (&hex[0..1], &hex[1..2], &hex[2..3]),
        6 => (&hex[0..2], &hex[2..4], &hex[4..6]),
        _ => return Err(ColorParseError::InvalidHex(original.to_string())),
    };
    Ok(ColorSample::rgb(
        parse_hex_component(r, original)?,
        parse_hex_component(g, original)?,
        parse_hex_component(b, original)?,
    ))
}

/// One or two hex digits; a single digit is doubled (`f` -> `ff`).
fn parse_hex_component(digits: &str, original: &str) -> Result<u8, ColorParseError> {
    let invalid = || ColorParseError::InvalidHex(original.to_string());
    if !digits.is_ascii() {
        return Err(invalid());
    }
    let expanded = if digits.len() == 1 {
        digits.repeat(2)
    } else {
        digits.to_string()
    };
    u8::from_str_radix(&expanded, 16).map_err(|_| invalid())
}

/// Splits `name(a, b, c / d)` into its argument tokens.
fn functional_args(s: &str) -> Result<Vec<String>, ColorParseError> {
    let invalid = || ColorParseError::InvalidComponent(s.to_string());
    let open = s.find('(').ok_or_else(invalid)?;
    let close = s.rfind(')').ok_or_else(invalid)?;
    if close <= open {
        return Err(invalid());
    }
    let inner = &s[open + 1..close];
    let parts: Vec<String> = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if parts.len() < 3 {
        return Err(invalid());
    }
    Ok(parts)
}

fn parse_number(token: &str, original: &str) -> Result<f64, ColorParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ColorParseError::InvalidComponent(original.to_string()))
}

/// `50%` -> 0.5 of `scale`, otherwise the raw number.
fn parse_scaled(token: &str, scale: f64, original: &str) -> Result<f64, ColorParseError> {
    match token.strip_suffix('%') {
        Some(pct) => Ok(parse_number(pct, original)? / 100.0 * scale),
        None => parse_number(token, original),
    }
}

fn parse_alpha(parts: &[String], original: &str) -> Result<f64, ColorParseError> {
    match parts.get(3) {
        Some(token) => Ok(parse_scaled(token, 1.0, original)?.clamp(0.0, 1.0)),
        None => Ok(1.0),
    }
}

fn rgb_from_parts(parts: &[String], original: &str) -> Result<ColorSample, ColorParseError> {
    let r = parse_scaled(&parts[0], 255.0, original)?;
    let g = parse_scaled(&parts[1], 255.0, original)?;
    let b = parse_scaled(&parts[2], 255.0, original)?;
    let a = parse_alpha(parts, original)?;
    Ok(ColorSample::from_channels(r, g, b, a))
}

fn hsl_from_parts(parts: &[String], original: &str) -> Result<ColorSample, ColorParseError> {
    let hue_token = parts[0].trim_end_matches("deg");
    let h = parse_number(hue_token, original)?.rem_euclid(360.0);
    let s = (parse_scaled(&parts[1], 1.0, original)? / percent_divisor(&parts[1])).clamp(0.0, 1.0);
    let l = (parse_scaled(&parts[2], 1.0, original)? / percent_divisor(&parts[2])).clamp(0.0, 1.0);
    let a = parse_alpha(parts, original)?;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r1, g1, b1) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Ok(ColorSample::from_channels(
        (r1 + m) * 255.0,
        (g1 + m) * 255.0,
        (b1 + m) * 255.0,
        a,
    ))
}

/// Saturation/lightness without a `%` sign are read as percentages.
fn percent_divisor(token: &str) -> f64 {
    if token.ends_with('%') { 1.0 } else { 100.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(c: ColorSample) -> (u8, u8, u8) {
        (c.r, c.g, c.b)
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(rgb(parse_color("#fff").expect("short hex")), (255, 255, 255));
        assert_eq!(rgb(parse_color("#1A2b3C").expect("long hex")), (0x1a, 0x2b, 0x3c));
        assert_eq!(rgb(parse_color("#abc").expect("nibbles")), (0xaa, 0xbb, 0xcc));
        assert!(matches!(parse_color("#abcd"), Err(ColorParseError::InvalidHex(_))));
        assert!(matches!(parse_color("#ggg"), Err(ColorParseError::InvalidHex(_))));
    }

    #[test]
    fn rgba_alpha_is_ignored_by_opaque_parser() {
        let c = parse_color("rgba(10, 20, 30, 0.2)").expect("rgba");
        assert_eq!(rgb(c), (10, 20, 30));
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn alpha_parser_keeps_alpha() {
        let c = parse_color_alpha("rgba(10, 20, 30, 0.25)").expect("rgba");
        assert_eq!(rgb(c), (10, 20, 30));
        assert!((c.a - 0.25).abs() < 1e-9);

        let c = parse_color_alpha("rgb(0 0 0 / 50%)").expect("space syntax");
        assert!((c.a - 0.5).abs() < 1e-9);

        let c = parse_color_alpha("#00000080").expect("8 digit hex");
        assert!((c.a - 128.0 / 255.0).abs() < 1e-9);

        assert_eq!(parse_color_alpha("transparent").expect("keyword").a, 0.0);
    }

    #[test]
    fn parses_hsl() {
        assert_eq!(rgb(parse_color("hsl(0, 100%, 50%)").expect("red")), (255, 0, 0));
        assert_eq!(rgb(parse_color("hsl(120deg, 100%, 25%)").expect("green")), (0, 128, 0));
        assert_eq!(rgb(parse_color("hsla(240, 100%, 50%, 0.3)").expect("blue")), (0, 0, 255));
        assert_eq!(rgb(parse_color("hsl(0, 0%, 100%)").expect("white")), (255, 255, 255));
    }

    #[test]
    fn named_colors_and_transparent_fallback() {
        assert_eq!(rgb(parse_color("Navy").expect("navy")), (0, 0, 128));
        assert_eq!(rgb(parse_color("transparent").expect("transparent")), (255, 255, 255));
        assert!(matches!(
            parse_color("rebeccapurple"),
            Err(ColorParseError::Unrecognized(_))
        ));
    }

    #[test]
    fn malformed_input_is_an_error_not_a_panic() {
        assert_eq!(parse_color("   "), Err(ColorParseError::Empty));
        assert!(parse_color("rgb(1, 2)").is_err());
        assert!(parse_color("rgb(a, b, c)").is_err());
        assert!(parse_color("rgb(1, 2, 3").is_err());
        assert!(parse_color("#ééé").is_err());
    }

    #[test]
    fn channels_are_clamped() {
        assert_eq!(rgb(parse_color("rgb(300, -5, 128)").expect("clamp")), (255, 0, 128));
        assert_eq!(rgb(parse_color("rgb(100%, 0%, 50%)").expect("percent")), (255, 0, 128));
    }
}
