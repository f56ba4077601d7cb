//! Visual effects as filter-chain tokens.
//!
//! The editor stores a single [`EffectToken`] at a time. The token is an opaque
//! string as far as the state is concerned, but it can be decoded into a list of
//! [`FilterOp`]s when something needs to render it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EffectError {
    #[error("unknown filter function `{0}`")]
    UnknownFilter(String),
    #[error("invalid argument `{arg}` for `{func}`")]
    InvalidArgument { func: String, arg: String },
    #[error("malformed filter chain near byte {0}")]
    Malformed(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectToken(String);

impl EffectToken {
    pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

    pub fn none() -> Self { Self(String::new()) }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn is_none(&self) -> bool { self.0.trim().is_empty() }

    pub fn parse(&self) -> Result<Vec<FilterOp>, EffectError> { parse_chain(&self.0) }
}

impl fmt::Display for EffectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for EffectToken {
    fn from(s: &str) -> Self { Self::new(s) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectPreset {
    pub name: &'static str,
    pub token: &'static str,
}

impl EffectPreset {
    pub fn token(&self) -> EffectToken { EffectToken::new(self.token) }

    pub fn by_name(name: &str) -> Option<&'static EffectPreset> {
        PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn matching(token: &EffectToken) -> Option<&'static EffectPreset> {
        PRESETS.iter().find(|p| p.token == token.as_str())
    }
}

pub const PRESETS: [EffectPreset; 6] = [
    EffectPreset { name: "None", token: "" },
    EffectPreset { name: "B&W", token: "grayscale(100%)" },
    EffectPreset { name: "Vintage", token: "sepia(80%) contrast(110%)" },
    EffectPreset { name: "Bright", token: "brightness(120%) contrast(110%)" },
    EffectPreset { name: "Cool", token: "hue-rotate(180deg)" },
    EffectPreset { name: "Warm", token: "hue-rotate(-30deg) saturate(130%)" },
];

/// Written by auto-edit. Not one of the selectable presets.
pub const ENHANCE_PRESET: &str = "brightness(110%) contrast(105%) saturate(110%)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Grayscale(f32),
    Sepia(f32),
    Invert(f32),
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    /// Degrees.
    HueRotate(f32),
    /// Pixels. Has no effect on a flat colour.
    Blur(f32),
}

type Matrix = [[f32; 3]; 3];

fn mul(m: &Matrix, c: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (i, row) in m.iter().enumerate() {
        out[i] = row[0] * c[0] + row[1] * c[1] + row[2] * c[2];
    }
    out
}

impl FilterOp {
    /// Applies the operation to a linear 0..1 RGB triple, clamping the result.
    pub fn apply_rgb(&self, c: [f32; 3]) -> [f32; 3] {
        let out = match *self {
            FilterOp::Grayscale(a) => {
                let k = 1.0 - a;
                mul(&[
                    [0.2126 + 0.7874 * k, 0.7152 - 0.7152 * k, 0.0722 - 0.0722 * k],
                    [0.2126 - 0.2126 * k, 0.7152 + 0.2848 * k, 0.0722 - 0.0722 * k],
                    [0.2126 - 0.2126 * k, 0.7152 - 0.7152 * k, 0.0722 + 0.9278 * k],
                ], c)
            }
            FilterOp::Sepia(a) => {
                let k = 1.0 - a;
                mul(&[
                    [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
                    [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
                    [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
                ], c)
            }
            FilterOp::Saturate(s) => mul(&[
                [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
            ], c),
            FilterOp::HueRotate(deg) => {
                let (sin, cos) = deg.to_radians().sin_cos();
                mul(&[
                    [0.213 + cos * 0.787 - sin * 0.213, 0.715 - cos * 0.715 - sin * 0.715, 0.072 - cos * 0.072 + sin * 0.928],
                    [0.213 - cos * 0.213 + sin * 0.143, 0.715 + cos * 0.285 + sin * 0.140, 0.072 - cos * 0.072 - sin * 0.283],
                    [0.213 - cos * 0.213 - sin * 0.787, 0.715 - cos * 0.715 + sin * 0.715, 0.072 + cos * 0.928 + sin * 0.072],
                ], c)
            }
            FilterOp::Invert(a) => c.map(|v| v * (1.0 - a) + (1.0 - v) * a),
            FilterOp::Brightness(b) => c.map(|v| v * b),
            FilterOp::Contrast(k) => c.map(|v| (v - 0.5) * k + 0.5),
            FilterOp::Blur(_) => c,
        };
        out.map(|v| v.clamp(0.0, 1.0))
    }
}

pub fn apply_chain(ops: &[FilterOp], c: [f32; 3]) -> [f32; 3] {
    ops.iter().fold(c, |acc, op| op.apply_rgb(acc))
}

fn parse_chain(src: &str) -> Result<Vec<FilterOp>, EffectError> {
    let mut ops = Vec::new();
    let mut rest = src;
    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() { break; }
        let offset = src.len() - trimmed.len();
        let open = trimmed.find('(').ok_or(EffectError::Malformed(offset))?;
        let close = trimmed.find(')').ok_or(EffectError::Malformed(offset))?;
        if close < open { return Err(EffectError::Malformed(offset)); }
        let func = trimmed[..open].trim();
        if func.is_empty() || func.contains(char::is_whitespace) {
            return Err(EffectError::Malformed(offset));
        }
        let arg = trimmed[open + 1..close].trim();
        ops.push(parse_op(func, arg)?);
        rest = &trimmed[close + 1..];
    }
    Ok(ops)
}

fn parse_op(func: &str, arg: &str) -> Result<FilterOp, EffectError> {
    let bad = || EffectError::InvalidArgument { func: func.to_string(), arg: arg.to_string() };
    let amount = |default: f32| -> Result<f32, EffectError> {
        if arg.is_empty() { return Ok(default); }
        let v = match arg.strip_suffix('%') {
            Some(p) => p.trim().parse::<f32>().map_err(|_| bad())? / 100.0,
            None => arg.parse::<f32>().map_err(|_| bad())?,
        };
        if v < 0.0 || !v.is_finite() { return Err(bad()); }
        Ok(v)
    };
    let op = match func {
        "grayscale" => FilterOp::Grayscale(amount(1.0)?.min(1.0)),
        "sepia" => FilterOp::Sepia(amount(1.0)?.min(1.0)),
        "invert" => FilterOp::Invert(amount(1.0)?.min(1.0)),
        "brightness" => FilterOp::Brightness(amount(1.0)?),
        "contrast" => FilterOp::Contrast(amount(1.0)?),
        "saturate" => FilterOp::Saturate(amount(1.0)?),
        "hue-rotate" => FilterOp::HueRotate(parse_angle(arg).ok_or_else(bad)?),
        "blur" => {
            let px = if arg.is_empty() || arg == "0" { 0.0 } else {
                arg.strip_suffix("px").and_then(|v| v.trim().parse::<f32>().ok()).ok_or_else(bad)?
            };
            if px < 0.0 { return Err(bad()); }
            FilterOp::Blur(px)
        }
        other => return Err(EffectError::UnknownFilter(other.to_string())),
    };
    Ok(op)
}

fn parse_angle(arg: &str) -> Option<f32> {
    if arg.is_empty() || arg == "0" { return Some(0.0); }
    if let Some(v) = arg.strip_suffix("deg") { return v.trim().parse().ok(); }
    if let Some(v) = arg.strip_suffix("grad") { return v.trim().parse::<f32>().ok().map(|g| g * 360.0 / 400.0); }
    if let Some(v) = arg.strip_suffix("rad") { return v.trim().parse::<f32>().ok().map(f32::to_degrees); }
    if let Some(v) = arg.strip_suffix("turn") { return v.trim().parse::<f32>().ok().map(|t| t * 360.0); }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn every_preset_parses() {
        for p in PRESETS.iter() {
            let ops = p.token().parse().unwrap();
            assert_eq!(ops.is_empty(), p.token.is_empty(), "{}", p.name);
        }
        assert_eq!(EffectToken::new(ENHANCE_PRESET).parse().unwrap().len(), 3);
    }

    #[test]
    fn composite_token_keeps_order() {
        let ops = EffectToken::new("hue-rotate(-30deg) saturate(130%)").parse().unwrap();
        assert_eq!(ops, vec![FilterOp::HueRotate(-30.0), FilterOp::Saturate(1.3)]);
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert_eq!(
            EffectToken::new("wobble(3)").parse(),
            Err(EffectError::UnknownFilter("wobble".into()))
        );
        assert!(matches!(EffectToken::new("contrast(abc)").parse(), Err(EffectError::InvalidArgument { .. })));
        assert!(matches!(EffectToken::new("brightness(120%").parse(), Err(EffectError::Malformed(_))));
        assert!(matches!(EffectToken::new("sepia(-1)").parse(), Err(EffectError::InvalidArgument { .. })));
    }

    #[test]
    fn angle_units() {
        assert_eq!(parse_angle("0.5turn"), Some(180.0));
        assert_eq!(parse_angle("200grad"), Some(180.0));
        assert!((parse_angle("3.14159rad").unwrap() - 180.0).abs() < 0.01);
        assert_eq!(parse_angle("90"), None);
    }

    #[test]
    fn grayscale_equalizes_channels() {
        let out = FilterOp::Grayscale(1.0).apply_rgb([1.0, 0.0, 0.0]);
        assert!(close(out, [0.2126, 0.2126, 0.2126]));
    }

    #[test]
    fn identity_amounts_leave_colour_alone() {
        let c = [0.3, 0.6, 0.9];
        for op in [FilterOp::Brightness(1.0), FilterOp::Contrast(1.0), FilterOp::Saturate(1.0), FilterOp::HueRotate(0.0), FilterOp::Sepia(0.0), FilterOp::Blur(4.0)] {
            assert!(close(op.apply_rgb(c), c), "{op:?}");
        }
    }

    #[test]
    fn chain_output_is_clamped() {
        let ops = EffectToken::new("brightness(300%)").parse().unwrap();
        assert_eq!(apply_chain(&ops, [0.5, 0.5, 0.5]), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(EffectPreset::by_name("vintage").unwrap().token, "sepia(80%) contrast(110%)");
        assert_eq!(EffectPreset::matching(&EffectToken::none()).unwrap().name, "None");
        assert!(EffectPreset::matching(&EffectToken::new(ENHANCE_PRESET)).is_none());
    }
}
