//! The [`Value`] tagged union and its arithmetic/coercion rules.

use std::fmt;

use serde::{Deserialize, Serialize};
use zng_txt::Txt;

use crate::VarId;

/// A 16-bit-per-channel color, matching the wire representation in
/// `boldui_protocol::Color` (r, g, b, a).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub a: u16,
}
impl Color {
    pub const fn new(r: u16, g: u16, b: u16, a: u16) -> Self {
        Color { r, g, b, a }
    }

    /// Builds a color from a `0xRRGGBB` or `0xRRGGBBAA` literal, 8-bit channels
    /// widened to the wire's 16-bit channels (`0xff` -> `0xffff`).
    pub const fn from_hex(hex: u32) -> Self {
        let has_alpha = hex > 0xFF_FFFF;
        let (r, g, b, a) = if has_alpha {
            (
                (hex >> 24) & 0xFF,
                (hex >> 16) & 0xFF,
                (hex >> 8) & 0xFF,
                hex & 0xFF,
            )
        } else {
            ((hex >> 16) & 0xFF, (hex >> 8) & 0xFF, hex & 0xFF, 0xFF)
        };
        Color::new(widen(r as u16), widen(g as u16), widen(b as u16), widen(a as u16))
    }
}
const fn widen(channel8: u16) -> u16 {
    channel8 * 257
}

/// A point in the `(left, top)` coordinate space used by draw commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub left: f64,
    pub top: f64,
}
impl Point {
    pub const fn new(left: f64, top: f64) -> Self {
        Point { left, top }
    }
}

/// An axis-aligned rectangle `(left, top, right, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}
impl Rect {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Rect { left, top, right, bottom }
    }

    pub fn from_points(lt: Point, rb: Point) -> Self {
        Rect::new(lt.left, lt.top, rb.left, rb.top)
    }

    /// Point-in-rect hit test, inclusive of the boundary.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// The tagged value union carried by the expression DAG and the variable
/// store.
///
/// `PartialEq` is structural equality, used directly by `OpsOperation::Eq`/`Neq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Value {
    Sint64(i64),
    Double(f64),
    String(Txt),
    Color(Color),
    Point(Point),
    Rect(Rect),
    /// A [`VarId`] held as a first-class value, used to indirectly address
    /// variables.
    VarRef(VarId),
}

/// The concrete variant of a [`Value`], used to check that a variable's
/// declared type is preserved across writes and re-declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Sint64,
    Double,
    String,
    Color,
    Point,
    Rect,
    VarRef,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Sint64(_) => ValueKind::Sint64,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Color(_) => ValueKind::Color,
            Value::Point(_) => ValueKind::Point,
            Value::Rect(_) => ValueKind::Rect,
            Value::VarRef(_) => ValueKind::VarRef,
        }
    }

    /// Truthiness used by `If` and event-predicate evaluation:
    /// `0`/`0.0`/`""` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Sint64(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Color(_) | Value::Point(_) | Value::Rect(_) | Value::VarRef(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Sint64(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Locale-independent string formatting:
    /// integers as decimal, floats with round-trip precision, everything
    /// else in a bracketed debug-ish representation.
    pub fn format(&self) -> Txt {
        match self {
            Value::Sint64(i) => Txt::from(i.to_string()),
            Value::Double(d) => Txt::from(format_f64_roundtrip(*d)),
            Value::String(s) => s.clone(),
            Value::Color(c) => Txt::from(format!("#{:04x}{:04x}{:04x}{:04x}", c.r, c.g, c.b, c.a)),
            Value::Point(p) => Txt::from(format!("({}, {})", p.left, p.top)),
            Value::Rect(r) => Txt::from(format!("({}, {}, {}, {})", r.left, r.top, r.right, r.bottom)),
            Value::VarRef(v) => Txt::from(format!("<var {v}>")),
        }
    }
}

fn format_f64_roundtrip(v: f64) -> String {
    // `{}` already uses the shortest round-tripping representation in Rust,
    // but integral floats print without a decimal point in some contexts;
    // BoldUI's ToString always distinguishes doubles from integers.
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec_boundary() {
        assert!(!Value::Sint64(0).is_truthy());
        assert!(!Value::Double(0.0).is_truthy());
        assert!(!Value::String(Txt::from("")).is_truthy());
        assert!(Value::Sint64(1).is_truthy());
        assert!(Value::String(Txt::from("x")).is_truthy());
    }

    #[test]
    fn format_distinguishes_int_and_float() {
        assert_eq!(Value::Sint64(3).format().as_str(), "3");
        assert_eq!(Value::Double(3.0).format().as_str(), "3.0");
        assert_eq!(Value::Double(3.5).format().as_str(), "3.5");
    }

    #[test]
    fn color_from_hex_widens_channels() {
        let c = Color::from_hex(0x242424);
        assert_eq!(c.r, 0x2424);
        assert_eq!(c.a, 0xffff);
    }

    #[test]
    fn rect_contains_is_inclusive() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(10.0, 10.0));
        assert!(!r.contains(10.1, 5.0));
    }
}
