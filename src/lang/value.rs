use super::object::{Heap, ObjRef};
use serde::{Deserialize, Serialize};

/// Runtime value.
///
/// Scalars are stored inline; strings live in the `Heap` and are reached
/// through an `ObjRef`, so a `Value` is always `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),

    /// Single byte character.
    Char(u8),

    /// 64-bit floating-point number.
    Real(f64),

    /// 64-bit signed integer.
    Integer(i64),

    /// Heap object (currently always a string).
    Obj(ObjRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Char(_) => "char",
            Value::Real(_) => "real",
            Value::Integer(_) => "integer",
            Value::Obj(_) => "string",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Real(_) | Value::Integer(_))
    }

    /// Language-level equality.
    ///
    /// Tags must match. Scalars compare by bit pattern, so `0.0` and `-0.0`
    /// differ and a NaN equals an identical NaN. Strings compare by content.
    pub fn is_equal(&self, other: &Value, heap: &Heap) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => {
                if a == b {
                    return true;
                }
                match (heap.get(*a), heap.get(*b)) {
                    (Some(x), Some(y)) => x.len() == y.len() && x.as_bytes() == y.as_bytes(),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Formats the value, resolving strings through `heap`.
    pub fn display<'a>(&'a self, heap: &'a Heap) -> ValueDisplay<'a> {
        ValueDisplay { value: self, heap }
    }
}

pub struct ValueDisplay<'a> {
    value: &'a Value,
    heap: &'a Heap,
}

impl std::fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value {
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Char(c) => write!(f, "'{}'", *c as char),
            Value::Real(r) => write!(f, "{}", format_real(*r)),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Obj(r) => match self.heap.as_str(*r) {
                Some(s) => write!(f, "\"{}\"", s),
                None => write!(f, "<dangling #{}>", r.index()),
            },
        }
    }
}

/// Formats a real the way C's `%g` does: six significant digits, trailing
/// zeros dropped, scientific notation outside `1e-4 <= |x| < 1e6`.
pub fn format_real(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // exponent after rounding to six significant digits
    let sci = format!("{:.5e}", x);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return x.to_string();
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return x.to_string();
    };

    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (5 - exp) as usize;
        trim_zeros(&format!("{:.*}", decimals, x)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_equality_needs_same_tag() {
        let heap = Heap::new();
        assert!(Value::Integer(5).is_equal(&Value::Integer(5), &heap));
        assert!(!Value::Integer(5).is_equal(&Value::Integer(6), &heap));
        assert!(!Value::Integer(1).is_equal(&Value::Real(1.0), &heap));
        assert!(!Value::Bool(true).is_equal(&Value::Integer(1), &heap));
        assert!(Value::Char(b'a').is_equal(&Value::Char(b'a'), &heap));
    }

    #[test]
    fn test_real_equality_is_bitwise() {
        let heap = Heap::new();
        assert!(!Value::Real(0.0).is_equal(&Value::Real(-0.0), &heap));
        assert!(Value::Real(f64::NAN).is_equal(&Value::Real(f64::NAN), &heap));
        assert!(Value::Real(2.5).is_equal(&Value::Real(2.5), &heap));
    }

    #[test]
    fn test_string_equality_by_content() {
        let mut heap = Heap::new();
        let interned = heap.copy_string("string");
        let st = heap.copy_string("st");
        let ring = heap.copy_string("ring");
        let built = heap.concat(st, ring).unwrap();

        assert_ne!(interned, built);
        assert!(Value::Obj(interned).is_equal(&Value::Obj(built), &heap));
        assert!(!Value::Obj(st).is_equal(&Value::Obj(ring), &heap));
    }

    #[test]
    fn test_display() {
        let mut heap = Heap::new();
        let s = heap.copy_string("hi");
        assert_eq!(Value::Bool(true).display(&heap).to_string(), "TRUE");
        assert_eq!(Value::Char(b'x').display(&heap).to_string(), "'x'");
        assert_eq!(Value::Integer(-3).display(&heap).to_string(), "-3");
        assert_eq!(Value::Real(2.5).display(&heap).to_string(), "2.5");
        assert_eq!(Value::Obj(s).display(&heap).to_string(), "\"hi\"");
    }

    #[test]
    fn test_format_real_like_percent_g() {
        assert_eq!(format_real(1.0), "1");
        assert_eq!(format_real(3.14), "3.14");
        assert_eq!(format_real(0.1), "0.1");
        assert_eq!(format_real(100000.0), "100000");
        assert_eq!(format_real(1_000_000.0), "1e+06");
        assert_eq!(format_real(0.0001), "0.0001");
        assert_eq!(format_real(0.00001), "1e-05");
        assert_eq!(format_real(1.0 / 3.0), "0.333333");
        assert_eq!(format_real(-0.0), "-0");
        assert_eq!(format_real(f64::INFINITY), "inf");
    }
}
