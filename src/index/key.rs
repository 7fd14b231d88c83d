//! Canonical value keys
//!
//! Two JSON values are the "same value" for uniqueness purposes when their
//! keys are equal. Ordering is deterministic: Null < Bool < Int < UInt <
//! Float < String < Composite.

use serde_json::Value;
use std::fmt;

/// Index key representing a canonicalized JSON value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// JSON null
    Null,
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value, including integral floats
    Int(i64),
    /// Integer above `i64::MAX`
    UInt(u64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
    /// Object or array, as canonical JSON text
    Composite(String),
}

impl IndexKey {
    /// Create a key from a float
    ///
    /// Integral floats collapse to `Int` or `UInt` so `1` and `1.0` are equal.
    pub fn from_float(v: f64) -> Self {
        if v.fract() == 0.0 {
            if v >= i64::MIN as f64 && v < i64::MAX as f64 {
                return IndexKey::Int(v as i64);
            }
            if v >= 0.0 && v < u64::MAX as f64 {
                return IndexKey::from_u64(v as u64);
            }
        }
        let bits = v.to_bits();
        // Negative: flip all bits; positive: flip sign bit
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from an unsigned integer
    pub fn from_u64(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => IndexKey::Int(i),
            Err(_) => IndexKey::UInt(v),
        }
    }

    /// Create a key from a JSON value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(u) = n.as_u64() {
                    IndexKey::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    IndexKey::from_float(f)
                } else {
                    IndexKey::Composite(n.to_string())
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            // serde_json maps are sorted, so the text is canonical
            Value::Array(_) | Value::Object(_) => IndexKey::Composite(value.to_string()),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Null => write!(f, "null"),
            IndexKey::Bool(b) => write!(f, "{}", b),
            IndexKey::Int(i) => write!(f, "{}", i),
            IndexKey::UInt(u) => write!(f, "{}", u),
            IndexKey::Float(ordered) => {
                let ordered = *ordered;
                let bits = if (ordered >> 63) == 1 {
                    ordered ^ (1 << 63)
                } else {
                    !ordered
                };
                write!(f, "{}", f64::from_bits(bits))
            }
            IndexKey::String(s) => write!(f, "{:?}", s),
            IndexKey::Composite(text) => write!(f, "{}", text),
        }
    }
}
