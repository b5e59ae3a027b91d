//! Value model shared by the wire codec and the extension layer.
//!
//! Native kinds are the ones the wire codec serializes directly; extension
//! kinds only reach the wire as tagged frames produced by a registered
//! codec (see `ext`).  Equality is structural everywhere except `Set`,
//! which compares by membership, and floats, which compare bitwise so that
//! round-trip assertions stay reflexive.

use chrono::{DateTime, FixedOffset};

use crate::ext::timestamp::Timestamp;

#[derive(Debug, Clone)]
pub enum Value {
    // Native kinds.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),

    // Extension kinds — never written natively, always through a tagged frame.
    Timestamp(Timestamp),
    DateTime(DateTime<FixedOffset>),
    Complex { re: f32, im: f32 },
    Set(Vec<Value>),
    Tuple(Vec<Value>),
    Pin(Pin),
}

impl Value {
    /// Build a set value, dropping duplicate elements (first occurrence wins).
    pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Set(dedup(items))
    }

    /// Human-readable kind name (for diagnostics only — never parsed).
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil          => "nil",
            Value::Bool(_)      => "bool",
            Value::Int(_)       => "int",
            Value::Float(_)     => "float",
            Value::Str(_)       => "str",
            Value::Bin(_)       => "bin",
            Value::Array(_)     => "array",
            Value::Map(_)       => "map",
            Value::Timestamp(_) => "timestamp",
            Value::DateTime(_)  => "datetime",
            Value::Complex { .. } => "complex",
            Value::Set(_)       => "set",
            Value::Tuple(_)     => "tuple",
            Value::Pin(_)       => "pin",
        }
    }
}

/// Keep the first occurrence of each distinct element.
pub(crate) fn dedup(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut uniq: Vec<Value> = Vec::new();
    for item in items {
        if !uniq.contains(&item) {
            uniq.push(item);
        }
    }
    uniq
}

/// Two sets are equal when each element of one occurs in the other,
/// regardless of order or repetition.
fn set_eq(a: &[Value], b: &[Value]) -> bool {
    a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (Bin(a), Bin(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Tuple(a), Tuple(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Complex { re: ar, im: ai }, Complex { re: br, im: bi }) => {
                ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits()
            }
            (Set(a), Set(b)) => set_eq(a, b),
            (Pin(a), Pin(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Str(v.to_string()) }
}
impl From<String> for Value {
    fn from(v: String) -> Self { Value::Str(v) }
}

// ── Pin ──────────────────────────────────────────────────────────────────────

/// Hardware pin identifier, the demonstration pass-through kind.
///
/// Three wire layouts exist for it (numeric id, name string, port+pin
/// tuple); which one is used is chosen per call via the `pin` option.
/// The numeric layout carries no port, so a pin decoded from it comes
/// back with an empty port string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub port: String,
    pub pin:  u8,
}

impl Pin {
    pub fn new(port: impl Into<String>, pin: u8) -> Self {
        Self { port: port.into(), pin }
    }

    /// Pin known only by number (port unknown).
    pub fn from_id(pin: u8) -> Self {
        Self { port: String::new(), pin }
    }

    pub fn id(&self) -> u8 {
        self.pin
    }

    /// Display name, `"{port}{pin}"` (e.g. `"A5"`).
    pub fn name(&self) -> String {
        format!("{}{}", self.port, self.pin)
    }

    /// Parse a `name()`-style string back into a pin.
    /// Returns `None` if there is no trailing pin number or it overflows u8.
    pub fn from_name(name: &str) -> Option<Self> {
        let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        let (port, num) = name.split_at(name.len() - digits);
        let pin = num.parse::<u8>().ok()?;
        Some(Self::new(port, pin))
    }
}
