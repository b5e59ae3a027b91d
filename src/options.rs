//! Call-scoped options threaded through every encode/decode call.
//!
//! `Options` is an immutable string-keyed map.  The core layer recognises
//! three keys (see the `OPT_*` constants); anything else is carried
//! untouched for user-registered codecs to consume.  There is no ambient
//! or global configuration — callers pass an `Options` value explicitly.

use std::collections::BTreeMap;
use thiserror::Error;

/// Prefer timestamp encoding for date/time-like input (bool).
pub const OPT_DATETIME:  &str = "datetime";
/// Decode-time timestamp projection, integer 0-3 (see [`TimestampMode`]).
pub const OPT_TIMESTAMP: &str = "timestamp";
/// Wire-layout selector for the pin kind, integer 1-3 (see [`PinLayout`]).
pub const OPT_PIN:       &str = "pin";

#[derive(Debug, Clone, PartialEq)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionsError {
    #[error("option `{key}` out of range: {value}")]
    OutOfRange { key: &'static str, value: i64 },
    #[error("option `{key}` has the wrong type")]
    WrongType { key: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: BTreeMap<String, OptValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.entries.insert(key.into(), OptValue::Bool(value));
        self
    }

    pub fn with_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.entries.insert(key.into(), OptValue::Int(value));
        self
    }

    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), OptValue::Str(value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&OptValue> {
        self.entries.get(key)
    }

    /// True only if the key is present, boolean and set.
    pub fn bool_flag(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(OptValue::Bool(true)))
    }

    fn int_opt(&self, key: &'static str) -> Result<Option<i64>, OptionsError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(OptValue::Int(v)) => Ok(Some(*v)),
            Some(_) => Err(OptionsError::WrongType { key }),
        }
    }

    /// The `datetime` flag: prefer the timestamp wrapper for date/time input.
    pub fn datetime(&self) -> bool {
        self.bool_flag(OPT_DATETIME)
    }

    /// The `timestamp` projection mode; absent means [`TimestampMode::Timestamp`].
    pub fn timestamp_mode(&self) -> Result<TimestampMode, OptionsError> {
        match self.int_opt(OPT_TIMESTAMP)? {
            None => Ok(TimestampMode::Timestamp),
            Some(raw) => TimestampMode::from_i64(raw)
                .ok_or(OptionsError::OutOfRange { key: OPT_TIMESTAMP, value: raw }),
        }
    }

    /// The `pin` layout selector; absent means no layout was chosen.
    pub fn pin_layout(&self) -> Result<Option<PinLayout>, OptionsError> {
        match self.int_opt(OPT_PIN)? {
            None => Ok(None),
            Some(raw) => PinLayout::from_i64(raw)
                .map(Some)
                .ok_or(OptionsError::OutOfRange { key: OPT_PIN, value: raw }),
        }
    }
}

/// How a decoded timestamp payload is projected back to the caller.
/// Purely a post-decode view; never affects the bytes consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampMode {
    /// 0 (or absent): the `Timestamp` value itself.
    Timestamp,
    /// 1: unix seconds as a float.
    UnixFloat,
    /// 2: unix nanoseconds as an integer.
    UnixNano,
    /// 3: a timezone-aware datetime.
    DateTime,
}

impl TimestampMode {
    pub fn from_i64(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(TimestampMode::Timestamp),
            1 => Some(TimestampMode::UnixFloat),
            2 => Some(TimestampMode::UnixNano),
            3 => Some(TimestampMode::DateTime),
            _ => None,
        }
    }
}

/// Which of the three pin wire layouts to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLayout {
    /// 1: single-byte numeric id.
    Id,
    /// 2: UTF-8 name string.
    Name,
    /// 3: numeric id plus port name.
    PortPin,
}

impl PinLayout {
    pub fn from_i64(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(PinLayout::Id),
            2 => Some(PinLayout::Name),
            3 => Some(PinLayout::PortPin),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_mode_defaults_and_bounds() {
        assert_eq!(Options::new().timestamp_mode(), Ok(TimestampMode::Timestamp));
        let o = Options::new().with_int(OPT_TIMESTAMP, 2);
        assert_eq!(o.timestamp_mode(), Ok(TimestampMode::UnixNano));
        let o = Options::new().with_int(OPT_TIMESTAMP, 4);
        assert_eq!(
            o.timestamp_mode(),
            Err(OptionsError::OutOfRange { key: OPT_TIMESTAMP, value: 4 })
        );
    }

    #[test]
    fn wrong_type_is_not_silently_coerced() {
        let o = Options::new().with_str(OPT_TIMESTAMP, "2");
        assert_eq!(o.timestamp_mode(), Err(OptionsError::WrongType { key: OPT_TIMESTAMP }));
        // A non-bool `datetime` never turns the flag on.
        let o = Options::new().with_int(OPT_DATETIME, 1);
        assert!(!o.datetime());
    }

    #[test]
    fn pin_layout_selector() {
        assert_eq!(Options::new().pin_layout(), Ok(None));
        let o = Options::new().with_int(OPT_PIN, 3);
        assert_eq!(o.pin_layout(), Ok(Some(PinLayout::PortPin)));
        let o = Options::new().with_int(OPT_PIN, 0);
        assert!(o.pin_layout().is_err());
    }
}
