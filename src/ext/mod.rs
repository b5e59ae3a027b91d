//! Extension-type registry and dispatch.
//!
//! # Identity rules
//! Every extension codec is identified by a single signed tag byte in
//! [-128, 127].  Negative tags are reserved for standard extensions
//! (-1 is the timestamp); 0-127 belong to applications.  The built-in
//! tag assignments below are *frozen*: they appear inside every frame
//! on the wire and are never renumbered or reused.
//!
//! A decoder that encounters a tag with no registered codec MUST fail
//! with [`ExtError::NotFound`] — there is no fallback interpretation.
//!
//! # Dispatch order
//! [`dispatch`] classifies an outgoing value through an *ordered* chain of
//! checks; first match wins and the order is part of the public contract:
//!
//!   1. `Timestamp`  → [`TAG_TIMESTAMP`]
//!   2. `DateTime` with the `datetime` option → [`TAG_TIMESTAMP`]
//!      (checked before any container-like kind, so a date/time value is
//!      never mistaken for a structurally similar tuple); a `DateTime`
//!      without the option is an error, never a silent fall-through
//!   3. `Complex`    → [`TAG_COMPLEX`]
//!   4. `Set`        → [`TAG_SET`]
//!   5. `Tuple`      → [`TAG_TUPLE`]
//!   6. `Pin`        → one of the three pin tags, chosen by the `pin`
//!      option; an absent selector is an error
//!   7. anything else → no match (the wire codec encodes it natively)
//!
//! # Freeze before share
//! A registry is populated single-threaded during initialisation and then
//! only read.  There is no removal and no post-freeze registration, so
//! sharing it behind `&` or `Arc` needs no locking.

pub mod complex;
pub mod containers;
pub mod pin;
pub mod timestamp;

use std::collections::BTreeMap;
use thiserror::Error;

use crate::options::{Options, OptionsError, PinLayout};
use crate::value::Value;
use crate::wire::{DecodeError, EncodeError};
use self::timestamp::TimestampError;

// ── Frozen built-in tags ─────────────────────────────────────────────────────

/// Standard msgpack timestamp extension.
pub const TAG_TIMESTAMP: i8 = -1;
/// Complex number, two big-endian f32.
pub const TAG_COMPLEX:   i8 = 0x50;
/// Unordered collection, carried as an array.
pub const TAG_SET:       i8 = 0x51;
/// Fixed-arity ordered collection, carried as an array.
pub const TAG_TUPLE:     i8 = 0x52;
/// Pin by numeric id, 1 byte.
pub const TAG_PIN_ID:    i8 = 0x53;
/// Pin by name, UTF-8.
pub const TAG_PIN_NAME:  i8 = 0x54;
/// Pin as (id, port) pair.
pub const TAG_PIN_PORT:  i8 = 0x55;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ExtError {
    /// At most one codec may be bound per tag per registry.
    #[error("tag {0} is already registered")]
    Duplicate(i8),
    #[error("no codec registered for tag {0}")]
    NotFound(i8),
    /// The dispatcher cannot classify the value and no native fallback applies.
    #[error("unsupported extension value: {0}")]
    Unsupported(String),
    /// Payload length or shape an extension codec does not accept.
    #[error("bad extension payload: {0}")]
    BadPayload(String),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    /// Error from recursively encoding a wrapper's inner sequence.
    #[error("nested encode failed: {0}")]
    Encode(Box<EncodeError>),
    /// Error from recursively decoding a wrapper's inner sequence.
    #[error("nested decode failed: {0}")]
    Decode(Box<DecodeError>),
}

impl From<EncodeError> for ExtError {
    fn from(e: EncodeError) -> Self {
        ExtError::Encode(Box::new(e))
    }
}

impl From<DecodeError> for ExtError {
    fn from(e: DecodeError) -> Self {
        ExtError::Decode(Box::new(e))
    }
}

// ── Codec contract ───────────────────────────────────────────────────────────

/// One registered extension kind.
///
/// `decode` must be total over every payload length `encode` can produce
/// for this tag, and must fail cleanly (never panic, never fabricate a
/// default) on malformed input.  The registry reference lets container
/// codecs recurse into the wire codec with the same registered kinds.
pub trait ExtCodec: Send + Sync {
    fn tag(&self) -> i8;

    /// Human-readable codec name (for diagnostics only — never parsed).
    fn name(&self) -> &'static str;

    fn encode(
        &self,
        value: &Value,
        registry: &ExtensionRegistry,
        options: &Options,
    ) -> Result<Vec<u8>, ExtError>;

    fn decode(
        &self,
        payload: &[u8],
        registry: &ExtensionRegistry,
        options: &Options,
    ) -> Result<Value, ExtError>;
}

impl std::fmt::Debug for dyn ExtCodec + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtCodec")
            .field("tag", &self.tag())
            .field("name", &self.name())
            .finish()
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Tag → codec table.  Populate during init, then share read-only.
#[derive(Default)]
pub struct ExtensionRegistry {
    table: BTreeMap<i8, Box<dyn ExtCodec>>,
}

impl ExtensionRegistry {
    /// Empty registry, for applications that register everything themselves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in codecs under the frozen
    /// tags above.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        // Distinct frozen constants; cannot collide.
        reg.table.insert(TAG_TIMESTAMP, Box::new(timestamp::TimestampCodec));
        reg.table.insert(TAG_COMPLEX, Box::new(complex::ComplexCodec));
        reg.table.insert(TAG_SET, Box::new(containers::SetCodec));
        reg.table.insert(TAG_TUPLE, Box::new(containers::TupleCodec));
        reg.table.insert(TAG_PIN_ID, Box::new(pin::PinIdCodec));
        reg.table.insert(TAG_PIN_NAME, Box::new(pin::PinNameCodec));
        reg.table.insert(TAG_PIN_PORT, Box::new(pin::PinPortCodec));
        reg
    }

    /// Bind a codec under its tag.  Fails with [`ExtError::Duplicate`] if
    /// the tag is already bound; there is no replacement or removal.
    pub fn register(&mut self, codec: Box<dyn ExtCodec>) -> Result<(), ExtError> {
        let tag = codec.tag();
        if self.table.contains_key(&tag) {
            return Err(ExtError::Duplicate(tag));
        }
        self.table.insert(tag, codec);
        Ok(())
    }

    pub fn lookup(&self, tag: i8) -> Result<&dyn ExtCodec, ExtError> {
        self.table
            .get(&tag)
            .map(|c| c.as_ref())
            .ok_or(ExtError::NotFound(tag))
    }

    pub fn contains(&self, tag: i8) -> bool {
        self.table.contains_key(&tag)
    }

    /// Registered tags, ascending.
    pub fn tags(&self) -> impl Iterator<Item = i8> + '_ {
        self.table.keys().copied()
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// Ephemeral (tag, value) pair handed straight to the wire encoder.
/// Never persisted; it borrows the value for the duration of one call.
#[derive(Debug, Clone, Copy)]
pub struct Wrapper<'v> {
    pub tag:   i8,
    pub value: &'v Value,
}

/// Classify an outgoing value against the registered extension kinds.
///
/// Returns `Ok(Some(wrapper))` for a match, `Ok(None)` when the value is
/// native and the wire codec should encode it directly, and an error when
/// the value is extension-like but cannot be dispatched (missing option,
/// missing registration).  Pure function of `(value, options, registry)`.
pub fn dispatch<'v>(
    value: &'v Value,
    options: &Options,
    registry: &ExtensionRegistry,
) -> Result<Option<Wrapper<'v>>, ExtError> {
    let tag = match value {
        Value::Timestamp(_) => TAG_TIMESTAMP,
        // Checked ahead of the container kinds; see the module docs.
        Value::DateTime(_) => {
            if options.datetime() {
                TAG_TIMESTAMP
            } else {
                return Err(ExtError::Unsupported(
                    "datetime value without the `datetime` option".into(),
                ));
            }
        }
        Value::Complex { .. } => TAG_COMPLEX,
        Value::Set(_) => TAG_SET,
        Value::Tuple(_) => TAG_TUPLE,
        Value::Pin(_) => match options.pin_layout()? {
            Some(PinLayout::Id) => TAG_PIN_ID,
            Some(PinLayout::Name) => TAG_PIN_NAME,
            Some(PinLayout::PortPin) => TAG_PIN_PORT,
            None => {
                return Err(ExtError::Unsupported(
                    "pin value without the `pin` layout option".into(),
                ))
            }
        },
        _ => return Ok(None),
    };
    if !registry.contains(tag) {
        return Err(ExtError::NotFound(tag));
    }
    Ok(Some(Wrapper { tag, value }))
}
