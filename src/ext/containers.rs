//! Set and tuple wrapper codecs.
//!
//! Neither kind is natively distinguishable on the wire, so both are
//! carried as a plain array and delegate full recursive encoding to the
//! wire codec.  The array carrier is native — the dispatcher can never
//! reclassify it as a set or tuple again, which structurally rules out
//! the wrapper recursing into itself.
//!
//! A set drops duplicate elements on encode and compares by membership
//! after decode; a tuple preserves element order and count exactly.

use crate::ext::{ExtCodec, ExtError, ExtensionRegistry, TAG_SET, TAG_TUPLE};
use crate::options::Options;
use crate::value::{dedup, Value};
use crate::wire;

fn decode_sequence(
    payload: &[u8],
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<Vec<Value>, ExtError> {
    // Inner wire errors propagate unchanged.
    match wire::decode_value(payload, registry, options)? {
        Value::Array(items) => Ok(items),
        other => Err(ExtError::BadPayload(format!(
            "container payload decoded to {}, expected an array",
            other.kind()
        ))),
    }
}

pub struct SetCodec;

impl ExtCodec for SetCodec {
    fn tag(&self) -> i8 {
        TAG_SET
    }

    fn name(&self) -> &'static str {
        "set"
    }

    fn encode(
        &self,
        value: &Value,
        registry: &ExtensionRegistry,
        options: &Options,
    ) -> Result<Vec<u8>, ExtError> {
        let items = match value {
            Value::Set(items) => items,
            other => {
                return Err(ExtError::Unsupported(format!(
                    "set codec cannot encode a {} value",
                    other.kind()
                )))
            }
        };
        let carrier = Value::Array(dedup(items.iter().cloned()));
        Ok(wire::encode_value(&carrier, registry, options)?)
    }

    fn decode(
        &self,
        payload: &[u8],
        registry: &ExtensionRegistry,
        options: &Options,
    ) -> Result<Value, ExtError> {
        Ok(Value::set(decode_sequence(payload, registry, options)?))
    }
}

pub struct TupleCodec;

impl ExtCodec for TupleCodec {
    fn tag(&self) -> i8 {
        TAG_TUPLE
    }

    fn name(&self) -> &'static str {
        "tuple"
    }

    fn encode(
        &self,
        value: &Value,
        registry: &ExtensionRegistry,
        options: &Options,
    ) -> Result<Vec<u8>, ExtError> {
        let items = match value {
            Value::Tuple(items) => items,
            other => {
                return Err(ExtError::Unsupported(format!(
                    "tuple codec cannot encode a {} value",
                    other.kind()
                )))
            }
        };
        let carrier = Value::Array(items.clone());
        Ok(wire::encode_value(&carrier, registry, options)?)
    }

    fn decode(
        &self,
        payload: &[u8],
        registry: &ExtensionRegistry,
        options: &Options,
    ) -> Result<Value, ExtError> {
        Ok(Value::Tuple(decode_sequence(payload, registry, options)?))
    }
}
