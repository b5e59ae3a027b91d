//! Pass-through wrappers for hardware pin identifiers.
//!
//! Three layouts, selected per call via the `pin` option (the dispatcher
//! refuses a pin value when the selector is absent).  The numeric layout
//! carries no port, so decoding it yields a pin with an empty port.

use crate::ext::{ExtCodec, ExtError, ExtensionRegistry, TAG_PIN_ID, TAG_PIN_NAME, TAG_PIN_PORT};
use crate::options::Options;
use crate::value::{Pin, Value};

fn expect_pin<'v>(value: &'v Value, codec: &'static str) -> Result<&'v Pin, ExtError> {
    match value {
        Value::Pin(p) => Ok(p),
        other => Err(ExtError::Unsupported(format!(
            "{codec} codec cannot encode a {} value",
            other.kind()
        ))),
    }
}

/// Tag 0x53: single-byte numeric pin id.
pub struct PinIdCodec;

impl ExtCodec for PinIdCodec {
    fn tag(&self) -> i8 {
        TAG_PIN_ID
    }

    fn name(&self) -> &'static str {
        "pin-id"
    }

    fn encode(
        &self,
        value: &Value,
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Vec<u8>, ExtError> {
        Ok(vec![expect_pin(value, "pin-id")?.id()])
    }

    fn decode(
        &self,
        payload: &[u8],
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Value, ExtError> {
        match payload {
            [id] => Ok(Value::Pin(Pin::from_id(*id))),
            _ => Err(ExtError::BadPayload(format!(
                "pin-id payload must be 1 byte, got {}",
                payload.len()
            ))),
        }
    }
}

/// Tag 0x54: UTF-8 pin name, e.g. `"A5"`.
pub struct PinNameCodec;

impl ExtCodec for PinNameCodec {
    fn tag(&self) -> i8 {
        TAG_PIN_NAME
    }

    fn name(&self) -> &'static str {
        "pin-name"
    }

    fn encode(
        &self,
        value: &Value,
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Vec<u8>, ExtError> {
        Ok(expect_pin(value, "pin-name")?.name().into_bytes())
    }

    fn decode(
        &self,
        payload: &[u8],
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Value, ExtError> {
        let name = std::str::from_utf8(payload)
            .map_err(|_| ExtError::BadPayload("pin-name payload is not UTF-8".into()))?;
        let pin = Pin::from_name(name).ok_or_else(|| {
            ExtError::BadPayload(format!("pin-name payload {name:?} has no pin number"))
        })?;
        Ok(Value::Pin(pin))
    }
}

/// Tag 0x55: pin id byte followed by the port name.
pub struct PinPortCodec;

impl ExtCodec for PinPortCodec {
    fn tag(&self) -> i8 {
        TAG_PIN_PORT
    }

    fn name(&self) -> &'static str {
        "pin-port"
    }

    fn encode(
        &self,
        value: &Value,
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Vec<u8>, ExtError> {
        let pin = expect_pin(value, "pin-port")?;
        let mut buf = Vec::with_capacity(1 + pin.port.len());
        buf.push(pin.id());
        buf.extend_from_slice(pin.port.as_bytes());
        Ok(buf)
    }

    fn decode(
        &self,
        payload: &[u8],
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Value, ExtError> {
        let (id, port) = payload
            .split_first()
            .ok_or_else(|| ExtError::BadPayload("pin-port payload is empty".into()))?;
        let port = std::str::from_utf8(port)
            .map_err(|_| ExtError::BadPayload("pin-port name is not UTF-8".into()))?;
        Ok(Value::Pin(Pin::new(port, *id)))
    }
}
