//! Complex-number codec: two big-endian f32, exactly 8 bytes.

use byteorder::{BigEndian, ByteOrder};

use crate::ext::{ExtCodec, ExtError, ExtensionRegistry, TAG_COMPLEX};
use crate::options::Options;
use crate::value::Value;

pub struct ComplexCodec;

impl ExtCodec for ComplexCodec {
    fn tag(&self) -> i8 {
        TAG_COMPLEX
    }

    fn name(&self) -> &'static str {
        "complex"
    }

    fn encode(
        &self,
        value: &Value,
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Vec<u8>, ExtError> {
        match value {
            Value::Complex { re, im } => {
                let mut buf = [0u8; 8];
                BigEndian::write_f32(&mut buf[..4], *re);
                BigEndian::write_f32(&mut buf[4..], *im);
                Ok(buf.to_vec())
            }
            other => Err(ExtError::Unsupported(format!(
                "complex codec cannot encode a {} value",
                other.kind()
            ))),
        }
    }

    fn decode(
        &self,
        payload: &[u8],
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Value, ExtError> {
        if payload.len() != 8 {
            return Err(ExtError::BadPayload(format!(
                "complex payload must be 8 bytes, got {}",
                payload.len()
            )));
        }
        Ok(Value::Complex {
            re: BigEndian::read_f32(&payload[..4]),
            im: BigEndian::read_f32(&payload[4..]),
        })
    }
}
