//! Wire codec: MessagePack encoding of the native kinds plus the generic
//! extension frame.
//!
//! # Encode path
//! Every outgoing value is first offered to the extension dispatcher.  A
//! match becomes a tagged frame whose payload is produced by the registered
//! codec; no match means the value is native and is written directly.
//! Container codecs recurse back into this module, so recursion depth
//! equals the nesting depth of the value.
//!
//! # Decode path
//! Values are read back by their type byte.  An extension frame yields
//! `(tag, payload)`; the payload is handed to the codec registered for
//! that tag, which MUST be present — an unknown tag fails decoding.
//!
//! # Endianness and framing
//! All multi-byte fields are big-endian.  Writers always emit the shortest
//! standard encoding (fixint/fixstr/fixext where they fit); readers accept
//! every standard form regardless of length.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

use crate::ext::{dispatch, ExtError, ExtensionRegistry};
use crate::options::Options;
use crate::value::Value;

#[derive(Error, Debug)]
pub enum EncodeError {
    /// A string, blob, collection or extension payload longer than the
    /// format's 32-bit length fields can describe.
    #[error("{kind} of {len} bytes exceeds the 32-bit length limit")]
    OversizeLength { kind: &'static str, len: usize },
    #[error(transparent)]
    Ext(#[from] ExtError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    Truncated,
    #[error("unknown type byte 0x{0:02X}")]
    UnknownType(u8),
    #[error("{0} trailing bytes after the value")]
    TrailingBytes(usize),
    /// The value model carries i64; a u64 above that range cannot
    /// round-trip and is rejected rather than silently wrapped.
    #[error("unsigned integer {0} out of i64 range")]
    IntOutOfRange(u64),
    #[error("invalid UTF-8 in string: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Ext(#[from] ExtError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Map reader EOF onto the decoder's own truncation error.
fn eof(e: io::Error) -> DecodeError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::Truncated
    } else {
        DecodeError::Io(e)
    }
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Encode one value, extension dispatch included, into a fresh buffer.
pub fn encode_value(
    value: &Value,
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    write_value(&mut buf, value, registry, options)?;
    Ok(buf)
}

fn len32(kind: &'static str, len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::OversizeLength { kind, len })
}

fn write_value<W: Write>(
    w: &mut W,
    value: &Value,
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<(), EncodeError> {
    // Extension kinds first; first matching predicate wins.
    if let Some(wrapper) = dispatch(value, options, registry)? {
        let codec = registry.lookup(wrapper.tag)?;
        let payload = codec.encode(wrapper.value, registry, options)?;
        return write_ext(w, wrapper.tag, &payload);
    }

    match value {
        Value::Nil => w.write_u8(0xC0)?,
        Value::Bool(false) => w.write_u8(0xC2)?,
        Value::Bool(true) => w.write_u8(0xC3)?,
        Value::Int(i) => write_int(w, *i)?,
        Value::Float(f) => {
            w.write_u8(0xCB)?;
            w.write_f64::<BigEndian>(*f)?;
        }
        Value::Str(s) => {
            let len = len32("string", s.len())?;
            match len {
                0..=31 => w.write_u8(0xA0 | len as u8)?,
                32..=0xFF => {
                    w.write_u8(0xD9)?;
                    w.write_u8(len as u8)?;
                }
                0x100..=0xFFFF => {
                    w.write_u8(0xDA)?;
                    w.write_u16::<BigEndian>(len as u16)?;
                }
                _ => {
                    w.write_u8(0xDB)?;
                    w.write_u32::<BigEndian>(len)?;
                }
            }
            w.write_all(s.as_bytes())?;
        }
        Value::Bin(b) => {
            let len = len32("binary blob", b.len())?;
            match len {
                0..=0xFF => {
                    w.write_u8(0xC4)?;
                    w.write_u8(len as u8)?;
                }
                0x100..=0xFFFF => {
                    w.write_u8(0xC5)?;
                    w.write_u16::<BigEndian>(len as u16)?;
                }
                _ => {
                    w.write_u8(0xC6)?;
                    w.write_u32::<BigEndian>(len)?;
                }
            }
            w.write_all(b)?;
        }
        Value::Array(items) => {
            let len = len32("array", items.len())?;
            match len {
                0..=15 => w.write_u8(0x90 | len as u8)?,
                16..=0xFFFF => {
                    w.write_u8(0xDC)?;
                    w.write_u16::<BigEndian>(len as u16)?;
                }
                _ => {
                    w.write_u8(0xDD)?;
                    w.write_u32::<BigEndian>(len)?;
                }
            }
            for item in items {
                write_value(w, item, registry, options)?;
            }
        }
        Value::Map(pairs) => {
            let len = len32("map", pairs.len())?;
            match len {
                0..=15 => w.write_u8(0x80 | len as u8)?,
                16..=0xFFFF => {
                    w.write_u8(0xDE)?;
                    w.write_u16::<BigEndian>(len as u16)?;
                }
                _ => {
                    w.write_u8(0xDF)?;
                    w.write_u32::<BigEndian>(len)?;
                }
            }
            for (key, val) in pairs {
                write_value(w, key, registry, options)?;
                write_value(w, val, registry, options)?;
            }
        }
        // Extension kinds always take the wrapper path above; reaching
        // here means the dispatcher misclassified the value.
        other => {
            return Err(EncodeError::Ext(ExtError::Unsupported(format!(
                "no native encoding for a {} value",
                other.kind()
            ))))
        }
    }
    Ok(())
}

fn write_int<W: Write>(w: &mut W, i: i64) -> Result<(), EncodeError> {
    if (0..=0x7F).contains(&i) {
        w.write_u8(i as u8)?;
    } else if (-32..0).contains(&i) {
        w.write_u8(i as u8)?;
    } else if i >= 0 {
        let u = i as u64;
        if u <= 0xFF {
            w.write_u8(0xCC)?;
            w.write_u8(u as u8)?;
        } else if u <= 0xFFFF {
            w.write_u8(0xCD)?;
            w.write_u16::<BigEndian>(u as u16)?;
        } else if u <= 0xFFFF_FFFF {
            w.write_u8(0xCE)?;
            w.write_u32::<BigEndian>(u as u32)?;
        } else {
            w.write_u8(0xCF)?;
            w.write_u64::<BigEndian>(u)?;
        }
    } else if i >= i8::MIN as i64 {
        w.write_u8(0xD0)?;
        w.write_i8(i as i8)?;
    } else if i >= i16::MIN as i64 {
        w.write_u8(0xD1)?;
        w.write_i16::<BigEndian>(i as i16)?;
    } else if i >= i32::MIN as i64 {
        w.write_u8(0xD2)?;
        w.write_i32::<BigEndian>(i as i32)?;
    } else {
        w.write_u8(0xD3)?;
        w.write_i64::<BigEndian>(i)?;
    }
    Ok(())
}

/// Shortest standard extension frame: fixext for payload lengths
/// 1/2/4/8/16, otherwise ext8/ext16/ext32.
fn write_ext<W: Write>(w: &mut W, tag: i8, payload: &[u8]) -> Result<(), EncodeError> {
    let len = len32("extension payload", payload.len())?;
    match len {
        1 => w.write_u8(0xD4)?,
        2 => w.write_u8(0xD5)?,
        4 => w.write_u8(0xD6)?,
        8 => w.write_u8(0xD7)?,
        16 => w.write_u8(0xD8)?,
        0..=0xFF => {
            w.write_u8(0xC7)?;
            w.write_u8(len as u8)?;
        }
        0x100..=0xFFFF => {
            w.write_u8(0xC8)?;
            w.write_u16::<BigEndian>(len as u16)?;
        }
        _ => {
            w.write_u8(0xC9)?;
            w.write_u32::<BigEndian>(len)?;
        }
    }
    w.write_i8(tag)?;
    w.write_all(payload)?;
    Ok(())
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Decode exactly one value; trailing bytes are an error.
pub fn decode_value(
    bytes: &[u8],
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<Value, DecodeError> {
    let mut cur = Cursor::new(bytes);
    let value = read_value(&mut cur, registry, options)?;
    let rest = bytes.len() - cur.position() as usize;
    if rest > 0 {
        return Err(DecodeError::TrailingBytes(rest));
    }
    Ok(value)
}

fn remaining(cur: &Cursor<&[u8]>) -> usize {
    cur.get_ref().len() - cur.position() as usize
}

/// Read `len` payload bytes, refusing a declared length the input cannot
/// possibly hold (so a corrupt length field never drives the allocation).
fn read_bytes(cur: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, DecodeError> {
    if len > remaining(cur) {
        return Err(DecodeError::Truncated);
    }
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf).map_err(eof)?;
    Ok(buf)
}

fn read_value(
    cur: &mut Cursor<&[u8]>,
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<Value, DecodeError> {
    let ty = cur.read_u8().map_err(eof)?;
    Ok(match ty {
        0x00..=0x7F => Value::Int(ty as i64),
        0xE0..=0xFF => Value::Int(ty as i8 as i64),
        0x80..=0x8F => read_map(cur, (ty & 0x0F) as usize, registry, options)?,
        0x90..=0x9F => read_array(cur, (ty & 0x0F) as usize, registry, options)?,
        0xA0..=0xBF => read_str(cur, (ty & 0x1F) as usize)?,
        0xC0 => Value::Nil,
        0xC2 => Value::Bool(false),
        0xC3 => Value::Bool(true),
        0xC4 => {
            let len = cur.read_u8().map_err(eof)? as usize;
            Value::Bin(read_bytes(cur, len)?)
        }
        0xC5 => {
            let len = cur.read_u16::<BigEndian>().map_err(eof)? as usize;
            Value::Bin(read_bytes(cur, len)?)
        }
        0xC6 => {
            let len = cur.read_u32::<BigEndian>().map_err(eof)? as usize;
            Value::Bin(read_bytes(cur, len)?)
        }
        0xC7 => {
            let len = cur.read_u8().map_err(eof)? as usize;
            read_ext(cur, len, registry, options)?
        }
        0xC8 => {
            let len = cur.read_u16::<BigEndian>().map_err(eof)? as usize;
            read_ext(cur, len, registry, options)?
        }
        0xC9 => {
            let len = cur.read_u32::<BigEndian>().map_err(eof)? as usize;
            read_ext(cur, len, registry, options)?
        }
        0xCA => Value::Float(cur.read_f32::<BigEndian>().map_err(eof)? as f64),
        0xCB => Value::Float(cur.read_f64::<BigEndian>().map_err(eof)?),
        0xCC => Value::Int(cur.read_u8().map_err(eof)? as i64),
        0xCD => Value::Int(cur.read_u16::<BigEndian>().map_err(eof)? as i64),
        0xCE => Value::Int(cur.read_u32::<BigEndian>().map_err(eof)? as i64),
        0xCF => {
            let u = cur.read_u64::<BigEndian>().map_err(eof)?;
            let i = i64::try_from(u).map_err(|_| DecodeError::IntOutOfRange(u))?;
            Value::Int(i)
        }
        0xD0 => Value::Int(cur.read_i8().map_err(eof)? as i64),
        0xD1 => Value::Int(cur.read_i16::<BigEndian>().map_err(eof)? as i64),
        0xD2 => Value::Int(cur.read_i32::<BigEndian>().map_err(eof)? as i64),
        0xD3 => Value::Int(cur.read_i64::<BigEndian>().map_err(eof)?),
        0xD4 => read_ext(cur, 1, registry, options)?,
        0xD5 => read_ext(cur, 2, registry, options)?,
        0xD6 => read_ext(cur, 4, registry, options)?,
        0xD7 => read_ext(cur, 8, registry, options)?,
        0xD8 => read_ext(cur, 16, registry, options)?,
        0xD9 => {
            let len = cur.read_u8().map_err(eof)? as usize;
            read_str(cur, len)?
        }
        0xDA => {
            let len = cur.read_u16::<BigEndian>().map_err(eof)? as usize;
            read_str(cur, len)?
        }
        0xDB => {
            let len = cur.read_u32::<BigEndian>().map_err(eof)? as usize;
            read_str(cur, len)?
        }
        0xDC => {
            let len = cur.read_u16::<BigEndian>().map_err(eof)? as usize;
            read_array(cur, len, registry, options)?
        }
        0xDD => {
            let len = cur.read_u32::<BigEndian>().map_err(eof)? as usize;
            read_array(cur, len, registry, options)?
        }
        0xDE => {
            let len = cur.read_u16::<BigEndian>().map_err(eof)? as usize;
            read_map(cur, len, registry, options)?
        }
        0xDF => {
            let len = cur.read_u32::<BigEndian>().map_err(eof)? as usize;
            read_map(cur, len, registry, options)?
        }
        other => return Err(DecodeError::UnknownType(other)),
    })
}

fn read_str(cur: &mut Cursor<&[u8]>, len: usize) -> Result<Value, DecodeError> {
    Ok(Value::Str(String::from_utf8(read_bytes(cur, len)?)?))
}

fn read_array(
    cur: &mut Cursor<&[u8]>,
    len: usize,
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<Value, DecodeError> {
    // Every element takes at least one byte.
    if len > remaining(cur) {
        return Err(DecodeError::Truncated);
    }
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(read_value(cur, registry, options)?);
    }
    Ok(Value::Array(items))
}

fn read_map(
    cur: &mut Cursor<&[u8]>,
    len: usize,
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<Value, DecodeError> {
    if len > remaining(cur) {
        return Err(DecodeError::Truncated);
    }
    let mut pairs = Vec::with_capacity(len);
    for _ in 0..len {
        let key = read_value(cur, registry, options)?;
        let val = read_value(cur, registry, options)?;
        pairs.push((key, val));
    }
    Ok(Value::Map(pairs))
}

fn read_ext(
    cur: &mut Cursor<&[u8]>,
    len: usize,
    registry: &ExtensionRegistry,
    options: &Options,
) -> Result<Value, DecodeError> {
    let tag = cur.read_i8().map_err(eof)?;
    let payload = read_bytes(cur, len)?;
    let codec = registry.lookup(tag)?;
    Ok(codec.decode(&payload, registry, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::ExtensionRegistry;

    fn roundtrip(v: Value) -> Value {
        let reg = ExtensionRegistry::standard();
        let opts = Options::new();
        let bytes = encode_value(&v, &reg, &opts).expect("encode");
        decode_value(&bytes, &reg, &opts).expect("decode")
    }

    #[test]
    fn native_scalars_roundtrip() {
        for v in [
            Value::Nil,
            Value::Bool(true),
            Value::Int(0),
            Value::Int(127),
            Value::Int(128),
            Value::Int(-32),
            Value::Int(-33),
            Value::Int(65_536),
            Value::Int(i64::MAX),
            Value::Int(i64::MIN),
            Value::Float(1.5),
            Value::Str("hello".into()),
            Value::Bin(vec![0, 1, 2, 255]),
        ] {
            assert_eq!(roundtrip(v.clone()), v);
        }
    }

    #[test]
    fn shortest_int_encodings() {
        let reg = ExtensionRegistry::new();
        let opts = Options::new();
        let enc = |i: i64| encode_value(&Value::Int(i), &reg, &opts).expect("encode");
        assert_eq!(enc(5), vec![0x05]);
        assert_eq!(enc(-1), vec![0xFF]);
        assert_eq!(enc(200), vec![0xCC, 200]);
        assert_eq!(enc(-100), vec![0xD0, 0x9C]);
        assert_eq!(enc(0x1_0000), vec![0xCE, 0, 1, 0, 0]);
    }

    #[test]
    fn nested_containers_roundtrip() {
        let v = Value::Array(vec![
            Value::Int(1),
            Value::Map(vec![(Value::Str("k".into()), Value::Array(vec![Value::Nil]))]),
        ]);
        assert_eq!(roundtrip(v.clone()), v);
    }

    #[test]
    fn u64_above_i64_range_is_rejected() {
        let reg = ExtensionRegistry::new();
        let bytes = [0xCF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        match decode_value(&bytes, &reg, &Options::new()) {
            Err(DecodeError::IntOutOfRange(u)) => assert_eq!(u, u64::MAX),
            other => panic!("expected IntOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn truncated_and_trailing_inputs_fail() {
        let reg = ExtensionRegistry::new();
        let opts = Options::new();
        assert!(matches!(
            decode_value(&[0xDB, 0xFF, 0xFF, 0xFF, 0xFF, b'x'], &reg, &opts),
            Err(DecodeError::Truncated)
        ));
        assert!(matches!(
            decode_value(&[0xC0, 0xC0], &reg, &opts),
            Err(DecodeError::TrailingBytes(1))
        ));
        assert!(matches!(
            decode_value(&[0xC1], &reg, &opts),
            Err(DecodeError::UnknownType(0xC1))
        ));
    }

    #[test]
    fn unregistered_tag_fails_decode() {
        // fixext1, tag 0x70, one payload byte.
        let bytes = [0xD4, 0x70, 0x00];
        let reg = ExtensionRegistry::standard();
        match decode_value(&bytes, &reg, &Options::new()) {
            Err(DecodeError::Ext(ExtError::NotFound(tag))) => assert_eq!(tag, 0x70),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
