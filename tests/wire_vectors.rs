//! Normative wire vectors: these byte sequences are fixed by the wire
//! format and must match exactly, payload and full frame alike.

use mpext::{decode_value, encode_value, ExtensionRegistry, Options, Timestamp, Value};

fn frame(value: &Value) -> Vec<u8> {
    encode_value(value, &ExtensionRegistry::standard(), &Options::new()).unwrap()
}

fn reparse(bytes: &[u8]) -> Value {
    decode_value(bytes, &ExtensionRegistry::standard(), &Options::new()).unwrap()
}

#[test]
fn timestamp_32bit_form() {
    let ts = Timestamp::new((1i64 << 32) - 1, 0).unwrap();
    assert_eq!(ts.encode(), hex::decode("ffffffff").unwrap());

    let bytes = frame(&Value::Timestamp(ts));
    assert_eq!(bytes, hex::decode("d6ffffffffff").unwrap());
    assert_eq!(reparse(&bytes), Value::Timestamp(ts));
}

#[test]
fn timestamp_64bit_form() {
    let ts = Timestamp::new((1i64 << 34) - 1, 999_999_999).unwrap();
    assert_eq!(ts.encode(), hex::decode("ee6b27ffffffffff").unwrap());

    let bytes = frame(&Value::Timestamp(ts));
    assert_eq!(bytes, hex::decode("d7ffee6b27ffffffffff").unwrap());
    assert_eq!(reparse(&bytes), Value::Timestamp(ts));
}

#[test]
fn timestamp_96bit_form() {
    let ts = Timestamp::new(i64::MAX, 999_999_999).unwrap();
    assert_eq!(ts.encode(), hex::decode("3b9ac9ff7fffffffffffffff").unwrap());

    let bytes = frame(&Value::Timestamp(ts));
    assert_eq!(bytes, hex::decode("c70cff3b9ac9ff7fffffffffffffff").unwrap());
    assert_eq!(reparse(&bytes), Value::Timestamp(ts));
}

#[test]
fn timestamp_negative_seconds() {
    let ts = Timestamp::from_unix(-2.3);
    assert_eq!(ts, Timestamp::new(-3, 700_000_000).unwrap());
    assert_eq!(ts.encode(), hex::decode("29b92700fffffffffffffffd").unwrap());

    let bytes = frame(&Value::Timestamp(ts));
    assert_eq!(reparse(&bytes), Value::Timestamp(ts));
}
