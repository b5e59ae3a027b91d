//! Property tests over the timestamp layouts and the container wrappers.

use mpext::{decode_value, encode_value, ExtensionRegistry, Options, Timestamp, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn timestamp_roundtrips_for_all_valid_inputs(
        secs in any::<i64>(),
        nanos in 0u32..1_000_000_000,
    ) {
        let ts = Timestamp::new(secs, nanos).unwrap();
        let payload = ts.encode();
        prop_assert!(matches!(payload.len(), 4 | 8 | 12));
        prop_assert_eq!(Timestamp::decode(&payload).unwrap(), ts);
    }

    #[test]
    fn timestamp_payload_is_shortest(
        secs in 0i64..(1i64 << 34),
        nanos in 0u32..1_000_000_000,
    ) {
        let ts = Timestamp::new(secs, nanos).unwrap();
        let expect = if secs < (1i64 << 32) && nanos == 0 { 4 } else { 8 };
        prop_assert_eq!(ts.encode().len(), expect);
    }

    #[test]
    fn negative_seconds_always_take_the_96bit_form(
        secs in i64::MIN..0,
        nanos in 0u32..1_000_000_000,
    ) {
        let ts = Timestamp::new(secs, nanos).unwrap();
        prop_assert_eq!(ts.encode().len(), 12);
    }

    #[test]
    fn unix_nano_conversion_roundtrips(nanos in any::<i64>()) {
        let ts = Timestamp::from_unix_nano(nanos);
        prop_assert!(ts.nanos() < 1_000_000_000);
        prop_assert_eq!(ts.to_unix_nano(), nanos as i128);
    }

    #[test]
    fn tuple_wrapper_preserves_order_and_count(
        items in proptest::collection::vec(any::<i64>(), 0..24),
    ) {
        let reg = ExtensionRegistry::standard();
        let opts = Options::new();
        let value = Value::Tuple(items.into_iter().map(Value::Int).collect());
        let bytes = encode_value(&value, &reg, &opts).unwrap();
        prop_assert_eq!(decode_value(&bytes, &reg, &opts).unwrap(), value);
    }

    #[test]
    fn set_wrapper_preserves_membership(
        items in proptest::collection::vec(-50i64..50, 0..24),
    ) {
        let reg = ExtensionRegistry::standard();
        let opts = Options::new();
        let value = Value::set(items.into_iter().map(Value::Int));
        let bytes = encode_value(&value, &reg, &opts).unwrap();
        prop_assert_eq!(decode_value(&bytes, &reg, &opts).unwrap(), value);
    }
}
