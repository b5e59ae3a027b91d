//! Multi-width timestamp codec (standard extension tag -1).
//!
//! # Wire layouts
//! Three big-endian payload layouts, chosen to minimise wire size for the
//! common post-epoch case.  These are normative for wire compatibility,
//! not an implementation choice:
//!
//! - 32-bit (4 bytes): unsigned seconds, nanoseconds implicitly 0.
//!   Usable when seconds fit 32 bits and nanoseconds are zero.
//! - 64-bit (8 bytes): one u64 word `(nanos << 34) | secs`.
//!   Usable when `0 <= secs < 2^34`.
//! - 96-bit (12 bytes): u32 nanoseconds followed by i64 seconds.
//!   Everything else, including every negative seconds value.
//!
//! Selecting the 4-byte form requires *both* `secs < 2^34` and the upper
//! 32 bits of the packed word to be zero; testing only the latter would
//! misclassify values straddling the 2^32 boundary.
//!
//! Decoding dispatches purely on payload length.  A payload whose embedded
//! nanoseconds field exceeds 999 999 999 is rejected — the bit pattern is
//! representable but the value is not.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::ext::{ExtCodec, ExtError, ExtensionRegistry, TAG_TIMESTAMP};
use crate::options::{Options, TimestampMode};
use crate::value::Value;

pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Seconds values below this fit the 34-bit field of the 4/8-byte forms.
const SECS_34_BIT: u64 = 1 << 34;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimestampError {
    /// Construction with out-of-range nanoseconds fails immediately.
    #[error("nanoseconds {0} out of range (must be below 1_000_000_000)")]
    InvalidNanos(u32),
    #[error("undefined timestamp length {0} (expected 4, 8 or 12)")]
    UndefinedLength(usize),
    /// Well-formed bit pattern, semantically invalid nanoseconds field.
    #[error("decoded nanoseconds {0} exceed 999_999_999")]
    NanosOutOfRange(u32),
    #[error("unix-nano value {0} does not fit an i64")]
    UnixNanoOverflow(i128),
    #[error("seconds value {0} outside the representable datetime range")]
    DatetimeOutOfRange(i64),
}

/// A point in time: signed seconds since the unix epoch plus a
/// non-negative sub-second nanosecond offset below 10^9.
///
/// The nanosecond invariant holds for every constructed value; `new` is
/// the only fallible constructor and the conversion constructors
/// normalise their input so the invariant cannot be violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    secs:  i64,
    nanos: u32,
}

impl Timestamp {
    pub fn new(secs: i64, nanos: u32) -> Result<Self, TimestampError> {
        if nanos >= NANOS_PER_SEC {
            return Err(TimestampError::InvalidNanos(nanos));
        }
        Ok(Self { secs, nanos })
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// From fractional unix seconds.  The seconds component is the *floor*
    /// of the input, so `from_unix(-2.3)` is `(-3, 700_000_000)` — never
    /// truncation toward zero.
    pub fn from_unix(unix: f64) -> Self {
        let floor = unix.floor();
        let mut secs = floor as i64;
        let mut nanos = ((unix - floor) * 1e9).round() as u32;
        // Rounding the fraction can land exactly on one full second.
        if nanos >= NANOS_PER_SEC {
            secs += 1;
            nanos -= NANOS_PER_SEC;
        }
        Self { secs, nanos }
    }

    /// From integer unix nanoseconds.  Euclidean divmod keeps the
    /// remainder non-negative for pre-epoch inputs.
    pub fn from_unix_nano(nanos: i64) -> Self {
        Self {
            secs:  nanos.div_euclid(NANOS_PER_SEC as i64),
            nanos: nanos.rem_euclid(NANOS_PER_SEC as i64) as u32,
        }
    }

    pub fn to_unix(&self) -> f64 {
        self.secs as f64 + self.nanos as f64 / 1e9
    }

    /// Unix nanoseconds.  Widened to i128: the full i64 seconds range
    /// times 10^9 does not fit an i64.
    pub fn to_unix_nano(&self) -> i128 {
        self.secs as i128 * NANOS_PER_SEC as i128 + self.nanos as i128
    }

    /// Affine transform against 1970-01-01T00:00:00 UTC.  Fails for
    /// seconds values outside chrono's representable range.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, TimestampError> {
        DateTime::from_timestamp(self.secs, self.nanos)
            .ok_or(TimestampError::DatetimeOutOfRange(self.secs))
    }

    /// From a timezone-aware datetime, normalised to UTC first so any
    /// offset round-trips correctly.  Naive input is unrepresentable by
    /// this signature; attaching a zone is the caller's job.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        let secs = dt.timestamp();
        let nanos = dt.timestamp_subsec_nanos();
        // chrono represents a leap second as nanos >= 10^9; fold it into
        // the following second to keep the invariant.
        if nanos >= NANOS_PER_SEC {
            Self { secs: secs + 1, nanos: nanos - NANOS_PER_SEC }
        } else {
            Self { secs, nanos }
        }
    }

    /// Shortest-form payload: 4, 8 or 12 bytes (see the module docs).
    pub fn encode(&self) -> Vec<u8> {
        if self.secs >= 0 && (self.secs as u64) < SECS_34_BIT {
            let word = ((self.nanos as u64) << 34) | self.secs as u64;
            if word >> 32 == 0 {
                let mut buf = [0u8; 4];
                BigEndian::write_u32(&mut buf, word as u32);
                buf.to_vec()
            } else {
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, word);
                buf.to_vec()
            }
        } else {
            let mut buf = [0u8; 12];
            BigEndian::write_u32(&mut buf[..4], self.nanos);
            BigEndian::write_i64(&mut buf[4..], self.secs);
            buf.to_vec()
        }
    }

    /// Dispatch purely on payload length; any length outside {4, 8, 12}
    /// is undefined.
    pub fn decode(payload: &[u8]) -> Result<Self, TimestampError> {
        match payload.len() {
            4 => Ok(Self {
                secs:  BigEndian::read_u32(payload) as i64,
                nanos: 0,
            }),
            8 => {
                let word = BigEndian::read_u64(payload);
                let nanos = (word >> 34) as u32;
                if nanos >= NANOS_PER_SEC {
                    return Err(TimestampError::NanosOutOfRange(nanos));
                }
                Ok(Self {
                    secs: (word & (SECS_34_BIT - 1)) as i64,
                    nanos,
                })
            }
            12 => {
                let nanos = BigEndian::read_u32(&payload[..4]);
                if nanos >= NANOS_PER_SEC {
                    return Err(TimestampError::NanosOutOfRange(nanos));
                }
                Ok(Self {
                    secs: BigEndian::read_i64(&payload[4..]),
                    nanos,
                })
            }
            n => Err(TimestampError::UndefinedLength(n)),
        }
    }
}

// ── Codec ────────────────────────────────────────────────────────────────────

pub struct TimestampCodec;

impl ExtCodec for TimestampCodec {
    fn tag(&self) -> i8 {
        TAG_TIMESTAMP
    }

    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn encode(
        &self,
        value: &Value,
        _registry: &ExtensionRegistry,
        _options: &Options,
    ) -> Result<Vec<u8>, ExtError> {
        match value {
            Value::Timestamp(ts) => Ok(ts.encode()),
            Value::DateTime(dt) => Ok(Timestamp::from_datetime(dt).encode()),
            other => Err(ExtError::Unsupported(format!(
                "timestamp codec cannot encode a {} value",
                other.kind()
            ))),
        }
    }

    fn decode(
        &self,
        payload: &[u8],
        _registry: &ExtensionRegistry,
        options: &Options,
    ) -> Result<Value, ExtError> {
        let ts = Timestamp::decode(payload)?;
        Ok(match options.timestamp_mode()? {
            TimestampMode::Timestamp => Value::Timestamp(ts),
            TimestampMode::UnixFloat => Value::Float(ts.to_unix()),
            TimestampMode::UnixNano => {
                let nano = ts.to_unix_nano();
                let fit = i64::try_from(nano)
                    .map_err(|_| TimestampError::UnixNanoOverflow(nano))?;
                Value::Int(fit)
            }
            TimestampMode::DateTime => Value::DateTime(ts.to_datetime()?.fixed_offset()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64, nanos: u32) -> Timestamp {
        Timestamp::new(secs, nanos).expect("valid timestamp")
    }

    #[test]
    fn construction_rejects_invalid_nanos() {
        assert_eq!(
            Timestamp::new(0, NANOS_PER_SEC),
            Err(TimestampError::InvalidNanos(NANOS_PER_SEC))
        );
        assert!(Timestamp::new(0, NANOS_PER_SEC - 1).is_ok());
    }

    #[test]
    fn shortest_encoding_buckets() {
        // secs < 2^32, nanos == 0: 4 bytes.
        assert_eq!(ts(0, 0).encode().len(), 4);
        assert_eq!(ts((1 << 32) - 1, 0).encode().len(), 4);
        // nanos > 0 or secs >= 2^32, still below 2^34: 8 bytes.
        assert_eq!(ts(0, 1).encode().len(), 8);
        assert_eq!(ts(1 << 32, 0).encode().len(), 8);
        assert_eq!(ts((1 << 34) - 1, 999_999_999).encode().len(), 8);
        // Everything else: 12 bytes.
        assert_eq!(ts(1 << 34, 0).encode().len(), 12);
        assert_eq!(ts(-1, 0).encode().len(), 12);
        assert_eq!(ts(i64::MAX, 999_999_999).encode().len(), 12);
    }

    #[test]
    fn boundary_at_34_bits() {
        assert_eq!(ts((1 << 34) - 1, 0).encode().len(), 8);
        assert_eq!(ts(1 << 34, 0).encode().len(), 12);
    }

    #[test]
    fn roundtrip_all_three_layouts() {
        for t in [
            ts(0, 0),
            ts(1, 0),
            ts((1 << 32) - 1, 0),
            ts(1 << 32, 0),
            ts(42, 14_000),
            ts((1 << 34) - 1, 999_999_999),
            ts(1 << 34, 1),
            ts(-1, 999_999_999),
            ts(-3, 700_000_000),
            ts(i64::MIN, 0),
            ts(i64::MAX, 999_999_999),
        ] {
            assert_eq!(Timestamp::decode(&t.encode()), Ok(t));
        }
    }

    #[test]
    fn decode_rejects_undefined_lengths() {
        for len in [0usize, 1, 2, 3, 5, 7, 9, 11, 13, 16] {
            assert_eq!(
                Timestamp::decode(&vec![0u8; len]),
                Err(TimestampError::UndefinedLength(len))
            );
        }
    }

    #[test]
    fn decode_rejects_overlarge_nanos() {
        // 8-byte word with nanos field = 10^9.
        let word = (NANOS_PER_SEC as u64) << 34;
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, word);
        assert_eq!(
            Timestamp::decode(&buf),
            Err(TimestampError::NanosOutOfRange(NANOS_PER_SEC))
        );

        let mut buf = [0u8; 12];
        BigEndian::write_u32(&mut buf[..4], NANOS_PER_SEC);
        assert_eq!(
            Timestamp::decode(&buf),
            Err(TimestampError::NanosOutOfRange(NANOS_PER_SEC))
        );
    }

    #[test]
    fn from_unix_floors_negative_input() {
        let t = Timestamp::from_unix(-2.3);
        assert_eq!(t, ts(-3, 700_000_000));
        assert!((t.to_unix() - (-2.3)).abs() < 1e-9);
    }

    #[test]
    fn from_unix_nano_matches_from_unix() {
        let t = Timestamp::from_unix_nano(42_000_014_000);
        assert_eq!(t, ts(42, 14_000));
        assert_eq!(t, Timestamp::from_unix(42.000014));
        // Negative input keeps the remainder non-negative.
        assert_eq!(Timestamp::from_unix_nano(-1), ts(-1, 999_999_999));
    }

    #[test]
    fn to_unix_nano_widens() {
        let t = ts(i64::MAX, 999_999_999);
        assert_eq!(
            t.to_unix_nano(),
            i64::MAX as i128 * 1_000_000_000 + 999_999_999
        );
    }

    #[test]
    fn datetime_roundtrip_normalises_offset() {
        let offset = chrono::FixedOffset::east_opt(5 * 3600).expect("valid offset");
        let dt = offset.with_ymd_and_hms(2021, 7, 1, 12, 30, 15).single().expect("valid datetime");
        let t = Timestamp::from_datetime(&dt);
        let back = t.to_datetime().expect("in range");
        assert_eq!(back, dt);
        assert_eq!(Timestamp::from_datetime(&back), t);
    }

    #[test]
    fn to_datetime_fails_out_of_range() {
        assert_eq!(
            ts(i64::MAX, 0).to_datetime(),
            Err(TimestampError::DatetimeOutOfRange(i64::MAX))
        );
    }
}
