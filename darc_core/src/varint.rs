//! Variable-length integer codec for binary metadata records.
//!
//! Base-128, little-endian: least-significant group first. Every byte but the
//! last has bit 7 set.

use crate::error::{Error, Result};

/// Maximum encoded length of a `u64` (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7F;

/// Encode `value` into a fresh buffer.
pub fn encode(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(value));
    encode_into(value, &mut buf);
    buf
}

/// Append the encoding of `value` to `buf`.
///
/// Returns the number of bytes written (1..=10).
pub fn encode_into(mut value: u64, buf: &mut Vec<u8>) -> usize {
    let start = buf.len();
    while value > u64::from(PAYLOAD_MASK) {
        buf.push(CONTINUATION | (value as u8 & PAYLOAD_MASK));
        value >>= 7;
    }
    buf.push(value as u8);
    buf.len() - start
}

/// Encode a signed value, rejecting negatives.
pub fn encode_signed(value: i64) -> Result<Vec<u8>> {
    let value = u64::try_from(value).map_err(|_| Error::negative_varint(value))?;
    Ok(encode(value))
}

/// Decode a single varint from the start of `bytes`.
///
/// Bytes after the terminator are ignored.
pub fn decode(bytes: &[u8]) -> Result<u64> {
    decode_prefix(bytes).map(|(value, _)| value)
}

/// Decode a varint from the start of `bytes`.
///
/// Returns `(value, bytes_consumed)` so record readers can continue after it.
pub fn decode_prefix(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        let payload = u64::from(byte & PAYLOAD_MASK);
        if payload != 0 {
            if shift >= u64::BITS || (payload << shift) >> shift != payload {
                return Err(Error::VarintOverflow);
            }
            value |= payload << shift;
        }
        if byte & CONTINUATION == 0 {
            return Ok((value, i + 1));
        }
        shift = shift.saturating_add(7);
    }

    Err(Error::truncated_varint(bytes.len()))
}

/// Number of bytes `encode(value)` produces.
#[inline]
pub fn encoded_len(value: u64) -> usize {
    let bits = u64::BITS - value.leading_zeros();
    bits.max(1).div_ceil(7) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_boundaries() {
        let cases: &[u64] = &[
            0,
            1,
            127,
            128,
            16383,
            16384,
            u32::MAX as u64,
            i64::MAX as u64,
            u64::MAX,
        ];
        for &value in cases {
            let bytes = encode(value);
            assert_eq!(decode(&bytes).unwrap(), value, "roundtrip failed for {value}");
            assert_eq!(bytes.len(), encoded_len(value), "length mismatch for {value}");
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        // 300 = 0b10_0101100: low group first
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        assert_eq!(encode(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = vec![0xFF];
        let written = encode_into(16384, &mut buf);
        assert_eq!(written, 3);
        assert_eq!(buf, vec![0xFF, 0x80, 0x80, 0x01]);
    }

    #[test]
    fn test_encode_signed() {
        assert_eq!(encode_signed(128).unwrap(), vec![0x80, 0x01]);
        assert_eq!(encode_signed(-1), Err(Error::negative_varint(-1)));
        assert!(encode_signed(i64::MIN).is_err());
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode(&[]), Err(Error::truncated_varint(0)));
    }

    #[test]
    fn test_decode_unterminated() {
        assert_eq!(
            decode(&[0x80, 0x80, 0x80]),
            Err(Error::truncated_varint(3))
        );
    }

    #[test]
    fn test_decode_prefix_reports_consumed() {
        let mut buf = encode(300);
        buf.extend(encode(5));
        let (first, used) = decode_prefix(&buf).unwrap();
        assert_eq!((first, used), (300, 2));
        assert_eq!(decode(&buf[used..]).unwrap(), 5);
    }

    #[test]
    fn test_decode_overflow() {
        // Eleven groups of ones cannot fit in 64 bits.
        let mut bytes = vec![0xFF; 10];
        bytes.push(0x01);
        assert_eq!(decode(&bytes), Err(Error::VarintOverflow));

        // Tenth byte may only carry the top bit.
        let mut bytes = vec![0xFF; 9];
        bytes.push(0x02);
        assert_eq!(decode(&bytes), Err(Error::VarintOverflow));
    }

    #[test]
    fn test_decode_zero_padding_accepted() {
        // Non-canonical zero groups still decode.
        assert_eq!(decode(&[0x81, 0x80, 0x00]).unwrap(), 1);
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        #[test]
        fn prop_roundtrip(value in any::<u64>()) {
            let bytes = encode(value);
            prop_assert_eq!(bytes.len(), encoded_len(value));
            prop_assert_eq!(decode_prefix(&bytes)?, (value, bytes.len()));
        }

        #[test]
        fn prop_proper_prefix_is_truncated(value in 128u64..) {
            let bytes = encode(value);
            for cut in 0..bytes.len() {
                prop_assert!(
                    matches!(decode(&bytes[..cut]), Err(Error::TruncatedVarint { .. })),
                    "prefix of length {} should be truncated",
                    cut
                );
            }
        }
    }
}
