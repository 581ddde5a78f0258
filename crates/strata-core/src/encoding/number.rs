use crate::error::EncodingError;

const SIGN: u64 = 1 << 63;

/// Order-preserving 8-byte form of a number or date-millisecond value.
///
/// Negative values have every bit inverted, everything else only the sign
/// bit, so big-endian byte comparison agrees with numeric comparison.
/// `-0.0` and `0.0` share one encoding; NaN has none.
pub fn encode_number(value: f64) -> Result<[u8; 8], EncodingError> {
    if value.is_nan() {
        return Err(EncodingError::NaN);
    }
    let bits = if value == 0.0 { 0 } else { value.to_bits() };
    let flipped = if bits & SIGN == 0 { bits | SIGN } else { !bits };
    Ok(flipped.to_be_bytes())
}

/// Inverse of [`encode_number`].
pub fn decode_number(bytes: [u8; 8]) -> f64 {
    let flipped = u64::from_be_bytes(bytes);
    let bits = if flipped & SIGN == 0 { !flipped } else { flipped & !SIGN };
    f64::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_has_no_encoding() {
        assert!(matches!(encode_number(f64::NAN), Err(EncodingError::NaN)));
    }

    #[test]
    fn test_zero_signs_collapse() {
        assert_eq!(encode_number(-0.0).unwrap(), encode_number(0.0).unwrap());
        assert_eq!(decode_number(encode_number(-0.0).unwrap()).to_bits(), 0);
    }

    #[test]
    fn test_bytes_sort_like_numbers() {
        let ladder = [
            f64::NEG_INFINITY,
            f64::MIN,
            -2.5,
            -f64::MIN_POSITIVE,
            0.0,
            f64::MIN_POSITIVE,
            1.0,
            1_700_000_000_000.0,
            f64::MAX,
            f64::INFINITY,
        ];
        for pair in ladder.windows(2) {
            assert!(
                encode_number(pair[0]).unwrap() < encode_number(pair[1]).unwrap(),
                "{} should sort below {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_decode_inverts_encode() {
        for v in [10.7, -3.0, f64::EPSILON, -1e300, f64::INFINITY] {
            assert_eq!(decode_number(encode_number(v).unwrap()), v);
        }
    }
}
