//! Hex encoding helpers shared by the block and transaction builders.

use crate::error::TransformError;

/// Number of base units in one whole coin (8 decimal places).
pub const COIN: f64 = 100_000_000.0;

pub fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Lower-cases and prefixes a hex string with exactly one `0x`.
pub fn add_hex_prefix(s: &str) -> String {
    format!("0x{}", strip_hex_prefix(s).to_ascii_lowercase())
}

/// Minimal big-endian hex, `0x0` for zero.
pub fn encode_u64(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Block nonces are always 8 bytes wide on the Ethereum side.
pub fn format_nonce(nonce: u64) -> String {
    format!("0x{:016x}", nonce)
}

/// Converts a native fixed-point amount into integer base units.
pub fn amount_to_base_units(amount: f64) -> Result<u64, TransformError> {
    if !amount.is_finite() {
        return Err(TransformError::Format(format!(
            "amount {} is not a finite number",
            amount
        )));
    }
    if amount < 0.0 {
        return Err(TransformError::Format(format!(
            "amount {} is negative",
            amount
        )));
    }

    let units = (amount * COIN).round();
    if units >= u64::MAX as f64 {
        return Err(TransformError::Format(format!(
            "amount {} overflows base units",
            amount
        )));
    }
    Ok(units as u64)
}

/// Difficulty is reported as a float; Ethereum wants an integer quantity.
pub fn format_difficulty(difficulty: f64) -> Result<String, TransformError> {
    if !difficulty.is_finite() || difficulty < 0.0 || difficulty >= u64::MAX as f64 {
        return Err(TransformError::Format(format!(
            "difficulty {} cannot be encoded as a quantity",
            difficulty
        )));
    }
    Ok(encode_u64(difficulty.trunc() as u64))
}

/// Parses a `0x`-prefixed hex quantity such as a block number.
pub fn parse_quantity(s: &str) -> Result<u64, TransformError> {
    let digits = strip_hex_prefix(s);
    if digits.is_empty() {
        return Err(TransformError::InvalidParams(format!(
            "empty hex quantity: {:?}",
            s
        )));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| TransformError::InvalidParams(format!("invalid hex quantity {:?}: {}", s, e)))
}

/// Validates a 32-byte hash (prefix optional) and returns it unprefixed, lower-case.
pub fn normalize_hash(s: &str) -> Result<String, TransformError> {
    let digits = strip_hex_prefix(s);
    let bytes = hex::decode(digits)
        .map_err(|e| TransformError::InvalidParams(format!("invalid hash {:?}: {}", s, e)))?;
    if bytes.len() != 32 {
        return Err(TransformError::InvalidParams(format!(
            "invalid hash length: expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_always_sixteen_digits() {
        for nonce in [0u64, 1, 0xabc, 0xdead_beef, u32::MAX as u64, u64::MAX] {
            let formatted = format_nonce(nonce);
            assert_eq!(formatted.len(), 18, "{}", formatted);
            assert!(formatted.starts_with("0x"));
            assert!(formatted[2..].chars().all(|c| c.is_ascii_hexdigit()));
        }
        assert_eq!(format_nonce(0x2a), "0x000000000000002a");
        assert_eq!(format_nonce(u64::MAX), "0xffffffffffffffff");
    }

    #[test]
    fn prefix_is_never_doubled() {
        assert_eq!(add_hex_prefix("ABCD"), "0xabcd");
        assert_eq!(add_hex_prefix("0xABCD"), "0xabcd");
        assert_eq!(add_hex_prefix("0XabCD"), "0xabcd");
        assert_eq!(add_hex_prefix(""), "0x");
    }

    #[test]
    fn minimal_encoding() {
        assert_eq!(encode_u64(0), "0x0");
        assert_eq!(encode_u64(255), "0xff");
        assert_eq!(encode_u64(4096), "0x1000");
    }

    #[test]
    fn amounts_convert_to_base_units() {
        assert_eq!(amount_to_base_units(1.0).unwrap(), 100_000_000);
        assert_eq!(amount_to_base_units(0.1).unwrap(), 10_000_000);
        assert_eq!(amount_to_base_units(0.00000001).unwrap(), 1);
        assert_eq!(amount_to_base_units(0.5).map(encode_u64).unwrap(), "0x2faf080");
        assert_eq!(amount_to_base_units(0.0).unwrap(), 0);
    }

    #[test]
    fn bad_amounts_are_rejected() {
        assert!(matches!(
            amount_to_base_units(f64::NAN),
            Err(TransformError::Format(_))
        ));
        assert!(matches!(
            amount_to_base_units(f64::INFINITY),
            Err(TransformError::Format(_))
        ));
        assert!(matches!(
            amount_to_base_units(-1.0),
            Err(TransformError::Format(_))
        ));
        assert!(matches!(
            amount_to_base_units(1e12),
            Err(TransformError::Format(_))
        ));
    }

    #[test]
    fn difficulty_is_truncated() {
        assert_eq!(format_difficulty(4.656542373906925e-10).unwrap(), "0x0");
        assert_eq!(format_difficulty(1234.99).unwrap(), "0x4d2");
        assert!(format_difficulty(f64::NAN).is_err());
    }

    #[test]
    fn quantities_and_hashes() {
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());

        let hash = format!("0x{}", "AB".repeat(32));
        assert_eq!(normalize_hash(&hash).unwrap(), "ab".repeat(32));
        assert!(normalize_hash("0xabcd").is_err());
    }
}
