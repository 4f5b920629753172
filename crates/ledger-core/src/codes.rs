//! # Business Identifiers
//!
//! Formatting of human-readable codes. Randomness and uniqueness checks live
//! in the database layer; these functions only format.
//!
//! ```text
//!  receipt    T{tenant}S{store letter}{year}-{seq:04}   T7SM2024-0042
//!  warehouse  WH-{n:03}                                  WH-001
//!  sku        {CAT}-{HEX6}                               ELE-3FA9C1
//!  barcode    EAN-13 (12 digits + check digit)           200123456789X
//! ```

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// First alphanumeric character of a store code, upper-cased.
pub fn store_letter(store_code: &str) -> ValidationResult<char> {
    store_code
        .chars()
        .find(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "store code".to_string(),
            reason: "must contain a letter or digit".to_string(),
        })
}

/// Formats a receipt number.
///
/// ## Example
/// ```rust
/// use ledger_core::codes::receipt_number;
///
/// assert_eq!(receipt_number(7, "main", 2024, 42).unwrap(), "T7SM2024-0042");
/// ```
pub fn receipt_number(
    tenant_id: i64,
    store_code: &str,
    year: i32,
    sequence: i64,
) -> ValidationResult<String> {
    let letter = store_letter(store_code)?;
    Ok(format!("T{}S{}{}-{:04}", tenant_id, letter, year, sequence))
}

/// Formats the `n`th warehouse code of a tenant.
///
/// ## Example
/// ```rust
/// use ledger_core::codes::warehouse_code;
///
/// assert_eq!(warehouse_code(1), "WH-001");
/// assert_eq!(warehouse_code(120), "WH-120");
/// ```
pub fn warehouse_code(n: i64) -> String {
    format!("WH-{:03}", n)
}

/// Parses the sequence number back out of a warehouse code.
pub fn parse_warehouse_code(code: &str) -> Option<i64> {
    code.strip_prefix("WH-")?.parse().ok()
}

/// Formats a SKU from a category and a random token.
///
/// The prefix is the first three alphanumeric characters of the category,
/// upper-cased, padded with `X`. The suffix is the first six hex digits of
/// the token, upper-cased.
pub fn sku(category: &str, token: &str) -> String {
    let mut prefix: String = category
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < 3 {
        prefix.push('X');
    }
    let suffix: String = token
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(6)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    format!("{}-{}", prefix, suffix)
}

/// EAN-13 check digit for a 12-digit body.
pub fn ean13_check_digit(body: &[u8; 12]) -> u8 {
    let sum: u32 = body
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let weight = if i % 2 == 0 { 1 } else { 3 };
            *d as u32 * weight
        })
        .sum();
    ((10 - (sum % 10)) % 10) as u8
}

/// Formats an EAN-13 barcode from a numeric seed.
///
/// The body is `200` (in-store range) followed by the last nine digits of
/// the seed, then the check digit.
///
/// ## Example
/// ```rust
/// use ledger_core::codes::ean13;
///
/// let code = ean13(123456789);
/// assert_eq!(code.len(), 13);
/// assert!(code.starts_with("200123456789"));
/// ```
pub fn ean13(seed: u64) -> String {
    let mut body = [0u8; 12];
    body[0] = 2;
    let mut rest = seed % 1_000_000_000;
    for slot in body[3..].iter_mut().rev() {
        *slot = (rest % 10) as u8;
        rest /= 10;
    }
    let check = ean13_check_digit(&body);
    let mut code: String = body.iter().map(|d| char::from(b'0' + d)).collect();
    code.push(char::from(b'0' + check));
    code
}

/// Whether a 13-digit string carries a valid EAN-13 check digit.
pub fn is_valid_ean13(code: &str) -> bool {
    let digits: Vec<u8> = code
        .chars()
        .filter_map(|c| c.to_digit(10).map(|d| d as u8))
        .collect();
    if code.len() != 13 || digits.len() != 13 {
        return false;
    }
    let mut body = [0u8; 12];
    body.copy_from_slice(&digits[..12]);
    ean13_check_digit(&body) == digits[12]
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_number_format() {
        assert_eq!(receipt_number(3, "downtown", 2025, 1).unwrap(), "T3SD2025-0001");
        assert_eq!(receipt_number(3, "-b2", 2025, 12345).unwrap(), "T3SB2025-12345");
        assert!(receipt_number(3, "--", 2025, 1).is_err());
    }

    #[test]
    fn test_warehouse_code_round_trip() {
        assert_eq!(warehouse_code(7), "WH-007");
        assert_eq!(parse_warehouse_code("WH-007"), Some(7));
        assert_eq!(parse_warehouse_code("XX-1"), None);
    }

    #[test]
    fn test_sku_format() {
        assert_eq!(sku("Electronics", "3fa9c1d2-0000"), "ELE-3FA9C1");
        assert_eq!(sku("Tv", "abcdef99"), "TVX-ABCDEF");
    }

    #[test]
    fn test_ean13_known_value() {
        // 400638133393 → check digit 1
        let body = [4, 0, 0, 6, 3, 8, 1, 3, 3, 3, 9, 3];
        assert_eq!(ean13_check_digit(&body), 1);
        assert!(is_valid_ean13("4006381333931"));
        assert!(!is_valid_ean13("4006381333932"));
    }

    #[test]
    fn test_generated_ean13_is_valid() {
        for seed in [0u64, 1, 987654321, 1_234_567_890_123] {
            assert!(is_valid_ean13(&ean13(seed)));
        }
    }
}
