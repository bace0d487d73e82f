//! Product identifier check digits and barcode payload composition.
//!
//! Payload syntax, each element preceded by its application identifier:
//!
//! ```text
//! (01)<14-digit GTIN>(21)<serial>(17)<YYMMDD>(10)<lot>
//! ```

use chrono::NaiveDate;

use super::{digits, mod10_complement, CodecError};

pub const AI_GTIN: &str = "(01)";
pub const AI_SERIAL: &str = "(21)";
pub const AI_EXPIRY: &str = "(17)";
pub const AI_LOT: &str = "(10)";

const GTIN_LEN: usize = 14;
const GTIN_MIN_LEN: usize = 8;

/// Composes the printed barcode payload for one serialized unit.
///
/// The product id is zero-padded on the left to 14 characters; serial and lot
/// are embedded exactly as supplied.
pub fn compose_barcode(gtin: &str, serial: &str, expiry: NaiveDate, lot: &str) -> String {
    format!(
        "{AI_GTIN}{gtin:0>width$}{AI_SERIAL}{serial}{AI_EXPIRY}{}{AI_LOT}{lot}",
        expiry.format("%y%m%d"),
        width = GTIN_LEN
    )
}

/// Computes the GTIN check digit for an id without its check digit.
///
/// The input is left-padded to 13 digits; the digit at 0-based position `i`
/// is weighted 1 when `i` is even and 3 when `i` is odd.
pub fn gtin_check_digit(without_check: &str) -> Result<u8, CodecError> {
    if without_check.len() > GTIN_LEN - 1 {
        return Err(CodecError::TooLong {
            max: GTIN_LEN - 1,
            actual: without_check.len(),
        });
    }
    let padded = format!("{without_check:0>width$}", width = GTIN_LEN - 1);
    let sum = digits(&padded)?
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    Ok(mod10_complement(sum))
}

/// Validates a product identifier of 8 to 14 digits.
pub fn validate_gtin(id: &str) -> bool {
    if id.len() < GTIN_MIN_LEN || id.len() > GTIN_LEN || !id.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let padded = format!("{id:0>width$}", width = GTIN_LEN);
    let (body, check) = padded.split_at(GTIN_LEN - 1);
    gtin_check_digit(body)
        .map(|expected| check == expected.to_string())
        .unwrap_or(false)
}

/// Returns true when the payload carries both the product and serial tags.
pub fn has_required_tags(payload: &str) -> bool {
    !payload.trim().is_empty() && payload.contains(AI_GTIN) && payload.contains(AI_SERIAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compose_barcode_pads_gtin() {
        let payload = compose_barcode("12345678901231", "0000000001", date(2027, 3, 9), "LOT-A");
        assert_eq!(payload, "(01)12345678901231(21)0000000001(17)270309(10)LOT-A");
    }

    #[test]
    fn test_compose_barcode_short_gtin() {
        let payload = compose_barcode("96385074", "42", date(2030, 12, 31), "L1");
        assert_eq!(payload, "(01)00000096385074(21)42(17)301231(10)L1");
    }

    #[test]
    fn test_check_digit_eleven_digits() -> Result<(), CodecError> {
        // 0012345678901 -> 0+0+1+6+3+12+5+18+7+24+9+0+1 = 86
        assert_eq!(gtin_check_digit("12345678901")?, 4);
        assert!(validate_gtin("123456789014"));
        assert!(validate_gtin("00123456789014"));
        Ok(())
    }

    #[test]
    fn test_check_digit_rejects_letters() {
        assert!(matches!(
            gtin_check_digit("12a4"),
            Err(CodecError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_check_digit_rejects_fourteen_digits() {
        assert!(matches!(
            gtin_check_digit("12345678901234"),
            Err(CodecError::TooLong { max: 13, actual: 14 })
        ));
    }

    #[test]
    fn test_validate_gtin_length_bounds() {
        assert!(!validate_gtin("1234567"));
        assert!(!validate_gtin("123456789012345"));
        assert!(!validate_gtin(""));
    }

    #[test]
    fn test_validate_gtin_rejects_wrong_check() {
        assert!(!validate_gtin("123456789015"));
    }

    #[test]
    fn test_validate_gtin_rejects_non_numeric() {
        assert!(!validate_gtin("1234567890a4"));
        assert!(!validate_gtin("12345678901 4"));
    }

    #[test]
    fn test_required_tags() {
        assert!(has_required_tags("(01)00000096385074(21)42(17)301231(10)L1"));
        assert!(!has_required_tags("(01)00000096385074(17)301231(10)L1"));
        assert!(!has_required_tags("(21)42"));
        assert!(!has_required_tags("   "));
    }
}
