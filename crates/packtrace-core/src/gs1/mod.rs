//! GS1-style identifier codecs.
//!
//! - [`codec`]: product identifier (GTIN) check digits and the printed
//!   barcode payload.
//! - [`sscc`]: 18-digit shipping container identifiers.
//!
//! Everything here is pure apart from the counter inside
//! [`sscc::SsccGenerator`].

pub mod codec;
pub mod sscc;

use thiserror::Error;

pub use codec::{
    compose_barcode, gtin_check_digit, has_required_tags, validate_gtin, AI_EXPIRY, AI_GTIN,
    AI_LOT, AI_SERIAL,
};
pub use sscc::{
    normalize_prefix, serial_of, sscc_check_digit, validate_sscc, SerialRange, SsccGenerator,
    SERIAL_MAX,
};

/// Errors raised by the identifier codecs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input contains something other than ASCII digits
    #[error("identifier must be numeric: {value}")]
    NotNumeric { value: String },

    /// Input has more digits than the codec accepts
    #[error("identifier too long: {actual} digits (max {max})")]
    TooLong { max: usize, actual: usize },

    /// Counter does not fit in the serial reference field
    #[error("serial reference {value} exceeds {max}")]
    SerialOverflow { value: u64, max: u64 },
}

impl From<CodecError> for crate::Error {
    fn from(err: CodecError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Parses an all-digit string into digit values.
pub(crate) fn digits(value: &str) -> Result<Vec<u32>, CodecError> {
    value
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CodecError::NotNumeric {
            value: value.to_string(),
        })
}

/// `(10 - sum mod 10) mod 10`, shared by both check digit schemes.
pub(crate) const fn mod10_complement(sum: u32) -> u8 {
    ((10 - (sum % 10)) % 10) as u8
}
