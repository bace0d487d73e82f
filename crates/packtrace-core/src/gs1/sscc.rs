//! Shipping container identifiers (SSCC-like).
//!
//! ```text
//! 0 | ppppppp | nnnnnnnnn | c
//! ^   prefix    counter     check digit
//! extension digit
//! ```
//!
//! Boxes and pallets of a run draw their counters from disjoint
//! [`SerialRange`]s, so an identifier minted for a box can never equal one
//! minted for a pallet of the same prefix.

use std::sync::{Mutex, PoisonError};

use super::{digits, mod10_complement, CodecError};

const EXTENSION_DIGIT: char = '0';
const PREFIX_LEN: usize = 7;
const SERIAL_LEN: usize = 9;
const SSCC_LEN: usize = 18;

/// Largest counter that fits the 9-digit serial reference.
pub const SERIAL_MAX: u64 = 999_999_999;

/// Inclusive range of counter values reserved for one container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialRange {
    start: u64,
    end: u64,
}

impl SerialRange {
    /// Box counters: `1 ..= pallet_base - 1`.
    pub const fn boxes(pallet_base: u64) -> Self {
        Self {
            start: 1,
            end: pallet_base.saturating_sub(1),
        }
    }

    /// Pallet counters: `pallet_base ..= SERIAL_MAX`.
    pub const fn pallets(pallet_base: u64) -> Self {
        Self {
            start: pallet_base,
            end: SERIAL_MAX,
        }
    }

    pub const fn start(&self) -> u64 {
        self.start
    }

    pub const fn end(&self) -> u64 {
        self.end
    }

    pub const fn contains(&self, value: u64) -> bool {
        value >= self.start && value <= self.end
    }

    /// Counter value `offset` places into the range.
    pub fn nth(&self, offset: u64) -> Result<u64, CodecError> {
        self.start
            .checked_add(offset)
            .filter(|value| *value <= self.end)
            .ok_or(CodecError::SerialOverflow {
                value: self.start.saturating_add(offset),
                max: self.end,
            })
    }
}

/// Sequential shipping identifier generator for one prefix and range.
///
/// The counter is guarded by a mutex so concurrent callers never mint the
/// same value twice.
#[derive(Debug)]
pub struct SsccGenerator {
    prefix: String,
    range: SerialRange,
    counter: Mutex<u64>,
}

impl SsccGenerator {
    /// Creates a generator whose first identifier uses `range.nth(start_offset)`.
    pub fn new(company_prefix: &str, range: SerialRange, start_offset: u64) -> Result<Self, CodecError> {
        let prefix = normalize_prefix(company_prefix)?;
        let first = range.nth(start_offset)?;
        Ok(Self {
            prefix,
            range,
            counter: Mutex::new(first),
        })
    }

    /// Creates a generator whose first identifier uses counter `first`.
    pub fn starting_at(company_prefix: &str, range: SerialRange, first: u64) -> Result<Self, CodecError> {
        let offset = first.checked_sub(range.start()).ok_or(CodecError::SerialOverflow {
            value: first,
            max: range.end(),
        })?;
        Self::new(company_prefix, range, offset)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mints the identifier for the current counter, then increments it.
    pub fn next(&self) -> Result<String, CodecError> {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.range.contains(*counter) {
            return Err(CodecError::SerialOverflow {
                value: *counter,
                max: self.range.end(),
            });
        }
        let code = self.at(*counter)?;
        *counter += 1;
        Ok(code)
    }

    /// Composes the identifier for an explicit counter value without touching
    /// the internal counter.
    pub fn at(&self, serial: u64) -> Result<String, CodecError> {
        if serial > SERIAL_MAX {
            return Err(CodecError::SerialOverflow {
                value: serial,
                max: SERIAL_MAX,
            });
        }
        let body = format!(
            "{EXTENSION_DIGIT}{}{serial:0>width$}",
            self.prefix,
            width = SERIAL_LEN
        );
        let check = sscc_check_digit(&body)?;
        Ok(format!("{body}{check}"))
    }
}

/// Validates a company prefix and left-pads it to 7 digits.
pub fn normalize_prefix(company_prefix: &str) -> Result<String, CodecError> {
    digits(company_prefix)?;
    if company_prefix.len() > PREFIX_LEN {
        return Err(CodecError::TooLong {
            max: PREFIX_LEN,
            actual: company_prefix.len(),
        });
    }
    Ok(format!("{company_prefix:0>width$}", width = PREFIX_LEN))
}

/// Counter value embedded in an identifier minted under `prefix`, if it is one.
pub fn serial_of(code: &str, prefix: &str) -> Option<u64> {
    if code.len() != SSCC_LEN || code.get(1..=PREFIX_LEN) != Some(prefix) {
        return None;
    }
    code.get(PREFIX_LEN + 1..PREFIX_LEN + 1 + SERIAL_LEN)?.parse().ok()
}

/// Check digit weighted from the right: the digit at 0-based position `i`
/// counts once when `len - i` is even and three times otherwise.
pub fn sscc_check_digit(body: &str) -> Result<u8, CodecError> {
    let values = digits(body)?;
    let len = values.len();
    let sum = values
        .iter()
        .enumerate()
        .map(|(i, d)| if (len - i) % 2 == 0 { *d } else { d * 3 })
        .sum();
    Ok(mod10_complement(sum))
}

/// True for exactly 18 digits whose last digit matches the recomputed check.
pub fn validate_sscc(code: &str) -> bool {
    if code.len() != SSCC_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (body, check) = code.split_at(SSCC_LEN - 1);
    sscc_check_digit(body)
        .map(|expected| check == expected.to_string())
        .unwrap_or(false)
}
