//! Serialized unit lifecycle (pure domain logic, no IO).
//!
//! # State Machine
//!
//! ```text
//! generated --print--> printed --verify--> verified
//!                         |                   ^
//!                         +--reject--> rejected --retry (manual)
//!
//! any unassigned unit --aggregate--> aggregated
//! any --reset--> generated
//! ```
//!
//! Print, verify, reject and retry are driven by the device simulators.
//! Aggregate and reset belong to the aggregation engine only; aggregate is
//! guarded by container assignment rather than by status.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ContainerId, RunId, UnitId};
use crate::Error;

/// Lifecycle status of a serialized unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Barcode composed, nothing printed yet.
    Generated,
    /// Label printed, awaiting optical verification.
    Printed,
    /// Label read back and matched.
    Verified,
    /// Label failed verification.
    Rejected,
    /// Packed into a box.
    Aggregated,
}

/// Transition triggers for [`UnitStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitAction {
    Print,
    Verify,
    Reject,
    RetryVerify,
    Aggregate,
    Reset,
}

impl UnitAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Verify => "verify",
            Self::Reject => "reject",
            Self::RetryVerify => "retry verification of",
            Self::Aggregate => "aggregate",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for UnitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for disallowed unit transitions.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot {action} a unit in status {from}")]
pub struct TransitionError {
    pub from: UnitStatus,
    pub action: UnitAction,
}

impl UnitStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Printed => "printed",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Aggregated => "aggregated",
        }
    }

    /// Returns the status reached by applying `action`, or the reason it is
    /// not allowed from `self`.
    pub const fn apply(self, action: UnitAction) -> Result<Self, TransitionError> {
        let next = match (self, action) {
            (Self::Generated, UnitAction::Print) => Self::Printed,
            (Self::Printed, UnitAction::Verify) | (Self::Rejected, UnitAction::RetryVerify) => {
                Self::Verified
            }
            (Self::Printed, UnitAction::Reject) => Self::Rejected,
            (Self::Aggregated, UnitAction::Aggregate) => {
                return Err(TransitionError { from: self, action })
            }
            (_, UnitAction::Aggregate) => Self::Aggregated,
            (_, UnitAction::Reset) => Self::Generated,
            _ => return Err(TransitionError { from: self, action }),
        };
        Ok(next)
    }

    /// Returns true if `action` is allowed from this status.
    #[must_use]
    pub const fn allows(self, action: UnitAction) -> bool {
        self.apply(action).is_ok()
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Generated,
            Self::Printed,
            Self::Verified,
            Self::Rejected,
            Self::Aggregated,
        ]
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "printed" => Ok(Self::Printed),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            "aggregated" => Ok(Self::Aggregated),
            _ => Err(Error::Parse(format!("Invalid unit status: {s}"))),
        }
    }
}

impl TryFrom<String> for UnitStatus {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s)
    }
}

/// One physical item of a production run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedUnit {
    pub id: UnitId,
    pub run_id: RunId,
    /// Zero-padded, globally unique sequence number.
    pub sequence: String,
    /// Printed barcode payload.
    pub barcode: String,
    pub status: UnitStatus,
    /// Owning box, if aggregated.
    pub container_id: Option<ContainerId>,
}

impl SerializedUnit {
    pub const fn is_assigned(&self) -> bool {
        self.container_id.is_some()
    }

    /// Sort key giving numeric order of zero-padded sequence numbers, even
    /// across padding widths.
    pub fn sequence_key(&self) -> (usize, &str) {
        let digits = self.sequence.trim_start_matches('0');
        (digits.len(), digits)
    }

    /// Sequence number as an integer, independent of its padding.
    pub fn serial_number(&self) -> Result<u64, Error> {
        self.sequence
            .parse()
            .map_err(|_| Error::validation(format!("sequence '{}' is not numeric", self.sequence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Device transitions ---

    #[test]
    fn test_generated_to_printed_is_valid() {
        assert_eq!(
            UnitStatus::Generated.apply(UnitAction::Print),
            Ok(UnitStatus::Printed)
        );
    }

    #[test]
    fn test_printed_to_verified_or_rejected() {
        assert_eq!(
            UnitStatus::Printed.apply(UnitAction::Verify),
            Ok(UnitStatus::Verified)
        );
        assert_eq!(
            UnitStatus::Printed.apply(UnitAction::Reject),
            Ok(UnitStatus::Rejected)
        );
    }

    #[test]
    fn test_rejected_retry_is_valid() {
        assert_eq!(
            UnitStatus::Rejected.apply(UnitAction::RetryVerify),
            Ok(UnitStatus::Verified)
        );
    }

    // --- Guards ---

    #[test]
    fn test_print_only_from_generated() {
        for status in UnitStatus::all() {
            assert_eq!(
                status.allows(UnitAction::Print),
                *status == UnitStatus::Generated,
                "print from {status}"
            );
        }
    }

    #[test]
    fn test_verify_only_from_printed() {
        for status in UnitStatus::all() {
            assert_eq!(
                status.allows(UnitAction::Verify),
                *status == UnitStatus::Printed,
                "verify from {status}"
            );
        }
    }

    #[test]
    fn test_retry_only_from_rejected() {
        for status in UnitStatus::all() {
            assert_eq!(
                status.allows(UnitAction::RetryVerify),
                *status == UnitStatus::Rejected,
                "retry from {status}"
            );
        }
    }

    #[test]
    fn test_printed_cannot_be_printed_again() {
        let err = UnitStatus::Printed.apply(UnitAction::Print);
        assert_eq!(
            err,
            Err(TransitionError {
                from: UnitStatus::Printed,
                action: UnitAction::Print
            })
        );
        assert!(err
            .err()
            .is_some_and(|e| e.to_string() == "cannot print a unit in status printed"));
    }

    // --- Engine transitions ---

    #[test]
    fn test_reset_from_every_status() {
        for status in UnitStatus::all() {
            assert_eq!(status.apply(UnitAction::Reset), Ok(UnitStatus::Generated));
        }
    }

    #[test]
    fn test_aggregate_from_any_but_aggregated() {
        for status in UnitStatus::all() {
            assert_eq!(
                status.allows(UnitAction::Aggregate),
                *status != UnitStatus::Aggregated
            );
        }
    }

    #[test]
    fn test_status_string_roundtrip() -> crate::Result<()> {
        for status in UnitStatus::all() {
            assert_eq!(status.as_str().parse::<UnitStatus>()?, *status);
        }
        assert!("shipped".parse::<UnitStatus>().is_err());
        Ok(())
    }

    // --- Sequence numbers ---

    fn unit_with_sequence(sequence: &str) -> SerializedUnit {
        SerializedUnit {
            id: UnitId::new(),
            run_id: RunId::new(),
            sequence: sequence.to_string(),
            barcode: String::new(),
            status: UnitStatus::Generated,
            container_id: None,
        }
    }

    #[test]
    fn test_serial_number_ignores_padding() {
        assert_eq!(unit_with_sequence("0000000001").serial_number(), Ok(1));
        assert_eq!(unit_with_sequence("000000000001").serial_number(), Ok(1));
        assert!(unit_with_sequence("12a").serial_number().is_err());
    }

    #[test]
    fn test_sequence_key_is_numeric_across_widths() {
        let wide = unit_with_sequence("000000000001");
        let narrow = unit_with_sequence("0000000002");
        assert!(wide.sequence_key() < narrow.sequence_key());
    }
}
