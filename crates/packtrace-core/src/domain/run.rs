//! Production runs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::{PackingContainer, ProductId, RunId, SerializedUnit};
use crate::{Error, Result};

/// Default number of units per box.
pub const DEFAULT_BOX_CAPACITY: u32 = 10;
/// Default number of boxes per pallet.
pub const DEFAULT_PALLET_CAPACITY: u32 = 10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Created,
    InProgress,
    Completed,
    Cancelled,
}

/// One manufacturing batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRun {
    pub id: RunId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub lot: String,
    pub expiry: NaiveDate,
    pub start_sequence: u64,
    pub box_capacity: u32,
    pub pallet_capacity: u32,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRun {
    pub product_id: ProductId,
    pub quantity: u32,
    pub lot: String,
    pub expiry: NaiveDate,
    #[serde(default = "default_start_sequence")]
    pub start_sequence: u64,
    #[serde(default = "default_box_capacity")]
    pub box_capacity: u32,
    #[serde(default = "default_pallet_capacity")]
    pub pallet_capacity: u32,
}

const fn default_start_sequence() -> u64 {
    1
}

const fn default_box_capacity() -> u32 {
    DEFAULT_BOX_CAPACITY
}

const fn default_pallet_capacity() -> u32 {
    DEFAULT_PALLET_CAPACITY
}

impl CreateRun {
    pub fn new(product_id: ProductId, quantity: u32, lot: impl Into<String>, expiry: NaiveDate) -> Self {
        Self {
            product_id,
            quantity,
            lot: lot.into(),
            expiry,
            start_sequence: default_start_sequence(),
            box_capacity: DEFAULT_BOX_CAPACITY,
            pallet_capacity: DEFAULT_PALLET_CAPACITY,
        }
    }

    pub const fn with_start_sequence(mut self, start: u64) -> Self {
        self.start_sequence = start;
        self
    }

    pub const fn with_capacities(mut self, box_capacity: u32, pallet_capacity: u32) -> Self {
        self.box_capacity = box_capacity;
        self.pallet_capacity = pallet_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(Error::validation("quantity must be greater than zero"));
        }
        if self.box_capacity == 0 || self.pallet_capacity == 0 {
            return Err(Error::validation("box and pallet capacity must be greater than zero"));
        }
        if self.lot.trim().is_empty() {
            return Err(Error::validation("lot cannot be empty"));
        }
        if self
            .start_sequence
            .checked_add(u64::from(self.quantity))
            .is_none()
        {
            return Err(Error::validation("sequence range overflows"));
        }
        Ok(())
    }

    /// Zero-padded sequence number of the `index`-th unit.
    pub fn sequence(&self, index: u32, width: usize) -> String {
        let value = self.start_sequence + u64::from(index);
        format!("{value:0>width$}")
    }
}

/// A run together with everything it owns, as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run: ProductionRun,
    /// Ordered by ascending sequence number.
    pub units: Vec<SerializedUnit>,
    pub containers: Vec<PackingContainer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CreateRun {
        CreateRun::new(
            ProductId::new(),
            25,
            "LOT-1",
            NaiveDate::from_ymd_opt(2028, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let p = params();
        assert_eq!(p.start_sequence, 1);
        assert_eq!(p.box_capacity, 10);
        assert_eq!(p.pallet_capacity, 10);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_sequence_padding() {
        let p = params().with_start_sequence(990);
        assert_eq!(p.sequence(0, 10), "0000000990");
        assert_eq!(p.sequence(15, 10), "0000001005");
        assert_eq!(p.sequence(0, 2), "990");
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut p = params();
        p.quantity = 0;
        assert!(matches!(p.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        assert!(params().with_capacities(0, 2).validate().is_err());
        assert!(params().with_capacities(10, 0).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_lot() {
        let mut p = params();
        p.lot = "  ".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_range() {
        assert!(params().with_start_sequence(u64::MAX).validate().is_err());
    }

    #[test]
    fn test_run_status_strings() {
        assert_eq!(RunStatus::InProgress.to_string(), "in_progress");
        assert_eq!("completed".parse::<RunStatus>().ok(), Some(RunStatus::Completed));
    }
}
