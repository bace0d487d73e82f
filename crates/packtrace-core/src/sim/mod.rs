//! Device simulators: printer, verifier (camera) and line controller.
//!
//! Each simulator couples a randomized outcome model to unit lifecycle
//! transitions. Simulated failures and lifecycle mismatches are values
//! ([`DeviceOutcome`]), never errors; only missing entities and storage
//! failures surface as [`crate::Error`].

pub mod line;
pub mod printer;
pub mod rng;
pub mod verifier;

use serde::{Deserialize, Serialize};

pub use line::{LineController, LineStateStore, LineStatus, ProductionStatus};
pub use printer::{PrintResult, Printer};
pub use rng::SimRng;
pub use verifier::{VerifyResult, Verifier};

use crate::domain::{RunId, UnitStatus};

/// How a single device call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// The transition was performed.
    Completed,
    /// The simulated device failed (or the payload was unreadable).
    DeviceFault,
    /// The unit was not in a status the device can act on.
    StateMismatch { current: UnitStatus },
}

impl DeviceOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Per-unit results that can be tallied into a [`BatchReport`].
pub trait DeviceReport {
    fn outcome(&self) -> DeviceOutcome;
}

/// Aggregate result of a sequential batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub run_id: RunId,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// In processing order, which is ascending sequence order.
    pub details: Vec<T>,
}

impl<T: DeviceReport> BatchReport<T> {
    pub fn tally(run_id: RunId, details: Vec<T>) -> Self {
        let succeeded = details.iter().filter(|d| d.outcome().is_success()).count();
        Self {
            run_id,
            total: details.len(),
            succeeded,
            failed: details.len() - succeeded,
            details,
        }
    }
}
