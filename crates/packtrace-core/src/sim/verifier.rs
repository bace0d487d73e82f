//! Optical verifier (camera) simulator.
//!
//! A payload without the product and serial tags is rejected before the
//! success roll is drawn. A failed roll models a misread: the returned scan
//! differs from the expected payload in one character.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BatchReport, DeviceOutcome, DeviceReport, SimRng};
use crate::{
    config::DeviceProfile,
    domain::{RunId, SerializedUnit, UnitAction, UnitId, UnitStatus},
    gs1,
    store::{TrackStore, UnitQuery},
    Error, Result,
};

const MISREAD_SENTINEL: char = '?';
const MISREAD_MIN_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub unit_id: UnitId,
    pub sequence: String,
    pub outcome: DeviceOutcome,
    /// Unit status after the call.
    pub status: UnitStatus,
    pub expected: String,
    /// What the camera read; absent when nothing was scanned.
    pub scanned: Option<String>,
    pub message: String,
    pub latency_ms: u64,
}

impl DeviceReport for VerifyResult {
    fn outcome(&self) -> DeviceOutcome {
        self.outcome
    }
}

pub struct Verifier {
    store: Arc<dyn TrackStore>,
    rng: Arc<SimRng>,
    profile: DeviceProfile,
}

impl Verifier {
    pub fn new(store: Arc<dyn TrackStore>, rng: Arc<SimRng>, profile: DeviceProfile) -> Self {
        Self {
            store,
            rng,
            profile,
        }
    }

    pub async fn verify(&self, unit_id: UnitId) -> Result<VerifyResult> {
        let unit = self.store.get_unit(unit_id).await?;
        self.verify_unit(unit).await
    }

    /// Verifies a run's `printed` units in ascending sequence order.
    pub async fn verify_batch(&self, run_id: RunId) -> Result<BatchReport<VerifyResult>> {
        self.store.get_run(run_id).await?;
        let units = self
            .store
            .list_units(run_id, UnitQuery::with_status(UnitStatus::Printed))
            .await?;
        info!(run_id = %run_id, count = units.len(), "Batch verify started");

        let mut details = Vec::with_capacity(units.len());
        for unit in units {
            details.push(self.verify_unit(unit).await?);
        }

        let report = BatchReport::tally(run_id, details);
        info!(
            run_id = %run_id,
            verified = report.succeeded,
            rejected = report.failed,
            "Batch verify finished"
        );
        Ok(report)
    }

    /// Manual override of a rejected unit. Always succeeds from `rejected`.
    pub async fn retry(&self, unit_id: UnitId) -> Result<VerifyResult> {
        let unit = self.store.get_unit(unit_id).await?;
        if unit.status != UnitStatus::Rejected {
            let current = unit.status;
            return Ok(mismatch(unit, current, 0, "only rejected units can be retried"));
        }

        match self
            .store
            .transition_unit(unit.id, UnitStatus::Rejected, UnitAction::RetryVerify)
            .await
        {
            Ok(verified) => {
                info!(unit_id = %verified.id, sequence = %verified.sequence, "Rejected unit manually verified");
                Ok(VerifyResult {
                    unit_id: verified.id,
                    sequence: verified.sequence,
                    outcome: DeviceOutcome::Completed,
                    status: verified.status,
                    scanned: Some(verified.barcode.clone()),
                    expected: verified.barcode,
                    message: "manually verified".to_string(),
                    latency_ms: 0,
                })
            }
            Err(Error::InvalidState { current, .. }) => {
                Ok(mismatch(unit, current, 0, "only rejected units can be retried"))
            }
            Err(e) => Err(e),
        }
    }

    async fn verify_unit(&self, unit: SerializedUnit) -> Result<VerifyResult> {
        if unit.status != UnitStatus::Printed {
            let current = unit.status;
            return Ok(mismatch(unit, current, 0, "unit cannot be verified"));
        }

        let latency = self.rng.latency(&self.profile).await;
        tokio::time::sleep(latency).await;
        let latency_ms = latency.as_millis() as u64;

        let (action, scanned, message) = if !gs1::has_required_tags(&unit.barcode) {
            warn!(unit_id = %unit.id, barcode = %unit.barcode, "Barcode format rejected");
            (UnitAction::Reject, unit.barcode.clone(), "barcode format invalid")
        } else if self.rng.roll(self.profile.success_probability).await {
            (UnitAction::Verify, unit.barcode.clone(), "verified")
        } else {
            warn!(unit_id = %unit.id, sequence = %unit.sequence, "Simulated misread");
            let misread = self.misread(&unit.barcode).await;
            (UnitAction::Reject, misread, "barcode unreadable (simulated)")
        };

        match self
            .store
            .transition_unit(unit.id, UnitStatus::Printed, action)
            .await
        {
            Ok(updated) => {
                debug!(unit_id = %updated.id, status = %updated.status, latency_ms, "Unit verified");
                let outcome = if action == UnitAction::Verify {
                    DeviceOutcome::Completed
                } else {
                    DeviceOutcome::DeviceFault
                };
                Ok(VerifyResult {
                    unit_id: updated.id,
                    sequence: updated.sequence,
                    outcome,
                    status: updated.status,
                    expected: updated.barcode,
                    scanned: Some(scanned),
                    message: message.to_string(),
                    latency_ms,
                })
            }
            Err(Error::InvalidState { current, .. }) => {
                Ok(mismatch(unit, current, latency_ms, "unit cannot be verified"))
            }
            Err(e) => Err(e),
        }
    }

    /// One random readable character replaced by the sentinel; short payloads
    /// read as all sentinels. The result always differs from `payload`.
    async fn misread(&self, payload: &str) -> String {
        let mut chars: Vec<char> = payload.chars().collect();
        if chars.len() < MISREAD_MIN_LEN {
            let unreadable = MISREAD_SENTINEL.to_string().repeat(3);
            return if payload == unreadable {
                String::new()
            } else {
                unreadable
            };
        }

        let readable: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != MISREAD_SENTINEL)
            .map(|(i, _)| i)
            .collect();
        if readable.is_empty() {
            // Nothing left to blank out; drop the last character instead.
            chars.pop();
            return chars.into_iter().collect();
        }

        let pos = readable[self.rng.index(readable.len()).await];
        chars[pos] = MISREAD_SENTINEL;
        chars.into_iter().collect()
    }
}

fn mismatch(
    unit: SerializedUnit,
    current: UnitStatus,
    latency_ms: u64,
    reason: &str,
) -> VerifyResult {
    VerifyResult {
        unit_id: unit.id,
        sequence: unit.sequence,
        outcome: DeviceOutcome::StateMismatch { current },
        status: current,
        expected: unit.barcode,
        scanned: None,
        message: format!("{reason}; current status {current}"),
        latency_ms,
    }
}
