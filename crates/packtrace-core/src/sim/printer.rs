//! Label printer simulator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BatchReport, DeviceOutcome, DeviceReport, SimRng};
use crate::{
    config::DeviceProfile,
    domain::{RunId, SerializedUnit, UnitAction, UnitId, UnitStatus},
    store::{TrackStore, UnitQuery},
    Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintResult {
    pub unit_id: UnitId,
    pub sequence: String,
    pub outcome: DeviceOutcome,
    /// Unit status after the call.
    pub status: UnitStatus,
    pub message: String,
    pub latency_ms: u64,
}

impl DeviceReport for PrintResult {
    fn outcome(&self) -> DeviceOutcome {
        self.outcome
    }
}

pub struct Printer {
    store: Arc<dyn TrackStore>,
    rng: Arc<SimRng>,
    profile: DeviceProfile,
}

impl Printer {
    pub fn new(store: Arc<dyn TrackStore>, rng: Arc<SimRng>, profile: DeviceProfile) -> Self {
        Self {
            store,
            rng,
            profile,
        }
    }

    /// Prints one unit. Only `generated` units are printed; anything else
    /// yields a [`DeviceOutcome::StateMismatch`] without touching the unit.
    pub async fn print(&self, unit_id: UnitId) -> Result<PrintResult> {
        let unit = self.store.get_unit(unit_id).await?;
        self.print_unit(unit).await
    }

    /// Prints a run's `generated` units in ascending sequence order.
    ///
    /// `limit` caps how many units are taken; `None` or `Some(0)` means all.
    pub async fn print_batch(
        &self,
        run_id: RunId,
        limit: Option<usize>,
    ) -> Result<BatchReport<PrintResult>> {
        self.store.get_run(run_id).await?;
        let query = UnitQuery::with_status(UnitStatus::Generated).limit(limit.filter(|n| *n > 0));
        let units = self.store.list_units(run_id, query).await?;
        info!(run_id = %run_id, count = units.len(), "Batch print started");

        let mut details = Vec::with_capacity(units.len());
        for unit in units {
            details.push(self.print_unit(unit).await?);
        }

        let report = BatchReport::tally(run_id, details);
        info!(
            run_id = %run_id,
            printed = report.succeeded,
            failed = report.failed,
            "Batch print finished"
        );
        Ok(report)
    }

    async fn print_unit(&self, unit: SerializedUnit) -> Result<PrintResult> {
        if unit.status != UnitStatus::Generated {
            return Ok(mismatch(&unit, unit.status, 0));
        }

        let latency = self.rng.latency(&self.profile).await;
        tokio::time::sleep(latency).await;
        let latency_ms = latency.as_millis() as u64;

        if !self.rng.roll(self.profile.success_probability).await {
            warn!(unit_id = %unit.id, sequence = %unit.sequence, "Simulated printer fault");
            return Ok(PrintResult {
                unit_id: unit.id,
                sequence: unit.sequence,
                outcome: DeviceOutcome::DeviceFault,
                status: unit.status,
                message: "printer fault (simulated)".to_string(),
                latency_ms,
            });
        }

        match self
            .store
            .transition_unit(unit.id, UnitStatus::Generated, UnitAction::Print)
            .await
        {
            Ok(printed) => {
                debug!(unit_id = %printed.id, sequence = %printed.sequence, latency_ms, "Unit printed");
                Ok(PrintResult {
                    unit_id: printed.id,
                    sequence: printed.sequence,
                    outcome: DeviceOutcome::Completed,
                    status: printed.status,
                    message: "printed".to_string(),
                    latency_ms,
                })
            }
            Err(Error::InvalidState { current, .. }) => Ok(mismatch(&unit, current, latency_ms)),
            Err(e) => Err(e),
        }
    }
}

fn mismatch(unit: &SerializedUnit, current: UnitStatus, latency_ms: u64) -> PrintResult {
    PrintResult {
        unit_id: unit.id,
        sequence: unit.sequence.clone(),
        outcome: DeviceOutcome::StateMismatch { current },
        status: current,
        message: format!("unit cannot be printed in status {current}"),
        latency_ms,
    }
}
