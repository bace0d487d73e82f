//! Production line controller simulator.
//!
//! Line state is kept per run in a [`LineStateStore`]. Every read-modify-write
//! of one run's state happens under that run's own mutex, so concurrent
//! start/stop calls for the same run serialize while unrelated runs never
//! contend.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    domain::{ContainerId, ContainerKind, RunId, RunStatus, UnitStatus},
    store::TrackStore,
    Error, Result,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LineState {
    running: bool,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

/// Per-run line states, each behind its own lock.
#[derive(Debug, Default)]
pub struct LineStateStore {
    lines: Mutex<HashMap<RunId, Arc<Mutex<LineState>>>>,
}

impl LineStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, run_id: RunId) -> Arc<Mutex<LineState>> {
        let mut lines = self.lines.lock().await;
        Arc::clone(lines.entry(run_id).or_default())
    }

    async fn existing(&self, run_id: RunId) -> Option<Arc<Mutex<LineState>>> {
        self.lines.lock().await.get(&run_id).map(Arc::clone)
    }
}

/// Snapshot of one run's line, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStatus {
    pub run_id: RunId,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub message: String,
}

impl LineStatus {
    fn from_state(run_id: RunId, state: LineState, message: &str) -> Self {
        Self {
            run_id,
            running: state.running,
            started_at: state.started_at,
            stopped_at: state.stopped_at,
            message: message.to_string(),
        }
    }
}

/// Unit counts per lifecycle status plus the line's running flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionStatus {
    pub run_id: RunId,
    pub total: u64,
    pub counts: BTreeMap<UnitStatus, u64>,
    pub running: bool,
}

impl ProductionStatus {
    pub fn count(&self, status: UnitStatus) -> u64 {
        self.counts.get(&status).copied().unwrap_or(0)
    }
}

pub struct LineController {
    store: Arc<dyn TrackStore>,
    lines: Arc<LineStateStore>,
}

impl LineController {
    pub fn new(store: Arc<dyn TrackStore>, lines: Arc<LineStateStore>) -> Self {
        Self { store, lines }
    }

    /// Starts the line and moves the run to in-progress.
    ///
    /// Starting a running line changes nothing and reports the original
    /// start time.
    pub async fn start(&self, run_id: RunId) -> Result<LineStatus> {
        let run = self.store.get_run(run_id).await?;
        let entry = self.lines.entry(run_id).await;
        let mut state = entry.lock().await;

        if state.running {
            warn!(run_id = %run_id, "Line already running");
            return Ok(LineStatus::from_state(run_id, *state, "line already running"));
        }

        self.store.set_run_status(run_id, RunStatus::InProgress).await?;
        *state = LineState {
            running: true,
            started_at: Some(Utc::now()),
            stopped_at: None,
        };
        info!(run_id = %run_id, lot = %run.lot, "Line started");
        Ok(LineStatus::from_state(run_id, *state, "line started"))
    }

    /// Stops a running line. Stopping a stopped (or never started) line
    /// changes nothing.
    pub async fn stop(&self, run_id: RunId) -> Result<LineStatus> {
        self.store.get_run(run_id).await?;
        let Some(entry) = self.lines.existing(run_id).await else {
            warn!(run_id = %run_id, "Line already stopped");
            return Ok(LineStatus::from_state(
                run_id,
                LineState::default(),
                "line already stopped",
            ));
        };
        let mut state = entry.lock().await;

        if !state.running {
            warn!(run_id = %run_id, "Line already stopped");
            return Ok(LineStatus::from_state(run_id, *state, "line already stopped"));
        }

        let now = Utc::now();
        state.running = false;
        state.stopped_at = Some(now);
        let duration_ms = state
            .started_at
            .map_or(0, |started| (now - started).num_milliseconds());
        info!(run_id = %run_id, duration_ms, "Line stopped");
        Ok(LineStatus::from_state(run_id, *state, "line stopped"))
    }

    pub async fn status(&self, run_id: RunId) -> LineStatus {
        match self.lines.existing(run_id).await {
            Some(entry) => {
                let state = *entry.lock().await;
                let message = if state.running { "running" } else { "stopped" };
                LineStatus::from_state(run_id, state, message)
            }
            None => LineStatus::from_state(run_id, LineState::default(), "not started"),
        }
    }

    /// Acknowledges a "pallet complete" signal. True when the id names an
    /// existing pallet; no other effect.
    pub async fn signal_pallet_complete(&self, pallet_id: ContainerId) -> Result<bool> {
        match self.store.get_container(pallet_id).await {
            Ok(pallet) if pallet.kind == ContainerKind::Pallet => {
                info!(
                    pallet_id = %pallet_id,
                    shipping_id = %pallet.shipping_id,
                    run_id = %pallet.run_id,
                    "Pallet complete signal"
                );
                Ok(true)
            }
            Ok(_) | Err(Error::NotFound { .. }) => {
                warn!(pallet_id = %pallet_id, "Pallet complete signal for unknown pallet");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn production_status(&self, run_id: RunId) -> Result<ProductionStatus> {
        self.store.get_run(run_id).await?;
        let counts = self.store.status_counts(run_id).await?;
        let running = self.status(run_id).await.running;
        Ok(ProductionStatus {
            run_id,
            total: counts.values().sum(),
            counts,
            running,
        })
    }
}
