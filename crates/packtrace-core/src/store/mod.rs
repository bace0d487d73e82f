//! Persistence boundary.
//!
//! [`TrackStore`] is everything the services need from storage: load a run
//! with its units and containers, persist a batch of unit/container mutations
//! atomically ([`ChangeSet`]), and enforce uniqueness of sequence numbers and
//! shipping identifiers as a backstop. [`SqliteStore`] is the implementation.

mod rows;
pub mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteStore;

use crate::{
    domain::{
        ContainerId, ContainerKind, Customer, CustomerId, PackingContainer, Product, ProductId,
        ProductionRun, RunId, RunSnapshot, RunStatus, SerializedUnit, UnitAction, UnitId,
        UnitStatus,
    },
    Result,
};

/// Moves an unassigned unit into a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAssignment {
    pub unit_id: UnitId,
    pub box_id: ContainerId,
}

/// Moves an unparented box onto a pallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reparent {
    pub box_id: ContainerId,
    pub pallet_id: ContainerId,
}

/// One atomic batch of aggregation mutations for a single run.
///
/// Applied in field order: reset, container inserts, re-parents, unit
/// assignments, run status. Re-parents and assignments are guarded; if any
/// guard matches no row the whole batch is rolled back with
/// [`crate::Error::Conflict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub run_id: RunId,
    /// Clear every unit's container, force units back to generated and delete
    /// the run's containers.
    pub reset: bool,
    pub containers: Vec<PackingContainer>,
    pub reparents: Vec<Reparent>,
    pub assignments: Vec<UnitAssignment>,
    pub run_status: Option<RunStatus>,
}

impl ChangeSet {
    pub const fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            reset: false,
            containers: Vec::new(),
            reparents: Vec::new(),
            assignments: Vec::new(),
            run_status: None,
        }
    }

    pub const fn with_reset(mut self) -> Self {
        self.reset = true;
        self
    }

    pub const fn with_run_status(mut self, status: RunStatus) -> Self {
        self.run_status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.reset
            && self.containers.is_empty()
            && self.reparents.is_empty()
            && self.assignments.is_empty()
            && self.run_status.is_none()
    }
}

/// Filter for [`TrackStore::list_units`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitQuery {
    pub status: Option<UnitStatus>,
    pub limit: Option<usize>,
}

impl UnitQuery {
    pub const fn with_status(status: UnitStatus) -> Self {
        Self {
            status: Some(status),
            limit: None,
        }
    }

    pub const fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
pub trait TrackStore: Send + Sync {
    // --- Catalogue ---

    async fn insert_customer(&self, customer: &Customer) -> Result<()>;
    async fn get_customer(&self, id: CustomerId) -> Result<Customer>;
    async fn list_customers(&self) -> Result<Vec<Customer>>;
    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn get_product(&self, id: ProductId) -> Result<Product>;
    async fn list_products(&self, customer_id: Option<CustomerId>) -> Result<Vec<Product>>;

    // --- Runs ---

    /// Persists a run together with all of its units in one transaction.
    async fn insert_run(&self, run: &ProductionRun, units: &[SerializedUnit]) -> Result<()>;
    async fn get_run(&self, id: RunId) -> Result<ProductionRun>;
    /// Newest first.
    async fn list_runs(&self) -> Result<Vec<ProductionRun>>;
    async fn set_run_status(&self, id: RunId, status: RunStatus) -> Result<()>;
    /// Deletes a run; its units and containers go with it.
    async fn delete_run(&self, id: RunId) -> Result<()>;
    async fn load_snapshot(&self, id: RunId) -> Result<RunSnapshot>;

    // --- Units and containers ---

    async fn get_unit(&self, id: UnitId) -> Result<SerializedUnit>;
    /// Units of a run in ascending sequence order.
    async fn list_units(&self, run_id: RunId, query: UnitQuery) -> Result<Vec<SerializedUnit>>;
    async fn status_counts(&self, run_id: RunId) -> Result<BTreeMap<UnitStatus, u64>>;
    async fn get_container(&self, id: ContainerId) -> Result<PackingContainer>;
    async fn count_containers(&self, run_id: RunId, kind: ContainerKind) -> Result<u64>;
    /// Shipping identifiers minted under a 7-digit company prefix, optionally
    /// ignoring one run's containers.
    async fn shipping_ids_with_prefix(
        &self,
        prefix: &str,
        exclude_run: Option<RunId>,
    ) -> Result<Vec<String>>;

    /// Applies `action` to a unit only if it is still in status `from`.
    ///
    /// Fails with `NotFound` when the unit is gone and `InvalidState` when its
    /// status moved on.
    async fn transition_unit(
        &self,
        id: UnitId,
        from: UnitStatus,
        action: UnitAction,
    ) -> Result<SerializedUnit>;

    async fn apply(&self, changes: &ChangeSet) -> Result<()>;
}
