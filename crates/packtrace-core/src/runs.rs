//! Production run lifecycle: creation with bulk unit serialization, status
//! changes, detail views and aggregation reset.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    domain::{
        build_forest, ContainerKind, ContainerNode, CreateRun, Customer, Product, ProductionRun,
        RunId, RunStatus, SerializedUnit, UnitId, UnitStatus,
    },
    gs1,
    store::{ChangeSet, TrackStore},
    Result,
};

/// Everything known about one run, with the packing tree materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDetail {
    pub run: ProductionRun,
    pub product: Product,
    pub customer: Customer,
    pub units: Vec<SerializedUnit>,
    pub containers: Vec<ContainerNode>,
    pub totals: RunTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub units: usize,
    pub aggregated_units: usize,
    pub boxes: usize,
    pub pallets: usize,
}

pub struct RunService {
    store: Arc<dyn TrackStore>,
    serial_width: usize,
}

impl RunService {
    pub fn new(store: Arc<dyn TrackStore>, serial_width: usize) -> Self {
        Self {
            store,
            serial_width,
        }
    }

    /// Creates a run and serializes all of its units in one transaction.
    ///
    /// Sequence numbers are `start_sequence + i`; a range overlapping another
    /// run's fails with a conflict and persists nothing.
    pub async fn create_run(&self, params: CreateRun) -> Result<ProductionRun> {
        params.validate()?;
        let product = self.store.get_product(params.product_id).await?;

        let run = ProductionRun {
            id: RunId::new(),
            product_id: product.id,
            quantity: params.quantity,
            lot: params.lot.clone(),
            expiry: params.expiry,
            start_sequence: params.start_sequence,
            box_capacity: params.box_capacity,
            pallet_capacity: params.pallet_capacity,
            status: RunStatus::Created,
            created_at: Utc::now(),
        };

        let units: Vec<SerializedUnit> = (0..params.quantity)
            .map(|i| {
                let sequence = params.sequence(i, self.serial_width);
                SerializedUnit {
                    id: UnitId::new(),
                    run_id: run.id,
                    barcode: gs1::compose_barcode(&product.gtin, &sequence, run.expiry, &run.lot),
                    sequence,
                    status: UnitStatus::Generated,
                    container_id: None,
                }
            })
            .collect();

        self.store.insert_run(&run, &units).await?;
        info!(
            run_id = %run.id,
            lot = %run.lot,
            quantity = run.quantity,
            first = %units.first().map_or("", |u| u.sequence.as_str()),
            "Run created"
        );
        Ok(run)
    }

    pub async fn get_run(&self, id: RunId) -> Result<ProductionRun> {
        self.store.get_run(id).await
    }

    /// Newest first.
    pub async fn list_runs(&self) -> Result<Vec<ProductionRun>> {
        self.store.list_runs().await
    }

    pub async fn update_status(&self, id: RunId, status: RunStatus) -> Result<ProductionRun> {
        self.store.set_run_status(id, status).await?;
        info!(run_id = %id, status = %status, "Run status updated");
        self.store.get_run(id).await
    }

    pub async fn delete_run(&self, id: RunId) -> Result<()> {
        self.store.delete_run(id).await?;
        info!(run_id = %id, "Run deleted");
        Ok(())
    }

    pub async fn run_detail(&self, id: RunId) -> Result<RunDetail> {
        let snapshot = self.store.load_snapshot(id).await?;
        let product = self.store.get_product(snapshot.run.product_id).await?;
        let customer = self.store.get_customer(product.customer_id).await?;

        let count_kind = |kind| snapshot.containers.iter().filter(|c| c.kind == kind).count();
        let totals = RunTotals {
            units: snapshot.units.len(),
            aggregated_units: snapshot.units.iter().filter(|u| u.is_assigned()).count(),
            boxes: count_kind(ContainerKind::Box),
            pallets: count_kind(ContainerKind::Pallet),
        };
        let containers = build_forest(&snapshot.containers, &snapshot.units);

        Ok(RunDetail {
            run: snapshot.run,
            product,
            customer,
            units: snapshot.units,
            containers,
            totals,
        })
    }

    /// Drops the run's packing tree, returns every unit to `generated` and
    /// the run to `created`.
    pub async fn reset_run(&self, id: RunId) -> Result<ProductionRun> {
        self.store.get_run(id).await?;
        let changes = ChangeSet::new(id)
            .with_reset()
            .with_run_status(RunStatus::Created);
        self.store.apply(&changes).await?;
        info!(run_id = %id, "Run aggregation reset");
        self.store.get_run(id).await
    }
}
