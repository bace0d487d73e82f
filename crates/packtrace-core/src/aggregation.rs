//! Aggregation engine: packs a run's units into boxes and boxes onto pallets.
//!
//! Planning is pure ([`plan_aggregation`]); committing goes through one
//! [`ChangeSet`] so a packing tree is either fully visible or not at all.
//!
//! # Identifier ranges
//!
//! Box and pallet identifiers of a company prefix come from disjoint counter
//! ranges (see [`SerialAllocator`]). Within a range, numbering continues after
//! the highest counter already minted under the same prefix, so manual and
//! automatic containers never collide, within a run or across runs.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    domain::{
        build_forest, ContainerId, ContainerKind, ContainerNode, PackingContainer, RunId,
        RunSnapshot, RunStatus, SerializedUnit, UnitId,
    },
    gs1::{self, SerialRange, SsccGenerator, SERIAL_MAX},
    store::{ChangeSet, Reparent, TrackStore, UnitAssignment},
    Error, Result,
};

// ═══════════════════════════════════════════════════════════════════════════
// SERIAL ALLOCATION
// ═══════════════════════════════════════════════════════════════════════════

/// Splits the 9-digit counter space into a box range and a pallet range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialAllocator {
    pallet_base: u64,
}

impl SerialAllocator {
    pub fn new(pallet_base: u64) -> Result<Self> {
        if pallet_base <= 1 || pallet_base > SERIAL_MAX {
            return Err(Error::validation(format!(
                "pallet serial base must be within 2..={SERIAL_MAX}, got {pallet_base}"
            )));
        }
        Ok(Self { pallet_base })
    }

    pub const fn range(&self, kind: ContainerKind) -> SerialRange {
        match kind {
            ContainerKind::Box => SerialRange::boxes(self.pallet_base),
            ContainerKind::Pallet => SerialRange::pallets(self.pallet_base),
        }
    }

    /// First counter for new containers of `kind`, given how many the run
    /// already holds and which identifiers exist under the same prefix.
    pub fn first_counter(
        &self,
        kind: ContainerKind,
        existing_in_run: u64,
        prefix: &str,
        minted: &[String],
    ) -> u64 {
        let range = self.range(kind);
        let after_run = range.start().saturating_add(existing_in_run);
        let after_minted = minted
            .iter()
            .filter_map(|code| gs1::serial_of(code, prefix))
            .filter(|serial| range.contains(*serial))
            .max()
            .map_or(range.start(), |max| max + 1);
        after_run.max(after_minted)
    }

    pub fn generator(&self, kind: ContainerKind, prefix: &str, first: u64) -> Result<SsccGenerator> {
        Ok(SsccGenerator::starting_at(prefix, self.range(kind), first)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PLANNING
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBox {
    pub container: PackingContainer,
    pub unit_ids: Vec<UnitId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPallet {
    pub container: PackingContainer,
    pub box_ids: Vec<ContainerId>,
}

/// A complete two-level packing tree, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackingPlan {
    pub run_id: RunId,
    pub unit_count: usize,
    pub boxes: Vec<PlannedBox>,
    pub pallets: Vec<PlannedPallet>,
}

impl PackingPlan {
    /// Containers, re-parents and assignments of this plan as one change set.
    pub fn into_change_set(self) -> ChangeSet {
        let mut changes = ChangeSet::new(self.run_id);
        for pallet in self.pallets {
            changes
                .reparents
                .extend(pallet.box_ids.iter().map(|box_id| Reparent {
                    box_id: *box_id,
                    pallet_id: pallet.container.id,
                }));
            changes.containers.push(pallet.container);
        }
        for planned in self.boxes {
            changes
                .assignments
                .extend(planned.unit_ids.iter().map(|unit_id| UnitAssignment {
                    unit_id: *unit_id,
                    box_id: planned.container.id,
                }));
            changes.containers.push(planned.container);
        }
        changes
    }
}

/// Partitions the unassigned units, in ascending sequence order, into boxes of
/// `box_capacity`, then the boxes into pallets of `pallet_capacity`. The last
/// box and the last pallet may be partial.
pub fn plan_aggregation(
    run_id: RunId,
    units: &[SerializedUnit],
    box_capacity: u32,
    pallet_capacity: u32,
    boxes: &SsccGenerator,
    pallets: &SsccGenerator,
) -> Result<PackingPlan> {
    if box_capacity == 0 || pallet_capacity == 0 {
        return Err(Error::validation("box and pallet capacity must be greater than zero"));
    }

    let ordered: Vec<&SerializedUnit> = units
        .iter()
        .filter(|u| !u.is_assigned())
        .sorted_by(|a, b| a.sequence_key().cmp(&b.sequence_key()))
        .collect();

    let planned_boxes = ordered
        .chunks(box_capacity as usize)
        .map(|slice| -> Result<PlannedBox> {
            Ok(PlannedBox {
                container: PackingContainer::new(run_id, ContainerKind::Box, boxes.next()?),
                unit_ids: slice.iter().map(|u| u.id).collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let planned_pallets = planned_boxes
        .chunks(pallet_capacity as usize)
        .map(|slice| -> Result<PlannedPallet> {
            Ok(PlannedPallet {
                container: PackingContainer::new(run_id, ContainerKind::Pallet, pallets.next()?),
                box_ids: slice.iter().map(|b| b.container.id).collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PackingPlan {
        run_id,
        unit_count: ordered.len(),
        boxes: planned_boxes,
        pallets: planned_pallets,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════

/// Totals of a full aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub run_id: RunId,
    pub unit_count: usize,
    pub box_count: usize,
    pub pallet_count: usize,
    pub box_capacity: u32,
    pub pallet_capacity: u32,
}

pub struct AggregationEngine {
    store: Arc<dyn TrackStore>,
    allocator: SerialAllocator,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn TrackStore>, allocator: SerialAllocator) -> Self {
        Self { store, allocator }
    }

    /// Rebuilds the run's packing tree from scratch and marks the run
    /// completed. Repeating it on an unchanged run yields the same membership.
    pub async fn aggregate(&self, run_id: RunId) -> Result<AggregationSummary> {
        let snapshot = self.store.load_snapshot(run_id).await?;
        let prefix = self.company_prefix(&snapshot).await?;
        let run = &snapshot.run;

        // Plan against the state the reset will produce.
        let units: Vec<SerializedUnit> = snapshot
            .units
            .iter()
            .cloned()
            .map(|u| SerializedUnit {
                container_id: None,
                ..u
            })
            .collect();

        let minted = self
            .store
            .shipping_ids_with_prefix(&prefix, Some(run_id))
            .await?;
        let boxes = self.generator(ContainerKind::Box, &prefix, 0, &minted)?;
        let pallets = self.generator(ContainerKind::Pallet, &prefix, 0, &minted)?;

        let plan = plan_aggregation(
            run_id,
            &units,
            run.box_capacity,
            run.pallet_capacity,
            &boxes,
            &pallets,
        )?;
        let summary = AggregationSummary {
            run_id,
            unit_count: plan.unit_count,
            box_count: plan.boxes.len(),
            pallet_count: plan.pallets.len(),
            box_capacity: run.box_capacity,
            pallet_capacity: run.pallet_capacity,
        };

        let changes = plan
            .into_change_set()
            .with_reset()
            .with_run_status(RunStatus::Completed);
        self.store.apply(&changes).await?;

        info!(
            run_id = %run_id,
            units = summary.unit_count,
            boxes = summary.box_count,
            pallets = summary.pallet_count,
            "Aggregation committed"
        );
        Ok(summary)
    }

    /// Packs the selected units of a run into one new box.
    pub async fn create_box(&self, run_id: RunId, unit_ids: &[UnitId]) -> Result<ContainerNode> {
        check_selection("unit", unit_ids)?;
        let snapshot = self.store.load_snapshot(run_id).await?;

        let by_id: HashMap<UnitId, &SerializedUnit> =
            snapshot.units.iter().map(|u| (u.id, u)).collect();
        let foreign: Vec<UnitId> = unit_ids
            .iter()
            .copied()
            .filter(|id| !by_id.contains_key(id))
            .collect();
        reject_if_any(&foreign, &format!("units do not belong to run {run_id}"))?;
        let assigned: Vec<UnitId> = unit_ids
            .iter()
            .copied()
            .filter(|id| by_id.get(id).is_some_and(|u| u.is_assigned()))
            .collect();
        reject_if_any(&assigned, "units are already in a box")?;

        let prefix = self.company_prefix(&snapshot).await?;
        let existing = self.store.count_containers(run_id, ContainerKind::Box).await?;
        let minted = self.store.shipping_ids_with_prefix(&prefix, None).await?;
        let generator = self.generator(ContainerKind::Box, &prefix, existing, &minted)?;

        let container = PackingContainer::new(run_id, ContainerKind::Box, generator.next()?);
        let mut changes = ChangeSet::new(run_id);
        changes.assignments = unit_ids
            .iter()
            .map(|unit_id| UnitAssignment {
                unit_id: *unit_id,
                box_id: container.id,
            })
            .collect();
        let box_id = container.id;
        changes.containers.push(container);
        self.store.apply(&changes).await?;

        info!(run_id = %run_id, box_id = %box_id, units = unit_ids.len(), "Manual box created");
        self.find_node(run_id, box_id).await
    }

    /// Stacks the selected boxes of a run onto one new pallet.
    pub async fn create_pallet(&self, run_id: RunId, box_ids: &[ContainerId]) -> Result<ContainerNode> {
        check_selection("box", box_ids)?;
        let snapshot = self.store.load_snapshot(run_id).await?;

        let by_id: HashMap<ContainerId, &PackingContainer> =
            snapshot.containers.iter().map(|c| (c.id, c)).collect();
        let foreign: Vec<ContainerId> = box_ids
            .iter()
            .copied()
            .filter(|id| !by_id.contains_key(id))
            .collect();
        reject_if_any(&foreign, &format!("containers do not belong to run {run_id}"))?;
        let not_boxes: Vec<ContainerId> = box_ids
            .iter()
            .copied()
            .filter(|id| by_id.get(id).is_some_and(|c| c.kind != ContainerKind::Box))
            .collect();
        reject_if_any(&not_boxes, "containers are not boxes")?;
        let parented: Vec<ContainerId> = box_ids
            .iter()
            .copied()
            .filter(|id| by_id.get(id).is_some_and(|c| c.parent_id.is_some()))
            .collect();
        reject_if_any(&parented, "boxes are already on a pallet")?;

        let prefix = self.company_prefix(&snapshot).await?;
        let existing = self
            .store
            .count_containers(run_id, ContainerKind::Pallet)
            .await?;
        let minted = self.store.shipping_ids_with_prefix(&prefix, None).await?;
        let generator = self.generator(ContainerKind::Pallet, &prefix, existing, &minted)?;

        let pallet = PackingContainer::new(run_id, ContainerKind::Pallet, generator.next()?);
        let pallet_id = pallet.id;
        let mut changes = ChangeSet::new(run_id);
        changes.containers.push(pallet);
        changes.reparents = box_ids
            .iter()
            .map(|box_id| Reparent {
                box_id: *box_id,
                pallet_id,
            })
            .collect();
        self.store.apply(&changes).await?;

        info!(run_id = %run_id, pallet_id = %pallet_id, boxes = box_ids.len(), "Manual pallet created");
        self.find_node(run_id, pallet_id).await
    }

    /// Packing forest of a run: pallets with their boxes, plus loose boxes.
    pub async fn container_tree(&self, run_id: RunId) -> Result<Vec<ContainerNode>> {
        let snapshot = self.store.load_snapshot(run_id).await?;
        Ok(build_forest(&snapshot.containers, &snapshot.units))
    }

    async fn find_node(&self, run_id: RunId, id: ContainerId) -> Result<ContainerNode> {
        let forest = self.container_tree(run_id).await?;
        find_in(forest, id).ok_or_else(|| Error::not_found(ContainerId::ENTITY, id))
    }

    async fn company_prefix(&self, snapshot: &RunSnapshot) -> Result<String> {
        let product = self.store.get_product(snapshot.run.product_id).await?;
        let customer = self.store.get_customer(product.customer_id).await?;
        Ok(gs1::normalize_prefix(customer.company_prefix())?)
    }

    fn generator(
        &self,
        kind: ContainerKind,
        prefix: &str,
        existing_in_run: u64,
        minted: &[String],
    ) -> Result<SsccGenerator> {
        let first = self
            .allocator
            .first_counter(kind, existing_in_run, prefix, minted);
        debug!(kind = %kind, prefix, first, "Allocating container identifiers");
        self.allocator.generator(kind, prefix, first)
    }
}

fn find_in(nodes: Vec<ContainerNode>, id: ContainerId) -> Option<ContainerNode> {
    nodes.into_iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find_in(node.children, id)
        }
    })
}

fn check_selection<T>(what: &str, ids: &[T]) -> Result<()>
where
    T: Copy + Eq + std::hash::Hash + std::fmt::Display,
{
    if ids.is_empty() {
        return Err(Error::validation(format!("no {what} ids selected")));
    }
    let mut seen = HashSet::new();
    let duplicates: Vec<T> = ids.iter().copied().filter(|id| !seen.insert(*id)).unique().collect();
    reject_if_any(&duplicates, &format!("{what} ids selected more than once"))
}

fn reject_if_any<T: std::fmt::Display>(ids: &[T], reason: &str) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    Err(Error::validation(format!("{reason}: {}", ids.iter().join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UnitStatus;

    fn units(run_id: RunId, n: usize) -> Vec<SerializedUnit> {
        (1..=n)
            .map(|i| SerializedUnit {
                id: UnitId::new(),
                run_id,
                sequence: format!("{i:0>10}"),
                barcode: String::new(),
                status: UnitStatus::Verified,
                container_id: None,
            })
            .collect()
    }

    fn generators(alloc: SerialAllocator) -> (SsccGenerator, SsccGenerator) {
        let boxes = alloc.generator(ContainerKind::Box, "8690123", 1).unwrap();
        let pallets = alloc
            .generator(ContainerKind::Pallet, "8690123", alloc.range(ContainerKind::Pallet).start())
            .unwrap();
        (boxes, pallets)
    }

    #[test]
    fn test_partition_25_units_by_10_and_2() -> Result<()> {
        let run_id = RunId::new();
        let alloc = SerialAllocator::new(500_000_000)?;
        let (boxes, pallets) = generators(alloc);
        let plan = plan_aggregation(run_id, &units(run_id, 25), 10, 2, &boxes, &pallets)?;

        let sizes: Vec<usize> = plan.boxes.iter().map(|b| b.unit_ids.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        let pallet_sizes: Vec<usize> = plan.pallets.iter().map(|p| p.box_ids.len()).collect();
        assert_eq!(pallet_sizes, vec![2, 1]);
        assert_eq!(plan.unit_count, 25);
        Ok(())
    }

    #[test]
    fn test_plan_orders_by_sequence_and_skips_assigned() -> Result<()> {
        let run_id = RunId::new();
        let mut input = units(run_id, 4);
        input.reverse();
        input[0].container_id = Some(ContainerId::new()); // sequence 4
        let alloc = SerialAllocator::new(1000)?;
        let (boxes, pallets) = generators(alloc);

        let plan = plan_aggregation(run_id, &input, 2, 10, &boxes, &pallets)?;
        assert_eq!(plan.unit_count, 3);
        assert_eq!(plan.boxes[0].unit_ids, vec![input[3].id, input[2].id]);
        assert_eq!(plan.boxes[1].unit_ids, vec![input[1].id]);
        Ok(())
    }

    #[test]
    fn test_identifiers_come_from_disjoint_ranges() -> Result<()> {
        let run_id = RunId::new();
        let alloc = SerialAllocator::new(1000)?;
        let (boxes, pallets) = generators(alloc);
        let plan = plan_aggregation(run_id, &units(run_id, 30), 1, 1, &boxes, &pallets)?;

        for planned in &plan.boxes {
            let serial = gs1::serial_of(&planned.container.shipping_id, "8690123");
            assert!(serial.is_some_and(|s| alloc.range(ContainerKind::Box).contains(s)));
        }
        for planned in &plan.pallets {
            let serial = gs1::serial_of(&planned.container.shipping_id, "8690123");
            assert!(serial.is_some_and(|s| s >= 1000));
        }
        Ok(())
    }

    #[test]
    fn test_change_set_links_every_unit_and_box() -> Result<()> {
        let run_id = RunId::new();
        let alloc = SerialAllocator::new(1000)?;
        let (boxes, pallets) = generators(alloc);
        let plan = plan_aggregation(run_id, &units(run_id, 7), 3, 2, &boxes, &pallets)?;
        let changes = plan.into_change_set();

        assert_eq!(changes.containers.len(), 3 + 2);
        assert_eq!(changes.assignments.len(), 7);
        assert_eq!(changes.reparents.len(), 3);
        assert!(!changes.reset);
        Ok(())
    }

    #[test]
    fn test_empty_run_plans_nothing() -> Result<()> {
        let run_id = RunId::new();
        let alloc = SerialAllocator::new(1000)?;
        let (boxes, pallets) = generators(alloc);
        let plan = plan_aggregation(run_id, &[], 10, 10, &boxes, &pallets)?;
        assert!(plan.boxes.is_empty());
        assert!(plan.pallets.is_empty());
        Ok(())
    }

    #[test]
    fn test_box_range_exhaustion_is_validation() -> Result<()> {
        let run_id = RunId::new();
        let alloc = SerialAllocator::new(3)?;
        let (boxes, pallets) = generators(alloc);
        let result = plan_aggregation(run_id, &units(run_id, 3), 1, 10, &boxes, &pallets);
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[test]
    fn test_first_counter_policy() -> Result<()> {
        let alloc = SerialAllocator::new(1000)?;
        let prefix = "8690123";
        assert_eq!(alloc.first_counter(ContainerKind::Box, 0, prefix, &[]), 1);
        assert_eq!(alloc.first_counter(ContainerKind::Box, 3, prefix, &[]), 4);
        assert_eq!(alloc.first_counter(ContainerKind::Pallet, 0, prefix, &[]), 1000);
        assert_eq!(alloc.first_counter(ContainerKind::Pallet, 2, prefix, &[]), 1002);

        let generator = alloc.generator(ContainerKind::Box, prefix, 7)?;
        let minted = vec![generator.next()?, "unrelated".to_string()];
        assert_eq!(alloc.first_counter(ContainerKind::Box, 0, prefix, &minted), 8);
        assert_eq!(alloc.first_counter(ContainerKind::Pallet, 0, prefix, &minted), 1000);
        Ok(())
    }

    #[test]
    fn test_allocator_rejects_bad_base() {
        assert!(SerialAllocator::new(1).is_err());
        assert!(SerialAllocator::new(SERIAL_MAX + 1).is_err());
    }

    #[test]
    fn test_selection_checks() {
        assert!(check_selection::<UnitId>("unit", &[]).is_err());
        let id = UnitId::new();
        let err = check_selection("unit", &[id, id]).err();
        assert!(err.is_some_and(|e| e.to_string().contains(&id.to_string())));
    }
}
