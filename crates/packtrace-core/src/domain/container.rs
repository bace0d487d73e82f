//! Packing containers and the materialized packing tree.
//!
//! Containers are stored flat, each with an optional parent id. Tree views are
//! built on demand from a parent-id index; nothing holds references between
//! containers.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::{ContainerId, RunId, SerializedUnit, UnitId};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContainerKind {
    /// Holds units; parent is a pallet.
    Box,
    /// Holds boxes; never has a parent.
    Pallet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingContainer {
    pub id: ContainerId,
    pub run_id: RunId,
    pub kind: ContainerKind,
    /// 18-digit shipping identifier, unique across the system.
    pub shipping_id: String,
    pub parent_id: Option<ContainerId>,
}

impl PackingContainer {
    pub fn new(run_id: RunId, kind: ContainerKind, shipping_id: String) -> Self {
        Self {
            id: ContainerId::new(),
            run_id,
            kind,
            shipping_id,
            parent_id: None,
        }
    }
}

/// A container with its children, as shown in run detail views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerNode {
    pub id: ContainerId,
    pub kind: ContainerKind,
    pub shipping_id: String,
    pub parent_id: Option<ContainerId>,
    /// Units packed directly (boxes only).
    pub unit_ids: Vec<UnitId>,
    /// Units packed below this node, directly or through children.
    pub item_count: usize,
    pub children: Vec<ContainerNode>,
}

/// Builds the packing forest: pallets with their boxes, plus any box without
/// a pallet as its own root. Roots and children are ordered by shipping id.
pub fn build_forest(containers: &[PackingContainer], units: &[SerializedUnit]) -> Vec<ContainerNode> {
    let mut by_parent: HashMap<Option<ContainerId>, Vec<&PackingContainer>> = HashMap::new();
    for container in containers {
        by_parent.entry(container.parent_id).or_default().push(container);
    }

    let mut units_by_box: HashMap<ContainerId, Vec<&SerializedUnit>> = HashMap::new();
    for unit in units {
        if let Some(container_id) = unit.container_id {
            units_by_box.entry(container_id).or_default().push(unit);
        }
    }

    by_parent
        .get(&None)
        .map(|roots| {
            sorted(roots)
                .into_iter()
                .map(|root| build_node(root, &by_parent, &units_by_box))
                .collect()
        })
        .unwrap_or_default()
}

fn sorted<'a>(containers: &[&'a PackingContainer]) -> Vec<&'a PackingContainer> {
    containers
        .iter()
        .map(|c| (c.shipping_id.as_str(), *c))
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect()
}

fn build_node(
    container: &PackingContainer,
    by_parent: &HashMap<Option<ContainerId>, Vec<&PackingContainer>>,
    units_by_box: &HashMap<ContainerId, Vec<&SerializedUnit>>,
) -> ContainerNode {
    let children: Vec<ContainerNode> = by_parent
        .get(&Some(container.id))
        .map(|kids| {
            sorted(kids)
                .into_iter()
                .map(|kid| build_node(kid, by_parent, units_by_box))
                .collect()
        })
        .unwrap_or_default();

    let mut packed: Vec<&SerializedUnit> = units_by_box.get(&container.id).cloned().unwrap_or_default();
    packed.sort_by(|a, b| a.sequence_key().cmp(&b.sequence_key()));
    let unit_ids: Vec<UnitId> = packed.iter().map(|u| u.id).collect();
    let item_count = unit_ids.len() + children.iter().map(|c| c.item_count).sum::<usize>();

    ContainerNode {
        id: container.id,
        kind: container.kind,
        shipping_id: container.shipping_id.clone(),
        parent_id: container.parent_id,
        unit_ids,
        item_count,
        children,
    }
}
