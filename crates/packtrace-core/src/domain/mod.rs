//! Domain model: identifiers, units, runs, containers and the catalogue.
//!
//! Pure types and rules only. Persistence lives in [`crate::store`].

pub mod catalogue;
pub mod container;
pub mod ids;
pub mod run;
pub mod unit;

pub use catalogue::{Customer, NewCustomer, NewProduct, Product};
pub use container::{build_forest, ContainerKind, ContainerNode, PackingContainer};
pub use ids::{ContainerId, CustomerId, ProductId, RunId, UnitId};
pub use run::{
    CreateRun, ProductionRun, RunSnapshot, RunStatus, DEFAULT_BOX_CAPACITY,
    DEFAULT_PALLET_CAPACITY,
};
pub use unit::{SerializedUnit, TransitionError, UnitAction, UnitStatus};
