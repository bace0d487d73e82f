//! Semantic newtypes for entity identifiers.
//!
//! Every entity is keyed by a random v4 UUID. Wrapping them keeps a unit id
//! from being passed where a container id is expected.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Entity name used in not-found errors.
            pub const ENTITY: &'static str = $entity;

            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| Error::Parse(format!("invalid {} id '{s}': {e}", $entity)))
            }
        }
    };
}

uuid_id!(
    /// Identifies a customer.
    CustomerId,
    "customer"
);
uuid_id!(
    /// Identifies a product.
    ProductId,
    "product"
);
uuid_id!(
    /// Identifies a production run.
    RunId,
    "run"
);
uuid_id!(
    /// Identifies a serialized unit.
    UnitId,
    "unit"
);
uuid_id!(
    /// Identifies a box or pallet.
    ContainerId,
    "container"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_string() -> crate::Result<()> {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse()?;
        assert_eq!(id, parsed);
        Ok(())
    }

    #[test]
    fn test_parse_trims_whitespace() -> crate::Result<()> {
        let id = UnitId::new();
        let parsed: UnitId = format!("  {id} ").parse()?;
        assert_eq!(id, parsed);
        Ok(())
    }

    #[test]
    fn test_parse_error_names_entity() {
        let err = "nope".parse::<ContainerId>().err();
        assert!(err.is_some_and(|e| e.to_string().contains("container")));
    }
}
