//! # Packtrace Core
//!
//! Unit serialization, simulated print/verify/line devices and two-level
//! packing aggregation (units into boxes, boxes onto pallets).
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Missing entities,
//! rejected input and storage failures are errors; simulated device failures
//! and lifecycle mismatches are ordinary values ([`sim::DeviceOutcome`]).

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod aggregation;
pub mod catalogue;
pub mod config;
pub mod domain;
mod error;
pub mod gs1;
pub mod runs;
pub mod services;
pub mod sim;
pub mod store;

pub use aggregation::{AggregationEngine, AggregationSummary, SerialAllocator};
pub use catalogue::CatalogueService;
pub use config::{Config, DeviceProfile};
pub use error::{Error, ErrorKind, Result};
pub use runs::{RunDetail, RunService, RunTotals};
pub use services::Services;
pub use sim::{LineController, LineStateStore, Printer, SimRng, Verifier};
pub use store::{SqliteStore, TrackStore};
