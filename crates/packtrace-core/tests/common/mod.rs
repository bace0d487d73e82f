//! Shared fixtures for packtrace-core integration tests.
//!
//! Every fixture runs against its own in-memory database with zero-latency
//! device profiles and a fixed seed.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::sync::Arc;

use chrono::NaiveDate;
use packtrace_core::{
    domain::{CreateRun, Customer, NewCustomer, NewProduct, Product, ProductionRun},
    Config, DeviceProfile, Result, Services, SqliteStore,
};

pub const GLN: &str = "8690123456789";
pub const PREFIX: &str = "8690123";
pub const GTIN: &str = "123456789014";

pub struct Fixture {
    pub services: Services,
    pub customer: Customer,
    pub product: Product,
}

pub fn config(printer_success: f64, verifier_success: f64, seed: u64) -> Config {
    let mut config = Config::default();
    config.simulator.seed = Some(seed);
    config.simulator.printer = DeviceProfile::instant(printer_success);
    config.simulator.verifier = DeviceProfile::instant(verifier_success);
    config
}

/// Devices that always succeed.
pub async fn fixture() -> Result<Fixture> {
    fixture_with(config(1.0, 1.0, 42)).await
}

pub async fn fixture_with(config: Config) -> Result<Fixture> {
    let store = SqliteStore::in_memory().await?;
    let services = Services::from_store(Arc::new(store), &config)?;
    let customer = services
        .catalogue
        .create_customer(NewCustomer {
            name: "Acme Pharma".into(),
            gln: GLN.into(),
            note: None,
        })
        .await?;
    let product = services
        .catalogue
        .create_product(NewProduct {
            customer_id: customer.id,
            gtin: GTIN.into(),
            name: "Tablets 20mg".into(),
        })
        .await?;
    Ok(Fixture {
        services,
        customer,
        product,
    })
}

pub fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2027, 3, 9).unwrap()
}

impl Fixture {
    pub fn params(&self, quantity: u32) -> CreateRun {
        CreateRun::new(self.product.id, quantity, "LOT-A", expiry())
    }

    pub async fn run(
        &self,
        quantity: u32,
        box_capacity: u32,
        pallet_capacity: u32,
        start: u64,
    ) -> Result<ProductionRun> {
        self.services
            .runs
            .create_run(
                self.params(quantity)
                    .with_start_sequence(start)
                    .with_capacities(box_capacity, pallet_capacity),
            )
            .await
    }
}
