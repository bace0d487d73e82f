#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

//! `SQLite` implementation of [`TrackStore`].

use std::{collections::BTreeMap, str::FromStr};

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};
use tracing::debug;

use super::{
    rows::{
        convert, format_time, ContainerRow, CustomerRow, ProductRow, RunRow, UnitRow, DATE_FORMAT,
    },
    ChangeSet, TrackStore, UnitQuery,
};
use crate::{
    domain::{
        ContainerId, ContainerKind, Customer, CustomerId, PackingContainer, Product, ProductId,
        ProductionRun, RunId, RunSnapshot, RunStatus, SerializedUnit, UnitAction, UnitId,
        UnitStatus,
    },
    Error, Result,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        gln TEXT NOT NULL,
        note TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
        gtin TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS runs (
        id TEXT PRIMARY KEY,
        product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        quantity INTEGER NOT NULL,
        lot TEXT NOT NULL,
        expiry TEXT NOT NULL,
        start_sequence INTEGER NOT NULL,
        box_capacity INTEGER NOT NULL,
        pallet_capacity INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS containers (
        id TEXT PRIMARY KEY,
        run_id TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
        kind TEXT NOT NULL CHECK (kind IN ('box', 'pallet')),
        shipping_id TEXT NOT NULL UNIQUE,
        parent_id TEXT REFERENCES containers(id) ON DELETE SET NULL
    )",
    "CREATE TABLE IF NOT EXISTS units (
        id TEXT PRIMARY KEY,
        run_id TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
        sequence TEXT NOT NULL,
        serial INTEGER NOT NULL UNIQUE,
        barcode TEXT NOT NULL,
        status TEXT NOT NULL,
        container_id TEXT REFERENCES containers(id) ON DELETE SET NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_units_run ON units(run_id)",
    "CREATE INDEX IF NOT EXISTS idx_units_container ON units(container_id)",
    "CREATE INDEX IF NOT EXISTS idx_containers_run ON containers(run_id)",
    "CREATE INDEX IF NOT EXISTS idx_containers_parent ON containers(parent_id)",
];

const UNIT_COLUMNS: &str = "id, run_id, sequence, barcode, status, container_id";
const CONTAINER_COLUMNS: &str = "id, run_id, kind, shipping_id, parent_id";
const RUN_COLUMNS: &str = "id, product_id, quantity, lot, expiry, start_sequence, \
                           box_capacity, pallet_capacity, status, created_at";

/// `serial` is the numeric value of the padded `sequence` text.
const SEQUENCE_ORDER: &str = "ORDER BY serial";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    #[must_use]
    pub const fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Opens (creating if needed) the database at `url` and initializes the
    /// schema.
    ///
    /// In-memory databases get a single long-lived connection so every
    /// caller sees the same data.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let db = pool_options.connect_with(options).await?;

        let store = Self::new(db);
        store.init().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn init(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.db).await?;
        }
        Ok(())
    }

    async fn apply_in(tx: &mut Transaction<'_, Sqlite>, changes: &ChangeSet) -> Result<()> {
        let run_id = changes.run_id.to_string();

        if changes.reset {
            sqlx::query(
                "UPDATE units SET container_id = NULL, status = ? WHERE run_id = ?",
            )
            .bind(UnitStatus::Generated.as_str())
            .bind(&run_id)
            .execute(&mut **tx)
            .await?;

            sqlx::query("DELETE FROM containers WHERE run_id = ?")
                .bind(&run_id)
                .execute(&mut **tx)
                .await?;
        }

        for container in &changes.containers {
            sqlx::query(
                "INSERT INTO containers (id, run_id, kind, shipping_id, parent_id)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(container.id.to_string())
            .bind(container.run_id.to_string())
            .bind(container.kind.as_ref())
            .bind(&container.shipping_id)
            .bind(container.parent_id.map(|id| id.to_string()))
            .execute(&mut **tx)
            .await?;
        }

        for reparent in &changes.reparents {
            let result = sqlx::query(
                "UPDATE containers SET parent_id = ?
                 WHERE id = ? AND run_id = ? AND kind = ? AND parent_id IS NULL",
            )
            .bind(reparent.pallet_id.to_string())
            .bind(reparent.box_id.to_string())
            .bind(&run_id)
            .bind(ContainerKind::Box.as_ref())
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(Error::conflict(format!(
                    "box {} is no longer an unparented box of run {run_id}",
                    reparent.box_id
                )));
            }
        }

        for assignment in &changes.assignments {
            let result = sqlx::query(
                "UPDATE units SET container_id = ?, status = ?
                 WHERE id = ? AND run_id = ? AND container_id IS NULL",
            )
            .bind(assignment.box_id.to_string())
            .bind(UnitStatus::Aggregated.as_str())
            .bind(assignment.unit_id.to_string())
            .bind(&run_id)
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(Error::conflict(format!(
                    "unit {} is no longer an unassigned unit of run {run_id}",
                    assignment.unit_id
                )));
            }
        }

        if let Some(status) = changes.run_status {
            sqlx::query("UPDATE runs SET status = ? WHERE id = ?")
                .bind(status.as_ref())
                .bind(&run_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl TrackStore for SqliteStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            "INSERT INTO customers (id, name, gln, note, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.gln)
        .bind(&customer.note)
        .bind(format_time(&customer.created_at))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Customer> {
        sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, gln, note, created_at FROM customers WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| Error::not_found(CustomerId::ENTITY, id))?
        .try_into()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(
            "SELECT id, name, gln, note, created_at FROM customers ORDER BY name, created_at",
        )
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, customer_id, gtin, name, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(product.id.to_string())
        .bind(product.customer_id.to_string())
        .bind(&product.gtin)
        .bind(&product.name)
        .bind(format_time(&product.created_at))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, customer_id, gtin, name, created_at FROM products WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| Error::not_found(ProductId::ENTITY, id))?
        .try_into()
    }

    async fn list_products(&self, customer_id: Option<CustomerId>) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, customer_id, gtin, name, created_at FROM products
             WHERE ?1 IS NULL OR customer_id = ?1
             ORDER BY name, created_at",
        )
        .bind(customer_id.map(|id| id.to_string()))
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn insert_run(&self, run: &ProductionRun, units: &[SerializedUnit]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO runs ({RUN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(run.id.to_string())
        .bind(run.product_id.to_string())
        .bind(i64::from(run.quantity))
        .bind(&run.lot)
        .bind(run.expiry.format(DATE_FORMAT).to_string())
        .bind(run.start_sequence as i64)
        .bind(i64::from(run.box_capacity))
        .bind(i64::from(run.pallet_capacity))
        .bind(run.status.as_ref())
        .bind(format_time(&run.created_at))
        .execute(&mut *tx)
        .await?;

        for unit in units {
            // Uniqueness is enforced on the number, so padding cannot hide a reuse.
            let serial = i64::try_from(unit.serial_number()?).map_err(|_| {
                Error::validation(format!("sequence {} is out of range", unit.sequence))
            })?;
            sqlx::query(&format!(
                "INSERT INTO units ({UNIT_COLUMNS}, serial) VALUES (?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(unit.id.to_string())
            .bind(unit.run_id.to_string())
            .bind(&unit.sequence)
            .bind(&unit.barcode)
            .bind(unit.status.as_str())
            .bind(unit.container_id.map(|id| id.to_string()))
            .bind(serial)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(run_id = %run.id, units = units.len(), "Inserted run");
        Ok(())
    }

    async fn get_run(&self, id: RunId) -> Result<ProductionRun> {
        sqlx::query_as::<_, RunRow>(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::not_found(RunId::ENTITY, id))?
            .try_into()
    }

    async fn list_runs(&self) -> Result<Vec<ProductionRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            "SELECT {RUN_COLUMNS} FROM runs ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn set_run_status(&self, id: RunId, status: RunStatus) -> Result<()> {
        let result = sqlx::query("UPDATE runs SET status = ? WHERE id = ?")
            .bind(status.as_ref())
            .bind(id.to_string())
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(RunId::ENTITY, id));
        }
        Ok(())
    }

    async fn delete_run(&self, id: RunId) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let run_id = id.to_string();

        // Units first: they reference containers of the same run.
        sqlx::query("DELETE FROM units WHERE run_id = ?")
            .bind(&run_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM containers WHERE run_id = ?")
            .bind(&run_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM runs WHERE id = ?")
            .bind(&run_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(RunId::ENTITY, id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_snapshot(&self, id: RunId) -> Result<RunSnapshot> {
        let mut tx = self.db.begin().await?;
        let run_id = id.to_string();

        let run: ProductionRun =
            sqlx::query_as::<_, RunRow>(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?"))
                .bind(&run_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::not_found(RunId::ENTITY, id))?
                .try_into()?;

        let units: Vec<UnitRow> = sqlx::query_as(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE run_id = ? {SEQUENCE_ORDER}"
        ))
        .bind(&run_id)
        .fetch_all(&mut *tx)
        .await?;

        let containers: Vec<ContainerRow> = sqlx::query_as(&format!(
            "SELECT {CONTAINER_COLUMNS} FROM containers WHERE run_id = ? ORDER BY shipping_id"
        ))
        .bind(&run_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RunSnapshot {
            run,
            units: convert(units)?,
            containers: convert(containers)?,
        })
    }

    async fn get_unit(&self, id: UnitId) -> Result<SerializedUnit> {
        sqlx::query_as::<_, UnitRow>(&format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::not_found(UnitId::ENTITY, id))?
            .try_into()
    }

    async fn list_units(&self, run_id: RunId, query: UnitQuery) -> Result<Vec<SerializedUnit>> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = query
            .limit
            .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let rows: Vec<UnitRow> = sqlx::query_as(&format!(
            "SELECT {UNIT_COLUMNS} FROM units
             WHERE run_id = ?1 AND (?2 IS NULL OR status = ?2)
             {SEQUENCE_ORDER} LIMIT ?3"
        ))
        .bind(run_id.to_string())
        .bind(query.status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn status_counts(&self, run_id: RunId) -> Result<BTreeMap<UnitStatus, u64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM units WHERE run_id = ? GROUP BY status",
        )
        .bind(run_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let mut counts: BTreeMap<UnitStatus, u64> =
            UnitStatus::all().iter().map(|s| (*s, 0)).collect();
        for (status, count) in rows {
            counts.insert(status.parse()?, count as u64);
        }
        Ok(counts)
    }

    async fn get_container(&self, id: ContainerId) -> Result<PackingContainer> {
        sqlx::query_as::<_, ContainerRow>(&format!(
            "SELECT {CONTAINER_COLUMNS} FROM containers WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| Error::not_found(ContainerId::ENTITY, id))?
        .try_into()
    }

    async fn count_containers(&self, run_id: RunId, kind: ContainerKind) -> Result<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM containers WHERE run_id = ? AND kind = ?")
                .bind(run_id.to_string())
                .bind(kind.as_ref())
                .fetch_one(&self.db)
                .await?;
        Ok(count as u64)
    }

    async fn shipping_ids_with_prefix(
        &self,
        prefix: &str,
        exclude_run: Option<RunId>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT shipping_id FROM containers
             WHERE shipping_id LIKE ?1 AND (?2 IS NULL OR run_id <> ?2)",
        )
        .bind(format!("0{prefix}%"))
        .bind(exclude_run.map(|id| id.to_string()))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn transition_unit(
        &self,
        id: UnitId,
        from: UnitStatus,
        action: UnitAction,
    ) -> Result<SerializedUnit> {
        let to = from.apply(action).map_err(|e| Error::InvalidState {
            unit_id: id.to_string(),
            current: e.from,
            action: action.as_str(),
        })?;

        let result = sqlx::query("UPDATE units SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id.to_string())
            .bind(from.as_str())
            .execute(&self.db)
            .await?;

        let unit = self.get_unit(id).await?;
        if result.rows_affected() == 0 {
            return Err(Error::InvalidState {
                unit_id: id.to_string(),
                current: unit.status,
                action: action.as_str(),
            });
        }
        debug!(unit_id = %id, from = %from, to = %to, "Unit transitioned");
        Ok(unit)
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut tx = self.db.begin().await?;
        // Dropping the transaction on error rolls everything back.
        Self::apply_in(&mut tx, changes).await?;
        tx.commit().await?;
        debug!(
            run_id = %changes.run_id,
            containers = changes.containers.len(),
            assignments = changes.assignments.len(),
            "Applied change set"
        );
        Ok(())
    }
}
