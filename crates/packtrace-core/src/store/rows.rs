//! `SQLx` row types.
//!
//! Rows keep the column representation (text ids, RFC 3339 timestamps,
//! signed integers); conversion into domain types happens here and nowhere
//! else.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::{
    domain::{
        Customer, PackingContainer, Product, ProductionRun, SerializedUnit, UnitStatus,
    },
    Error, Result,
};

pub(super) const DATE_FORMAT: &str = "%Y-%m-%d";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CATALOGUE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct CustomerRow {
    pub id: String,
    pub name: String,
    pub gln: String,
    pub note: Option<String>,
    pub created_at: String,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = Error;

    fn try_from(row: CustomerRow) -> Result<Self> {
        Ok(Self {
            id: row.id.parse()?,
            name: row.name,
            gln: row.gln,
            note: row.note,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct ProductRow {
    pub id: String,
    pub customer_id: String,
    pub gtin: String,
    pub name: String,
    pub created_at: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = Error;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Self {
            id: row.id.parse()?,
            customer_id: row.customer_id.parse()?,
            gtin: row.gtin,
            name: row.name,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RUNS, UNITS, CONTAINERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct RunRow {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub lot: String,
    pub expiry: String,
    pub start_sequence: i64,
    pub box_capacity: i64,
    pub pallet_capacity: i64,
    pub status: String,
    pub created_at: String,
}

impl TryFrom<RunRow> for ProductionRun {
    type Error = Error;

    fn try_from(row: RunRow) -> Result<Self> {
        Ok(Self {
            id: row.id.parse()?,
            product_id: row.product_id.parse()?,
            quantity: row.quantity as u32,
            lot: row.lot,
            expiry: NaiveDate::parse_from_str(&row.expiry, DATE_FORMAT)
                .map_err(|e| Error::Parse(format!("invalid expiry '{}': {e}", row.expiry)))?,
            start_sequence: row.start_sequence as u64,
            box_capacity: row.box_capacity as u32,
            pallet_capacity: row.pallet_capacity as u32,
            status: parse_enum(&row.status, "run status")?,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct UnitRow {
    pub id: String,
    pub run_id: String,
    pub sequence: String,
    pub barcode: String,
    #[sqlx(try_from = "String")]
    pub status: UnitStatus,
    pub container_id: Option<String>,
}

impl TryFrom<UnitRow> for SerializedUnit {
    type Error = Error;

    fn try_from(row: UnitRow) -> Result<Self> {
        Ok(Self {
            id: row.id.parse()?,
            run_id: row.run_id.parse()?,
            sequence: row.sequence,
            barcode: row.barcode,
            status: row.status,
            container_id: row.container_id.as_deref().map(str::parse).transpose()?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct ContainerRow {
    pub id: String,
    pub run_id: String,
    pub kind: String,
    pub shipping_id: String,
    pub parent_id: Option<String>,
}

impl TryFrom<ContainerRow> for PackingContainer {
    type Error = Error;

    fn try_from(row: ContainerRow) -> Result<Self> {
        Ok(Self {
            id: row.id.parse()?,
            run_id: row.run_id.parse()?,
            kind: parse_enum(&row.kind, "container kind")?,
            shipping_id: row.shipping_id,
            parent_id: row.parent_id.as_deref().map(str::parse).transpose()?,
        })
    }
}

/// Converts a batch of rows, failing on the first bad one.
pub(super) fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Fixed-width UTC text, so column ordering follows time ordering.
pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("invalid timestamp '{value}': {e}")))
}

fn parse_enum<T: FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Parse(format!("invalid {what}: {value}")))
}
