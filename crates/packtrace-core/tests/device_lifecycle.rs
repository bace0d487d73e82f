//! Print, verify and retry against a real store.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod common;

use chrono::Utc;
use packtrace_core::{
    domain::{CreateRun, ProductionRun, RunId, RunStatus, SerializedUnit, UnitId, UnitStatus},
    sim::DeviceOutcome,
    store::UnitQuery,
    ErrorKind,
};

use common::{config, fixture, fixture_with, Fixture};

async fn units_of(fx: &Fixture, run_id: RunId) -> Vec<SerializedUnit> {
    fx.services
        .store
        .list_units(run_id, UnitQuery::default())
        .await
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_print_moves_generated_unit_to_printed() {
    let fx = fixture().await.unwrap();
    let run = fx.run(3, 10, 10, 1).await.unwrap();
    let unit = units_of(&fx, run.id).await.remove(0);

    let result = fx.services.printer.print(unit.id).await.unwrap();

    assert_eq!(result.outcome, DeviceOutcome::Completed);
    assert_eq!(result.status, UnitStatus::Printed);
    let stored = fx.services.store.get_unit(unit.id).await.unwrap();
    assert_eq!(stored.status, UnitStatus::Printed);
}

#[tokio::test]
async fn test_printing_a_printed_unit_is_a_state_mismatch() {
    let fx = fixture().await.unwrap();
    let run = fx.run(1, 10, 10, 1).await.unwrap();
    let unit = units_of(&fx, run.id).await.remove(0);
    fx.services.printer.print(unit.id).await.unwrap();

    let again = fx.services.printer.print(unit.id).await.unwrap();

    assert_eq!(
        again.outcome,
        DeviceOutcome::StateMismatch {
            current: UnitStatus::Printed
        }
    );
    assert!(again.message.contains("printed"));
    let stored = fx.services.store.get_unit(unit.id).await.unwrap();
    assert_eq!(stored.status, UnitStatus::Printed);
}

#[tokio::test]
async fn test_printer_fault_leaves_unit_generated() {
    let fx = fixture_with(config(0.0, 1.0, 7)).await.unwrap();
    let run = fx.run(2, 10, 10, 1).await.unwrap();

    let report = fx.services.printer.print_batch(run.id, None).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 2);
    assert!(report
        .details
        .iter()
        .all(|r| r.outcome == DeviceOutcome::DeviceFault));
    assert!(units_of(&fx, run.id)
        .await
        .iter()
        .all(|u| u.status == UnitStatus::Generated));
}

#[tokio::test]
async fn test_print_batch_follows_sequence_order_and_limit() {
    let fx = fixture().await.unwrap();
    let run = fx.run(12, 10, 10, 95).await.unwrap();

    let report = fx
        .services
        .printer
        .print_batch(run.id, Some(5))
        .await
        .unwrap();

    let printed: Vec<&str> = report.details.iter().map(|r| r.sequence.as_str()).collect();
    assert_eq!(
        printed,
        vec![
            "0000000095",
            "0000000096",
            "0000000097",
            "0000000098",
            "0000000099"
        ]
    );
    assert_eq!(report.succeeded, 5);

    let rest = fx.services.printer.print_batch(run.id, Some(0)).await.unwrap();
    assert_eq!(rest.total, 7);
    assert_eq!(rest.details[0].sequence, "0000000100");
}

#[tokio::test]
async fn test_print_unknown_unit_is_not_found() {
    let fx = fixture().await.unwrap();
    let err = fx.services.printer.print(UnitId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_print_batch_unknown_run_is_not_found() {
    let fx = fixture().await.unwrap();
    let err = fx
        .services
        .printer
        .print_batch(RunId::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ═══════════════════════════════════════════════════════════════════════════
// VERIFIER
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_verify_requires_printed_status() {
    let fx = fixture().await.unwrap();
    let run = fx.run(1, 10, 10, 1).await.unwrap();
    let unit = units_of(&fx, run.id).await.remove(0);

    let result = fx.services.verifier.verify(unit.id).await.unwrap();

    assert_eq!(
        result.outcome,
        DeviceOutcome::StateMismatch {
            current: UnitStatus::Generated
        }
    );
    assert!(result.scanned.is_none());
    let stored = fx.services.store.get_unit(unit.id).await.unwrap();
    assert_eq!(stored.status, UnitStatus::Generated);
}

#[tokio::test]
async fn test_verify_batch_verifies_printed_units() {
    let fx = fixture().await.unwrap();
    let run = fx.run(4, 10, 10, 1).await.unwrap();
    fx.services.printer.print_batch(run.id, Some(3)).await.unwrap();

    let report = fx.services.verifier.verify_batch(run.id).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 3);
    for result in &report.details {
        assert_eq!(result.status, UnitStatus::Verified);
        assert_eq!(result.scanned.as_deref(), Some(result.expected.as_str()));
    }
    let generated = fx
        .services
        .store
        .list_units(run.id, UnitQuery::with_status(UnitStatus::Generated))
        .await
        .unwrap();
    assert_eq!(generated.len(), 1);
}

#[tokio::test]
async fn test_misread_rejects_unit_with_sentinel_in_scan() {
    let fx = fixture_with(config(1.0, 0.0, 11)).await.unwrap();
    let run = fx.run(1, 10, 10, 1).await.unwrap();
    let unit = units_of(&fx, run.id).await.remove(0);
    fx.services.printer.print(unit.id).await.unwrap();

    let result = fx.services.verifier.verify(unit.id).await.unwrap();

    assert_eq!(result.outcome, DeviceOutcome::DeviceFault);
    assert_eq!(result.status, UnitStatus::Rejected);
    let scanned = result.scanned.unwrap();
    assert_ne!(scanned, result.expected);
    assert_eq!(scanned.chars().filter(|c| *c == '?').count(), 1);
    assert_eq!(scanned.chars().count(), result.expected.chars().count());
}

#[tokio::test]
async fn test_misread_differs_even_when_lot_is_all_sentinels() {
    let fx = fixture_with(config(1.0, 0.0, 5)).await.unwrap();
    let params = CreateRun::new(fx.product.id, 20, "?".repeat(200), common::expiry());
    let run = fx.services.runs.create_run(params).await.unwrap();
    fx.services.printer.print_batch(run.id, None).await.unwrap();

    let report = fx.services.verifier.verify_batch(run.id).await.unwrap();

    assert_eq!(report.failed, 20);
    for result in &report.details {
        assert_eq!(result.outcome, DeviceOutcome::DeviceFault);
        assert_ne!(result.scanned.as_deref(), Some(result.expected.as_str()));
    }
}

#[tokio::test]
async fn test_barcode_without_serial_tag_is_rejected() {
    let fx = fixture().await.unwrap();
    let run = ProductionRun {
        id: RunId::new(),
        product_id: fx.product.id,
        quantity: 1,
        lot: "LOT-X".into(),
        expiry: common::expiry(),
        start_sequence: 1,
        box_capacity: 10,
        pallet_capacity: 10,
        status: RunStatus::Created,
        created_at: Utc::now(),
    };
    let unit = SerializedUnit {
        id: UnitId::new(),
        run_id: run.id,
        sequence: "0000000001".into(),
        barcode: "(01)01234567890128(17)270309(10)LOT-X".into(),
        status: UnitStatus::Printed,
        container_id: None,
    };
    fx.services.store.insert_run(&run, &[unit.clone()]).await.unwrap();

    let result = fx.services.verifier.verify(unit.id).await.unwrap();

    assert_eq!(result.status, UnitStatus::Rejected);
    assert_eq!(result.outcome, DeviceOutcome::DeviceFault);
    assert!(result.message.contains("format"));
}

#[tokio::test]
async fn test_retry_only_applies_to_rejected_units() {
    let fx = fixture_with(config(1.0, 0.0, 3)).await.unwrap();
    let run = fx.run(2, 10, 10, 1).await.unwrap();
    let units = units_of(&fx, run.id).await;
    fx.services.printer.print_batch(run.id, None).await.unwrap();
    fx.services.verifier.verify(units[0].id).await.unwrap();

    let retried = fx.services.verifier.retry(units[0].id).await.unwrap();
    assert_eq!(retried.outcome, DeviceOutcome::Completed);
    assert_eq!(retried.status, UnitStatus::Verified);

    let refused = fx.services.verifier.retry(units[1].id).await.unwrap();
    assert_eq!(
        refused.outcome,
        DeviceOutcome::StateMismatch {
            current: UnitStatus::Printed
        }
    );
    let stored = fx.services.store.get_unit(units[1].id).await.unwrap();
    assert_eq!(stored.status, UnitStatus::Printed);
}

// ═══════════════════════════════════════════════════════════════════════════
// DETERMINISM
// ═══════════════════════════════════════════════════════════════════════════

async fn outcomes_with_seed(seed: u64) -> Vec<(String, UnitStatus)> {
    let fx = fixture_with(config(0.5, 0.5, seed)).await.unwrap();
    let run = fx.run(20, 10, 10, 1).await.unwrap();
    fx.services.printer.print_batch(run.id, None).await.unwrap();
    fx.services.verifier.verify_batch(run.id).await.unwrap();
    units_of(&fx, run.id)
        .await
        .into_iter()
        .map(|u| (u.sequence, u.status))
        .collect()
}

#[tokio::test]
async fn test_same_seed_reproduces_device_outcomes() {
    let first = outcomes_with_seed(1234).await;
    let second = outcomes_with_seed(1234).await;
    assert_eq!(first, second);
}
