//! Property-based tests for identifier codecs and the packing partition.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use packtrace_core::{
    aggregation::plan_aggregation,
    domain::{RunId, SerializedUnit, UnitId, UnitStatus},
    gs1::{self, SerialRange, SsccGenerator},
};
use proptest::prelude::*;

fn fast_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        max_shrink_iters: 256,
        ..ProptestConfig::default()
    }
}

fn units(run_id: RunId, n: usize) -> Vec<SerializedUnit> {
    (1..=n)
        .map(|i| SerializedUnit {
            id: UnitId::new(),
            run_id,
            sequence: i.to_string(),
            barcode: format!("(01)00123456789012(21){i}"),
            status: UnitStatus::Generated,
            container_id: None,
        })
        .collect()
}

#[test]
fn test_known_gtin_check_digit() {
    assert_eq!(gs1::gtin_check_digit("12345678901").unwrap(), 4);
    assert!(gs1::validate_gtin("123456789014"));
    assert!(!gs1::validate_gtin("123456789013"));
}

proptest! {
    #![proptest_config(fast_config())]

    /// Appending the computed check digit always yields a valid GTIN.
    #[test]
    fn prop_gtin_with_check_digit_validates(body in "[0-9]{7,13}") {
        let check = gs1::gtin_check_digit(&body).unwrap();
        let gtin = format!("{body}{check}");
        prop_assert!(gs1::validate_gtin(&gtin));
    }

    #[test]
    fn prop_gtin_wrong_check_digit_fails(body in "[0-9]{7,13}", delta in 1u8..10) {
        let check = gs1::gtin_check_digit(&body).unwrap();
        let wrong = (check + delta) % 10;
        let gtin = format!("{body}{wrong}");
        prop_assert!(!gs1::validate_gtin(&gtin));
    }

    /// Changing any single digit of a minted SSCC breaks its check digit.
    #[test]
    fn prop_sscc_single_digit_mutation_fails(
        prefix in "[0-9]{7}",
        serial in 1u64..499_999_999,
        pos in 0usize..18,
        delta in 1u8..10,
    ) {
        let generator = SsccGenerator::starting_at(&prefix, SerialRange::boxes(500_000_000), serial).unwrap();
        let code = generator.next().unwrap();
        prop_assert_eq!(code.len(), 18);
        prop_assert!(gs1::validate_sscc(&code));
        prop_assert_eq!(gs1::serial_of(&code, &prefix), Some(serial));

        let mut digits: Vec<u8> = code.bytes().map(|b| b - b'0').collect();
        digits[pos] = (digits[pos] + delta) % 10;
        let mutated: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        prop_assert!(!gs1::validate_sscc(&mutated));
    }

    /// Every unit lands in exactly one box and box counts follow ceiling
    /// division at both levels.
    #[test]
    fn prop_partition_counts(n in 1usize..120, box_cap in 1u32..15, pallet_cap in 1u32..6) {
        let run_id = RunId::new();
        let units = units(run_id, n);
        let boxes = SsccGenerator::new("1234567", SerialRange::boxes(500_000_000), 0).unwrap();
        let pallets = SsccGenerator::new("1234567", SerialRange::pallets(500_000_000), 0).unwrap();

        let plan = plan_aggregation(run_id, &units, box_cap, pallet_cap, &boxes, &pallets).unwrap();

        let expected_boxes = n.div_ceil(box_cap as usize);
        prop_assert_eq!(plan.boxes.len(), expected_boxes);
        prop_assert_eq!(plan.pallets.len(), expected_boxes.div_ceil(pallet_cap as usize));
        prop_assert_eq!(plan.boxes.iter().map(|b| b.unit_ids.len()).sum::<usize>(), n);
        prop_assert!(plan.boxes.iter().all(|b| b.unit_ids.len() <= box_cap as usize));
        prop_assert!(plan.pallets.iter().all(|p| p.box_ids.len() <= pallet_cap as usize));
    }
}
