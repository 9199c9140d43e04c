//! Tests for growth planning
//!
//! `plan_growth` is pure, so these check the policy arithmetic directly.

use bitbox::bitarray::{plan_growth, Growth};
use proptest::prelude::*;

// =============================================================================
// Fixed Cases
// =============================================================================

#[test]
fn test_target_inside_window_needs_no_growth() {
    assert_eq!(plan_growth(4, 10, 10), None);
    assert_eq!(plan_growth(4, 10, 13), None);
}

#[test]
fn test_grow_up_by_needed_amount() {
    // window [0, 1), target 125
    let growth = plan_growth(1, 0, 125).unwrap();

    assert_eq!(
        growth,
        Growth {
            new_len: 126,
            new_offset: 0,
            shift: 0
        }
    );
}

#[test]
fn test_grow_up_doubles_small_steps() {
    // window [0, 10), target 10 needs 1 byte; doubling wins
    let growth = plan_growth(10, 0, 10).unwrap();

    assert_eq!(growth.new_len, 20);
    assert_eq!(growth.new_offset, 0);
}

#[test]
fn test_grow_up_keeps_offset() {
    let growth = plan_growth(2, 50, 60).unwrap();

    assert_eq!(growth.new_offset, 50);
    assert_eq!(growth.shift, 0);
    assert_eq!(growth.new_len, 11);
}

#[test]
fn test_grow_down_by_needed_amount() {
    // window [10, 11), target 0
    let growth = plan_growth(1, 10, 0).unwrap();

    assert_eq!(
        growth,
        Growth {
            new_len: 11,
            new_offset: 0,
            shift: 10
        }
    );
}

#[test]
fn test_grow_down_doubles_small_steps() {
    // window [100, 110), target 99 needs 1 byte; doubling gives 20
    let growth = plan_growth(10, 100, 99).unwrap();

    assert_eq!(growth.new_len, 20);
    assert_eq!(growth.new_offset, 90);
    assert_eq!(growth.shift, 10);
}

#[test]
fn test_grow_down_clamps_at_zero() {
    // window [3, 7), doubling to 8 would start at -1
    let growth = plan_growth(4, 3, 2).unwrap();

    assert_eq!(
        growth,
        Growth {
            new_len: 7,
            new_offset: 0,
            shift: 3
        }
    );
}

#[test]
#[should_panic(expected = "empty window")]
fn test_empty_window_panics() {
    plan_growth(0, 0, 5);
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_growth_covers_target_and_old_window(
        len in 1u64..4096,
        offset in 0u64..(1 << 20),
        target in 0u64..(1 << 21),
    ) {
        match plan_growth(len, offset, target) {
            None => {
                prop_assert!(offset <= target && target < offset + len);
            }
            Some(growth) => {
                prop_assert!(growth.new_offset <= target && target < growth.end());
                prop_assert!(growth.new_offset <= offset);
                prop_assert!(growth.end() >= offset + len);
                prop_assert_eq!(growth.shift, offset - growth.new_offset);
                prop_assert!(growth.shift + len <= growth.new_len);
            }
        }
    }

    #[test]
    fn prop_growth_at_least_doubles_unless_clamped(
        len in 1u64..4096,
        offset in 0u64..(1 << 20),
        target in 0u64..(1 << 21),
    ) {
        if let Some(growth) = plan_growth(len, offset, target) {
            let clamped = target < offset && growth.new_offset == 0 && growth.new_len == offset + len;
            if !clamped {
                prop_assert!(growth.new_len >= len * 2);
            }
        }
    }

    #[test]
    fn prop_growth_is_one_directional(
        len in 1u64..4096,
        offset in 0u64..(1 << 20),
        target in 0u64..(1 << 21),
    ) {
        if let Some(growth) = plan_growth(len, offset, target) {
            if target >= offset + len {
                prop_assert_eq!(growth.new_offset, offset);
            } else {
                prop_assert_eq!(growth.end(), offset + len);
            }
        }
    }
}
