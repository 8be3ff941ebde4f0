//! Proptest strategies for sequence scripts.
//!
//! Generate repetition bounds and invocation orders for property-based
//! testing of the ordering and budget invariants.
//!
//! ```rust,ignore
//! proptest! {
//!     #[test]
//!     fn prop_only_declared_order_passes(order in shuffled_order(5)) {
//!         // declare five single-use steps, invoke in `order`, and assert
//!         // success exactly when `order` is the identity permutation
//!     }
//! }
//! ```

use crate::times::Times;

#[cfg(feature = "proptest")]
use proptest::prelude::*;

/// Generate any repetition bound with small, test-friendly limits
#[cfg(feature = "proptest")]
pub fn any_times() -> impl Strategy<Value = Times> {
    prop_oneof![
        (1u64..5).prop_map(Times::exactly),
        (0u64..4).prop_map(Times::at_least),
        (1u64..5).prop_map(Times::at_most),
        (0u64..3, 0u64..3).prop_map(|(min, extra)| Times::between(min, min + extra)),
        Just(Times::any()),
    ]
}

/// Generate a bound that demands at least one match
#[cfg(feature = "proptest")]
pub fn mandatory_times() -> impl Strategy<Value = Times> {
    prop_oneof![
        (1u64..4).prop_map(Times::exactly),
        (1u64..4).prop_map(Times::at_least),
        (1u64..3, 0u64..3).prop_map(|(min, extra)| Times::between(min, min + extra)),
    ]
}

/// Generate a permutation of `0..len`: an invocation order over a script
/// of `len` distinct single-use steps
#[cfg(feature = "proptest")]
pub fn shuffled_order(len: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..len).collect::<Vec<usize>>()).prop_shuffle()
}

/// Edge-case bounds worth running any new matching logic against
#[must_use]
pub fn edge_case_bounds() -> Vec<Times> {
    vec![
        Times::never(),
        Times::once(),
        Times::exactly(2),
        Times::at_least_once(),
        Times::at_most_once(),
        Times::between(1, 2),
        Times::any(),
    ]
}
