//! Property-based test generators using proptest.
//!
//! Provides strategies for generating dirty-flag layouts, remote ids and
//! timestamps.

use proptest::prelude::*;

/// Strategy for generating remote record ids.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("00[1-9A-Z][0-9A-Za-z]{12}").expect("Invalid regex")
}

/// Strategy for generating the dirty flags of a set of local hierarchies.
///
/// Each entry holds the parent's flag and the flags of its children.
/// Childless parents are included.
pub fn dirty_pattern_strategy(
    max_parents: usize,
    max_children: usize,
) -> impl Strategy<Value = Vec<(bool, Vec<bool>)>> {
    prop::collection::vec(
        (any::<bool>(), prop::collection::vec(any::<bool>(), 0..=max_children)),
        1..=max_parents,
    )
}

/// Strategy for generating epoch milliseconds between 1970 and 2100.
pub fn timestamp_millis_strategy() -> impl Strategy<Value = i64> {
    0i64..4_102_444_800_000
}

/// Expected dirty parents for a pattern, by position.
pub fn expected_dirty(pattern: &[(bool, Vec<bool>)]) -> Vec<bool> {
    pattern
        .iter()
        .map(|(parent, children)| *parent || children.iter().any(|c| *c))
        .collect()
}
