//! Debug assertion macros for the invariants documented in `SPEC_FULL.md` §5
//! and spec.md §8. Only active in debug builds, zero overhead in release.

// =============================================================================
// INV-Q-01: Bounded Count
// =============================================================================

/// Assert `0 <= available <= capacity` for the bounded queue.
macro_rules! debug_assert_queue_bounded {
    ($available:expr, $capacity:expr) => {
        debug_assert!(
            $available <= $capacity,
            "INV-Q-01 violated: available {} exceeds capacity {}",
            $available,
            $capacity
        )
    };
}

// =============================================================================
// INV-Q-02: Admission-Order Bookkeeping
// =============================================================================

/// Assert that the ordering table entry just appended belongs to the request
/// that was just admitted (keeps `admit` and the per-image table in sync).
macro_rules! debug_assert_ordering_matches_admission {
    ($table_tail:expr, $req_id:expr) => {
        debug_assert!(
            $table_tail == $req_id,
            "INV-Q-02 violated: ordering table tail {} does not match admitted request {}",
            $table_tail,
            $req_id
        )
    };
}

// =============================================================================
// INV-ORD-01: Turn Gate Release Matches Waiter
// =============================================================================

/// Assert that after a release the given request is no longer at the front
/// of its image's queue (it was popped, or was never there — idempotent).
macro_rules! debug_assert_released {
    ($new_front:expr, $req_id:expr) => {
        debug_assert!(
            $new_front != Some($req_id),
            "INV-ORD-01 violated: request {} still at front after release",
            $req_id
        )
    };
}

// =============================================================================
// INV-STORE-01: Store Monotonicity
// =============================================================================

/// Assert that a freshly allocated image ID equals the pre-insert store length.
macro_rules! debug_assert_store_monotonic {
    ($new_id:expr, $pre_len:expr) => {
        debug_assert!(
            $new_id as usize == $pre_len,
            "INV-STORE-01 violated: new id {} does not equal pre-insert length {}",
            $new_id,
            $pre_len
        )
    };
}

pub(crate) use debug_assert_ordering_matches_admission;
pub(crate) use debug_assert_queue_bounded;
pub(crate) use debug_assert_released;
pub(crate) use debug_assert_store_monotonic;
