//! Property-based invariant tests for `GridRect`.
//!
//! 1. Overlap is symmetric.
//! 2. Overlap agrees with a non-empty intersection.
//! 3. A non-empty rect overlaps itself; an empty rect overlaps nothing.
//! 4. Moving a rect below another's bottom edge clears the overlap.
//! 5. Union contains both inputs.
//! 6. Overlap matches the positive-area formula evaluated in u64, across
//!    the whole coordinate space.

use fspace_core::geometry::GridRect;
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn small_rect_strategy() -> impl Strategy<Value = GridRect> {
    (0u32..=64, 0u32..=64, 0u32..=16, 0u32..=16).prop_map(|(x, y, w, h)| GridRect::new(x, y, w, h))
}

fn rect_strategy() -> impl Strategy<Value = GridRect> {
    (any::<u32>(), any::<u32>(), any::<u32>(), any::<u32>())
        .prop_map(|(x, y, w, h)| GridRect::new(x, y, w, h))
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Overlap is symmetric
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn overlap_symmetric(a in small_rect_strategy(), b in small_rect_strategy()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a), "a={:?}, b={:?}", a, b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Overlap agrees with intersection
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn overlap_matches_intersection(a in small_rect_strategy(), b in small_rect_strategy()) {
        prop_assert_eq!(a.overlaps(&b), a.intersection_opt(&b).is_some());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Self overlap
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn self_overlap_iff_non_empty(a in small_rect_strategy()) {
        prop_assert_eq!(a.overlaps(&a), !a.is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Shifting below clears overlap
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn shift_below_clears_overlap(a in small_rect_strategy(), b in small_rect_strategy()) {
        let moved = a.with_y(b.bottom());
        prop_assert!(!moved.overlaps(&b), "moved={:?}, b={:?}", moved, b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Union contains both
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn union_contains_both(a in small_rect_strategy(), b in small_rect_strategy()) {
        let u = a.union(&b);
        prop_assert!(u.left() <= a.left() && u.left() <= b.left());
        prop_assert!(u.top() <= a.top() && u.top() <= b.top());
        prop_assert!(u.right() >= a.right() && u.right() >= b.right());
        prop_assert!(u.bottom() >= a.bottom() && u.bottom() >= b.bottom());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Wide reference
// ═════════════════════════════════════════════════════════════════════════

fn reference_overlap(a: GridRect, b: GridRect) -> bool {
    let (ax, ay, aw, ah) = (u64::from(a.x), u64::from(a.y), u64::from(a.w), u64::from(a.h));
    let (bx, by, bw, bh) = (u64::from(b.x), u64::from(b.y), u64::from(b.w), u64::from(b.h));
    aw > 0 && ah > 0 && bw > 0 && bh > 0 && ax < bx + bw && ax + aw > bx && ay < by + bh && ay + ah > by
}

fn far_edge_rect_strategy() -> impl Strategy<Value = GridRect> {
    (
        (u32::MAX - 8)..=u32::MAX,
        (u32::MAX - 8)..=u32::MAX,
        0u32..=16,
        0u32..=16,
    )
        .prop_map(|(x, y, w, h)| GridRect::new(x, y, w, h))
}

proptest! {
    #[test]
    fn overlap_matches_wide_reference(a in rect_strategy(), b in rect_strategy()) {
        prop_assert_eq!(a.overlaps(&b), reference_overlap(a, b), "a={:?}, b={:?}", a, b);
        prop_assert_eq!(a.overlaps(&b), a.intersection_opt(&b).is_some());
    }

    #[test]
    fn overlap_matches_wide_reference_at_far_edge(
        a in far_edge_rect_strategy(),
        b in far_edge_rect_strategy(),
    ) {
        prop_assert_eq!(a.overlaps(&b), reference_overlap(a, b), "a={:?}, b={:?}", a, b);
        prop_assert_eq!(a.overlaps(&a), !a.is_empty());
    }
}

proptest! {
    #[test]
    fn no_panic_on_extreme_values(a in rect_strategy(), b in rect_strategy()) {
        let _ = a.overlaps(&b);
        let _ = a.intersection(&b);
        let _ = a.union(&b);
        let _ = a.area();
    }
}
