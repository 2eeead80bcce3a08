//! Overlap resolution for grid views.
//!
//! Two strategies are provided:
//!
//! - [`reconcile_grid`]: first-writer-wins removal. Placements are visited in
//!   order; any placement overlapping an already kept one is dropped.
//! - [`shift_overlaps_down`]: every placement keeps a slot. A placement that
//!   overlaps an earlier one is pushed to that placement's bottom edge, and
//!   the check repeats until it overlaps no earlier placement.
//!
//! Both are O(n²) in the number of placements of one view, which is small.

use crate::model::GridPlacement;

/// Result of [`reconcile_grid`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// Surviving placements, in input order, pairwise non-overlapping.
    pub kept: Vec<GridPlacement>,
    /// Ids of dropped placements, in input order.
    pub removed: Vec<String>,
}

impl ReconcileOutcome {
    /// Ids of the kept placements.
    #[must_use]
    pub fn kept_ids(&self) -> Vec<&str> {
        self.kept.iter().map(|p| p.i.as_str()).collect()
    }
}

/// Drop every placement that overlaps an earlier kept placement.
#[must_use]
pub fn reconcile_grid(placements: &[GridPlacement]) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();
    for candidate in placements {
        if outcome.kept.iter().any(|kept| kept.overlaps(candidate)) {
            outcome.removed.push(candidate.i.clone());
        } else {
            outcome.kept.push(candidate.clone());
        }
    }
    outcome
}

/// One placement moved by [`shift_overlaps_down`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftedPlacement {
    pub id: String,
    pub before_y: u32,
    pub after_y: u32,
}

/// Push overlapping placements downward until no pair overlaps.
///
/// Earlier placements never move. Each shift strictly increases `y`, so the
/// loop for one placement terminates once it clears every earlier bottom
/// edge. A placement whose next row would fall past `u32::MAX` cannot be
/// cleared; it is put back at its original row and left overlapping, for
/// [`reconcile_grid`] to drop.
pub fn shift_overlaps_down(placements: &mut [GridPlacement]) -> Vec<ShiftedPlacement> {
    let mut shifted = Vec::new();
    for index in 1..placements.len() {
        let (earlier, rest) = placements.split_at_mut(index);
        let current = &mut rest[0];
        let before_y = current.y;

        while let Some(blocker) = earlier.iter().find(|b| b.overlaps(current)) {
            match u32::try_from(blocker.rect().bottom_wide()) {
                Ok(next_y) if next_y > current.y => current.y = next_y,
                _ => {
                    current.y = before_y;
                    break;
                }
            }
        }

        if current.y != before_y {
            shifted.push(ShiftedPlacement {
                id: current.i.clone(),
                before_y,
                after_y: current.y,
            });
        }
    }
    shifted
}

/// First overlapping pair `(earlier, later)` by index, if any.
#[must_use]
pub fn first_overlap(placements: &[GridPlacement]) -> Option<(usize, usize)> {
    placements.iter().enumerate().find_map(|(later, candidate)| {
        placements[..later]
            .iter()
            .position(|earlier| earlier.overlaps(candidate))
            .map(|earlier| (earlier, later))
    })
}
