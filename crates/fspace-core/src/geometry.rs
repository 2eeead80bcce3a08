#![forbid(unsafe_code)]

//! Integer grid geometry.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle on the layout grid.
///
/// Grid coordinates are 0-indexed with the origin at the top-left. The
/// right and bottom edges are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridRect {
    /// Left column (inclusive).
    pub x: u32,
    /// Top row (inclusive).
    pub y: u32,
    /// Width in columns.
    pub w: u32,
    /// Height in rows.
    pub h: u32,
}

impl GridRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Left edge (inclusive). Alias for `self.x`.
    #[inline]
    pub const fn left(&self) -> u32 {
        self.x
    }

    /// Top edge (inclusive). Alias for `self.y`.
    #[inline]
    pub const fn top(&self) -> u32 {
        self.y
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Right edge (exclusive), widened so it never saturates.
    #[inline]
    pub const fn right_wide(&self) -> u64 {
        self.x as u64 + self.w as u64
    }

    /// Bottom edge (exclusive), widened so it never saturates.
    #[inline]
    pub const fn bottom_wide(&self) -> u64 {
        self.y as u64 + self.h as u64
    }

    /// Area in cells.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Check if a cell is inside the rectangle.
    #[inline]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x
            && (x as u64) < self.right_wide()
            && y >= self.y
            && (y as u64) < self.bottom_wide()
    }

    /// True iff the two rectangles intersect with positive area.
    ///
    /// Edge-adjacent rectangles do not overlap, and an empty rectangle
    /// overlaps nothing. Edges are compared in `u64`, so rectangles at the
    /// far end of the grid keep their full extent.
    #[inline]
    pub const fn overlaps(&self, other: &GridRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.x as u64) < other.right_wide()
            && self.right_wide() > other.x as u64
            && (self.y as u64) < other.bottom_wide()
            && self.bottom_wide() > other.y as u64
    }

    /// Compute the intersection with another rectangle, returning `None` if no overlap.
    #[inline]
    pub fn intersection_opt(&self, other: &GridRect) -> Option<GridRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right_wide().min(other.right_wide());
        let bottom = self.bottom_wide().min(other.bottom_wide());

        if u64::from(x) < right && u64::from(y) < bottom {
            // Bounded by the narrower input's size, so both fit in u32.
            let w = u32::try_from(right - u64::from(x)).ok()?;
            let h = u32::try_from(bottom - u64::from(y)).ok()?;
            Some(GridRect::new(x, y, w, h))
        } else {
            None
        }
    }

    /// Compute the intersection with another rectangle.
    ///
    /// Returns an empty rectangle if the rectangles don't overlap.
    #[inline]
    pub fn intersection(&self, other: &GridRect) -> GridRect {
        self.intersection_opt(other).unwrap_or_default()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &GridRect) -> GridRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        GridRect {
            x,
            y,
            w: right.saturating_sub(x),
            h: bottom.saturating_sub(y),
        }
    }

    /// Same rectangle moved to row `y`.
    #[inline]
    #[must_use]
    pub const fn with_y(self, y: u32) -> Self {
        Self { y, ..self }
    }
}
