//! Region reservation over the blob's byte-offset space.
//!
//! Exclusive reservations claim bytes outright and fail on any overlap.
//! Non-exclusive reservations always succeed; they mark bytes that must not
//! become a later exclusive claim without asserting ownership of them.
//!
//! [`RegionLayout`] is a plain value. Placement search clones it before
//! trying a branch and drops the clone if the branch fails.

use std::fmt;

/// One recorded byte range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// First byte
    pub start: usize,
    /// One past the last byte
    pub end: usize,
    /// Whether this region was claimed exclusively
    pub exclusive: bool,
    /// Diagnostic label, never interpreted
    pub label: String,
}

impl Region {
    /// Whether this region intersects `[start, end)`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Set of reserved regions, kept sorted by start offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionLayout {
    regions: Vec<Region>,
}

impl RegionLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `[start, end)`.
    ///
    /// Exclusive reservations succeed only when nothing recorded overlaps
    /// the range, and leave the layout untouched otherwise. Non-exclusive
    /// reservations always succeed. Empty ranges are never recorded.
    pub fn reserve(
        &mut self,
        start: usize,
        end: usize,
        exclusive: bool,
        label: impl Into<String>,
    ) -> bool {
        if start >= end {
            return true;
        }
        if exclusive && !self.is_free(start, end) {
            return false;
        }

        let idx = self.regions.partition_point(|r| r.start <= start);
        self.regions.insert(idx, Region { start, end, exclusive, label: label.into() });
        true
    }

    /// Whether no recorded region intersects `[start, end)`.
    pub fn is_free(&self, start: usize, end: usize) -> bool {
        if start >= end {
            return true;
        }
        // Only regions starting before `end` can intersect.
        let candidates = self.regions.partition_point(|r| r.start < end);
        !self.regions[..candidates].iter().any(|r| r.overlaps(start, end))
    }

    /// Visit each maximal free gap of `[0, max_offset)` in increasing order.
    pub fn scan_free(&self, max_offset: usize, mut visit: impl FnMut(usize, usize)) {
        let mut cursor = 0;

        for region in &self.regions {
            if region.start >= max_offset {
                break;
            }
            if region.start > cursor {
                visit(cursor, region.start);
            }
            cursor = cursor.max(region.end);
        }

        if cursor < max_offset {
            visit(cursor, max_offset);
        }
    }

    /// Recorded regions, sorted by start offset.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Largest end offset over all recorded regions.
    pub fn max_end(&self) -> usize {
        self.regions.iter().map(|r| r.end).max().unwrap_or(0)
    }
}

impl fmt::Display for RegionLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for region in &self.regions {
            let kind = if region.exclusive { "excl" } else { "shared" };
            writeln!(f, "[{:>6}, {:>6}) {kind:<6} {}", region.start, region.end, region.label)?;
        }
        Ok(())
    }
}
