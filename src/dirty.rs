//! Dirty interval tracking
//!
//! A single inclusive byte range that grows to cover every write since the
//! last flush. Writes are never tracked individually: two writes far apart
//! mark everything between them.

use std::ops::Range;

/// Inclusive byte range `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRange {
    pub low: u64,
    pub high: u64,
}

impl DirtyRange {
    pub fn new(low: u64, high: u64) -> Self {
        debug_assert!(low <= high);
        Self { low, high }
    }

    /// Range covering `len` bytes starting at `start`; `None` for an empty write
    pub fn covering(start: u64, len: u64) -> Option<Self> {
        if len == 0 {
            None
        } else {
            Some(Self::new(start, start + len - 1))
        }
    }

    /// Number of bytes covered
    pub fn len(&self) -> u64 {
        self.high - self.low + 1
    }

    pub fn contains(&self, byte: u64) -> bool {
        self.low <= byte && byte <= self.high
    }

    /// Smallest range covering both
    pub fn merge(self, other: DirtyRange) -> DirtyRange {
        DirtyRange::new(self.low.min(other.low), self.high.max(other.high))
    }

    /// Half-open index range, for slicing the mirror
    pub fn as_range(&self) -> Range<usize> {
        self.low as usize..self.high as usize + 1
    }
}

/// Accumulates writes into one [`DirtyRange`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    range: Option<DirtyRange>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self { range: None }
    }

    /// Extend the tracked range to cover `len` bytes at `start`
    pub fn mark(&mut self, start: u64, len: u64) {
        if let Some(write) = DirtyRange::covering(start, len) {
            self.mark_range(write);
        }
    }

    pub fn mark_range(&mut self, write: DirtyRange) {
        self.range = Some(match self.range {
            Some(current) => current.merge(write),
            None => write,
        });
    }

    /// Pull the low end of an existing range down to byte 0
    pub fn force_from_start(&mut self) {
        if let Some(current) = self.range.as_mut() {
            current.low = 0;
        }
    }

    /// Drop everything at or beyond `size` bytes
    pub fn clamp_to(&mut self, size: u64) {
        self.range = match self.range {
            Some(r) if r.low >= size => None,
            Some(r) => Some(DirtyRange::new(r.low, r.high.min(size - 1))),
            None => None,
        };
    }

    pub fn get(&self) -> Option<DirtyRange> {
        self.range
    }

    pub fn is_dirty(&self) -> bool {
        self.range.is_some()
    }

    /// Return the current range and mark clean
    pub fn take(&mut self) -> Option<DirtyRange> {
        self.range.take()
    }

    pub fn clear(&mut self) {
        self.range = None;
    }
}
