//! Saturating per-position counters, capped id sets and window layout.

use std::ops::Range;

/// Default cap for per-position counters.
pub const DEFAULT_MAX_COUNT: u16 = u16::MAX;
/// Default cap for the distinct other-sequence id list of a window.
pub const DEFAULT_MAX_DISTINCT_IDS: usize = 300;

/// Fixed-length array of saturating 16-bit counters.
///
/// Increments at or above `max_count` are silently dropped, as are
/// positions beyond the end of the array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaturatingCounts {
    counts: Vec<u16>,
    max_count: u16,
}

impl SaturatingCounts {
    /// Allocate `len` zeroed counters capped at `max_count`.
    pub fn new(len: usize, max_count: u16) -> Self {
        Self {
            counts: vec![0; len],
            max_count,
        }
    }

    /// Number of counters.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// `true` if there are no counters.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Configured cap.
    pub fn max_count(&self) -> u16 {
        self.max_count
    }

    /// Increment one position. Returns `true` if the stored value changed.
    #[inline]
    pub fn increment(&mut self, position: usize) -> bool {
        match self.counts.get_mut(position) {
            Some(count) if *count < self.max_count => {
                *count += 1;
                true
            }
            _ => false,
        }
    }

    /// Increment every position of a half-open range.
    pub fn increment_range(&mut self, range: Range<usize>) {
        let end = range.end.min(self.counts.len());
        let start = range.start.min(end);
        let max = self.max_count;
        for count in &mut self.counts[start..end] {
            if *count < max {
                *count += 1;
            }
        }
    }

    /// Stored value, `0` for out-of-range positions.
    #[inline]
    pub fn get(&self, position: usize) -> u16 {
        self.counts.get(position).copied().unwrap_or(0)
    }

    /// Raw counters.
    pub fn as_slice(&self) -> &[u16] {
        &self.counts
    }
}

/// Outcome of [`CappedIdSet::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdInsert {
    /// Id was not present and has been added.
    Inserted,
    /// Id was already present.
    Present,
    /// Id was absent but the set is full.
    Full,
}

/// Small ordered set of reference ids with a hard capacity.
///
/// Kept as a sorted `Vec` searched with binary search; expected sizes are
/// a handful of ids per window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CappedIdSet {
    ids: Vec<u32>,
    capacity: usize,
}

impl CappedIdSet {
    /// Empty set holding at most `capacity` ids.
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: Vec::new(),
            capacity,
        }
    }

    /// Insert `id` if absent and there is room.
    pub fn insert(&mut self, id: u32) -> IdInsert {
        match self.ids.binary_search(&id) {
            Ok(_) => IdInsert::Present,
            Err(_) if self.ids.len() >= self.capacity => IdInsert::Full,
            Err(slot) => {
                self.ids.insert(slot, id);
                IdInsert::Inserted
            }
        }
    }

    /// Membership test.
    pub fn contains(&self, id: u32) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Number of distinct ids stored.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// `true` if no ids are stored.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `true` once the capacity is reached.
    pub fn is_full(&self) -> bool {
        self.ids.len() >= self.capacity
    }

    /// Stored ids in ascending order.
    pub fn as_slice(&self) -> &[u32] {
        &self.ids
    }
}

/// Interior windows of a sequence, excluding an edge margin at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    length: u64,
    edge_margin: u64,
    window_size: u64,
    num_windows: usize,
}

impl WindowLayout {
    /// Lay out windows over a sequence of `length` bases.
    ///
    /// Returns `None` when no complete interior window fits, i.e. when
    /// `(length - 2 * edge_margin - window_size) / window_size` is zero or
    /// the subtraction underflows.
    pub fn new(length: u64, edge_margin: u64, window_size: u64) -> Option<Self> {
        if window_size == 0 {
            return None;
        }
        let usable = length
            .checked_sub(edge_margin.checked_mul(2)?)?
            .checked_sub(window_size)?;
        let num_windows = (usable / window_size) as usize;
        if num_windows == 0 {
            return None;
        }
        Some(Self {
            length,
            edge_margin,
            window_size,
            num_windows,
        })
    }

    /// Number of windows.
    pub fn num_windows(&self) -> usize {
        self.num_windows
    }

    /// Window width.
    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Edge margin.
    pub fn edge_margin(&self) -> u64 {
        self.edge_margin
    }

    /// First reference position of window `index`.
    pub fn window_start(&self, index: usize) -> u64 {
        self.edge_margin + index as u64 * self.window_size
    }

    /// Window holding `position`, if it is counted at all.
    ///
    /// Positions inside either edge margin are excluded. The index is the
    /// offset from the margin divided by the window size, clipped to the
    /// last window, so the partial stretch before the far margin falls into
    /// the final window.
    pub fn window_of(&self, position: u64) -> Option<usize> {
        if position < self.edge_margin || position >= self.length - self.edge_margin {
            return None;
        }
        let index = ((position - self.edge_margin) / self.window_size) as usize;
        Some(index.min(self.num_windows - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_saturate_at_cap() {
        let mut counts = SaturatingCounts::new(3, 2);
        assert!(counts.increment(1));
        assert!(counts.increment(1));
        assert!(!counts.increment(1));
        assert!(!counts.increment(7));
        assert_eq!(counts.as_slice(), &[0, 2, 0]);
    }

    #[test]
    fn range_increment_is_clipped() {
        let mut counts = SaturatingCounts::new(5, 10);
        counts.increment_range(3..9);
        counts.increment_range(8..12);
        assert_eq!(counts.as_slice(), &[0, 0, 0, 1, 1]);
    }

    #[test]
    fn capped_set_keeps_order_and_capacity() {
        let mut set = CappedIdSet::new(3);
        assert_eq!(set.insert(9), IdInsert::Inserted);
        assert_eq!(set.insert(2), IdInsert::Inserted);
        assert_eq!(set.insert(9), IdInsert::Present);
        assert_eq!(set.insert(5), IdInsert::Inserted);
        assert_eq!(set.insert(1), IdInsert::Full);
        assert_eq!(set.insert(5), IdInsert::Present);
        assert_eq!(set.as_slice(), &[2, 5, 9]);
        assert!(set.is_full());
    }

    #[test]
    fn window_layout_for_ten_kilobases() {
        let layout = WindowLayout::new(10_000, 4_000, 500).unwrap();
        assert_eq!(layout.num_windows(), 3);
        assert_eq!(layout.window_of(3_999), None);
        assert_eq!(layout.window_of(4_000), Some(0));
        assert_eq!(layout.window_of(4_499), Some(0));
        assert_eq!(layout.window_of(5_499), Some(2));
        // past the last complete window, clipped into it
        assert_eq!(layout.window_of(5_500), Some(2));
        assert_eq!(layout.window_of(5_999), Some(2));
        assert_eq!(layout.window_of(6_000), None);
        assert_eq!(layout.window_start(2), 5_000);
    }

    #[test]
    fn window_index_divides_offset_rather_than_taking_remainder() {
        // `(pos - edge) / window` picks the window; `(pos - edge) % window`
        // would give 0, 499, 0 and 499 here.
        let layout = WindowLayout::new(10_000, 4_000, 500).unwrap();
        let windows: Vec<_> = [4_000, 4_499, 4_500, 5_499]
            .into_iter()
            .map(|pos| layout.window_of(pos))
            .collect();
        assert_eq!(windows, vec![Some(0), Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn short_sequences_have_no_layout() {
        assert!(WindowLayout::new(8_000, 4_000, 500).is_none());
        assert!(WindowLayout::new(8_999, 4_000, 500).is_none());
        assert!(WindowLayout::new(9_000, 4_000, 500).is_some());
        assert!(WindowLayout::new(9_000, 4_000, 0).is_none());
    }
}
