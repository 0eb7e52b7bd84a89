//! Circular block tracking for radial key layouts.
//!
//! A radial layout splits a ring into `N` equal blocks numbered around the
//! circle. While a finger travels along the ring the host reports which block
//! it is over; [`BlockTracker`] turns that stream of absolute indices into a
//! signed count of how many blocks the finger has moved since the first
//! sample, and in which rotational sense.
//!
//! Crossing the seam between block `N - 1` and block `0` looks like a jump of
//! `N - 1` blocks; it is counted as a single step in the opposite sense. After
//! a full revolution plus one block the count folds back to `±1`, so the
//! selection wraps instead of growing without bound.
//!
//! ```
//! use kuaizi_ime::BlockTracker;
//!
//! let mut tracker = BlockTracker::new(8);
//! tracker.update(7);
//! tracker.update(0);
//! assert_eq!(tracker.diff(), 1);
//! ```

/// Accumulates a wrap-aware signed block difference over one press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTracker {
    total_blocks: usize,
    start_block: Option<usize>,
    current_block: Option<usize>,
    diff: i32,
}

impl BlockTracker {
    /// Creates a tracker for a ring of `total_blocks` blocks.
    pub fn new(total_blocks: usize) -> Self {
        Self {
            total_blocks,
            start_block: None,
            current_block: None,
            diff: 0,
        }
    }

    /// Clears all tracked state.
    pub fn reset(&mut self) {
        self.start_block = None;
        self.current_block = None;
        self.diff = 0;
    }

    /// Records the block the finger is over now.
    ///
    /// The first sample after construction or [`reset`](Self::reset) only
    /// marks the start block. Samples outside `0..N` are ignored.
    pub fn update(&mut self, block: usize) {
        if block >= self.total_blocks {
            return;
        }

        let n = self.total_blocks as i32;
        match self.current_block {
            Some(current) => {
                let mut delta = block as i32 - current as i32;
                if delta.abs() == n - 1 {
                    delta = -delta.signum();
                }
                self.diff += delta;
            }
            None => {
                self.start_block = Some(block);
                self.diff = 0;
            }
        }

        if self.diff.abs() == n + 1 {
            self.diff = self.diff.signum();
        }
        self.current_block = Some(block);
    }

    /// Cumulative signed difference since the start block.
    ///
    /// Positive values follow increasing block indices.
    pub fn diff(&self) -> i32 {
        self.diff
    }

    /// The block the first sample landed on.
    pub fn start_block(&self) -> Option<usize> {
        self.start_block
    }

    /// The block of the latest sample.
    pub fn current_block(&self) -> Option<usize> {
        self.current_block
    }

    /// Number of blocks on the ring.
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }
}
