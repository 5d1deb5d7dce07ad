//! # Chunk Planning

use core::ops::Range;

/// A claim on a half-open byte range of the input.
///
/// Every chunk except the first also borrows `lookback` bytes from the
/// end of the previous chunk's range; they are not part of its own range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// The position of the chunk in the plan.
    pub index: usize,

    /// The first byte owned by this chunk.
    pub start: usize,

    /// One past the last byte owned by this chunk.
    pub end: usize,

    /// The number of bytes borrowed before `start`.
    pub lookback: usize,
}

impl Chunk {
    /// The owned byte range.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The byte range the merge engine reads: lookback plus owned bytes.
    pub fn read_range(&self) -> Range<usize> {
        (self.start - self.lookback)..self.end
    }

    /// The number of owned bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Is the owned range empty?
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The number of bytes the merge engine reads.
    pub fn read_len(&self) -> usize {
        self.end - self.start + self.lookback
    }
}

/// Partitions an input into contiguous, lookback-overlapped [`Chunk`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    chunk_size: usize,
    lookback: usize,
}

impl ChunkPlanner {
    /// Create a planner.
    ///
    /// ## Arguments
    /// * `chunk_size` - the maximum number of owned bytes per chunk; at least 1.
    /// * `lookback` - the bytes borrowed from the previous chunk.
    pub fn new(
        chunk_size: usize,
        lookback: usize,
    ) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            lookback,
        }
    }

    /// The maximum number of owned bytes per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The configured lookback.
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// The number of chunks for an input of `total_size` bytes.
    pub fn chunk_count(
        &self,
        total_size: usize,
    ) -> usize {
        total_size.div_ceil(self.chunk_size)
    }

    /// Iterate the chunks for an input of `total_size` bytes.
    pub fn chunks(
        &self,
        total_size: usize,
    ) -> impl Iterator<Item = Chunk> + use<> {
        let Self {
            chunk_size,
            lookback,
        } = *self;
        (0..self.chunk_count(total_size)).map(move |index| {
            let start = index * chunk_size;
            Chunk {
                index,
                start,
                end: (start + chunk_size).min(total_size),
                lookback: lookback.min(start),
            }
        })
    }

    /// Plan the chunks for an input of `total_size` bytes.
    pub fn plan(
        &self,
        total_size: usize,
    ) -> Vec<Chunk> {
        self.chunks(total_size).collect()
    }
}

/// Plan the chunks for an input.
///
/// ## Arguments
/// * `total_size` - the input length.
/// * `chunk_size` - the maximum number of owned bytes per chunk.
/// * `lookback_size` - the bytes borrowed from the previous chunk.
pub fn plan(
    total_size: usize,
    chunk_size: usize,
    lookback_size: usize,
) -> Vec<Chunk> {
    ChunkPlanner::new(chunk_size, lookback_size).plan(total_size)
}
