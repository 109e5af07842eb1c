use std::ops::Range;

use crate::error::{MeshError, Result};
use crate::types::Rank;

/// Per-rank layout of a variable-length scatter or gather: chunk `i`
/// holds `counts[i]` elements starting at `displacements[i]` of the root
/// buffer.
///
/// Displacements need not be prefix sums; chunks may leave gaps or appear
/// out of rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    counts: Vec<usize>,
    displacements: Vec<usize>,
}

impl Partition {
    /// Split `n` elements over `parts` ranks as evenly as possible.
    ///
    /// The first `n % parts` ranks get one extra element; chunks are
    /// contiguous in rank order.
    pub fn even(n: usize, parts: u32) -> Self {
        let parts = parts as usize;
        if parts == 0 {
            return Self::from_counts(Vec::new());
        }
        let base = n / parts;
        let remainder = n % parts;
        let counts = (0..parts)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect();
        Self::from_counts(counts)
    }

    /// Contiguous chunks in rank order: displacements are prefix sums.
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let displacements = counts
            .iter()
            .scan(0usize, |offset, &c| {
                let start = *offset;
                *offset += c;
                Some(start)
            })
            .collect();
        Self {
            counts,
            displacements,
        }
    }

    /// Explicit layout. Both vectors must have one entry per rank.
    pub fn new(counts: Vec<usize>, displacements: Vec<usize>) -> Result<Self> {
        if counts.len() != displacements.len() {
            return Err(MeshError::InvalidLayout {
                operation: "partition",
                reason: format!(
                    "{} counts but {} displacements",
                    counts.len(),
                    displacements.len()
                ),
            });
        }
        Ok(Self {
            counts,
            displacements,
        })
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn displacements(&self) -> &[usize] {
        &self.displacements
    }

    /// Number of ranks described.
    pub fn parts(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, rank: Rank) -> usize {
        self.counts.get(rank as usize).copied().unwrap_or(0)
    }

    /// Index range of `rank`'s chunk in the root buffer.
    pub fn range(&self, rank: Rank) -> Range<usize> {
        let i = rank as usize;
        match (self.displacements.get(i), self.counts.get(i)) {
            (Some(&d), Some(&c)) => d..d + c,
            _ => 0..0,
        }
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Check that every chunk fits in a buffer of `len` elements.
    pub fn validate(&self, len: usize) -> Result<()> {
        self.check(self.parts(), len, "partition")
    }

    pub(crate) fn check(&self, size: usize, len: usize, operation: &'static str) -> Result<()> {
        if self.parts() != size {
            return Err(MeshError::InvalidLayout {
                operation,
                reason: format!("layout has {} chunks for {size} ranks", self.parts()),
            });
        }
        for (rank, (&d, &c)) in self.displacements.iter().zip(&self.counts).enumerate() {
            let end = d.checked_add(c).ok_or_else(|| MeshError::InvalidLayout {
                operation,
                reason: format!("chunk {rank} overflows"),
            })?;
            if end > len {
                return Err(MeshError::InvalidLayout {
                    operation,
                    reason: format!("chunk {rank} spans {d}..{end} but the buffer holds {len}"),
                });
            }
        }
        Ok(())
    }
}
