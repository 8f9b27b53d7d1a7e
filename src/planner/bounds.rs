//! Result window bounds
//!
//! Successive `skip`/`take` calls compose into a single `start`/`count`
//! window:
//! - skip(a).skip(b) = skip(a + b)
//! - take(a).take(b) = take(min(a, b))
//! - take(a).skip(b) = skip(b), take(a - b)

/// Offset and optional limit applied to a result sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub skip: u64,
    pub take: Option<u64>,
}

impl Window {
    /// Window skipping `skip` records and keeping at most `take`
    pub fn new(skip: u64, take: Option<u64>) -> Self {
        Self { skip, take }
    }

    /// Applies a further skip to the window
    pub fn skip(self, n: u64) -> Self {
        Self {
            skip: self.skip.saturating_add(n),
            take: self.take.map(|t| t.saturating_sub(n)),
        }
    }

    /// Applies a further take to the window
    pub fn take(self, n: u64) -> Self {
        Self {
            skip: self.skip,
            take: Some(self.take.map_or(n, |t| t.min(n))),
        }
    }

    /// True when the window neither skips nor limits
    pub fn is_unbounded(&self) -> bool {
        self.skip == 0 && self.take.is_none()
    }

    /// Number of items the window yields from a sequence of `total` items
    pub fn clamp(&self, total: u64) -> u64 {
        let available = total.saturating_sub(self.skip);
        self.take.map_or(available, |t| t.min(available))
    }

    /// Items that must be read from the start of the sequence to fill the window
    pub fn reach(&self) -> Option<u64> {
        self.take.map(|t| self.skip.saturating_add(t))
    }
}
