//! Fan-out ID consumption stack

/// IDs not yet bound to a fan-out member.
///
/// Built fresh for every enumeration; each member pops exactly one ID when it
/// starts, in declared order, so no ID is bound to two requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdStack {
    // Reversed so `pop` yields declaration order
    pending: Vec<i64>,
}

impl IdStack {
    /// Stack yielding `ids` in declared order
    pub fn new(ids: &[i64]) -> Self {
        Self {
            pending: ids.iter().rev().copied().collect(),
        }
    }

    /// Binds the next ID
    pub fn pop(&mut self) -> Option<i64> {
        self.pending.pop()
    }

    /// IDs not yet consumed
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
