//! `DispatchQueue`: couriers ordered by the simulated time they are next
//! free.
//!
//! Time is integer milliseconds from the snapshot instant, so keys are exact
//! and ordering is total.  Couriers free at the same instant pop in
//! ascending index order, which keeps every run deterministic.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
pub(crate) struct DispatchQueue {
    inner: BTreeMap<u64, BTreeSet<usize>>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Courier `courier` is free again at `at_ms`.
    pub fn push(&mut self, at_ms: u64, courier: usize) {
        self.inner.entry(at_ms).or_default().insert(courier);
    }

    /// Remove the earliest `(time, courier)`.
    pub fn pop(&mut self) -> Option<(u64, usize)> {
        let mut entry = self.inner.first_entry()?;
        let at = *entry.key();
        let courier = entry.get_mut().pop_first()?;
        if entry.get().is_empty() {
            entry.remove();
        }
        Some((at, courier))
    }
}
