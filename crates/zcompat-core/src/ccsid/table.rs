//! Descriptor-indexed slot table.
//!
//! Descriptor numbers are small, dense and reused by the kernel, so state is
//! kept in a vector indexed by fd rather than a map. Slots grow on demand and
//! an evicted slot is simply emptied.

use super::EncodingState;

/// Descriptors at or above this value are never tracked.
pub const MAX_TRACKED_FD: i32 = 1 << 20;

#[derive(Debug, Default)]
pub(crate) struct FdTable {
    slots: Vec<Option<EncodingState>>,
    live: usize,
}

impl FdTable {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    #[inline]
    fn index(fd: i32) -> Option<usize> {
        if (0..MAX_TRACKED_FD).contains(&fd) {
            Some(fd as usize)
        } else {
            None
        }
    }

    pub(crate) fn get(&self, fd: i32) -> Option<&EncodingState> {
        let idx = Self::index(fd)?;
        self.slots.get(idx)?.as_ref()
    }

    /// Slot for `fd`, materialising the default state if absent. `None` for
    /// descriptors outside the trackable range.
    pub(crate) fn entry(&mut self, fd: i32) -> Option<&mut EncodingState> {
        let idx = Self::index(fd)?;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, None);
        }
        let slot = &mut self.slots[idx];
        if slot.is_none() {
            self.live += 1;
        }
        Some(slot.get_or_insert(EncodingState::untracked(fd)))
    }

    pub(crate) fn remove(&mut self, fd: i32) -> Option<EncodingState> {
        let idx = Self::index(fd)?;
        let removed = self.slots.get_mut(idx)?.take();
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    pub(crate) const fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccsid::EncodingMode;

    #[test]
    fn entry_materialises_default_once() {
        let mut table = FdTable::new();
        assert!(table.get(7).is_none());
        table.entry(7).unwrap().mode = EncodingMode::Binary;
        assert_eq!(table.len(), 1);
        assert_eq!(table.entry(7).unwrap().mode, EncodingMode::Binary);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(7).map(|s| s.fd), Some(7));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut table = FdTable::new();
        assert!(table.entry(2).is_some());
        assert!(table.remove(2).is_some());
        assert!(table.remove(2).is_none());
        assert!(table.remove(900).is_none());
        assert!(table.remove(-1).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn out_of_range_descriptors_are_never_found() {
        let table = FdTable::new();
        assert!(table.get(-1).is_none());
        assert!(table.get(MAX_TRACKED_FD).is_none());
    }

    #[test]
    fn out_of_range_entry_leaves_other_slots_alone() {
        let mut table = FdTable::new();
        table.entry(0).unwrap().mode = EncodingMode::Binary;
        assert!(table.entry(-1).is_none());
        assert!(table.entry(MAX_TRACKED_FD).is_none());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).map(|s| s.mode), Some(EncodingMode::Binary));
        assert_eq!(table.get(0).map(|s| s.fd), Some(0));
    }
}
