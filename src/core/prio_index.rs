//! Priority -> TcbId indirection table (spec.md S2 item 3, SPEC_FULL.md D.1).
//!
//! A task's `TcbId` (its slot in the TCB pool) never changes once assigned.
//! Its *effective* priority can change — under the priority-ceiling
//! protocol the owner of a contended mutex is temporarily raised to the
//! mutex's ceiling, and `os_task_change_prio` can change it permanently.
//! `PrioIndex` is the map from "priority currently in use" back to the
//! `TcbId` occupying it, so the ready-set bitmap (indexed by priority) can
//! be turned back into a task to run without moving any `OsTcb` in memory.

use crate::config::CFG_PRIO_MAX;
use crate::types::{OsPrio, TcbId};

pub struct PrioIndex {
    slots: [Option<TcbId>; CFG_PRIO_MAX],
}

impl PrioIndex {
    pub const fn new() -> Self {
        PrioIndex { slots: [None; CFG_PRIO_MAX] }
    }

    pub fn init(&mut self) {
        self.slots = [None; CFG_PRIO_MAX];
    }

    #[inline]
    pub fn get(&self, prio: OsPrio) -> Option<TcbId> {
        self.slots[prio as usize]
    }

    #[inline]
    pub fn set(&mut self, prio: OsPrio, id: TcbId) {
        self.slots[prio as usize] = Some(id);
    }

    #[inline]
    pub fn clear(&mut self, prio: OsPrio) {
        self.slots[prio as usize] = None;
    }
}

impl Default for PrioIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear() {
        let mut idx = PrioIndex::new();
        assert_eq!(idx.get(5), None);
        idx.set(5, TcbId(3));
        assert_eq!(idx.get(5), Some(TcbId(3)));
        idx.clear(5);
        assert_eq!(idx.get(5), None);
    }
}
