//! Event flag groups (`original_source/kernel/pretty_flag.c`).
//!
//! Each group is a fixed-width bitmask plus a wait list; a waiting task
//! records its own mask/kind (`FlagWaitKind`) on its TCB, the same
//! per-task pend bookkeeping `sync::sem` uses, generalized to a mask and
//! match kind instead of a single pend reason — so one group can be
//! awaited by many tasks with different match conditions simultaneously.

use crate::config::CFG_MAX_FLAG_GROUPS;
use crate::critical::critical_section;
use crate::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::list::IdList;
use crate::types::{FlagGrpId, FlagWaitKind, OsFlags};

pub struct FlagGrp {
    pub name: &'static str,
    pub flags: OsFlags,
    pub wait: IdList,
}

impl FlagGrp {
    const fn new() -> Self {
        FlagGrp { name: "", flags: 0, wait: IdList::new() }
    }
}

impl Clone for FlagGrp {
    fn clone(&self) -> Self {
        FlagGrp { name: self.name, flags: self.flags, wait: self.wait }
    }
}
impl Copy for FlagGrp {}

unsafe impl Send for FlagGrp {}
unsafe impl Sync for FlagGrp {}

struct FlagPool {
    slots: [FlagGrp; CFG_MAX_FLAG_GROUPS],
    /// `CFG_MAX_FLAG_GROUPS` is sized to fit in one `u32`.
    used: u32,
}

impl FlagPool {
    const fn new() -> Self {
        const INIT: FlagGrp = FlagGrp::new();
        FlagPool { slots: [INIT; CFG_MAX_FLAG_GROUPS], used: 0 }
    }

    fn reset(&mut self) {
        self.slots = [FlagGrp::new(); CFG_MAX_FLAG_GROUPS];
        self.used = 0;
    }
}

static FLAGS: CsCell<FlagPool> = CsCell::new(FlagPool::new());

pub(crate) fn reset() {
    critical_section(|cs| FLAGS.get(cs).reset());
}

/// Allocate a flag group initialized to `init_flags`.
pub fn alloc(name: &'static str, init_flags: OsFlags) -> OsResult<FlagGrpId> {
    critical_section(|cs| {
        let pool = FLAGS.get(cs);
        for i in 0..CFG_MAX_FLAG_GROUPS {
            if pool.used & (1 << i) == 0 {
                pool.used |= 1 << i;
                pool.slots[i] = FlagGrp { name, flags: init_flags, wait: IdList::new() };
                return Ok(FlagGrpId(i as u16));
            }
        }
        Err(OsError::FlagGrpPoolEmpty)
    })
}

/// # Safety
/// Caller must ensure no task is waiting on this group.
pub unsafe fn free(id: FlagGrpId) {
    critical_section(|cs| {
        let pool = FLAGS.get(cs);
        pool.used &= !(1 << id.index());
        pool.slots[id.index()] = FlagGrp::new();
    });
}

/// # Safety
/// Caller must hold the kernel critical section for the duration of use.
#[inline(always)]
pub(crate) unsafe fn flag_grp_mut(id: FlagGrpId) -> &'static mut FlagGrp {
    unsafe { &mut FLAGS.get_unchecked().slots[id.index()] }
}

/// Evaluate whether `mask`/`kind` is satisfied by `flags`.
#[inline]
pub(crate) fn flags_satisfied(flags: OsFlags, mask: OsFlags, kind: FlagWaitKind) -> bool {
    match kind {
        FlagWaitKind::SetAll => flags & mask == mask,
        FlagWaitKind::SetAny => flags & mask != 0,
        FlagWaitKind::ClearAll => (!flags) & mask == mask,
        FlagWaitKind::ClearAny => (!flags) & mask != 0,
    }
}
