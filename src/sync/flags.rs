//! Event flag groups.
//!
//! Grounded on `original_source/kernel/pretty_flag.c`'s `OSFlagPend`/
//! `OSFlagPost`: a group is one flag word plus a wait list; each waiter
//! records its own wanted mask and wait kind on its TCB
//! (`pend_flag_mask`/`pend_flag_kind`) rather than on a separately
//! allocated wait node, since a TCB already carries the one pend reason
//! a task can have at a time — generalized here to the four-kind mask
//! match `core::flags::flags_satisfied` evaluates. `post`
//! accumulates every satisfied waiter's consumed bits and clears them from
//! the group in one step at the end, so `FLAG_CONSUME` waiters woken by
//! the same post never see each other's consumption change the outcome.

use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::sched;
use crate::types::{FlagGrpId, FlagWaitKind, OsFlags, OsOpt, OsTick, PendResult, opt, state};

fn wait_kind_from_opt(pend_opt: OsOpt) -> OsResult<FlagWaitKind> {
    match pend_opt & (opt::FLAG_CLR_ALL | opt::FLAG_CLR_ANY | opt::FLAG_SET_ALL | opt::FLAG_SET_ANY) {
        opt::FLAG_CLR_ALL => Ok(FlagWaitKind::ClearAll),
        opt::FLAG_CLR_ANY => Ok(FlagWaitKind::ClearAny),
        opt::FLAG_SET_ALL => Ok(FlagWaitKind::SetAll),
        opt::FLAG_SET_ANY => Ok(FlagWaitKind::SetAny),
        _ => Err(OsError::FlagInvalidOpt),
    }
}

/// Bits that actually satisfied `kind` against `flags`, given the wanted
/// `mask` — what gets reported back to a waiter and, under
/// `FLAG_CONSUME`, cleared from the group.
fn matched_bits(flags: OsFlags, mask: OsFlags, kind: FlagWaitKind) -> OsFlags {
    match kind {
        FlagWaitKind::SetAll | FlagWaitKind::SetAny => flags & mask,
        FlagWaitKind::ClearAll | FlagWaitKind::ClearAny => !flags & mask,
    }
}

pub struct OsFlagGrp {
    grp: Option<FlagGrpId>,
}

impl OsFlagGrp {
    pub const fn new() -> Self {
        OsFlagGrp { grp: None }
    }

    /// Create the group with an initial flag pattern.
    pub fn create(&mut self, init_flags: OsFlags, name: &'static str) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::CreateIsr);
        }
        let id = crate::flags::alloc(name, init_flags)?;
        self.grp = Some(id);
        Ok(())
    }

    fn id(&self) -> OsResult<FlagGrpId> {
        self.grp.ok_or(OsError::ObjType)
    }

    /// Wait for `wanted` to satisfy the wait kind encoded in `pend_opt`
    /// (exactly one of `FLAG_CLR_ALL`/`FLAG_CLR_ANY`/`FLAG_SET_ALL`/
    /// `FLAG_SET_ANY`, optionally `| FLAG_CONSUME`). Returns the bits that
    /// caused the wake.
    pub fn pend(&self, wanted: OsFlags, pend_opt: OsOpt, timeout: OsTick) -> OsResult<OsFlags> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }
        let id = self.id()?;
        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }
        let kind = wait_kind_from_opt(pend_opt)?;

        critical_section(|_cs| unsafe {
            let grp = crate::flags::flag_grp_mut(id);
            if crate::flags::flags_satisfied(grp.flags, wanted, kind) {
                let matched = matched_bits(grp.flags, wanted, kind);
                if pend_opt & opt::FLAG_CONSUME != 0 {
                    grp.flags &= !matched;
                }
                return Ok(matched);
            }

            if pend_opt & opt::PEND_NON_BLOCKING != 0 {
                return Err(OsError::PendWouldBlock);
            }
            if kernel::KERNEL.sched_lock_nesting() > 0 {
                return Err(OsError::PendLocked);
            }

            let cur = kernel::tcb_cur_id().ok_or(OsError::TcbInvalid)?;
            let prio = kernel::tcb_mut(cur).prio;

            sched::rdy_remove(cur);
            let tcb = kernel::tcb_mut(cur);
            tcb.state = state::PEND_FLAG;
            tcb.pend_flag_grp = Some(id);
            tcb.pend_flag_mask = wanted;
            tcb.pend_flag_kind = Some(kind);
            tcb.opt = pend_opt;
            tcb.pend_result = PendResult::Ok;

            crate::flags::flag_grp_mut(id).wait.insert_by_prio(cur);
            crate::time::arm_pend_timeout(cur, prio, timeout);

            sched::os_sched();

            let cur2 = kernel::tcb_cur_id().ok_or(OsError::TcbInvalid)?;
            let tcb2 = kernel::tcb_mut(cur2);
            match tcb2.pend_result {
                PendResult::Ok => Ok(tcb2.pend_flag_mask),
                PendResult::Timeout => Err(OsError::Timeout),
                PendResult::Abort => Err(OsError::PendAbort),
                PendResult::Del => Err(OsError::ObjDel),
            }
        })
    }

    /// Post `flags`, either setting (`FLAG_POST_SET`) or clearing
    /// (`FLAG_POST_CLR`) them, and wake every waiter whose condition is now
    /// satisfied. Returns the group's resulting pattern. Usable from ISRs.
    pub fn post(&self, flags: OsFlags, post_opt: OsOpt) -> OsResult<OsFlags> {
        let id = self.id()?;

        critical_section(|_cs| unsafe {
            let grp = crate::flags::flag_grp_mut(id);
            if post_opt & opt::FLAG_POST_SET != 0 {
                grp.flags |= flags;
            } else if post_opt & opt::FLAG_POST_CLR != 0 {
                grp.flags &= !flags;
            } else {
                return Err(OsError::FlagInvalidOpt);
            }

            let mut consumed: OsFlags = 0;
            let mut cur = crate::flags::flag_grp_mut(id).wait.head();
            while let Some(waiter) = cur {
                let next = kernel::tcb_mut(waiter).link_next;
                let mask = kernel::tcb_mut(waiter).pend_flag_mask;
                let kind = kernel::tcb_mut(waiter).pend_flag_kind.expect("waiter without a flag-wait kind");

                if crate::flags::flags_satisfied(crate::flags::flag_grp_mut(id).flags, mask, kind) {
                    crate::flags::flag_grp_mut(id).wait.remove(waiter);

                    let matched = matched_bits(crate::flags::flag_grp_mut(id).flags, mask, kind);
                    let tcb = kernel::tcb_mut(waiter);
                    tcb.pend_flag_grp = None;
                    tcb.pend_flag_kind = None;
                    tcb.pend_flag_mask = matched;
                    tcb.pend_result = PendResult::Ok;
                    if tcb.tick_remain != 0 {
                        tcb.tick_remain = 0;
                        kernel::blocked_bitmap().remove(tcb.prio);
                    }
                    sched::rdy_insert(waiter);

                    if tcb.opt & opt::FLAG_CONSUME != 0 {
                        consumed |= matched;
                    }
                }

                cur = next;
            }

            crate::flags::flag_grp_mut(id).flags &= !consumed;

            if post_opt & opt::POST_NO_SCHED == 0 && !is_isr_context() {
                sched::os_sched();
            }

            Ok(crate::flags::flag_grp_mut(id).flags)
        })
    }

    /// Current flag pattern, or 0 if not yet created.
    pub fn flags(&self) -> OsFlags {
        match self.grp {
            Some(id) => critical_section(|_cs| unsafe { crate::flags::flag_grp_mut(id).flags }),
            None => 0,
        }
    }
}

impl Default for OsFlagGrp {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsFlagGrp {}
unsafe impl Sync for OsFlagGrp {}

// ============ Safe wrapper ============

use core::cell::UnsafeCell;

/// An event flag group safe to hold as a `static`. Call
/// [`FlagGroup::create`] once before use.
pub struct FlagGroup {
    inner: UnsafeCell<OsFlagGrp>,
}

unsafe impl Sync for FlagGroup {}
unsafe impl Send for FlagGroup {}

impl FlagGroup {
    pub const fn new() -> Self {
        FlagGroup { inner: UnsafeCell::new(OsFlagGrp::new()) }
    }

    pub fn create(&self, init_flags: OsFlags, name: &'static str) -> OsResult<()> {
        unsafe { (*self.inner.get()).create(init_flags, name) }
    }

    pub fn wait(&self, wanted: OsFlags, opt: OsOpt, timeout: OsTick) -> OsResult<OsFlags> {
        unsafe { (*self.inner.get()).pend(wanted, opt, timeout) }
    }

    pub fn post(&self, flags: OsFlags, opt: OsOpt) -> OsResult<OsFlags> {
        unsafe { (*self.inner.get()).post(flags, opt) }
    }

    #[inline]
    pub fn flags(&self) -> OsFlags {
        unsafe { (*self.inner.get()).flags() }
    }
}

impl Default for FlagGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pend_before_create_is_obj_type_error() {
        let g = OsFlagGrp::new();
        assert_eq!(g.pend(1, opt::FLAG_SET_ALL | opt::PEND_NON_BLOCKING, 0), Err(OsError::ObjType));
    }

    #[test]
    fn post_before_create_is_obj_type_error() {
        let g = OsFlagGrp::new();
        assert_eq!(g.post(1, opt::FLAG_POST_SET), Err(OsError::ObjType));
    }

    #[test]
    fn wait_kind_from_opt_rejects_missing_or_ambiguous_selector() {
        assert_eq!(wait_kind_from_opt(opt::NONE), Err(OsError::FlagInvalidOpt));
        assert_eq!(wait_kind_from_opt(opt::FLAG_SET_ALL | opt::FLAG_SET_ANY), Err(OsError::FlagInvalidOpt));
        assert_eq!(wait_kind_from_opt(opt::FLAG_SET_ALL), Ok(FlagWaitKind::SetAll));
    }
}
