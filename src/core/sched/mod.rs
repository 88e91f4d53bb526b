//! Scheduler: picks the highest-priority (or, under `edf`, the
//! earliest-deadline) ready task and triggers a context switch.
//!
//! Built around the ready-set `Bitmap` + `PrioIndex` pair rather than a
//! table of per-priority ready lists. One task per priority means there
//! is never more than one task to pick at a given bitmap position, so
//! there is no round-robin-at-equal-priority pass to speak of.

pub mod edf;

use crate::config::CFG_EDF_EN;
use crate::critical::{CriticalSection, is_isr_context};
use crate::kernel;
use crate::types::{TcbId, state};

/// Main scheduling point. Determines the task that should run next and
/// triggers a context switch if it differs from the one currently running.
/// Call after any operation that can change task readiness: a semaphore
/// post, a task resume, a delay expiry, task creation.
pub fn os_sched() {
    if !kernel::KERNEL.is_running() {
        return;
    }
    if is_isr_context() {
        return;
    }
    if kernel::KERNEL.sched_lock_nesting() > 0 {
        return;
    }

    let _cs = CriticalSection::enter();

    let Some((prio, id)) = next_ready() else { return };

    unsafe {
        kernel::set_prio_high_rdy(prio);
        kernel::set_tcb_high_rdy_id(Some(id));

        if Some(id) != kernel::tcb_cur_id() {
            crate::port::os_ctx_sw();
        }
    }
}

/// The task that should run next, and the priority value to record as
/// `prio_high_rdy` (a real priority in the default scheduler; an opaque
/// comparison key under `edf`, where it still orders "more urgent than
/// current" correctly — see `edf::next_ready`).
///
/// # Safety
/// None beyond holding the kernel critical section, which every caller
/// (`os_sched`, `core::kernel::os_int_exit`) already does.
pub(crate) fn next_ready() -> Option<(u8, TcbId)> {
    if CFG_EDF_EN { edf::next_ready() } else { next_ready_by_priority() }
}

fn next_ready_by_priority() -> Option<(u8, TcbId)> {
    unsafe {
        let prio = kernel::ready_bitmap().highest()?;
        let id = kernel::prio_index().get(prio)?;
        Some((prio, id))
    }
}

/// Whether a ready task is more urgent than the one currently running —
/// used from `core::kernel::os_int_exit`, which already holds the
/// critical section and just needs a yes/no plus the winner.
///
/// # Safety
/// Caller must hold the kernel critical section.
pub(crate) unsafe fn should_preempt() -> Option<(u8, TcbId)> {
    unsafe {
        let (next_prio, next_id) = next_ready()?;
        let cur_id = kernel::tcb_cur_id()?;
        if next_id == cur_id {
            return None;
        }

        if CFG_EDF_EN {
            let cur_deadline = kernel::tcb_mut(cur_id).edf_deadline;
            let next_deadline = kernel::tcb_mut(next_id).edf_deadline;
            edf::deadline_before(next_deadline, cur_deadline).then_some((next_prio, next_id))
        } else {
            (next_prio > kernel::prio_cur()).then_some((next_prio, next_id))
        }
    }
}

/// Mark a task ready: sets its state and inserts it into the ready-set
/// bitmap at its current priority.
///
/// # Safety
/// Caller must hold the kernel critical section.
pub(crate) unsafe fn rdy_insert(id: TcbId) {
    unsafe {
        let tcb = kernel::tcb_mut(id);
        tcb.state = state::READY;
        kernel::ready_bitmap().insert(tcb.prio);
    }
}

/// Remove a task from the ready set without changing its state (caller
/// sets the new state, e.g. to a `PEND_*` or `DELAY` bit).
///
/// # Safety
/// Caller must hold the kernel critical section.
pub(crate) unsafe fn rdy_remove(id: TcbId) {
    unsafe {
        let prio = kernel::tcb_mut(id).prio;
        kernel::ready_bitmap().remove(prio);
    }
}
