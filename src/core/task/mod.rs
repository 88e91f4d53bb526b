//! Task management: creation, deletion, suspend/resume, and priority change.
//!
//! A task's priority *is* its TCB pool slot (`TcbId`): one task per
//! priority, per `original_source/kernel/pretty_task.c`.
//! `os_task_change_prio` lets `sync::mutex`'s priority-ceiling protocol
//! raise and restore an owner's effective priority, and lets applications
//! retune a task's priority directly — needed because this kernel's
//! tasks, unlike a scheme where several tasks can share one priority and
//! round-robin, each own a single unique slot.

mod tcb;

pub use tcb::{OsTaskFn, OsTcb};

use crate::config::{CFG_PRIO_APP_MIN, CFG_PRIO_IDLE, CFG_PRIO_MAX, CFG_STK_SIZE_MIN};
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::types::{OsPrio, OsStkElement, TcbId, state};

/// Create a task at a fixed priority. The priority doubles as the task's
/// stable identity: at most one task may occupy a given priority.
///
/// Priorities `0` and `1` are reserved (`CFG_PRIO_IDLE`, the least urgent
/// slot, and `CFG_PRIO_CEILING_MARKER`, a mutex ceiling bookkeeping slot);
/// application tasks use `CFG_PRIO_APP_MIN..CFG_PRIO_MAX`.
pub fn os_task_create(
    name: &'static str,
    task_fn: OsTaskFn,
    arg: *mut (),
    stack: &'static mut [OsStkElement],
    prio: OsPrio,
) -> OsResult<()> {
    if prio as usize >= CFG_PRIO_MAX {
        return Err(OsError::PrioInvalid);
    }
    if prio < CFG_PRIO_APP_MIN {
        return Err(OsError::PrioReserved);
    }
    if stack.len() < CFG_STK_SIZE_MIN {
        return Err(OsError::StkSizeInvalid);
    }
    if is_isr_context() {
        return Err(OsError::TaskCreateIsr);
    }

    critical_section(|_cs| unsafe {
        if kernel::tcb_used_mut()[prio as usize] {
            return Err(OsError::PrioExist);
        }

        os_task_create_internal(TcbId(prio), name, task_fn, arg, prio, stack.as_mut_ptr(), stack.len())?;
        kernel::tcb_used_mut()[prio as usize] = true;

        if kernel::KERNEL.is_running() {
            crate::sched::os_sched();
        }

        Ok(())
    })
}

/// Internal task creation, used both by [`os_task_create`] and by
/// `core::kernel::os_init` to bring up the IDLE task.
///
/// # Safety
/// Caller must hold the kernel critical section and must ensure `id`'s
/// slot is not already in use by a live task.
pub(crate) unsafe fn os_task_create_internal(
    id: TcbId,
    name: &'static str,
    task_fn: OsTaskFn,
    arg: *mut (),
    prio: OsPrio,
    stk_base: *mut OsStkElement,
    stk_size: usize,
) -> OsResult<()> {
    if stk_base.is_null() {
        return Err(OsError::StkInvalid);
    }
    if stk_size < CFG_STK_SIZE_MIN {
        return Err(OsError::StkSizeInvalid);
    }

    let tcb = unsafe { kernel::tcb_mut(id) };
    tcb.init();
    tcb.id = id;
    tcb.name = name;
    tcb.prio = prio;
    tcb.base_prio = prio;
    tcb.state = state::READY;

    let stk_ptr = unsafe { crate::port::os_task_stk_init(task_fn, arg, stk_base, stk_size, 0) };
    tcb.stk_ptr = stk_ptr;
    tcb.stk_base = stk_base;
    tcb.stk_size = stk_size;
    tcb.stk_limit = unsafe { stk_base.add(stk_size / 10) };

    unsafe {
        kernel::ready_bitmap().insert(prio);
        kernel::prio_index().set(prio, id);
    }

    Ok(())
}

fn target_or_current(id: Option<TcbId>) -> OsResult<TcbId> {
    match id {
        Some(id) => Ok(id),
        None => unsafe { kernel::tcb_cur_id() }.ok_or(OsError::TcbInvalid),
    }
}

/// Delete a task. Pass `None` to delete the calling task, in which case
/// this call does not return.
pub fn os_task_del(id: Option<TcbId>) -> OsResult<()> {
    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if is_isr_context() {
        return Err(OsError::TaskDelIsr);
    }

    critical_section(|_cs| {
        let target = target_or_current(id)?;

        if target.0 == CFG_PRIO_IDLE {
            return Err(OsError::TaskDelIdle);
        }

        unsafe {
            let tcb = kernel::tcb_mut(target);
            let prio = tcb.prio;

            if tcb.is_ready() {
                kernel::ready_bitmap().remove(prio);
            } else if tcb.is_pending() {
                if let Some(ev) = tcb.pend_event {
                    crate::event::ecb_mut(ev).wait.remove(target);
                }
                if let Some(fg) = tcb.pend_flag_grp {
                    crate::flags::flag_grp_mut(fg).wait.remove(target);
                }
            }
            if tcb.is_delayed() {
                kernel::blocked_bitmap().remove(prio);
            }

            kernel::prio_index().clear(prio);
            kernel::tcb_used_mut()[target.0 as usize] = false;
            tcb.state = state::DELETED;
        }

        let is_current = unsafe { kernel::tcb_cur_id() } == Some(target);
        if is_current {
            crate::sched::os_sched();
        }

        Ok(())
    })
}

/// Suspend a task. Nests: a task suspended twice needs two resumes.
pub fn os_task_suspend(id: Option<TcbId>) -> OsResult<()> {
    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if is_isr_context() {
        return Err(OsError::TaskSuspendIsr);
    }

    critical_section(|_cs| {
        let target = target_or_current(id)?;

        if target.0 == CFG_PRIO_IDLE {
            return Err(OsError::TaskSuspendIdle);
        }

        unsafe {
            let tcb = kernel::tcb_mut(target);
            tcb.suspend_ctr = tcb.suspend_ctr.saturating_add(1);

            if tcb.is_ready() {
                kernel::ready_bitmap().remove(tcb.prio);
            }
            tcb.state |= state::SUSPENDED;
        }

        let is_current = unsafe { kernel::tcb_cur_id() } == Some(target);
        if is_current {
            crate::sched::os_sched();
        }

        Ok(())
    })
}

/// Resume a suspended task.
pub fn os_task_resume(id: TcbId) -> OsResult<()> {
    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if is_isr_context() {
        return Err(OsError::TaskResumeIsr);
    }

    critical_section(|_cs| {
        unsafe {
            let tcb = kernel::tcb_mut(id);

            if tcb.suspend_ctr == 0 {
                return Err(OsError::TaskNotSuspended);
            }

            tcb.suspend_ctr -= 1;
            if tcb.suspend_ctr == 0 {
                tcb.state &= !state::SUSPENDED;
                if state::is_ready(tcb.state) {
                    kernel::ready_bitmap().insert(tcb.prio);
                }
            }
        }

        crate::sched::os_sched();
        Ok(())
    })
}

/// Change a task's effective priority. Fails if the destination priority
/// is already occupied by another live task — priorities are unique task
/// identities in this kernel, so this is also how an application swaps
/// which slot a task answers to.
///
/// Used internally by `sync::mutex`'s priority-ceiling protocol to raise
/// and restore an owner's priority (SPEC_FULL.md B.2).
pub fn os_task_change_prio(id: Option<TcbId>, new_prio: OsPrio) -> OsResult<()> {
    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if is_isr_context() {
        return Err(OsError::TaskChangePrioIsr);
    }
    if new_prio as usize >= CFG_PRIO_MAX {
        return Err(OsError::PrioInvalid);
    }

    critical_section(|_cs| unsafe { os_task_change_prio_internal(target_or_current(id)?, new_prio) })
}

/// # Safety
/// Caller must hold the kernel critical section.
pub(crate) unsafe fn os_task_change_prio_internal(target: TcbId, new_prio: OsPrio) -> OsResult<()> {
    unsafe {
        if let Some(existing) = kernel::prio_index().get(new_prio) {
            if existing != target {
                return Err(OsError::PrioExist);
            }
        }

        let tcb = kernel::tcb_mut(target);
        let old_prio = tcb.prio;
        if old_prio == new_prio {
            return Ok(());
        }

        let was_ready = tcb.is_ready();
        let was_delayed = tcb.is_delayed();
        let pend_event = tcb.pend_event;
        let pend_flag_grp = tcb.pend_flag_grp;

        if was_ready {
            kernel::ready_bitmap().remove(old_prio);
        }
        if was_delayed {
            kernel::blocked_bitmap().remove(old_prio);
        }
        kernel::prio_index().clear(old_prio);

        tcb.prio = new_prio;
        kernel::prio_index().set(new_prio, target);

        if was_ready {
            kernel::ready_bitmap().insert(new_prio);
        }
        if was_delayed {
            kernel::blocked_bitmap().insert(new_prio);
        }
        if let Some(ev) = pend_event {
            let ecb = crate::event::ecb_mut(ev);
            ecb.wait.remove(target);
            ecb.wait.insert_by_prio(target);
        }
        if let Some(fg) = pend_flag_grp {
            let grp = crate::flags::flag_grp_mut(fg);
            grp.wait.remove(target);
            grp.wait.insert_by_prio(target);
        }

        if kernel::KERNEL.is_running() {
            crate::sched::os_sched();
        }

        Ok(())
    }
}
