//! Priority-ceiling-protocol mutex.
//!
//! Grounded on `original_source/kernel/pretty_mutex.c`'s exact algorithm:
//! a fixed priority ceiling declared at creation time, rather than
//! priority inheritance (which would boost the owner to whatever
//! priority the *contender* happens to have each time a higher-priority
//! task blocks on it). The owner is only ever raised to the one ceiling
//! value. Acquiring a free mutex never changes anyone's priority —
//! `pretty_mutex.c` only raises the owner lazily, the first time a
//! contending pend actually observes the mutex held. Matches
//! `core::task::os_task_change_prio_internal` for the raise/restore since
//! the owner may be ready, delayed, or (per the documented caller
//! contract) pending elsewhere when it happens.

use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::event::EcbData;
use crate::kernel;
use crate::sched;
use crate::types::{EventId, EventType, OsOpt, OsPrio, OsTick, PendResult, opt, state};

pub struct OsMutex {
    event: Option<EventId>,
}

impl OsMutex {
    pub const fn new() -> Self {
        OsMutex { event: None }
    }

    /// Create the mutex with a fixed priority ceiling. `ceiling` must be an
    /// otherwise-unused priority at least as urgent as any task that will
    /// ever lock this mutex; the slot is reserved so no task can be
    /// created there while the mutex exists.
    pub fn create(&mut self, ceiling: OsPrio, name: &'static str) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::CreateIsr);
        }
        if ceiling as usize >= crate::config::CFG_PRIO_MAX {
            return Err(OsError::PrioInvalid);
        }

        critical_section(|_cs| unsafe {
            if kernel::tcb_used_mut()[ceiling as usize] {
                return Err(OsError::PrioExist);
            }

            let id = crate::event::alloc(
                EventType::Mutex,
                name,
                EcbData::Mutex { owner: None, ceiling, owner_orig_prio: 0, nesting: 0 },
            )?;
            kernel::tcb_used_mut()[ceiling as usize] = true;
            self.event = Some(id);
            Ok(())
        })
    }

    fn id(&self) -> OsResult<EventId> {
        self.event.ok_or(OsError::ObjType)
    }

    /// Lock the mutex, recursively if already owned by the caller.
    pub fn pend(&self, timeout: OsTick, pend_opt: OsOpt) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }
        let id = self.id()?;
        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        critical_section(|_cs| unsafe {
            let cur = kernel::tcb_cur_id().ok_or(OsError::TcbInvalid)?;

            let (owner, ceiling) = {
                let ecb = crate::event::ecb_mut(id);
                if ecb.ty != EventType::Mutex {
                    return Err(OsError::ObjType);
                }
                match ecb.data {
                    EcbData::Mutex { owner, ceiling, .. } => (owner, ceiling),
                    _ => return Err(OsError::ObjType),
                }
            };

            match owner {
                None => {
                    let cur_prio = kernel::tcb_mut(cur).prio;
                    if ceiling < cur_prio {
                        return Err(OsError::MutexCeilingTooLow);
                    }

                    if let EcbData::Mutex { owner, owner_orig_prio, nesting, .. } = &mut crate::event::ecb_mut(id).data
                    {
                        *owner = Some(cur);
                        *owner_orig_prio = cur_prio;
                        *nesting = 1;
                    }
                    Ok(())
                }

                Some(owner_id) if owner_id == cur => {
                    if let EcbData::Mutex { nesting, .. } = &mut crate::event::ecb_mut(id).data {
                        if *nesting == u8::MAX {
                            return Err(OsError::MutexNestingOvf);
                        }
                        *nesting += 1;
                    }
                    Ok(())
                }

                Some(owner_id) => {
                    if pend_opt & opt::PEND_NON_BLOCKING != 0 {
                        return Err(OsError::PendWouldBlock);
                    }
                    if kernel::KERNEL.sched_lock_nesting() > 0 {
                        return Err(OsError::PendLocked);
                    }

                    let cur_prio = kernel::tcb_mut(cur).prio;
                    let owner_prio = kernel::tcb_mut(owner_id).prio;

                    if owner_prio < ceiling && owner_prio < cur_prio {
                        crate::task::os_task_change_prio_internal(owner_id, ceiling)?;
                    }

                    sched::rdy_remove(cur);
                    let tcb = kernel::tcb_mut(cur);
                    tcb.state = state::PEND_MUTEX;
                    tcb.pend_event = Some(id);
                    tcb.pend_result = PendResult::Ok;

                    crate::event::ecb_mut(id).wait.insert_by_prio(cur);
                    crate::time::arm_pend_timeout(cur, cur_prio, timeout);

                    sched::os_sched();

                    let cur2 = kernel::tcb_cur_id().ok_or(OsError::TcbInvalid)?;
                    match kernel::tcb_mut(cur2).pend_result {
                        PendResult::Ok => Ok(()),
                        PendResult::Timeout => Err(OsError::Timeout),
                        PendResult::Abort => Err(OsError::PendAbort),
                        PendResult::Del => Err(OsError::ObjDel),
                    }
                }
            }
        })
    }

    /// Unlock the mutex. Only the owner may call this. Restores the
    /// owner's priority if it was raised, then hands the mutex directly to
    /// the highest-priority waiter, if any.
    pub fn post(&self, post_opt: OsOpt) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::AcceptIsr);
        }
        let id = self.id()?;
        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        critical_section(|_cs| unsafe {
            let cur = kernel::tcb_cur_id().ok_or(OsError::TcbInvalid)?;

            let (owner, ceiling, owner_orig_prio, nesting) = {
                let ecb = crate::event::ecb_mut(id);
                if ecb.ty != EventType::Mutex {
                    return Err(OsError::ObjType);
                }
                match ecb.data {
                    EcbData::Mutex { owner, ceiling, owner_orig_prio, nesting } => {
                        (owner, ceiling, owner_orig_prio, nesting)
                    }
                    _ => return Err(OsError::ObjType),
                }
            };

            if owner != Some(cur) {
                return Err(OsError::MutexNotOwner);
            }

            if nesting > 1 {
                if let EcbData::Mutex { nesting, .. } = &mut crate::event::ecb_mut(id).data {
                    *nesting -= 1;
                }
                return Ok(());
            }

            if ceiling != owner_orig_prio && kernel::tcb_mut(cur).prio == ceiling {
                crate::task::os_task_change_prio_internal(cur, owner_orig_prio)?;
            }

            if let Some(waiter) = crate::event::ecb_mut(id).wait.head() {
                crate::event::ecb_mut(id).wait.remove(waiter);

                let waiter_prio = kernel::tcb_mut(waiter).prio;
                let tcb = kernel::tcb_mut(waiter);
                tcb.pend_event = None;
                tcb.pend_result = PendResult::Ok;
                if tcb.tick_remain != 0 {
                    tcb.tick_remain = 0;
                    kernel::blocked_bitmap().remove(waiter_prio);
                }
                sched::rdy_insert(waiter);

                if let EcbData::Mutex { owner, owner_orig_prio, nesting, .. } = &mut crate::event::ecb_mut(id).data {
                    *owner = Some(waiter);
                    *owner_orig_prio = waiter_prio;
                    *nesting = 1;
                }

                if waiter_prio < ceiling {
                    crate::task::os_task_change_prio_internal(waiter, ceiling)?;
                }

                if post_opt & opt::POST_NO_SCHED == 0 && !is_isr_context() {
                    sched::os_sched();
                }
            } else if let EcbData::Mutex { owner, nesting, .. } = &mut crate::event::ecb_mut(id).data {
                *owner = None;
                *nesting = 0;
            }

            Ok(())
        })
    }

    /// Whether the mutex is currently held by anyone.
    pub fn is_owned(&self) -> bool {
        match self.event {
            Some(id) => critical_section(|_cs| unsafe {
                matches!(crate::event::ecb_mut(id).data, EcbData::Mutex { owner: Some(_), .. })
            }),
            None => false,
        }
    }
}

impl Default for OsMutex {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsMutex {}
unsafe impl Sync for OsMutex {}

// ============ Safe wrapper ============

use core::cell::UnsafeCell;

/// A mutex safe to hold as a `static`. Call [`Mutex::create`] once before
/// use.
pub struct Mutex {
    inner: UnsafeCell<OsMutex>,
}

unsafe impl Sync for Mutex {}
unsafe impl Send for Mutex {}

impl Mutex {
    pub const fn new() -> Self {
        Mutex { inner: UnsafeCell::new(OsMutex::new()) }
    }

    pub fn create(&self, ceiling: OsPrio, name: &'static str) -> OsResult<()> {
        unsafe { (*self.inner.get()).create(ceiling, name) }
    }

    pub fn lock(&self, timeout: OsTick, opt: OsOpt) -> OsResult<()> {
        unsafe { (*self.inner.get()).pend(timeout, opt) }
    }

    pub fn unlock(&self, opt: OsOpt) -> OsResult<()> {
        unsafe { (*self.inner.get()).post(opt) }
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        unsafe { (*self.inner.get()).is_owned() }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pend_before_create_is_obj_type_error() {
        let m = OsMutex::new();
        assert_eq!(m.pend(0, opt::PEND_NON_BLOCKING), Err(OsError::ObjType));
    }

    #[test]
    fn post_before_create_is_obj_type_error() {
        let m = OsMutex::new();
        assert_eq!(m.post(0), Err(OsError::ObjType));
    }
}
