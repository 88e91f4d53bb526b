//! Single-slot mailbox.
//!
//! Grounded on `original_source/kernel/pretty_mailbox.c`: one pointer-sized
//! message slot per mailbox, `pend` returns it and clears the slot, `post`
//! fails with `MboxFull` if a message is already waiting and no task is
//! blocked to receive it directly. ISRs may post but never pend, matching
//! the original's documented rule of thumb.

use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::event::EcbData;
use crate::kernel;
use crate::sched;
use crate::types::{EventId, EventType, OsMsgSize, OsOpt, OsTick, PendResult, opt, state};

pub struct OsMailbox {
    event: Option<EventId>,
}

impl OsMailbox {
    pub const fn new() -> Self {
        OsMailbox { event: None }
    }

    /// Create the mailbox, optionally pre-loaded with a message.
    pub fn create(&mut self, init_msg: Option<*mut ()>, msg_size: OsMsgSize, name: &'static str) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::CreateIsr);
        }
        let id = crate::event::alloc(EventType::Mailbox, name, EcbData::Mailbox { msg: init_msg, msg_size })?;
        self.event = Some(id);
        Ok(())
    }

    fn id(&self) -> OsResult<EventId> {
        self.event.ok_or(OsError::ObjType)
    }

    /// Wait for a message. Returns the message pointer on success.
    pub fn pend(&self, timeout: OsTick, pend_opt: OsOpt) -> OsResult<*mut ()> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }
        let id = self.id()?;
        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        critical_section(|_cs| unsafe {
            let ecb = crate::event::ecb_mut(id);
            if ecb.ty != EventType::Mailbox {
                return Err(OsError::ObjType);
            }

            if let EcbData::Mailbox { msg, .. } = &mut ecb.data {
                if let Some(m) = msg.take() {
                    return Ok(m);
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
            tcb.state = state::PEND_MAILBOX;
            tcb.pend_event = Some(id);
            tcb.pend_result = PendResult::Ok;

            crate::event::ecb_mut(id).wait.insert_by_prio(cur);
            crate::time::arm_pend_timeout(cur, prio, timeout);

            sched::os_sched();

            let cur = kernel::tcb_cur_id().ok_or(OsError::TcbInvalid)?;
            match kernel::tcb_mut(cur).pend_result {
                PendResult::Ok => {
                    if let EcbData::Mailbox { msg, .. } = &mut crate::event::ecb_mut(id).data {
                        msg.take().ok_or(OsError::TcbInvalid)
                    } else {
                        Err(OsError::ObjType)
                    }
                }
                PendResult::Timeout => Err(OsError::Timeout),
                PendResult::Abort => Err(OsError::PendAbort),
                PendResult::Del => Err(OsError::ObjDel),
            }
        })
    }

    /// Post a message. Usable from an ISR.
    pub fn post(&self, message: *mut (), post_opt: OsOpt) -> OsResult<()> {
        let id = self.id()?;

        critical_section(|_cs| unsafe {
            let ecb = crate::event::ecb_mut(id);
            if ecb.ty != EventType::Mailbox {
                return Err(OsError::ObjType);
            }

            if let Some(waiter) = ecb.wait.head() {
                ecb.wait.remove(waiter);

                if let EcbData::Mailbox { msg, .. } = &mut ecb.data {
                    *msg = Some(message);
                }

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

                return Ok(());
            }

            if let EcbData::Mailbox { msg, .. } = &mut ecb.data {
                if msg.is_some() {
                    return Err(OsError::MboxFull);
                }
                *msg = Some(message);
                Ok(())
            } else {
                Err(OsError::ObjType)
            }
        })
    }
}

impl Default for OsMailbox {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsMailbox {}
unsafe impl Sync for OsMailbox {}

// ============ Safe wrapper ============

use core::cell::UnsafeCell;

/// A mailbox safe to hold as a `static`. Call [`Mailbox::create`] once
/// before use.
pub struct Mailbox {
    inner: UnsafeCell<OsMailbox>,
}

unsafe impl Sync for Mailbox {}
unsafe impl Send for Mailbox {}

impl Mailbox {
    pub const fn new() -> Self {
        Mailbox { inner: UnsafeCell::new(OsMailbox::new()) }
    }

    pub fn create(&self, init_msg: Option<*mut ()>, msg_size: OsMsgSize, name: &'static str) -> OsResult<()> {
        unsafe { (*self.inner.get()).create(init_msg, msg_size, name) }
    }

    pub fn receive(&self, timeout: OsTick, opt: OsOpt) -> OsResult<*mut ()> {
        unsafe { (*self.inner.get()).pend(timeout, opt) }
    }

    pub fn send(&self, message: *mut (), opt: OsOpt) -> OsResult<()> {
        unsafe { (*self.inner.get()).post(message, opt) }
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pend_before_create_is_obj_type_error() {
        let m = OsMailbox::new();
        assert_eq!(m.pend(0, opt::PEND_NON_BLOCKING), Err(OsError::ObjType));
    }
}
