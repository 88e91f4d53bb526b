//! Tick handling, time delays, and pend-timeout expiry.
//!
//! Instead of a tick wheel (`[Option<NonNull<OsTcb>>; CFG_TICK_WHEEL_SIZE]`,
//! one doubly-linked list per slot), delayed/timing-out tasks are tracked
//! in the time-blocked `Bitmap` also used for the ready set, indexed by
//! priority. Every tick,
//! `process_delayed_tasks` walks the bitmap's set bits and decrements each
//! blocked task's `tick_remain`. `CFG_PRIO_MAX` is small enough (64) that a
//! full bitmap scan per tick is cheap and needs no extra state.

use crate::config::CFG_TICK_RATE_HZ;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::sched;
use crate::types::{OsPrio, OsTick, PendResult, TcbId, state};

/// Delay the calling task for `ticks` system ticks. Removed from the ready
/// set and added to the time-blocked set; the tick handler moves it back
/// to ready when the delay expires.
pub fn os_time_dly(ticks: OsTick) -> OsResult<()> {
    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if is_isr_context() {
        return Err(OsError::TimeDlyIsr);
    }
    if kernel::KERNEL.sched_lock_nesting() > 0 {
        return Err(OsError::SchedLocked);
    }
    if ticks == 0 {
        return Ok(());
    }

    critical_section(|_cs| unsafe {
        if let Some(cur) = kernel::tcb_cur_id() {
            let tcb = kernel::tcb_mut(cur);
            tcb.tick_remain = ticks;
            tcb.state = state::DELAY;

            sched::rdy_remove(cur);
            kernel::blocked_bitmap().insert(tcb.prio);
        }
    });

    sched::os_sched();

    Ok(())
}

/// Delay the calling task for a duration given as hours/minutes/seconds/
/// milliseconds.
pub fn os_time_dly_hmsm(hours: u16, minutes: u8, seconds: u8, milliseconds: u16) -> OsResult<()> {
    if minutes > 59 || seconds > 59 || milliseconds > 999 {
        return Err(OsError::StateInvalid);
    }

    let total_ms =
        (hours as u32) * 3_600_000 + (minutes as u32) * 60_000 + (seconds as u32) * 1000 + (milliseconds as u32);
    let ticks = (total_ms * CFG_TICK_RATE_HZ) / 1000;

    os_time_dly(ticks)
}

/// Resume a delayed task before its delay expires.
pub fn os_time_dly_resume(id: TcbId) -> OsResult<()> {
    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if is_isr_context() {
        return Err(OsError::TimeDlyIsr);
    }

    critical_section(|_cs| unsafe {
        let tcb = kernel::tcb_mut(id);
        if !tcb.is_delayed() {
            return Err(OsError::TaskNotDly);
        }

        let prio = tcb.prio;
        tcb.tick_remain = 0;
        tcb.state &= !state::DELAY;
        kernel::blocked_bitmap().remove(prio);

        if state::is_ready(tcb.state) {
            sched::rdy_insert(id);
        }

        sched::os_sched();
        Ok(())
    })
}

/// Current system tick count.
#[inline]
pub fn os_time_get() -> OsTick {
    kernel::KERNEL.tick_get()
}

/// Tick interrupt handler: advances the tick counter, resumes expired
/// delays/pend-timeouts, and reschedules on exit.
pub fn os_tick_handler() {
    if !kernel::KERNEL.is_running() {
        return;
    }

    kernel::KERNEL.int_enter();
    kernel::KERNEL.tick_increment();

    critical_section(|_cs| {
        process_delayed_tasks();
    });

    kernel::os_int_exit();
}

/// Walk the time-blocked bitmap, decrementing each blocked task's
/// `tick_remain` and waking any that reach zero.
fn process_delayed_tasks() {
    let snapshot = unsafe { *kernel::blocked_bitmap() };

    for prio in snapshot.iter() {
        let Some(id) = (unsafe { kernel::prio_index().get(prio) }) else { continue };

        unsafe {
            let tcb = kernel::tcb_mut(id);
            if tcb.tick_remain > 1 {
                tcb.tick_remain -= 1;
                continue;
            }

            tcb.tick_remain = 0;
            kernel::blocked_bitmap().remove(prio);

            wake_timed_out(id);
        }
    }
}

/// Wake a task whose delay or pend-timeout has just expired.
///
/// # Safety
/// Caller must hold the kernel critical section.
unsafe fn wake_timed_out(id: TcbId) {
    unsafe {
        let tcb = kernel::tcb_mut(id);

        if tcb.is_suspended() {
            // Delay elapsed while suspended: stay suspended, just clear the delay bit.
            tcb.state &= !state::DELAY;
            return;
        }

        if tcb.state & state::PEND_MASK != 0 {
            // Pend timed out: leave the event and become ready.
            if let Some(ev) = tcb.pend_event.take() {
                crate::event::ecb_mut(ev).wait.remove(id);
            }
            if let Some(fg) = tcb.pend_flag_grp.take() {
                crate::flags::flag_grp_mut(fg).wait.remove(id);
            }
            tcb.pend_result = PendResult::Timeout;
        }

        tcb.state &= !(state::DELAY | state::PEND_MASK);
        sched::rdy_insert(id);
    }
}

/// Used by `sync::*`'s pend-with-timeout paths to register the timeout
/// alongside the event wait-list insertion.
///
/// # Safety
/// Caller must hold the kernel critical section and have already set
/// the task's pend state/list membership.
pub(crate) unsafe fn arm_pend_timeout(id: TcbId, prio: OsPrio, ticks: OsTick) {
    if ticks == 0 {
        return;
    }
    unsafe {
        kernel::tcb_mut(id).tick_remain = ticks;
        kernel::blocked_bitmap().insert(prio);
    }
}

#[no_mangle]
pub extern "C" fn SysTick() {
    os_tick_handler();
}
