//! Earliest-Deadline-First scheduler variant, selected at build time by
//! the `edf` Cargo feature instead of the default unique-priority bitmap
//! scheduler.
//!
//! Grounded on `original_source/kernel/pretty_task.c`'s absolute-deadline
//! bookkeeping (`OS_TCB.OSTCBDeadline`), adapted to scan the same
//! ready-set `Bitmap` the priority scheduler uses rather than maintaining
//! a second structure.
//! Ready membership is still tracked by priority-indexed bitmap bit, but
//! under `edf` the bit position is treated only as "this slot is ready",
//! not as an ordering key — the deadline stored on each `OsTcb` is.

use crate::kernel;
use crate::types::{OsTick, TcbId};

/// Compare two absolute tick deadlines allowing for wraparound: `a` is
/// considered earlier than `b` if the signed difference `a - b` is
/// negative. Correct as long as no two live deadlines are more than
/// `u32::MAX / 2` ticks apart, which holds for any reasonable relative
/// deadline given `CFG_TICK_RATE_HZ`.
#[inline]
pub(crate) fn deadline_before(a: OsTick, b: OsTick) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Scan the ready set for the task with the earliest absolute deadline.
/// Returns the winning task's current priority slot (used only as an
/// opaque identifier for `CpuState::prio_high_rdy`, not as an ordering
/// key) together with its `TcbId`.
pub(crate) fn next_ready() -> Option<(u8, TcbId)> {
    unsafe {
        let ready = kernel::ready_bitmap();
        let prio_index = kernel::prio_index();

        let mut best: Option<(u8, TcbId, OsTick)> = None;
        for prio in ready.iter() {
            let Some(id) = prio_index.get(prio) else { continue };
            let deadline = kernel::tcb_mut(id).edf_deadline;
            match best {
                Some((_, _, best_deadline)) if !deadline_before(deadline, best_deadline) => {}
                _ => best = Some((prio, id, deadline)),
            }
        }

        best.map(|(prio, id, _)| (prio, id))
    }
}
