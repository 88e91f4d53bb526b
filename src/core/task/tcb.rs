//! Task Control Block (TCB) definition
//!
//! Links to other kernel objects through stable `TcbId`/`EventId` indices
//! instead of `NonNull` pointers: a TCB never moves once created, so
//! every cross-reference is a small integer rather than a raw address.

use crate::types::{
    EdfTaskKind, EventId, FlagGrpId, FlagWaitKind, OsFlags, OsNestingCtr, OsOpt, OsPrio,
    OsStkElement, OsTick, PendResult, TaskState, TcbId, state,
};

/// Task entry point function type
pub type OsTaskFn = fn(*mut ()) -> !;

/// Task Control Block
pub struct OsTcb {
    // ============ Stack ============
    pub stk_ptr: *mut OsStkElement,
    pub stk_base: *mut OsStkElement,
    pub stk_limit: *mut OsStkElement,
    pub stk_size: usize,

    // ============ Identity ============
    pub name: &'static str,
    /// This task's own stable slot index.
    pub id: TcbId,

    // ============ Single intrusive list link ============
    //
    // A task is a member of exactly one doubly-linked list at a time: the
    // ready list at its current priority, or an event's wait list. Being
    // also delayed with a timeout is tracked separately via the
    // time-blocked bitmap, not a list link (see core::time).
    pub link_next: Option<TcbId>,
    pub link_prev: Option<TcbId>,

    // ============ Priority ============
    /// Effective priority: normally equal to `base_prio`, temporarily
    /// raised while holding a contended priority-ceiling mutex.
    pub prio: OsPrio,
    pub base_prio: OsPrio,

    // ============ State ============
    pub state: TaskState,
    pub opt: OsOpt,

    // ============ Pend bookkeeping ============
    /// ECB this task is blocked on (semaphore, mutex, or mailbox).
    pub pend_event: Option<EventId>,
    /// Flag group this task is blocked on.
    pub pend_flag_grp: Option<FlagGrpId>,
    pub pend_flag_mask: OsFlags,
    pub pend_flag_kind: Option<FlagWaitKind>,
    pub pend_result: PendResult,

    // ============ Delay / timeout ============
    /// Ticks remaining until a delay or pend-timeout expires. Only
    /// meaningful while `state::is_delayed(state)` is true.
    pub tick_remain: OsTick,

    // ============ Suspend ============
    pub suspend_ctr: OsNestingCtr,

    // ============ EDF scheduling (spec.md S3/S4.2) ============
    pub edf_kind: EdfTaskKind,
    /// Absolute tick by which this job must complete.
    pub edf_deadline: OsTick,
    /// Relative deadline, re-applied at each release for periodic tasks.
    pub edf_relative_deadline: OsTick,
    /// Period for periodic tasks (ticks); unused otherwise.
    pub edf_period: OsTick,
}

impl OsTcb {
    /// Create a new, uninitialized TCB occupying slot `id`.
    pub const fn new(id: TcbId) -> Self {
        OsTcb {
            stk_ptr: core::ptr::null_mut(),
            stk_base: core::ptr::null_mut(),
            stk_limit: core::ptr::null_mut(),
            stk_size: 0,

            name: "",
            id,

            link_next: None,
            link_prev: None,

            prio: 0,
            base_prio: 0,

            state: state::READY,
            opt: 0,

            pend_event: None,
            pend_flag_grp: None,
            pend_flag_mask: 0,
            pend_flag_kind: None,
            pend_result: PendResult::Ok,

            tick_remain: 0,

            suspend_ctr: 0,

            edf_kind: EdfTaskKind::Aperiodic,
            edf_deadline: 0,
            edf_relative_deadline: 0,
            edf_period: 0,
        }
    }

    /// Re-initialize TCB to default values, preserving its slot id.
    pub fn init(&mut self) {
        let id = self.id;
        *self = Self::new(id);
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        state::is_ready(self.state)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        state::is_pending(self.state)
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        state::is_suspended(self.state)
    }

    #[inline]
    pub fn is_delayed(&self) -> bool {
        state::is_delayed(self.state)
    }
}

unsafe impl Send for OsTcb {}
unsafe impl Sync for OsTcb {}
