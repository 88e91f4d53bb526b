//! Core type definitions for PrettyOS
//!
//! Strong types for RTOS primitives, replacing the raw counters and
//! pointer-sized handles a C kernel would use.

/// Task priority (higher number = more urgent; 0 is Idle). Also doubles as
/// a task's stable slot index under the priority scheduler; under EDF it is
/// unused for ordering but still reserves the task's `TcbId` slot.
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Semaphore counter type
pub type OsSemCtr = u32;

/// Nesting counter
pub type OsNestingCtr = u8;

/// Option flags for API calls
pub type OsOpt = u16;

/// Message size type
pub type OsMsgSize = usize;

/// Object quantity type
pub type OsObjQty = u16;

/// Stack element type
pub type OsStkElement = u32;

/// Event flags type. Width is `CFG_FLAG_WIDTH` bits, currently 32.
pub type OsFlags = u32;

// ============ Stable indices ============
//
// The kernel never moves a TCB, ECB, flag group or partition descriptor in
// memory once created: every cross-reference is a small index into a fixed
// array rather than a raw pointer. `prio_index` (core::prio_index) is the
// one place a priority is remapped to a different `TcbId`.

/// Stable index of a task's slot in the TCB pool. Assigned once at task
/// creation and never reused for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TcbId(pub u8);

impl TcbId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable index into the shared semaphore/mutex/mailbox ECB pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u16);

impl EventId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable index into the event flag group pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlagGrpId(pub u16);

impl FlagGrpId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable index into the memory partition pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub u16);

impl PartitionId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============ Task state bitset ============

/// A task's state, as an orthogonal bitset rather than a flat enum.
///
/// `READY` is the all-zero state. `DELAY`, `SUSPENDED` and exactly one
/// `PEND_*` bit may be combined (e.g. a task pending on a semaphore with a
/// timeout is also delayed: `PEND_SEM | DELAY`). `DELETED` is a terminal
/// value outside the bitset proper and is never combined with anything
/// else.
pub type TaskState = u8;

pub mod state {
    use super::TaskState;

    pub const READY: TaskState = 0x00;
    pub const DELAY: TaskState = 0x01;
    pub const SUSPENDED: TaskState = 0x02;
    pub const PEND_SEM: TaskState = 0x04;
    pub const PEND_MUTEX: TaskState = 0x08;
    pub const PEND_MAILBOX: TaskState = 0x10;
    pub const PEND_FLAG: TaskState = 0x20;
    pub const PEND_MASK: TaskState = PEND_SEM | PEND_MUTEX | PEND_MAILBOX | PEND_FLAG;
    pub const DELETED: TaskState = 0xFF;

    #[inline(always)]
    pub fn is_ready(s: TaskState) -> bool {
        s == READY
    }

    #[inline(always)]
    pub fn is_pending(s: TaskState) -> bool {
        s & PEND_MASK != 0
    }

    #[inline(always)]
    pub fn is_delayed(s: TaskState) -> bool {
        s & DELAY != 0
    }

    #[inline(always)]
    pub fn is_suspended(s: TaskState) -> bool {
        s & SUSPENDED != 0
    }
}

/// Outcome of a blocking pend, reported back to the waiter once it is
/// resumed (by post, timeout, abort, or object deletion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendResult {
    Ok,
    Timeout,
    Abort,
    Del,
}

/// What kind of synchronization object an ECB pool slot currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Unused,
    Sem,
    Mutex,
    Mailbox,
}

/// Flag-group wait condition (spec.md S4.8): any/all of the requested bits,
/// optionally consuming (clearing) them on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagWaitKind {
    ClearAll,
    ClearAny,
    SetAll,
    SetAny,
}

/// EDF task arrival model (spec.md S4.2/S3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdfTaskKind {
    Periodic,
    Sporadic,
    Aperiodic,
}

// ============ Option flags ============

pub mod opt {
    use super::OsOpt;

    pub const NONE: OsOpt = 0x0000;

    // Delete options
    pub const DEL_NO_PEND: OsOpt = 0x0000;
    pub const DEL_ALWAYS: OsOpt = 0x0001;

    // Pend options
    pub const PEND_BLOCKING: OsOpt = 0x0000;
    pub const PEND_NON_BLOCKING: OsOpt = 0x8000;

    // Post options
    pub const POST_FIFO: OsOpt = 0x0000;
    pub const POST_LIFO: OsOpt = 0x0010;
    pub const POST_ALL: OsOpt = 0x0200;
    pub const POST_NO_SCHED: OsOpt = 0x8000;

    // Task options
    pub const TASK_NONE: OsOpt = 0x0000;
    pub const TASK_STK_CHK: OsOpt = 0x0001;
    pub const TASK_STK_CLR: OsOpt = 0x0002;

    // Flag wait-kind options (pend)
    pub const FLAG_CLR_ALL: OsOpt = 0x0001;
    pub const FLAG_CLR_ANY: OsOpt = 0x0002;
    pub const FLAG_SET_ALL: OsOpt = 0x0004;
    pub const FLAG_SET_ANY: OsOpt = 0x0008;
    pub const FLAG_CONSUME: OsOpt = 0x0100;

    // Flag post-direction options
    pub const FLAG_POST_SET: OsOpt = 0x0010;
    pub const FLAG_POST_CLR: OsOpt = 0x0020;
}
