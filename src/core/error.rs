//! Error types for PrettyOS
//!
//! A single flat `Result`-friendly error enum, numbered after
//! `pretty_errno.h`'s `OS_ERR_*` constants. Categories and numbering are
//! kept; variant names are remapped to the primitives this kernel
//! actually exposes.

/// RTOS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OsError {
    /// No error
    None = 0,

    // ============ ISR errors ============
    AcceptIsr = 10001,
    CreateIsr = 12001,
    DelIsr = 13001,

    // ============ Fatal errors ============
    /// A task function returned instead of looping forever
    FatalReturn = 15001,

    // ============ Event flag errors ============
    FlagGrpPoolEmpty = 15101,
    FlagNotRdy = 15102,
    FlagInvalidOpt = 15103,

    // ============ Lock errors ============
    LockNestingOvf = 21001,

    // ============ Memory partition errors ============
    MemInvalidAddr = 22203,
    MemInvalidBlockSize = 22204,
    MemNoFreeBlocks = 22210,
    MemFullPartition = 22211,
    MemPartitionPoolEmpty = 22212,

    // ============ Mutex errors ============
    MutexNotOwner = 22401,
    MutexOwner = 22402,
    MutexNesting = 22403,
    MutexNestingOvf = 22404,
    /// Ceiling priority is lower than the mutex owner's current priority
    MutexCeilingTooLow = 22405,
    MutexCeilingInUse = 22406,

    // ============ Object errors ============
    ObjDel = 24002,
    ObjPoolEmpty = 24003,
    ObjType = 24004,

    // ============ Option errors ============
    OptInvalid = 24101,

    // ============ OS state errors ============
    OsNotRunning = 24201,
    OsRunning = 24202,
    OsNotInit = 24203,
    OsNoAppTask = 24204,

    // ============ Pend errors ============
    PendAbort = 25001,
    PendAbortIsr = 25002,
    PendAbortNone = 25003,
    PendAbortSelf = 25004,
    PendDel = 25005,
    PendIsr = 25006,
    PendLocked = 25007,
    PendWouldBlock = 25008,

    // ============ Priority errors ============
    PrioExist = 25201,
    PrioInvalid = 25203,
    PrioReserved = 25204,

    // ============ Mailbox errors ============
    MboxFull = 26001,

    // ============ Scheduler errors ============
    SchedLockIsr = 28002,
    SchedLocked = 28003,
    SchedNotLocked = 28004,
    SchedUnlockIsr = 28005,

    // ============ Semaphore errors ============
    SemOvf = 28101,

    // ============ State errors ============
    StateInvalid = 28205,
    StkInvalid = 28207,
    StkSizeInvalid = 28208,
    StkOvf = 28210,

    // ============ Task errors ============
    TaskChangePrioIsr = 29001,
    TaskCreateIsr = 29002,
    TaskDelIdle = 29004,
    TaskDelIsr = 29006,
    TaskInvalid = 29007,
    TaskPoolEmpty = 29008,
    TaskNotDly = 29009,
    TaskNotSuspended = 29011,
    TaskSuspendIsr = 29017,
    TaskSuspendIdle = 29019,
    TaskResumeIsr = 29020,

    // ============ TCB errors ============
    TcbInvalid = 29101,

    // ============ Time errors ============
    TimeDlyIsr = 29301,

    // ============ Timeout ============
    Timeout = 29401,

    // ============ Yield errors ============
    YieldIsr = 34001,
}

/// Result type alias for RTOS operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == OsError::None
    }

    #[inline]
    pub fn is_err(self) -> bool {
        self != OsError::None
    }
}
