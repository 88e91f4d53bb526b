//! Compile-time configuration for PrettyOS
//!
//! These constants control the behavior and resource limits of the kernel.
//! There is no runtime configuration surface: every limit here is baked in
//! at build time.

/// Maximum number of priority levels (= task slots). Priorities 0 and 1 are
/// reserved (idle and the priority-ceiling-protocol marker); applications
/// use `CFG_PRIO_APP_MIN..CFG_PRIO_MAX`. Idle itself sits at priority 0, the
/// numerically lowest and so least urgent slot.
pub const CFG_PRIO_MAX: usize = 64;

/// Priority reserved to mark a mutex's priority-ceiling slot before any
/// task has been raised into it.
pub const CFG_PRIO_CEILING_MARKER: u8 = 1;

/// Lowest usable application priority; 0 and 1 are reserved.
pub const CFG_PRIO_APP_MIN: u8 = 2;

/// Idle task priority — numerically the lowest priority, hence the least
/// urgent and the one the scheduler falls back to when nothing else is
/// ready.
pub const CFG_PRIO_IDLE: u8 = 0;

/// System tick rate in Hz.
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Minimum task stack size, in stack elements.
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Maximum number of event control blocks (semaphores + mutexes + mailboxes
/// share one pool, per spec.md S3).
pub const CFG_MAX_EVENTS: usize = 32;

/// Maximum number of event flag groups (separate pool from `CFG_MAX_EVENTS`).
pub const CFG_MAX_FLAG_GROUPS: usize = 16;

/// Maximum number of memory partition descriptors.
pub const CFG_MAX_MEM_PARTITIONS: usize = 8;

/// Enable the counting semaphore primitive.
pub const CFG_SEM_EN: bool = cfg!(feature = "sem");

/// Enable the priority-ceiling mutex primitive.
pub const CFG_MUTEX_EN: bool = cfg!(feature = "mutex");

/// Enable the single-slot mailbox primitive.
pub const CFG_MAILBOX_EN: bool = cfg!(feature = "mailbox");

/// Enable event flag groups.
pub const CFG_FLAG_EN: bool = cfg!(feature = "flags");

/// Enable fixed-block memory partitions.
pub const CFG_MEM_EN: bool = cfg!(feature = "mem");

/// Use the Earliest-Deadline-First scheduler instead of the unique-priority
/// preemptive scheduler. Chosen at build time (spec.md S4.2).
pub const CFG_EDF_EN: bool = cfg!(feature = "edf");

/// Enable stack watermark checking on every context switch.
pub const CFG_STK_CHK_EN: bool = cfg!(feature = "stk-chk");

/// Flag word width for event flag groups, in bits. Valid values: 8/16/32/64.
/// `OsFlags` must be widened to match if this changes.
pub const CFG_FLAG_WIDTH: u32 = 32;
