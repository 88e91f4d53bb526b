//! Synchronization primitives: semaphores, priority-ceiling mutexes, and
//! single-slot mailboxes.

#[cfg(feature = "sem")]
pub mod sem;

#[cfg(feature = "mutex")]
pub mod mutex;

#[cfg(feature = "mailbox")]
pub mod mailbox;

#[cfg(feature = "flags")]
pub mod flags;
