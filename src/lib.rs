//! PrettyOS: a small, statically-configured, preemptive real-time kernel
//! for single-core microcontrollers.
//!
//! - Priority-bitmap or earliest-deadline-first preemptive scheduling
//!   (build-time choice, see the `edf` feature)
//! - Synchronization primitives: counting semaphores, priority-ceiling
//!   mutexes, single-slot mailboxes, event flag groups
//! - Fixed-block memory partitions
//! - Tick-based delays and pend timeouts
//! - Context switching for ARM Cortex-M

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{Impl, RawRestoreState, set_impl};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod mem;
pub mod port;
pub mod sync;

// ============ Re-exports ============

pub use core::bitmap;
pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::cs_cell;
pub use core::error;
pub use core::error::OsError;
pub use core::event;
pub use core::flags;
pub use core::hooks;
pub use core::hooks::OsHooks;
pub use core::kernel;
pub use core::kernel::{os_init, os_install_hooks, os_start};
pub use core::list;
pub use core::prio_index;
pub use core::sched;
pub use core::task;
pub use core::task::{os_task_change_prio, os_task_create, os_task_del, os_task_resume, os_task_suspend};
pub use core::time;
pub use core::types;
pub use core::types::*;

#[cfg(feature = "sem")]
pub use sync::sem;
#[cfg(feature = "mutex")]
pub use sync::mutex;
#[cfg(feature = "mailbox")]
pub use sync::mailbox;
#[cfg(feature = "flags")]
pub use sync::flags as flag_grp;

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
