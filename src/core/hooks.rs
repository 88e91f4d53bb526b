//! Application-installable hooks.
//!
//! The IDLE task calls out to an installed hook object rather than
//! spinning on `cortex_m::asm::nop()` directly — the classic
//! `App_TaskIdleHook`-style seam `original_source/kernel/pretty_core.c`
//! exposes. Install one with [`crate::kernel::os_install_hooks`] before
//! [`crate::kernel::os_start`].

/// Hooks the application may install to observe kernel lifecycle events.
///
/// Every method has a no-op default so an application only needs to
/// override the ones it cares about.
pub trait OsHooks: Sync {
    /// Called in a loop from the IDLE task. Typical uses: enter a low-power
    /// sleep mode, feed a watchdog, accumulate CPU-idle statistics.
    fn on_idle(&self) {}

    /// Called once per tick interrupt, before delayed tasks are resumed.
    fn on_tick(&self) {}

    /// Called immediately before a context switch takes effect.
    fn on_task_switch(&self) {}

    /// Called when a task's stack is found to have grown past its
    /// watermark (only checked when built with the `stk-chk` feature).
    fn on_stack_overflow(&self, task_name: &'static str) {
        let _ = task_name;
    }
}

/// Default hooks: every callback is a no-op.
pub struct NoOpHooks;

impl OsHooks for NoOpHooks {}
