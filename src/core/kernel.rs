//! Global kernel state: the TCB pool, ready/time-blocked bitmaps, the
//! priority index, and CPU/context-switch state.
//!
//! Built around stable `TcbId` indices instead of free-floating
//! `NonNull<OsTcb>` pointers threaded through linked lists. A task's
//! `TcbId` is its slot in a fixed `[OsTcb; CFG_PRIO_MAX]` pool, matching
//! the single-task-per-priority model `original_source/kernel/pretty_task.c`
//! implements. `CpuState` keeps a raw-pointer layout since
//! `port::cortex_m4`'s PendSV handler reads it directly in naked asm; the
//! pointers it holds are always derived from the TCB pool's base address.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::bitmap::Bitmap;
use crate::config::CFG_PRIO_MAX;
use crate::critical::{CriticalSection, critical_section};
use crate::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::hooks::{NoOpHooks, OsHooks};
use crate::prio_index::PrioIndex;
use crate::task::OsTcb;
use crate::types::{OsNestingCtr, OsPrio, OsTick, TcbId};

// ============ Kernel flags ============

/// Atomic kernel flags, readable from ISR context without a lock.
pub struct KernelFlags {
    initialized: AtomicBool,
    running: AtomicBool,
    int_nesting: AtomicU8,
    sched_lock_nesting: AtomicU8,
    tick_counter: AtomicU32,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            int_nesting: AtomicU8::new(0),
            sched_lock_nesting: AtomicU8::new(0),
            tick_counter: AtomicU32::new(0),
        }
    }

    pub(crate) fn reset(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.int_nesting.store(0, Ordering::SeqCst);
        self.sched_lock_nesting.store(0, Ordering::SeqCst);
        self.tick_counter.store(0, Ordering::SeqCst);
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn tick_get(&self) -> OsTick {
        self.tick_counter.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn int_nesting(&self) -> OsNestingCtr {
        self.int_nesting.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn sched_lock_nesting(&self) -> OsNestingCtr {
        self.sched_lock_nesting.load(Ordering::SeqCst)
    }

    #[inline(always)]
    pub(crate) fn tick_increment(&self) -> OsTick {
        self.tick_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline(always)]
    pub(crate) fn int_enter(&self) {
        if self.is_running() {
            let nesting = self.int_nesting.fetch_add(1, Ordering::Relaxed);
            if nesting == 254 {
                self.int_nesting.store(254, Ordering::Relaxed);
            }
        }
    }

    #[inline(always)]
    pub(crate) fn set_initialized(&self, val: bool) {
        self.initialized.store(val, Ordering::SeqCst);
    }

    #[inline(always)]
    pub(crate) fn set_running(&self, val: bool) {
        self.running.store(val, Ordering::SeqCst);
    }

    #[inline(always)]
    pub(crate) fn int_nesting_dec(&self) -> OsNestingCtr {
        let nesting = self.int_nesting.load(Ordering::Relaxed);
        if nesting > 0 {
            self.int_nesting.store(nesting - 1, Ordering::Relaxed);
        }
        nesting.saturating_sub(1)
    }

    pub(crate) fn try_sched_lock(&self) -> OsResult<()> {
        let nesting = self.sched_lock_nesting.load(Ordering::SeqCst);
        if nesting == 255 {
            return Err(OsError::LockNestingOvf);
        }
        self.sched_lock_nesting.store(nesting + 1, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn try_sched_unlock(&self) -> OsResult<OsNestingCtr> {
        let nesting = self.sched_lock_nesting.load(Ordering::SeqCst);
        if nesting == 0 {
            return Err(OsError::SchedNotLocked);
        }
        self.sched_lock_nesting.store(nesting - 1, Ordering::SeqCst);
        Ok(nesting - 1)
    }
}

pub(crate) static KERNEL: KernelFlags = KernelFlags::new();

// ============ Scheduler state ============

/// Everything the scheduler needs that isn't lock-free: the TCB pool, the
/// ready-set bitmap, the time-blocked bitmap, and the priority index.
///
/// `ready`/`blocked` and `prio_index` are all indexed by *effective*
/// priority, which for most tasks equals their `TcbId`, but can float
/// while a priority-ceiling mutex has the owner raised (sync::mutex).
pub struct SchedState {
    pub(crate) tcb_pool: [OsTcb; CFG_PRIO_MAX],
    pub(crate) tcb_used: [bool; CFG_PRIO_MAX],
    pub(crate) ready: Bitmap,
    pub(crate) blocked: Bitmap,
    pub(crate) prio_index: PrioIndex,
}

impl SchedState {
    const fn new() -> Self {
        const TCB_INIT: OsTcb = OsTcb::new(TcbId(0));
        Self {
            tcb_pool: [TCB_INIT; CFG_PRIO_MAX],
            tcb_used: [false; CFG_PRIO_MAX],
            ready: Bitmap::new(),
            blocked: Bitmap::new(),
            prio_index: PrioIndex::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        for (i, tcb) in self.tcb_pool.iter_mut().enumerate() {
            tcb.init();
            tcb.id = TcbId(i as u8);
        }
        self.tcb_used = [false; CFG_PRIO_MAX];
        self.ready.init();
        self.blocked.init();
        self.prio_index.init();
    }
}

pub(crate) static SCHED: CsCell<SchedState> = CsCell::new(SchedState::new());

/// Installed application hooks (idle hook and friends, SPEC_FULL.md A/C.1).
static HOOKS: CsCell<&'static dyn OsHooks> = CsCell::new(&NoOpHooks);

/// IDLE task stack. The IDLE task's TCB lives in the pool at `CFG_PRIO_IDLE`.
static mut IDLE_STK: [crate::types::OsStkElement; 128] = [0; 128];

// ============ CPU / context switch state ============

/// CPU context-switch state. Field layout and the raw-pointer `tcb_cur`/
/// `tcb_high_rdy` fields are load-bearing: `port::cortex_m4::PendSV` reads
/// the struct's first field directly in naked asm to test for "no task
/// running yet" (null pointer). Pointers here always point into
/// `SchedState::tcb_pool`; convert to/from `TcbId` at the edges via
/// [`CpuState::tcb_cur_id`] and friends rather than storing indices here.
#[repr(C)]
pub struct CpuState {
    pub tcb_cur: *mut OsTcb,
    pub tcb_high_rdy: *mut OsTcb,
    pub prio_cur: OsPrio,
    pub prio_high_rdy: OsPrio,
    pub except_stk_base: u32,
}

impl CpuState {
    pub const fn new() -> Self {
        Self {
            tcb_cur: core::ptr::null_mut(),
            tcb_high_rdy: core::ptr::null_mut(),
            prio_cur: 0,
            prio_high_rdy: 0,
            except_stk_base: 0,
        }
    }

    pub fn reset(&mut self) {
        self.tcb_cur = core::ptr::null_mut();
        self.tcb_high_rdy = core::ptr::null_mut();
        self.prio_cur = 0;
        self.prio_high_rdy = 0;
    }

    /// # Safety
    /// Caller must hold the kernel critical section.
    #[inline(always)]
    pub unsafe fn tcb_cur_id(&self) -> Option<TcbId> {
        unsafe { ptr_to_id(self.tcb_cur) }
    }

    /// # Safety
    /// Caller must hold the kernel critical section.
    #[inline(always)]
    pub unsafe fn set_tcb_cur_id(&mut self, id: Option<TcbId>) {
        self.tcb_cur = unsafe { id_to_ptr(id) };
    }

    /// # Safety
    /// Caller must hold the kernel critical section.
    #[inline(always)]
    pub unsafe fn tcb_high_rdy_id(&self) -> Option<TcbId> {
        unsafe { ptr_to_id(self.tcb_high_rdy) }
    }

    /// # Safety
    /// Caller must hold the kernel critical section.
    #[inline(always)]
    pub unsafe fn set_tcb_high_rdy_id(&mut self, id: Option<TcbId>) {
        self.tcb_high_rdy = unsafe { id_to_ptr(id) };
    }
}

/// # Safety
/// Caller must hold the kernel critical section; `SCHED`'s address is
/// stable for the program's lifetime.
unsafe fn id_to_ptr(id: Option<TcbId>) -> *mut OsTcb {
    match id {
        Some(tid) => unsafe { SCHED.get_unchecked().tcb_pool.as_mut_ptr().add(tid.index()) },
        None => core::ptr::null_mut(),
    }
}

/// # Safety
/// Caller must hold the kernel critical section; `ptr` must be null or a
/// pointer previously produced by [`id_to_ptr`].
unsafe fn ptr_to_id(ptr: *mut OsTcb) -> Option<TcbId> {
    if ptr.is_null() {
        return None;
    }
    unsafe {
        let base = SCHED.get_unchecked().tcb_pool.as_mut_ptr();
        let idx = ptr.offset_from(base);
        Some(TcbId(idx as u8))
    }
}

#[no_mangle]
#[used]
pub static mut CPU_STATE: CpuState = CpuState::new();

#[no_mangle]
pub static OS_KA_BASEPRI_Boundary: u32 = 0;

// ============ Initialization ============

fn os_idle_task(_: *mut ()) -> ! {
    loop {
        critical_section(|cs| {
            let hooks = *HOOKS.get(cs);
            hooks.on_idle();
        });
    }
}

#[allow(static_mut_refs)]
unsafe fn os_reset_globals() {
    KERNEL.reset();
    unsafe {
        CPU_STATE.reset();
        SCHED.get_unchecked().reset();
    }
}

/// Initialize the RTOS kernel. Must be called before any other OS function.
/// Initializes the TCB pool, ready/blocked bitmaps, and priority index, and
/// creates the IDLE task.
#[allow(static_mut_refs)]
pub fn os_init() -> OsResult<()> {
    unsafe { os_reset_globals() };

    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    critical_section(|_cs| unsafe {
        crate::task::os_task_create_internal(
            TcbId(crate::config::CFG_PRIO_IDLE),
            "Idle",
            os_idle_task,
            core::ptr::null_mut(),
            crate::config::CFG_PRIO_IDLE,
            (&raw mut IDLE_STK).cast(),
            IDLE_STK.len(),
        )
        .expect("IDLE task creation failed");
        SCHED.get_unchecked().tcb_used[crate::config::CFG_PRIO_IDLE as usize] = true;

        KERNEL.set_initialized(true);
    });

    Ok(())
}

/// Install application hooks (idle hook and friends). Call before
/// [`os_start`].
pub fn os_install_hooks(hooks: &'static dyn OsHooks) {
    critical_section(|cs| {
        *HOOKS.get(cs) = hooks;
    });
}

/// Start multitasking. Never returns under normal operation.
#[allow(static_mut_refs)]
pub fn os_start() -> OsResult<()> {
    if !KERNEL.is_initialized() {
        return Err(OsError::OsNotInit);
    }
    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    let mut any_app_task = false;
    critical_section(|cs| {
        let sched = SCHED.get(cs);
        for (prio, used) in sched.tcb_used.iter().enumerate() {
            if prio != crate::config::CFG_PRIO_IDLE as usize && *used {
                any_app_task = true;
            }
        }
    });
    if !any_app_task {
        return Err(OsError::OsNoAppTask);
    }

    critical_section(|_cs| {
        if let Some((prio, id)) = crate::sched::next_ready() {
            unsafe {
                CPU_STATE.prio_high_rdy = prio;
                CPU_STATE.prio_cur = prio;
                CPU_STATE.set_tcb_high_rdy_id(Some(id));
                CPU_STATE.set_tcb_cur_id(Some(id));
            }
        }
        KERNEL.set_running(true);
    });

    crate::port::os_cpu_systick_init(16_000_000 / crate::config::CFG_TICK_RATE_HZ);

    unsafe { crate::port::os_start_high_rdy() };

    Ok(())
}

/// Exit an interrupt service routine, rescheduling if this was the
/// outermost nesting level and nothing holds the scheduler lock.
pub fn os_int_exit() {
    if !KERNEL.is_running() {
        return;
    }

    let _cs = CriticalSection::enter();

    let old_nesting = KERNEL.int_nesting();
    if old_nesting == 0 {
        return;
    }

    let new_nesting = KERNEL.int_nesting_dec();

    if new_nesting == 0 && KERNEL.sched_lock_nesting() == 0 {
        unsafe {
            if let Some((prio, id)) = crate::sched::should_preempt() {
                CPU_STATE.prio_high_rdy = prio;
                CPU_STATE.set_tcb_high_rdy_id(Some(id));
                crate::port::os_int_ctx_sw();
            }
        }
    }
}

/// Lock the scheduler: the current task keeps running until unlocked.
pub fn os_sched_lock() -> OsResult<()> {
    if !KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if KERNEL.int_nesting() > 0 {
        return Err(OsError::SchedLockIsr);
    }
    critical_section(|_cs| KERNEL.try_sched_lock())
}

/// Unlock the scheduler.
pub fn os_sched_unlock() -> OsResult<()> {
    if !KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }
    if KERNEL.int_nesting() > 0 {
        return Err(OsError::SchedUnlockIsr);
    }
    critical_section(|_cs| {
        let remaining = KERNEL.try_sched_unlock()?;
        if remaining == 0 {
            crate::sched::os_sched();
        }
        Ok(())
    })
}

// ============ Internal accessors shared by core::task/sched/event/time ============

/// # Safety
/// Caller must hold the kernel critical section for the duration of use.
#[inline(always)]
pub(crate) unsafe fn tcb_mut(id: TcbId) -> &'static mut OsTcb {
    unsafe { &mut SCHED.get_unchecked().tcb_pool[id.index()] }
}

#[inline(always)]
pub(crate) unsafe fn ready_bitmap() -> &'static mut Bitmap {
    unsafe { &mut SCHED.get_unchecked().ready }
}

#[inline(always)]
pub(crate) unsafe fn blocked_bitmap() -> &'static mut Bitmap {
    unsafe { &mut SCHED.get_unchecked().blocked }
}

#[inline(always)]
pub(crate) unsafe fn prio_index() -> &'static mut PrioIndex {
    unsafe { &mut SCHED.get_unchecked().prio_index }
}

#[inline(always)]
pub(crate) unsafe fn tcb_used_mut() -> &'static mut [bool; CFG_PRIO_MAX] {
    unsafe { &mut SCHED.get_unchecked().tcb_used }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn tcb_cur_id() -> Option<TcbId> {
    unsafe { CPU_STATE.tcb_cur_id() }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_tcb_cur_id(id: Option<TcbId>) {
    unsafe { CPU_STATE.set_tcb_cur_id(id) }
}

#[inline(always)]
#[allow(dead_code, static_mut_refs)]
pub(crate) unsafe fn tcb_high_rdy_id() -> Option<TcbId> {
    unsafe { CPU_STATE.tcb_high_rdy_id() }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_tcb_high_rdy_id(id: Option<TcbId>) {
    unsafe { CPU_STATE.set_tcb_high_rdy_id(id) }
}

#[inline(always)]
#[allow(dead_code, static_mut_refs)]
pub(crate) unsafe fn prio_cur() -> OsPrio {
    unsafe { CPU_STATE.prio_cur }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_prio_cur(prio: OsPrio) {
    unsafe { CPU_STATE.prio_cur = prio }
}

#[inline(always)]
#[allow(dead_code, static_mut_refs)]
pub(crate) unsafe fn prio_high_rdy() -> OsPrio {
    unsafe { CPU_STATE.prio_high_rdy }
}

#[inline(always)]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_prio_high_rdy(prio: OsPrio) {
    unsafe { CPU_STATE.prio_high_rdy = prio }
}
