//! Priority-ceiling demo.
//!
//! Three tasks: Low(5), Med(6), High(7) contend on a mutex with ceiling 8
//! (a priority more urgent than any of the three, reserved for no task).
//! While Low holds the mutex and High is blocked on it, Low is raised to
//! the ceiling so Med can never preempt it and extend High's wait —
//! classic priority inversion, prevented by a fixed ceiling rather than by
//! copying the blocked task's own priority.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use prettyos::time::os_time_dly;
use prettyos::types::{OsStkElement, opt};
use prettyos::mutex::Mutex;
use prettyos::os_task_create;

static HIGH_RUNS: AtomicU32 = AtomicU32::new(0);
static LOW_RUNS: AtomicU32 = AtomicU32::new(0);

static MTX: Mutex = Mutex::new();

static mut HIGH_STK: [OsStkElement; 128] = [0; 128];
static mut MED_STK: [OsStkElement; 128] = [0; 128];
static mut LOW_STK: [OsStkElement; 128] = [0; 128];

const CEILING: u8 = 8;

fn high_task_fn(_arg: *mut ()) -> ! {
    let _ = os_time_dly(50);

    loop {
        let n = HIGH_RUNS.fetch_add(1, Ordering::Relaxed) + 1;

        let _ = MTX.lock(0, opt::NONE);
        prettyos::info!("[HIGH] acquired #{}", n);

        for _ in 0..1_000 {
            cortex_m::asm::nop();
        }

        let _ = MTX.unlock(opt::NONE);
        let _ = os_time_dly(100);
    }
}

fn med_task_fn(_arg: *mut ()) -> ! {
    loop {
        for _ in 0..50_000 {
            cortex_m::asm::nop();
        }
        let _ = os_time_dly(10);
    }
}

fn low_task_fn(_arg: *mut ()) -> ! {
    loop {
        let n = LOW_RUNS.fetch_add(1, Ordering::Relaxed) + 1;

        let _ = MTX.lock(0, opt::NONE);
        prettyos::info!("[LOW] holding #{}", n);

        for _ in 0..100_000 {
            cortex_m::asm::nop();
        }

        let _ = MTX.unlock(opt::NONE);
        let _ = os_time_dly(200);
    }
}

#[entry]
fn main() -> ! {
    prettyos::info!("priority ceiling demo: L(5) M(6) H(7) ceiling(8)");

    prettyos::os_init().expect("os init failed");
    MTX.create(CEILING, "Mtx").unwrap();

    os_task_create("L", low_task_fn, core::ptr::null_mut(), unsafe { &mut *&raw mut LOW_STK }, 5).unwrap();
    os_task_create("M", med_task_fn, core::ptr::null_mut(), unsafe { &mut *&raw mut MED_STK }, 6).unwrap();
    os_task_create("H", high_task_fn, core::ptr::null_mut(), unsafe { &mut *&raw mut HIGH_STK }, 7).unwrap();

    prettyos::info!("starting");
    prettyos::os_start().expect("os start failed");

    loop {
        cortex_m::asm::wfi();
    }
}
