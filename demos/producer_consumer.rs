//! Producer-consumer demo using a counting semaphore.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use prettyos::time::os_time_dly;
use prettyos::types::{OsStkElement, opt};
use prettyos::sem::Semaphore;
use prettyos::os_task_create;

static PRODUCED: AtomicU32 = AtomicU32::new(0);
static CONSUMED: AtomicU32 = AtomicU32::new(0);

static SEM: Semaphore = Semaphore::new();

static mut PRODUCER_STK: [OsStkElement; 128] = [0; 128];
static mut CONSUMER_STK: [OsStkElement; 128] = [0; 128];

fn producer_task(_arg: *mut ()) -> ! {
    loop {
        let n = PRODUCED.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = SEM.signal(opt::NONE);
        prettyos::info!("[P] produced #{}", n);
        let _ = os_time_dly(200);
    }
}

fn consumer_task(_arg: *mut ()) -> ! {
    loop {
        let _ = SEM.wait(0, opt::NONE);
        let n = CONSUMED.fetch_add(1, Ordering::Relaxed) + 1;
        prettyos::info!("[C] consumed #{}", n);
        for _ in 0..10_000 {
            cortex_m::asm::nop();
        }
    }
}

#[entry]
fn main() -> ! {
    prettyos::info!("producer-consumer demo");

    prettyos::os_init().expect("os init failed");
    SEM.create(0, "Sem").unwrap();

    os_task_create("P", producer_task, core::ptr::null_mut(), unsafe { &mut *&raw mut PRODUCER_STK }, 15).unwrap();
    os_task_create("C", consumer_task, core::ptr::null_mut(), unsafe { &mut *&raw mut CONSUMER_STK }, 10).unwrap();

    prettyos::info!("starting");
    prettyos::os_start().expect("os start failed");

    loop {
        cortex_m::asm::wfi();
    }
}
