//! Blink demo: two periodic tasks, one toggling an LED via the STM32F401
//! PAC (when built with `--features pac`), one just ticking over.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use prettyos::time::os_time_dly;
use prettyos::types::OsStkElement;
use prettyos::os_task_create;

#[cfg(feature = "pac")]
use stm32_metapac as pac;

static mut BLINK_STK: [OsStkElement; 128] = [0; 128];
static mut TEST_STK: [OsStkElement; 128] = [0; 128];

#[cfg(feature = "pac")]
fn led_init() {
    pac::RCC.ahb1enr().modify(|w| w.set_gpioaen(true));
    pac::GPIOA.moder().modify(|w| w.set_moder(5, pac::gpio::vals::Moder::OUTPUT));
    pac::GPIOA.otyper().modify(|w| w.set_ot(5, pac::gpio::vals::Ot::PUSHPULL));
}

#[cfg(feature = "pac")]
fn led_on() {
    pac::GPIOA.bsrr().write(|w| w.set_bs(5, true));
}

#[cfg(feature = "pac")]
fn led_off() {
    pac::GPIOA.bsrr().write(|w| w.set_br(5, true));
}

#[cfg(not(feature = "pac"))]
fn led_init() {}
#[cfg(not(feature = "pac"))]
fn led_on() {}
#[cfg(not(feature = "pac"))]
fn led_off() {}

fn blink_task(_: *mut ()) -> ! {
    prettyos::info!("blink task started");
    loop {
        led_on();
        prettyos::info!("LED ON");
        let _ = os_time_dly(500);

        led_off();
        prettyos::info!("LED OFF");
        let _ = os_time_dly(500);
    }
}

fn test_task(_: *mut ()) -> ! {
    prettyos::info!("test task started");
    loop {
        prettyos::info!("tick");
        let _ = os_time_dly(1000);
    }
}

#[entry]
fn main() -> ! {
    led_init();

    prettyos::os_init().expect("os init failed");

    os_task_create("Blink", blink_task, core::ptr::null_mut(), unsafe { &mut *&raw mut BLINK_STK }, 5)
        .expect("blink task creation failed");

    os_task_create("Test", test_task, core::ptr::null_mut(), unsafe { &mut *&raw mut TEST_STK }, 6)
        .expect("test task creation failed");

    prettyos::info!("starting");
    prettyos::os_start().expect("os start failed");

    loop {
        cortex_m::asm::nop();
    }
}
