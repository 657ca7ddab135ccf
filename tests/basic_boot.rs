#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(little_kernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use little_kernel::{boot, idle, serial_println};

#[unsafe(no_mangle)] // don't mangle the name of this function
pub extern "C" fn _start() -> ! {
    boot::init();
    test_main();

    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    little_kernel::test_panic_handler(info)
}

#[test_case]
fn test_serial_println_after_boot() {
    serial_println!("test_serial_println_after_boot output");
}

#[test_case]
fn test_entry_point_is_linked() {
    assert_ne!(idle::entry_address(), 0);
}

#[test_case]
fn test_interrupts_still_disabled_before_handoff() {
    assert!(!x86_64::instructions::interrupts::are_enabled());
}
