#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(little_kernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use little_kernel::{boot, kmain, serial_println};

/// ELF entry. The bootloader jumps here once, on its own stack.
#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    boot::init();

    #[cfg(test)]
    test_main();

    boot::handoff(kmain)
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("[panic] {}", info);
    little_kernel::hlt_loop();
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    little_kernel::test_panic_handler(info)
}
