#![no_std]
#![no_main]

use core::panic::PanicInfo;

use little_kernel::exit::{QemuExitCode, exit_qemu};
use little_kernel::trace::{Expectation, Snapshot};
use little_kernel::{boot, hlt_loop, idle, kmain, serial_print, serial_println, watchdog};

const POISON: u64 = 0xDEAD_BEEF_DEAD_BEEF;

#[unsafe(no_mangle)]
#[allow(unreachable_code)]
pub extern "C" fn _start() -> ! {
    boot::init();
    serial_print!("idle_never_returns::kmain...\t");

    // Lives in this frame, above the stack pointer `kmain` starts with.
    let poison = core::hint::black_box([POISON; 128]);
    let snapshot = unsafe {
        Snapshot::capture(poison.as_ptr().cast(), core::mem::size_of_val(&poison))
    };

    watchdog::arm(Expectation::new(idle::entry_address()), Some(snapshot));
    kmain();

    core::hint::black_box(&poison);
    serial_println!("[failed]\n");
    serial_println!("Error: kmain returned\n");
    exit_qemu(QemuExitCode::Failed);
    hlt_loop();
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    little_kernel::test_panic_handler(info)
}
