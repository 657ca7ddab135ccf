#![no_std]
#![no_main]

use core::panic::PanicInfo;

use little_kernel::exit::{QemuExitCode, exit_qemu};
use little_kernel::trace::Expectation;
use little_kernel::{boot, hlt_loop, idle, serial_print, serial_println, watchdog};

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    boot::init();
    serial_print!("arm_twice_panics::arm_twice...\t");

    let expectation = Expectation::new(idle::entry_address());
    watchdog::arm(expectation, None);
    watchdog::arm(expectation, None);

    serial_println!("[test did not panic]");
    exit_qemu(QemuExitCode::Failed);
    hlt_loop();
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    let armed_twice = info
        .message()
        .as_str()
        .is_some_and(|message| message == "watchdog already armed");

    if armed_twice {
        serial_println!("[ok]");
        exit_qemu(QemuExitCode::Success);
    } else {
        serial_println!("[failed]\n");
        serial_println!("Error: {}\n", info);
        exit_qemu(QemuExitCode::Failed);
    }
    hlt_loop();
}
