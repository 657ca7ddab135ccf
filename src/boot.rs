use core::arch::asm;

use crate::{klog, serial};

/// Brings up the debug channel and announces the `Booted` state.
pub fn init() {
    serial::init();
    klog!("little-kernel {}", env!("CARGO_PKG_VERSION"));
    klog!("[boot] state: Booted");
}

/// Transfers control to `entry` without leaving a way back.
///
/// The stack is realigned and a null return address is pushed, so `entry`
/// starts with the same stack shape a `call` would give it, but the frame it
/// would return into does not exist.
pub fn handoff(entry: extern "C" fn() -> !) -> ! {
    klog!("[boot] handing off to {:#x}", entry as usize);
    klog!("[boot] Booted -> Idle");

    unsafe {
        asm!(
            "and rsp, -16",
            "push 0",
            "jmp {entry}",
            entry = in(reg) entry,
            options(noreturn)
        );
    }
}
