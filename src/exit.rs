pub const QEMU_EXIT_PORT: u16 = 0xf4;

/// Values written to QEMU's `isa-debug-exit` device. QEMU exits with
/// `(value << 1) | 1`, so `Success` becomes 33.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

pub fn exit_qemu(exit_code: QemuExitCode) {
    use x86_64::instructions::port::Port;

    unsafe {
        let mut port = Port::new(QEMU_EXIT_PORT);
        port.write(exit_code as u32);
    }
}
