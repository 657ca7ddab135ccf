use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

pub const COM1: u16 = 0x3F8;

lazy_static! {
    pub static ref SERIAL1: Mutex<SerialPort> = {
        let mut serial_port = unsafe { SerialPort::new(COM1) };
        serial_port.init();
        Mutex::new(serial_port)
    };
}

/// Forces the lazy port setup so the first log line doesn't pay for it.
pub fn init() {
    lazy_static::initialize(&SERIAL1);
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    use core::fmt::Write;
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        SERIAL1
            .lock()
            .write_fmt(args)
            .expect("Printing to serial failed");
    });
}

/// Prints to the host through the serial interface.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

/// Prints to the host through the serial interface, appending a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($fmt:expr) => ($crate::serial_print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::serial_print!(
        concat!($fmt, "\n"), $($arg)*));
}

/// Boot progress line. Compiled out without the `boot_log` feature.
#[cfg(feature = "boot_log")]
#[macro_export]
macro_rules! klog {
    ($($arg:tt)*) => ($crate::serial_println!($($arg)*));
}

#[cfg(not(feature = "boot_log"))]
#[macro_export]
macro_rules! klog {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}
