use core::sync::atomic::{AtomicUsize, Ordering};

use lazy_static::lazy_static;
use pic8259::ChainedPics;
use spin::{Mutex, Once};
use x86_64::instructions::port::Port;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

use crate::exit::{QemuExitCode, exit_qemu};
use crate::trace::{Expectation, Snapshot, Trace, Verdict, judge};
use crate::{gdt, hlt_loop, serial_println};

pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

pub const PIT_HZ: u32 = 100;
const PIT_BASE_HZ: u32 = 1_193_182;
const PIT_COMMAND: u16 = 0x43;
const PIT_CHANNEL0: u16 = 0x40;
// channel 0, lobyte/hibyte, rate generator
const PIT_MODE_RATE: u8 = 0x34;

/// Ticks tolerated before the entry point shows up in a sample. The next
/// one ends the run as `Empty`.
pub const WARMUP_LIMIT: usize = 50;

/// Receives the verdict and ends the run.
pub type Report = fn(&Verdict) -> !;

pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC_1_OFFSET,
}

impl InterruptIndex {
    fn as_u8(self) -> u8 {
        self as u8
    }
}

struct Armed {
    expectation: Expectation,
    snapshot: Option<Snapshot>,
    report: Report,
}

static ARMED: Once<Armed> = Once::new();
static TRACE: Mutex<Trace> = Mutex::new(Trace::new());
static WARMUP: AtomicUsize = AtomicUsize::new(0);

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.general_protection_fault
            .set_handler_fn(general_protection_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt[InterruptIndex::Timer.as_u8()].set_handler_fn(timer_handler);
        idt
    };
}

/// Starts sampling and reports the verdict to QEMU. Interrupts are enabled
/// on return.
///
/// `snapshot`, if given, is compared against the same window when the
/// verdict is taken.
pub fn arm(expectation: Expectation, snapshot: Option<Snapshot>) {
    arm_with(expectation, snapshot, report_to_qemu);
}

/// Like [`arm`], but hands the verdict to `report` instead.
pub fn arm_with(expectation: Expectation, snapshot: Option<Snapshot>, report: Report) {
    let mut fresh = false;
    ARMED.call_once(|| {
        fresh = true;
        Armed {
            expectation,
            snapshot,
            report,
        }
    });
    assert!(fresh, "watchdog already armed");

    serial_println!(
        "[watchdog] armed: entry {:#x}, window {} bytes, {} samples",
        expectation.entry,
        expectation.window,
        expectation.samples
    );

    gdt::init();
    IDT.load();
    unsafe {
        let mut pics = PICS.lock();
        pics.initialize();
        // IRQ0 only
        pics.write_masks(0xFE, 0xFF);
    }
    set_pit_frequency(PIT_HZ);
    x86_64::instructions::interrupts::enable();
}

/// `[ok]` and `Success` for an idle run, `[failed]` and `Failed` otherwise.
pub fn report_to_qemu(verdict: &Verdict) -> ! {
    if verdict.is_idle() {
        serial_println!("[ok]");
        exit_qemu(QemuExitCode::Success);
    } else {
        serial_println!("[failed]\n");
        serial_println!("Error: {}\n", verdict);
        exit_qemu(QemuExitCode::Failed);
    }
    hlt_loop();
}

fn warmup_exhausted(ticks: usize) -> bool {
    ticks > WARMUP_LIMIT
}

fn set_pit_frequency(hz: u32) {
    let divisor = (PIT_BASE_HZ / hz).clamp(1, u16::MAX as u32) as u16;
    let mut command: Port<u8> = Port::new(PIT_COMMAND);
    let mut channel0: Port<u8> = Port::new(PIT_CHANNEL0);

    unsafe {
        command.write(PIT_MODE_RATE);
        channel0.write((divisor & 0xFF) as u8);
        channel0.write((divisor >> 8) as u8);
    }
}

extern "x86-interrupt" fn timer_handler(stack_frame: InterruptStackFrame) {
    let ip = stack_frame.instruction_pointer.as_u64();

    unsafe {
        PICS.lock()
            .notify_end_of_interrupt(InterruptIndex::Timer.as_u8());
    }

    let Some(armed) = ARMED.get() else {
        return;
    };

    // Ticks before the first sample inside the window belong to the caller.
    let mut trace = TRACE.lock();
    if trace.count() == 0 && !armed.expectation.contains(ip) {
        if warmup_exhausted(WARMUP.fetch_add(1, Ordering::Relaxed) + 1) {
            drop(trace);
            conclude(armed);
        }
        return;
    }

    if trace.record(ip) >= armed.expectation.samples {
        drop(trace);
        conclude(armed);
    }
}

fn conclude(armed: &Armed) -> ! {
    let trace = TRACE.lock();
    let (before, after) = match &armed.snapshot {
        Some(snapshot) => (snapshot.digest(), snapshot.digest_now()),
        None => (0, 0),
    };
    let verdict = judge(&trace, &armed.expectation, before, after);

    serial_println!(
        "[watchdog] {} samples after {} warmup ticks, first at {:#x}",
        trace.count(),
        WARMUP.load(Ordering::Relaxed),
        trace.first().unwrap_or(0)
    );
    drop(trace);

    (armed.report)(&verdict)
}

fn fault(what: &'static str, stack_frame: &InterruptStackFrame) -> ! {
    serial_println!("[watchdog] EXCEPTION: {}\n{:#?}", what, stack_frame);

    let verdict = Verdict::Fault { what };
    match ARMED.get() {
        Some(armed) => (armed.report)(&verdict),
        None => report_to_qemu(&verdict),
    }
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    fault("double fault", &stack_frame)
}

extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    serial_println!("general protection fault, error code {:#x}", error_code);
    fault("general protection fault", &stack_frame)
}

extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    serial_println!("page fault, error code {:?}", error_code);
    fault("page fault", &stack_frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn warmup_allows_exactly_the_limit() {
        assert!(!warmup_exhausted(0));
        assert!(!warmup_exhausted(WARMUP_LIMIT));
        assert!(warmup_exhausted(WARMUP_LIMIT + 1));
    }

    #[test_case]
    fn pit_divisor_fits_the_counter() {
        assert!(PIT_BASE_HZ / PIT_HZ <= u16::MAX as u32);
    }
}
