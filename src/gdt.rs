use lazy_static::lazy_static;
use x86_64::VirtAddr;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;

pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;

const FAULT_STACK_SIZE: usize = 4096 * 5;

lazy_static! {
    static ref TSS: TaskStateSegment = {
        let mut tss = TaskStateSegment::new();
        tss.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize] = {
            #[repr(align(16))]
            struct FaultStack([u8; FAULT_STACK_SIZE]);
            static mut STACK: FaultStack = FaultStack([0; FAULT_STACK_SIZE]);

            let stack_start = VirtAddr::from_ptr(unsafe { &raw const STACK });
            stack_start + FAULT_STACK_SIZE as u64
        };
        tss
    };
}

struct Selectors {
    code_selector: SegmentSelector,
    tss_selector: SegmentSelector,
}

lazy_static! {
    static ref GDT: (GlobalDescriptorTable, Selectors) = {
        let mut gdt = GlobalDescriptorTable::new();
        let code_selector = gdt.append(Descriptor::kernel_code_segment());
        let tss_selector = gdt.append(Descriptor::tss_segment(&TSS));
        (
            gdt,
            Selectors {
                code_selector,
                tss_selector,
            },
        )
    };
}

/// Loads a GDT whose TSS gives the double fault handler its own stack.
pub fn init() {
    use x86_64::instructions::segmentation::{CS, Segment};
    use x86_64::instructions::tables::load_tss;

    GDT.0.load();
    unsafe {
        CS::set_reg(GDT.1.code_selector);
        load_tss(GDT.1.tss_selector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn double_fault_stack_is_set() {
        let top = TSS.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize];
        assert_ne!(top.as_u64(), 0);
        assert_eq!(top.as_u64() % 16, 0);
    }
}
