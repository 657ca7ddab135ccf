/// Kernel entry point. The loop stays empty until there is work to put in it.
///
/// Callable exactly once, by the boot handoff, on a valid stack. No other
/// register or memory content is read.
#[unsafe(no_mangle)]
pub extern "C" fn kmain() -> ! {
    loop {}
}

/// Address of `kmain` as seen by the boot collaborator.
pub fn entry_address() -> u64 {
    kmain as extern "C" fn() -> ! as usize as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn entry_address_is_not_null() {
        assert_ne!(entry_address(), 0);
    }

    #[test_case]
    fn entry_address_is_stable() {
        assert_eq!(entry_address(), entry_address());
    }
}
