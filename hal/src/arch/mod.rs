//! # Architecture Support
//!
//! Per-architecture register installs. The devices this runtime targets are
//! 32-bit MCU cores; on anything else (a test host) the install is a no-op
//! so the startup sequence can be exercised end to end.

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "arm", target_os = "none"))] {
        pub mod arm;
        use arm as imp;
    } else if #[cfg(all(target_arch = "riscv32", target_os = "none"))] {
        pub mod riscv32;
        use riscv32 as imp;
    } else {
        mod imp {
            /// Host fallback: nothing to install.
            pub unsafe fn install_stack_and_base(_stack_pointer: u32, _static_base: u32) {}
        }
    }
}

/// Install the stack pointer and the static-base register.
///
/// # Safety
/// See [`ProcessorContext::install`](crate::ProcessorContext::install).
#[inline(always)]
pub unsafe fn install_stack_and_base(stack_pointer: u32, static_base: u32) {
    unsafe { imp::install_stack_and_base(stack_pointer, static_base) }
}

/// Name of the architecture this build targets.
pub fn current_arch() -> &'static str {
    #[cfg(target_arch = "arm")]
    {
        "arm"
    }
    #[cfg(target_arch = "riscv32")]
    {
        "riscv32"
    }
    #[cfg(not(any(target_arch = "arm", target_arch = "riscv32")))]
    {
        "host"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_install_is_noop() {
        // On the test host the install must not touch machine state.
        unsafe { install_stack_and_base(0x2000_1800, 0x2000_1800) };
        assert!(!current_arch().is_empty());
    }
}
