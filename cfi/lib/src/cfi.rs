/*++

Licensed under the Apache-2.0 license.

File Name:

    cfi.rs

Abstract:

    File contains CFI launder implementation and hardened assertions.

References:
    https://github.com/lowRISC/opentitan/blob/7a61300cf7c409fa68fd892942c1d7b58a7cd4c0/sw/device/lib/base/hardened.h#L260

--*/

use bl1_error::Bl1Error;

use crate::CfiCounter;
use core::cfg;
use core::cmp::{Eq, Ord, PartialEq, PartialOrd};
use core::marker::Copy;

/// CFI Panic Information
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CfiPanicInfo {
    /// CFI Counter decode error
    CounterCorrupt,

    /// CFI Counter overflow
    CounterOverflow,

    /// CFI Counter underflow
    CounterUnderflow,

    /// CFI Counter mismatch
    CounterMismatch,

    /// CFI Assert Equal failed
    AssertEqFail,

    /// CFI Assert Not Equal failed
    AssertNeFail,

    /// CFI Greater Than failed
    AssertGtFail,

    /// CFI Less Than failed
    AssertLtFail,

    /// CFI Greater Than Equal failed
    AssertGeFail,

    /// CFI Less Than Equal failed
    AssertLeFail,

    /// A hardened integer does not match its masked copy
    FihCorrupt,

    /// The entropy used to seed the delay generator is all zero
    EntropyError,

    /// An enum match statement finds an unexpected value.
    UnexpectedMatchBranch,

    /// Unknown error
    UnknownError,
}

impl From<CfiPanicInfo> for Bl1Error {
    /// Converts to this type from the input type.
    fn from(info: CfiPanicInfo) -> Bl1Error {
        match info {
            CfiPanicInfo::CounterCorrupt => Bl1Error::CFI_PANIC_COUNTER_CORRUPT,
            CfiPanicInfo::CounterOverflow => Bl1Error::CFI_PANIC_COUNTER_OVERFLOW,
            CfiPanicInfo::CounterUnderflow => Bl1Error::CFI_PANIC_COUNTER_UNDERFLOW,
            CfiPanicInfo::CounterMismatch => Bl1Error::CFI_PANIC_COUNTER_MISMATCH,
            CfiPanicInfo::AssertEqFail => Bl1Error::CFI_PANIC_ASSERT_EQ_FAILURE,
            CfiPanicInfo::AssertNeFail => Bl1Error::CFI_PANIC_ASSERT_NE_FAILURE,
            CfiPanicInfo::AssertGtFail => Bl1Error::CFI_PANIC_ASSERT_GT_FAILURE,
            CfiPanicInfo::AssertLtFail => Bl1Error::CFI_PANIC_ASSERT_LT_FAILURE,
            CfiPanicInfo::AssertGeFail => Bl1Error::CFI_PANIC_ASSERT_GE_FAILURE,
            CfiPanicInfo::AssertLeFail => Bl1Error::CFI_PANIC_ASSERT_LE_FAILURE,
            CfiPanicInfo::FihCorrupt => Bl1Error::CFI_PANIC_FIH_CORRUPT,
            CfiPanicInfo::EntropyError => Bl1Error::CFI_PANIC_ENTROPY_FAILURE,
            CfiPanicInfo::UnexpectedMatchBranch => Bl1Error::CFI_PANIC_UNEXPECTED_MATCH_BRANCH,
            CfiPanicInfo::UnknownError => Bl1Error::CFI_PANIC_UNKNOWN,
        }
    }
}

/// Launder the value to prevent compiler optimization
///
/// # Arguments
///
/// * `val` - Value to launder
///
/// # Returns
///
/// `T` - Same value
pub fn cfi_launder<T>(val: T) -> T {
    if cfg!(feature = "cfi") {
        core::hint::black_box(val)
    } else {
        val
    }
}

/// Control flow integrity panic
///
/// This panic is raised when the control flow integrity error is detected.
/// Host builds (`std` or `cfi-test`) unwind with a readable message, firmware
/// builds jump to the platform supplied `cfi_panic_handler`.
///
/// # Arguments
///
/// * `info` - Panic information
///
/// # Returns
///
/// `!` - Never returns
#[inline(never)]
pub fn cfi_panic(info: CfiPanicInfo) -> ! {
    // Prevent the compiler from optimizing the reason
    let _ = cfi_launder(info);

    #[cfg(feature = "cfi")]
    {
        #[cfg(any(feature = "cfi-test", feature = "std"))]
        {
            panic!("CFI Panic = {:04x?}", info);
        }

        #[cfg(not(any(feature = "cfi-test", feature = "std")))]
        {
            extern "C" {
                fn cfi_panic_handler(code: u32) -> !;
            }
            unsafe {
                cfi_panic_handler(Bl1Error::from(info).into());
            }
        }
    }

    #[cfg(not(feature = "cfi"))]
    {
        unimplemented!()
    }
}

macro_rules! cfi_assert_macro {
    ($name: ident, $op: tt, $trait1: path, $trait2: path, $panic_info: ident) => {
        /// CFI Binary Condition Assertion
        ///
        /// # Arguments
        ///
        /// `a` - Left hand side
        /// `b` - Right hand side
        #[inline(always)]
        #[allow(unused)]
        pub fn $name<T>(lhs: T, rhs: T)
        where
            T: $trait1 + $trait2 + Copy,
        {
            if cfg!(feature = "cfi") {
                CfiCounter::delay();
                if !(lhs $op rhs) {
                    cfi_panic(CfiPanicInfo::$panic_info);
                }

                // Second check for glitch protection
                CfiCounter::delay();
                if !(cfi_launder(lhs) $op cfi_launder(rhs)) {
                    cfi_panic(CfiPanicInfo::$panic_info);
                }

            } else {
                let _ = lhs $op rhs;
            }
        }
    };
}

cfi_assert_macro!(cfi_assert_eq, ==, PartialEq, Eq, AssertEqFail);
cfi_assert_macro!(cfi_assert_ne, !=, PartialEq, Eq, AssertNeFail);
cfi_assert_macro!(cfi_assert_gt, >, Ord, PartialOrd, AssertGtFail);
cfi_assert_macro!(cfi_assert_lt, <, Ord, PartialOrd, AssertLtFail);
cfi_assert_macro!(cfi_assert_ge, >=, Ord, PartialOrd, AssertGeFail);
cfi_assert_macro!(cfi_assert_le, <=, Ord, PartialOrd, AssertLeFail);

#[macro_export]
macro_rules! cfi_assert {
    ($cond: expr) => {
        $crate::cfi_assert_eq($cond, true)
    };
}

/// Hardened comparison of two 32-byte digests.
///
/// Every word is compared, and the whole comparison is repeated on laundered
/// copies, so that skipping a single branch does not accept a wrong digest.
#[inline(never)]
pub fn cfi_assert_eq_32_bytes(a: &[u8; 32], b: &[u8; 32]) {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    if cfi_launder(diff) != 0 {
        cfi_panic(CfiPanicInfo::AssertEqFail)
    }

    CfiCounter::delay();
    let mut diff = 0u8;
    for (x, y) in cfi_launder(a).iter().zip(cfi_launder(b).iter()) {
        diff |= x ^ y;
    }
    if diff != 0 {
        cfi_panic(CfiPanicInfo::AssertEqFail)
    }
}
