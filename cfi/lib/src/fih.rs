/*++

Licensed under the Apache-2.0 license.

File Name:

    fih.rs

Abstract:

    File contains the fault injection hardened integer used to carry
    security relevant decisions.

References:
    https://tf-m-user-guide.trustedfirmware.org/design_docs/tfm_physical_attack_mitigation.html

--*/

use crate::cfi::{cfi_launder, cfi_panic, CfiPanicInfo};
use crate::secmem::{hardened_memeq, HARDENED_BOOL_TRUE};
use crate::CfiCounter;
use bl1_error::Bl1Result;

/// Fault injection hardened integer.
///
/// Holds a value and a masked copy of it. Success is a fixed sentinel with a
/// large Hamming distance to both zero and the failure sentinel, so neither a
/// zeroed word nor a single flipped bit reads as success.
#[derive(Debug, Copy, Clone)]
pub struct FihInt {
    val: u32,
    masked: u32,
}

impl FihInt {
    const MASK: u32 = 0xA5C3_5A3C;
    const SUCCESS_VAL: u32 = 0x1AAA_AAAA;
    const FAILURE_VAL: u32 = 0x1555_5555;

    pub const SUCCESS: FihInt = FihInt::encode(Self::SUCCESS_VAL);
    pub const FAILURE: FihInt = FihInt::encode(Self::FAILURE_VAL);

    const fn encode(val: u32) -> Self {
        Self {
            val,
            masked: val ^ Self::MASK,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_raw(val: u32, masked: u32) -> Self {
        Self { val, masked }
    }

    /// Panic if the value and its masked copy disagree
    #[inline(never)]
    pub fn validate(&self) {
        if cfi_launder(self.val) != cfi_launder(self.masked) ^ Self::MASK {
            cfi_panic(CfiPanicInfo::FihCorrupt);
        }
    }

    /// Encode whether an operation returned `Ok`.
    ///
    /// The result is inspected twice; the two inspections must agree.
    #[inline(never)]
    pub fn from_result<T>(result: &Bl1Result<T>) -> Self {
        let first = result.is_ok();
        CfiCounter::delay();
        let second = cfi_launder(result).is_ok();
        if first != second {
            cfi_panic(CfiPanicInfo::FihCorrupt);
        }
        if second {
            Self::SUCCESS
        } else {
            Self::FAILURE
        }
    }

    /// Returns true only for a valid success sentinel
    #[inline(always)]
    pub fn is_success(self) -> bool {
        fih_eq(self, Self::SUCCESS)
    }

    /// Returns true for anything that is not a valid success sentinel
    #[inline(always)]
    pub fn is_failure(self) -> bool {
        fih_not_eq(self, Self::SUCCESS)
    }
}

/// Hardened equality of two `FihInt`.
///
/// Both operands are validated, then the plain and the masked halves are
/// compared separately. Disagreement between the two comparisons means one
/// of them was faulted.
#[inline(never)]
pub fn fih_eq(lhs: FihInt, rhs: FihInt) -> bool {
    lhs.validate();
    rhs.validate();

    let plain = cfi_launder(lhs.val) == cfi_launder(rhs.val);
    CfiCounter::delay();
    let masked = cfi_launder(lhs.masked) == cfi_launder(rhs.masked);
    if plain != masked {
        cfi_panic(CfiPanicInfo::FihCorrupt);
    }
    plain
}

/// Hardened inequality of two `FihInt`
#[inline(never)]
pub fn fih_not_eq(lhs: FihInt, rhs: FihInt) -> bool {
    lhs.validate();
    rhs.validate();

    let plain = cfi_launder(lhs.val) != cfi_launder(rhs.val);
    CfiCounter::delay();
    let masked = cfi_launder(lhs.masked) != cfi_launder(rhs.masked);
    if plain != masked {
        cfi_panic(CfiPanicInfo::FihCorrupt);
    }
    plain
}

/// Compare two buffers and return the outcome as a `FihInt`.
///
/// The comparison runs twice; both runs have to report equality before
/// `FihInt::SUCCESS` is produced.
#[inline(never)]
pub fn fih_memeql(lhs: &[u8], rhs: &[u8]) -> FihInt {
    let first = hardened_memeq(lhs, rhs);
    CfiCounter::delay();
    let second = hardened_memeq(cfi_launder(lhs), cfi_launder(rhs));
    if first != second {
        cfi_panic(CfiPanicInfo::FihCorrupt);
    }
    if cfi_launder(first) == HARDENED_BOOL_TRUE && second == HARDENED_BOOL_TRUE {
        FihInt::SUCCESS
    } else {
        FihInt::FAILURE
    }
}
