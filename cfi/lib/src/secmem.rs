/*++

Licensed under the Apache-2.0 license.

File Name:

    secmem.rs

Abstract:

    File contains support routines for hardened memory comparison.

--*/

use crate::{cfi_assert_eq, cfi_assert_ne, cfi_launder, CfiCounter};

// Adapted from https://github.com/lowRISC/opentitan/blob/7a61300cf7c409fa68fd892942c1d7b58a7cd4c0/sw/device/lib/base/hardened_asm.h
// and https://github.com/lowRISC/opentitan/blob/7a61300cf7c409fa68fd892942c1d7b58a7cd4c0/sw/device/lib/base/hardened_memory.c
// which are:
// Copyright lowRISC contributors.

/// Values for a hardened boolean type.
///
/// The values have a Hamming Distance of 8, and they are 11-bit values so they
/// can be materialized with a single instruction on RISC-V. They are
/// specifically not the complement of each other.
pub type HardenedBool = u32;
pub const HARDENED_BOOL_TRUE: HardenedBool = 0x739;
pub const HARDENED_BOOL_FALSE: HardenedBool = 0x1d4;

/// Random traversal order over `0..max`.
///
/// Every index in `0..max` is visited exactly once, starting from a random
/// position and wrapping around. `max` is twice the requested length so that
/// the second half of the walk lands on decoys.
struct RandomOrder {
    start: u32,
    state: u32,
    max: u32,
}

impl RandomOrder {
    fn new(min_len: u32) -> RandomOrder {
        let max = min_len.saturating_mul(2).max(1);
        RandomOrder {
            start: CfiCounter::rand() % max,
            state: 0,
            max,
        }
    }

    /// Number of times `advance()` may be called
    fn len(&self) -> u32 {
        self.max
    }

    fn advance(&mut self) -> u32 {
        let s = (self.start + self.state) % self.max;
        self.state += 1;
        s
    }
}

#[inline(always)]
pub fn memeq(lhs: &[u8], rhs: &[u8]) -> bool {
    hardened_memeq(lhs, rhs) == HARDENED_BOOL_TRUE
}

/// Compare two byte slices without an early exit.
///
/// Both an OR-accumulator of differences and an AND-accumulator of
/// agreements are kept; both have to agree before `HARDENED_BOOL_TRUE` is
/// returned, and the loop count is checked after the walk.
#[inline(never)]
pub fn hardened_memeq(lhs: &[u8], rhs: &[u8]) -> HardenedBool {
    let len = lhs.len();
    if len != rhs.len() {
        return HARDENED_BOOL_FALSE;
    }

    let mut order = RandomOrder::new(len as u32);

    let mut count = 0;
    let expected_count = order.len();

    // Scratch space for the iterations that fall past the end of the real
    // data. Filled with a value of Hamming weight 4.
    const DECOYS: usize = 8;
    let decoys: [u8; DECOYS] = [0xaa; DECOYS];

    let mut zeros = 0u8;
    let mut ones = u8::MAX;

    while count < expected_count {
        let idx = cfi_launder(order.advance()) as usize;

        // Prevent the compiler from reordering the loop
        barrier(idx as u32);

        let (a, b) = if idx < len {
            (lhs[idx], rhs[idx])
        } else {
            (
                decoys[idx % DECOYS],
                decoys[(idx + DECOYS / 2) % DECOYS],
            )
        };

        zeros = cfi_launder(zeros) | (cfi_launder(a) ^ b);
        ones = cfi_launder(ones) & (cfi_launder(a) ^ !b);

        count = cfi_launder(count) + 1;
    }

    // Loop completion check
    cfi_assert_eq(count, expected_count);

    if cfi_launder(zeros) == 0 {
        cfi_assert_eq(ones, u8::MAX);
        if ones == u8::MAX {
            return HARDENED_BOOL_TRUE;
        }
    }

    cfi_assert_ne(ones, u8::MAX);
    HARDENED_BOOL_FALSE
}

#[allow(asm_sub_register)] // otherwise x86 complains about the no-op asm
pub fn barrier(val: u32) {
    #[cfg(any(
        target_arch = "riscv32",
        target_arch = "riscv64",
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "arm"
    ))]
    if cfg!(feature = "cfi") {
        unsafe {
            core::arch::asm!(
                "/* {t} */",
                t = in(reg) val,
            );
        }
    }
    let _ = val;
}
