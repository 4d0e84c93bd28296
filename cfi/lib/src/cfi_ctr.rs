/*++

Licensed under the Apache-2.0 license.

File Name:

    cfi_ctr.rs

Abstract:

    File contains CFI Integer and Counter implementations. The counter is based on ideas from
    Trusted Firmware-M firmware.

References:
    https://tf-m-user-guide.trustedfirmware.org/design_docs/tfm_physical_attack_mitigation.html

--*/

use crate::cfi::{cfi_panic, CfiPanicInfo};
use crate::xoshiro::Xoshiro128;
use core::default::Default;

#[cfg(not(feature = "std"))]
mod state {
    use core::sync::atomic::{AtomicU32, Ordering};

    static CFI_VAL: AtomicU32 = AtomicU32::new(0);
    static CFI_MASK: AtomicU32 = AtomicU32::new(0);
    static CFI_XO_STATE: [AtomicU32; 4] = [
        AtomicU32::new(0),
        AtomicU32::new(0),
        AtomicU32::new(0),
        AtomicU32::new(0),
    ];

    pub fn load() -> (u32, u32) {
        (
            CFI_VAL.load(Ordering::SeqCst),
            CFI_MASK.load(Ordering::SeqCst),
        )
    }

    pub fn store(val: u32, masked_val: u32) {
        CFI_VAL.store(val, Ordering::SeqCst);
        CFI_MASK.store(masked_val, Ordering::SeqCst);
    }

    pub fn load_rng() -> [u32; 4] {
        [
            CFI_XO_STATE[0].load(Ordering::Relaxed),
            CFI_XO_STATE[1].load(Ordering::Relaxed),
            CFI_XO_STATE[2].load(Ordering::Relaxed),
            CFI_XO_STATE[3].load(Ordering::Relaxed),
        ]
    }

    pub fn store_rng(rng: [u32; 4]) {
        for (slot, val) in CFI_XO_STATE.iter().zip(rng) {
            slot.store(val, Ordering::Relaxed);
        }
    }
}

/// Host builds keep one counter per thread, starting from an encoded zero,
/// so every test thread walks its own call tree.
#[cfg(feature = "std")]
mod state {
    use super::CfiInt;
    use std::cell::Cell;

    std::thread_local! {
        static CFI_VAL: Cell<u32> = const { Cell::new(0) };
        static CFI_MASK: Cell<u32> = const { Cell::new(CfiInt::MASK) };
        static CFI_XO_STATE: Cell<[u32; 4]> = const { Cell::new([0; 4]) };
    }

    pub fn load() -> (u32, u32) {
        (CFI_VAL.with(Cell::get), CFI_MASK.with(Cell::get))
    }

    pub fn store(val: u32, masked_val: u32) {
        CFI_VAL.with(|c| c.set(val));
        CFI_MASK.with(|c| c.set(masked_val));
    }

    pub fn load_rng() -> [u32; 4] {
        CFI_XO_STATE.with(Cell::get)
    }

    pub fn store_rng(rng: [u32; 4]) {
        CFI_XO_STATE.with(|c| c.set(rng));
    }
}

/// CFI Integer
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct CfiInt {
    /// Actual Value
    val: u32,

    /// Masked Value
    masked_val: u32,
}

impl CfiInt {
    /// Integer mask with high hamming distance
    const MASK: u32 = 0xA5A5A5A5;

    /// Create integer from raw values
    fn from_raw(val: u32, masked_val: u32) -> Self {
        Self { val, masked_val }
    }

    /// Encode the integer
    fn encode(val: u32) -> Self {
        Self {
            val,
            masked_val: val ^ Self::MASK,
        }
    }

    /// Check if the integer is valid
    fn is_valid(&self) -> bool {
        self.val == self.masked_val ^ Self::MASK
    }
}

impl Default for CfiInt {
    /// Returns the "default value" for a type.
    fn default() -> Self {
        Self::encode(0)
    }
}

/// CFI counter
pub enum CfiCounter {}

impl CfiCounter {
    /// Reset counter and reseed the delay generator
    ///
    /// # Arguments
    ///
    /// * `entropy` - Seed for the random delay generator; must not be all zero
    #[inline(never)]
    pub fn reset(entropy: [u32; 4]) {
        match Xoshiro128::new(entropy) {
            Some(rng) => Self::write_rng(&rng),
            None => cfi_panic(CfiPanicInfo::EntropyError),
        }
        Self::write(CfiInt::default());
    }

    // Zero the counter
    pub fn corrupt() {
        Self::write(CfiInt {
            val: 0,
            masked_val: 0,
        });
    }

    /// Increment counter
    #[inline(never)]
    pub fn increment() -> CfiInt {
        if cfg!(all(feature = "cfi", feature = "cfi-counter")) {
            let int = Self::read();
            if !int.is_valid() {
                cfi_panic(CfiPanicInfo::CounterCorrupt);
            }

            let (new, overflow) = int.val.overflowing_add(1);
            if overflow {
                cfi_panic(CfiPanicInfo::CounterOverflow);
            }

            let new_int = CfiInt::encode(new);
            Self::write(new_int);

            int
        } else {
            CfiInt::default()
        }
    }

    /// Decrement Counter
    #[inline(never)]
    pub fn decrement() -> CfiInt {
        if cfg!(all(feature = "cfi", feature = "cfi-counter")) {
            let val = Self::read();
            if !val.is_valid() {
                cfi_panic(CfiPanicInfo::CounterCorrupt);
            }

            let (new, underflow) = val.val.overflowing_sub(1);
            if underflow {
                cfi_panic(CfiPanicInfo::CounterUnderflow);
            }

            let new_val = CfiInt::encode(new);
            Self::write(new_val);

            Self::read()
        } else {
            CfiInt::default()
        }
    }

    /// Assert the counters are equal
    #[inline(never)]
    pub fn assert_eq(val1: CfiInt, val2: CfiInt) {
        if cfg!(all(feature = "cfi", feature = "cfi-counter")) {
            if !val1.is_valid() {
                cfi_panic(CfiPanicInfo::CounterCorrupt);
            }
            if !val2.is_valid() {
                cfi_panic(CfiPanicInfo::CounterCorrupt);
            }
            if val1 != val2 {
                cfi_panic(CfiPanicInfo::CounterMismatch);
            }
        }
    }

    /// Spin for a random number of iterations to desynchronize glitches
    #[inline(never)]
    pub fn delay() {
        if cfg!(all(feature = "cfi", feature = "cfi-counter")) {
            let cycles = 1 + (Self::rand() % 256) / 2;
            for _ in 0..cycles {
                core::hint::spin_loop();
            }
        }
    }

    /// Next value of the delay generator
    pub fn rand() -> u32 {
        let mut rng = Self::read_rng();
        let val = rng.next();
        Self::write_rng(&rng);
        val
    }

    /// Read counter value
    pub fn read() -> CfiInt {
        let (val, masked_val) = state::load();
        CfiInt::from_raw(val, masked_val)
    }

    /// Write counter value
    fn write(val: CfiInt) {
        state::store(val.val, val.masked_val);
    }

    fn read_rng() -> Xoshiro128 {
        Xoshiro128::from_state(state::load_rng())
    }

    fn write_rng(rng: &Xoshiro128) {
        state::store_rng(rng.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cfi_int_encoding() {
        let int = CfiInt::encode(7);
        assert!(int.is_valid());
        assert_eq!(int.masked_val, 7 ^ 0xA5A5A5A5);
        assert!(!CfiInt::from_raw(7, 7).is_valid());
        assert!(CfiInt::default().is_valid());
    }

    #[test]
    #[cfg(all(feature = "std", feature = "cfi", feature = "cfi-counter"))]
    fn test_counter_per_thread() {
        std::thread::spawn(CfiCounter::corrupt).join().unwrap();
        assert!(CfiCounter::read().is_valid());

        let before = CfiCounter::read();
        CfiCounter::increment();
        let after = CfiCounter::decrement();
        CfiCounter::assert_eq(before, after);
    }
}
