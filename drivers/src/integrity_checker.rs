/*++

Licensed under the Apache-2.0 license.

File Name:

    integrity_checker.rs

Abstract:

    File contains API for the integrity checker. Only the zero-count mode is
    used: the value of a region is the number of zero bits it contains.

--*/

use bl1_error::{Bl1Error, Bl1Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IntegrityCheckerMode {
    ZeroCount,
}

/// Granularity of integrity checker input
pub const INTEGRITY_CHECKER_REQUIRED_ALIGNMENT: usize = 4;

#[derive(Default, Debug)]
pub struct IntegrityChecker {}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {}
    }

    /// Compute the integrity value of `data`
    ///
    /// # Arguments
    ///
    /// * `mode` - Integrity check mode
    /// * `data` - Input; length must be a multiple of four bytes
    pub fn compute_value(&self, mode: IntegrityCheckerMode, data: &[u8]) -> Bl1Result<u32> {
        let mut acc = ZeroCountAccumulator::default();
        match mode {
            IntegrityCheckerMode::ZeroCount => acc.update(data)?,
        }
        Ok(acc.finish())
    }
}

/// Streaming zero-bit counter.
///
/// Zero counts are additive, so a large region can be fed in chunks as long
/// as every chunk is word aligned in length.
#[derive(Default, Debug, Clone, Copy)]
pub struct ZeroCountAccumulator {
    count: u32,
}

impl ZeroCountAccumulator {
    pub fn update(&mut self, data: &[u8]) -> Bl1Result<()> {
        if data.len() % INTEGRITY_CHECKER_REQUIRED_ALIGNMENT != 0 {
            return Err(Bl1Error::DRIVER_INTEGRITY_CHECKER_INVALID_LENGTH);
        }
        for word in data.chunks_exact(INTEGRITY_CHECKER_REQUIRED_ALIGNMENT) {
            let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.count = self.count.wrapping_add(word.count_zeros());
        }
        Ok(())
    }

    pub fn finish(self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_count() {
        let ic = IntegrityChecker::new();
        let mode = IntegrityCheckerMode::ZeroCount;
        assert_eq!(ic.compute_value(mode, &[]), Ok(0));
        assert_eq!(ic.compute_value(mode, &[0; 8]), Ok(64));
        assert_eq!(ic.compute_value(mode, &[0xff; 8]), Ok(0));
        assert_eq!(ic.compute_value(mode, &[0x0f, 0xff, 0xff, 0x7f]), Ok(5));
    }

    #[test]
    fn test_unaligned_length() {
        let ic = IntegrityChecker::new();
        assert_eq!(
            ic.compute_value(IntegrityCheckerMode::ZeroCount, &[0; 6]),
            Err(Bl1Error::DRIVER_INTEGRITY_CHECKER_INVALID_LENGTH)
        );
    }

    #[test]
    fn test_chunks_are_additive() {
        let data: [u8; 16] = core::array::from_fn(|i| (i * 37) as u8);
        let whole = IntegrityChecker::new()
            .compute_value(IntegrityCheckerMode::ZeroCount, &data)
            .unwrap();

        let mut acc = ZeroCountAccumulator::default();
        for chunk in data.chunks(4) {
            acc.update(chunk).unwrap();
        }
        assert_eq!(acc.finish(), whole);
    }
}
