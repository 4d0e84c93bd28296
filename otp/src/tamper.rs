/*++

Licensed under the Apache-2.0 license.

File Name:

    tamper.rs

Abstract:

    File contains OTP initialization and the integrity checks run on every
    boot: the attack tracking budget, the manufacturing data and the
    snapshots of the locked regions.

--*/

use crate::accessor::{raw_read, raw_write};
use crate::layout::OtpField;
use crate::map::{OtpContext, OtpState};
#[cfg(not(feature = "no-cfi"))]
use bl1_cfi_derive::cfi_impl_fn;
use bl1_cfi_lib::cfi_assert_eq;
use bl1_drivers::{cprintln, LcmDevice, LcmLcs};
use bl1_error::{Bl1Error, Bl1Result};

/// Error codes reported for one locked region
struct RegionErrors {
    size_mismatch: Bl1Error,
    contents_mismatch: Bl1Error,
}

const CM_REGION_ERRORS: RegionErrors = RegionErrors {
    size_mismatch: Bl1Error::OTP_INIT_CM_SIZE_ZERO_COUNT_MISMATCH,
    contents_mismatch: Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH,
};

const DM_REGION_ERRORS: RegionErrors = RegionErrors {
    size_mismatch: Bl1Error::OTP_INIT_DM_SIZE_ZERO_COUNT_MISMATCH,
    contents_mismatch: Bl1Error::OTP_INIT_DM_ZERO_COUNT_MISMATCH,
};

impl<L: LcmDevice> OtpContext<L> {
    /// Bring up the LCM and verify the array.
    ///
    /// Calling it again on a ready context repeats every check. On failure
    /// the context stays unusable for the rest of the boot and later calls
    /// report the original error without touching the device.
    pub fn init(&mut self) -> Bl1Result<()> {
        if let OtpState::Failed(e) = self.state {
            return Err(e);
        }
        let result = self.init_checks();
        self.state = match result {
            Ok(()) => OtpState::Ready,
            Err(e) => {
                cprintln!("[otp] Init failed 0x{:x}", u32::from(e));
                OtpState::Failed(e)
            }
        };
        result
    }

    #[cfg_attr(not(feature = "no-cfi"), cfi_impl_fn)]
    fn init_checks(&mut self) -> Bl1Result<()> {
        self.lcm.init()?;

        let otp_size = self.lcm.otp_size();
        if otp_size < self.config.otp_total_size {
            return Err(Bl1Error::OTP_INIT_SYSTEM_ERR);
        }
        if let Some(window) = self.lcm.emulation_window() {
            if self.layout.main_area_end() > window {
                return Err(Bl1Error::OTP_INIT_SYSTEM_ERR);
            }
        }

        if self.attack_tracking_bits_left()? == 0 {
            return Err(Bl1Error::OTP_INIT_NOT_PERMITTED);
        }

        let lcs = self.lcm.lcs()?;
        self.check_for_tampering(lcs)
    }

    /// Number of attack tracking bits that are still unset
    pub fn attack_tracking_bits_left(&self) -> Bl1Result<u32> {
        let field = self.layout.attack_tracking_bits;
        self.zero_count(field.offset, field.size)
    }

    /// Burn the next unset attack tracking bit.
    ///
    /// Once every bit is consumed the device no longer initializes.
    pub fn consume_attack_tracking_bit(&mut self) -> Bl1Result<()> {
        let field = self.layout.attack_tracking_bits;
        let mut bits = [0u8; 16];
        raw_read(&self.lcm, field.offset, field.size, &mut bits)?;

        let (index, byte) = bits
            .iter()
            .enumerate()
            .find(|(_, byte)| **byte != 0xFF)
            .ok_or(Bl1Error::OTP_ATTACK_TRACKING_BITS_EXHAUSTED)?;
        let next = *byte | (1u8 << byte.trailing_ones());
        raw_write(&mut self.lcm, field.offset + index, 1, &[next])?;
        cprintln!("[otp] Attack tracking bit consumed");
        Ok(())
    }

    fn check_for_tampering(&self, lcs: LcmLcs) -> Bl1Result<()> {
        if self.config.has_manufacturing_data {
            match self.check_mfg_data() {
                Err(Bl1Error::OTP_EMULATION_UNSUPPORTED) => {
                    cprintln!("[otp] Manufacturing data not emulated, skipping check");
                }
                result => result?,
            }
        }

        let mut cm_size = 0;
        if Self::cm_region_locked(lcs) {
            cm_size = self.check_locked_region(
                self.layout.cm_snapshot,
                self.layout.cm_locked.offset,
                &CM_REGION_ERRORS,
            )?;
        }
        if Self::dm_region_locked(lcs) {
            self.check_locked_region(
                self.layout.dm_snapshot,
                self.layout.cm_locked.offset + cm_size,
                &DM_REGION_ERRORS,
            )?;
        }
        Ok(())
    }

    fn check_mfg_data(&self) -> Bl1Result<()> {
        let header = self.read_mfg_header()?;
        // Nothing programmed yet; bits can only be added so this cannot be
        // reached by tampering with a provisioned block
        if header.size == 0 && header.zero_count == 0 {
            return Ok(());
        }

        let size = header.size as usize;
        if size > self.layout.mfg_data_capacity() {
            return Err(Bl1Error::OTP_INIT_MFG_DATA_ZERO_COUNT_MISMATCH);
        }
        // Covers the data and the first two words of the header
        let start = self.layout.mfg_header.offset - size;
        let zero_count = self
            .zero_count(start, size + 8)
            .map_err(|e| match e {
                Bl1Error::DRIVER_INTEGRITY_CHECKER_INVALID_LENGTH => {
                    Bl1Error::OTP_INIT_MFG_DATA_ZERO_COUNT_MISMATCH
                }
                e => e,
            })?;
        if zero_count != header.zero_count {
            return Err(Bl1Error::OTP_INIT_MFG_DATA_ZERO_COUNT_MISMATCH);
        }
        cfi_assert_eq(zero_count, header.zero_count);
        Ok(())
    }

    /// Verify one locked region against its snapshot, returning its size
    fn check_locked_region(
        &self,
        snapshot_field: OtpField,
        region_offset: usize,
        errors: &RegionErrors,
    ) -> Bl1Result<usize> {
        let snapshot = self.read_snapshot(snapshot_field)?;

        let size_zero_count = self.integrity_value(&snapshot.size.to_le_bytes())?;
        if size_zero_count != snapshot.size_zero_count {
            return Err(errors.size_mismatch);
        }
        cfi_assert_eq(size_zero_count, snapshot.size_zero_count);

        let size =
            usize::try_from(snapshot.size).map_err(|_| Bl1Error::OTP_INVALID_REGION_SIZE)?;
        if region_offset
            .checked_add(size)
            .map_or(true, |end| end > self.layout.main_area_end())
        {
            return Err(Bl1Error::OTP_INVALID_REGION_SIZE);
        }

        let zero_count = self.zero_count(region_offset, size)?;
        if zero_count != snapshot.zero_count {
            return Err(errors.contents_mismatch);
        }
        cfi_assert_eq(zero_count, snapshot.zero_count);
        Ok(size)
    }
}
