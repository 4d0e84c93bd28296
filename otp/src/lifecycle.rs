/*++

Licensed under the Apache-2.0 license.

File Name:

    lifecycle.rs

Abstract:

    File contains the life-cycle state machine. Transitions snapshot the
    region they lock before the state fuse is burnt.

--*/

use crate::accessor::{raw_read, raw_write};
use crate::layout::{LockedRegionSnapshot, OtpField};
use crate::map::OtpContext;
#[cfg(not(feature = "no-cfi"))]
use bl1_cfi_derive::cfi_impl_fn;
use bl1_cfi_lib::cfi_assert_eq;
use bl1_drivers::{cprintln, LcmDevice, LcmLcs};
use bl1_error::{Bl1Error, Bl1Result};
use zerocopy::IntoBytes;

/// Public life-cycle state
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum PlatOtpLcs {
    AssemblyAndTest = 0,
    PsaRotProvisioning = 1,
    Secured = 2,
    Decommissioned = 3,
    Unknown = 4,
}

impl From<LcmLcs> for PlatOtpLcs {
    fn from(lcs: LcmLcs) -> Self {
        match lcs {
            LcmLcs::Cm => PlatOtpLcs::AssemblyAndTest,
            LcmLcs::Dm => PlatOtpLcs::PsaRotProvisioning,
            LcmLcs::Se => PlatOtpLcs::Secured,
            LcmLcs::Rma => PlatOtpLcs::Decommissioned,
            LcmLcs::Invalid => PlatOtpLcs::Unknown,
        }
    }
}

impl From<PlatOtpLcs> for LcmLcs {
    fn from(lcs: PlatOtpLcs) -> Self {
        match lcs {
            PlatOtpLcs::AssemblyAndTest => LcmLcs::Cm,
            PlatOtpLcs::PsaRotProvisioning => LcmLcs::Dm,
            PlatOtpLcs::Secured => LcmLcs::Se,
            PlatOtpLcs::Decommissioned => LcmLcs::Rma,
            PlatOtpLcs::Unknown => LcmLcs::Invalid,
        }
    }
}

impl From<u32> for PlatOtpLcs {
    fn from(value: u32) -> Self {
        match value {
            0 => PlatOtpLcs::AssemblyAndTest,
            1 => PlatOtpLcs::PsaRotProvisioning,
            2 => PlatOtpLcs::Secured,
            3 => PlatOtpLcs::Decommissioned,
            _ => PlatOtpLcs::Unknown,
        }
    }
}

impl From<PlatOtpLcs> for u32 {
    fn from(lcs: PlatOtpLcs) -> Self {
        lcs as u32
    }
}

impl<L: LcmDevice> OtpContext<L> {
    /// Current life-cycle state; corrupt fuse words read as `Unknown`
    pub fn current_state(&self) -> Bl1Result<PlatOtpLcs> {
        Ok(self.lcm.lcs()?.into())
    }

    /// Move the device to `new_state`.
    ///
    /// Only the successor of the current state is accepted. Entering DM
    /// snapshots the CM locked region and entering SE snapshots the DM
    /// locked region; the snapshot is verified against the live region
    /// before the state fuse is burnt.
    ///
    /// # Arguments
    ///
    /// * `new_state` - Requested state
    #[cfg_attr(not(feature = "no-cfi"), cfi_impl_fn)]
    pub fn request_transition(&mut self, new_state: PlatOtpLcs) -> Bl1Result<()> {
        self.check_ready()?;

        let new_lcs = LcmLcs::from(new_state);
        if matches!(new_lcs, LcmLcs::Cm | LcmLcs::Invalid) {
            return Err(Bl1Error::OTP_WRITE_LCS_SYSTEM_ERR);
        }
        let current = self.lcm.lcs()?;
        if current.successor() != Some(new_lcs) {
            return Err(Bl1Error::OTP_WRITE_LCS_SYSTEM_ERR);
        }

        match new_lcs {
            LcmLcs::Dm => {
                let snapshot = self.layout.cm_snapshot;
                let region = self.layout.cm_locked;
                self.lock_region(snapshot, region)?;
            }
            LcmLcs::Se => {
                let cm_size = self.read_snapshot(self.layout.cm_snapshot)?.size as usize;
                let snapshot = self.layout.dm_snapshot;
                let region = OtpField::new(
                    self.layout.cm_locked.offset + cm_size,
                    self.layout.dm_locked.size,
                );
                self.lock_region(snapshot, region)?;
            }
            _ => {}
        }

        self.lcm.set_lcs(new_lcs)?;
        cprintln!("[lcs] Transitioned to {}", new_lcs as u32);
        Ok(())
    }

    pub(crate) fn read_lcs(&self, out: &mut [u8]) -> Bl1Result<()> {
        if out.len() != 4 {
            return Err(Bl1Error::OTP_READ_LCS_INVALID_INPUT);
        }
        let lcs = u32::from(self.current_state()?);
        out.copy_from_slice(&lcs.to_le_bytes());
        Ok(())
    }

    pub(crate) fn write_lcs(&mut self, data: &[u8]) -> Bl1Result<()> {
        let word: [u8; 4] = data
            .try_into()
            .map_err(|_| Bl1Error::OTP_WRITE_LCS_INVALID_INPUT)?;
        self.request_transition(PlatOtpLcs::from(u32::from_le_bytes(word)))
    }

    pub(crate) fn read_snapshot(&self, field: OtpField) -> Bl1Result<LockedRegionSnapshot> {
        let mut snapshot = LockedRegionSnapshot::default();
        raw_read(&self.lcm, field.offset, field.size, snapshot.as_mut_bytes())?;
        Ok(snapshot)
    }

    /// Record size, size zero count and contents zero count of `region`,
    /// then read the record back and compare it to the live region
    fn lock_region(&mut self, snapshot_field: OtpField, region: OtpField) -> Bl1Result<()> {
        let size = region.size as u64;
        let size_zero_count = self.integrity_value(&size.to_le_bytes())?;
        let zero_count = self.zero_count(region.offset, region.size)?;
        let snapshot = LockedRegionSnapshot {
            size,
            size_zero_count,
            zero_count,
        };

        // Fields are burnt in order so a partial record never verifies
        let bytes = snapshot.as_bytes();
        raw_write(&mut self.lcm, snapshot_field.offset, 8, &bytes[..8])?;
        raw_write(&mut self.lcm, snapshot_field.offset + 8, 4, &bytes[8..12])?;
        raw_write(&mut self.lcm, snapshot_field.offset + 12, 4, &bytes[12..16])?;

        let stored = self.read_snapshot(snapshot_field)?;
        let live = self.zero_count(region.offset, stored.size as usize)?;
        if stored != snapshot || live != stored.zero_count {
            return Err(Bl1Error::OTP_LCS_SNAPSHOT_VERIFY_FAIL);
        }
        cfi_assert_eq(live, stored.zero_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcs_mapping() {
        for lcs in [
            LcmLcs::Cm,
            LcmLcs::Dm,
            LcmLcs::Se,
            LcmLcs::Rma,
            LcmLcs::Invalid,
        ] {
            assert_eq!(LcmLcs::from(PlatOtpLcs::from(lcs)), lcs);
            assert_eq!(u32::from(PlatOtpLcs::from(lcs)), lcs as u32);
        }
        assert_eq!(PlatOtpLcs::from(0xFFFF_FFFF), PlatOtpLcs::Unknown);
    }
}
