/*++

Licensed under the Apache-2.0 license.

File Name:

    lcm.rs

Abstract:

    File contains the Life-Cycle Manager (LCM) interface and a RAM backed
    implementation with one-way fuse semantics.

--*/

use bl1_error::{Bl1Error, Bl1Result};

/// Hardware life-cycle state reported by the LCM
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u32)]
pub enum LcmLcs {
    /// Chip manufacturing
    Cm = 0,
    /// Device manufacturing
    Dm = 1,
    /// Secured
    Se = 2,
    /// Return merchandise authorization
    Rma = 3,
    Invalid = 4,
}

impl LcmLcs {
    /// The only state reachable from `self`
    pub fn successor(self) -> Option<LcmLcs> {
        match self {
            LcmLcs::Cm => Some(LcmLcs::Dm),
            LcmLcs::Dm => Some(LcmLcs::Se),
            LcmLcs::Se => Some(LcmLcs::Rma),
            LcmLcs::Rma | LcmLcs::Invalid => None,
        }
    }

    /// Decode the unary life-cycle fuse word
    pub fn from_fuse_word(word: u32) -> LcmLcs {
        match word {
            0b000 => LcmLcs::Cm,
            0b001 => LcmLcs::Dm,
            0b011 => LcmLcs::Se,
            0b111 => LcmLcs::Rma,
            _ => LcmLcs::Invalid,
        }
    }

    /// Encode as a unary life-cycle fuse word
    pub fn to_fuse_word(self) -> Option<u32> {
        match self {
            LcmLcs::Cm => Some(0b000),
            LcmLcs::Dm => Some(0b001),
            LcmLcs::Se => Some(0b011),
            LcmLcs::Rma => Some(0b111),
            LcmLcs::Invalid => None,
        }
    }
}

/// Trust provisioning mode
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TpMode {
    Virgin,
    /// Test chip
    Tci,
    /// Production chip
    Pci,
}

/// Life-cycle manager and the OTP fuse array behind it
pub trait LcmDevice {
    /// Bring up the controller; must be called before any other access
    fn init(&mut self) -> Bl1Result<()>;

    /// Size of the fuse array in bytes
    fn otp_size(&self) -> usize;

    fn lcs(&self) -> Bl1Result<LcmLcs>;

    /// Move to `lcs`; only the successor of the current state is accepted
    fn set_lcs(&mut self, lcs: LcmLcs) -> Bl1Result<()>;

    fn tp_mode(&self) -> TpMode;

    /// Secure provisioning mode
    fn sp_enabled(&self) -> bool;

    fn set_sp_enabled(&mut self) -> Bl1Result<()>;

    fn otp_read(&self, offset: usize, buf: &mut [u8]) -> Bl1Result<()>;

    /// Program fuses. Bits can only be set; a write that requires clearing a
    /// bit fails verification.
    fn otp_write(&mut self, offset: usize, data: &[u8]) -> Bl1Result<()>;

    /// Size of the emulated prefix of the fuse array, when emulation is active
    fn emulation_window(&self) -> Option<usize> {
        None
    }
}

/// RAM backed LCM with real fuse semantics.
///
/// The life-cycle state lives in a unary fuse word at `lcs_offset` and can
/// only be changed through `set_lcs`.
pub struct EmulatedLcm<const N: usize> {
    fuses: [u8; N],
    lcs_offset: usize,
    tp_mode: TpMode,
    sp_enabled: bool,
    initialized: bool,
}

impl<const N: usize> EmulatedLcm<N> {
    pub fn new(lcs_offset: usize, tp_mode: TpMode) -> Self {
        Self {
            fuses: [0u8; N],
            lcs_offset,
            tp_mode,
            sp_enabled: false,
            initialized: false,
        }
    }

    pub fn fuses(&self) -> &[u8] {
        &self.fuses
    }

    /// Direct access to the fuse array, bypassing the write rules.
    ///
    /// Only meant for simulating glitches and decay.
    pub fn raw_fuses_mut(&mut self) -> &mut [u8] {
        &mut self.fuses
    }

    fn check_init(&self) -> Bl1Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Bl1Error::DRIVER_LCM_NOT_INITIALIZED)
        }
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Bl1Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= N => Ok(()),
            _ => Err(Bl1Error::DRIVER_LCM_OTP_OUT_OF_BOUNDS),
        }
    }

    fn lcs_word(&self) -> Bl1Result<u32> {
        let mut word = [0u8; 4];
        self.check_bounds(self.lcs_offset, word.len())?;
        word.copy_from_slice(&self.fuses[self.lcs_offset..self.lcs_offset + 4]);
        Ok(u32::from_le_bytes(word))
    }

    fn burn(&mut self, offset: usize, data: &[u8]) -> Bl1Result<()> {
        let dest = &mut self.fuses[offset..offset + data.len()];
        for (fuse, bits) in dest.iter_mut().zip(data) {
            *fuse |= bits;
        }
        if dest != data {
            return Err(Bl1Error::DRIVER_LCM_OTP_WRITE_VERIFY_FAIL);
        }
        Ok(())
    }
}

impl<const N: usize> LcmDevice for EmulatedLcm<N> {
    fn init(&mut self) -> Bl1Result<()> {
        self.check_bounds(self.lcs_offset, 4)?;
        self.initialized = true;
        Ok(())
    }

    fn otp_size(&self) -> usize {
        N
    }

    fn lcs(&self) -> Bl1Result<LcmLcs> {
        self.check_init()?;
        Ok(LcmLcs::from_fuse_word(self.lcs_word()?))
    }

    fn set_lcs(&mut self, lcs: LcmLcs) -> Bl1Result<()> {
        self.check_init()?;
        let current = LcmLcs::from_fuse_word(self.lcs_word()?);
        if current.successor() != Some(lcs) {
            return Err(Bl1Error::DRIVER_LCM_INVALID_LCS_TRANSITION);
        }
        let word = lcs
            .to_fuse_word()
            .ok_or(Bl1Error::DRIVER_LCM_INVALID_LCS_TRANSITION)?;
        self.burn(self.lcs_offset, &word.to_le_bytes())
    }

    fn tp_mode(&self) -> TpMode {
        self.tp_mode
    }

    fn sp_enabled(&self) -> bool {
        self.sp_enabled
    }

    fn set_sp_enabled(&mut self) -> Bl1Result<()> {
        self.check_init()?;
        self.sp_enabled = true;
        Ok(())
    }

    fn otp_read(&self, offset: usize, buf: &mut [u8]) -> Bl1Result<()> {
        self.check_init()?;
        self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.fuses[offset..offset + buf.len()]);
        Ok(())
    }

    fn otp_write(&mut self, offset: usize, data: &[u8]) -> Bl1Result<()> {
        self.check_init()?;
        self.check_bounds(offset, data.len())?;
        let end = offset + data.len();
        if offset < self.lcs_offset + 4 && self.lcs_offset < end {
            return Err(Bl1Error::DRIVER_LCM_LCS_FUSE_WRITE_FORBIDDEN);
        }
        self.burn(offset, data)
    }
}
