/*++

Licensed under the Apache-2.0 license.

File Name:

    otp_emulation.rs

Abstract:

    File contains the OTP emulation shim used during bring-up, before the
    fuses of a test chip are programmed. Fuse accesses inside the emulated
    window are served from RAM.

--*/

use crate::lcm::{LcmDevice, LcmLcs, TpMode};
use bl1_error::{Bl1Error, Bl1Result};

/// Wraps an LCM and redirects OTP accesses to a RAM copy of the first `W`
/// bytes of the fuse array.
///
/// Emulation is bypassed on production (PCI) parts. While it is active,
/// anything reaching past the window fails with `OTP_EMULATION_UNSUPPORTED`
/// instead of returning stale hardware contents.
pub struct OtpEmulationShim<L: LcmDevice, const W: usize> {
    inner: L,
    ram: [u8; W],
    enabled: bool,
}

impl<L: LcmDevice, const W: usize> OtpEmulationShim<L, W> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            ram: [0u8; W],
            enabled: true,
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Emulated fuse contents
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn is_active(&self) -> bool {
        self.enabled && self.inner.tp_mode() != TpMode::Pci
    }

    fn window(&self, offset: usize, len: usize) -> Bl1Result<core::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= W => Ok(offset..end),
            _ => Err(Bl1Error::OTP_EMULATION_UNSUPPORTED),
        }
    }
}

impl<L: LcmDevice, const W: usize> LcmDevice for OtpEmulationShim<L, W> {
    fn init(&mut self) -> Bl1Result<()> {
        if W > self.inner.otp_size() {
            return Err(Bl1Error::OTP_EMULATION_INVALID_WINDOW);
        }
        self.inner.init()
    }

    fn otp_size(&self) -> usize {
        self.inner.otp_size()
    }

    fn lcs(&self) -> Bl1Result<LcmLcs> {
        self.inner.lcs()
    }

    fn set_lcs(&mut self, lcs: LcmLcs) -> Bl1Result<()> {
        self.inner.set_lcs(lcs)
    }

    fn tp_mode(&self) -> TpMode {
        self.inner.tp_mode()
    }

    fn sp_enabled(&self) -> bool {
        self.inner.sp_enabled()
    }

    fn set_sp_enabled(&mut self) -> Bl1Result<()> {
        self.inner.set_sp_enabled()
    }

    fn otp_read(&self, offset: usize, buf: &mut [u8]) -> Bl1Result<()> {
        if !self.is_active() {
            return self.inner.otp_read(offset, buf);
        }
        let range = self.window(offset, buf.len())?;
        buf.copy_from_slice(&self.ram[range]);
        Ok(())
    }

    fn otp_write(&mut self, offset: usize, data: &[u8]) -> Bl1Result<()> {
        if !self.is_active() {
            return self.inner.otp_write(offset, data);
        }
        let range = self.window(offset, data.len())?;
        self.ram[range].copy_from_slice(data);
        Ok(())
    }

    fn emulation_window(&self) -> Option<usize> {
        if self.is_active() {
            Some(W)
        } else {
            None
        }
    }
}
