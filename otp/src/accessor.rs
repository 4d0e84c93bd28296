/*++

Licensed under the Apache-2.0 license.

File Name:

    accessor.rs

Abstract:

    File contains bounded raw reads and writes of the fuse array.

--*/

use bl1_drivers::LcmDevice;
use bl1_error::{Bl1Error, Bl1Result};

/// Fail with `OTP_EMULATION_UNSUPPORTED` when emulation is active and
/// `offset..offset + len` is not entirely inside the emulated window
pub(crate) fn check_emulated<L: LcmDevice>(lcm: &L, offset: usize, len: usize) -> Bl1Result<()> {
    match lcm.emulation_window() {
        Some(window) => match offset.checked_add(len) {
            Some(end) if end <= window => Ok(()),
            _ => Err(Bl1Error::OTP_EMULATION_UNSUPPORTED),
        },
        None => Ok(()),
    }
}

/// Read a field of `len` bytes at `offset` into `out`.
///
/// A zero length is a successful no-op. Reads are truncated to the size of
/// `out` when it is smaller than the field.
///
/// # Arguments
///
/// * `lcm`    - LCM device
/// * `offset` - Field offset; zero means the field is not mapped
/// * `len`    - Field size
/// * `out`    - Destination buffer
pub fn raw_read<L: LcmDevice>(lcm: &L, offset: usize, len: usize, out: &mut [u8]) -> Bl1Result<()> {
    if len == 0 {
        return Ok(());
    }
    if offset == 0 {
        return Err(Bl1Error::OTP_READ_UNSUPPORTED);
    }
    check_emulated(lcm, offset, len)?;

    let len = len.min(out.len());
    lcm.otp_read(offset, &mut out[..len])
}

/// Program `data` into a field of at most `max_len` bytes at `offset`.
///
/// # Arguments
///
/// * `lcm`     - LCM device
/// * `offset`  - Field offset; zero means the field is not mapped
/// * `max_len` - Field size
/// * `data`    - Bits to set
pub fn raw_write<L: LcmDevice>(
    lcm: &mut L,
    offset: usize,
    max_len: usize,
    data: &[u8],
) -> Bl1Result<()> {
    if data.len() > max_len {
        return Err(Bl1Error::OTP_WRITE_INVALID_INPUT);
    }
    if data.is_empty() {
        return Ok(());
    }
    if offset == 0 {
        return Err(Bl1Error::OTP_WRITE_UNSUPPORTED);
    }
    check_emulated(lcm, offset, data.len())?;

    lcm.otp_write(offset, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl1_drivers::{EmulatedLcm, OtpEmulationShim, TpMode};

    fn lcm() -> EmulatedLcm<0x200> {
        let mut lcm = EmulatedLcm::new(0xF8, TpMode::Pci);
        lcm.init().unwrap();
        lcm
    }

    #[test]
    fn test_zero_length_is_noop() {
        let lcm = lcm();
        let mut out = [0xAAu8; 4];
        assert_eq!(raw_read(&lcm, 0, 0, &mut out), Ok(()));
        assert_eq!(out, [0xAA; 4]);
    }

    #[test]
    fn test_sentinel_offset() {
        let mut lcm = lcm();
        let mut out = [0u8; 4];
        assert_eq!(
            raw_read(&lcm, 0, 4, &mut out),
            Err(Bl1Error::OTP_READ_UNSUPPORTED)
        );
        assert_eq!(
            raw_write(&mut lcm, 0, 4, &[1]),
            Err(Bl1Error::OTP_WRITE_UNSUPPORTED)
        );
    }

    #[test]
    fn test_truncated_read() {
        let mut lcm = lcm();
        raw_write(&mut lcm, 0x100, 8, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let mut out = [0u8; 3];
        raw_read(&lcm, 0x100, 8, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);

        // Larger buffers only receive the field
        let mut out = [0xEEu8; 10];
        raw_read(&lcm, 0x100, 8, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8, 0xEE, 0xEE]);
    }

    #[test]
    fn test_oversized_write() {
        let mut lcm = lcm();
        assert_eq!(
            raw_write(&mut lcm, 0x100, 4, &[0u8; 5]),
            Err(Bl1Error::OTP_WRITE_INVALID_INPUT)
        );
        assert_eq!(&lcm.fuses()[0x100..0x105], &[0u8; 5]);
    }

    #[test]
    fn test_emulation_window() {
        let mut shim = OtpEmulationShim::<EmulatedLcm<0x200>, 0x180>::new(EmulatedLcm::new(
            0xF8,
            TpMode::Tci,
        ));
        shim.init().unwrap();

        raw_write(&mut shim, 0x170, 16, &[0x5A; 16]).unwrap();
        let mut out = [0u8; 16];
        raw_read(&shim, 0x170, 16, &mut out).unwrap();
        assert_eq!(out, [0x5A; 16]);
        assert_eq!(&shim.inner().fuses()[0x170..0x180], &[0u8; 16]);

        // Straddling the end of the window
        assert_eq!(
            raw_read(&shim, 0x178, 16, &mut out),
            Err(Bl1Error::OTP_EMULATION_UNSUPPORTED)
        );
        assert_eq!(
            raw_write(&mut shim, 0x180, 4, &[1; 4]),
            Err(Bl1Error::OTP_EMULATION_UNSUPPORTED)
        );
    }
}
