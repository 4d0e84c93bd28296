/*++

Licensed under the Apache-2.0 license.

File Name:

    nv_counter.rs

Abstract:

    File contains the unary non-volatile counters kept in the unlocked
    region. A counter value is the number of set bits, which must form a
    contiguous run starting at bit 0.

--*/

use crate::element::OtpElementId;
use crate::layout::OTP_NV_COUNTER_SIZE;
use crate::map::OtpContext;
use bl1_drivers::LcmDevice;
use bl1_error::{Bl1Error, Bl1Result};

/// Largest value a counter can hold
pub const NV_COUNTER_MAX_VALUE: u32 = (OTP_NV_COUNTER_SIZE * 8) as u32;

/// Non-volatile counter
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NvCounterId {
    Bl1,
    /// Per BL2 image
    Bl2(u8),
    /// Protected storage
    Ps(u8),
    /// Host
    Ns(u8),
}

impl From<NvCounterId> for OtpElementId {
    fn from(id: NvCounterId) -> Self {
        match id {
            NvCounterId::Bl1 => OtpElementId::NvCounterBl1,
            NvCounterId::Bl2(n) => OtpElementId::NvCounterBl2(n),
            NvCounterId::Ps(n) => OtpElementId::NvCounterPs(n),
            NvCounterId::Ns(n) => OtpElementId::NvCounterNs(n),
        }
    }
}

fn map_unsupported(e: Bl1Error) -> Bl1Error {
    match e {
        Bl1Error::PLAT_OTP_READ_INVALID_INPUT
        | Bl1Error::PLAT_OTP_READ_UNSUPPORTED
        | Bl1Error::PLAT_OTP_WRITE_INVALID_INPUT
        | Bl1Error::PLAT_OTP_WRITE_UNSUPPORTED
        | Bl1Error::PLAT_OTP_GET_SIZE_INVALID_INPUT
        | Bl1Error::PLAT_OTP_GET_SIZE_UNSUPPORTED
        | Bl1Error::OTP_READ_UNSUPPORTED
        | Bl1Error::OTP_WRITE_UNSUPPORTED => Bl1Error::NV_COUNTER_UNSUPPORTED,
        e => e,
    }
}

/// Unary encoding of `value`
fn thermometer(value: u32) -> [u8; OTP_NV_COUNTER_SIZE] {
    let mut bits = [0u8; OTP_NV_COUNTER_SIZE];
    let full = (value / 8) as usize;
    bits[..full].fill(0xFF);
    if full < OTP_NV_COUNTER_SIZE {
        bits[full] = (1u8 << (value % 8)).wrapping_sub(1);
    }
    bits
}

impl<L: LcmDevice> OtpContext<L> {
    fn nv_counter_size(&self, id: OtpElementId) -> Bl1Result<usize> {
        let size = self.get_size(id).map_err(map_unsupported)?;
        if size == 0 {
            return Err(Bl1Error::NV_COUNTER_UNSUPPORTED);
        }
        Ok(size.min(OTP_NV_COUNTER_SIZE))
    }

    /// Current value of counter `id`
    pub fn read_nv_counter(&self, id: NvCounterId) -> Bl1Result<u32> {
        let element = OtpElementId::from(id);
        let size = self.nv_counter_size(element)?;

        let mut bits = [0u8; OTP_NV_COUNTER_SIZE];
        self.read(element, &mut bits[..size])
            .map_err(map_unsupported)?;

        let value: u32 = bits.iter().map(|b| b.count_ones()).sum();
        if thermometer(value) != bits {
            return Err(Bl1Error::NV_COUNTER_CORRUPT);
        }
        Ok(value)
    }

    /// Raise counter `id` to `value`.
    ///
    /// Setting the current value again succeeds without touching the fuses.
    pub fn set_nv_counter(&mut self, id: NvCounterId, value: u32) -> Bl1Result<()> {
        let element = OtpElementId::from(id);
        let size = self.nv_counter_size(element)?;
        if value > (size * 8) as u32 {
            return Err(Bl1Error::NV_COUNTER_MAX_VALUE);
        }

        let current = self.read_nv_counter(id)?;
        if value < current {
            return Err(Bl1Error::NV_COUNTER_ROLLBACK);
        }
        if value == current {
            return Ok(());
        }

        let bits = thermometer(value);
        self.write(element, &bits[..size]).map_err(map_unsupported)
    }

    /// Add one to counter `id`
    pub fn increment_nv_counter(&mut self, id: NvCounterId) -> Bl1Result<()> {
        let value = self.read_nv_counter(id)?;
        if value >= NV_COUNTER_MAX_VALUE {
            return Err(Bl1Error::NV_COUNTER_MAX_VALUE);
        }
        self.set_nv_counter(id, value + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thermometer() {
        assert_eq!(thermometer(0), [0u8; 64]);
        let bits = thermometer(11);
        assert_eq!(&bits[..3], &[0xFF, 0x07, 0x00]);
        assert_eq!(thermometer(NV_COUNTER_MAX_VALUE), [0xFF; 64]);
    }
}
