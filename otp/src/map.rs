/*++

Licensed under the Apache-2.0 license.

File Name:

    map.rs

Abstract:

    File contains the OTP context and the element level read, write and size
    operations.

--*/

use crate::accessor::{raw_read, raw_write};
use crate::codec::{FieldCodec, FieldStore};
use crate::config::OtpConfig;
use crate::element::{ElementKind, LcsMask, OtpElement, OtpElementId};
use crate::layout::{MfgDataHeader, OtpField, OtpLayout};
use bl1_drivers::{
    IntegrityChecker, IntegrityCheckerMode, Kmu, LcmDevice, LcmLcs, ZeroCountAccumulator,
};
use bl1_error::{Bl1Error, Bl1Result};
use zerocopy::IntoBytes;

/// Initialization state of an `OtpContext`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OtpState {
    Uninitialized,
    Ready,
    /// Init failed; element accesses stay refused for this boot
    Failed(Bl1Error),
}

/// Operation being validated, selecting the error codes it reports
#[derive(Copy, Clone)]
enum Access {
    Read,
    Write,
    GetSize,
}

impl Access {
    fn invalid_input(self) -> Bl1Error {
        match self {
            Access::Read => Bl1Error::PLAT_OTP_READ_INVALID_INPUT,
            Access::Write => Bl1Error::PLAT_OTP_WRITE_INVALID_INPUT,
            Access::GetSize => Bl1Error::PLAT_OTP_GET_SIZE_INVALID_INPUT,
        }
    }

    fn unsupported(self) -> Bl1Error {
        match self {
            Access::Read => Bl1Error::PLAT_OTP_READ_UNSUPPORTED,
            Access::Write => Bl1Error::PLAT_OTP_WRITE_UNSUPPORTED,
            Access::GetSize => Bl1Error::PLAT_OTP_GET_SIZE_UNSUPPORTED,
        }
    }
}

/// OTP subsystem.
///
/// Owns the LCM device, the KMU and the layout derived from the
/// configuration. Constructed once per boot or provisioning session; every
/// OTP operation goes through it.
pub struct OtpContext<L: LcmDevice> {
    pub(crate) config: OtpConfig,
    pub(crate) layout: OtpLayout,
    pub(crate) lcm: L,
    pub(crate) kmu: Kmu,
    pub(crate) codec: FieldCodec,
    pub(crate) integrity_checker: IntegrityChecker,
    pub(crate) state: OtpState,
}

impl<L: LcmDevice> OtpContext<L> {
    /// Create a context; `init` must succeed before elements can be accessed
    ///
    /// # Arguments
    ///
    /// * `config` - Platform parameters
    /// * `lcm`    - LCM device, optionally wrapped in the emulation shim
    /// * `kmu`    - KMU holding the key encryption keys
    pub fn new(config: OtpConfig, lcm: L, kmu: Kmu) -> Bl1Result<Self> {
        let layout = OtpLayout::new(&config)?;
        Ok(Self {
            config,
            layout,
            lcm,
            kmu,
            codec: FieldCodec::new(config.encrypted_otp_keys),
            integrity_checker: IntegrityChecker::new(),
            state: OtpState::Uninitialized,
        })
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    pub fn layout(&self) -> &OtpLayout {
        &self.layout
    }

    pub fn state(&self) -> OtpState {
        self.state
    }

    pub fn lcm(&self) -> &L {
        &self.lcm
    }

    pub fn lcm_mut(&mut self) -> &mut L {
        &mut self.lcm
    }

    pub fn kmu(&self) -> &Kmu {
        &self.kmu
    }

    pub fn kmu_mut(&mut self) -> &mut Kmu {
        &mut self.kmu
    }

    /// Release the LCM device and the KMU
    pub fn into_parts(self) -> (L, Kmu) {
        (self.lcm, self.kmu)
    }

    fn resolve(&self, id: OtpElementId, access: Access) -> Bl1Result<OtpElement> {
        if id.raw().is_none() {
            return Err(access.invalid_input());
        }
        if let Some(index) = id.image_index() {
            if !self.layout.image_supported(index) {
                return Err(access.unsupported());
            }
        }
        Ok(self.layout.element(id))
    }

    pub(crate) fn check_ready(&self) -> Bl1Result<()> {
        match self.state {
            OtpState::Ready => Ok(()),
            _ => Err(Bl1Error::OTP_NOT_INITIALIZED),
        }
    }

    fn current_lcs(&self) -> Bl1Result<LcsMask> {
        Ok(LcsMask::from(self.lcm.lcs()?))
    }

    /// Read element `id` into `out`.
    ///
    /// Reads shorter than the element return its first `out.len()` bytes.
    pub fn read(&self, id: OtpElementId, out: &mut [u8]) -> Bl1Result<()> {
        let element = self.resolve(id, Access::Read)?;
        self.check_ready()?;

        match element.kind {
            ElementKind::Lifecycle => return self.read_lcs(out),
            ElementKind::Plain if !element.field.is_mapped() => {
                return Err(Bl1Error::OTP_READ_UNSUPPORTED)
            }
            _ => {}
        }
        if !element.readable_in().intersects(self.current_lcs()?) {
            return Err(Bl1Error::OTP_READ_NOT_PERMITTED);
        }

        let field = element.field;
        match element.kind {
            ElementKind::Encrypted(slot) => {
                self.codec
                    .read_field(&self.lcm, &self.kmu, field.offset, field.size, slot.into(), out)
            }
            ElementKind::Bl1Stage2Image => {
                let len = self.read_u32(self.layout.bl1_2_image_len)? as usize;
                let image = self.bl1_2_image_field(len)?;
                raw_read(&self.lcm, image.offset, image.size, out)
            }
            ElementKind::ManufacturingData => {
                let len = self.read_u32(self.mfg_len_field()?)? as usize;
                let data = self.mfg_data_field(len)?;
                raw_read(&self.lcm, data.offset, data.size, out)
            }
            ElementKind::Plain | ElementKind::Lifecycle => {
                raw_read(&self.lcm, field.offset, field.size, out)
            }
        }
    }

    /// Program element `id` with `data`.
    ///
    /// Writing the life-cycle element performs a full state transition.
    pub fn write(&mut self, id: OtpElementId, data: &[u8]) -> Bl1Result<()> {
        let element = self.resolve(id, Access::Write)?;
        self.check_ready()?;

        match element.kind {
            ElementKind::Lifecycle => return self.write_lcs(data),
            ElementKind::Plain if !element.field.is_mapped() => {
                return Err(Bl1Error::OTP_WRITE_UNSUPPORTED)
            }
            _ => {}
        }
        if !element.region.writable_in().intersects(self.current_lcs()?) {
            return Err(Bl1Error::OTP_WRITE_NOT_PERMITTED);
        }

        let field = element.field;
        match element.kind {
            ElementKind::Encrypted(slot) => self.codec.write_field(
                &mut self.lcm,
                &self.kmu,
                field.offset,
                field.size,
                slot.into(),
                data,
            ),
            ElementKind::Bl1Stage2Image => {
                if data.len() > field.size {
                    return Err(Bl1Error::OTP_WRITE_INVALID_INPUT);
                }
                let image = self.bl1_2_image_field(data.len())?;
                raw_write(&mut self.lcm, image.offset, image.size, data)
            }
            ElementKind::ManufacturingData => self.write_mfg_data(data),
            ElementKind::Plain | ElementKind::Lifecycle => {
                raw_write(&mut self.lcm, field.offset, field.size, data)
            }
        }
    }

    /// Declared size of element `id`, independent of the life-cycle state
    pub fn get_size(&self, id: OtpElementId) -> Bl1Result<usize> {
        let element = self.resolve(id, Access::GetSize)?;
        Ok(element.field.size)
    }

    /// `read` for callers holding a raw element identifier
    pub fn read_raw(&self, id: u32, out: &mut [u8]) -> Bl1Result<()> {
        let id = OtpElementId::try_from(id).map_err(|_| Bl1Error::PLAT_OTP_READ_INVALID_INPUT)?;
        self.read(id, out)
    }

    /// `write` for callers holding a raw element identifier
    pub fn write_raw(&mut self, id: u32, data: &[u8]) -> Bl1Result<()> {
        let id = OtpElementId::try_from(id).map_err(|_| Bl1Error::PLAT_OTP_WRITE_INVALID_INPUT)?;
        self.write(id, data)
    }

    /// `get_size` for callers holding a raw element identifier
    pub fn get_size_raw(&self, id: u32) -> Bl1Result<usize> {
        let id =
            OtpElementId::try_from(id).map_err(|_| Bl1Error::PLAT_OTP_GET_SIZE_INVALID_INPUT)?;
        self.get_size(id)
    }

    pub(crate) fn read_u32(&self, field: OtpField) -> Bl1Result<u32> {
        let mut word = [0u8; 4];
        raw_read(&self.lcm, field.offset, word.len(), &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    pub(crate) fn read_mfg_header(&self) -> Bl1Result<MfgDataHeader> {
        let mut header = MfgDataHeader::default();
        raw_read(
            &self.lcm,
            self.layout.mfg_header.offset,
            self.layout.mfg_header.size,
            header.as_mut_bytes(),
        )?;
        Ok(header)
    }

    fn mfg_len_field(&self) -> Bl1Result<OtpField> {
        if !self.config.has_manufacturing_data {
            return Err(Bl1Error::PLAT_OTP_READ_MFG_DATA_UNSUPPORTED);
        }
        Ok(OtpField::new(self.layout.mfg_header.offset + 4, 4))
    }

    /// Manufacturing data of `len` bytes ends right below its header
    fn mfg_data_field(&self, len: usize) -> Bl1Result<OtpField> {
        if len > self.layout.mfg_data_capacity() {
            return Err(Bl1Error::OTP_INVALID_REGION_SIZE);
        }
        Ok(OtpField::new(self.layout.mfg_header.offset - len, len))
    }

    /// The BL1_2 image of `len` bytes ends right below the manufacturing
    /// data, or below the DMA initial command sequence without it
    fn bl1_2_image_field(&self, len: usize) -> Bl1Result<OtpField> {
        if len > self.layout.bl1_2_image.size {
            return Err(Bl1Error::OTP_BL1_2_IMAGE_INVALID_LEN);
        }
        let end = if self.config.has_manufacturing_data {
            let mfg_len = self.read_u32(self.mfg_len_field()?)? as usize;
            self.mfg_data_field(mfg_len)?.offset
        } else {
            self.layout.dma_ics.offset
        };
        Ok(OtpField::new(end - len, len))
    }

    /// Program the manufacturing data together with its size and zero count
    fn write_mfg_data(&mut self, data: &[u8]) -> Bl1Result<()> {
        if !self.config.has_manufacturing_data {
            return Err(Bl1Error::PLAT_OTP_WRITE_UNSUPPORTED);
        }
        if data.len() > self.layout.mfg_data_capacity() {
            return Err(Bl1Error::OTP_WRITE_INVALID_INPUT);
        }
        let mut header = self.read_mfg_header()?;
        header.size = data.len() as u32;

        let header_bytes = header.as_bytes();
        let mut acc = ZeroCountAccumulator::default();
        acc.update(data)
            .and_then(|_| acc.update(&header_bytes[..8]))
            .map_err(|_| Bl1Error::OTP_WRITE_INVALID_INPUT)?;
        header.zero_count = acc.finish();

        let region = self.mfg_data_field(data.len())?;
        raw_write(&mut self.lcm, region.offset, region.size, data)?;
        raw_write(
            &mut self.lcm,
            self.layout.mfg_header.offset,
            self.layout.mfg_header.size,
            header.as_bytes(),
        )
    }

    /// Zero count of `len` bytes of the array at `offset`, read in chunks
    pub(crate) fn zero_count(&self, offset: usize, len: usize) -> Bl1Result<u32> {
        let mut acc = ZeroCountAccumulator::default();
        let mut chunk = [0u8; 64];
        let mut pos = offset;
        let end = offset + len;
        while pos < end {
            let n = (end - pos).min(chunk.len());
            raw_read(&self.lcm, pos, n, &mut chunk[..n])?;
            acc.update(&chunk[..n])?;
            pos += n;
        }
        Ok(acc.finish())
    }

    pub(crate) fn integrity_value(&self, data: &[u8]) -> Bl1Result<u32> {
        self.integrity_checker
            .compute_value(IntegrityCheckerMode::ZeroCount, data)
    }

    /// Whether the device is in a state that has locked the CM region
    pub(crate) fn cm_region_locked(lcs: LcmLcs) -> bool {
        matches!(lcs, LcmLcs::Dm | LcmLcs::Se | LcmLcs::Rma)
    }

    /// Whether the device is in a state that has locked the DM region
    pub(crate) fn dm_region_locked(lcs: LcmLcs) -> bool {
        matches!(lcs, LcmLcs::Se | LcmLcs::Rma)
    }
}
