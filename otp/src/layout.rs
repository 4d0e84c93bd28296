/*++

Licensed under the Apache-2.0 license.

File Name:

    layout.rs

Abstract:

    File contains the binary layout of the OTP fuse array.

    The array starts with the hardware header owned by the LCM, followed by
    the user area. The user area holds the integrity snapshots, the CM
    locked region, the DM locked region and the unlocked region, padded up
    to the BL1_2 image. The manufacturing data block and the DMA initial
    command sequence sit at fixed offsets from the end of the array.

--*/

use crate::config::{OtpConfig, HOST_NV_COUNTER_COUNT, MAX_IMAGE_NUMBER, PS_NV_COUNTER_COUNT};
use bl1_error::{Bl1Error, Bl1Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Version of the layout produced by `OtpLayout::new`.
///
/// Any change to field order or size is a breaking change to every
/// provisioned device and must bump this value.
pub const OTP_LAYOUT_VERSION: u32 = 1;

/// Size of the LCM owned header at the start of the array
pub const OTP_HW_HEADER_SIZE: usize = 0x100;

/// Size of a unary NV counter
pub const OTP_NV_COUNTER_SIZE: usize = 64;

const MFG_DATA_HEADER_SIZE: usize = core::mem::size_of::<MfgDataHeader>();
const WORD: usize = 4;

/// Location of one field in the fuse array.
///
/// An offset of zero marks a field that is not mapped on this configuration;
/// no mapped field can live there since the LCM header starts the array.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OtpField {
    pub offset: usize,
    pub size: usize,
}

impl OtpField {
    pub const EMPTY: OtpField = OtpField { offset: 0, size: 0 };

    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    pub fn is_mapped(&self) -> bool {
        self.offset != 0
    }

    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Integrity snapshot of a locked region, as stored in the user area
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct LockedRegionSnapshot {
    /// Size of the region in bytes
    pub size: u64,

    /// Zero count of `size`
    pub size_zero_count: u32,

    /// Zero count of the region contents
    pub zero_count: u32,
}

/// Header of the manufacturing data block
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct MfgDataHeader {
    pub _pad0: u32,

    /// Size of the data placed right below the header
    pub size: u32,

    pub _pad1: u32,

    /// Zero count over the data, `_pad0` and `size`
    pub zero_count: u32,
}

/// Sequential allocator used to lay out the user area
struct Cursor {
    pos: usize,
}

impl Cursor {
    fn take(&mut self, size: usize) -> OtpField {
        let field = OtpField::new(self.pos, size);
        self.pos += size;
        field
    }

    fn take_if(&mut self, present: bool, size: usize) -> OtpField {
        if present {
            self.take(size)
        } else {
            OtpField::EMPTY
        }
    }
}

/// Offsets of every field of the array for one `OtpConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpLayout {
    pub image_number: usize,

    // Integrity snapshots
    pub cm_snapshot: OtpField,
    pub dm_snapshot: OtpField,
    pub attack_tracking_bits: OtpField,

    // CM locked region
    pub cm_locked: OtpField,
    pub bl1_2_image_len: OtpField,
    pub cca_system_properties: OtpField,
    pub cm_config_flags: OtpField,

    // DM locked region
    pub dm_locked: OtpField,
    pub bl1_rotpk_0: OtpField,
    pub bl2_rotpk: [OtpField; MAX_IMAGE_NUMBER],
    pub iak_len: OtpField,
    pub iak_type: OtpField,
    pub iak_id: OtpField,
    pub implementation_id: OtpField,
    pub verification_service_url: OtpField,
    pub profile_definition: OtpField,
    pub secure_debug_pk: OtpField,
    pub host_rotpk_s: OtpField,
    pub host_rotpk_ns: OtpField,
    pub host_rotpk_cca: OtpField,
    pub dm_config_flags: OtpField,
    pub rse_id: OtpField,
    pub rse_to_rse_sender_routing_table: OtpField,
    pub rse_to_rse_receiver_routing_table: OtpField,
    pub bl2_encryption_key: OtpField,
    pub s_image_encryption_key: OtpField,
    pub ns_image_encryption_key: OtpField,
    pub runtime_otp_encryption_key: OtpField,

    // Unlocked region
    pub unlocked_area: OtpField,
    pub bl1_nv_counter: OtpField,
    pub bl2_nv_counter: [OtpField; MAX_IMAGE_NUMBER],
    pub ps_nv_counter: [OtpField; PS_NV_COUNTER_COUNT],
    pub host_nv_counter: [OtpField; HOST_NV_COUNTER_COUNT],
    pub reprovisioning_bits: OtpField,

    // Fixed position tail
    pub bl1_2_image: OtpField,
    pub mfg_data: OtpField,
    pub mfg_header: OtpField,
    pub dma_ics: OtpField,
}

impl OtpLayout {
    pub const HUK: OtpField = OtpField::new(0x00, 32);
    pub const GUK: OtpField = OtpField::new(0x20, 32);
    pub const KP_CM: OtpField = OtpField::new(0x40, 32);
    pub const KCE_CM: OtpField = OtpField::new(0x60, 32);
    pub const CM_CONFIG_1: OtpField = OtpField::new(0x80, 4);
    pub const CM_CONFIG_2: OtpField = OtpField::new(0x84, 4);
    pub const DM_CONFIG: OtpField = OtpField::new(0x88, 4);
    pub const CM_RMA_FLAG: OtpField = OtpField::new(0x8C, 4);
    pub const DM_RMA_FLAG: OtpField = OtpField::new(0x90, 4);
    pub const KP_DM: OtpField = OtpField::new(0x94, 32);
    pub const KCE_DM: OtpField = OtpField::new(0xB4, 32);
    /// Reference hash of the BL1_2 image
    pub const ROTPK: OtpField = OtpField::new(0xD4, 32);
    pub const TP_MODE_CONFIG: OtpField = OtpField::new(0xF4, 4);
    /// Unary life-cycle word, written only by the LCM
    pub const LCS_FUSES: OtpField = OtpField::new(0xF8, 4);

    /// Generate the layout for `config`.
    ///
    /// Fails with `OTP_LAYOUT_INVALID_CONFIG` for out of range parameters and
    /// with `OTP_LAYOUT_OVERFLOW` when the fields do not fit the array.
    pub fn new(config: &OtpConfig) -> Bl1Result<Self> {
        Self::validate_config(config)?;

        let mfg_size = config.mfg_data_size();
        let pad_size = config
            .otp_total_size
            .checked_sub(config.dma_ics_size)
            .and_then(|s| s.checked_sub(config.bl1_2_code_size))
            .and_then(|s| s.checked_sub(mfg_size))
            .and_then(|s| s.checked_sub(OTP_HW_HEADER_SIZE))
            .ok_or(Bl1Error::OTP_LAYOUT_OVERFLOW)?;

        let mut c = Cursor {
            pos: OTP_HW_HEADER_SIZE,
        };

        let cm_snapshot = c.take(core::mem::size_of::<LockedRegionSnapshot>());
        let dm_snapshot = c.take(core::mem::size_of::<LockedRegionSnapshot>());
        let attack_tracking_bits = c.take(4 * WORD);

        let cm_start = c.pos;
        let bl1_2_image_len = c.take(WORD);
        let cca_system_properties = c.take(WORD);
        let cm_config_flags = c.take(WORD);
        c.take(WORD);
        let cm_locked = OtpField::new(cm_start, c.pos - cm_start);

        let dm_start = c.pos;
        let bl1_rotpk_0 = c.take(14 * WORD);
        let mut bl2_rotpk = [OtpField::EMPTY; MAX_IMAGE_NUMBER];
        for rotpk in bl2_rotpk.iter_mut().take(config.mcuboot_image_number) {
            *rotpk = c.take(config.bl2_rotpk_words() * WORD);
        }
        let iak_len = c.take(WORD);
        let iak_type = c.take(WORD);
        let iak_id = c.take(8 * WORD);
        let implementation_id = c.take(8 * WORD);
        let verification_service_url = c.take(8 * WORD);
        let profile_definition = c.take(12 * WORD);
        let secure_debug_pk = c.take(8 * WORD);
        let host_rotpk_s = c.take(24 * WORD);
        let host_rotpk_ns = c.take(24 * WORD);
        let host_rotpk_cca = c.take(24 * WORD);
        let dm_config_flags = c.take(WORD);
        let rse_id = c.take(WORD);
        let multi_rse = config.rse_amount > 1;
        let rse_to_rse_sender_routing_table = c.take_if(multi_rse, config.rse_amount * WORD);
        let rse_to_rse_receiver_routing_table = c.take_if(multi_rse, config.rse_amount * WORD);
        let bl2_encryption_key = c.take(8 * WORD);
        let s_image_encryption_key = c.take(8 * WORD);
        let ns_image_encryption_key = c.take(8 * WORD);
        let runtime_otp_encryption_key = if config.lcm_version == 0 {
            c.take(8 * WORD)
        } else {
            Self::KCE_DM
        };
        let dm_locked = OtpField::new(dm_start, c.pos - dm_start);

        let unlocked_start = c.pos;
        let bl1_nv_counter = c.take(OTP_NV_COUNTER_SIZE);
        let mut bl2_nv_counter = [OtpField::EMPTY; MAX_IMAGE_NUMBER];
        for counter in bl2_nv_counter.iter_mut().take(config.mcuboot_image_number) {
            *counter = c.take(OTP_NV_COUNTER_SIZE);
        }
        let mut ps_nv_counter = [OtpField::EMPTY; PS_NV_COUNTER_COUNT];
        for counter in ps_nv_counter.iter_mut() {
            *counter = c.take_if(config.ps_nv_counters, OTP_NV_COUNTER_SIZE);
        }
        let mut host_nv_counter = [OtpField::EMPTY; HOST_NV_COUNTER_COUNT];
        for counter in host_nv_counter.iter_mut() {
            *counter = c.take(OTP_NV_COUNTER_SIZE);
        }
        let reprovisioning_bits = c.take(WORD);
        let unlocked_area = OtpField::new(unlocked_start, c.pos - unlocked_start);

        if c.pos > OTP_HW_HEADER_SIZE + pad_size {
            return Err(Bl1Error::OTP_LAYOUT_OVERFLOW);
        }

        let mut c = Cursor {
            pos: OTP_HW_HEADER_SIZE + pad_size,
        };
        let bl1_2_image = c.take(config.bl1_2_code_size);
        let (mfg_data, mfg_header) = if config.has_manufacturing_data {
            (
                c.take(mfg_size - MFG_DATA_HEADER_SIZE),
                c.take(MFG_DATA_HEADER_SIZE),
            )
        } else {
            (OtpField::EMPTY, OtpField::EMPTY)
        };
        let dma_ics = c.take(config.dma_ics_size);

        Ok(Self {
            image_number: config.mcuboot_image_number,
            cm_snapshot,
            dm_snapshot,
            attack_tracking_bits,
            cm_locked,
            bl1_2_image_len,
            cca_system_properties,
            cm_config_flags,
            dm_locked,
            bl1_rotpk_0,
            bl2_rotpk,
            iak_len,
            iak_type,
            iak_id,
            implementation_id,
            verification_service_url,
            profile_definition,
            secure_debug_pk,
            host_rotpk_s,
            host_rotpk_ns,
            host_rotpk_cca,
            dm_config_flags,
            rse_id,
            rse_to_rse_sender_routing_table,
            rse_to_rse_receiver_routing_table,
            bl2_encryption_key,
            s_image_encryption_key,
            ns_image_encryption_key,
            runtime_otp_encryption_key,
            unlocked_area,
            bl1_nv_counter,
            bl2_nv_counter,
            ps_nv_counter,
            host_nv_counter,
            reprovisioning_bits,
            bl1_2_image,
            mfg_data,
            mfg_header,
            dma_ics,
        })
    }

    fn validate_config(config: &OtpConfig) -> Bl1Result<()> {
        let aligned = [
            config.otp_total_size,
            config.dma_ics_size,
            config.bl1_2_code_size,
            config.mfg_data_size(),
        ]
        .iter()
        .all(|size| size % WORD == 0);

        if !aligned
            || config.mcuboot_image_number == 0
            || config.mcuboot_image_number > MAX_IMAGE_NUMBER
            || config.rse_amount == 0
            || config.lcm_version > 1
            || (config.has_manufacturing_data && config.mfg_data_max_size < MFG_DATA_HEADER_SIZE)
            || u32::try_from(config.otp_total_size).is_err()
        {
            return Err(Bl1Error::OTP_LAYOUT_INVALID_CONFIG);
        }
        Ok(())
    }

    /// End of the last field of the user area that BL1 relies on
    pub fn main_area_end(&self) -> usize {
        self.unlocked_area.end()
    }

    /// Size of the manufacturing data that fits below its header
    pub fn mfg_data_capacity(&self) -> usize {
        self.mfg_data.size
    }

    /// Members of the size-parametrized families beyond the configured image
    /// count are not part of this layout
    pub fn image_supported(&self, index: u8) -> bool {
        (index as usize) < self.image_number
    }
}
