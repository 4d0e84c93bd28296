/*++

Licensed under the Apache-2.0 license.

File Name:

    config.rs

Abstract:

    File contains the platform parameters the OTP layout is generated from.

--*/

/// Largest number of independently updated images a layout can describe
pub const MAX_IMAGE_NUMBER: usize = 9;

/// Number of host NV counters
pub const HOST_NV_COUNTER_COUNT: usize = 3;

/// Number of protected storage NV counters, when present
pub const PS_NV_COUNTER_COUNT: usize = 3;

/// Platform parameters of the OTP layout.
///
/// Resolved once at start-up; the layout, the element catalog and the field
/// codec are all derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpConfig {
    /// Size of the whole fuse array in bytes
    pub otp_total_size: usize,

    /// Size of the DMA initial command sequence at the end of the array
    pub dma_ics_size: usize,

    /// Size of the BL1_2 code region
    pub bl1_2_code_size: usize,

    /// Manufacturing data block, including its 16 byte header
    pub mfg_data_max_size: usize,

    pub has_manufacturing_data: bool,

    /// Number of BL2 images, each with its own root key and NV counter
    pub mcuboot_image_number: usize,

    /// Number of RSE instances sharing the routing tables
    pub rse_amount: usize,

    /// Store the DM provisioned image keys encrypted under the KCE
    pub encrypted_otp_keys: bool,

    pub ps_nv_counters: bool,

    /// Version of the LCM; version 0 keeps the runtime OTP key in the DM area
    pub lcm_version: u32,

    /// BL2 verifies images with ECDSA P-384 instead of P-256
    pub sign_ec384: bool,

    /// BL2 root keys are stored whole instead of as a hash
    pub builtin_key: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            otp_total_size: 0x4000,
            dma_ics_size: 0x400,
            bl1_2_code_size: 0x2000,
            mfg_data_max_size: 0x100,
            has_manufacturing_data: true,
            mcuboot_image_number: 4,
            rse_amount: 1,
            encrypted_otp_keys: true,
            ps_nv_counters: true,
            lcm_version: 1,
            sign_ec384: false,
            builtin_key: false,
        }
    }
}

impl OtpConfig {
    /// Size of each BL2 root key field in 32-bit words
    pub fn bl2_rotpk_words(&self) -> usize {
        match (self.builtin_key, self.sign_ec384) {
            (true, true) => 25,
            (true, false) => 17,
            (false, true) => 12,
            (false, false) => 8,
        }
    }

    /// Size of the manufacturing data block that is actually laid out
    pub fn mfg_data_size(&self) -> usize {
        if self.has_manufacturing_data {
            self.mfg_data_max_size
        } else {
            0
        }
    }
}
