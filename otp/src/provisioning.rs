/*++

Licensed under the Apache-2.0 license.

File Name:

    provisioning.rs

Abstract:

    File contains the secure provisioning flow. Each bundle programs the
    fields of one manufacturing stage and then moves the device to the next
    life-cycle state, which locks what was just written.

--*/

use crate::accessor::raw_write;
use crate::element::OtpElementId;
use crate::layout::OtpLayout;
use crate::lifecycle::PlatOtpLcs;
use crate::map::OtpContext;
use bl1_drivers::{cprintln, LcmDevice, LcmLcs, Sha256Digest};
use bl1_error::{Bl1Error, Bl1Result};
use zeroize::Zeroizing;

/// Key pattern of development devices
pub const DUMMY_KEY_VALUE: [u8; 32] = [
    0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04,
    0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04,
];

/// Top bit of the general purpose configuration; triggers CM to DM on LCM v0
const LCM_V0_GPPC_CM_TRIGGER: u32 = 0x0800;

/// Fields programmed during chip manufacturing
#[derive(Debug, Default, Clone, Copy)]
pub struct CmProvisioningBundle<'a> {
    pub guk: Option<&'a [u8; 32]>,
    pub manufacturing_data: Option<&'a [u8]>,
    pub bl1_2_image: &'a [u8],
    /// Hash of the BL1_2 code region holding `bl1_2_image`
    pub bl1_2_image_hash: Sha256Digest,
    pub cca_system_properties: u32,
    pub cm_config_flags: u32,
    pub dma_ics: &'a [u8],
}

/// Fields programmed during device manufacturing
#[derive(Debug, Default, Clone, Copy)]
pub struct DmProvisioningBundle<'a> {
    pub bl1_rotpk_0: &'a [u8],
    /// One root key per BL2 image
    pub bl2_rotpk: &'a [&'a [u8]],
    pub iak_len: u32,
    pub iak_type: u32,
    pub iak_id: &'a [u8],
    pub implementation_id: &'a [u8],
    pub verification_service_url: &'a [u8],
    pub profile_definition: &'a [u8],
    pub secure_debug_pk: &'a [u8],
    pub host_rotpk_s: &'a [u8],
    pub host_rotpk_ns: &'a [u8],
    pub host_rotpk_cca: &'a [u8],
    pub dm_config_flags: u32,
    pub rse_id: u32,
    pub bl2_encryption_key: Option<&'a [u8; 32]>,
    pub s_image_encryption_key: Option<&'a [u8; 32]>,
    pub ns_image_encryption_key: Option<&'a [u8; 32]>,
}

fn map_bundle_error(e: Bl1Error) -> Bl1Error {
    match e {
        Bl1Error::OTP_WRITE_INVALID_INPUT | Bl1Error::OTP_WRITE_ENCRYPTED_INVALID_INPUT => {
            Bl1Error::PROVISIONING_INVALID_BUNDLE
        }
        e => e,
    }
}

impl<L: LcmDevice> OtpContext<L> {
    /// Whether the device still has a manufacturing stage to complete
    pub fn is_provisioning_required(&self) -> Bl1Result<bool> {
        Ok(matches!(
            self.current_state()?,
            PlatOtpLcs::AssemblyAndTest | PlatOtpLcs::PsaRotProvisioning
        ))
    }

    /// Enter secure provisioning mode.
    ///
    /// Once in secure provisioning mode, a version 0 LCM additionally needs
    /// its trigger fields burnt before it performs the pending transition.
    pub fn secure_provisioning_start(&mut self) -> Bl1Result<()> {
        if !self.lcm.sp_enabled() {
            return self.lcm.set_sp_enabled();
        }
        if self.config.lcm_version != 0 {
            return Ok(());
        }

        match self.lcm.lcs()? {
            LcmLcs::Cm => raw_write(
                &mut self.lcm,
                OtpLayout::CM_CONFIG_2.offset,
                OtpLayout::CM_CONFIG_2.size,
                &LCM_V0_GPPC_CM_TRIGGER.to_le_bytes(),
            ),
            LcmLcs::Dm => {
                for field in [OtpLayout::KP_DM, OtpLayout::KCE_DM] {
                    raw_write(&mut self.lcm, field.offset, field.size, &DUMMY_KEY_VALUE)?;
                }
                // Only the write itself matters; the value may not verify
                match raw_write(
                    &mut self.lcm,
                    OtpLayout::DM_CONFIG.offset,
                    OtpLayout::DM_CONFIG.size,
                    &u32::MAX.to_le_bytes(),
                ) {
                    Err(Bl1Error::DRIVER_LCM_OTP_WRITE_VERIFY_FAIL) => Ok(()),
                    result => result,
                }
            }
            _ => Ok(()),
        }
    }

    /// Program the chip manufacturing fields and move to DM
    pub fn provision_cm(&mut self, bundle: &CmProvisioningBundle) -> Bl1Result<()> {
        if self.current_state()? != PlatOtpLcs::AssemblyAndTest {
            return Err(Bl1Error::PROVISIONING_INVALID_LCS);
        }
        if bundle.manufacturing_data.is_some() && !self.config.has_manufacturing_data {
            return Err(Bl1Error::PROVISIONING_INVALID_BUNDLE);
        }
        cprintln!("[prov] CM provisioning start");

        if let Some(guk) = bundle.guk {
            self.write(OtpElementId::Guk, guk)?;
        }
        // The BL1_2 image is placed relative to the manufacturing data
        if let Some(data) = bundle.manufacturing_data {
            self.write(OtpElementId::ManufacturingData, data)
                .map_err(map_bundle_error)?;
        }
        let image_len = bundle.bl1_2_image.len() as u32;
        self.write(OtpElementId::Bl1Stage2ImageLen, &image_len.to_le_bytes())?;
        self.write(OtpElementId::Bl1Stage2Image, bundle.bl1_2_image)
            .map_err(map_bundle_error)?;
        self.write(OtpElementId::Bl1Stage2ImageHash, &bundle.bl1_2_image_hash)?;
        self.write(
            OtpElementId::CcaSystemProperties,
            &bundle.cca_system_properties.to_le_bytes(),
        )?;
        self.write(
            OtpElementId::CmConfigFlags,
            &bundle.cm_config_flags.to_le_bytes(),
        )?;
        self.write(OtpElementId::DmaIcs, bundle.dma_ics)
            .map_err(map_bundle_error)?;

        self.request_transition(PlatOtpLcs::PsaRotProvisioning)?;
        cprintln!("[prov] CM provisioning complete");
        Ok(())
    }

    /// Program the device manufacturing fields and move to SE
    pub fn provision_dm(&mut self, bundle: &DmProvisioningBundle) -> Bl1Result<()> {
        if self.current_state()? != PlatOtpLcs::PsaRotProvisioning {
            return Err(Bl1Error::PROVISIONING_INVALID_LCS);
        }
        if bundle.bl2_rotpk.len() > self.layout.image_number {
            return Err(Bl1Error::PROVISIONING_INVALID_BUNDLE);
        }
        cprintln!("[prov] DM provisioning start");

        let rse_id = bundle.rse_id.to_le_bytes();
        let fields: [(OtpElementId, &[u8]); 10] = [
            (OtpElementId::Bl1Rotpk0, bundle.bl1_rotpk_0),
            (OtpElementId::IakId, bundle.iak_id),
            (OtpElementId::ImplementationId, bundle.implementation_id),
            (
                OtpElementId::VerificationServiceUrl,
                bundle.verification_service_url,
            ),
            (OtpElementId::ProfileDefinition, bundle.profile_definition),
            (OtpElementId::SecureDebugPk, bundle.secure_debug_pk),
            (OtpElementId::HostRotpkS, bundle.host_rotpk_s),
            (OtpElementId::HostRotpkNs, bundle.host_rotpk_ns),
            (OtpElementId::HostRotpkCca, bundle.host_rotpk_cca),
            (OtpElementId::RseId, &rse_id),
        ];
        for (id, data) in fields {
            self.write(id, data).map_err(map_bundle_error)?;
        }
        for (n, rotpk) in bundle.bl2_rotpk.iter().enumerate() {
            self.write(OtpElementId::Bl2Rotpk(n as u8), rotpk)
                .map_err(map_bundle_error)?;
        }
        self.write(OtpElementId::IakLen, &bundle.iak_len.to_le_bytes())?;
        self.write(OtpElementId::IakType, &bundle.iak_type.to_le_bytes())?;
        self.write(
            OtpElementId::DmConfigFlags,
            &bundle.dm_config_flags.to_le_bytes(),
        )?;

        for (id, key) in [
            (OtpElementId::KeyBl2Encryption, bundle.bl2_encryption_key),
            (OtpElementId::KeySecureEncryption, bundle.s_image_encryption_key),
            (
                OtpElementId::KeyNonSecureEncryption,
                bundle.ns_image_encryption_key,
            ),
        ] {
            if let Some(key) = key {
                self.write(id, key).map_err(map_bundle_error)?;
            }
        }

        self.request_transition(PlatOtpLcs::Secured)?;
        cprintln!("[prov] DM provisioning complete");
        Ok(())
    }

    /// Warn when a development key pattern has been provisioned.
    ///
    /// Returns whether a dummy key was found.
    pub fn check_for_dummy_keys(&self) -> Bl1Result<bool> {
        let mut found = false;
        for id in [
            OtpElementId::Guk,
            OtpElementId::KeyBl2Encryption,
            OtpElementId::KeySecureEncryption,
            OtpElementId::KeyNonSecureEncryption,
        ] {
            let mut key = Zeroizing::new([0u8; 32]);
            match self.read(id, &mut key[..]) {
                Ok(()) => {}
                Err(Bl1Error::OTP_READ_NOT_PERMITTED) => continue,
                Err(e) => return Err(e),
            }
            if *key == DUMMY_KEY_VALUE {
                cprintln!(
                    "[prov] WARNING: element {} holds a development key",
                    id.raw().unwrap_or(u32::MAX)
                );
                found = true;
            }
        }
        Ok(found)
    }
}
