/*++

Licensed under the Apache-2.0 license.

File Name:

    element.rs

Abstract:

    File contains the catalog of named OTP elements and the life-cycle
    policy attached to the region each element lives in.

--*/

use crate::config::{HOST_NV_COUNTER_COUNT, MAX_IMAGE_NUMBER, PS_NV_COUNTER_COUNT};
use crate::layout::{OtpField, OtpLayout};
use bitflags::bitflags;
use bl1_drivers::{KmuHwSlot, LcmLcs};

const FAMILY_BL2_ROTPK: u32 = 12;
const FAMILY_NV_COUNTER_BL2: u32 = FAMILY_BL2_ROTPK + MAX_IMAGE_NUMBER as u32;
const FAMILY_NV_COUNTER_NS: u32 = FAMILY_NV_COUNTER_BL2 + MAX_IMAGE_NUMBER as u32;
const FAMILY_NV_COUNTER_PS: u32 = 44;

/// Number of raw element identifiers
pub const OTP_ELEMENT_ID_MAX: u32 = 63;

/// Named OTP element.
///
/// The raw numbering returned by `raw()` is stable and shared with callers
/// that only carry a `u32`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OtpElementId {
    Huk,
    Guk,
    Iak,
    IakLen,
    IakType,
    IakId,
    BootSeed,
    Lcs,
    ImplementationId,
    CertRef,
    VerificationServiceUrl,
    ProfileDefinition,
    Bl2Rotpk(u8),
    NvCounterBl2(u8),
    NvCounterNs(u8),
    KeyBl2Encryption,
    KeySecureEncryption,
    KeyNonSecureEncryption,
    Bl1Stage2Image,
    Bl1Stage2ImageHash,
    Bl2ImageHash,
    Bl1Rotpk0,
    NvCounterBl1,
    EntropySeed,
    SecureDebugPk,
    Bl1Stage2ImageLen,
    NvCounterPs(u8),
    HostRotpkS,
    HostRotpkNs,
    HostRotpkCca,
    CcaSystemProperties,
    ReprovisioningBits,
    RseId,
    DmaIcs,
    ManufacturingData,
    ManufacturingDataLen,
    RomOtpEncryptionKey,
    RuntimeOtpEncryptionKey,
    CmConfigFlags,
    DmConfigFlags,
    RseToRseSenderRoutingTable,
    RseToRseReceiverRoutingTable,
    AttackTrackingBits,
}

impl OtpElementId {
    /// Stable raw identifier; `None` for family members beyond the largest
    /// family width any layout supports
    pub fn raw(self) -> Option<u32> {
        let family = |base: u32, index: u8, width: usize| {
            if (index as usize) < width {
                Some(base + index as u32)
            } else {
                None
            }
        };
        let id = match self {
            OtpElementId::Huk => 0,
            OtpElementId::Guk => 1,
            OtpElementId::Iak => 2,
            OtpElementId::IakLen => 3,
            OtpElementId::IakType => 4,
            OtpElementId::IakId => 5,
            OtpElementId::BootSeed => 6,
            OtpElementId::Lcs => 7,
            OtpElementId::ImplementationId => 8,
            OtpElementId::CertRef => 9,
            OtpElementId::VerificationServiceUrl => 10,
            OtpElementId::ProfileDefinition => 11,
            OtpElementId::Bl2Rotpk(n) => return family(FAMILY_BL2_ROTPK, n, MAX_IMAGE_NUMBER),
            OtpElementId::NvCounterBl2(n) => {
                return family(FAMILY_NV_COUNTER_BL2, n, MAX_IMAGE_NUMBER)
            }
            OtpElementId::NvCounterNs(n) => {
                return family(FAMILY_NV_COUNTER_NS, n, HOST_NV_COUNTER_COUNT)
            }
            OtpElementId::KeyBl2Encryption => 33,
            OtpElementId::KeySecureEncryption => 34,
            OtpElementId::KeyNonSecureEncryption => 35,
            OtpElementId::Bl1Stage2Image => 36,
            OtpElementId::Bl1Stage2ImageHash => 37,
            OtpElementId::Bl2ImageHash => 38,
            OtpElementId::Bl1Rotpk0 => 39,
            OtpElementId::NvCounterBl1 => 40,
            OtpElementId::EntropySeed => 41,
            OtpElementId::SecureDebugPk => 42,
            OtpElementId::Bl1Stage2ImageLen => 43,
            OtpElementId::NvCounterPs(n) => {
                return family(FAMILY_NV_COUNTER_PS, n, PS_NV_COUNTER_COUNT)
            }
            OtpElementId::HostRotpkS => 47,
            OtpElementId::HostRotpkNs => 48,
            OtpElementId::HostRotpkCca => 49,
            OtpElementId::CcaSystemProperties => 50,
            OtpElementId::ReprovisioningBits => 51,
            OtpElementId::RseId => 52,
            OtpElementId::DmaIcs => 53,
            OtpElementId::ManufacturingData => 54,
            OtpElementId::ManufacturingDataLen => 55,
            OtpElementId::RomOtpEncryptionKey => 56,
            OtpElementId::RuntimeOtpEncryptionKey => 57,
            OtpElementId::CmConfigFlags => 58,
            OtpElementId::DmConfigFlags => 59,
            OtpElementId::RseToRseSenderRoutingTable => 60,
            OtpElementId::RseToRseReceiverRoutingTable => 61,
            OtpElementId::AttackTrackingBits => 62,
        };
        Some(id)
    }

    /// Index within the image-count parametrized families
    pub fn image_index(self) -> Option<u8> {
        match self {
            OtpElementId::Bl2Rotpk(n) | OtpElementId::NvCounterBl2(n) => Some(n),
            _ => None,
        }
    }
}

impl TryFrom<u32> for OtpElementId {
    type Error = ();

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        let image_family = FAMILY_BL2_ROTPK..FAMILY_NV_COUNTER_BL2;
        let counter_family = FAMILY_NV_COUNTER_BL2..FAMILY_NV_COUNTER_NS;
        let ns_family = FAMILY_NV_COUNTER_NS..FAMILY_NV_COUNTER_NS + HOST_NV_COUNTER_COUNT as u32;
        let ps_family = FAMILY_NV_COUNTER_PS..FAMILY_NV_COUNTER_PS + PS_NV_COUNTER_COUNT as u32;

        let element = match id {
            0 => OtpElementId::Huk,
            1 => OtpElementId::Guk,
            2 => OtpElementId::Iak,
            3 => OtpElementId::IakLen,
            4 => OtpElementId::IakType,
            5 => OtpElementId::IakId,
            6 => OtpElementId::BootSeed,
            7 => OtpElementId::Lcs,
            8 => OtpElementId::ImplementationId,
            9 => OtpElementId::CertRef,
            10 => OtpElementId::VerificationServiceUrl,
            11 => OtpElementId::ProfileDefinition,
            n if image_family.contains(&n) => OtpElementId::Bl2Rotpk((n - FAMILY_BL2_ROTPK) as u8),
            n if counter_family.contains(&n) => {
                OtpElementId::NvCounterBl2((n - FAMILY_NV_COUNTER_BL2) as u8)
            }
            n if ns_family.contains(&n) => {
                OtpElementId::NvCounterNs((n - FAMILY_NV_COUNTER_NS) as u8)
            }
            33 => OtpElementId::KeyBl2Encryption,
            34 => OtpElementId::KeySecureEncryption,
            35 => OtpElementId::KeyNonSecureEncryption,
            36 => OtpElementId::Bl1Stage2Image,
            37 => OtpElementId::Bl1Stage2ImageHash,
            38 => OtpElementId::Bl2ImageHash,
            39 => OtpElementId::Bl1Rotpk0,
            40 => OtpElementId::NvCounterBl1,
            41 => OtpElementId::EntropySeed,
            42 => OtpElementId::SecureDebugPk,
            43 => OtpElementId::Bl1Stage2ImageLen,
            n if ps_family.contains(&n) => {
                OtpElementId::NvCounterPs((n - FAMILY_NV_COUNTER_PS) as u8)
            }
            47 => OtpElementId::HostRotpkS,
            48 => OtpElementId::HostRotpkNs,
            49 => OtpElementId::HostRotpkCca,
            50 => OtpElementId::CcaSystemProperties,
            51 => OtpElementId::ReprovisioningBits,
            52 => OtpElementId::RseId,
            53 => OtpElementId::DmaIcs,
            54 => OtpElementId::ManufacturingData,
            55 => OtpElementId::ManufacturingDataLen,
            56 => OtpElementId::RomOtpEncryptionKey,
            57 => OtpElementId::RuntimeOtpEncryptionKey,
            58 => OtpElementId::CmConfigFlags,
            59 => OtpElementId::DmConfigFlags,
            60 => OtpElementId::RseToRseSenderRoutingTable,
            61 => OtpElementId::RseToRseReceiverRoutingTable,
            62 => OtpElementId::AttackTrackingBits,
            _ => return Err(()),
        };
        Ok(element)
    }
}

bitflags! {
    /// Set of life-cycle states
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct LcsMask: u32 {
        const CM = 0b0001;
        const DM = 0b0010;
        const SE = 0b0100;
        const RMA = 0b1000;
    }
}

impl From<LcmLcs> for LcsMask {
    fn from(lcs: LcmLcs) -> Self {
        match lcs {
            LcmLcs::Cm => LcsMask::CM,
            LcmLcs::Dm => LcsMask::DM,
            LcmLcs::Se => LcsMask::SE,
            LcmLcs::Rma => LcsMask::RMA,
            LcmLcs::Invalid => LcsMask::empty(),
        }
    }
}

/// Structural region of the array an element lives in
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ElementRegion {
    /// LCM header fields programmed during chip manufacturing
    FactoryCm,
    /// LCM header fields programmed during device manufacturing
    FactoryDm,
    CmLocked,
    DmLocked,
    Unlocked,
    /// The life-cycle word itself
    Lifecycle,
    /// Not present on this platform
    Unmapped,
}

impl ElementRegion {
    /// States in which the region may be written
    pub fn writable_in(self) -> LcsMask {
        match self {
            ElementRegion::FactoryCm | ElementRegion::CmLocked => LcsMask::CM,
            ElementRegion::FactoryDm | ElementRegion::DmLocked => LcsMask::DM,
            ElementRegion::Unlocked | ElementRegion::Lifecycle => LcsMask::all(),
            ElementRegion::Unmapped => LcsMask::empty(),
        }
    }
}

/// How an element is stored
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ElementKind {
    Plain,
    /// Stored under the KCE held in the slot
    Encrypted(KmuHwSlot),
    Lifecycle,
    /// Placed below the manufacturing data, sized by `Bl1Stage2ImageLen`
    Bl1Stage2Image,
    /// Placed below the manufacturing data header, written with its header
    ManufacturingData,
}

/// Resolved catalog entry of one element
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OtpElement {
    pub field: OtpField,
    pub region: ElementRegion,
    pub kind: ElementKind,
    /// Key material that must not leave the device once decommissioned
    pub secret: bool,
}

impl OtpElement {
    fn plain(field: OtpField, region: ElementRegion) -> Self {
        Self {
            field,
            region,
            kind: ElementKind::Plain,
            secret: false,
        }
    }

    fn secret(field: OtpField, region: ElementRegion) -> Self {
        Self {
            secret: true,
            ..Self::plain(field, region)
        }
    }

    fn encrypted(field: OtpField) -> Self {
        Self {
            field,
            region: ElementRegion::DmLocked,
            kind: ElementKind::Encrypted(KmuHwSlot::KceCm),
            secret: true,
        }
    }

    fn unmapped() -> Self {
        Self::plain(OtpField::EMPTY, ElementRegion::Unmapped)
    }

    /// States in which the element may be read
    pub fn readable_in(&self) -> LcsMask {
        if self.secret {
            LcsMask::all() - LcsMask::RMA
        } else {
            LcsMask::all()
        }
    }
}

impl OtpLayout {
    /// Resolve `id` to its field, region and storage kind.
    ///
    /// Family members beyond the configured image count resolve to
    /// unmapped entries; callers check `image_supported` first.
    pub fn element(&self, id: OtpElementId) -> OtpElement {
        use ElementRegion::*;

        let image = |fields: &[OtpField], n: u8| fields.get(n as usize).copied().unwrap_or_default();

        match id {
            OtpElementId::Huk => OtpElement::secret(Self::HUK, FactoryCm),
            OtpElementId::Guk => OtpElement::secret(Self::GUK, FactoryCm),
            OtpElementId::Bl1Stage2ImageHash => OtpElement::plain(Self::ROTPK, FactoryCm),
            OtpElementId::RomOtpEncryptionKey => OtpElement::secret(Self::KCE_CM, FactoryCm),
            OtpElementId::RuntimeOtpEncryptionKey => {
                if self.runtime_otp_encryption_key == Self::KCE_DM {
                    OtpElement::secret(Self::KCE_DM, FactoryDm)
                } else {
                    OtpElement::secret(self.runtime_otp_encryption_key, DmLocked)
                }
            }

            OtpElementId::Bl1Stage2ImageLen => OtpElement::plain(self.bl1_2_image_len, CmLocked),
            OtpElementId::CcaSystemProperties => {
                OtpElement::plain(self.cca_system_properties, CmLocked)
            }
            OtpElementId::CmConfigFlags => OtpElement::plain(self.cm_config_flags, CmLocked),
            OtpElementId::DmaIcs => OtpElement::plain(self.dma_ics, CmLocked),
            OtpElementId::ManufacturingDataLen => OtpElement::plain(
                OtpField::new(
                    if self.mfg_header.is_mapped() {
                        self.mfg_header.offset + 4
                    } else {
                        0
                    },
                    4,
                ),
                CmLocked,
            ),
            OtpElementId::ManufacturingData => OtpElement {
                kind: ElementKind::ManufacturingData,
                ..OtpElement::plain(self.mfg_data, CmLocked)
            },
            OtpElementId::Bl1Stage2Image => OtpElement {
                kind: ElementKind::Bl1Stage2Image,
                ..OtpElement::plain(self.bl1_2_image, CmLocked)
            },

            OtpElementId::IakLen => OtpElement::plain(self.iak_len, DmLocked),
            OtpElementId::IakType => OtpElement::plain(self.iak_type, DmLocked),
            OtpElementId::IakId => OtpElement::plain(self.iak_id, DmLocked),
            OtpElementId::ImplementationId => OtpElement::plain(self.implementation_id, DmLocked),
            OtpElementId::VerificationServiceUrl => {
                OtpElement::plain(self.verification_service_url, DmLocked)
            }
            OtpElementId::ProfileDefinition => OtpElement::plain(self.profile_definition, DmLocked),
            OtpElementId::Bl2Rotpk(n) => OtpElement::plain(image(&self.bl2_rotpk, n), DmLocked),
            OtpElementId::Bl1Rotpk0 => OtpElement::plain(self.bl1_rotpk_0, DmLocked),
            OtpElementId::SecureDebugPk => OtpElement::plain(self.secure_debug_pk, DmLocked),
            OtpElementId::HostRotpkS => OtpElement::plain(self.host_rotpk_s, DmLocked),
            OtpElementId::HostRotpkNs => OtpElement::plain(self.host_rotpk_ns, DmLocked),
            OtpElementId::HostRotpkCca => OtpElement::plain(self.host_rotpk_cca, DmLocked),
            OtpElementId::DmConfigFlags => OtpElement::plain(self.dm_config_flags, DmLocked),
            OtpElementId::RseId => OtpElement::plain(self.rse_id, DmLocked),
            OtpElementId::RseToRseSenderRoutingTable => {
                OtpElement::plain(self.rse_to_rse_sender_routing_table, DmLocked)
            }
            OtpElementId::RseToRseReceiverRoutingTable => {
                OtpElement::plain(self.rse_to_rse_receiver_routing_table, DmLocked)
            }
            OtpElementId::KeyBl2Encryption => OtpElement::encrypted(self.bl2_encryption_key),
            OtpElementId::KeySecureEncryption => OtpElement::encrypted(self.s_image_encryption_key),
            OtpElementId::KeyNonSecureEncryption => {
                OtpElement::encrypted(self.ns_image_encryption_key)
            }

            OtpElementId::NvCounterBl1 => OtpElement::plain(self.bl1_nv_counter, Unlocked),
            OtpElementId::NvCounterBl2(n) => {
                OtpElement::plain(image(&self.bl2_nv_counter, n), Unlocked)
            }
            OtpElementId::NvCounterPs(n) => {
                OtpElement::plain(image(&self.ps_nv_counter, n), Unlocked)
            }
            OtpElementId::NvCounterNs(n) => {
                OtpElement::plain(image(&self.host_nv_counter, n), Unlocked)
            }
            OtpElementId::ReprovisioningBits => {
                OtpElement::plain(self.reprovisioning_bits, Unlocked)
            }
            OtpElementId::AttackTrackingBits => {
                OtpElement::plain(self.attack_tracking_bits, Unlocked)
            }

            OtpElementId::Lcs => OtpElement {
                kind: ElementKind::Lifecycle,
                ..OtpElement::plain(OtpField::new(0, 4), Lifecycle)
            },

            OtpElementId::Iak
            | OtpElementId::BootSeed
            | OtpElementId::CertRef
            | OtpElementId::Bl2ImageHash
            | OtpElementId::EntropySeed => OtpElement::unmapped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OtpConfig;

    #[test]
    fn test_raw_ids_round_trip() {
        for raw in 0..OTP_ELEMENT_ID_MAX {
            let id = OtpElementId::try_from(raw).unwrap();
            assert_eq!(id.raw(), Some(raw));
        }
        assert!(OtpElementId::try_from(OTP_ELEMENT_ID_MAX).is_err());
        assert!(OtpElementId::try_from(u32::MAX).is_err());
    }

    #[test]
    fn test_family_width() {
        assert_eq!(OtpElementId::Bl2Rotpk(8).raw(), Some(20));
        assert_eq!(OtpElementId::Bl2Rotpk(9).raw(), None);
        assert_eq!(OtpElementId::NvCounterNs(3).raw(), None);
        assert_eq!(OtpElementId::NvCounterPs(2).raw(), Some(46));
    }

    #[test]
    fn test_lcs_policy() {
        let layout = OtpLayout::new(&OtpConfig::default()).unwrap();

        let rotpk = layout.element(OtpElementId::Bl2Rotpk(0));
        assert_eq!(rotpk.region.writable_in(), LcsMask::DM);
        assert_eq!(rotpk.readable_in(), LcsMask::all());

        let huk = layout.element(OtpElementId::Huk);
        assert!(!huk.readable_in().contains(LcsMask::RMA));
        assert!(!huk.region.writable_in().contains(LcsMask::DM));

        let counter = layout.element(OtpElementId::NvCounterBl1);
        assert_eq!(counter.region.writable_in(), LcsMask::all());
        assert_eq!(LcsMask::from(LcmLcs::Invalid), LcsMask::empty());
    }

    #[test]
    fn test_unmapped_elements() {
        let layout = OtpLayout::new(&OtpConfig::default()).unwrap();
        for id in [
            OtpElementId::Iak,
            OtpElementId::BootSeed,
            OtpElementId::CertRef,
            OtpElementId::Bl2ImageHash,
            OtpElementId::EntropySeed,
            OtpElementId::RseToRseSenderRoutingTable,
        ] {
            assert!(!layout.element(id).field.is_mapped(), "{id:?}");
        }
        // HUK sits at the very start of the array
        assert!(!layout.element(OtpElementId::Huk).field.is_mapped());
    }

    #[test]
    fn test_encrypted_keys() {
        let layout = OtpLayout::new(&OtpConfig::default()).unwrap();
        let key = layout.element(OtpElementId::KeyBl2Encryption);
        assert_eq!(key.kind, ElementKind::Encrypted(KmuHwSlot::KceCm));
        assert_eq!(key.field.size, 32);
    }
}
