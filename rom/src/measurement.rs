/*++

Licensed under the Apache-2.0 license.

File Name:

    measurement.rs

Abstract:

    File contains the boot measurement BL1 records for the BL1_2 image.

--*/

use crate::platform::BootPlatform;
use crate::rom_env::Bl1Env;
use bl1_drivers::{cprintln, LcmDevice, Sha256Digest, SHA256_DIGEST_BYTE_SIZE};

/// Measurement log slot
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MeasurementSlot {
    Bl1_2,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MeasurementAlgorithm {
    Sha256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootMeasurementMetadata {
    pub measurement_type: MeasurementAlgorithm,
    pub signer_id: [u8; SHA256_DIGEST_BYTE_SIZE],
    pub signer_id_size: usize,
    pub sw_type: &'static str,
    pub sw_version: [u8; 14],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootMeasurement {
    pub slot: MeasurementSlot,
    pub digest: Sha256Digest,
    pub metadata: BootMeasurementMetadata,
    /// Slot may not be extended afterwards
    pub lock: bool,
}

impl BootMeasurement {
    /// Measurement of a validated BL1_2 image.
    ///
    /// The image is unsigned and carries no version, so the signer id and
    /// the version are zero.
    pub fn bl1_2(digest: &Sha256Digest) -> Self {
        Self {
            slot: MeasurementSlot::Bl1_2,
            digest: *digest,
            metadata: BootMeasurementMetadata {
                measurement_type: MeasurementAlgorithm::Sha256,
                signer_id: [0u8; SHA256_DIGEST_BYTE_SIZE],
                signer_id_size: SHA256_DIGEST_BYTE_SIZE,
                sw_type: "BL1_2",
                sw_version: [0u8; 14],
            },
            lock: true,
        }
    }
}

/// Store the BL1_2 measurement; a rejected record only warns
pub(crate) fn collect_boot_measurement<P: BootPlatform, L: LcmDevice>(
    env: &mut Bl1Env<P, L>,
    digest: &Sha256Digest,
) {
    let measurement = BootMeasurement::bl1_2(digest);
    if let Err(e) = env.platform.store_measurement(&measurement) {
        cprintln!(
            "[bl1] WARNING: Failed to store boot measurement of BL1_2 0x{:x}",
            u32::from(e)
        );
    }
}
