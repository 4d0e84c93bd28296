/*++

Licensed under the Apache-2.0 license.

File Name:

    rom_env.rs

Abstract:

    File implements a context holding all the services utilized by BL1.

--*/

use crate::platform::BootPlatform;
use bl1_drivers::{LcmDevice, Sha256};
use bl1_error::{Bl1Error, Bl1Result};
use bl1_otp::OtpContext;

/// BL1 context
pub struct Bl1Env<'a, P: BootPlatform, L: LcmDevice> {
    /// Platform hooks
    pub platform: P,

    /// OTP and life-cycle
    pub otp: OtpContext<L>,

    // SHA2-256 Engine
    pub sha256: Sha256,

    /// Execution memory the BL1_2 image is copied into
    pub code: &'a mut [u8],
}

impl<'a, P: BootPlatform, L: LcmDevice> Bl1Env<'a, P, L> {
    /// Create the context.
    ///
    /// `code` must span exactly the BL1_2 code size of the OTP configuration,
    /// the window the image hash is computed over.
    pub fn new(platform: P, otp: OtpContext<L>, code: &'a mut [u8]) -> Bl1Result<Self> {
        if code.len() != otp.config().bl1_2_code_size {
            return Err(Bl1Error::BL1_INVALID_CODE_REGION);
        }
        Ok(Self {
            platform,
            otp,
            sha256: Sha256::new(),
            code,
        })
    }
}
