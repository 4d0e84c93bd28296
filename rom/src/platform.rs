/*++

Licensed under the Apache-2.0 license.

File Name:

    platform.rs

Abstract:

    File contains the platform hooks the BL1 flow is built on.

--*/

#[cfg(feature = "measured-boot")]
use crate::measurement::BootMeasurement;
use crate::flow::Stage2Handoff;
use bl1_drivers::LcmDevice;
use bl1_error::{Bl1Error, Bl1Result};
use bl1_otp::OtpContext;

/// Platform services used by BL1.
///
/// Every fallible hook reports success with `Ok`; any error is fatal except
/// for the recovery path of a failed validation.
pub trait BootPlatform {
    /// Early hardware setup, before the OTP is brought up
    fn init(&mut self) -> Bl1Result<()>;

    /// Setup that depends on a provisioned device
    fn post_init(&mut self) -> Bl1Result<()>;

    fn pre_load(&mut self, image_id: u32) -> Bl1Result<()>;

    fn post_load(&mut self, image_id: u32) -> Bl1Result<()>;

    /// Obtain a new image after a failed validation.
    ///
    /// Returning `Ok` makes BL1 copy and validate the image again.
    fn initiate_recovery_mode<L: LcmDevice>(
        &mut self,
        otp: &mut OtpContext<L>,
        image_id: u32,
    ) -> Bl1Result<()>;

    /// Seed for the CFI delay generator; must not be all zero
    fn entropy(&mut self) -> Bl1Result<[u32; 4]>;

    /// Run the manufacturing stage the device is in
    fn provision<L: LcmDevice>(&mut self, _otp: &mut OtpContext<L>) -> Bl1Result<()> {
        Err(Bl1Error::BL1_PROVISIONING_UNSUPPORTED)
    }

    /// Record a boot measurement in the measurement log
    #[cfg(feature = "measured-boot")]
    fn store_measurement(&mut self, measurement: &BootMeasurement) -> Bl1Result<()>;

    /// Jump to the validated image
    fn quit(&mut self, handoff: &Stage2Handoff) -> !;

    /// Stop the device for good
    fn halt(&mut self, error: Bl1Error) -> !;
}
