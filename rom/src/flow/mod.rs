/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains the BL1 flow: platform bring-up, provisioning, and the
    copy and validate loop for the BL1_2 image with its recovery path.

--*/

mod validate;

use crate::platform::BootPlatform;
use crate::rom_env::Bl1Env;
#[cfg(not(feature = "no-cfi"))]
use bl1_cfi_derive::cfi_mod_fn;
use bl1_cfi_lib::{cfi_panic, fih_eq, fih_not_eq, CfiPanicInfo, FihInt};
use bl1_drivers::{cprint_slice, cprintln, LcmDevice, Sha256Digest};
use bl1_error::{Bl1Error, Bl1Result};
use bl1_otp::OtpElementId;

/// Image identifier passed to the platform load hooks
pub const BL1_2_IMAGE_ID: u32 = 0;

/// What BL1 hands over to the platform when jumping to BL1_2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage2Handoff {
    /// Start of the execution memory holding the validated image
    pub entry: usize,
    /// Digest the image was validated against
    pub digest: Sha256Digest,
    /// Successful recovery cycles before the image validated
    pub recovery_attempts: u32,
}

/// Forward `result` only if its hardened encoding agrees with it
fn fih_check<T>(result: Bl1Result<T>) -> Bl1Result<T> {
    let fih_rc = FihInt::from_result(&result);
    match result {
        Ok(val) => {
            if fih_not_eq(fih_rc, FihInt::SUCCESS) {
                cfi_panic(CfiPanicInfo::FihCorrupt);
            }
            Ok(val)
        }
        Err(e) => {
            if fih_eq(fih_rc, FihInt::SUCCESS) {
                cfi_panic(CfiPanicInfo::FihCorrupt);
            }
            Err(e)
        }
    }
}

/// Execute the BL1 flow up to the point of jumping to BL1_2
///
/// # Arguments
///
/// * `env` - BL1 Environment
#[cfg_attr(not(feature = "no-cfi"), cfi_mod_fn)]
pub fn run<P: BootPlatform, L: LcmDevice>(env: &mut Bl1Env<P, L>) -> Bl1Result<Stage2Handoff> {
    fih_check(env.platform.init())?;
    fih_check(env.otp.init())?;

    if env.otp.is_provisioning_required()? {
        cprintln!("[bl1] Device requires provisioning");
        if let Err(e) = fih_check(env.platform.provision(&mut env.otp)) {
            cprintln!("[bl1] BL1 provisioning failed");
            return Err(e);
        }
    }

    // Dummy keys are reported, never fatal
    if let Err(e) = env.otp.check_for_dummy_keys() {
        cprintln!("[bl1] Dummy key check failed 0x{:x}", u32::from(e));
    }

    fih_check(env.platform.post_init())?;
    fih_check(env.platform.pre_load(BL1_2_IMAGE_ID))?;

    let mut recovery_attempts = 0u32;
    let digest = loop {
        copy_image(env)?;

        let (fih_rc, digest) = validate::validate_image(env);
        if fih_eq(fih_rc, FihInt::SUCCESS) {
            break digest;
        }

        cprintln!("[bl1] BL1_2 image failed to validate");
        let recovered =
            FihInt::from_result(&env.platform.initiate_recovery_mode(&mut env.otp, BL1_2_IMAGE_ID));
        if fih_not_eq(recovered, FihInt::SUCCESS) {
            return Err(Bl1Error::BL1_RECOVERY_FAILED);
        }
        recovery_attempts += 1;
    };
    cprint_slice!("[bl1] BL1_2 digest", &digest[..]);

    fih_check(env.platform.post_load(BL1_2_IMAGE_ID))?;

    #[cfg(feature = "measured-boot")]
    crate::measurement::collect_boot_measurement(env, &digest);

    Ok(Stage2Handoff {
        entry: env.code.as_ptr() as usize,
        digest,
        recovery_attempts,
    })
}

/// Copy the BL1_2 image from OTP into execution memory.
///
/// The part of the code region beyond the image is cleared so the hash
/// window never includes a previous attempt.
fn copy_image<P: BootPlatform, L: LcmDevice>(env: &mut Bl1Env<P, L>) -> Bl1Result<()> {
    env.code.fill(0);
    fih_check(env.otp.read(OtpElementId::Bl1Stage2Image, &mut env.code[..]))
}
