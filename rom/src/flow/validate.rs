/*++

Licensed under the Apache-2.0 license.

File Name:

    validate.rs

Abstract:

    File contains the validation of the BL1_2 image against the reference
    hash held in OTP.

--*/

use crate::platform::BootPlatform;
use crate::rom_env::Bl1Env;
#[cfg(not(feature = "no-cfi"))]
use bl1_cfi_derive::cfi_mod_fn;
use bl1_cfi_lib::{cfi_assert_eq_32_bytes, fih_memeql, fih_not_eq, FihInt};
use bl1_drivers::{LcmDevice, Sha256Alg, Sha256Digest, SHA256_DIGEST_BYTE_SIZE};
use bl1_otp::OtpElementId;

/// Hash the code region and compare it with the stored reference.
///
/// Returns `FihInt::SUCCESS` together with the computed digest only when the
/// hash was computed, the reference was read and both match.
#[cfg_attr(not(feature = "no-cfi"), cfi_mod_fn)]
pub(crate) fn validate_image<P: BootPlatform, L: LcmDevice>(
    env: &mut Bl1Env<P, L>,
) -> (FihInt, Sha256Digest) {
    let mut computed = [0u8; SHA256_DIGEST_BYTE_SIZE];

    let result = env.sha256.digest(&env.code[..]);
    let fih_rc = FihInt::from_result(&result);
    if fih_not_eq(fih_rc, FihInt::SUCCESS) {
        return (fih_rc, computed);
    }
    if let Ok(digest) = result {
        computed = digest;
    }

    let mut stored = [0u8; SHA256_DIGEST_BYTE_SIZE];
    let result = env.otp.read(OtpElementId::Bl1Stage2ImageHash, &mut stored);
    let fih_rc = FihInt::from_result(&result);
    if fih_not_eq(fih_rc, FihInt::SUCCESS) {
        return (fih_rc, computed);
    }

    let fih_rc = fih_memeql(&computed, &stored);
    if fih_not_eq(fih_rc, FihInt::SUCCESS) {
        return (fih_rc, computed);
    }
    cfi_assert_eq_32_bytes(&computed, &stored);

    (FihInt::SUCCESS, computed)
}
