/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the BL1 driver library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod aes;
mod integrity_checker;
mod kmu;
mod lcm;
mod otp_emulation;
pub mod printer;
mod sha256;

pub use aes::{Aes256Ctr, AES_256_IV_SIZE};
pub use bl1_error::{Bl1Error, Bl1Result};
pub use integrity_checker::{IntegrityChecker, IntegrityCheckerMode, ZeroCountAccumulator};
pub use kmu::{Kmu, KmuHwSlot, KmuSlot};
pub use lcm::{EmulatedLcm, LcmDevice, LcmLcs, TpMode};
pub use otp_emulation::OtpEmulationShim;
pub use sha256::{Sha256, Sha256Alg, Sha256Digest, SHA256_DIGEST_BYTE_SIZE};

cfg_if::cfg_if! {
    if #[cfg(feature = "emu")] {
        mod uart;

        pub use uart::Uart;
    }
}
