/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the entry point of the first BL1 stage. It seeds the CFI
    counter, runs the validation flow and either hands over to BL1_2 or
    halts.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod flow;
#[cfg(feature = "measured-boot")]
mod measurement;
mod platform;
mod rom_env;

pub use flow::{run, Stage2Handoff, BL1_2_IMAGE_ID};
#[cfg(feature = "measured-boot")]
pub use measurement::{
    BootMeasurement, BootMeasurementMetadata, MeasurementAlgorithm, MeasurementSlot,
};
pub use platform::BootPlatform;
pub use rom_env::Bl1Env;

use bl1_cfi_lib::CfiCounter;
use bl1_drivers::{cprintln, LcmDevice};
use bl1_error::Bl1Error;
use zeroize::Zeroize;

/// Boot into BL1_2.
///
/// Never returns: either the platform jumps to the validated image or the
/// device halts.
pub fn boot<P: BootPlatform, L: LcmDevice>(mut env: Bl1Env<'_, P, L>) -> ! {
    cprintln!("[bl1] Starting BL1_1");

    match env.platform.entropy() {
        Ok(entropy) => CfiCounter::reset(entropy),
        Err(e) => handle_fatal_error(&mut env, e),
    }

    match flow::run(&mut env) {
        Ok(handoff) => {
            cprintln!("[bl1] Jumping to BL1_2");
            env.platform.quit(&handoff)
        }
        Err(e) => handle_fatal_error(&mut env, e),
    }
}

fn handle_fatal_error<P: BootPlatform, L: LcmDevice>(env: &mut Bl1Env<'_, P, L>, e: Bl1Error) -> ! {
    cprintln!("[bl1] Fatal error 0x{:x}", u32::from(e));

    // Never leave an unvalidated image in execution memory
    env.code.zeroize();

    env.platform.halt(e)
}
