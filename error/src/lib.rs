/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the BL1 crates for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// BL1 Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Bl1Error(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: Bl1Error = Bl1Error::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl Bl1Error {
    /// Create a BL1 error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a Bl1Error from a u32 is to
    /// use `Bl1Error::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("Bl1Error cannot be 0"),
        }
    }

    /// Component identifier held in the upper half of the code
    pub const fn component(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }

    define_error_constants![
        (
            DRIVER_LCM_OTP_OUT_OF_BOUNDS,
            0x0001_0001,
            "LCM Error: OTP access outside of the fuse array"
        ),
        (
            DRIVER_LCM_OTP_WRITE_VERIFY_FAIL,
            0x0001_0002,
            "LCM Error: OTP write would clear a programmed bit"
        ),
        (
            DRIVER_LCM_INVALID_LCS_TRANSITION,
            0x0001_0003,
            "LCM Error: Requested life-cycle state is not the successor of the current one"
        ),
        (
            DRIVER_LCM_INVALID_LCS,
            0x0001_0004,
            "LCM Error: Life-cycle fuses do not decode to a valid state"
        ),
        (
            DRIVER_LCM_NOT_INITIALIZED,
            0x0001_0005,
            "LCM Error: Device used before init"
        ),
        (
            DRIVER_LCM_LCS_FUSE_WRITE_FORBIDDEN,
            0x0001_0006,
            "LCM Error: Life-cycle fuses may only be changed through a state transition"
        ),
        (
            DRIVER_INTEGRITY_CHECKER_INVALID_LENGTH,
            0x0002_0001,
            "Integrity Checker Error: Length is not a multiple of the word size"
        ),
        (
            DRIVER_KMU_SLOT_EMPTY,
            0x0003_0001,
            "KMU Error: Key slot holds no key"
        ),
        (
            DRIVER_KMU_SLOT_LOCKED,
            0x0003_0002,
            "KMU Error: Key slot is locked"
        ),
        (
            DRIVER_KMU_INVALID_SLOT,
            0x0003_0003,
            "KMU Error: Key slot does not exist"
        ),
        (
            DRIVER_SHA256_MAX_DATA,
            0x0004_0001,
            "SHA256 Error: Max data exceeded"
        ),
        (
            OTP_EMULATION_UNSUPPORTED,
            0x0006_0001,
            "OTP Emulation Error: Access falls outside of the emulated window"
        ),
        (
            OTP_EMULATION_INVALID_WINDOW,
            0x0006_0002,
            "OTP Emulation Error: Emulated window is larger than the backing buffer"
        ),
        (
            OTP_READ_UNSUPPORTED,
            0x0010_0001,
            "OTP Error: Read of an element that is not mapped on this configuration"
        ),
        (
            OTP_READ_ENCRYPTED_UNSUPPORTED,
            0x0010_0002,
            "OTP Error: Encrypted read of an element that is not mapped on this configuration"
        ),
        (
            OTP_READ_ENCRYPTED_INVALID_INPUT,
            0x0010_0003,
            "OTP Error: Encrypted read larger than the field scratch buffer"
        ),
        (
            OTP_WRITE_INVALID_INPUT,
            0x0010_0004,
            "OTP Error: Write larger than the field"
        ),
        (
            OTP_WRITE_UNSUPPORTED,
            0x0010_0005,
            "OTP Error: Write of an element that is not mapped on this configuration"
        ),
        (
            OTP_WRITE_ENCRYPTED_INVALID_INPUT,
            0x0010_0006,
            "OTP Error: Encrypted write larger than the field scratch buffer"
        ),
        (
            OTP_READ_LCS_INVALID_INPUT,
            0x0010_0007,
            "OTP Error: Life-cycle read buffer is not one word"
        ),
        (
            OTP_WRITE_LCS_INVALID_INPUT,
            0x0010_0008,
            "OTP Error: Life-cycle write buffer is not one word"
        ),
        (
            OTP_WRITE_LCS_SYSTEM_ERR,
            0x0010_0009,
            "OTP Error: Life-cycle transition is not permitted"
        ),
        (
            OTP_INIT_SYSTEM_ERR,
            0x0010_000A,
            "OTP Error: Fuse array does not fit the layout"
        ),
        (
            OTP_INIT_NOT_PERMITTED,
            0x0010_000B,
            "OTP Error: All attack tracking bits are consumed"
        ),
        (
            OTP_INIT_CM_SIZE_ZERO_COUNT_MISMATCH,
            0x0010_000C,
            "OTP Error: CM locked region size does not match its zero count"
        ),
        (
            OTP_INIT_CM_ZERO_COUNT_MISMATCH,
            0x0010_000D,
            "OTP Error: CM locked region contents do not match its zero count"
        ),
        (
            OTP_INIT_DM_SIZE_ZERO_COUNT_MISMATCH,
            0x0010_000E,
            "OTP Error: DM locked region size does not match its zero count"
        ),
        (
            OTP_INIT_DM_ZERO_COUNT_MISMATCH,
            0x0010_000F,
            "OTP Error: DM locked region contents do not match its zero count"
        ),
        (
            OTP_INIT_MFG_DATA_ZERO_COUNT_MISMATCH,
            0x0010_0010,
            "OTP Error: Manufacturing data does not match its zero count"
        ),
        (
            OTP_NOT_INITIALIZED,
            0x0010_0011,
            "OTP Error: Element access before a successful init"
        ),
        (
            OTP_READ_NOT_PERMITTED,
            0x0010_0012,
            "OTP Error: Element is not readable in the current life-cycle state"
        ),
        (
            OTP_WRITE_NOT_PERMITTED,
            0x0010_0013,
            "OTP Error: Element is not writable in the current life-cycle state"
        ),
        (
            PLAT_OTP_READ_INVALID_INPUT,
            0x0010_0014,
            "OTP Error: Read of an unknown element"
        ),
        (
            PLAT_OTP_READ_UNSUPPORTED,
            0x0010_0015,
            "OTP Error: Read of an element beyond the configured image count"
        ),
        (
            PLAT_OTP_WRITE_INVALID_INPUT,
            0x0010_0016,
            "OTP Error: Write of an unknown element"
        ),
        (
            PLAT_OTP_WRITE_UNSUPPORTED,
            0x0010_0017,
            "OTP Error: Write of an element beyond the configured image count"
        ),
        (
            PLAT_OTP_GET_SIZE_INVALID_INPUT,
            0x0010_0018,
            "OTP Error: Size query of an unknown element"
        ),
        (
            PLAT_OTP_GET_SIZE_UNSUPPORTED,
            0x0010_0019,
            "OTP Error: Size query of an element beyond the configured image count"
        ),
        (
            PLAT_OTP_READ_MFG_DATA_UNSUPPORTED,
            0x0010_001A,
            "OTP Error: Manufacturing data is not present on this configuration"
        ),
        (
            OTP_LAYOUT_INVALID_CONFIG,
            0x0010_001B,
            "OTP Error: Layout configuration parameter out of range"
        ),
        (
            OTP_LAYOUT_OVERFLOW,
            0x0010_001C,
            "OTP Error: Layout does not fit in the fuse array"
        ),
        (
            OTP_LCS_SNAPSHOT_VERIFY_FAIL,
            0x0010_001D,
            "OTP Error: Region snapshot did not verify before the life-cycle transition"
        ),
        (
            OTP_ATTACK_TRACKING_BITS_EXHAUSTED,
            0x0010_001E,
            "OTP Error: No attack tracking bit left to consume"
        ),
        (
            OTP_INVALID_REGION_SIZE,
            0x0010_001F,
            "OTP Error: Recorded locked region size is out of range"
        ),
        (
            OTP_BL1_2_IMAGE_INVALID_LEN,
            0x0010_0020,
            "OTP Error: BL1_2 image length is out of range"
        ),
        (
            NV_COUNTER_UNSUPPORTED,
            0x0011_0001,
            "NV Counter Error: Counter is not present on this configuration"
        ),
        (
            NV_COUNTER_MAX_VALUE,
            0x0011_0002,
            "NV Counter Error: Counter is at its maximum value"
        ),
        (
            NV_COUNTER_ROLLBACK,
            0x0011_0003,
            "NV Counter Error: Counter value may not decrease"
        ),
        (
            NV_COUNTER_CORRUPT,
            0x0011_0004,
            "NV Counter Error: Counter bits are not contiguous"
        ),
        (
            PROVISIONING_INVALID_LCS,
            0x0012_0001,
            "Provisioning Error: Bundle does not match the current life-cycle state"
        ),
        (
            PROVISIONING_INVALID_BUNDLE,
            0x0012_0002,
            "Provisioning Error: Bundle field does not fit its element"
        ),
        (
            BL1_INVALID_CODE_REGION,
            0x0020_0001,
            "BL1 Error: Code region does not match the BL1_2 code size"
        ),
        (
            BL1_RECOVERY_FAILED,
            0x0020_0002,
            "BL1 Error: Recovery mode did not complete"
        ),
        (
            BL1_IMAGE_HASH_MISMATCH,
            0x0020_0003,
            "BL1 Error: BL1_2 image does not match the reference hash"
        ),
        (
            BL1_PROVISIONING_UNSUPPORTED,
            0x0020_0004,
            "BL1 Error: Platform cannot provision this device"
        ),
        (
            BL1_MEASUREMENT_STORE_FAILED,
            0x0020_0005,
            "BL1 Error: Measurement log rejected the record"
        ),
        (
            CFI_PANIC_COUNTER_CORRUPT,
            0x0030_0001,
            "CFI Panic: Counter decode error"
        ),
        (
            CFI_PANIC_COUNTER_OVERFLOW,
            0x0030_0002,
            "CFI Panic: Counter overflow"
        ),
        (
            CFI_PANIC_COUNTER_UNDERFLOW,
            0x0030_0003,
            "CFI Panic: Counter underflow"
        ),
        (
            CFI_PANIC_COUNTER_MISMATCH,
            0x0030_0004,
            "CFI Panic: Counter mismatch"
        ),
        (
            CFI_PANIC_ASSERT_EQ_FAILURE,
            0x0030_0005,
            "CFI Panic: Assert equal failure"
        ),
        (
            CFI_PANIC_ASSERT_NE_FAILURE,
            0x0030_0006,
            "CFI Panic: Assert not equal failure"
        ),
        (
            CFI_PANIC_ASSERT_GT_FAILURE,
            0x0030_0007,
            "CFI Panic: Assert greater than failure"
        ),
        (
            CFI_PANIC_ASSERT_LT_FAILURE,
            0x0030_0008,
            "CFI Panic: Assert less than failure"
        ),
        (
            CFI_PANIC_ASSERT_GE_FAILURE,
            0x0030_0009,
            "CFI Panic: Assert greater than or equal failure"
        ),
        (
            CFI_PANIC_ASSERT_LE_FAILURE,
            0x0030_000A,
            "CFI Panic: Assert less than or equal failure"
        ),
        (
            CFI_PANIC_FIH_CORRUPT,
            0x0030_000B,
            "CFI Panic: Hardened result failed its integrity check"
        ),
        (
            CFI_PANIC_UNEXPECTED_MATCH_BRANCH,
            0x0030_000C,
            "CFI Panic: Unexpected match branch"
        ),
        (
            CFI_PANIC_ENTROPY_FAILURE,
            0x0030_000D,
            "CFI Panic: Entropy seed is unusable"
        ),
        (CFI_PANIC_UNKNOWN, 0x0030_000E, "CFI Panic: Unknown error"),
    ];
}

impl From<core::num::NonZeroU32> for crate::Bl1Error {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::Bl1Error(val)
    }
}

impl From<Bl1Error> for core::num::NonZeroU32 {
    fn from(val: Bl1Error) -> Self {
        val.0
    }
}

impl From<Bl1Error> for u32 {
    fn from(val: Bl1Error) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for Bl1Error {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(Bl1Error(val)),
            Err(err) => Err(err),
        }
    }
}

pub type Bl1Result<T> = Result<T, Bl1Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_try_from() {
        assert!(Bl1Error::try_from(0).is_err());
        assert_eq!(
            Ok(Bl1Error::OTP_READ_UNSUPPORTED),
            Bl1Error::try_from(0x0010_0001)
        );
    }

    #[test]
    fn test_component() {
        assert_eq!(Bl1Error::DRIVER_LCM_INVALID_LCS.component(), 0x0001);
        assert_eq!(Bl1Error::OTP_INIT_NOT_PERMITTED.component(), 0x0010);
        assert_eq!(Bl1Error::CFI_PANIC_UNKNOWN.component(), 0x0030);
    }

    #[test]
    fn test_error_constants_uniqueness() {
        let constants = Bl1Error::all_constants();
        let mut error_values = HashSet::new();
        let mut duplicates = Vec::new();

        for (name, value) in constants {
            if !error_values.insert(value) {
                duplicates.push((name, value));
            }
        }

        assert!(
            duplicates.is_empty(),
            "Found duplicate error codes: {:?}",
            duplicates
        );
    }
}
