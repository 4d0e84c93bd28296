/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the OTP and life-cycle library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

pub mod accessor;
pub mod codec;
mod config;
mod element;
mod layout;
mod lifecycle;
mod map;
mod nv_counter;
mod provisioning;
mod tamper;

pub use codec::{Aes256CtrStore, FieldCodec, FieldStore, PlainStore, OTP_ENCRYPTED_FIELD_MAX_SIZE};
pub use config::{OtpConfig, HOST_NV_COUNTER_COUNT, MAX_IMAGE_NUMBER, PS_NV_COUNTER_COUNT};
pub use element::{
    ElementKind, ElementRegion, LcsMask, OtpElement, OtpElementId, OTP_ELEMENT_ID_MAX,
};
pub use layout::{
    LockedRegionSnapshot, MfgDataHeader, OtpField, OtpLayout, OTP_HW_HEADER_SIZE,
    OTP_LAYOUT_VERSION, OTP_NV_COUNTER_SIZE,
};
pub use lifecycle::PlatOtpLcs;
pub use map::{OtpContext, OtpState};
pub use nv_counter::{NvCounterId, NV_COUNTER_MAX_VALUE};
pub use provisioning::{CmProvisioningBundle, DmProvisioningBundle, DUMMY_KEY_VALUE};
