// Licensed under the Apache-2.0 license

#![allow(dead_code)]

use bl1_drivers::{EmulatedLcm, Kmu, KmuHwSlot, LcmDevice, TpMode};
use bl1_error::Bl1Result;
use bl1_otp::{CmProvisioningBundle, OtpConfig, OtpContext, OtpLayout};

pub const OTP_SIZE: usize = 0x4000;

pub type TestLcm = EmulatedLcm<OTP_SIZE>;

pub const KCE_CM: [u8; 32] = [0x5c; 32];
pub const KCE_DM: [u8; 32] = [0xa3; 32];

pub fn new_lcm(tp_mode: TpMode) -> TestLcm {
    EmulatedLcm::new(OtpLayout::LCS_FUSES.offset, tp_mode)
}

pub fn new_kmu() -> Kmu {
    let mut kmu = Kmu::new();
    kmu.set_key(KmuHwSlot::KceCm, &KCE_CM).unwrap();
    kmu.set_key(KmuHwSlot::KceDm, &KCE_DM).unwrap();
    kmu
}

/// Initialized context on a blank production part
pub fn context(config: OtpConfig) -> OtpContext<TestLcm> {
    context_on(config, new_lcm(TpMode::Pci))
}

pub fn context_on<L: LcmDevice>(config: OtpConfig, lcm: L) -> OtpContext<L> {
    let mut ctx = OtpContext::new(config, lcm, new_kmu()).unwrap();
    ctx.init().unwrap();
    ctx
}

/// Simulate a power cycle: a fresh context over the same fuses
pub fn reboot<L: LcmDevice>(ctx: OtpContext<L>) -> (OtpContext<L>, Bl1Result<()>) {
    let config = *ctx.config();
    let (lcm, kmu) = ctx.into_parts();
    let mut ctx = OtpContext::new(config, lcm, kmu).unwrap();
    let result = ctx.init();
    (ctx, result)
}

pub const BL1_2_IMAGE: [u8; 0x40] = {
    let mut image = [0u8; 0x40];
    let mut i = 0;
    while i < image.len() {
        image[i] = (i as u8).wrapping_mul(7).wrapping_add(1);
        i += 1;
    }
    image
};

pub const MFG_DATA: [u8; 16] = [
    0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x0f, 0x1e, 0x2d, 0x3c, 0x4b, 0x5a, 0x69, 0x78,
];

pub fn cm_bundle() -> CmProvisioningBundle<'static> {
    CmProvisioningBundle {
        guk: Some(&[0x47; 32]),
        manufacturing_data: Some(&MFG_DATA),
        bl1_2_image: &BL1_2_IMAGE,
        bl1_2_image_hash: [0xd1; 32],
        cca_system_properties: 0x0000_0101,
        cm_config_flags: 0x8000_0001,
        dma_ics: &[0xaa, 0x55, 0xaa, 0x55],
    }
}
