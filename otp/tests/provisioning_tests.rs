// Licensed under the Apache-2.0 license

mod common;

use bl1_drivers::{LcmDevice, TpMode};
use bl1_error::Bl1Error;
use bl1_otp::{
    CmProvisioningBundle, DmProvisioningBundle, OtpConfig, OtpElementId, OtpLayout, PlatOtpLcs,
    DUMMY_KEY_VALUE,
};
use common::*;

const BL2_ROTPKS: [&[u8]; 2] = [&[0x21; 32], &[0x22; 32]];

fn dm_bundle() -> DmProvisioningBundle<'static> {
    DmProvisioningBundle {
        bl1_rotpk_0: &[0x11; 56],
        bl2_rotpk: &BL2_ROTPKS,
        iak_len: 48,
        iak_type: 0x12,
        iak_id: b"iak-0",
        implementation_id: &[0x33; 32],
        verification_service_url: b"https://veraison.example",
        profile_definition: b"tag:psacertified.org,2023:psa#tfm",
        secure_debug_pk: &[0x44; 32],
        host_rotpk_s: &[0x55; 96],
        host_rotpk_ns: &[0x56; 96],
        host_rotpk_cca: &[0x57; 96],
        dm_config_flags: 0x0000_0003,
        rse_id: 7,
        bl2_encryption_key: Some(&[0x61; 32]),
        s_image_encryption_key: Some(&[0x62; 32]),
        ns_image_encryption_key: None,
    }
}

#[test]
fn test_full_provisioning_flow() {
    let mut ctx = context(OtpConfig::default());
    assert_eq!(ctx.is_provisioning_required(), Ok(true));

    ctx.provision_cm(&cm_bundle()).unwrap();
    assert_eq!(ctx.current_state(), Ok(PlatOtpLcs::PsaRotProvisioning));
    assert_eq!(ctx.is_provisioning_required(), Ok(true));

    let (mut ctx, result) = reboot(ctx);
    assert_eq!(result, Ok(()));
    let mut image = [0u8; 0x40];
    ctx.read(OtpElementId::Bl1Stage2Image, &mut image).unwrap();
    assert_eq!(image, BL1_2_IMAGE);
    let mut hash = [0u8; 32];
    ctx.read(OtpElementId::Bl1Stage2ImageHash, &mut hash)
        .unwrap();
    assert_eq!(hash, [0xd1; 32]);

    ctx.provision_dm(&dm_bundle()).unwrap();
    assert_eq!(ctx.current_state(), Ok(PlatOtpLcs::Secured));
    assert_eq!(ctx.is_provisioning_required(), Ok(false));

    let (ctx, result) = reboot(ctx);
    assert_eq!(result, Ok(()));

    let mut rotpk = [0u8; 32];
    ctx.read(OtpElementId::Bl2Rotpk(1), &mut rotpk).unwrap();
    assert_eq!(rotpk, [0x22; 32]);
    let mut key = [0u8; 32];
    ctx.read(OtpElementId::KeySecureEncryption, &mut key)
        .unwrap();
    assert_eq!(key, [0x62; 32]);
    let mut word = [0u8; 4];
    ctx.read(OtpElementId::RseId, &mut word).unwrap();
    assert_eq!(u32::from_le_bytes(word), 7);
    let mut mfg = [0u8; 16];
    ctx.read(OtpElementId::ManufacturingData, &mut mfg).unwrap();
    assert_eq!(mfg, MFG_DATA);

    assert_eq!(ctx.check_for_dummy_keys(), Ok(false));
}

#[test]
fn test_bundle_in_wrong_state() {
    let mut ctx = context(OtpConfig::default());
    assert_eq!(
        ctx.provision_dm(&dm_bundle()),
        Err(Bl1Error::PROVISIONING_INVALID_LCS)
    );

    ctx.provision_cm(&cm_bundle()).unwrap();
    assert_eq!(
        ctx.provision_cm(&cm_bundle()),
        Err(Bl1Error::PROVISIONING_INVALID_LCS)
    );
}

#[test]
fn test_invalid_bundles() {
    let mut ctx = context(OtpConfig {
        has_manufacturing_data: false,
        ..Default::default()
    });
    assert_eq!(
        ctx.provision_cm(&cm_bundle()),
        Err(Bl1Error::PROVISIONING_INVALID_BUNDLE)
    );

    let image = vec![0u8; 0x2001];
    let bundle = CmProvisioningBundle {
        manufacturing_data: None,
        bl1_2_image: &image,
        ..cm_bundle()
    };
    assert_eq!(
        ctx.provision_cm(&bundle),
        Err(Bl1Error::PROVISIONING_INVALID_BUNDLE)
    );

    let mut ctx = context(OtpConfig::default());
    ctx.provision_cm(&cm_bundle()).unwrap();
    let rotpk: &[u8] = &[1; 32];
    let rotpks = [rotpk; 5];
    let bundle = DmProvisioningBundle {
        bl2_rotpk: &rotpks,
        ..dm_bundle()
    };
    assert_eq!(
        ctx.provision_dm(&bundle),
        Err(Bl1Error::PROVISIONING_INVALID_BUNDLE)
    );

    let bundle = DmProvisioningBundle {
        bl1_rotpk_0: &[0x11; 57],
        ..dm_bundle()
    };
    assert_eq!(
        ctx.provision_dm(&bundle),
        Err(Bl1Error::PROVISIONING_INVALID_BUNDLE)
    );
    assert_eq!(ctx.current_state(), Ok(PlatOtpLcs::PsaRotProvisioning));
}

#[test]
fn test_dummy_keys() {
    let mut ctx = context(OtpConfig::default());
    ctx.provision_cm(&cm_bundle()).unwrap();
    assert_eq!(ctx.check_for_dummy_keys(), Ok(false));

    let bundle = DmProvisioningBundle {
        bl2_encryption_key: Some(&DUMMY_KEY_VALUE),
        ..dm_bundle()
    };
    ctx.provision_dm(&bundle).unwrap();
    assert_eq!(ctx.check_for_dummy_keys(), Ok(true));

    // Keys are hidden once decommissioned
    ctx.request_transition(PlatOtpLcs::Decommissioned).unwrap();
    assert_eq!(ctx.check_for_dummy_keys(), Ok(false));
}

#[test]
fn test_secure_provisioning_start() {
    let mut ctx = context(OtpConfig::default());
    assert!(!ctx.lcm().sp_enabled());
    ctx.secure_provisioning_start().unwrap();
    assert!(ctx.lcm().sp_enabled());

    ctx.secure_provisioning_start().unwrap();
    let field = OtpLayout::CM_CONFIG_2;
    assert_eq!(&ctx.lcm().fuses()[field.offset..field.end()], &[0u8; 4]);
}

#[test]
fn test_secure_provisioning_start_lcm_v0() {
    let mut ctx = context_on(
        OtpConfig {
            lcm_version: 0,
            ..Default::default()
        },
        new_lcm(TpMode::Pci),
    );
    ctx.secure_provisioning_start().unwrap();
    ctx.secure_provisioning_start().unwrap();

    let field = OtpLayout::CM_CONFIG_2;
    assert_eq!(
        &ctx.lcm().fuses()[field.offset..field.end()],
        &0x0800u32.to_le_bytes()
    );
}
