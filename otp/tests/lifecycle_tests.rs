// Licensed under the Apache-2.0 license

mod common;

use bl1_cfi_lib::CfiCounter;
use bl1_drivers::TpMode;
use bl1_error::Bl1Error;
use bl1_otp::{OtpConfig, OtpContext, OtpElementId, OtpState, PlatOtpLcs};
use common::*;

#[test]
fn test_forward_chain() {
    let mut ctx = context(OtpConfig::default());
    assert_eq!(ctx.current_state(), Ok(PlatOtpLcs::AssemblyAndTest));

    for next in [
        PlatOtpLcs::PsaRotProvisioning,
        PlatOtpLcs::Secured,
        PlatOtpLcs::Decommissioned,
    ] {
        ctx.request_transition(next).unwrap();
        assert_eq!(ctx.current_state(), Ok(next));

        let (rebooted, result) = reboot(ctx);
        assert_eq!(result, Ok(()));
        assert_eq!(rebooted.current_state(), Ok(next));
        ctx = rebooted;
    }
}

#[test]
fn test_transition_is_monotonic() {
    let mut ctx = context(OtpConfig::default());
    for target in [
        PlatOtpLcs::AssemblyAndTest,
        PlatOtpLcs::Secured,
        PlatOtpLcs::Decommissioned,
        PlatOtpLcs::Unknown,
    ] {
        assert_eq!(
            ctx.request_transition(target),
            Err(Bl1Error::OTP_WRITE_LCS_SYSTEM_ERR)
        );
    }

    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();
    for target in [PlatOtpLcs::PsaRotProvisioning, PlatOtpLcs::Decommissioned] {
        assert_eq!(
            ctx.request_transition(target),
            Err(Bl1Error::OTP_WRITE_LCS_SYSTEM_ERR)
        );
    }

    ctx.request_transition(PlatOtpLcs::Secured).unwrap();
    for target in [PlatOtpLcs::AssemblyAndTest, PlatOtpLcs::PsaRotProvisioning] {
        assert_eq!(
            ctx.request_transition(target),
            Err(Bl1Error::OTP_WRITE_LCS_SYSTEM_ERR)
        );
    }

    ctx.request_transition(PlatOtpLcs::Decommissioned).unwrap();
    assert_eq!(
        ctx.request_transition(PlatOtpLcs::Decommissioned),
        Err(Bl1Error::OTP_WRITE_LCS_SYSTEM_ERR)
    );
    assert_eq!(ctx.current_state(), Ok(PlatOtpLcs::Decommissioned));
}

#[test]
fn test_transition_requires_init() {
    let mut ctx = OtpContext::new(OtpConfig::default(), new_lcm(TpMode::Pci), new_kmu()).unwrap();
    assert_eq!(
        ctx.request_transition(PlatOtpLcs::PsaRotProvisioning),
        Err(Bl1Error::OTP_NOT_INITIALIZED)
    );
}

#[test]
fn test_snapshot_recorded() {
    let mut ctx = context(OtpConfig::default());
    ctx.write(OtpElementId::CmConfigFlags, &[0x0f, 0, 0, 0])
        .unwrap();
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();

    let layout = *ctx.layout();
    let fuses = ctx.lcm().fuses();
    let snapshot = &fuses[layout.cm_snapshot.offset..layout.cm_snapshot.end()];
    let size = u64::from_le_bytes(snapshot[..8].try_into().unwrap());
    let zero_count = u32::from_le_bytes(snapshot[12..16].try_into().unwrap());
    assert_eq!(size, layout.cm_locked.size as u64);
    // Four bits of the region are set
    assert_eq!(zero_count, (layout.cm_locked.size * 8 - 4) as u32);

    // The DM region is not snapshotted until SE
    let dm = &fuses[layout.dm_snapshot.offset..layout.dm_snapshot.end()];
    assert_eq!(dm, &[0u8; 16]);
}

#[test]
fn test_tamper_cm_region() {
    let mut ctx = context(OtpConfig::default());
    ctx.write(OtpElementId::CmConfigFlags, &[0x01, 0, 0, 0])
        .unwrap();
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();

    let offset = ctx.layout().cca_system_properties.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] |= 0x10;

    let (ctx, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH));
    assert_eq!(
        ctx.state(),
        OtpState::Failed(Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH)
    );
    // Fail closed
    assert_eq!(
        ctx.read(OtpElementId::CmConfigFlags, &mut [0u8; 4]),
        Err(Bl1Error::OTP_NOT_INITIALIZED)
    );
}

#[test]
fn test_failed_init_is_sticky() {
    let mut ctx = context(OtpConfig::default());
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();
    let offset = ctx.layout().cm_config_flags.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] |= 0x02;

    let (mut ctx, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH));

    // Even with the fuses restored a second init does not clear the failure
    ctx.lcm_mut().raw_fuses_mut()[offset] &= !0x02;
    assert_eq!(ctx.init(), Err(Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH));
    assert_eq!(
        ctx.state(),
        OtpState::Failed(Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH)
    );
    assert_eq!(
        ctx.read(OtpElementId::CmConfigFlags, &mut [0u8; 4]),
        Err(Bl1Error::OTP_NOT_INITIALIZED)
    );
}

#[test]
fn test_reinit_repeats_checks() {
    let mut ctx = context(OtpConfig::default());
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();
    assert_eq!(ctx.init(), Ok(()));

    let offset = ctx.layout().cca_system_properties.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] |= 0x04;
    assert_eq!(ctx.init(), Err(Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH));
}

#[test]
#[should_panic(expected = "CFI Panic = CounterCorrupt")]
fn test_transition_detects_corrupt_cfi_counter() {
    let mut ctx = context(OtpConfig::default());
    CfiCounter::corrupt();
    let _ = ctx.request_transition(PlatOtpLcs::PsaRotProvisioning);
}

#[test]
fn test_decayed_bit_detected() {
    let mut ctx = context(OtpConfig::default());
    ctx.write(OtpElementId::CmConfigFlags, &[0x01, 0, 0, 0])
        .unwrap();
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();

    let offset = ctx.layout().cm_config_flags.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] &= !0x01;

    let (_, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_CM_ZERO_COUNT_MISMATCH));
}

#[test]
fn test_tamper_size_field() {
    let mut ctx = context(OtpConfig::default());
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();

    let offset = ctx.layout().cm_snapshot.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] |= 0x20;

    let (_, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_CM_SIZE_ZERO_COUNT_MISMATCH));
}

#[test]
fn test_tamper_dm_region() {
    let mut ctx = context(OtpConfig::default());
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();
    ctx.write(OtpElementId::Bl1Rotpk0, &[0x81; 56]).unwrap();
    ctx.request_transition(PlatOtpLcs::Secured).unwrap();
    ctx.request_transition(PlatOtpLcs::Decommissioned).unwrap();

    let (mut ctx, result) = reboot(ctx);
    assert_eq!(result, Ok(()));

    let offset = ctx.layout().bl1_rotpk_0.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset + 3] |= 0x02;

    let (_, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_DM_ZERO_COUNT_MISMATCH));
}

#[test]
fn test_unlocked_region_not_checked() {
    let mut ctx = context(OtpConfig::default());
    // Still in CM, nothing is locked yet
    let offset = ctx.layout().cca_system_properties.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] |= 0x10;
    let (mut ctx, result) = reboot(ctx);
    assert_eq!(result, Ok(()));

    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();
    let offset = ctx.layout().bl1_rotpk_0.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] |= 0x10;
    let offset = ctx.layout().bl1_nv_counter.offset;
    ctx.lcm_mut().raw_fuses_mut()[offset] |= 0x01;
    let (_, result) = reboot(ctx);
    assert_eq!(result, Ok(()));
}

#[test]
fn test_attack_tracking_bits() {
    let mut ctx = context(OtpConfig::default());
    assert_eq!(ctx.attack_tracking_bits_left(), Ok(128));

    ctx.consume_attack_tracking_bit().unwrap();
    assert_eq!(ctx.attack_tracking_bits_left(), Ok(127));
    let offset = ctx.layout().attack_tracking_bits.offset;
    assert_eq!(ctx.lcm().fuses()[offset], 0x01);

    for _ in 0..127 {
        ctx.consume_attack_tracking_bit().unwrap();
    }
    assert_eq!(ctx.attack_tracking_bits_left(), Ok(0));
    assert_eq!(
        ctx.consume_attack_tracking_bit(),
        Err(Bl1Error::OTP_ATTACK_TRACKING_BITS_EXHAUSTED)
    );

    let (_, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_NOT_PERMITTED));
}

#[test]
fn test_attack_tracking_exhaustion_takes_precedence() {
    let mut ctx = context(OtpConfig::default());
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();
    ctx.request_transition(PlatOtpLcs::Secured).unwrap();

    let layout = *ctx.layout();
    let fuses = ctx.lcm_mut().raw_fuses_mut();
    fuses[layout.bl1_rotpk_0.offset] |= 0x40;
    fuses[layout.attack_tracking_bits.offset..layout.attack_tracking_bits.end()].fill(0xff);

    let (_, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_NOT_PERMITTED));
}

#[test]
fn test_tamper_manufacturing_data() {
    let mut ctx = context(OtpConfig::default());
    ctx.write(OtpElementId::ManufacturingData, &MFG_DATA)
        .unwrap();
    let (mut ctx, result) = reboot(ctx);
    assert_eq!(result, Ok(()));

    let header = ctx.layout().mfg_header.offset;
    ctx.lcm_mut().raw_fuses_mut()[header - 3] |= 0x80;
    let (_, result) = reboot(ctx);
    assert_eq!(result, Err(Bl1Error::OTP_INIT_MFG_DATA_ZERO_COUNT_MISMATCH));
}

#[test]
fn test_secrets_hidden_after_decommission() {
    let mut ctx = context(OtpConfig::default());
    ctx.write(OtpElementId::Guk, &[0x47; 32]).unwrap();
    ctx.write(OtpElementId::CmConfigFlags, &[2, 0, 0, 0])
        .unwrap();
    ctx.request_transition(PlatOtpLcs::PsaRotProvisioning)
        .unwrap();
    ctx.write(OtpElementId::KeyBl2Encryption, &[0x42; 32])
        .unwrap();
    ctx.request_transition(PlatOtpLcs::Secured).unwrap();

    let mut key = [0u8; 32];
    ctx.read(OtpElementId::Guk, &mut key).unwrap();
    assert_eq!(key, [0x47; 32]);

    ctx.request_transition(PlatOtpLcs::Decommissioned).unwrap();
    for id in [
        OtpElementId::Guk,
        OtpElementId::RomOtpEncryptionKey,
        OtpElementId::KeyBl2Encryption,
    ] {
        assert_eq!(
            ctx.read(id, &mut key),
            Err(Bl1Error::OTP_READ_NOT_PERMITTED)
        );
    }

    let mut word = [0u8; 4];
    ctx.read(OtpElementId::CmConfigFlags, &mut word).unwrap();
    assert_eq!(word, [2, 0, 0, 0]);
}
