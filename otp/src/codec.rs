/*++

Licensed under the Apache-2.0 license.

File Name:

    codec.rs

Abstract:

    File contains the storage backends of key fields. Keys are either
    stored as is or encrypted with AES-256-CTR under a key encryption key
    held in the KMU.

--*/

use crate::accessor::{check_emulated, raw_read, raw_write};
use bl1_drivers::{Aes256Ctr, Kmu, KmuSlot, LcmDevice, AES_256_IV_SIZE};
use bl1_error::{Bl1Error, Bl1Result};
use zeroize::Zeroizing;

/// Largest field the encrypting backend can transform
pub const OTP_ENCRYPTED_FIELD_MAX_SIZE: usize = 32;

/// Storage backend of a key field
pub trait FieldStore {
    /// Read the field of `len` bytes at `offset` into `out`
    fn read_field<L: LcmDevice>(
        &self,
        lcm: &L,
        kmu: &Kmu,
        offset: usize,
        len: usize,
        slot: KmuSlot,
        out: &mut [u8],
    ) -> Bl1Result<()>;

    /// Program `data` into the field of `len` bytes at `offset`
    fn write_field<L: LcmDevice>(
        &self,
        lcm: &mut L,
        kmu: &Kmu,
        offset: usize,
        len: usize,
        slot: KmuSlot,
        data: &[u8],
    ) -> Bl1Result<()>;
}

/// Fields stored in the clear
#[derive(Debug, Default, Copy, Clone)]
pub struct PlainStore;

impl FieldStore for PlainStore {
    fn read_field<L: LcmDevice>(
        &self,
        lcm: &L,
        _kmu: &Kmu,
        offset: usize,
        len: usize,
        _slot: KmuSlot,
        out: &mut [u8],
    ) -> Bl1Result<()> {
        raw_read(lcm, offset, len, out)
    }

    fn write_field<L: LcmDevice>(
        &self,
        lcm: &mut L,
        _kmu: &Kmu,
        offset: usize,
        len: usize,
        _slot: KmuSlot,
        data: &[u8],
    ) -> Bl1Result<()> {
        raw_write(lcm, offset, len, data)
    }
}

/// Fields stored encrypted with AES-256-CTR.
///
/// The IV is derived from the field offset so no two fields share a
/// keystream under the same key.
#[derive(Debug, Default, Copy, Clone)]
pub struct Aes256CtrStore;

impl Aes256CtrStore {
    fn iv(offset: usize) -> [u8; AES_256_IV_SIZE] {
        let mut iv = [0u8; AES_256_IV_SIZE];
        iv[..4].copy_from_slice(&(offset as u32).to_le_bytes());
        iv
    }
}

impl FieldStore for Aes256CtrStore {
    fn read_field<L: LcmDevice>(
        &self,
        lcm: &L,
        kmu: &Kmu,
        offset: usize,
        len: usize,
        slot: KmuSlot,
        out: &mut [u8],
    ) -> Bl1Result<()> {
        if len == 0 {
            return Ok(());
        }
        check_emulated(lcm, offset, len)?;
        if len > OTP_ENCRYPTED_FIELD_MAX_SIZE {
            return Err(Bl1Error::OTP_READ_ENCRYPTED_INVALID_INPUT);
        }

        let mut scratch = Zeroizing::new([0u8; OTP_ENCRYPTED_FIELD_MAX_SIZE]);
        let buf = &mut scratch[..len];
        raw_read(lcm, offset, len, buf)?;
        Aes256Ctr::new(kmu, slot, &Self::iv(offset))?.apply(buf);

        let len = len.min(out.len());
        out[..len].copy_from_slice(&buf[..len]);
        Ok(())
    }

    fn write_field<L: LcmDevice>(
        &self,
        lcm: &mut L,
        kmu: &Kmu,
        offset: usize,
        len: usize,
        slot: KmuSlot,
        data: &[u8],
    ) -> Bl1Result<()> {
        if len > OTP_ENCRYPTED_FIELD_MAX_SIZE {
            return Err(Bl1Error::OTP_WRITE_ENCRYPTED_INVALID_INPUT);
        }
        if data.len() > len {
            return Err(Bl1Error::OTP_WRITE_INVALID_INPUT);
        }

        let mut scratch = Zeroizing::new([0u8; OTP_ENCRYPTED_FIELD_MAX_SIZE]);
        let buf = &mut scratch[..data.len()];
        buf.copy_from_slice(data);
        Aes256Ctr::new(kmu, slot, &Self::iv(offset))?.apply(buf);

        raw_write(lcm, offset, len, buf)
    }
}

/// Backend selected from `OtpConfig::encrypted_otp_keys`
#[derive(Debug, Copy, Clone)]
pub enum FieldCodec {
    Plain(PlainStore),
    Aes256Ctr(Aes256CtrStore),
}

impl FieldCodec {
    pub fn new(encrypted: bool) -> Self {
        if encrypted {
            FieldCodec::Aes256Ctr(Aes256CtrStore)
        } else {
            FieldCodec::Plain(PlainStore)
        }
    }
}

impl FieldStore for FieldCodec {
    fn read_field<L: LcmDevice>(
        &self,
        lcm: &L,
        kmu: &Kmu,
        offset: usize,
        len: usize,
        slot: KmuSlot,
        out: &mut [u8],
    ) -> Bl1Result<()> {
        if offset == 0 {
            return Err(Bl1Error::OTP_READ_ENCRYPTED_UNSUPPORTED);
        }
        match self {
            FieldCodec::Plain(store) => store.read_field(lcm, kmu, offset, len, slot, out),
            FieldCodec::Aes256Ctr(store) => store.read_field(lcm, kmu, offset, len, slot, out),
        }
    }

    fn write_field<L: LcmDevice>(
        &self,
        lcm: &mut L,
        kmu: &Kmu,
        offset: usize,
        len: usize,
        slot: KmuSlot,
        data: &[u8],
    ) -> Bl1Result<()> {
        if offset == 0 {
            return Err(Bl1Error::OTP_WRITE_UNSUPPORTED);
        }
        match self {
            FieldCodec::Plain(store) => store.write_field(lcm, kmu, offset, len, slot, data),
            FieldCodec::Aes256Ctr(store) => store.write_field(lcm, kmu, offset, len, slot, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl1_drivers::{EmulatedLcm, KmuHwSlot, TpMode};

    const OFFSET: usize = 0x140;
    const KEY: [u8; 32] = *b"device manufacturer image key 01";

    fn setup() -> (EmulatedLcm<0x200>, Kmu) {
        let mut lcm = EmulatedLcm::new(0xF8, TpMode::Pci);
        lcm.init().unwrap();
        let mut kmu = Kmu::new();
        kmu.set_key(KmuHwSlot::KceCm, &[0x11; 32]).unwrap();
        kmu.set_key(KmuHwSlot::KceDm, &[0x22; 32]).unwrap();
        (lcm, kmu)
    }

    #[test]
    fn test_encrypted_round_trip() {
        let (mut lcm, kmu) = setup();
        let codec = FieldCodec::new(true);
        let slot = KmuHwSlot::KceCm.into();

        codec
            .write_field(&mut lcm, &kmu, OFFSET, 32, slot, &KEY)
            .unwrap();
        assert_ne!(&lcm.fuses()[OFFSET..OFFSET + 32], &KEY);

        let mut out = [0u8; 32];
        codec
            .read_field(&lcm, &kmu, OFFSET, 32, slot, &mut out)
            .unwrap();
        assert_eq!(out, KEY);
    }

    #[test]
    fn test_wrong_slot() {
        let (mut lcm, kmu) = setup();
        let codec = FieldCodec::new(true);

        codec
            .write_field(&mut lcm, &kmu, OFFSET, 32, KmuHwSlot::KceCm.into(), &KEY)
            .unwrap();
        let mut out = [0u8; 32];
        codec
            .read_field(&lcm, &kmu, OFFSET, 32, KmuHwSlot::KceDm.into(), &mut out)
            .unwrap();
        assert_ne!(out, KEY);
    }

    #[test]
    fn test_keystream_bound_to_offset() {
        let (mut lcm, kmu) = setup();
        let codec = FieldCodec::new(true);
        let slot = KmuHwSlot::KceCm.into();

        codec
            .write_field(&mut lcm, &kmu, OFFSET, 32, slot, &KEY)
            .unwrap();
        codec
            .write_field(&mut lcm, &kmu, OFFSET + 32, 32, slot, &KEY)
            .unwrap();
        assert_ne!(
            &lcm.fuses()[OFFSET..OFFSET + 32],
            &lcm.fuses()[OFFSET + 32..OFFSET + 64]
        );
    }

    #[test]
    fn test_field_too_large() {
        let (mut lcm, kmu) = setup();
        let codec = FieldCodec::new(true);
        let slot = KmuHwSlot::KceCm.into();
        let mut out = [0u8; 48];

        assert_eq!(
            codec.read_field(&lcm, &kmu, OFFSET, 48, slot, &mut out),
            Err(Bl1Error::OTP_READ_ENCRYPTED_INVALID_INPUT)
        );
        assert_eq!(
            codec.write_field(&mut lcm, &kmu, OFFSET, 48, slot, &[0u8; 48]),
            Err(Bl1Error::OTP_WRITE_ENCRYPTED_INVALID_INPUT)
        );
        assert_eq!(&lcm.fuses()[OFFSET..OFFSET + 48], &[0u8; 48]);
    }

    #[test]
    fn test_unmapped_field() {
        let (lcm, kmu) = setup();
        let mut out = [0u8; 32];
        assert_eq!(
            FieldCodec::new(true).read_field(&lcm, &kmu, 0, 32, KmuHwSlot::KceCm.into(), &mut out),
            Err(Bl1Error::OTP_READ_ENCRYPTED_UNSUPPORTED)
        );
    }

    #[test]
    fn test_empty_key_slot() {
        let (mut lcm, _) = setup();
        let kmu = Kmu::new();
        assert_eq!(
            FieldCodec::new(true).write_field(
                &mut lcm,
                &kmu,
                OFFSET,
                32,
                KmuHwSlot::KceCm.into(),
                &KEY
            ),
            Err(Bl1Error::DRIVER_KMU_SLOT_EMPTY)
        );
        assert_eq!(&lcm.fuses()[OFFSET..OFFSET + 32], &[0u8; 32]);
    }

    #[test]
    fn test_plain_fallback() {
        let (mut lcm, kmu) = setup();
        let codec = FieldCodec::new(false);
        let slot = KmuHwSlot::KceCm.into();

        codec
            .write_field(&mut lcm, &kmu, OFFSET, 32, slot, &KEY)
            .unwrap();
        assert_eq!(&lcm.fuses()[OFFSET..OFFSET + 32], &KEY);
    }
}
