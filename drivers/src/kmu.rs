/*++

Licensed under the Apache-2.0 license.

File Name:

    kmu.rs

Abstract:

    File contains API for the Key Management Unit. Keys are loaded into
    slots once and handed out as zeroizing copies.

--*/

use bl1_error::{Bl1Error, Bl1Result};
use zeroize::Zeroizing;

pub const KMU_KEY_SIZE: usize = 32;

/// Number of software loadable slots
pub const KMU_USER_SLOT_COUNT: usize = 4;

const KMU_HW_SLOT_COUNT: usize = 6;

pub type KmuKey = Zeroizing<[u8; KMU_KEY_SIZE]>;

/// Slots loaded by hardware from the OTP header
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KmuHwSlot {
    Huk = 0,
    Guk = 1,
    /// Key encryption key of the CM provisioned fields
    KceCm = 2,
    /// Key encryption key of the DM provisioned fields
    KceDm = 3,
    KpCm = 4,
    KpDm = 5,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KmuSlot {
    Hw(KmuHwSlot),
    User(usize),
}

impl KmuSlot {
    fn index(self) -> Bl1Result<usize> {
        match self {
            KmuSlot::Hw(slot) => Ok(slot as usize),
            KmuSlot::User(n) if n < KMU_USER_SLOT_COUNT => Ok(KMU_HW_SLOT_COUNT + n),
            KmuSlot::User(_) => Err(Bl1Error::DRIVER_KMU_INVALID_SLOT),
        }
    }
}

impl From<KmuHwSlot> for KmuSlot {
    fn from(slot: KmuHwSlot) -> Self {
        KmuSlot::Hw(slot)
    }
}

#[derive(Default)]
pub struct Kmu {
    keys: [Option<KmuKey>; KMU_HW_SLOT_COUNT + KMU_USER_SLOT_COUNT],
    locked: [bool; KMU_HW_SLOT_COUNT + KMU_USER_SLOT_COUNT],
}

impl Kmu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a key into `slot`
    pub fn set_key(&mut self, slot: impl Into<KmuSlot>, key: &[u8; KMU_KEY_SIZE]) -> Bl1Result<()> {
        let idx = slot.into().index()?;
        if self.locked[idx] {
            return Err(Bl1Error::DRIVER_KMU_SLOT_LOCKED);
        }
        self.keys[idx] = Some(Zeroizing::new(*key));
        Ok(())
    }

    /// Prevent further changes to `slot`
    pub fn lock(&mut self, slot: impl Into<KmuSlot>) -> Bl1Result<()> {
        let idx = slot.into().index()?;
        self.locked[idx] = true;
        Ok(())
    }

    pub fn is_locked(&self, slot: impl Into<KmuSlot>) -> Bl1Result<bool> {
        Ok(self.locked[slot.into().index()?])
    }

    /// Copy the key material of `slot` out of the KMU
    pub fn get_key(&self, slot: impl Into<KmuSlot>) -> Bl1Result<KmuKey> {
        let idx = slot.into().index()?;
        match &self.keys[idx] {
            Some(key) => Ok(Zeroizing::new(**key)),
            None => Err(Bl1Error::DRIVER_KMU_SLOT_EMPTY),
        }
    }
}
