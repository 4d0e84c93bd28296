/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains API for AES-256 counter mode keyed from the KMU.

--*/

use crate::kmu::{Kmu, KmuSlot};
use aes::Aes256;
use bl1_error::Bl1Result;
use ctr::cipher::{KeyIvInit, StreamCipher};

pub const AES_256_BLOCK_SIZE: usize = 16;
pub const AES_256_KEY_SIZE: usize = 32;
pub const AES_256_IV_SIZE: usize = AES_256_BLOCK_SIZE;

type Ctr = ctr::Ctr128BE<Aes256>;

/// AES-256-CTR stream.
///
/// Encryption and decryption are the same operation. The key schedule is
/// wiped when the stream is dropped.
pub struct Aes256Ctr {
    cryptor: Ctr,
}

impl Aes256Ctr {
    /// Start a keystream under the key held in `slot`
    ///
    /// # Arguments
    ///
    /// * `kmu`  - Key management unit
    /// * `slot` - Key slot
    /// * `iv`   - Initial counter block
    pub fn new(kmu: &Kmu, slot: KmuSlot, iv: &[u8; AES_256_IV_SIZE]) -> Bl1Result<Self> {
        let key = kmu.get_key(slot)?;
        Ok(Self {
            cryptor: Ctr::new((&*key).into(), iv.into()),
        })
    }

    /// XOR the keystream into `buf`
    pub fn apply(&mut self, buf: &mut [u8]) {
        self.cryptor.apply_keystream(buf);
    }
}
