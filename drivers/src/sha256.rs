/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains API for SHA-256 Cryptography operations

--*/

use bl1_error::{Bl1Error, Bl1Result};
use sha2::Digest;

pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;
const SHA256_MAX_DATA_SIZE: usize = 1024 * 1024;

pub type Sha256Digest = [u8; SHA256_DIGEST_BYTE_SIZE];

pub trait Sha256Alg {
    /// Calculate the digest of the buffer
    ///
    /// # Arguments
    ///
    /// * `buf` - Buffer to calculate the digest over
    fn digest(&mut self, buf: &[u8]) -> Bl1Result<Sha256Digest>;
}

/// Software SHA-256
#[derive(Default, Debug)]
pub struct Sha256 {}

impl Sha256 {
    pub fn new() -> Self {
        Self {}
    }
}

impl Sha256Alg for Sha256 {
    fn digest(&mut self, buf: &[u8]) -> Bl1Result<Sha256Digest> {
        if buf.len() > SHA256_MAX_DATA_SIZE {
            return Err(Bl1Error::DRIVER_SHA256_MAX_DATA);
        }
        Ok(sha2::Sha256::digest(buf).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_DIGEST: Sha256Digest = [
        0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae, 0x22,
        0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00,
        0x15, 0xad,
    ];

    #[test]
    fn test_digest() {
        let mut sha = Sha256::new();
        assert_eq!(sha.digest(b"abc").unwrap(), ABC_DIGEST);
    }

    #[test]
    fn test_max_data() {
        let mut sha = Sha256::new();
        let buf = vec![0u8; SHA256_MAX_DATA_SIZE + 1];
        assert!(sha.digest(&buf[..SHA256_MAX_DATA_SIZE]).is_ok());
        assert_eq!(sha.digest(&buf), Err(Bl1Error::DRIVER_SHA256_MAX_DATA));
    }
}
