/*++

Licensed under the Apache-2.0 license.

File Name:

    xoshiro.rs

Abstract:

    File contains implementation of RNG based on System.Random Xoshiro128** algorithm.

References:
    https://github.com/dotnet/runtime/blob/main/src/libraries/System.Private.CoreLib/src/System/Random.Xoshiro128StarStarImpl.cs

--*/

/// Provides an implementation of the xoshiro128** algorithm. Only used to pick
/// random delays and traversal orders, never for key material.
#[derive(Debug, Clone)]
pub struct Xoshiro128 {
    s: [u32; 4],
}

impl Xoshiro128 {
    /// Create a new instance of the xoshiro128** algorithm.
    ///
    /// # Arguments
    ///
    /// * `seed` - Initial state
    ///
    /// # Returns
    ///
    /// * `None` if every word of the seed is zero
    pub fn new(seed: [u32; 4]) -> Option<Self> {
        // At least one value must be non-zero
        if seed.iter().fold(0, |acc, s| acc | s) == 0 {
            return None;
        }
        Some(Self { s: seed })
    }

    /// Rebuild a generator from a previously saved state
    pub(crate) fn from_state(s: [u32; 4]) -> Self {
        Self { s }
    }

    pub(crate) fn state(&self) -> [u32; 4] {
        self.s
    }

    /// Get the next random number
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u32 {
        // next is based on the algorithm from http://prng.di.unimi.it/xoshiro128starstar.c:
        //
        //     Written in 2018 by David Blackman and Sebastiano Vigna (vigna@acm.org)
        //
        //     To the extent possible under law, the author has dedicated all copyright
        //     and related and neighboring rights to this software to the public domain
        //     worldwide. This software is distributed without any warranty.
        //
        //     See <http://creativecommons.org/publicdomain/zero/1.0/>.
        let [mut s0, mut s1, mut s2, mut s3] = self.s;

        let result = u32::wrapping_mul(u32::wrapping_mul(s1, 5).rotate_left(7), 9);
        let t = s1 << 9;

        s2 ^= s0;
        s3 ^= s1;
        s1 ^= s2;
        s0 ^= s3;

        s2 ^= t;
        s3 = s3.rotate_left(11);

        self.s = [s0, s1, s2, s3];

        result
    }
}
