/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the BL1 fault injection hardening library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]
extern crate core;

mod cfi;
mod cfi_ctr;
mod fih;
mod secmem;
mod xoshiro;

pub use cfi::*;
pub use cfi_ctr::{CfiCounter, CfiInt};
pub use fih::{fih_eq, fih_memeql, fih_not_eq, FihInt};
pub use secmem::{hardened_memeq, memeq, HardenedBool, HARDENED_BOOL_FALSE, HARDENED_BOOL_TRUE};
pub use xoshiro::Xoshiro128;
