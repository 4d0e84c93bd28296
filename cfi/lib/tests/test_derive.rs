/*++

Licensed under the Apache-2.0 license.

File Name:

    test_derive.rs

--*/

use bl1_cfi_derive::{cfi_impl_fn, cfi_mod_fn};
use bl1_cfi_lib::{CfiCounter, CfiInt, Xoshiro128};

#[cfi_mod_fn]
fn test1<T>(val: T) -> T {
    test2(val)
}

#[cfi_mod_fn]
fn test2<T>(val: T) -> T {
    val
}

#[cfi_mod_fn]
fn scaled_sum((a, b): (u32, u32), mut scale: u32, _: u8) -> u32 {
    scale += 1;
    (a + b) * scale
}

struct Test {
    calls: u32,
}

impl Test {
    #[cfi_mod_fn]
    fn test1<T>(val: T) -> T {
        test2(val)
    }

    #[cfi_impl_fn]
    fn test_self1<T>(&self, val: T) -> T {
        test2(val)
    }

    #[cfi_impl_fn]
    fn test_self_mut(&mut self) -> u32 {
        self.calls += 1;
        self.calls
    }
}

#[test]
#[cfg(feature = "cfi-counter")]
#[should_panic(expected = "CFI Panic = CounterCorrupt")]
fn test_with_not_initialized_counter() {
    CfiCounter::corrupt();
    assert_eq!(test1(10), 10);
}

#[test]
fn test_with_initialized_counter() {
    CfiCounter::reset([1, 2, 3, 4]);
    assert_eq!(test1(10), 10);

    assert_eq!(Test::test1(10), 10);

    let mut test = Test { calls: 0 };
    assert_eq!(test.test_self1(10), 10);
    assert_eq!(test.test_self_mut(), 1);
    assert_eq!(test.test_self_mut(), 2);
}

#[test]
fn test_pattern_params() {
    CfiCounter::reset([1, 2, 3, 4]);
    assert_eq!(scaled_sum((2, 3), 1, 0), 10);
    assert_eq!(CfiCounter::read(), CfiInt::default());
}

#[test]
#[should_panic(expected = "CFI Panic = EntropyError")]
fn test_reset_with_zero_entropy() {
    CfiCounter::reset([0; 4]);
}

#[test]
fn test_rand_stress() {
    let mut rng = Xoshiro128::new([1, 2, 3, 4]).unwrap();
    for _idx in 0..1000 {
        let _ = rng.next();
    }
    for _idx in 0..1000 {
        let _ = CfiCounter::rand();
    }
}
