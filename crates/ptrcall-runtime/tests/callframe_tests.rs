//! Call-frame marshaling tests
//!
//! Tests the frame as generated bindings use it:
//! - Argument writes and typed read-back
//! - Return slot reservation
//! - Argument-address arrays handed to native code
//! - Fatal precondition paths

use pretty_assertions::assert_eq;
use ptrcall_runtime::callframe::{
    Addr, ErrorKind, FrameError, FramePool, Nil, CAPACITY, SLOT_SIZE, SLOT_WORDS,
};
use ptrcall_runtime::ffi::{MethodBind, ObjectHandle, PtrCall};
use rstest::rstest;
use std::ffi::c_void;

// ====================
// Engine stand-ins
// ====================

unsafe extern "C" fn set_return_to_22(
    _method: MethodBind,
    _object: ObjectHandle,
    _args: *const Addr,
    ret: Addr,
) {
    ret.write(22i64);
}

/// Copies `[u64; 3]` argument 0 to the return, reversed.
unsafe extern "C" fn reverse_triple(
    _method: MethodBind,
    _object: ObjectHandle,
    args: *const Addr,
    ret: Addr,
) {
    let [a, b, c] = (*args).read::<[u64; 3]>();
    ret.write([c, b, a]);
}

fn method() -> MethodBind {
    MethodBind::from_raw(0x10 as *const c_void)
}

fn object() -> ObjectHandle {
    ObjectHandle::from_raw(0x20 as *mut c_void)
}

// ====================
// Call Scenario Tests
// ====================

#[test]
fn test_return_does_not_clobber_arguments() {
    let pool = FramePool::default();
    let frame = pool.acquire();

    let first = frame.arg(100i64);
    let ret = frame.ret::<i64>();
    let second = frame.arg(200i64);

    unsafe {
        PtrCall::new(set_return_to_22)
            .call(method(), object(), frame.array(0), ret.addr())
            .unwrap();
    }

    assert_eq!(ret.get(), 22);
    assert_eq!(first.get(), 100);
    assert_eq!(second.get(), 200);
}

#[test]
fn test_multi_word_argument_and_return() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    frame.arg([1u64, 2, 3]);
    let ret = frame.ret::<[u64; 3]>();

    unsafe {
        PtrCall::new(reverse_triple)
            .call(method(), object(), frame.array(0), ret.addr())
            .unwrap();
    }

    assert_eq!(ret.get(), [3, 2, 1]);
}

#[test]
fn test_void_method_uses_nil() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    frame.arg(1.5f32);
    let ret = Nil;

    assert!(ret.addr().is_null());
    assert_eq!(frame.array(0).len(), 1);
}

// ====================
// Round Trip Tests
// ====================

#[rstest]
#[case::zero(0i64)]
#[case::negative(-7i64)]
#[case::max(i64::MAX)]
#[case::min(i64::MIN)]
fn test_i64_round_trip(#[case] value: i64) {
    let pool = FramePool::default();
    let frame = pool.acquire();
    assert_eq!(frame.arg(value).get(), value);
}

#[rstest]
#[case(0.0)]
#[case(-1.25)]
#[case(f64::MAX)]
#[case(f64::MIN_POSITIVE)]
fn test_f64_round_trip(#[case] value: f64) {
    let pool = FramePool::default();
    let frame = pool.acquire();
    assert_eq!(frame.arg(value).get().to_bits(), value.to_bits());
}

#[test]
fn test_mixed_types_round_trip() {
    let pool = FramePool::default();
    let frame = pool.acquire();

    let b = frame.arg(true);
    let byte = frame.arg(0xABu8);
    let word = frame.arg(0xDEAD_BEEFu32);
    let handle = frame.arg([0x1234usize]);
    let ptr = frame.arg(0x5678 as *const u8);
    let full = frame.arg([usize::MAX; SLOT_WORDS]);

    assert!(b.get());
    assert_eq!(byte.get(), 0xAB);
    assert_eq!(word.get(), 0xDEAD_BEEF);
    assert_eq!(handle.get(), [0x1234]);
    assert_eq!(ptr.get() as usize, 0x5678);
    assert_eq!(full.get(), [usize::MAX; SLOT_WORDS]);
}

#[test]
fn test_set_overwrites_slot() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    let arg = frame.arg(1i32);
    arg.set(9);
    assert_eq!(arg.get(), 9);
}

#[test]
fn test_return_slot_is_zeroed() {
    let pool = FramePool::default();
    {
        let frame = pool.acquire();
        // leave garbage in every slot, including the first return slot
        for i in 0..CAPACITY {
            frame.arg(u64::MAX - i as u64);
        }
    }

    let frame = pool.acquire();
    let ret = frame.ret::<[u64; SLOT_WORDS]>();
    let words = ret.get();
    assert!(words.iter().all(|&w| w == 0));
}

// ====================
// Array View Tests
// ====================

#[test]
fn test_array_addresses_match_views() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    let views: Vec<_> = (0..4).map(|i| frame.arg(i as u16).addr()).collect();

    let args = frame.array(0);
    assert_eq!(args.len(), 4);
    assert_eq!(args.iter().collect::<Vec<_>>(), views);
    assert_eq!(args.as_slice()[3], views[3]);
    assert_eq!(args.get(4), None);

    let tail = frame.array(2);
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0], views[2]);
    unsafe {
        assert_eq!(tail.read::<u16>(1), 3);
    }
}

#[test]
fn test_array_without_arguments() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    let args = frame.array(0);
    assert!(args.is_empty());
    assert_ne!(args.uintptr(), 0);
}

// ====================
// Precondition Tests
// ====================

#[test]
#[should_panic(expected = "does not fit")]
fn test_oversized_argument_panics() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    frame.arg([0u8; SLOT_SIZE + 1]);
}

#[test]
#[should_panic(expected = "does not fit")]
fn test_oversized_return_panics() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    frame.ret::<[u64; SLOT_WORDS + 1]>();
}

#[test]
#[should_panic(expected = "all 16 slots in use")]
fn test_too_many_arguments_panics() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    for i in 0..=CAPACITY {
        frame.arg(i);
    }
}

#[test]
#[should_panic(expected = "all 16 slots in use")]
fn test_arguments_and_returns_share_capacity() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    for _ in 0..CAPACITY / 2 {
        frame.ret::<u32>();
    }
    for i in 0..CAPACITY / 2 + 1 {
        frame.arg(i as u32);
    }
}

#[test]
fn test_oversized_leaves_neighbours_intact() {
    let pool = FramePool::default();
    let frame = pool.acquire();
    let before = frame.arg(0x1111u64);
    let ret = frame.ret::<u64>();

    let err = frame.try_arg([0xFFu8; SLOT_SIZE * 2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMarshalSize);

    assert_eq!(before.get(), 0x1111);
    assert_eq!(ret.get(), 0);
    assert_eq!(frame.arg_count(), 1);
    assert_eq!(frame.ret_count(), 1);
}

#[test]
fn test_error_messages() {
    let capacity = FrameError::CapacityExceeded {
        capacity: CAPACITY,
        args: 10,
        rets: 6,
    };
    insta::assert_snapshot!(
        capacity.to_string(),
        @"callframe: all 16 slots in use (10 arguments, 6 returns)"
    );

    let oversized = FrameError::OversizedType {
        type_name: "[u8; 65]",
        size: 65,
        align: 1,
        slot_size: 64,
    };
    insta::assert_snapshot!(
        oversized.to_string(),
        @"callframe: [u8; 65] (size 65, align 1) does not fit a 64-byte slot"
    );
}
