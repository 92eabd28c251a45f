//! C ABI Exports
//!
//! Every `fat_*` symbol follows one calling convention:
//!
//! 1. NULL out-parameters, NULL input pointers with a non-zero length and
//!    lengths above `limits.max_len` are contract violations, checked before
//!    any work is done.
//! 2. Handles are resolved through the typed accessor layer.
//! 3. The wrapped operation runs with no registry lock held.
//! 4. Fallible exports return a [`Status`]; success clears `out_err`, any
//!    failure other than EOF stores a new error handle in it and success
//!    out-parameters are cleared to zero.
//!
//! ```text
//! caller ──fat_*(handles, ptr/len, out*)──► ffi ──resolve──► HandleRegistry
//!                                            │
//!                                            └──► domain module ──► Result
//! ```
//!
//! Pointers are never retained past the call that provided them.

pub mod archive;
pub mod bytes;
pub mod codec;
pub mod error;
pub mod net;
pub mod text;

use std::borrow::Cow;
use std::ffi::{c_char, CStr};

use crate::config;
use crate::contract::{check_len_limit, violate, ContractViolation};
use crate::handles::{self, Handle, HandleRegistry};
use crate::status::{FatResult, Status};

pub(crate) fn registry() -> &'static HandleRegistry {
    handles::global()
}

fn max_len() -> usize {
    config::global().limits.max_len
}

/// Borrow a required out-parameter.
#[track_caller]
pub(crate) unsafe fn out_param<'a, T>(op: &'static str, param: &'static str, ptr: *mut T) -> &'a mut T {
    match ptr.as_mut() {
        Some(slot) => slot,
        None => violate(ContractViolation::NullPointer { op, param }),
    }
}

/// Borrow a caller input span. NULL is allowed only with length 0.
#[track_caller]
pub(crate) unsafe fn in_slice<'a>(op: &'static str, param: &'static str, ptr: *const u8, len: usize) -> &'a [u8] {
    check_len_limit(op, param, len, max_len());
    if len == 0 {
        return &[];
    }
    if ptr.is_null() {
        violate(ContractViolation::NullPointer { op, param });
    }
    std::slice::from_raw_parts(ptr, len)
}

/// Borrow a caller array of handles. NULL is allowed only with length 0.
#[track_caller]
pub(crate) unsafe fn in_handles<'a>(op: &'static str, param: &'static str, ptr: *const Handle, len: usize) -> &'a [Handle] {
    check_len_limit(op, param, len, max_len());
    if len == 0 {
        return &[];
    }
    if ptr.is_null() {
        violate(ContractViolation::NullPointer { op, param });
    }
    std::slice::from_raw_parts(ptr, len)
}

/// Borrow a caller output buffer of `cap` bytes. NULL is allowed only with capacity 0.
#[track_caller]
pub(crate) unsafe fn out_slice<'a>(op: &'static str, param: &'static str, ptr: *mut u8, cap: usize) -> &'a mut [u8] {
    check_len_limit(op, param, cap, max_len());
    if cap == 0 {
        return &mut [];
    }
    if ptr.is_null() {
        violate(ContractViolation::NullPointer { op, param });
    }
    std::slice::from_raw_parts_mut(ptr, cap)
}

/// Read a required NUL-terminated UTF-8 string. Invalid sequences become U+FFFD.
#[track_caller]
pub(crate) unsafe fn in_cstr<'a>(op: &'static str, param: &'static str, ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        violate(ContractViolation::NullPointer { op, param });
    }
    let bytes = CStr::from_ptr(ptr).to_bytes();
    check_len_limit(op, param, bytes.len(), max_len());
    String::from_utf8_lossy(bytes)
}

/// Like [`in_cstr`], but NULL means "absent".
#[track_caller]
pub(crate) unsafe fn opt_cstr<'a>(op: &'static str, param: &'static str, ptr: *const c_char) -> Option<Cow<'a, str>> {
    if ptr.is_null() {
        None
    } else {
        Some(in_cstr(op, param, ptr))
    }
}

#[track_caller]
pub(crate) fn in_len(op: &'static str, param: &'static str, len: usize) -> usize {
    check_len_limit(op, param, len, max_len());
    len
}

/// Copy as much of `src` as fits; returns the bytes written.
pub(crate) fn copy_out(src: &[u8], dst: &mut [u8]) -> usize {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

/// Store a result through `out`/`out_err` and return its status.
pub(crate) fn finish<T: Copy + Default>(result: FatResult<T>, out: &mut T, out_err: &mut Handle) -> Status {
    registry().reply(result).store(out, out_err)
}

/// [`finish`] for operations with no success value.
pub(crate) fn finish_unit(result: FatResult<()>, out_err: &mut Handle) -> Status {
    let (status, err) = registry().reply_unit(result);
    *out_err = err;
    status
}

/// Register a fresh string and return its handle.
pub(crate) fn new_string(s: impl Into<String>) -> Handle {
    registry().register::<String>(s.into())
}

/// Register fresh bytes and return their handle.
pub(crate) fn new_bytes(b: impl Into<Vec<u8>>) -> Handle {
    registry().register::<Vec<u8>>(b.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_out_truncates() {
        let mut dst = [0u8; 3];
        assert_eq!(copy_out(b"hello", &mut dst), 3);
        assert_eq!(&dst, b"hel");
        assert_eq!(copy_out(b"", &mut dst), 0);
    }

    #[test]
    fn test_null_with_zero_len_is_empty() {
        let span = unsafe { in_slice("op", "src", std::ptr::null(), 0) };
        assert!(span.is_empty());
        let out = unsafe { out_slice("op", "dst", std::ptr::null_mut(), 0) };
        assert!(out.is_empty());
    }

    #[test]
    #[should_panic(expected = "op: src is NULL")]
    fn test_null_with_len_is_violation() {
        let _ = unsafe { in_slice("op", "src", std::ptr::null(), 4) };
    }

    #[test]
    fn test_in_handles() {
        let handles: [Handle; 2] = [7, 9];
        let span = unsafe { in_handles("op", "fields", handles.as_ptr(), 2) };
        assert_eq!(span, &[7, 9]);
        assert!(unsafe { in_handles("op", "fields", std::ptr::null(), 0) }.is_empty());
    }

    #[test]
    #[should_panic(expected = "op: fields is NULL")]
    fn test_null_handles_with_len_is_violation() {
        let _ = unsafe { in_handles("op", "fields", std::ptr::null(), 1) };
    }

    #[test]
    #[should_panic(expected = "op: out is NULL")]
    fn test_null_out_param_is_violation() {
        let _ = unsafe { out_param::<Handle>("op", "out", std::ptr::null_mut()) };
    }

    #[test]
    fn test_cstr_lossy() {
        let raw = b"ok\xff\0";
        let s = unsafe { in_cstr("op", "s", raw.as_ptr() as *const c_char) };
        assert_eq!(s, "ok\u{FFFD}");
    }
}
