//! Contract Violations
//!
//! Caller bugs at the boundary: bad handles, wrong kinds, NULL pointers,
//! oversize lengths and misuse of stateful objects. None of these are
//! reported through the status channel. They are logged and then panic;
//! since every export is `extern "C"`, the panic cannot unwind into the
//! caller and the process aborts.

use thiserror::Error;

use crate::handles::{Handle, Kind};

/// Largest length accepted for any pointer/length pair (2^31 - 1).
pub const MAX_LEN: usize = i32::MAX as usize;

/// A caller bug detected at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("{op}: handle is 0")]
    ZeroHandle { op: &'static str },

    #[error("{op}: invalid handle {handle}")]
    UnknownHandle { op: &'static str, handle: Handle },

    #[error("{op}: handle {handle} is {actual}, expected {expected}")]
    WrongKind {
        op: &'static str,
        handle: Handle,
        expected: Kind,
        actual: Kind,
    },

    #[error("{op}: {kind} is closed")]
    Closed { op: &'static str, kind: Kind },

    #[error("{op}: {param} is NULL")]
    NullPointer { op: &'static str, param: &'static str },

    #[error("{op}: {param} length {len} exceeds {max}")]
    LengthOverflow {
        op: &'static str,
        param: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{op}: {detail}")]
    Misuse { op: &'static str, detail: String },
}

/// Log and raise a contract violation. Never returns.
#[track_caller]
pub fn violate(violation: ContractViolation) -> ! {
    tracing::error!(%violation, "contract violation");
    panic!("{violation}")
}

/// Shorthand for [`ContractViolation::Misuse`].
#[track_caller]
pub fn misuse(op: &'static str, detail: impl Into<String>) -> ! {
    violate(ContractViolation::Misuse {
        op,
        detail: detail.into(),
    })
}

/// Reject lengths that do not fit the boundary's signed 32-bit limit.
#[track_caller]
pub fn check_len(op: &'static str, param: &'static str, len: usize) {
    check_len_limit(op, param, len, MAX_LEN);
}

/// Like [`check_len`] with a caller-supplied (lower) limit.
#[track_caller]
pub fn check_len_limit(op: &'static str, param: &'static str, len: usize, max: usize) {
    if len > max.min(MAX_LEN) {
        violate(ContractViolation::LengthOverflow {
            op,
            param,
            len,
            max: max.min(MAX_LEN),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_operation() {
        let v = ContractViolation::WrongKind {
            op: "fat_string_free",
            handle: 7,
            expected: Kind::String,
            actual: Kind::Bytes,
        };
        assert_eq!(
            v.to_string(),
            "fat_string_free: handle 7 is bytes, expected string"
        );
    }

    #[test]
    fn test_check_len_accepts_max() {
        check_len("op", "len", MAX_LEN);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_check_len_rejects_overflow() {
        check_len("op", "len", MAX_LEN + 1);
    }

    #[test]
    #[should_panic(expected = "exceeds 16")]
    fn test_check_len_limit_lowered() {
        check_len_limit("op", "len", 17, 16);
    }
}
