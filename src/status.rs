//! Status Codes and Error Objects
//!
//! Recoverable failures cross the boundary as a [`Status`] plus, for every
//! status other than `Ok` and `Eof`, a registered [`FatError`] handle.

use std::fmt;

use thiserror::Error;

use crate::handles::{Handle, HandleRegistry};

/// Status returned by every fallible export.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok = 0,
    Syntax = 1,
    Range = 2,
    Eof = 3,
    Other = 100,
}

impl Status {
    /// Raw wire value.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Whether this status must be paired with an error object.
    pub fn carries_error(self) -> bool {
        !matches!(self, Status::Ok | Status::Eof)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "ok",
            Status::Syntax => "syntax",
            Status::Range => "range",
            Status::Eof => "eof",
            Status::Other => "other",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Subsystem error codes
// =============================================================================

/// Error codes attached to error objects, numbered per subsystem.
pub mod codes {
    pub const ZIP_IO: i32 = 100;
    pub const ZIP_FORMAT: i32 = 101;
    pub const TAR_IO: i32 = 110;
    pub const TAR_FORMAT: i32 = 111;
    pub const BASE64_CONFIG: i32 = 120;
    pub const BASE64_CORRUPT: i32 = 121;
    pub const CSV_PARSE: i32 = 150;
    pub const CSV_IO: i32 = 151;
    pub const JSON_SYNTAX: i32 = 170;
    pub const JSON_OTHER: i32 = 171;
    pub const BZIP2: i32 = 200;
    pub const FLATE: i32 = 210;
    pub const GZIP: i32 = 220;
    pub const LZW: i32 = 230;
    pub const ZLIB: i32 = 240;
    pub const SOCKET: i32 = 300;
    pub const HTTP: i32 = 400;
}

/// Error object handed to the caller: an integer code and a UTF-8 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatError {
    pub code: i32,
    pub message: String,
}

impl FatError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

// =============================================================================
// Failure
// =============================================================================

/// An operational failure inside the crate, before it is split into the
/// status and error channels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct Failure {
    pub status: Status,
    pub code: i32,
    pub message: String,
}

/// Result type for fallible operations.
pub type FatResult<T> = Result<T, Failure>;

impl Failure {
    pub fn new(status: Status, code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn syntax(code: i32, message: impl Into<String>) -> Self {
        Self::new(Status::Syntax, code, message)
    }

    pub fn range(code: i32, message: impl Into<String>) -> Self {
        Self::new(Status::Range, code, message)
    }

    pub fn other(code: i32, message: impl Into<String>) -> Self {
        Self::new(Status::Other, code, message)
    }

    /// End of stream. Never produces an error object.
    pub fn eof() -> Self {
        Self::new(Status::Eof, 0, "EOF")
    }

    pub fn is_eof(&self) -> bool {
        self.status == Status::Eof
    }
}

// =============================================================================
// Reply
// =============================================================================

/// The two-channel form of a result: status, success value, error handle.
///
/// `error` is non-zero exactly when `status.carries_error()`; `value` is the
/// default value whenever `status` is not `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply<T> {
    pub status: Status,
    pub value: T,
    pub error: Handle,
}

impl<T: Copy> Reply<T> {
    /// Write both out-parameters and return the status.
    pub fn store(self, out: &mut T, out_err: &mut Handle) -> Status {
        *out = self.value;
        *out_err = self.error;
        self.status
    }
}

impl HandleRegistry {
    /// Convert a result into its boundary form, registering an error object
    /// for every non-EOF failure.
    pub fn reply<T: Default>(&self, result: FatResult<T>) -> Reply<T> {
        match result {
            Ok(value) => Reply {
                status: Status::Ok,
                value,
                error: 0,
            },
            Err(failure) => {
                let error = if failure.status.carries_error() {
                    self.register(FatError::new(failure.code, failure.message))
                } else {
                    0
                };
                Reply {
                    status: failure.status,
                    value: T::default(),
                    error,
                }
            }
        }
    }

    /// Like [`HandleRegistry::reply`] for operations with no success value.
    pub fn reply_unit(&self, result: FatResult<()>) -> (Status, Handle) {
        let reply = self.reply(result);
        (reply.status, reply.error)
    }
}
