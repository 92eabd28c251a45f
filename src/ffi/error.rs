//! Error object, version and logging exports.

use std::ffi::c_char;

use super::{new_string, registry};
use crate::handles::Handle;
use crate::logging;
use crate::status::FatError;

static VERSION_CSTR: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Message of an error object as a new string handle.
#[no_mangle]
pub extern "C" fn fat_error_message(e: Handle) -> Handle {
    let err = registry().resolve::<FatError>(e);
    new_string(err.message.as_str())
}

/// Subsystem code of an error object.
#[no_mangle]
pub extern "C" fn fat_error_code(e: Handle) -> i32 {
    registry().resolve::<FatError>(e).code
}

#[no_mangle]
pub extern "C" fn fat_error_free(e: Handle) {
    registry().release::<FatError>(e);
}

/// Library version; static, NUL-terminated, never freed.
#[no_mangle]
pub extern "C" fn fat_version_string() -> *const c_char {
    VERSION_CSTR.as_ptr() as *const c_char
}

/// Install the stderr log subscriber. Safe to call more than once.
#[no_mangle]
pub extern "C" fn fat_logging_init() {
    logging::init();
}
