//! String, string array, string builder and string reader exports.

use std::ffi::c_char;

use super::{copy_out, in_cstr, in_len, in_slice, new_string, out_param, out_slice, registry};
use crate::contract::misuse;
use crate::handles::Handle;
use crate::text::{strings, StringBuilder, StringReader};

fn string(h: Handle) -> std::sync::Arc<String> {
    registry().resolve::<String>(h)
}

fn new_string_array(parts: Vec<String>) -> Handle {
    registry().register::<Vec<String>>(parts)
}

// =============================================================================
// String
// =============================================================================

#[no_mangle]
pub unsafe extern "C" fn fat_string_new_utf8_cstr(cstr: *const c_char) -> Handle {
    new_string(in_cstr("fat_string_new_utf8_cstr", "cstr", cstr))
}

/// New string from a byte span. Invalid UTF-8 is replaced with U+FFFD.
#[no_mangle]
pub unsafe extern "C" fn fat_string_new_utf8_n(bytes: *const u8, len: usize) -> Handle {
    let span = in_slice("fat_string_new_utf8_n", "bytes", bytes, len);
    new_string(String::from_utf8_lossy(span))
}

#[no_mangle]
pub extern "C" fn fat_string_clone(s: Handle) -> Handle {
    new_string(string(s).as_str())
}

/// Length in bytes.
#[no_mangle]
pub extern "C" fn fat_string_len(s: Handle) -> usize {
    string(s).len()
}

/// Copy up to `dst_len` bytes (no NUL terminator); returns bytes written.
#[no_mangle]
pub unsafe extern "C" fn fat_string_copy_out(s: Handle, dst: *mut u8, dst_len: usize) -> usize {
    let dst = out_slice("fat_string_copy_out", "dst", dst, dst_len);
    copy_out(string(s).as_bytes(), dst)
}

#[no_mangle]
pub extern "C" fn fat_string_contains(s: Handle, substr: Handle) -> bool {
    string(s).contains(string(substr).as_str())
}

#[no_mangle]
pub extern "C" fn fat_string_has_prefix(s: Handle, prefix: Handle) -> bool {
    string(s).starts_with(string(prefix).as_str())
}

#[no_mangle]
pub extern "C" fn fat_string_has_suffix(s: Handle, suffix: Handle) -> bool {
    string(s).ends_with(string(suffix).as_str())
}

#[no_mangle]
pub extern "C" fn fat_string_trim_space(s: Handle) -> Handle {
    new_string(string(s).trim())
}

#[no_mangle]
pub extern "C" fn fat_string_trim(s: Handle, cutset: Handle) -> Handle {
    new_string(strings::trim(&string(s), &string(cutset)))
}

#[no_mangle]
pub extern "C" fn fat_string_trim_prefix(s: Handle, prefix: Handle) -> Handle {
    new_string(strings::trim_prefix(&string(s), &string(prefix)))
}

#[no_mangle]
pub extern "C" fn fat_string_trim_suffix(s: Handle, suffix: Handle) -> Handle {
    new_string(strings::trim_suffix(&string(s), &string(suffix)))
}

/// Returns 1 when `sep` was found. Otherwise `before_out` gets a copy of `s`
/// and `after_out` an empty string.
#[no_mangle]
pub unsafe extern "C" fn fat_string_cut(s: Handle, sep: Handle, before_out: *mut Handle, after_out: *mut Handle) -> i32 {
    const OP: &str = "fat_string_cut";
    let before_out = out_param(OP, "before_out", before_out);
    let after_out = out_param(OP, "after_out", after_out);
    let s = string(s);
    let (before, after, found) = strings::cut(&s, &string(sep));
    *before_out = new_string(before);
    *after_out = new_string(after);
    i32::from(found)
}

#[no_mangle]
pub unsafe extern "C" fn fat_string_cut_prefix(s: Handle, prefix: Handle, after_out: *mut Handle) -> i32 {
    let after_out = out_param("fat_string_cut_prefix", "after_out", after_out);
    let s = string(s);
    let (after, found) = strings::cut_prefix(&s, &string(prefix));
    *after_out = new_string(after);
    i32::from(found)
}

#[no_mangle]
pub unsafe extern "C" fn fat_string_cut_suffix(s: Handle, suffix: Handle, before_out: *mut Handle) -> i32 {
    let before_out = out_param("fat_string_cut_suffix", "before_out", before_out);
    let s = string(s);
    let (before, found) = strings::cut_suffix(&s, &string(suffix));
    *before_out = new_string(before);
    i32::from(found)
}

#[no_mangle]
pub extern "C" fn fat_string_contains_any(s: Handle, chars: Handle) -> bool {
    strings::contains_any(&string(s), &string(chars))
}

/// Byte index of the first character of `s` found in `chars`, or -1.
#[no_mangle]
pub extern "C" fn fat_string_index_any(s: Handle, chars: Handle) -> i32 {
    strings::index_any(&string(s), &string(chars))
}

/// Strings are repaired on entry, so this always returns a copy of `s`.
#[no_mangle]
pub extern "C" fn fat_string_to_valid_utf8(s: Handle, replacement: Handle) -> Handle {
    registry().resolve::<String>(replacement);
    new_string(string(s).as_str())
}

#[no_mangle]
pub extern "C" fn fat_string_split(s: Handle, sep: Handle) -> Handle {
    new_string_array(strings::split(&string(s), &string(sep)))
}

#[no_mangle]
pub extern "C" fn fat_string_split_n(s: Handle, sep: Handle, n: i32) -> Handle {
    new_string_array(strings::split_n(&string(s), &string(sep), n))
}

#[no_mangle]
pub extern "C" fn fat_string_fields(s: Handle) -> Handle {
    new_string_array(strings::fields(&string(s)))
}

#[no_mangle]
pub extern "C" fn fat_string_join(parts: Handle, sep: Handle) -> Handle {
    let parts = registry().resolve::<Vec<String>>(parts);
    new_string(parts.join(string(sep).as_str()))
}

#[no_mangle]
pub extern "C" fn fat_string_replace(s: Handle, old: Handle, new: Handle, n: i32) -> Handle {
    new_string(strings::replace(&string(s), &string(old), &string(new), n))
}

#[no_mangle]
pub extern "C" fn fat_string_replace_all(s: Handle, old: Handle, new: Handle) -> Handle {
    new_string(strings::replace(&string(s), &string(old), &string(new), -1))
}

#[no_mangle]
pub extern "C" fn fat_string_to_lower(s: Handle) -> Handle {
    new_string(strings::to_lower(&string(s)))
}

#[no_mangle]
pub extern "C" fn fat_string_to_upper(s: Handle) -> Handle {
    new_string(strings::to_upper(&string(s)))
}

/// Byte index of the first `substr`, or -1.
#[no_mangle]
pub extern "C" fn fat_string_index(s: Handle, substr: Handle) -> i32 {
    strings::index(&string(s), &string(substr))
}

#[no_mangle]
pub extern "C" fn fat_string_count(s: Handle, substr: Handle) -> i32 {
    strings::count(&string(s), &string(substr))
}

#[no_mangle]
pub extern "C" fn fat_string_compare(a: Handle, b: Handle) -> i32 {
    strings::compare(&string(a), &string(b))
}

#[no_mangle]
pub extern "C" fn fat_string_equal_fold(a: Handle, b: Handle) -> bool {
    strings::equal_fold(&string(a), &string(b))
}

#[no_mangle]
pub extern "C" fn fat_string_repeat(s: Handle, count: i64) -> Handle {
    const OP: &str = "fat_string_repeat";
    if count < 0 {
        misuse(OP, "negative repeat count");
    }
    let s = string(s);
    let total = (s.len() as u64).saturating_mul(count as u64);
    in_len(OP, "result", usize::try_from(total).unwrap_or(usize::MAX));
    new_string(s.repeat(count as usize))
}

#[no_mangle]
pub extern "C" fn fat_string_free(s: Handle) {
    registry().release::<String>(s);
}

// =============================================================================
// StringArray
// =============================================================================

#[no_mangle]
pub extern "C" fn fat_string_array_len(a: Handle) -> usize {
    registry().resolve::<Vec<String>>(a).len()
}

/// Element `idx` as a new string handle. Out of range is a contract violation.
#[no_mangle]
pub extern "C" fn fat_string_array_get(a: Handle, idx: usize) -> Handle {
    let parts = registry().resolve::<Vec<String>>(a);
    match parts.get(idx) {
        Some(part) => new_string(part.as_str()),
        None => misuse(
            "fat_string_array_get",
            format!("index {} out of range (len {})", idx, parts.len()),
        ),
    }
}

#[no_mangle]
pub extern "C" fn fat_string_array_free(a: Handle) {
    registry().release::<Vec<String>>(a);
}

// =============================================================================
// StringBuilder
// =============================================================================

#[no_mangle]
pub extern "C" fn fat_string_builder_new() -> Handle {
    registry().register(StringBuilder::new())
}

#[no_mangle]
pub extern "C" fn fat_string_builder_len(b: Handle) -> usize {
    registry().resolve::<StringBuilder>(b).len()
}

#[no_mangle]
pub extern "C" fn fat_string_builder_cap(b: Handle) -> usize {
    registry().resolve::<StringBuilder>(b).capacity()
}

#[no_mangle]
pub extern "C" fn fat_string_builder_grow(b: Handle, n: usize) {
    let n = in_len("fat_string_builder_grow", "n", n);
    registry().resolve::<StringBuilder>(b).grow(n);
}

#[no_mangle]
pub extern "C" fn fat_string_builder_reset(b: Handle) {
    registry().resolve::<StringBuilder>(b).reset();
}

#[no_mangle]
pub unsafe extern "C" fn fat_string_builder_write(b: Handle, bytes: *const u8, len: usize) -> usize {
    let span = in_slice("fat_string_builder_write", "bytes", bytes, len);
    registry().resolve::<StringBuilder>(b).write(span)
}

#[no_mangle]
pub extern "C" fn fat_string_builder_write_byte(b: Handle, c: u8) {
    registry().resolve::<StringBuilder>(b).write_byte(c);
}

#[no_mangle]
pub extern "C" fn fat_string_builder_write_string(b: Handle, s: Handle) -> usize {
    let builder = registry().resolve::<StringBuilder>(b);
    builder.write_str(&string(s))
}

#[no_mangle]
pub extern "C" fn fat_string_builder_string(b: Handle) -> Handle {
    new_string(registry().resolve::<StringBuilder>(b).string())
}

#[no_mangle]
pub extern "C" fn fat_string_builder_free(b: Handle) {
    registry().release::<StringBuilder>(b);
}

// =============================================================================
// StringReader
// =============================================================================

fn string_reader(r: Handle) -> std::sync::Arc<StringReader> {
    registry().resolve::<StringReader>(r)
}

#[no_mangle]
pub extern "C" fn fat_string_reader_new(s: Handle) -> Handle {
    let reader = StringReader::new(&string(s));
    registry().register(reader)
}

/// Unread bytes.
#[no_mangle]
pub extern "C" fn fat_string_reader_len(r: Handle) -> usize {
    string_reader(r).len()
}

#[no_mangle]
pub extern "C" fn fat_string_reader_size(r: Handle) -> i64 {
    string_reader(r).size()
}

#[no_mangle]
pub extern "C" fn fat_string_reader_reset(r: Handle, s: Handle) {
    string_reader(r).reset(&string(s));
}

#[no_mangle]
pub unsafe extern "C" fn fat_string_reader_read(r: Handle, dst: *mut u8, len: usize, eof_out: *mut bool) -> usize {
    const OP: &str = "fat_string_reader_read";
    let eof_out = out_param(OP, "eof_out", eof_out);
    let dst = out_slice(OP, "dst", dst, len);
    let outcome = string_reader(r).read(dst);
    *eof_out = outcome.eof;
    outcome.n
}

#[no_mangle]
pub unsafe extern "C" fn fat_string_reader_read_at(
    r: Handle,
    dst: *mut u8,
    len: usize,
    off: i64,
    eof_out: *mut bool,
) -> usize {
    const OP: &str = "fat_string_reader_read_at";
    let eof_out = out_param(OP, "eof_out", eof_out);
    let dst = out_slice(OP, "dst", dst, len);
    let outcome = string_reader(r).read_at(dst, off);
    *eof_out = outcome.eof;
    outcome.n
}

/// Returns false with `eof_out` set when nothing is left.
#[no_mangle]
pub unsafe extern "C" fn fat_string_reader_read_byte(r: Handle, byte_out: *mut u8, eof_out: *mut bool) -> bool {
    const OP: &str = "fat_string_reader_read_byte";
    let byte_out = out_param(OP, "byte_out", byte_out);
    let eof_out = out_param(OP, "eof_out", eof_out);
    match string_reader(r).read_byte() {
        Some(byte) => {
            *byte_out = byte;
            *eof_out = false;
            true
        }
        None => {
            *byte_out = 0;
            *eof_out = true;
            false
        }
    }
}

#[no_mangle]
pub extern "C" fn fat_string_reader_unread_byte(r: Handle) {
    string_reader(r).unread_byte();
}

#[no_mangle]
pub extern "C" fn fat_string_reader_seek(r: Handle, offset: i64, whence: i32) -> i64 {
    string_reader(r).seek(offset, whence)
}

/// Drain the unread text into a builder; returns bytes moved.
#[no_mangle]
pub extern "C" fn fat_string_reader_write_to_builder(r: Handle, b: Handle) -> i64 {
    let reader = string_reader(r);
    let builder = registry().resolve::<StringBuilder>(b);
    builder.with_tail(|sink| reader.write_to(sink))
}

#[no_mangle]
pub extern "C" fn fat_string_reader_free(r: Handle) {
    registry().release::<StringReader>(r);
}
