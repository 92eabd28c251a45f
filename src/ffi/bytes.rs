//! Bytes, bytes array, bytes buffer and bytes reader exports.

use std::sync::Arc;

use super::{copy_out, in_len, in_slice, new_bytes, new_string, out_param, out_slice, registry};
use crate::bytes::{self, BytesBuffer, BytesReader};
use crate::contract::misuse;
use crate::handles::Handle;
use crate::text::StringReader;

fn bytes_of(h: Handle) -> Arc<Vec<u8>> {
    registry().resolve::<Vec<u8>>(h)
}

// =============================================================================
// Bytes
// =============================================================================

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_new_n(bytes: *const u8, len: usize) -> Handle {
    new_bytes(in_slice("fat_bytes_new_n", "bytes", bytes, len))
}

#[no_mangle]
pub extern "C" fn fat_bytes_from_string(s: Handle) -> Handle {
    new_bytes(registry().resolve::<String>(s).as_bytes())
}

#[no_mangle]
pub extern "C" fn fat_bytes_len(b: Handle) -> usize {
    bytes_of(b).len()
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_copy_out(b: Handle, dst: *mut u8, dst_len: usize) -> usize {
    let dst = out_slice("fat_bytes_copy_out", "dst", dst, dst_len);
    copy_out(&bytes_of(b), dst)
}

#[no_mangle]
pub extern "C" fn fat_bytes_clone(b: Handle) -> Handle {
    new_bytes(bytes_of(b).as_slice())
}

/// Text view of the bytes; invalid UTF-8 becomes U+FFFD.
#[no_mangle]
pub extern "C" fn fat_bytes_to_string(b: Handle) -> Handle {
    new_string(String::from_utf8_lossy(&bytes_of(b)))
}

#[no_mangle]
pub extern "C" fn fat_bytes_contains(b: Handle, subslice: Handle) -> bool {
    bytes::contains(&bytes_of(b), &bytes_of(subslice))
}

#[no_mangle]
pub extern "C" fn fat_bytes_has_prefix(s: Handle, prefix: Handle) -> bool {
    bytes_of(s).starts_with(&bytes_of(prefix))
}

#[no_mangle]
pub extern "C" fn fat_bytes_has_suffix(s: Handle, suffix: Handle) -> bool {
    bytes_of(s).ends_with(&bytes_of(suffix))
}

#[no_mangle]
pub extern "C" fn fat_bytes_index(s: Handle, sep: Handle) -> i32 {
    bytes::index(&bytes_of(s), &bytes_of(sep))
}

#[no_mangle]
pub extern "C" fn fat_bytes_count(s: Handle, sep: Handle) -> i32 {
    bytes::count(&bytes_of(s), &bytes_of(sep))
}

#[no_mangle]
pub extern "C" fn fat_bytes_equal(a: Handle, b: Handle) -> bool {
    bytes_of(a) == bytes_of(b)
}

#[no_mangle]
pub extern "C" fn fat_bytes_compare(a: Handle, b: Handle) -> i32 {
    bytes::compare(&bytes_of(a), &bytes_of(b))
}

#[no_mangle]
pub extern "C" fn fat_bytes_to_lower(s: Handle) -> Handle {
    new_bytes(bytes::to_lower(&bytes_of(s)))
}

#[no_mangle]
pub extern "C" fn fat_bytes_to_upper(s: Handle) -> Handle {
    new_bytes(bytes::to_upper(&bytes_of(s)))
}

#[no_mangle]
pub extern "C" fn fat_bytes_trim_space(s: Handle) -> Handle {
    new_bytes(bytes::trim_space(&bytes_of(s)))
}

#[no_mangle]
pub extern "C" fn fat_bytes_trim(s: Handle, cutset: Handle) -> Handle {
    let cutset = registry().resolve::<String>(cutset);
    new_bytes(bytes::trim(&bytes_of(s), &cutset))
}

#[no_mangle]
pub extern "C" fn fat_bytes_split(s: Handle, sep: Handle) -> Handle {
    let parts = bytes::split(&bytes_of(s), &bytes_of(sep));
    registry().register::<Vec<Vec<u8>>>(parts)
}

#[no_mangle]
pub extern "C" fn fat_bytes_join(parts: Handle, sep: Handle) -> Handle {
    let parts = registry().resolve::<Vec<Vec<u8>>>(parts);
    new_bytes(bytes::join(&parts, &bytes_of(sep)))
}

#[no_mangle]
pub extern "C" fn fat_bytes_replace(s: Handle, old: Handle, new: Handle, n: i32) -> Handle {
    new_bytes(bytes::replace(&bytes_of(s), &bytes_of(old), &bytes_of(new), n))
}

#[no_mangle]
pub extern "C" fn fat_bytes_replace_all(s: Handle, old: Handle, new: Handle) -> Handle {
    new_bytes(bytes::replace(&bytes_of(s), &bytes_of(old), &bytes_of(new), -1))
}

#[no_mangle]
pub extern "C" fn fat_bytes_trim_prefix(s: Handle, prefix: Handle) -> Handle {
    new_bytes(bytes::trim_prefix(&bytes_of(s), &bytes_of(prefix)))
}

#[no_mangle]
pub extern "C" fn fat_bytes_trim_suffix(s: Handle, suffix: Handle) -> Handle {
    new_bytes(bytes::trim_suffix(&bytes_of(s), &bytes_of(suffix)))
}

/// Returns 1 when `sep` was found. Otherwise `before_out` gets a copy of `s`
/// and `after_out` empty bytes.
#[no_mangle]
pub unsafe extern "C" fn fat_bytes_cut(s: Handle, sep: Handle, before_out: *mut Handle, after_out: *mut Handle) -> i32 {
    const OP: &str = "fat_bytes_cut";
    let before_out = out_param(OP, "before_out", before_out);
    let after_out = out_param(OP, "after_out", after_out);
    let s = bytes_of(s);
    let (before, after, found) = bytes::cut(&s, &bytes_of(sep));
    *before_out = new_bytes(before);
    *after_out = new_bytes(after);
    i32::from(found)
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_cut_prefix(s: Handle, prefix: Handle, after_out: *mut Handle) -> i32 {
    let after_out = out_param("fat_bytes_cut_prefix", "after_out", after_out);
    let s = bytes_of(s);
    let (after, found) = bytes::cut_prefix(&s, &bytes_of(prefix));
    *after_out = new_bytes(after);
    i32::from(found)
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_cut_suffix(s: Handle, suffix: Handle, before_out: *mut Handle) -> i32 {
    let before_out = out_param("fat_bytes_cut_suffix", "before_out", before_out);
    let s = bytes_of(s);
    let (before, found) = bytes::cut_suffix(&s, &bytes_of(suffix));
    *before_out = new_bytes(before);
    i32::from(found)
}

#[no_mangle]
pub extern "C" fn fat_bytes_fields(s: Handle) -> Handle {
    let parts = bytes::fields(&bytes_of(s));
    registry().register::<Vec<Vec<u8>>>(parts)
}

#[no_mangle]
pub extern "C" fn fat_bytes_repeat(s: Handle, count: i64) -> Handle {
    const OP: &str = "fat_bytes_repeat";
    if count < 0 {
        misuse(OP, "negative repeat count");
    }
    let s = bytes_of(s);
    let total = (s.len() as u64).saturating_mul(count as u64);
    in_len(OP, "result", usize::try_from(total).unwrap_or(usize::MAX));
    new_bytes(s.repeat(count as usize))
}

#[no_mangle]
pub extern "C" fn fat_bytes_index_byte(s: Handle, c: u8) -> i32 {
    bytes::index_byte(&bytes_of(s), c)
}

/// `chars` is a string handle; returns a byte index or -1.
#[no_mangle]
pub extern "C" fn fat_bytes_index_any(s: Handle, chars: Handle) -> i32 {
    let chars = registry().resolve::<String>(chars);
    bytes::index_any(&bytes_of(s), &chars)
}

#[no_mangle]
pub extern "C" fn fat_bytes_to_valid_utf8(s: Handle, replacement: Handle) -> Handle {
    new_bytes(bytes::to_valid_utf8(&bytes_of(s), &bytes_of(replacement)))
}

#[no_mangle]
pub extern "C" fn fat_bytes_free(b: Handle) {
    registry().release::<Vec<u8>>(b);
}

// =============================================================================
// BytesArray
// =============================================================================

#[no_mangle]
pub extern "C" fn fat_bytes_array_len(a: Handle) -> usize {
    registry().resolve::<Vec<Vec<u8>>>(a).len()
}

#[no_mangle]
pub extern "C" fn fat_bytes_array_get(a: Handle, idx: usize) -> Handle {
    let parts = registry().resolve::<Vec<Vec<u8>>>(a);
    match parts.get(idx) {
        Some(part) => new_bytes(part.as_slice()),
        None => misuse(
            "fat_bytes_array_get",
            format!("index {} out of range (len {})", idx, parts.len()),
        ),
    }
}

#[no_mangle]
pub extern "C" fn fat_bytes_array_free(a: Handle) {
    registry().release::<Vec<Vec<u8>>>(a);
}

// =============================================================================
// BytesBuffer
// =============================================================================

fn buffer(b: Handle) -> Arc<BytesBuffer> {
    registry().resolve::<BytesBuffer>(b)
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_new() -> Handle {
    registry().register(BytesBuffer::new())
}

/// Buffer initialised with a copy of a bytes value.
#[no_mangle]
pub extern "C" fn fat_bytes_buffer_new_bytes(b: Handle) -> Handle {
    registry().register(BytesBuffer::from_vec(bytes_of(b).to_vec()))
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_buffer_new_n(bytes: *const u8, len: usize) -> Handle {
    let span = in_slice("fat_bytes_buffer_new_n", "bytes", bytes, len);
    registry().register(BytesBuffer::from_vec(span.to_vec()))
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_new_string(s: Handle) -> Handle {
    let text = registry().resolve::<String>(s);
    registry().register(BytesBuffer::from_vec(text.as_bytes().to_vec()))
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_len(b: Handle) -> usize {
    buffer(b).len()
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_cap(b: Handle) -> usize {
    buffer(b).capacity()
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_grow(b: Handle, n: usize) {
    let n = in_len("fat_bytes_buffer_grow", "n", n);
    buffer(b).grow(n);
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_reset(b: Handle) {
    buffer(b).reset();
}

/// Keep the first `n` unread bytes. `n` past the end is a contract violation.
#[no_mangle]
pub extern "C" fn fat_bytes_buffer_truncate(b: Handle, n: usize) {
    buffer(b).truncate(n);
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_buffer_write(b: Handle, bytes: *const u8, len: usize) -> usize {
    let span = in_slice("fat_bytes_buffer_write", "bytes", bytes, len);
    buffer(b).write(span)
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_write_byte(b: Handle, c: u8) {
    buffer(b).write_byte(c);
}

/// UTF-8 encode `r` (U+FFFD when invalid); returns bytes written.
#[no_mangle]
pub extern "C" fn fat_bytes_buffer_write_rune(b: Handle, r: u32) -> usize {
    buffer(b).write_rune(r)
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_write_string(b: Handle, s: Handle) -> usize {
    let text = registry().resolve::<String>(s);
    buffer(b).write(text.as_bytes())
}

/// Snapshot of the unread bytes.
#[no_mangle]
pub extern "C" fn fat_bytes_buffer_bytes(b: Handle) -> Handle {
    new_bytes(buffer(b).bytes())
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_string(b: Handle) -> Handle {
    new_string(buffer(b).string())
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_buffer_read(b: Handle, dst: *mut u8, len: usize, eof_out: *mut bool) -> usize {
    const OP: &str = "fat_bytes_buffer_read";
    let eof_out = out_param(OP, "eof_out", eof_out);
    let dst = out_slice(OP, "dst", dst, len);
    let outcome = buffer(b).read(dst);
    *eof_out = outcome.eof;
    outcome.n
}

/// Consume up to `n` bytes and return them as a new bytes value.
#[no_mangle]
pub extern "C" fn fat_bytes_buffer_next(b: Handle, n: usize) -> Handle {
    new_bytes(buffer(b).next(n))
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_buffer_read_byte(b: Handle, byte_out: *mut u8, eof_out: *mut bool) -> bool {
    const OP: &str = "fat_bytes_buffer_read_byte";
    let byte_out = out_param(OP, "byte_out", byte_out);
    let eof_out = out_param(OP, "eof_out", eof_out);
    let byte = buffer(b).read_byte();
    *byte_out = byte.unwrap_or(0);
    *eof_out = byte.is_none();
    byte.is_some()
}

/// Move every unread byte of `src` into `dst`.
#[no_mangle]
pub extern "C" fn fat_bytes_buffer_write_to_bytes_buffer(src: Handle, dst: Handle) -> i64 {
    buffer(src).write_to(&buffer(dst))
}

/// Drain a string reader into the buffer.
#[no_mangle]
pub extern "C" fn fat_bytes_buffer_read_from_string_reader(dst: Handle, r: Handle) -> i64 {
    let reader = registry().resolve::<StringReader>(r);
    buffer(dst).with_tail(|sink| reader.write_to(sink))
}

#[no_mangle]
pub extern "C" fn fat_bytes_buffer_free(b: Handle) {
    registry().release::<BytesBuffer>(b);
}

// =============================================================================
// BytesReader
// =============================================================================

fn bytes_reader(r: Handle) -> Arc<BytesReader> {
    registry().resolve::<BytesReader>(r)
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_new(b: Handle) -> Handle {
    registry().register(BytesReader::new(bytes_of(b).to_vec()))
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_len(r: Handle) -> usize {
    bytes_reader(r).len()
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_size(r: Handle) -> i64 {
    bytes_reader(r).size()
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_reset(r: Handle, b: Handle) {
    bytes_reader(r).reset(bytes_of(b).to_vec());
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_reader_read(r: Handle, dst: *mut u8, len: usize, eof_out: *mut bool) -> usize {
    const OP: &str = "fat_bytes_reader_read";
    let eof_out = out_param(OP, "eof_out", eof_out);
    let dst = out_slice(OP, "dst", dst, len);
    let outcome = bytes_reader(r).read(dst);
    *eof_out = outcome.eof;
    outcome.n
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_reader_read_at(
    r: Handle,
    dst: *mut u8,
    len: usize,
    off: i64,
    eof_out: *mut bool,
) -> usize {
    const OP: &str = "fat_bytes_reader_read_at";
    let eof_out = out_param(OP, "eof_out", eof_out);
    let dst = out_slice(OP, "dst", dst, len);
    let outcome = bytes_reader(r).read_at(dst, off);
    *eof_out = outcome.eof;
    outcome.n
}

#[no_mangle]
pub unsafe extern "C" fn fat_bytes_reader_read_byte(r: Handle, byte_out: *mut u8, eof_out: *mut bool) -> bool {
    const OP: &str = "fat_bytes_reader_read_byte";
    let byte_out = out_param(OP, "byte_out", byte_out);
    let eof_out = out_param(OP, "eof_out", eof_out);
    let byte = bytes_reader(r).read_byte();
    *byte_out = byte.unwrap_or(0);
    *eof_out = byte.is_none();
    byte.is_some()
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_unread_byte(r: Handle) {
    bytes_reader(r).unread_byte();
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_seek(r: Handle, offset: i64, whence: i32) -> i64 {
    bytes_reader(r).seek(offset, whence)
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_write_to_bytes_buffer(r: Handle, b: Handle) -> i64 {
    let reader = bytes_reader(r);
    buffer(b).with_tail(|sink| reader.write_to(sink))
}

#[no_mangle]
pub extern "C" fn fat_bytes_reader_free(r: Handle) {
    registry().release::<BytesReader>(r);
}
