//! Base64, compression, CSV, JSON and conv exports.

use std::sync::Arc;

use serde_json::Value;

use super::{finish, finish_unit, in_handles, in_slice, new_bytes, new_string, out_param, registry};
use crate::bytes::BytesBuffer;
use crate::codec::base64::{Base64Encoder, Base64Encoding, StandardVariant};
use crate::codec::compress::{self, Format};
use crate::codec::csv::{CsvReader, CsvWriter};
use crate::codec::{conv, json, quote};
use crate::contract::misuse;
use crate::handles::Handle;
use crate::status::Status;

fn bytes_of(h: Handle) -> Arc<Vec<u8>> {
    registry().resolve::<Vec<u8>>(h)
}

fn string(h: Handle) -> Arc<String> {
    registry().resolve::<String>(h)
}

// =============================================================================
// Base64
// =============================================================================

fn encoding(h: Handle) -> Arc<Base64Encoding> {
    registry().resolve::<Base64Encoding>(h)
}

/// Built-in encoding: 0 std, 1 url, 2 raw std, 3 raw url.
#[no_mangle]
pub extern "C" fn fat_base64_encoding_new_standard(variant: i32) -> Handle {
    match StandardVariant::from_index(variant) {
        Some(v) => registry().register(Base64Encoding::standard(v)),
        None => misuse(
            "fat_base64_encoding_new_standard",
            format!("unknown variant {}", variant),
        ),
    }
}

#[no_mangle]
pub unsafe extern "C" fn fat_base64_encoding_new_utf8(
    alphabet: *const std::ffi::c_char,
    out_enc: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_base64_encoding_new_utf8";
    let out_enc = out_param(OP, "out_enc", out_enc);
    let out_err = out_param(OP, "out_err", out_err);
    let alphabet = super::in_cstr(OP, "alphabet", alphabet);
    let result = Base64Encoding::new(&alphabet).map(|enc| registry().register(enc));
    finish(result, out_enc, out_err)
}

#[no_mangle]
pub extern "C" fn fat_base64_encoding_strict(enc: Handle) -> Handle {
    let strict = encoding(enc).strict();
    registry().register(strict)
}

/// `-1` for no padding, else a rune up to 0xFF that is neither CR, LF nor
/// in the alphabet. Anything else is a `Range` failure.
#[no_mangle]
pub unsafe extern "C" fn fat_base64_encoding_with_padding(
    enc: Handle,
    padding_rune: i32,
    out_enc: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_base64_encoding_with_padding";
    let out_enc = out_param(OP, "out_enc", out_enc);
    let out_err = out_param(OP, "out_err", out_err);
    let result = encoding(enc)
        .with_padding(padding_rune)
        .map(|padded| registry().register(padded));
    finish(result, out_enc, out_err)
}

fn length_arg(op: &'static str, n: i32) -> usize {
    match usize::try_from(n) {
        Ok(n) => n,
        Err(_) => misuse(op, "negative length"),
    }
}

fn length_result(op: &'static str, n: usize) -> i32 {
    match i32::try_from(n) {
        Ok(n) => n,
        Err(_) => misuse(op, format!("length {} does not fit in an int", n)),
    }
}

/// Encoded size of `n` bytes. A result past `INT_MAX` is a violation.
#[no_mangle]
pub extern "C" fn fat_base64_encoded_len(enc: Handle, n: i32) -> i32 {
    const OP: &str = "fat_base64_encoded_len";
    length_result(OP, encoding(enc).encoded_len(length_arg(OP, n)))
}

#[no_mangle]
pub extern "C" fn fat_base64_decoded_len(enc: Handle, n: i32) -> i32 {
    const OP: &str = "fat_base64_decoded_len";
    length_result(OP, encoding(enc).decoded_len(length_arg(OP, n)))
}

#[no_mangle]
pub extern "C" fn fat_base64_encode_to_string(enc: Handle, src: Handle) -> Handle {
    new_string(encoding(enc).encode_to_string(&bytes_of(src)))
}

#[no_mangle]
pub extern "C" fn fat_base64_encode(enc: Handle, src: Handle) -> Handle {
    new_bytes(encoding(enc).encode(&bytes_of(src)))
}

#[no_mangle]
pub unsafe extern "C" fn fat_base64_decode_string(
    enc: Handle,
    s: Handle,
    out: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_base64_decode_string";
    let out = out_param(OP, "out", out);
    let out_err = out_param(OP, "out_err", out_err);
    let result = encoding(enc).decode(string(s).as_bytes()).map(new_bytes);
    finish(result, out, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_base64_decode(
    enc: Handle,
    src: Handle,
    out: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_base64_decode";
    let out = out_param(OP, "out", out);
    let out_err = out_param(OP, "out_err", out_err);
    let result = encoding(enc).decode(&bytes_of(src)).map(new_bytes);
    finish(result, out, out_err)
}

#[no_mangle]
pub extern "C" fn fat_base64_encoding_free(enc: Handle) {
    registry().release::<Base64Encoding>(enc);
}

/// Streaming encoder appending to `dst`. The buffer must outlive the encoder.
#[no_mangle]
pub unsafe extern "C" fn fat_base64_encoder_new_to_bytes_buffer(
    enc: Handle,
    dst: Handle,
    out_encoder: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_base64_encoder_new_to_bytes_buffer";
    let out_encoder = out_param(OP, "out_encoder", out_encoder);
    let out_err = out_param(OP, "out_err", out_err);
    let encoding = Base64Encoding::clone(&encoding(enc));
    registry().resolve::<BytesBuffer>(dst);
    let encoder = registry().register(Base64Encoder::new(encoding, dst));
    finish(Ok(encoder), out_encoder, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_base64_encoder_write(
    e: Handle,
    bytes: *const u8,
    len: usize,
    out_n: *mut usize,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_base64_encoder_write";
    let out_n = out_param(OP, "out_n", out_n);
    let out_err = out_param(OP, "out_err", out_err);
    let span = in_slice(OP, "bytes", bytes, len);
    let reg = registry();
    let result = reg.resolve::<Base64Encoder>(e).write(reg, span);
    finish(result, out_n, out_err)
}

/// Flush padding and free the encoder handle.
#[no_mangle]
pub unsafe extern "C" fn fat_base64_encoder_close(e: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_base64_encoder_close", "out_err", out_err);
    let reg = registry();
    let result = reg.release::<Base64Encoder>(e).close(reg);
    finish_unit(result, out_err)
}

// =============================================================================
// Compression
// =============================================================================

unsafe fn run_codec(
    op: &'static str,
    src: Handle,
    out: *mut Handle,
    out_err: *mut Handle,
    codec: impl FnOnce(&[u8]) -> crate::status::FatResult<Vec<u8>>,
) -> Status {
    let out = out_param(op, "out", out);
    let out_err = out_param(op, "out_err", out_err);
    let result = codec(&bytes_of(src)).map(new_bytes);
    finish(result, out, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_flate_compress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_flate_compress", src, out, out_err, |b| compress::compress(Format::Flate, b))
}

#[no_mangle]
pub unsafe extern "C" fn fat_flate_decompress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_flate_decompress", src, out, out_err, |b| compress::decompress(Format::Flate, b))
}

#[no_mangle]
pub unsafe extern "C" fn fat_gzip_compress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_gzip_compress", src, out, out_err, |b| compress::compress(Format::Gzip, b))
}

#[no_mangle]
pub unsafe extern "C" fn fat_gzip_decompress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_gzip_decompress", src, out, out_err, |b| compress::decompress(Format::Gzip, b))
}

#[no_mangle]
pub unsafe extern "C" fn fat_zlib_compress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_zlib_compress", src, out, out_err, |b| compress::compress(Format::Zlib, b))
}

#[no_mangle]
pub unsafe extern "C" fn fat_zlib_decompress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_zlib_decompress", src, out, out_err, |b| compress::decompress(Format::Zlib, b))
}

#[no_mangle]
pub unsafe extern "C" fn fat_bzip2_compress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_bzip2_compress", src, out, out_err, |b| compress::compress(Format::Bzip2, b))
}

/// Concatenated streams decode as one. Corrupt input is `Syntax`.
#[no_mangle]
pub unsafe extern "C" fn fat_bzip2_decompress(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_bzip2_decompress", src, out, out_err, |b| compress::decompress(Format::Bzip2, b))
}

/// `order` 0 is LSB first, 1 is MSB first; `lit_width` is 2 to 8.
#[no_mangle]
pub unsafe extern "C" fn fat_lzw_compress(
    src: Handle,
    order: i32,
    lit_width: u8,
    out: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    run_codec("fat_lzw_compress", src, out, out_err, |b| compress::lzw_compress(b, order, lit_width))
}

#[no_mangle]
pub unsafe extern "C" fn fat_lzw_decompress(
    src: Handle,
    order: i32,
    lit_width: u8,
    out: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    run_codec("fat_lzw_decompress", src, out, out_err, |b| compress::lzw_decompress(b, order, lit_width))
}

// =============================================================================
// CSV
// =============================================================================

/// Reader over a copy of `b`; the bytes handle may be freed afterwards.
#[no_mangle]
pub extern "C" fn fat_csv_reader_new_bytes(b: Handle) -> Handle {
    registry().register(CsvReader::from_bytes(bytes_of(b).to_vec()))
}

/// Read one record into a new string array. At the end of input `out_eof`
/// is set and the status is `Eof`.
#[no_mangle]
pub unsafe extern "C" fn fat_csv_reader_read(
    r: Handle,
    out_record: *mut Handle,
    out_eof: *mut bool,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_csv_reader_read";
    let out_record = out_param(OP, "out_record", out_record);
    let out_eof = out_param(OP, "out_eof", out_eof);
    let out_err = out_param(OP, "out_err", out_err);
    let reg = registry();
    let result = reg
        .resolve::<CsvReader>(r)
        .read()
        .map(|record| reg.register::<Vec<String>>(record));
    let status = finish(result, out_record, out_err);
    *out_eof = status == Status::Eof;
    status
}

#[no_mangle]
pub extern "C" fn fat_csv_reader_input_offset(r: Handle) -> i64 {
    registry().resolve::<CsvReader>(r).input_offset()
}

#[no_mangle]
pub extern "C" fn fat_csv_reader_free(r: Handle) {
    registry().release::<CsvReader>(r);
}

#[no_mangle]
pub extern "C" fn fat_csv_writer_new_to_bytes_buffer(dst: Handle) -> Handle {
    let reg = registry();
    let dst = reg.resolve::<BytesBuffer>(dst);
    reg.register(CsvWriter::new(dst))
}

/// Write one record built from `n` string handles.
#[no_mangle]
pub unsafe extern "C" fn fat_csv_writer_write_record(
    w: Handle,
    fields: *const Handle,
    n: usize,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_csv_writer_write_record";
    let out_err = out_param(OP, "out_err", out_err);
    let record: Vec<Arc<String>> = in_handles(OP, "fields", fields, n)
        .iter()
        .map(|&h| string(h))
        .collect();
    let writer = registry().resolve::<CsvWriter>(w);
    let record: Vec<&str> = record.iter().map(|s| s.as_str()).collect();
    finish_unit(writer.write_record(&record), out_err)
}

#[no_mangle]
pub extern "C" fn fat_csv_writer_flush(w: Handle) {
    registry().resolve::<CsvWriter>(w).flush();
}

/// First failure from an earlier write or flush.
#[no_mangle]
pub unsafe extern "C" fn fat_csv_writer_error(w: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_csv_writer_error", "out_err", out_err);
    finish_unit(registry().resolve::<CsvWriter>(w).error(), out_err)
}

#[no_mangle]
pub extern "C" fn fat_csv_writer_free(w: Handle) {
    registry().release::<CsvWriter>(w);
}

// =============================================================================
// JSON
// =============================================================================

fn json_value(v: Handle) -> Arc<Value> {
    registry().resolve::<Value>(v)
}

#[no_mangle]
pub extern "C" fn fat_json_valid(data: Handle) -> bool {
    json::valid(&bytes_of(data))
}

#[no_mangle]
pub unsafe extern "C" fn fat_json_compact(src: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    run_codec("fat_json_compact", src, out, out_err, json::compact)
}

#[no_mangle]
pub unsafe extern "C" fn fat_json_indent(
    src: Handle,
    prefix: Handle,
    indent: Handle,
    out: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    let prefix = string(prefix);
    let indent = string(indent);
    run_codec("fat_json_indent", src, out, out_err, |b| json::indent(b, &prefix, &indent))
}

/// Decode one value. Empty input reports EOF.
#[no_mangle]
pub unsafe extern "C" fn fat_json_unmarshal(data: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_json_unmarshal";
    let out = out_param(OP, "out", out);
    let out_err = out_param(OP, "out_err", out_err);
    let result = json::unmarshal(&bytes_of(data)).map(|v| registry().register(v));
    finish(result, out, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_json_marshal(v: Handle, out: *mut Handle, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_json_marshal";
    let out = out_param(OP, "out", out);
    let out_err = out_param(OP, "out_err", out_err);
    let result = json::marshal(&json_value(v)).map(new_bytes);
    finish(result, out, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_json_marshal_indent(
    v: Handle,
    prefix: Handle,
    indent: Handle,
    out: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_json_marshal_indent";
    let out = out_param(OP, "out", out);
    let out_err = out_param(OP, "out_err", out_err);
    let result = json::marshal_indent(&json_value(v), &string(prefix), &string(indent)).map(new_bytes);
    finish(result, out, out_err)
}

#[no_mangle]
pub extern "C" fn fat_json_value_free(v: Handle) {
    registry().release::<Value>(v);
}

/// 0 null, 1 bool, 2 number, 3 string, 4 array, 5 object.
#[no_mangle]
pub extern "C" fn fat_json_value_type(v: Handle) -> i32 {
    json::kind_of(&json_value(v)) as i32
}

#[no_mangle]
pub extern "C" fn fat_json_value_as_bool(v: Handle) -> bool {
    json::as_bool(&json_value(v))
}

#[no_mangle]
pub extern "C" fn fat_json_value_as_string(v: Handle) -> Handle {
    new_string(json::as_string(&json_value(v)))
}

/// Number text; integers are exact, floats use the shortest round-trip form.
#[no_mangle]
pub extern "C" fn fat_json_value_as_number_string(v: Handle) -> Handle {
    new_string(json::as_number_string(&json_value(v)))
}

#[no_mangle]
pub extern "C" fn fat_json_array_len(v: Handle) -> usize {
    json::array_len(&json_value(v))
}

#[no_mangle]
pub extern "C" fn fat_json_array_get(v: Handle, idx: usize) -> Handle {
    let item = json::array_get(&json_value(v), idx);
    registry().register(item)
}

/// Member names, sorted, as a string array.
#[no_mangle]
pub extern "C" fn fat_json_object_keys(v: Handle) -> Handle {
    let keys = json::object_keys(&json_value(v));
    registry().register::<Vec<String>>(keys)
}

/// Look up `key`; `out_value` is 0 when absent.
#[no_mangle]
pub unsafe extern "C" fn fat_json_object_get(
    v: Handle,
    key: Handle,
    out_found: *mut bool,
    out_value: *mut Handle,
) {
    const OP: &str = "fat_json_object_get";
    let out_found = out_param(OP, "out_found", out_found);
    let out_value = out_param(OP, "out_value", out_value);
    match json::object_get(&json_value(v), &string(key)) {
        Some(member) => {
            *out_found = true;
            *out_value = registry().register(member);
        }
        None => {
            *out_found = false;
            *out_value = 0;
        }
    }
}

// =============================================================================
// Conv
// =============================================================================

#[no_mangle]
pub unsafe extern "C" fn fat_conv_parse_bool(s: Handle, out_value: *mut bool, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_conv_parse_bool";
    let out_value = out_param(OP, "out_value", out_value);
    let out_err = out_param(OP, "out_err", out_err);
    finish(conv::parse_bool(&string(s)), out_value, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_conv_parse_int(
    s: Handle,
    base: i32,
    bit_size: i32,
    out_value: *mut i64,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_conv_parse_int";
    let out_value = out_param(OP, "out_value", out_value);
    let out_err = out_param(OP, "out_err", out_err);
    finish(conv::parse_int(&string(s), base, bit_size), out_value, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_conv_parse_uint(
    s: Handle,
    base: i32,
    bit_size: i32,
    out_value: *mut u64,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_conv_parse_uint";
    let out_value = out_param(OP, "out_value", out_value);
    let out_err = out_param(OP, "out_err", out_err);
    finish(conv::parse_uint(&string(s), base, bit_size), out_value, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_conv_parse_float(
    s: Handle,
    bit_size: i32,
    out_value: *mut f64,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_conv_parse_float";
    let out_value = out_param(OP, "out_value", out_value);
    let out_err = out_param(OP, "out_err", out_err);
    finish(conv::parse_float(&string(s), bit_size), out_value, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_conv_atoi(s: Handle, out_value: *mut i64, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_conv_atoi";
    let out_value = out_param(OP, "out_value", out_value);
    let out_err = out_param(OP, "out_err", out_err);
    finish(conv::atoi(&string(s)), out_value, out_err)
}

#[no_mangle]
pub extern "C" fn fat_conv_format_bool(b: bool) -> Handle {
    new_string(conv::format_bool(b))
}

#[no_mangle]
pub extern "C" fn fat_conv_format_int(i: i64, base: i32) -> Handle {
    new_string(conv::format_int(i, base))
}

#[no_mangle]
pub extern "C" fn fat_conv_format_uint(i: u64, base: i32) -> Handle {
    new_string(conv::format_uint(i, base))
}

#[no_mangle]
pub extern "C" fn fat_conv_itoa(i: i64) -> Handle {
    new_string(conv::itoa(i))
}

/// `fmt` is one of `b e E f g G`; a negative `prec` means shortest.
/// `bit_size` must be 32 or 64.
#[no_mangle]
pub extern "C" fn fat_conv_format_float(f: f64, fmt: u8, prec: i32, bit_size: i32) -> Handle {
    new_string(conv::format_float(f, fmt, prec, bit_size))
}

#[no_mangle]
pub extern "C" fn fat_conv_quote(s: Handle) -> Handle {
    new_string(quote::quote(&string(s)))
}

#[no_mangle]
pub extern "C" fn fat_conv_quote_to_ascii(s: Handle) -> Handle {
    new_string(quote::quote_to_ascii(&string(s)))
}

#[no_mangle]
pub extern "C" fn fat_conv_quote_rune(r: u32) -> Handle {
    new_string(quote::quote_rune(r))
}

#[no_mangle]
pub extern "C" fn fat_conv_quote_rune_to_ascii(r: u32) -> Handle {
    new_string(quote::quote_rune_to_ascii(r))
}

#[no_mangle]
pub unsafe extern "C" fn fat_conv_unquote(s: Handle, out_value: *mut Handle, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_conv_unquote";
    let out_value = out_param(OP, "out_value", out_value);
    let out_err = out_param(OP, "out_err", out_err);
    finish(quote::unquote(&string(s)).map(new_string), out_value, out_err)
}

/// The leading quoted literal of `s`, quotes included.
#[no_mangle]
pub unsafe extern "C" fn fat_conv_quoted_prefix(s: Handle, out_value: *mut Handle, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_conv_quoted_prefix";
    let out_value = out_param(OP, "out_value", out_value);
    let out_err = out_param(OP, "out_err", out_err);
    finish(quote::quoted_prefix(&string(s)).map(new_string), out_value, out_err)
}

#[no_mangle]
pub extern "C" fn fat_conv_can_backquote(s: Handle) -> bool {
    quote::can_backquote(&string(s))
}
