//! Integration Tests for the C Exports
//!
//! Calls the `fat_*` symbols the way a foreign caller would: raw pointers,
//! out-parameters and handles. Only valid arguments are used here, since a
//! contract violation inside an `extern "C"` function aborts the process.

use std::ffi::{CStr, CString};

use fatstd::ffi::bytes::*;
use fatstd::ffi::codec::*;
use fatstd::ffi::error::*;
use fatstd::ffi::text::*;
use fatstd::status::codes;
use fatstd::{Handle, Status};

fn new_str(s: &str) -> Handle {
    let c = CString::new(s).unwrap();
    unsafe { fat_string_new_utf8_cstr(c.as_ptr()) }
}

fn read_str(h: Handle) -> String {
    let len = fat_string_len(h);
    let mut buf = vec![0u8; len];
    let n = unsafe { fat_string_copy_out(h, buf.as_mut_ptr(), buf.len()) };
    buf.truncate(n);
    String::from_utf8(buf).unwrap()
}

fn take_str(h: Handle) -> String {
    let s = read_str(h);
    fat_string_free(h);
    s
}

fn new_bytes(b: &[u8]) -> Handle {
    unsafe { fat_bytes_new_n(b.as_ptr(), b.len()) }
}

fn take_bytes(h: Handle) -> Vec<u8> {
    let mut buf = vec![0u8; fat_bytes_len(h)];
    let n = unsafe { fat_bytes_copy_out(h, buf.as_mut_ptr(), buf.len()) };
    buf.truncate(n);
    fat_bytes_free(h);
    buf
}

fn take_error(e: Handle) -> (i32, String) {
    let code = fat_error_code(e);
    let message = take_str(fat_error_message(e));
    fat_error_free(e);
    (code, message)
}

// =============================================================================
// Strings
// =============================================================================

#[test]
fn test_hello_round_trip() {
    let h = new_str("hello");
    assert_ne!(h, 0);
    assert_eq!(fat_string_len(h), 5);
    assert_eq!(take_str(h), "hello");
}

#[test]
fn test_copy_out_truncates_without_terminator() {
    let h = new_str("truncate me");
    let mut buf = [0xAAu8; 4];
    let n = unsafe { fat_string_copy_out(h, buf.as_mut_ptr(), buf.len()) };
    assert_eq!(n, 4);
    assert_eq!(&buf, b"trun");

    let n = unsafe { fat_string_copy_out(h, std::ptr::null_mut(), 0) };
    assert_eq!(n, 0);
    fat_string_free(h);
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let raw = [b'a', 0xFF, b'b'];
    let h = unsafe { fat_string_new_utf8_n(raw.as_ptr(), raw.len()) };
    assert_eq!(take_str(h), "a\u{FFFD}b");
}

#[test]
fn test_split_and_join() {
    let s = new_str("a,b,,c");
    let sep = new_str(",");
    let parts = fat_string_split(s, sep);
    assert_eq!(fat_string_array_len(parts), 4);
    assert_eq!(take_str(fat_string_array_get(parts, 1)), "b");
    assert_eq!(take_str(fat_string_array_get(parts, 2)), "");

    let dash = new_str("-");
    assert_eq!(take_str(fat_string_join(parts, dash)), "a-b--c");

    fat_string_array_free(parts);
    for h in [s, sep, dash] {
        fat_string_free(h);
    }
}

#[test]
fn test_builder_and_reader() {
    let b = fat_string_builder_new();
    let hello = new_str("hello, ");
    let world = new_str("world");
    assert_eq!(fat_string_builder_write_string(b, hello), 7);
    assert_eq!(fat_string_builder_write_string(b, world), 5);
    let built = fat_string_builder_string(b);
    fat_string_builder_free(b);

    let r = fat_string_reader_new(built);
    let mut buf = [0u8; 8];
    let mut eof = false;
    let n = unsafe { fat_string_reader_read(r, buf.as_mut_ptr(), buf.len(), &mut eof) };
    assert_eq!((n, eof), (8, false));
    assert_eq!(&buf, b"hello, w");
    let n = unsafe { fat_string_reader_read(r, buf.as_mut_ptr(), buf.len(), &mut eof) };
    assert_eq!((n, eof), (4, false));
    let n = unsafe { fat_string_reader_read(r, buf.as_mut_ptr(), buf.len(), &mut eof) };
    assert_eq!((n, eof), (0, true));

    fat_string_reader_free(r);
    for h in [hello, world, built] {
        fat_string_free(h);
    }
}

#[test]
fn test_string_cut_family() {
    let s = new_str("user=admin=1");
    let eq = new_str("=");
    let (mut before, mut after) = (0, 0);
    assert_eq!(unsafe { fat_string_cut(s, eq, &mut before, &mut after) }, 1);
    assert_eq!((take_str(before), take_str(after)), ("user".to_string(), "admin=1".to_string()));

    let colon = new_str(":");
    assert_eq!(unsafe { fat_string_cut(s, colon, &mut before, &mut after) }, 0);
    assert_eq!((take_str(before), take_str(after)), ("user=admin=1".to_string(), String::new()));

    let prefix = new_str("user=");
    let mut rest = 0;
    assert_eq!(unsafe { fat_string_cut_prefix(s, prefix, &mut rest) }, 1);
    assert_eq!(take_str(rest), "admin=1");
    let suffix = new_str("=2");
    assert_eq!(unsafe { fat_string_cut_suffix(s, suffix, &mut rest) }, 0);
    assert_eq!(take_str(rest), "user=admin=1");

    let chars = new_str("xyz=");
    assert_eq!(fat_string_index_any(s, chars), 4);
    assert!(fat_string_contains_any(s, chars));
    assert!(!fat_string_contains_any(s, colon));

    let repl = new_str("?");
    assert_eq!(take_str(fat_string_to_valid_utf8(s, repl)), "user=admin=1");

    for h in [s, eq, colon, prefix, suffix, chars, repl] {
        fat_string_free(h);
    }
}

// =============================================================================
// Bytes
// =============================================================================

#[test]
fn test_bytes_keep_interior_nul() {
    let h = new_bytes(b"a\0b");
    assert_eq!(fat_bytes_len(h), 3);
    assert_eq!(take_bytes(h), b"a\0b");
}

#[test]
fn test_buffer_write_then_drain() {
    let buf = fat_bytes_buffer_new();
    let data = b"0123456789";
    assert_eq!(unsafe { fat_bytes_buffer_write(buf, data.as_ptr(), data.len()) }, 10);
    assert_eq!(fat_bytes_buffer_len(buf), 10);

    let mut dst = [0u8; 6];
    let mut eof = false;
    let n = unsafe { fat_bytes_buffer_read(buf, dst.as_mut_ptr(), dst.len(), &mut eof) };
    assert_eq!((n, eof), (6, false));
    assert_eq!(take_bytes(fat_bytes_buffer_bytes(buf)), b"6789");

    fat_bytes_buffer_free(buf);
}

#[test]
fn test_bytes_cut_fields_and_repeat() {
    let s = new_bytes(b"key: value");
    let sep = new_bytes(b": ");
    let (mut before, mut after) = (0, 0);
    assert_eq!(unsafe { fat_bytes_cut(s, sep, &mut before, &mut after) }, 1);
    assert_eq!(take_bytes(before), b"key");
    assert_eq!(take_bytes(after), b"value");

    let fields = new_bytes(b"  a \t bb\nccc ");
    let parts = fat_bytes_fields(fields);
    assert_eq!(fat_bytes_array_len(parts), 3);
    assert_eq!(take_bytes(fat_bytes_array_get(parts, 2)), b"ccc");
    fat_bytes_array_free(parts);

    let ab = new_bytes(b"ab");
    assert_eq!(take_bytes(fat_bytes_repeat(ab, 3)), b"ababab");
    assert_eq!(take_bytes(fat_bytes_repeat(ab, 0)), b"");

    let prefix = new_bytes(b"key");
    assert_eq!(take_bytes(fat_bytes_trim_prefix(s, prefix)), b": value");
    let mut rest = 0;
    assert_eq!(unsafe { fat_bytes_cut_suffix(s, prefix, &mut rest) }, 0);
    assert_eq!(take_bytes(rest), b"key: value");

    assert_eq!(fat_bytes_index_byte(s, b':'), 3);
    let vowels = new_str("aeiou");
    assert_eq!(fat_bytes_index_any(s, vowels), 1);
    fat_string_free(vowels);

    let broken = new_bytes(b"ok\xff\xfe!");
    let repl = new_bytes(b"?");
    assert_eq!(take_bytes(fat_bytes_to_valid_utf8(broken, repl)), b"ok?!");

    for h in [s, sep, fields, ab, prefix, broken, repl] {
        fat_bytes_free(h);
    }
}

// =============================================================================
// Codecs
// =============================================================================

#[test]
fn test_base64_standard_encode_decode() {
    let enc = fat_base64_encoding_new_standard(0);
    let src = new_bytes(b"hi?");
    let text = fat_base64_encode_to_string(enc, src);
    assert_eq!(read_str(text), "aGk/");

    let mut out = 0;
    let mut err = 0;
    let status = unsafe { fat_base64_decode_string(enc, text, &mut out, &mut err) };
    assert_eq!(status, Status::Ok);
    assert_eq!(err, 0);
    assert_eq!(take_bytes(out), b"hi?");

    fat_string_free(text);
    fat_bytes_free(src);
    fat_base64_encoding_free(enc);
}

#[test]
fn test_base64_corrupt_input_pairs_status_with_error() {
    let enc = fat_base64_encoding_new_standard(0);
    let bad = new_str("!!!!");
    let mut out = 0;
    let mut err = 0;
    let status = unsafe { fat_base64_decode_string(enc, bad, &mut out, &mut err) };
    assert_eq!(status, Status::Syntax);
    assert_eq!(out, 0);
    assert_ne!(err, 0);
    let (code, message) = take_error(err);
    assert_eq!(code, codes::BASE64_CORRUPT);
    assert!(!message.is_empty());

    fat_string_free(bad);
    fat_base64_encoding_free(enc);
}

#[test]
fn test_gzip_round_trip_through_handles() {
    let payload = "compress me ".repeat(64);
    let src = new_bytes(payload.as_bytes());
    let (mut packed, mut unpacked, mut err) = (0, 0, 0);

    assert_eq!(unsafe { fat_gzip_compress(src, &mut packed, &mut err) }, Status::Ok);
    assert!(fat_bytes_len(packed) < payload.len());
    assert_eq!(unsafe { fat_gzip_decompress(packed, &mut unpacked, &mut err) }, Status::Ok);
    assert_eq!(take_bytes(unpacked), payload.as_bytes());

    fat_bytes_free(packed);
    fat_bytes_free(src);
}

#[test]
fn test_gzip_rejects_garbage() {
    let src = new_bytes(b"definitely not gzip");
    let (mut out, mut err) = (0, 0);
    let status = unsafe { fat_gzip_decompress(src, &mut out, &mut err) };
    assert!(status.carries_error());
    assert_eq!(out, 0);
    assert_eq!(take_error(err).0, codes::GZIP);
    fat_bytes_free(src);
}

#[test]
fn test_json_object_navigation() {
    let data = new_bytes(br#"{"name":"fat","n":12,"tags":[true,null]}"#);
    let (mut v, mut err) = (0, 0);
    assert_eq!(unsafe { fat_json_unmarshal(data, &mut v, &mut err) }, Status::Ok);
    assert_eq!(fat_json_value_type(v), 5);

    let key = new_str("n");
    let mut found = false;
    let mut n = 0;
    unsafe { fat_json_object_get(v, key, &mut found, &mut n) };
    assert!(found);
    assert_eq!(take_str(fat_json_value_as_number_string(n)), "12");
    fat_json_value_free(n);

    let missing = new_str("missing");
    let mut absent = 1;
    unsafe { fat_json_object_get(v, missing, &mut found, &mut absent) };
    assert!(!found);
    assert_eq!(absent, 0);

    for h in [key, missing] {
        fat_string_free(h);
    }
    fat_json_value_free(v);
    fat_bytes_free(data);
}

#[test]
fn test_json_syntax_error() {
    let data = new_bytes(b"{\"a\":");
    assert!(!fat_json_valid(data));
    let (mut v, mut err) = (0, 0);
    let status = unsafe { fat_json_unmarshal(data, &mut v, &mut err) };
    assert_eq!(status, Status::Syntax);
    assert_eq!(take_error(err).0, codes::JSON_SYNTAX);
    fat_bytes_free(data);
}

#[test]
fn test_conv_status_classes() {
    let (mut value, mut err) = (0i64, 0);

    let ok = new_str("-42");
    assert_eq!(unsafe { fat_conv_atoi(ok, &mut value, &mut err) }, Status::Ok);
    assert_eq!((value, err), (-42, 0));

    let bad = new_str("4x2");
    assert_eq!(unsafe { fat_conv_atoi(bad, &mut value, &mut err) }, Status::Syntax);
    assert_eq!(value, 0);
    assert_eq!(take_error(err).0, Status::Syntax.code());

    let big = new_str("300");
    let status = unsafe { fat_conv_parse_int(big, 10, 8, &mut value, &mut err) };
    assert_eq!(status, Status::Range);
    assert_eq!(take_error(err).0, Status::Range.code());

    assert_eq!(take_str(fat_conv_itoa(-7)), "-7");
    for h in [ok, bad, big] {
        fat_string_free(h);
    }
}

#[test]
fn test_base64_custom_padding_through_handles() {
    let std_enc = fat_base64_encoding_new_standard(0);
    let (mut star, mut err) = (0, 0);
    let status = unsafe { fat_base64_encoding_with_padding(std_enc, '*' as i32, &mut star, &mut err) };
    assert_eq!((status, err), (Status::Ok, 0));
    let src = new_bytes(b"hi");
    assert_eq!(take_str(fat_base64_encode_to_string(star, src)), "aGk*");

    let mut bad = 0;
    let status = unsafe { fat_base64_encoding_with_padding(std_enc, 'A' as i32, &mut bad, &mut err) };
    assert_eq!(status, Status::Range);
    assert_eq!(bad, 0);
    assert_eq!(take_error(err).0, codes::BASE64_CONFIG);

    fat_bytes_free(src);
    fat_base64_encoding_free(star);
    fat_base64_encoding_free(std_enc);
}

#[test]
fn test_bzip2_and_lzw_through_handles() {
    let payload = "abracadabra ".repeat(40);
    let src = new_bytes(payload.as_bytes());
    let (mut packed, mut unpacked, mut err) = (0, 0, 0);

    assert_eq!(unsafe { fat_bzip2_compress(src, &mut packed, &mut err) }, Status::Ok);
    assert_eq!(unsafe { fat_bzip2_decompress(packed, &mut unpacked, &mut err) }, Status::Ok);
    assert_eq!(take_bytes(unpacked), payload.as_bytes());
    fat_bytes_free(packed);

    assert_eq!(unsafe { fat_lzw_compress(src, 1, 8, &mut packed, &mut err) }, Status::Ok);
    assert_eq!(unsafe { fat_lzw_decompress(packed, 1, 8, &mut unpacked, &mut err) }, Status::Ok);
    assert_eq!(take_bytes(unpacked), payload.as_bytes());
    fat_bytes_free(packed);

    let status = unsafe { fat_lzw_compress(src, 0, 9, &mut packed, &mut err) };
    assert_eq!(status, Status::Range);
    assert_eq!(packed, 0);
    assert_eq!(take_error(err).0, codes::LZW);

    let garbage = new_bytes(b"not bzip2 at all");
    let status = unsafe { fat_bzip2_decompress(garbage, &mut unpacked, &mut err) };
    assert_eq!(status, Status::Syntax);
    assert_eq!(take_error(err).0, codes::BZIP2);

    fat_bytes_free(garbage);
    fat_bytes_free(src);
}

#[test]
fn test_csv_read_and_write_through_handles() {
    let data = new_bytes(b"a,\"b,c\"\nd,e\nf\n");
    let r = fat_csv_reader_new_bytes(data);
    fat_bytes_free(data);

    let (mut record, mut eof, mut err) = (0, false, 0);
    assert_eq!(unsafe { fat_csv_reader_read(r, &mut record, &mut eof, &mut err) }, Status::Ok);
    assert_eq!(fat_string_array_len(record), 2);
    assert_eq!(take_str(fat_string_array_get(record, 1)), "b,c");
    fat_string_array_free(record);
    assert_eq!(fat_csv_reader_input_offset(r), 8);

    assert_eq!(unsafe { fat_csv_reader_read(r, &mut record, &mut eof, &mut err) }, Status::Ok);
    fat_string_array_free(record);

    let status = unsafe { fat_csv_reader_read(r, &mut record, &mut eof, &mut err) };
    assert_eq!((status, record, eof), (Status::Syntax, 0, false));
    assert_eq!(take_error(err).0, codes::CSV_PARSE);

    let status = unsafe { fat_csv_reader_read(r, &mut record, &mut eof, &mut err) };
    assert_eq!((status, record, eof, err), (Status::Eof, 0, true, 0));
    fat_csv_reader_free(r);

    let dst = fat_bytes_buffer_new();
    let w = fat_csv_writer_new_to_bytes_buffer(dst);
    let fields = [new_str("x"), new_str("say \"hi\"")];
    let status = unsafe { fat_csv_writer_write_record(w, fields.as_ptr(), fields.len(), &mut err) };
    assert_eq!((status, err), (Status::Ok, 0));
    assert_eq!(fat_bytes_buffer_len(dst), 0);
    fat_csv_writer_flush(w);
    assert_eq!(unsafe { fat_csv_writer_error(w, &mut err) }, Status::Ok);
    assert_eq!(take_bytes(fat_bytes_buffer_bytes(dst)), b"x,\"say \"\"hi\"\"\"\n");

    fat_csv_writer_free(w);
    fat_bytes_buffer_free(dst);
    for h in fields {
        fat_string_free(h);
    }
}

#[test]
fn test_conv_format_float_and_quoting() {
    assert_eq!(take_str(fat_conv_format_float(3.0, b'g', -1, 64)), "3");
    assert_eq!(take_str(fat_conv_format_float(0.000012, b'e', 2, 64)), "1.20e-05");
    assert_eq!(take_str(fat_conv_format_float(2.5, b'f', 3, 32)), "2.500");

    let s = new_str("tab\there ☺");
    let quoted = fat_conv_quote(s);
    assert_eq!(read_str(quoted), "\"tab\\there ☺\"");
    assert_eq!(take_str(fat_conv_quote_to_ascii(s)), "\"tab\\there \\u263a\"");
    assert_eq!(take_str(fat_conv_quote_rune('\n' as u32)), "'\\n'");
    assert_eq!(take_str(fat_conv_quote_rune_to_ascii(0x263A)), "'\\u263a'");
    assert!(fat_conv_can_backquote(s));

    let (mut out, mut err) = (0, 0);
    assert_eq!(unsafe { fat_conv_unquote(quoted, &mut out, &mut err) }, Status::Ok);
    assert_eq!(take_str(out), "tab\there ☺");

    let tail = new_str("'x' rest");
    assert_eq!(unsafe { fat_conv_quoted_prefix(tail, &mut out, &mut err) }, Status::Ok);
    assert_eq!(take_str(out), "'x'");

    let bad = new_str("\"open");
    let tick = new_str("a`b");
    assert!(!fat_conv_can_backquote(tick));
    assert_eq!(unsafe { fat_conv_unquote(bad, &mut out, &mut err) }, Status::Syntax);
    assert_eq!(out, 0);
    assert_eq!(take_error(err).0, Status::Syntax.code());

    for h in [s, quoted, tail, bad, tick] {
        fat_string_free(h);
    }
}

// =============================================================================
// Misc
// =============================================================================

#[test]
fn test_version_string_is_static() {
    let v = unsafe { CStr::from_ptr(fat_version_string()) };
    assert_eq!(v.to_str().unwrap(), fatstd::VERSION);
}
