//! Tar and zip exports.

use std::ffi::c_char;
use std::path::Path;
use std::sync::Arc;

use super::{finish, finish_unit, in_cstr, new_string, out_param, out_slice, registry};
use crate::archive::tar::{TarHeader, TarReader, TarWriter};
use crate::archive::zip::{ZipFile, ZipFileReader, ZipReader, ZipWriter};
use crate::bytes::BytesBuffer;
use crate::handles::Handle;
use crate::status::{FatResult, Status};

fn bytes_of(h: Handle) -> Arc<Vec<u8>> {
    registry().resolve::<Vec<u8>>(h)
}

/// Read through a `FatResult<usize>` reader into the usual out-parameters.
unsafe fn read_into(
    op: &'static str,
    dst: *mut u8,
    dst_len: usize,
    out_n: *mut usize,
    out_eof: *mut bool,
    out_err: *mut Handle,
    read: impl FnOnce(&mut [u8]) -> FatResult<usize>,
) -> Status {
    let out_n = out_param(op, "out_n", out_n);
    let out_eof = out_param(op, "out_eof", out_eof);
    let out_err = out_param(op, "out_err", out_err);
    let dst = out_slice(op, "dst", dst, dst_len);
    let status = finish(read(dst), out_n, out_err);
    *out_eof = status == Status::Eof;
    status
}

// =============================================================================
// Tar
// =============================================================================

#[no_mangle]
pub unsafe extern "C" fn fat_tar_reader_new_bytes(
    tar_bytes: Handle,
    out_reader: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_tar_reader_new_bytes";
    let out_reader = out_param(OP, "out_reader", out_reader);
    let out_err = out_param(OP, "out_err", out_err);
    let reader = TarReader::from_bytes(bytes_of(tar_bytes).to_vec());
    finish(Ok(registry().register(reader)), out_reader, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_tar_reader_open_path_utf8(
    path: *const c_char,
    out_reader: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_tar_reader_open_path_utf8";
    let out_reader = out_param(OP, "out_reader", out_reader);
    let out_err = out_param(OP, "out_err", out_err);
    let path = in_cstr(OP, "path", path);
    let result = TarReader::open_path(Path::new(path.as_ref())).map(|r| registry().register(r));
    finish(result, out_reader, out_err)
}

/// Advance to the next member; `out_hdr` receives a new header handle.
#[no_mangle]
pub unsafe extern "C" fn fat_tar_reader_next(
    r: Handle,
    out_hdr: *mut Handle,
    out_eof: *mut bool,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_tar_reader_next";
    let out_hdr = out_param(OP, "out_hdr", out_hdr);
    let out_eof = out_param(OP, "out_eof", out_eof);
    let out_err = out_param(OP, "out_err", out_err);
    let reg = registry();
    let result = reg.resolve::<TarReader>(r).next().map(|h| reg.register(h));
    let status = finish(result, out_hdr, out_err);
    *out_eof = status == Status::Eof;
    status
}

#[no_mangle]
pub unsafe extern "C" fn fat_tar_reader_read(
    r: Handle,
    dst: *mut u8,
    dst_len: usize,
    out_n: *mut usize,
    out_eof: *mut bool,
    out_err: *mut Handle,
) -> Status {
    read_into("fat_tar_reader_read", dst, dst_len, out_n, out_eof, out_err, |buf| {
        registry().resolve::<TarReader>(r).read(buf)
    })
}

#[no_mangle]
pub unsafe extern "C" fn fat_tar_reader_free(r: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_tar_reader_free", "out_err", out_err);
    registry().release::<TarReader>(r);
    finish_unit(Ok(()), out_err)
}

fn tar_header(h: Handle) -> Arc<TarHeader> {
    registry().resolve::<TarHeader>(h)
}

#[no_mangle]
pub extern "C" fn fat_tar_header_name(h: Handle) -> Handle {
    new_string(tar_header(h).name.as_str())
}

#[no_mangle]
pub extern "C" fn fat_tar_header_typeflag(h: Handle) -> u8 {
    tar_header(h).typeflag
}

#[no_mangle]
pub extern "C" fn fat_tar_header_size(h: Handle) -> i64 {
    tar_header(h).size
}

#[no_mangle]
pub extern "C" fn fat_tar_header_free(h: Handle) {
    registry().release::<TarHeader>(h);
}

#[no_mangle]
pub unsafe extern "C" fn fat_tar_writer_new_to_bytes_buffer(
    dst: Handle,
    out_writer: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_tar_writer_new_to_bytes_buffer";
    let out_writer = out_param(OP, "out_writer", out_writer);
    let out_err = out_param(OP, "out_err", out_err);
    let reg = registry();
    reg.resolve::<BytesBuffer>(dst);
    finish(Ok(reg.register(TarWriter::new(dst))), out_writer, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_tar_writer_add_bytes(
    w: Handle,
    name: Handle,
    data: Handle,
    out_err: *mut Handle,
) -> Status {
    let out_err = out_param("fat_tar_writer_add_bytes", "out_err", out_err);
    let reg = registry();
    let name = reg.resolve::<String>(name);
    let result = reg.resolve::<TarWriter>(w).add_bytes(reg, &name, &bytes_of(data));
    finish_unit(result, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_tar_writer_flush(w: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_tar_writer_flush", "out_err", out_err);
    let reg = registry();
    finish_unit(reg.resolve::<TarWriter>(w).flush(reg), out_err)
}

/// Write the end-of-archive marker and free the writer handle.
#[no_mangle]
pub unsafe extern "C" fn fat_tar_writer_close(w: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_tar_writer_close", "out_err", out_err);
    let reg = registry();
    finish_unit(reg.release::<TarWriter>(w).close(reg), out_err)
}

// =============================================================================
// Zip
// =============================================================================

#[no_mangle]
pub unsafe extern "C" fn fat_zip_reader_open_path_utf8(
    path: *const c_char,
    out_reader: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_zip_reader_open_path_utf8";
    let out_reader = out_param(OP, "out_reader", out_reader);
    let out_err = out_param(OP, "out_err", out_err);
    let path = in_cstr(OP, "path", path);
    let result = ZipReader::open_path(Path::new(path.as_ref())).map(|r| registry().register(r));
    finish(result, out_reader, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_zip_reader_new_bytes(
    zip_bytes: Handle,
    out_reader: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_zip_reader_new_bytes";
    let out_reader = out_param(OP, "out_reader", out_reader);
    let out_err = out_param(OP, "out_err", out_err);
    let result = ZipReader::from_bytes(bytes_of(zip_bytes).to_vec()).map(|r| registry().register(r));
    finish(result, out_reader, out_err)
}

/// Free the reader. Files taken from it must already be freed.
#[no_mangle]
pub unsafe extern "C" fn fat_zip_reader_free(r: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_zip_reader_free", "out_err", out_err);
    registry().release::<ZipReader>(r);
    finish_unit(Ok(()), out_err)
}

#[no_mangle]
pub extern "C" fn fat_zip_reader_num_files(r: Handle) -> usize {
    registry().resolve::<ZipReader>(r).num_files()
}

/// Member `idx` as a file handle that refers back to `r`.
#[no_mangle]
pub extern "C" fn fat_zip_reader_file_by_index(r: Handle, idx: usize) -> Handle {
    let reg = registry();
    let file = ZipFile::new(reg, r, idx);
    reg.register(file)
}

#[no_mangle]
pub extern "C" fn fat_zip_file_name(f: Handle) -> Handle {
    let reg = registry();
    new_string(reg.resolve::<ZipFile>(f).name(reg))
}

#[no_mangle]
pub unsafe extern "C" fn fat_zip_file_open(f: Handle, out_reader: *mut Handle, out_err: *mut Handle) -> Status {
    const OP: &str = "fat_zip_file_open";
    let out_reader = out_param(OP, "out_reader", out_reader);
    let out_err = out_param(OP, "out_err", out_err);
    let reg = registry();
    let result = reg.resolve::<ZipFile>(f).open(reg).map(|fr| reg.register(fr));
    finish(result, out_reader, out_err)
}

#[no_mangle]
pub extern "C" fn fat_zip_file_free(f: Handle) {
    registry().release::<ZipFile>(f);
}

#[no_mangle]
pub unsafe extern "C" fn fat_zip_file_reader_read(
    r: Handle,
    dst: *mut u8,
    dst_len: usize,
    out_n: *mut usize,
    out_eof: *mut bool,
    out_err: *mut Handle,
) -> Status {
    read_into("fat_zip_file_reader_read", dst, dst_len, out_n, out_eof, out_err, |buf| {
        registry().resolve::<ZipFileReader>(r).read(buf)
    })
}

#[no_mangle]
pub unsafe extern "C" fn fat_zip_file_reader_close(r: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_zip_file_reader_close", "out_err", out_err);
    registry().release::<ZipFileReader>(r);
    finish_unit(Ok(()), out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_zip_writer_new_to_bytes_buffer(
    dst: Handle,
    out_writer: *mut Handle,
    out_err: *mut Handle,
) -> Status {
    const OP: &str = "fat_zip_writer_new_to_bytes_buffer";
    let out_writer = out_param(OP, "out_writer", out_writer);
    let out_err = out_param(OP, "out_err", out_err);
    let reg = registry();
    reg.resolve::<BytesBuffer>(dst);
    finish(Ok(reg.register(ZipWriter::new(dst))), out_writer, out_err)
}

#[no_mangle]
pub unsafe extern "C" fn fat_zip_writer_add_bytes(
    w: Handle,
    name: Handle,
    data: Handle,
    out_err: *mut Handle,
) -> Status {
    let out_err = out_param("fat_zip_writer_add_bytes", "out_err", out_err);
    let reg = registry();
    let name = reg.resolve::<String>(name);
    let result = reg.resolve::<ZipWriter>(w).add_bytes(reg, &name, &bytes_of(data));
    finish_unit(result, out_err)
}

/// Append the finished archive to the destination and free the writer.
#[no_mangle]
pub unsafe extern "C" fn fat_zip_writer_close(w: Handle, out_err: *mut Handle) -> Status {
    let out_err = out_param("fat_zip_writer_close", "out_err", out_err);
    let reg = registry();
    finish_unit(reg.release::<ZipWriter>(w).close(reg), out_err)
}
