//! Zip archives.
//!
//! A zip file handle is a back-reference `(reader handle, index)` that is
//! re-resolved through the registry on every use; the reader must outlive
//! the files taken from it.

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use ::zip::result::ZipError;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipArchive};
use parking_lot::Mutex;

use crate::bytes::{BytesBuffer, SliceCursor};
use crate::contract::{misuse, violate, ContractViolation};
use crate::handles::{Handle, HandleRegistry, Kind};
use crate::status::{codes, FatResult, Failure};

fn zip_failure(context: &str, e: ZipError) -> Failure {
    match e {
        ZipError::Io(io) => Failure::other(codes::ZIP_IO, format!("zip {}: {}", context, io)),
        other => Failure::syntax(codes::ZIP_FORMAT, format!("zip {}: {}", context, other)),
    }
}

/// Random access reader over a zip archive held in memory.
pub struct ZipReader {
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    names: Vec<String>,
}

impl fmt::Debug for ZipReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipReader")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl ZipReader {
    /// Open an archive from bytes. A missing or damaged central directory is
    /// `Syntax`.
    pub fn from_bytes(bytes: Vec<u8>) -> FatResult<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| zip_failure("open", e))?;
        let names = (0..archive.len())
            .map(|i| {
                archive
                    .by_index_raw(i)
                    .map(|file| file.name().to_string())
                    .map_err(|e| zip_failure("read entry", e))
            })
            .collect::<FatResult<Vec<_>>>()?;
        tracing::debug!(files = names.len(), "zip archive opened");
        Ok(Self {
            archive: Mutex::new(archive),
            names,
        })
    }

    pub fn open_path(path: &Path) -> FatResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Failure::other(codes::ZIP_IO, format!("open {}: {}", path.display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    pub fn num_files(&self) -> usize {
        self.names.len()
    }

    /// Name of member `index`; out of range is misuse.
    pub fn name(&self, index: usize) -> &str {
        match self.names.get(index) {
            Some(name) => name,
            None => misuse(
                "zip file",
                format!("index {} out of range for {} files", index, self.names.len()),
            ),
        }
    }

    /// Decompress member `index` in full.
    pub fn contents(&self, index: usize) -> FatResult<Vec<u8>> {
        self.name(index);
        let mut archive = self.archive.lock();
        let mut file = archive
            .by_index(index)
            .map_err(|e| zip_failure("open entry", e))?;
        // The declared size is untrusted: read at most one byte past it.
        let declared = file.size();
        let mut data = Vec::new();
        (&mut file)
            .take(declared.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| Failure::syntax(codes::ZIP_FORMAT, format!("zip read entry: {}", e)))?;
        if data.len() as u64 != declared {
            return Err(Failure::syntax(
                codes::ZIP_FORMAT,
                format!(
                    "zip read entry {:?}: declares {} bytes but holds {}",
                    self.names[index],
                    declared,
                    data.len()
                ),
            ));
        }
        Ok(data)
    }
}

/// One member of a zip archive, by reference to its reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipFile {
    pub reader: Handle,
    pub index: usize,
}

impl ZipFile {
    /// Bind member `index` of `reader`. Out of range is misuse.
    pub fn new(registry: &HandleRegistry, reader: Handle, index: usize) -> Self {
        let archive = registry.resolve::<ZipReader>(reader);
        if index >= archive.num_files() {
            misuse(
                "zip file_by_index",
                format!("index {} out of range for {} files", index, archive.num_files()),
            );
        }
        Self { reader, index }
    }

    pub fn name(&self, registry: &HandleRegistry) -> String {
        registry
            .resolve::<ZipReader>(self.reader)
            .name(self.index)
            .to_string()
    }

    pub fn open(&self, registry: &HandleRegistry) -> FatResult<ZipFileReader> {
        let data = registry
            .resolve::<ZipReader>(self.reader)
            .contents(self.index)?;
        Ok(ZipFileReader {
            cursor: Mutex::new(SliceCursor::new(data)),
        })
    }
}

/// Sequential reader over one decompressed member.
#[derive(Debug)]
pub struct ZipFileReader {
    cursor: Mutex<SliceCursor>,
}

impl ZipFileReader {
    /// Read into `dst`; EOF once the member is exhausted.
    pub fn read(&self, dst: &mut [u8]) -> FatResult<usize> {
        let outcome = self.cursor.lock().read(dst);
        if outcome.eof {
            return Err(Failure::eof());
        }
        Ok(outcome.n)
    }
}

/// Writer building a zip archive that is appended to a bytes buffer, held by
/// handle, when closed.
pub struct ZipWriter {
    dst: Handle,
    inner: Mutex<Option<::zip::ZipWriter<Cursor<Vec<u8>>>>>,
}

impl ZipWriter {
    pub fn new(dst: Handle) -> Self {
        Self {
            dst,
            inner: Mutex::new(Some(::zip::ZipWriter::new(Cursor::new(Vec::new())))),
        }
    }

    /// Add a deflated member.
    pub fn add_bytes(&self, registry: &HandleRegistry, name: &str, data: &[u8]) -> FatResult<()> {
        registry.resolve::<BytesBuffer>(self.dst);
        let mut guard = self.inner.lock();
        let writer = match guard.as_mut() {
            Some(writer) => writer,
            None => violate(ContractViolation::Closed {
                op: "zip writer add_bytes",
                kind: Kind::ZipWriter,
            }),
        };
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(name, options)
            .map_err(|e| zip_failure("add entry", e))?;
        writer
            .write_all(data)
            .map_err(|e| Failure::other(codes::ZIP_IO, format!("zip write entry: {}", e)))?;
        Ok(())
    }

    /// Write the central directory and append the archive to the destination.
    pub fn close(&self, registry: &HandleRegistry) -> FatResult<()> {
        let dst = registry.resolve::<BytesBuffer>(self.dst);
        let writer = match self.inner.lock().take() {
            Some(writer) => writer,
            None => violate(ContractViolation::Closed {
                op: "zip writer close",
                kind: Kind::ZipWriter,
            }),
        };
        let archive = writer.finish().map_err(|e| zip_failure("close", e))?;
        dst.write(&archive.into_inner());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn build(reg: &HandleRegistry, files: &[(&str, &[u8])]) -> Vec<u8> {
        let dst = reg.register(BytesBuffer::new());
        let writer = ZipWriter::new(dst);
        for (name, data) in files {
            writer.add_bytes(reg, name, data).unwrap();
        }
        writer.close(reg).unwrap();
        reg.release::<BytesBuffer>(dst).bytes()
    }

    #[test]
    fn test_write_then_read() {
        let reg = HandleRegistry::new();
        let bytes = build(&reg, &[("hello.txt", b"hello zip"), ("empty", b"")]);
        assert_eq!(&bytes[..2], b"PK");

        let reader = reg.register(ZipReader::from_bytes(bytes).unwrap());
        assert_eq!(reg.resolve::<ZipReader>(reader).num_files(), 2);

        let file = ZipFile::new(&reg, reader, 0);
        assert_eq!(file.name(&reg), "hello.txt");

        let contents = file.open(&reg).unwrap();
        let mut buf = [0u8; 64];
        let n = contents.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello zip");
        assert!(contents.read(&mut buf).unwrap_err().is_eof());

        let empty = ZipFile::new(&reg, reader, 1).open(&reg).unwrap();
        assert!(empty.read(&mut buf).unwrap_err().is_eof());
    }

    #[test]
    fn test_garbage_is_syntax() {
        let err = ZipReader::from_bytes(b"definitely not a zip".to_vec()).unwrap_err();
        assert_eq!(err.status, Status::Syntax);
        assert_eq!(err.code, codes::ZIP_FORMAT);
    }

    /// Patch the uncompressed size recorded in the central directory.
    fn lie_about_size(bytes: &mut [u8], size: u32) {
        let central = bytes
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&size.to_le_bytes());
    }

    fn stored_archive(name: &str, data: &[u8]) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(name, options).unwrap();
        writer.write_all(data).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_huge_declared_size_is_syntax() {
        let mut bytes = stored_archive("big.bin", b"tiny");
        lie_about_size(&mut bytes, 0x7FFF_FFF0);

        let reader = ZipReader::from_bytes(bytes).unwrap();
        let err = reader.contents(0).unwrap_err();
        assert_eq!(err.status, Status::Syntax);
        assert_eq!(err.code, codes::ZIP_FORMAT);
    }

    #[test]
    fn test_undersized_declaration_is_syntax() {
        let mut bytes = stored_archive("short.bin", b"more than two");
        lie_about_size(&mut bytes, 2);

        let reader = ZipReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.contents(0).unwrap_err().status, Status::Syntax);
    }

    #[test]
    fn test_debug_lists_names() {
        let reg = HandleRegistry::new();
        let reader = ZipReader::from_bytes(build(&reg, &[("a.txt", b"1")])).unwrap();
        assert!(format!("{:?}", reader).contains("a.txt"));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_file_by_index_out_of_range() {
        let reg = HandleRegistry::new();
        let bytes = build(&reg, &[("a", b"1")]);
        let reader = reg.register(ZipReader::from_bytes(bytes).unwrap());
        ZipFile::new(&reg, reader, 1);
    }

    #[test]
    fn test_duplicate_name_fails() {
        let reg = HandleRegistry::new();
        let dst = reg.register(BytesBuffer::new());
        let writer = ZipWriter::new(dst);
        writer.add_bytes(&reg, "same", b"1").unwrap();
        let err = writer.add_bytes(&reg, "same", b"2").unwrap_err();
        assert_eq!(err.status, Status::Syntax);
    }
}
