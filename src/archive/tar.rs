//! Tar archives.
//!
//! The reader parses the whole archive up front into entries and then hands
//! them out one at a time; a malformed tail is remembered and reported when
//! the cursor reaches it. The writer stages each entry and moves the encoded
//! bytes into the destination buffer as soon as the entry is complete.

use std::io::{self, Cursor, Read};
use std::path::Path;

use ::tar::{Archive, Builder, EntryType, Header};
use parking_lot::Mutex;

use crate::bytes::BytesBuffer;
use crate::contract::{violate, ContractViolation};
use crate::handles::{Handle, HandleRegistry, Kind};
use crate::status::{codes, FatResult, Failure};

/// Metadata of one archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarHeader {
    pub name: String,
    pub typeflag: u8,
    pub size: i64,
}

#[derive(Debug)]
struct TarEntry {
    header: TarHeader,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct ReaderState {
    next: usize,
    current: Option<(usize, usize)>,
}

/// Sequential reader over a tar archive.
#[derive(Debug)]
pub struct TarReader {
    entries: Vec<TarEntry>,
    trailing: Option<Failure>,
    state: Mutex<ReaderState>,
}

/// Archives are processed in memory, so every error from the tar codec is a
/// format problem rather than an I/O one.
fn tar_failure(context: &str, e: io::Error) -> Failure {
    Failure::syntax(codes::TAR_FORMAT, format!("tar {}: {}", context, e))
}

/// Buffer one member. The declared size comes from the archive and is not
/// trusted for allocation; a member shorter than declared is malformed.
fn read_entry<R: Read>(mut entry: ::tar::Entry<'_, R>) -> io::Result<TarEntry> {
    let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    let typeflag = entry.header().entry_type().as_byte();
    let declared = entry.size();
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    if data.len() as u64 != declared {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "entry {:?} declares {} bytes but holds {}",
                name,
                declared,
                data.len()
            ),
        ));
    }
    Ok(TarEntry {
        header: TarHeader {
            name,
            typeflag,
            size: declared as i64,
        },
        data,
    })
}

impl TarReader {
    /// Parse an archive held in memory.
    ///
    /// Never fails: a malformed header, including the first, is remembered
    /// and reported when `next` reaches it.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mut archive = Archive::new(Cursor::new(bytes));
        let mut entries = Vec::new();
        let mut trailing = None;

        match archive.entries() {
            Ok(iter) => {
                for entry in iter {
                    match entry.and_then(read_entry) {
                        Ok(entry) => entries.push(entry),
                        Err(e) => {
                            trailing = Some(tar_failure("read entry", e));
                            break;
                        }
                    }
                }
            }
            Err(e) => trailing = Some(tar_failure("read entries", e)),
        }

        tracing::debug!(
            entries = entries.len(),
            malformed = trailing.is_some(),
            "tar archive parsed"
        );
        Self {
            entries,
            trailing,
            state: Mutex::new(ReaderState::default()),
        }
    }

    pub fn open_path(path: &Path) -> FatResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Failure::other(codes::TAR_IO, format!("open {}: {}", path.display(), e))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Advance to the next member. The end of the archive is EOF.
    pub fn next(&self) -> FatResult<TarHeader> {
        let mut state = self.state.lock();
        let index = state.next;
        match self.entries.get(index) {
            Some(entry) => {
                state.next += 1;
                state.current = Some((index, 0));
                Ok(entry.header.clone())
            }
            None => {
                state.current = None;
                match &self.trailing {
                    Some(failure) => Err(failure.clone()),
                    None => Err(Failure::eof()),
                }
            }
        }
    }

    /// Read from the current member's contents. EOF once it is exhausted or
    /// when no member is current.
    pub fn read(&self, dst: &mut [u8]) -> FatResult<usize> {
        let mut state = self.state.lock();
        let (index, pos) = match state.current {
            Some(current) => current,
            None => return Err(Failure::eof()),
        };
        let data = &self.entries[index].data;
        if pos >= data.len() {
            return Err(Failure::eof());
        }
        let n = dst.len().min(data.len() - pos);
        dst[..n].copy_from_slice(&data[pos..pos + n]);
        state.current = Some((index, pos + n));
        Ok(n)
    }
}

/// Writer appending a tar stream to a bytes buffer held by handle.
pub struct TarWriter {
    dst: Handle,
    builder: Mutex<Option<Builder<Vec<u8>>>>,
}

impl TarWriter {
    pub fn new(dst: Handle) -> Self {
        Self {
            dst,
            builder: Mutex::new(Some(Builder::new(Vec::new()))),
        }
    }

    fn with_builder<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Builder<Vec<u8>>) -> io::Result<R>,
    ) -> io::Result<(R, Vec<u8>)> {
        let mut guard = self.builder.lock();
        let builder = match guard.as_mut() {
            Some(builder) => builder,
            None => violate(ContractViolation::Closed {
                op,
                kind: Kind::TarWriter,
            }),
        };
        let out = f(builder)?;
        let staged = std::mem::take(builder.get_mut());
        Ok((out, staged))
    }

    /// Add a regular file (mode 0644) with the given contents.
    pub fn add_bytes(&self, registry: &HandleRegistry, name: &str, data: &[u8]) -> FatResult<()> {
        let dst = registry.resolve::<BytesBuffer>(self.dst);
        let ((), staged) = self
            .with_builder("tar writer add_bytes", |builder| {
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_mtime(0);
                header.set_cksum();
                builder.append_data(&mut header, name, data)
            })
            .map_err(|e| tar_failure("add entry", e))?;
        dst.write(&staged);
        Ok(())
    }

    /// Push any staged bytes to the destination.
    pub fn flush(&self, registry: &HandleRegistry) -> FatResult<()> {
        let dst = registry.resolve::<BytesBuffer>(self.dst);
        let ((), staged) = self
            .with_builder("tar writer flush", |_| Ok(()))
            .map_err(|e| tar_failure("flush", e))?;
        dst.write(&staged);
        Ok(())
    }

    /// Write the end-of-archive marker. The writer is unusable afterwards.
    pub fn close(&self, registry: &HandleRegistry) -> FatResult<()> {
        let dst = registry.resolve::<BytesBuffer>(self.dst);
        let builder = match self.builder.lock().take() {
            Some(builder) => builder,
            None => violate(ContractViolation::Closed {
                op: "tar writer close",
                kind: Kind::TarWriter,
            }),
        };
        let tail = builder
            .into_inner()
            .map_err(|e| tar_failure("close", e))?;
        dst.write(&tail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn build(reg: &HandleRegistry, files: &[(&str, &[u8])]) -> Vec<u8> {
        let dst = reg.register(BytesBuffer::new());
        let writer = TarWriter::new(dst);
        for (name, data) in files {
            writer.add_bytes(reg, name, data).unwrap();
        }
        writer.close(reg).unwrap();
        reg.release::<BytesBuffer>(dst).bytes()
    }

    #[test]
    fn test_write_then_read_entries() {
        let reg = HandleRegistry::new();
        let bytes = build(&reg, &[("a.txt", b"alpha"), ("dir/b.bin", b"\x00\x01")]);
        assert_eq!(bytes.len() % 512, 0);

        let reader = TarReader::from_bytes(bytes);
        let first = reader.next().unwrap();
        assert_eq!(first.name, "a.txt");
        assert_eq!(first.typeflag, b'0');
        assert_eq!(first.size, 5);

        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"alp");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert!(reader.read(&mut buf).unwrap_err().is_eof());

        assert_eq!(reader.next().unwrap().name, "dir/b.bin");
        assert!(reader.next().unwrap_err().is_eof());
    }

    #[test]
    fn test_read_before_next_is_eof() {
        let reg = HandleRegistry::new();
        let reader = TarReader::from_bytes(build(&reg, &[("x", b"1")]));
        assert!(reader.read(&mut [0u8; 4]).unwrap_err().is_eof());
    }

    #[test]
    fn test_empty_archive_is_eof() {
        let reader = TarReader::from_bytes(vec![0u8; 1024]);
        assert!(reader.next().unwrap_err().is_eof());
    }

    #[test]
    fn test_corrupt_header_is_syntax() {
        let reader = TarReader::from_bytes(vec![0x41u8; 512]);
        let err = reader.next().unwrap_err();
        assert_eq!(err.status, Status::Syntax);
        assert_eq!(err.code, codes::TAR_FORMAT);
        assert_eq!(reader.next().unwrap_err().status, Status::Syntax);
        assert!(reader.read(&mut [0u8; 4]).unwrap_err().is_eof());
    }

    #[test]
    fn test_huge_declared_size_is_syntax() {
        let mut header = Header::new_gnu();
        header.set_path("big.bin").unwrap();
        header.set_entry_type(EntryType::Regular);
        header.set_size(1 << 62);
        header.set_cksum();
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 512]);

        let reader = TarReader::from_bytes(bytes);
        let err = reader.next().unwrap_err();
        assert_eq!(err.status, Status::Syntax);
        assert_eq!(err.code, codes::TAR_FORMAT);
    }

    #[test]
    fn test_truncated_member_after_good_one() {
        let reg = HandleRegistry::new();
        let mut bytes = build(&reg, &[("ok.txt", b"fine"), ("cut.txt", &[7u8; 600])]);
        bytes.truncate(512 * 4);

        let reader = TarReader::from_bytes(bytes);
        assert_eq!(reader.next().unwrap().name, "ok.txt");
        assert_eq!(reader.next().unwrap_err().status, Status::Syntax);
    }

    #[test]
    fn test_entries_stream_into_buffer() {
        let reg = HandleRegistry::new();
        let dst = reg.register(BytesBuffer::new());
        let writer = TarWriter::new(dst);
        writer.add_bytes(&reg, "f", b"data").unwrap();
        writer.flush(&reg).unwrap();
        assert_eq!(reg.resolve::<BytesBuffer>(dst).len(), 1024);
    }

    #[test]
    #[should_panic(expected = "tar writer is closed")]
    fn test_add_after_close() {
        let reg = HandleRegistry::new();
        let dst = reg.register(BytesBuffer::new());
        let writer = TarWriter::new(dst);
        writer.close(&reg).unwrap();
        let _ = writer.add_bytes(&reg, "late", b"");
    }
}
