//! Read-only cursor over an owned byte slice.
//!
//! Shared by [`BytesReader`] and the string reader: both capture a snapshot of
//! their source at creation and support sequential reads, positional reads,
//! single byte reads with unread, and seeking.

use parking_lot::Mutex;

use crate::contract::misuse;

/// Seek relative to the start.
pub const SEEK_SET: i32 = 0;
/// Seek relative to the current position.
pub const SEEK_CUR: i32 = 1;
/// Seek relative to the end.
pub const SEEK_END: i32 = 2;

/// Outcome of a read into caller memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOutcome {
    pub n: usize,
    pub eof: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SliceCursor {
    data: Vec<u8>,
    pos: usize,
}

impl SliceCursor {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub(crate) fn size(&self) -> i64 {
        self.data.len() as i64
    }

    pub(crate) fn reset(&mut self, data: Vec<u8>) {
        self.data = data;
        self.pos = 0;
    }

    pub(crate) fn read(&mut self, dst: &mut [u8]) -> ReadOutcome {
        if self.pos >= self.data.len() {
            return ReadOutcome { n: 0, eof: true };
        }
        let n = dst.len().min(self.remaining());
        dst[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        ReadOutcome { n, eof: false }
    }

    pub(crate) fn read_at(&self, op: &'static str, dst: &mut [u8], off: i64) -> ReadOutcome {
        if off < 0 {
            misuse(op, format!("negative offset {}", off));
        }
        let off = off as usize;
        if off >= self.data.len() {
            return ReadOutcome { n: 0, eof: true };
        }
        let n = dst.len().min(self.data.len() - off);
        dst[..n].copy_from_slice(&self.data[off..off + n]);
        ReadOutcome {
            n,
            eof: n < dst.len(),
        }
    }

    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    pub(crate) fn unread_byte(&mut self, op: &'static str) {
        if self.pos == 0 {
            misuse(op, "at beginning of input");
        }
        self.pos -= 1;
    }

    pub(crate) fn seek(&mut self, op: &'static str, offset: i64, whence: i32) -> i64 {
        let base = match whence {
            SEEK_SET => 0,
            SEEK_CUR => self.pos as i64,
            SEEK_END => self.data.len() as i64,
            other => misuse(op, format!("invalid whence {}", other)),
        };
        let abs = match base.checked_add(offset) {
            Some(abs) if abs >= 0 => abs,
            _ => misuse(op, "negative position"),
        };
        self.pos = abs as usize;
        abs
    }

    /// Drain the unread bytes into `sink`, returning how many were moved.
    pub(crate) fn write_to(&mut self, sink: &mut Vec<u8>) -> i64 {
        if self.pos >= self.data.len() {
            return 0;
        }
        sink.extend_from_slice(&self.data[self.pos..]);
        let n = self.data.len() - self.pos;
        self.pos = self.data.len();
        n as i64
    }
}

/// Reader over a snapshot of a bytes value.
#[derive(Debug, Default)]
pub struct BytesReader {
    cursor: Mutex<SliceCursor>,
}

impl BytesReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            cursor: Mutex::new(SliceCursor::new(data)),
        }
    }

    /// Unread bytes remaining.
    pub fn len(&self) -> usize {
        self.cursor.lock().remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the underlying slice.
    pub fn size(&self) -> i64 {
        self.cursor.lock().size()
    }

    pub fn reset(&self, data: Vec<u8>) {
        self.cursor.lock().reset(data);
    }

    pub fn read(&self, dst: &mut [u8]) -> ReadOutcome {
        self.cursor.lock().read(dst)
    }

    pub fn read_at(&self, dst: &mut [u8], off: i64) -> ReadOutcome {
        self.cursor.lock().read_at("bytes reader read_at", dst, off)
    }

    pub fn read_byte(&self) -> Option<u8> {
        self.cursor.lock().read_byte()
    }

    pub fn unread_byte(&self) {
        self.cursor.lock().unread_byte("bytes reader unread_byte");
    }

    pub fn seek(&self, offset: i64, whence: i32) -> i64 {
        self.cursor.lock().seek("bytes reader seek", offset, whence)
    }

    pub(crate) fn write_to(&self, sink: &mut Vec<u8>) -> i64 {
        self.cursor.lock().write_to(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_then_eof() {
        let r = BytesReader::new(b"hello".to_vec());
        let mut buf = [0u8; 3];
        assert_eq!(r.read(&mut buf), ReadOutcome { n: 3, eof: false });
        assert_eq!(&buf, b"hel");
        assert_eq!(r.read(&mut buf), ReadOutcome { n: 2, eof: false });
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(r.read(&mut buf), ReadOutcome { n: 0, eof: true });
    }

    #[test]
    fn test_read_at_keeps_position() {
        let r = BytesReader::new(b"abcdef".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(r.read_at(&mut buf, 4), ReadOutcome { n: 2, eof: true });
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(r.len(), 6);
    }

    #[test]
    fn test_read_byte_and_unread() {
        let r = BytesReader::new(b"xy".to_vec());
        assert_eq!(r.read_byte(), Some(b'x'));
        r.unread_byte();
        assert_eq!(r.read_byte(), Some(b'x'));
        assert_eq!(r.read_byte(), Some(b'y'));
        assert_eq!(r.read_byte(), None);
    }

    #[test]
    #[should_panic(expected = "at beginning")]
    fn test_unread_at_start_is_misuse() {
        BytesReader::new(b"x".to_vec()).unread_byte();
    }

    #[test]
    fn test_seek_modes() {
        let r = BytesReader::new(b"0123456789".to_vec());
        assert_eq!(r.seek(3, SEEK_SET), 3);
        assert_eq!(r.seek(2, SEEK_CUR), 5);
        assert_eq!(r.seek(-1, SEEK_END), 9);
        assert_eq!(r.read_byte(), Some(b'9'));
        assert_eq!(r.seek(20, SEEK_SET), 20);
        assert_eq!(r.len(), 0);
    }

    #[test]
    #[should_panic(expected = "negative position")]
    fn test_seek_negative_is_misuse() {
        BytesReader::new(b"abc".to_vec()).seek(-4, SEEK_END);
    }

    #[test]
    #[should_panic(expected = "invalid whence")]
    fn test_seek_bad_whence_is_misuse() {
        BytesReader::new(b"abc".to_vec()).seek(0, 7);
    }

    #[test]
    fn test_write_to_drains() {
        let r = BytesReader::new(b"abc".to_vec());
        r.read_byte();
        let mut sink = Vec::new();
        assert_eq!(r.write_to(&mut sink), 2);
        assert_eq!(sink, b"bc");
        assert_eq!(r.write_to(&mut sink), 0);
    }
}
