use parking_lot::Mutex;

use crate::bytes::{ReadOutcome, SliceCursor};

/// Reader over a snapshot of a string value.
#[derive(Debug, Default)]
pub struct StringReader {
    cursor: Mutex<SliceCursor>,
}

impl StringReader {
    pub fn new(s: &str) -> Self {
        Self {
            cursor: Mutex::new(SliceCursor::new(s.as_bytes().to_vec())),
        }
    }

    pub fn len(&self) -> usize {
        self.cursor.lock().remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size(&self) -> i64 {
        self.cursor.lock().size()
    }

    pub fn reset(&self, s: &str) {
        self.cursor.lock().reset(s.as_bytes().to_vec());
    }

    pub fn read(&self, dst: &mut [u8]) -> ReadOutcome {
        self.cursor.lock().read(dst)
    }

    pub fn read_at(&self, dst: &mut [u8], off: i64) -> ReadOutcome {
        self.cursor.lock().read_at("string reader read_at", dst, off)
    }

    pub fn read_byte(&self) -> Option<u8> {
        self.cursor.lock().read_byte()
    }

    pub fn unread_byte(&self) {
        self.cursor.lock().unread_byte("string reader unread_byte");
    }

    pub fn seek(&self, offset: i64, whence: i32) -> i64 {
        self.cursor.lock().seek("string reader seek", offset, whence)
    }

    pub(crate) fn write_to(&self, sink: &mut Vec<u8>) -> i64 {
        self.cursor.lock().write_to(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::SEEK_SET;

    #[test]
    fn test_string_reader_reads_bytes() {
        let r = StringReader::new("héllo");
        assert_eq!(r.size(), 6);
        let mut buf = [0u8; 3];
        assert_eq!(r.read(&mut buf).n, 3);
        assert_eq!(&buf, "hé".as_bytes());
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn test_reset_rewinds() {
        let r = StringReader::new("abc");
        r.seek(2, SEEK_SET);
        r.reset("xyz");
        assert_eq!(r.read_byte(), Some(b'x'));
    }
}
