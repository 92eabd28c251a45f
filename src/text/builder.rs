use parking_lot::Mutex;

/// Append-only text accumulator.
///
/// Bytes are kept raw so a multi-byte sequence may be written one byte at a
/// time; invalid UTF-8 is only replaced when the text is read back.
#[derive(Debug, Default)]
pub struct StringBuilder {
    buf: Mutex<Vec<u8>>,
}

impl StringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.lock().capacity()
    }

    pub fn grow(&self, n: usize) {
        self.buf.lock().reserve(n);
    }

    pub fn reset(&self) {
        *self.buf.lock() = Vec::new();
    }

    pub fn write(&self, bytes: &[u8]) -> usize {
        self.buf.lock().extend_from_slice(bytes);
        bytes.len()
    }

    pub fn write_byte(&self, byte: u8) {
        self.buf.lock().push(byte);
    }

    pub fn write_str(&self, s: &str) -> usize {
        self.write(s.as_bytes())
    }

    /// Accumulated text.
    pub fn string(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    pub(crate) fn with_tail<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        f(&mut self.buf.lock())
    }
}
