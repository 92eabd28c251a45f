//! Growable byte buffer with a read cursor.
//!
//! Writes append at the end, reads consume from the front. Once every byte
//! has been read the buffer resets itself so the storage is reused.

use parking_lot::Mutex;

use super::reader::ReadOutcome;
use crate::contract::misuse;

#[derive(Debug, Default)]
struct BufferState {
    buf: Vec<u8>,
    off: usize,
}

impl BufferState {
    fn unread(&self) -> &[u8] {
        &self.buf[self.off..]
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.off = 0;
    }

    fn consume(&mut self, n: usize) {
        self.off += n;
        if self.off >= self.buf.len() {
            self.reset();
        }
    }
}

/// A mutable byte buffer shared through the registry.
#[derive(Debug, Default)]
pub struct BytesBuffer {
    state: Mutex<BufferState>,
}

impl BytesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer whose initial contents are `data`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(BufferState { buf: data, off: 0 }),
        }
    }

    /// Unread length.
    pub fn len(&self) -> usize {
        self.state.lock().unread().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().buf.capacity()
    }

    /// Ensure room for `n` more bytes without reallocating.
    pub fn grow(&self, n: usize) {
        self.state.lock().buf.reserve(n);
    }

    pub fn reset(&self) {
        self.state.lock().reset();
    }

    /// Keep only the first `n` unread bytes. `n` past the end is misuse.
    pub fn truncate(&self, n: usize) {
        let mut state = self.state.lock();
        if n == 0 {
            state.reset();
            return;
        }
        let len = state.unread().len();
        if n > len {
            drop(state);
            misuse(
                "bytes buffer truncate",
                format!("truncation out of range: {} > {}", n, len),
            );
        }
        let end = state.off + n;
        state.buf.truncate(end);
    }

    /// Append bytes, returning the count written.
    pub fn write(&self, data: &[u8]) -> usize {
        self.state.lock().buf.extend_from_slice(data);
        data.len()
    }

    pub fn write_byte(&self, byte: u8) {
        self.state.lock().buf.push(byte);
    }

    /// Append the UTF-8 encoding of `rune`; invalid scalars become U+FFFD.
    pub fn write_rune(&self, rune: u32) -> usize {
        let ch = char::from_u32(rune).unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut tmp = [0u8; 4];
        self.write(ch.encode_utf8(&mut tmp).as_bytes())
    }

    /// Copy of the unread bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.state.lock().unread().to_vec()
    }

    /// Unread bytes as text, replacing invalid UTF-8.
    pub fn string(&self) -> String {
        String::from_utf8_lossy(self.state.lock().unread()).into_owned()
    }

    /// Read into `dst`. An empty buffer reports EOF unless `dst` is empty.
    pub fn read(&self, dst: &mut [u8]) -> ReadOutcome {
        let mut state = self.state.lock();
        if state.unread().is_empty() {
            state.reset();
            return ReadOutcome {
                n: 0,
                eof: !dst.is_empty(),
            };
        }
        let n = dst.len().min(state.unread().len());
        dst[..n].copy_from_slice(&state.unread()[..n]);
        state.consume(n);
        ReadOutcome { n, eof: false }
    }

    /// Remove and return up to `n` bytes from the front.
    pub fn next(&self, n: usize) -> Vec<u8> {
        let mut state = self.state.lock();
        let n = n.min(state.unread().len());
        let out = state.unread()[..n].to_vec();
        state.consume(n);
        out
    }

    pub fn read_byte(&self) -> Option<u8> {
        let mut state = self.state.lock();
        let byte = state.unread().first().copied();
        match byte {
            Some(_) => state.consume(1),
            None => state.reset(),
        }
        byte
    }

    /// Move every unread byte of `self` into `dst`.
    pub fn write_to(&self, dst: &BytesBuffer) -> i64 {
        if std::ptr::eq(self, dst) {
            misuse("bytes buffer write_to", "source and destination are the same buffer");
        }
        let drained = {
            let mut state = self.state.lock();
            let out = state.unread().to_vec();
            state.reset();
            out
        };
        dst.write(&drained) as i64
    }

    /// Run `f` against the raw storage, for readers that drain into it.
    pub(crate) fn with_tail<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        f(&mut self.state.lock().buf)
    }
}
