//! CSV records.
//!
//! The reader owns a copy of its input and yields one record per call. The
//! first record fixes the field count; a later record with a different count
//! is a parse error, and reading continues after it. Fields are repaired to
//! UTF-8 on the way out.
//!
//! The writer buffers encoded records and moves them into the destination
//! bytes buffer on `flush`. Fields are quoted only when they hold a comma, a
//! quote or a line break.

use std::io::{self, Cursor, Write};
use std::sync::Arc;

use ::csv::{ByteRecord, ErrorKind, Reader, ReaderBuilder, Writer, WriterBuilder};
use parking_lot::Mutex;

use crate::bytes::BytesBuffer;
use crate::status::{codes, FatResult, Failure};

fn parse_failure(e: ::csv::Error) -> Failure {
    match e.kind() {
        ErrorKind::UnequalLengths { pos, expected_len, len } => {
            let line = pos.as_ref().map_or(0, |p| p.line());
            Failure::syntax(
                codes::CSV_PARSE,
                format!(
                    "record on line {}: wrong number of fields (want {}, got {})",
                    line, expected_len, len
                ),
            )
        }
        ErrorKind::Io(_) => Failure::other(codes::CSV_PARSE, format!("csv read: {}", e)),
        _ => Failure::syntax(codes::CSV_PARSE, format!("csv parse: {}", e)),
    }
}

/// Record reader over an in-memory copy of its input.
pub struct CsvReader {
    inner: Mutex<Reader<Cursor<Vec<u8>>>>,
}

impl CsvReader {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(false)
            .from_reader(Cursor::new(data));
        Self {
            inner: Mutex::new(reader),
        }
    }

    /// Next record, or an EOF failure once the input is exhausted.
    pub fn read(&self) -> FatResult<Vec<String>> {
        let mut record = ByteRecord::new();
        let mut reader = self.inner.lock();
        match reader.read_byte_record(&mut record) {
            Ok(true) => Ok(record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect()),
            Ok(false) => Err(Failure::eof()),
            Err(e) => Err(parse_failure(e)),
        }
    }

    /// Byte offset just past the most recently read record.
    pub fn input_offset(&self) -> i64 {
        self.inner.lock().position().byte() as i64
    }
}

/// `io::Write` over a shared bytes buffer.
struct BufferSink(Arc<BytesBuffer>);

impl Write for BufferSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.0.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Record writer into a bytes buffer. The first failure is sticky and is
/// reported again by [`CsvWriter::error`].
pub struct CsvWriter {
    inner: Mutex<Writer<BufferSink>>,
    error: Mutex<Option<Failure>>,
}

impl CsvWriter {
    pub fn new(dst: Arc<BytesBuffer>) -> Self {
        let writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(BufferSink(dst));
        Self {
            inner: Mutex::new(writer),
            error: Mutex::new(None),
        }
    }

    fn remember(&self, failure: Failure) -> Failure {
        self.error.lock().get_or_insert_with(|| failure.clone());
        failure
    }

    /// Encode one record. Nothing reaches the buffer until [`CsvWriter::flush`].
    pub fn write_record<S: AsRef<str>>(&self, fields: &[S]) -> FatResult<()> {
        self.inner
            .lock()
            .write_record(fields.iter().map(|f| f.as_ref().as_bytes()))
            .map_err(|e| self.remember(Failure::other(codes::CSV_IO, format!("csv write: {}", e))))
    }

    pub fn flush(&self) {
        if let Err(e) = self.inner.lock().flush() {
            self.remember(Failure::other(codes::CSV_IO, format!("csv flush: {}", e)));
        }
    }

    /// The first write or flush failure, if any.
    pub fn error(&self) -> FatResult<()> {
        match self.error.lock().clone() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}
