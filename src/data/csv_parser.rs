//! CSV reading and writing
//!
//! Reading is incremental: [`RecordReader`] pulls rows one at a time from any
//! `Read` source, decoding the bytes under a declared encoding on the way in, so
//! a load never needs the whole file in memory. Writing serializes a grid back to
//! CSV text for export.

use crate::constants::DECODE_BUFFER_BYTES;
use crate::data::error::{DataError, DataResult};
use crate::types::Grid;
use encoding_rs::{Decoder, DecoderResult, Encoding};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Look up an encoding by its WHATWG label ("utf-8", "latin1", "windows-1252", ...)
pub fn resolve_encoding(label: &str) -> DataResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| DataError::UnknownEncoding(label.to_string()))
}

// ============================================================================
// Decoding
// ============================================================================

/// Adapts a byte source in any supported encoding into a UTF-8 byte stream.
///
/// Malformed input surfaces as an `io::Error` of kind `InvalidData`; it is never
/// replaced with U+FFFD. Text decoded before the malformed sequence is still
/// returned first, so a reader sees every complete record ahead of the error.
/// A leading BOM is stripped.
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    raw: Vec<u8>,
    decoded: Vec<u8>,
    pos: usize,
    finished: bool,
    pending_error: Option<io::Error>,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder_with_bom_removal(),
            raw: vec![0; DECODE_BUFFER_BYTES],
            decoded: Vec::new(),
            pos: 0,
            finished: false,
            pending_error: None,
        }
    }

    /// Read the next block of raw bytes and decode it into `decoded`.
    ///
    /// On malformed input the valid prefix stays in `decoded` and the error is
    /// parked in `pending_error` until that prefix has been read.
    fn refill(&mut self) -> io::Result<()> {
        let n = self.inner.read(&mut self.raw)?;
        let last = n == 0;

        let needed = self
            .decoder
            .max_utf8_buffer_length_without_replacement(n)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "decode buffer overflow"))?;
        self.decoded.clear();
        self.decoded.resize(needed, 0);
        self.pos = 0;

        let mut read = 0;
        let mut written = 0;
        loop {
            let (result, r, w) = self.decoder.decode_to_utf8_without_replacement(
                &self.raw[read..n],
                &mut self.decoded[written..],
                last,
            );
            read += r;
            written += w;
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => {
                    let grow = self.decoded.len().max(16);
                    self.decoded.resize(self.decoded.len() + grow, 0);
                }
                DecoderResult::Malformed(_, _) => {
                    self.pending_error = Some(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("malformed {} input", self.decoder.encoding().name()),
                    ));
                    break;
                }
            }
        }
        self.decoded.truncate(written);
        self.finished = last || self.pending_error.is_some();
        Ok(())
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.decoded.len() {
                let available = &self.decoded[self.pos..];
                let count = available.len().min(buf.len());
                buf[..count].copy_from_slice(&available[..count]);
                self.pos += count;
                return Ok(count);
            }
            if let Some(err) = self.pending_error.take() {
                return Err(err);
            }
            if self.finished {
                return Ok(0);
            }
            self.refill()?;
        }
    }
}

// ============================================================================
// Record Reading
// ============================================================================

/// Incremental reader of comma-delimited records.
///
/// Rows are returned exactly as parsed: ragged rows keep their own width, the
/// caller decides how to pad them.
pub struct RecordReader<R: Read> {
    inner: csv::Reader<DecodingReader<R>>,
    record: csv::StringRecord,
    rows_read: usize,
}

impl RecordReader<File> {
    /// Open a file for incremental reading
    pub fn open(path: &Path, encoding: &'static Encoding) -> DataResult<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file, encoding))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R, encoding: &'static Encoding) -> Self {
        let inner = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(false)
            .flexible(true)
            .from_reader(DecodingReader::new(source, encoding));
        Self {
            inner,
            record: csv::StringRecord::new(),
            rows_read: 0,
        }
    }

    /// Number of rows returned so far
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Next parsed row, or `None` at end of input
    pub fn next_row(&mut self) -> DataResult<Option<Vec<String>>> {
        if !self.inner.read_record(&mut self.record)? {
            return Ok(None);
        }
        self.rows_read += 1;
        Ok(Some(self.record.iter().map(str::to_string).collect()))
    }

    /// Up to `max_rows` rows; fewer only at end of input
    pub fn next_chunk(&mut self, max_rows: usize) -> DataResult<Vec<Vec<String>>> {
        let mut rows = Vec::with_capacity(max_rows.min(1024));
        while rows.len() < max_rows {
            match self.next_row()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Serialize a grid to CSV text: header line first, then one line per row.
///
/// Fields are quoted only when they contain a comma, quote or line break.
pub fn write_csv_content(grid: &Grid) -> DataResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(grid.headers())?;
    for row in grid.rows() {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DataError::Io(io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| DataError::Other(e.to_string()))
}

/// Write a grid to a CSV file
pub fn write_csv_file(grid: &Grid, path: &Path) -> DataResult<()> {
    let content = write_csv_content(grid)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Check if a file path looks like a delimited-text file
pub fn is_csv_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "csv" | "txt"))
        .unwrap_or(false)
}
