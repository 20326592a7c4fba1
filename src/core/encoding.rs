// Encoding resolution: ordered candidate encodings and a streaming UTF-8 transcoder.
use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Read};
use std::path::Path;

use encoding_rs::{Decoder, DecoderResult, GBK, UTF_8, UTF_16LE};
use tracing::debug;

use crate::core::error::{DecodeAttempt, Error, ErrorKind};
use crate::core::rows::{malformed_detail, open_records, record_error};

const RAW_CHUNK: usize = 8 * 1024;
// Worst case expansion into UTF-8 is three output bytes per two input bytes.
const OUT_CHUNK: usize = RAW_CHUNK * 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TextEncoding {
    Utf8,
    Utf16,
    Gbk,
    Ascii,
}

/// Priority order tried when resolving a table header.
pub const CANDIDATES: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Utf16,
    TextEncoding::Gbk,
    TextEncoding::Ascii,
];

/// Fixed encoding for full dumps; dumps never walk the candidate list.
pub const DEFAULT_ENCODING: TextEncoding = TextEncoding::Utf8;

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Gbk => "gbk",
            TextEncoding::Ascii => "ascii",
        }
    }

    fn transcoder(self) -> Transcoder {
        match self {
            TextEncoding::Utf8 => Transcoder::Decoder(UTF_8.new_decoder_with_bom_removal()),
            // BOM sniffing picks the byte order; little-endian when absent.
            TextEncoding::Utf16 => Transcoder::Decoder(UTF_16LE.new_decoder()),
            TextEncoding::Gbk => Transcoder::Decoder(GBK.new_decoder_without_bom_handling()),
            TextEncoding::Ascii => Transcoder::Ascii,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised through `io::Error` when the input is not valid in the reader's encoding.
#[derive(Debug)]
pub struct MalformedInput {
    pub encoding: TextEncoding,
    pub offset: u64,
}

impl fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed {} input near byte {}",
            self.encoding.label(),
            self.offset
        )
    }
}

impl StdError for MalformedInput {}

enum Transcoder {
    Decoder(Decoder),
    Ascii,
}

/// Reader adapter that yields UTF-8 transcoded from `encoding`, failing on
/// the first malformed sequence instead of substituting replacement chars.
pub struct DecodingReader<R> {
    inner: R,
    encoding: TextEncoding,
    transcoder: Transcoder,
    raw: Vec<u8>,
    raw_start: usize,
    raw_end: usize,
    out: Vec<u8>,
    out_start: usize,
    out_end: usize,
    position: u64,
    eof: bool,
    finished: bool,
    malformed_at: Option<u64>,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: TextEncoding) -> Self {
        Self {
            inner,
            encoding,
            transcoder: encoding.transcoder(),
            raw: vec![0u8; RAW_CHUNK],
            raw_start: 0,
            raw_end: 0,
            out: vec![0u8; OUT_CHUNK],
            out_start: 0,
            out_end: 0,
            position: 0,
            eof: false,
            finished: false,
            malformed_at: None,
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    fn fill_raw(&mut self) -> io::Result<()> {
        if self.raw_start < self.raw_end || self.eof {
            return Ok(());
        }
        loop {
            match self.inner.read(&mut self.raw) {
                Ok(0) => {
                    self.eof = true;
                    self.raw_start = 0;
                    self.raw_end = 0;
                    return Ok(());
                }
                Ok(n) => {
                    self.raw_start = 0;
                    self.raw_end = n;
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    fn transcode(&mut self) -> io::Result<()> {
        self.fill_raw()?;
        let last = self.eof;
        let src = &self.raw[self.raw_start..self.raw_end];

        let (read, written, malformed, drained) = match &mut self.transcoder {
            Transcoder::Decoder(decoder) => {
                let (result, read, written) =
                    decoder.decode_to_utf8_without_replacement(src, &mut self.out, last);
                match result {
                    DecoderResult::InputEmpty => (read, written, None, true),
                    DecoderResult::OutputFull => (read, written, None, false),
                    DecoderResult::Malformed(_, _) => (read, written, Some(read), false),
                }
            }
            Transcoder::Ascii => {
                let take = src.len().min(self.out.len());
                let valid = src[..take]
                    .iter()
                    .position(|byte| !byte.is_ascii())
                    .unwrap_or(take);
                self.out[..valid].copy_from_slice(&src[..valid]);
                let malformed = (valid < take).then_some(valid);
                (valid, valid, malformed, take == src.len())
            }
        };

        if let Some(at) = malformed {
            self.malformed_at = Some(self.position + at as u64);
        }
        self.raw_start += read;
        self.position += read as u64;
        self.out_start = 0;
        self.out_end = written;
        if last && drained && self.raw_start == self.raw_end {
            self.finished = true;
        }
        Ok(())
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.out_start < self.out_end {
                let n = buf.len().min(self.out_end - self.out_start);
                buf[..n].copy_from_slice(&self.out[self.out_start..self.out_start + n]);
                self.out_start += n;
                return Ok(n);
            }
            if let Some(offset) = self.malformed_at {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    MalformedInput {
                        encoding: self.encoding,
                        offset,
                    },
                ));
            }
            if self.finished || buf.is_empty() {
                return Ok(0);
            }
            self.transcode()?;
        }
    }
}

/// Header of a table plus the encoding that decoded it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedHeader {
    pub columns: Vec<String>,
    pub encoding: TextEncoding,
}

/// Decodes the first record of `path`, trying each candidate encoding in order.
///
/// The first candidate that yields a record wins; the rest of the file is not
/// checked. An empty file resolves to an empty column list.
pub fn resolve_header(path: &Path) -> Result<ResolvedHeader, Error> {
    let mut attempts = Vec::new();
    for encoding in CANDIDATES {
        let mut reader = open_records(path, encoding)?;
        let mut record = csv::StringRecord::new();
        match reader.read_record(&mut record) {
            Ok(found) => {
                let columns = if found {
                    record.iter().map(str::to_string).collect()
                } else {
                    Vec::new()
                };
                debug!(path = %path.display(), %encoding, width = columns.len(), "resolved header");
                return Ok(ResolvedHeader { columns, encoding });
            }
            Err(err) => match malformed_detail(&err) {
                Some(detail) => {
                    debug!(path = %path.display(), %encoding, %detail, "header decode failed");
                    attempts.push(DecodeAttempt {
                        encoding: encoding.label(),
                        detail,
                    });
                }
                None => return Err(record_error(err, path)),
            },
        }
    }
    Err(Error::new(ErrorKind::DecodeFailure)
        .with_message("no candidate encoding could decode the header")
        .with_path(path)
        .with_attempts(attempts))
}
