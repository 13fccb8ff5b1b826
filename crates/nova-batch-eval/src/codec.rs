//! Wire format of the batch helper's reply.
//!
//! The helper returns one string whose ISO-8859-1 bytes are a sequence of
//! entries. Each entry is a big-endian `i32` length `L` followed by `|L|`
//! bytes of text. A negative `L` marks the entry as an error message.
//! Entries carry no identifier; they correspond to the submitted values by
//! position.

use thiserror::Error;

const LENGTH_LEN: usize = 4;

/// One decoded reply entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseEntry {
    pub is_error: bool,
    pub message: String,
}

impl ResponseEntry {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            is_error: false,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated length field at offset {offset}: {remaining} bytes left")]
    TruncatedLength { offset: usize, remaining: usize },
    #[error("entry at offset {offset} declares {len} bytes but only {remaining} remain")]
    TruncatedEntry {
        offset: usize,
        len: usize,
        remaining: usize,
    },
}

struct ResponseReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ResponseReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn read_length(&mut self) -> Result<i32, DecodeError> {
        if self.remaining() < LENGTH_LEN {
            return Err(DecodeError::TruncatedLength {
                offset: self.pos,
                remaining: self.remaining(),
            });
        }
        let v = i32::from_be_bytes([
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
            self.buf[self.pos + 3],
        ]);
        self.pos += LENGTH_LEN;
        Ok(v)
    }

    fn read_bytes(&mut self, len: usize, entry_offset: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::TruncatedEntry {
                offset: entry_offset,
                len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}

/// Decode a complete reply. Never returns a partial entry list.
pub fn decode_response(bytes: &[u8]) -> Result<Vec<ResponseEntry>, DecodeError> {
    let mut r = ResponseReader::new(bytes);
    let mut entries = Vec::new();
    while r.remaining() > 0 {
        let offset = r.pos;
        let length = r.read_length()?;
        let len = length.unsigned_abs() as usize;
        let text = r.read_bytes(len, offset)?;
        entries.push(ResponseEntry {
            is_error: length < 0,
            message: latin1_string(text),
        });
    }
    Ok(entries)
}

/// Encode entries the way the debuggee helper does.
///
/// An error entry with an empty message has length `-0` and therefore reads
/// back as a success.
pub fn encode_response(entries: &[ResponseEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        let text = latin1_bytes(&entry.message);
        let len = i32::try_from(text.len()).unwrap_or(i32::MAX);
        let length = if entry.is_error { -len } else { len };
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&text[..len as usize]);
    }
    out
}

/// ISO-8859-1 encode; characters outside the charset become `?`.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

pub fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
