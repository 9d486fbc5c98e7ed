//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server responses without
//! external dependencies, keeping allocations under control.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Responses are parsed top-down; the reader only
//!    owns a reusable line buffer.
//! 2. **Binary-Safe**: Bulk strings are treated as raw bytes, including
//!    zero-length payloads.
//! 3. **Fail Fast**: Invalid framing returns protocol errors immediately.

use std::io::{BufRead, Read};

use crate::client::{ClientError, ClientResult};

/// Nesting limit for arrays; replies to GET/SET/DEL/PING are flat.
const MAX_DEPTH: usize = 8;

/// Largest bulk payload accepted, matching the server-side `proto-max-bulk-len`.
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Largest array length accepted in a reply.
const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Array capacity reserved up front; longer arrays grow as items arrive.
const ARRAY_PREALLOC: usize = 16;

/// Longest header or simple reply line accepted.
const MAX_LINE_LEN: u64 = 64 * 1024;

/// Bulk capacity reserved up front; larger payloads grow as bytes arrive.
const BULK_PREALLOC: usize = 64 * 1024;

/// RESP response value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style responses.
    Simple(Vec<u8>),
    /// -ERR ... responses.
    Error(Vec<u8>),
    /// :123 responses.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays, with None for null.
    Array(Option<Vec<RespValue>>),
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    push_header(out, b'*', args.len());
    for arg in args {
        push_header(out, b'$', arg.len());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

fn push_header(out: &mut Vec<u8>, marker: u8, len: usize) {
    out.push(marker);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Buffered RESP2 reader with a reusable line buffer.
pub struct RespReader<R> {
    inner: R,
    line: Vec<u8>,
}

impl<R: BufRead> RespReader<R> {
    pub fn new(inner: R) -> Self {
        RespReader {
            inner,
            line: Vec::with_capacity(128),
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Reads one complete RESP value.
    pub fn read_value(&mut self) -> ClientResult<RespValue> {
        self.read_nested(0)
    }

    fn read_nested(&mut self, depth: usize) -> ClientResult<RespValue> {
        if depth > MAX_DEPTH {
            return Err(ClientError::Protocol("reply nested too deeply"));
        }
        self.read_line()?;
        let (&marker, rest) = self
            .line
            .split_first()
            .ok_or(ClientError::Protocol("empty reply line"))?;

        match marker {
            b'+' => Ok(RespValue::Simple(rest.to_vec())),
            b'-' => Ok(RespValue::Error(rest.to_vec())),
            b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
            b'$' => {
                let Some(len) = parse_len(rest, MAX_BULK_LEN, "bulk length exceeds limit")? else {
                    return Ok(RespValue::Bulk(None));
                };
                self.read_bulk(len).map(|data| RespValue::Bulk(Some(data)))
            }
            b'*' => {
                let Some(len) = parse_len(rest, MAX_ARRAY_LEN, "array length exceeds limit")? else {
                    return Ok(RespValue::Array(None));
                };
                let mut items = Vec::with_capacity(len.min(ARRAY_PREALLOC));
                for _ in 0..len {
                    items.push(self.read_nested(depth + 1)?);
                }
                Ok(RespValue::Array(Some(items)))
            }
            _ => Err(ClientError::Protocol("unknown reply marker")),
        }
    }

    fn read_bulk(&mut self, len: usize) -> ClientResult<Vec<u8>> {
        let mut data = Vec::with_capacity(len.min(BULK_PREALLOC));
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut data)?;
        if read < len {
            return Err(ClientError::Protocol("connection closed mid-reply"));
        }

        let mut crlf = [0u8; 2];
        self.inner.read_exact(&mut crlf)?;
        if crlf != *b"\r\n" {
            return Err(ClientError::Protocol("bulk string missing CRLF"));
        }
        Ok(data)
    }

    fn read_line(&mut self) -> ClientResult<()> {
        self.line.clear();
        let bytes = (&mut self.inner).take(MAX_LINE_LEN).read_until(b'\n', &mut self.line)?;
        if bytes == 0 {
            return Err(ClientError::Protocol("connection closed mid-reply"));
        }
        if !self.line.ends_with(b"\r\n") {
            return Err(ClientError::Protocol("reply line missing CRLF"));
        }
        self.line.truncate(self.line.len() - 2);
        Ok(())
    }
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or(ClientError::Protocol("invalid integer"))
}

/// Parses a length header; negative means null, anything above `max` is rejected.
fn parse_len(data: &[u8], max: usize, too_long: &'static str) -> ClientResult<Option<usize>> {
    let len = parse_i64(data)?;
    if len < 0 {
        return Ok(None);
    }
    match usize::try_from(len) {
        Ok(len) if len <= max => Ok(Some(len)),
        _ => Err(ClientError::Protocol(too_long)),
    }
}
