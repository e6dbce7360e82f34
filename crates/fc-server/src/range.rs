//! `Range` header parsing for single byte ranges.
//!
//! Only `bytes=<start>-[<end>]` is accepted. Multi-range, suffix
//! (`bytes=-N`) and anything malformed are reported as unsatisfiable so the
//! caller can answer 416 with `Content-Range: bytes */size`.

use fc_core::Error;

/// An inclusive byte range already validated against an artifact size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

/// Parse a `Range` header value into `(start, Option<end>)`.
///
/// Returns `None` for anything outside the supported grammar.
pub fn parse_range_header(value: &str) -> Option<(u64, Option<u64>)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }

    let (start_str, end_str) = spec.split_once('-')?;
    let start_str = start_str.trim();
    let end_str = end_str.trim();

    if start_str.is_empty() || !start_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let start: u64 = start_str.parse().ok()?;

    let end = if end_str.is_empty() {
        None
    } else {
        if !end_str.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(end_str.parse().ok()?)
    };

    Some((start, end))
}

/// Resolve a `Range` header against an artifact of `size` bytes.
///
/// An omitted end, or one past the last byte, is clamped to `size - 1`.
pub fn resolve_range(value: &str, size: u64) -> Result<ByteRange, Error> {
    let unsatisfiable = || Error::RangeNotSatisfiable { size };

    let (start, end) = parse_range_header(value).ok_or_else(unsatisfiable)?;
    if start >= size {
        return Err(unsatisfiable());
    }
    if let Some(end) = end {
        if start > end {
            return Err(unsatisfiable());
        }
    }

    let last = size - 1;
    let end = end.map_or(last, |e| e.min(last));
    Ok(ByteRange { start, end })
}
