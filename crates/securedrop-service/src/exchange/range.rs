//! Single `bytes=` range parsing.
//!
//! Only one range per request is served. Multi-range requests, other units
//! and malformed values are ignored and answered with the full file, which
//! is what a server that does not support the form is allowed to do.

/// An inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: a range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// What part of a file a request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelection {
    /// The whole file.
    Full,
    /// One satisfiable range.
    Partial(ByteRange),
    /// A well-formed range that lies outside the file.
    Unsatisfiable,
}

/// Interpret a `Range` header against a file of `size` bytes.
pub fn select_range(header: Option<&str>, size: u64) -> RangeSelection {
    let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeSelection::Full;
    };
    if ranges.contains(',') {
        return RangeSelection::Full;
    }
    let Some((first, last)) = ranges.trim().split_once('-') else {
        return RangeSelection::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix form: the last N bytes.
        let Ok(suffix) = last.parse::<u64>() else {
            return RangeSelection::Full;
        };
        if suffix == 0 || size == 0 {
            return RangeSelection::Unsatisfiable;
        }
        return RangeSelection::Partial(ByteRange {
            start: size.saturating_sub(suffix),
            end: size - 1,
        });
    }

    let Ok(start) = first.parse::<u64>() else {
        return RangeSelection::Full;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return RangeSelection::Full,
        }
    };

    if start >= size {
        return RangeSelection::Unsatisfiable;
    }
    let end = end.map_or(size - 1, |e| e.min(size - 1));
    RangeSelection::Partial(ByteRange { start, end })
}
