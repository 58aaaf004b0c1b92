//! Recovery of JSON objects embedded at unknown offsets in a byte buffer.
//!
//! The replay container has no framing for its JSON blocks, so every
//! balanced `{ ... }` span is a candidate. Braces are counted without regard
//! to JSON string syntax: a brace inside a string value cuts the span short,
//! the candidate fails to parse and is dropped.

use memchr::{memchr, memchr2_iter};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::trace;

use crate::{Error, Result};

const OPEN: u8 = b'{';
const CLOSE: u8 = b'}';

/// A JSON object recovered from a replay buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedObject {
    /// Byte offset of the opening brace.
    pub offset: usize,
    /// Length of the span in bytes, braces included.
    pub len: usize,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    /// Exclusive.
    end: usize,
}

/// Lazy iterator over the objects embedded in a buffer, in buffer order.
///
/// A successfully consumed span is never rescanned, so objects nested in a
/// parsed object are not reported separately.
pub struct EmbeddedObjects<'a> {
    data: &'a [u8],
    pos: usize,
    /// Set once a candidate ran off the end of the buffer. Every balanced span
    /// after it was matched while probing it, so scanning continues from this
    /// queue instead of the raw bytes.
    pending: Option<VecDeque<Span>>,
}

impl<'a> EmbeddedObjects<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            pending: None,
        }
    }

    fn next_span(&mut self) -> Option<Span> {
        if let Some(pending) = self.pending.as_mut() {
            let span = loop {
                let span = pending.pop_front()?;
                if span.start >= self.pos {
                    break span;
                }
            };
            self.pos = span.end;
            return Some(span);
        }

        let start = self.pos + memchr(OPEN, &self.data[self.pos..])?;
        match span_end(self.data, start) {
            Some(end) => {
                self.pos = end;
                Some(Span { start, end })
            }
            None => {
                trace!("unterminated candidate at offset {start}");
                self.pos = start + 1;
                self.pending = Some(balanced_spans(self.data, start + 1));
                self.next_span()
            }
        }
    }
}

impl Iterator for EmbeddedObjects<'_> {
    type Item = EmbeddedObject;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let span = self.next_span()?;
            match parse_object(&self.data[span.start..span.end], span.start) {
                Ok(fields) => {
                    return Some(EmbeddedObject {
                        offset: span.start,
                        len: span.end - span.start,
                        fields,
                    });
                }
                Err(e) => trace!("{e}"),
            }
        }
    }
}

/// Parses one candidate span. Invalid UTF-8 is replaced rather than rejected.
pub fn parse_object(bytes: &[u8], offset: usize) -> Result<Map<String, Value>> {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str(&text).map_err(|source| Error::MalformedEmbeddedObject { offset, source })
}

/// End (exclusive) of the span opened at `start`, if its depth returns to zero.
fn span_end(data: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in memchr2_iter(OPEN, CLOSE, &data[start..]) {
        if data[start + i] == OPEN {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(start + i + 1);
            }
        }
    }
    None
}

/// Every balanced span starting at or after `from`, ordered by start offset.
/// Closing braces with nothing open are ignored.
fn balanced_spans(data: &[u8], from: usize) -> VecDeque<Span> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    for i in memchr2_iter(OPEN, CLOSE, &data[from..]) {
        let i = from + i;
        if data[i] == OPEN {
            open.push(i);
        } else if let Some(start) = open.pop() {
            spans.push(Span { start, end: i + 1 });
        }
    }
    spans.sort_unstable_by_key(|span| span.start);
    spans.into()
}
