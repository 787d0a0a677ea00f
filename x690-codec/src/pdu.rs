//! PDU: owned byte buffer plus read/write cursor
//!
//! A [`Pdu`] wraps one encoded byte stream and exposes TLV-level
//! read/write/peek operations. The encoding rule is fixed at
//! construction; one struct parameterised by [`EncodingRule`] covers
//! BER, CER and DER, with the per-rule legality checks supplied by the
//! policy predicates.
//!
//! # Cursor discipline
//!
//! The cursor (`offset`) always satisfies `0 <= offset <= len`. Peek
//! operations re-parse at the current offset without moving it; `tlv()`
//! and `write_tlv()` advance it past the bytes they consume or produce;
//! `append()` grows the buffer without touching it.

use bytes::BytesMut;
use x690_core::{EncodingRule, X690Error, X690Result};

use crate::ident::{Length, Tag, TagClass};
use crate::scanner::{self, EOC};
use crate::tlv::Tlv;

/// Buffer + cursor over one encoded byte stream
#[derive(Debug, Clone)]
pub struct Pdu {
    buf: BytesMut,
    offset: usize,
    rule: EncodingRule,
}

impl Pdu {
    /// Create an empty PDU for the given encoding rule
    pub fn new(rule: EncodingRule) -> Self {
        Self {
            buf: BytesMut::new(),
            offset: 0,
            rule,
        }
    }

    /// Create an empty PDU with pre-allocated capacity
    pub fn with_capacity(rule: EncodingRule, capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            offset: 0,
            rule,
        }
    }

    /// Create a PDU over a caller-supplied byte sequence, cursor at 0
    pub fn from_bytes(data: &[u8], rule: EncodingRule) -> Self {
        Self {
            buf: BytesMut::from(data),
            offset: 0,
            rule,
        }
    }

    /// Encoding rule this PDU was constructed with
    pub fn rule(&self) -> EncodingRule {
        self.rule
    }

    /// Full buffer contents
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current cursor position
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move the cursor to an absolute position
    ///
    /// # Errors
    /// `OutOfBounds` if `n > len`.
    pub fn set_offset(&mut self, n: usize) -> X690Result<()> {
        if n > self.buf.len() {
            return Err(X690Error::OutOfBounds {
                offset: n,
                len: self.buf.len(),
            });
        }
        self.offset = n;
        Ok(())
    }

    /// Reset the cursor to the start of the buffer
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    /// Position the cursor on the last byte
    ///
    /// # Errors
    /// `OutOfBounds` if the buffer is empty.
    pub fn seek_last(&mut self) -> X690Result<()> {
        if self.buf.is_empty() {
            return Err(X690Error::OutOfBounds { offset: 0, len: 0 });
        }
        self.offset = self.buf.len() - 1;
        Ok(())
    }

    /// Append raw bytes to the buffer; the cursor is unaffected
    ///
    /// Growth is amortised O(1) (`BytesMut` doubles its capacity as
    /// needed).
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Whether any bytes remain at or after the cursor
    pub fn has_more_data(&self) -> bool {
        self.offset < self.buf.len()
    }

    /// Bytes remaining at or after the cursor
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    /// Parse the header at the cursor without consuming it
    fn parse_header(&self) -> X690Result<(Tag, Length, usize)> {
        if self.offset >= self.buf.len() {
            return Err(X690Error::OutOfBounds {
                offset: self.offset,
                len: self.buf.len(),
            });
        }
        let data = &self.buf[self.offset..];
        let (tag, tag_len) = Tag::decode(data)?;
        let (length, len_len) = Length::decode(&data[tag_len..])?;

        if length.is_indefinite() && !self.rule.allows_indefinite() {
            log::warn!(
                "indefinite length at offset {} rejected under {}",
                self.offset,
                self.rule
            );
            return Err(X690Error::IndefiniteProhibited(self.rule));
        }
        if self.rule.requires_minimal_length() {
            Length::check_canonical(&data[tag_len..])?;
        }

        Ok((tag, length, tag_len + len_len))
    }

    /// Peek the tag class at the cursor
    pub fn peek_class(&self) -> X690Result<TagClass> {
        let (tag, _, _) = self.parse_header()?;
        Ok(tag.class())
    }

    /// Peek the tag number at the cursor
    pub fn peek_tag(&self) -> X690Result<u32> {
        let (tag, _, _) = self.parse_header()?;
        Ok(tag.number())
    }

    /// Peek the constructed flag at the cursor
    pub fn peek_compound(&self) -> X690Result<bool> {
        let (tag, _, _) = self.parse_header()?;
        Ok(tag.is_constructed())
    }

    /// Locate the content region of the TLV at the cursor
    ///
    /// Returns `(header_len, content_len, trailer_len)` relative to the
    /// cursor; the trailer is the 2-byte EOC for the indefinite form.
    fn content_span(&self) -> X690Result<(usize, usize, usize)> {
        let (_, length, header_len) = self.parse_header()?;
        let content = &self.buf[self.offset + header_len..];
        match length {
            Length::Definite(n) => {
                if n > content.len() {
                    return Err(X690Error::TruncatedContent {
                        declared: n,
                        available: content.len(),
                    });
                }
                Ok((header_len, n, 0))
            }
            Length::Indefinite => {
                let eoc = scanner::find_eoc(content)?;
                Ok((header_len, eoc, 2))
            }
        }
    }

    /// Content bytes of the TLV at the cursor, without consuming it
    pub fn bytes(&self) -> X690Result<&[u8]> {
        let (header_len, content_len, _) = self.content_span()?;
        let start = self.offset + header_len;
        Ok(&self.buf[start..start + content_len])
    }

    /// Header + content bytes of the TLV at the cursor, without
    /// consuming it (EOC included for the indefinite form)
    pub fn full_bytes(&self) -> X690Result<&[u8]> {
        let (header_len, content_len, trailer_len) = self.content_span()?;
        let end = self.offset + header_len + content_len + trailer_len;
        Ok(&self.buf[self.offset..end])
    }

    /// Parse and consume the TLV at the cursor
    ///
    /// The cursor advances past the header, the content and, for the
    /// indefinite form, the closing EOC marker.
    pub fn tlv(&mut self) -> X690Result<Tlv> {
        let (tag, length, header_len) = self.parse_header()?;
        let (_, content_len, trailer_len) = self.content_span()?;
        let start = self.offset + header_len;
        let value = self.buf[start..start + content_len].to_vec();
        self.offset = start + content_len + trailer_len;
        Tlv::from_parts(tag, length, value, self.rule)
    }

    /// Parse the TLV at the cursor without consuming it
    ///
    /// Operates on a throwaway copy positioned at the same offset.
    pub fn peek_tlv(&self) -> X690Result<Tlv> {
        let mut copy = self.clone();
        copy.tlv()
    }

    /// Serialize a TLV, append it, and move the cursor to the new end
    ///
    /// # Returns
    /// The number of bytes written.
    ///
    /// # Errors
    /// - `IndefiniteProhibited` if the TLV uses the indefinite form and
    ///   the rule forbids it
    /// - `InvalidValue` for an indefinite-length primitive (X.690 only
    ///   permits the indefinite form on constructed encodings)
    pub fn write_tlv(&mut self, tlv: &Tlv) -> X690Result<usize> {
        if tlv.length().is_indefinite() {
            if !self.rule.allows_indefinite() {
                return Err(X690Error::IndefiniteProhibited(self.rule));
            }
            if !tlv.is_constructed() {
                return Err(X690Error::InvalidValue(
                    "indefinite length requires a constructed encoding".to_string(),
                ));
            }
        }

        let header = tlv.header_bytes();
        self.append(&header);
        self.append(tlv.value());
        let mut written = header.len() + tlv.value().len();
        if tlv.length().is_indefinite() {
            self.append(&EOC);
            written += 2;
        }
        self.offset = self.buf.len();
        Ok(written)
    }

    /// Carve out the next `length` bytes as an independent PDU
    ///
    /// The parent cursor advances past the extracted bytes.
    ///
    /// # Errors
    /// `TruncatedContent` naming the shortfall if fewer than `length`
    /// bytes remain.
    pub fn packet(&mut self, length: usize) -> X690Result<Pdu> {
        let available = self.remaining();
        if available < length {
            return Err(X690Error::TruncatedContent {
                declared: length,
                available,
            });
        }
        let sub = Pdu::from_bytes(&self.buf[self.offset..self.offset + length], self.rule);
        self.offset += length;
        Ok(sub)
    }

    /// Write a long primitive string as a constructed, indefinite-length
    /// sequence of segments (CER)
    ///
    /// The outer TLV carries the primitive's own tag with the
    /// constructed bit set; each child is a primitive TLV with at most
    /// the rule's segment size of payload. For BIT STRING
    /// (`trailing_unused = Some(n)`) the first payload byte of every
    /// segment is the unused-bit count, which is 0 on every segment
    /// except the last.
    ///
    /// # Errors
    /// `RuleNotImplemented` if the rule has no segmented form.
    pub fn write_segmented(
        &mut self,
        tag: Tag,
        payload: &[u8],
        trailing_unused: Option<u8>,
    ) -> X690Result<usize> {
        let segment_len = self
            .rule
            .max_segment_len()
            .ok_or(X690Error::RuleNotImplemented(self.rule))?;

        let start = self.buf.len();

        let outer = tag.with_constructed(true);
        self.append(&outer.encode());
        self.append(&Length::Indefinite.encode());

        let child_tag = tag.with_constructed(false);
        // A bit-string segment spends one payload byte on the
        // unused-bit count.
        let chunk_len = match trailing_unused {
            Some(_) => segment_len - 1,
            None => segment_len,
        };

        let mut chunks = payload.chunks(chunk_len).peekable();
        while let Some(chunk) = chunks.next() {
            let body = match trailing_unused {
                Some(unused) => {
                    let is_last = chunks.peek().is_none();
                    let mut body = vec![if is_last { unused } else { 0 }];
                    body.extend_from_slice(chunk);
                    body
                }
                None => chunk.to_vec(),
            };
            self.append(&child_tag.encode());
            self.append(&Length::Definite(body.len()).encode());
            self.append(&body);
        }

        self.append(&EOC);
        self.offset = self.buf.len();
        Ok(self.buf.len() - start)
    }
}

/// Parse every child TLV inside a constructed TLV's content
///
/// Used for segmented-string reassembly and composite decoding; the
/// children inherit the parent's encoding rule.
pub fn read_children(tlv: &Tlv) -> X690Result<Vec<Tlv>> {
    let mut pdu = Pdu::from_bytes(tlv.value(), tlv.rule());
    let mut children = Vec::new();
    while pdu.has_more_data() {
        children.push(pdu.tlv()?);
    }
    Ok(children)
}
