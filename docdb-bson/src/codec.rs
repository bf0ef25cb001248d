//! Encoder and decoder for the binary document format.
//!
//! ```text
//! document := int32 total_len, element*, 0x00
//! element  := u8 tag, cstring key, value
//! ```
//!
//! All integers and doubles are little-endian.

use crate::document::{Bson, Document, ElementType};
use crate::error::CodecError;
use crate::oid::{ObjectId, OBJECT_ID_LEN};
use crate::types::{Binary, DateTime, Regex, Timestamp};
use crate::{MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH, MIN_DOCUMENT_SIZE};
use bytes::{Buf, BufMut, BytesMut};

/// Encodes a document into a fresh buffer.
pub fn encode(doc: &Document) -> Result<Vec<u8>, CodecError> {
    let mut buf = BytesMut::with_capacity(64);
    encode_to(doc, &mut buf)?;
    Ok(buf.to_vec())
}

/// Appends the encoding of `doc` to `buf`.
///
/// On error `buf` is truncated back to its original length.
pub fn encode_to(doc: &Document, buf: &mut BytesMut) -> Result<(), CodecError> {
    let start = buf.len();
    let result = write_document(buf, doc.iter(), 0);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

/// Decodes exactly one document occupying the whole buffer.
pub fn decode(buf: &[u8]) -> Result<Document, CodecError> {
    let len = read_length_prefix(buf)?;
    if len != buf.len() {
        return Err(CodecError::LengthMismatch {
            declared: len,
            actual: buf.len(),
        });
    }
    read_document(buf, 0)
}

/// Validates the outer length prefix and returns the declared total length.
pub(crate) fn read_length_prefix(buf: &[u8]) -> Result<usize, CodecError> {
    if buf.len() < 4 {
        return Err(CodecError::Truncated {
            needed: 4 - buf.len(),
        });
    }
    let declared = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if declared < MIN_DOCUMENT_SIZE as i32 {
        return Err(CodecError::InvalidLength(declared));
    }
    let declared = declared as usize;
    if buf.len() < declared {
        return Err(CodecError::Truncated {
            needed: declared - buf.len(),
        });
    }
    Ok(declared)
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn write_document<'a, I>(buf: &mut BytesMut, entries: I, depth: usize) -> Result<(), CodecError>
where
    I: Iterator<Item = (&'a str, &'a Bson)>,
{
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::TooDeep(MAX_NESTING_DEPTH));
    }

    let start = buf.len();
    // Placeholder for the length prefix, patched below.
    buf.put_i32_le(0);

    for (key, value) in entries {
        buf.put_u8(value.element_type().tag());
        write_cstring(buf, key, "key")?;
        write_value(buf, value, depth)?;
    }
    buf.put_u8(0);

    let size = buf.len() - start;
    if size > MAX_DOCUMENT_SIZE {
        return Err(CodecError::DocumentTooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }
    buf[start..start + 4].copy_from_slice(&(size as i32).to_le_bytes());
    Ok(())
}

fn write_value(buf: &mut BytesMut, value: &Bson, depth: usize) -> Result<(), CodecError> {
    match value {
        Bson::Double(v) => buf.put_f64_le(*v),
        Bson::String(s) => {
            buf.put_i32_le(s.len() as i32 + 1);
            buf.put_slice(s.as_bytes());
            buf.put_u8(0);
        }
        Bson::Document(d) => write_document(buf, d.iter(), depth + 1)?,
        Bson::Array(items) => {
            let keys: Vec<String> = (0..items.len()).map(|i| i.to_string()).collect();
            let entries = keys.iter().map(String::as_str).zip(items.iter());
            write_document(buf, entries, depth + 1)?;
        }
        Bson::Binary(bin) => {
            buf.put_i32_le(bin.bytes.len() as i32);
            buf.put_u8(bin.subtype);
            buf.put_slice(&bin.bytes);
        }
        Bson::ObjectId(oid) => buf.put_slice(&oid.bytes()),
        Bson::Boolean(b) => buf.put_u8(u8::from(*b)),
        Bson::DateTime(dt) => buf.put_i64_le(dt.timestamp_millis()),
        Bson::Null => {}
        Bson::Regex(re) => {
            write_cstring(buf, &re.pattern, "regex pattern")?;
            write_cstring(buf, &re.options, "regex options")?;
        }
        Bson::Int32(v) => buf.put_i32_le(*v),
        Bson::Timestamp(ts) => {
            buf.put_u32_le(ts.increment);
            buf.put_u32_le(ts.time);
        }
        Bson::Int64(v) => buf.put_i64_le(*v),
    }
    Ok(())
}

fn write_cstring(buf: &mut BytesMut, s: &str, what: &'static str) -> Result<(), CodecError> {
    if s.as_bytes().contains(&0) {
        return Err(CodecError::InteriorNul(what));
    }
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over an element list.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn need(&self, n: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n - self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn i32(&mut self) -> Result<i32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    fn f64(&mut self) -> Result<f64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_f64_le())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.need(n)?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn cstring(&mut self, what: &'static str) -> Result<String, CodecError> {
        let end = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::Truncated { needed: 1 })?;
        let raw = self.take(end + 1)?;
        std::str::from_utf8(&raw[..end])
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8(what))
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let len = self.i32()?;
        if len < 1 {
            return Err(CodecError::InvalidLength(len));
        }
        let raw = self.take(len as usize)?;
        let (body, terminator) = raw.split_at(raw.len() - 1);
        if terminator != [0] {
            return Err(CodecError::MissingTerminator);
        }
        std::str::from_utf8(body)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8("string value"))
    }

    /// Returns the bytes of an embedded document, including its prefix.
    fn embedded(&mut self) -> Result<&'a [u8], CodecError> {
        let len = read_length_prefix(self.buf)?;
        self.take(len)
    }
}

/// Decodes a document whose length prefix has already been validated
/// against `buf.len()`.
fn read_document(buf: &[u8], depth: usize) -> Result<Document, CodecError> {
    let mut doc = Document::new();
    read_elements(buf, depth, |key, value| doc.append(key, value))?;
    Ok(doc)
}

fn read_array(buf: &[u8], depth: usize) -> Result<Vec<Bson>, CodecError> {
    let mut items = Vec::new();
    read_elements(buf, depth, |_, value| items.push(value))?;
    Ok(items)
}

fn read_elements<F>(buf: &[u8], depth: usize, mut sink: F) -> Result<(), CodecError>
where
    F: FnMut(String, Bson),
{
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::TooDeep(MAX_NESTING_DEPTH));
    }
    if buf.last() != Some(&0) {
        return Err(CodecError::MissingTerminator);
    }

    let mut reader = Reader {
        buf: &buf[4..buf.len() - 1],
    };

    while reader.buf.has_remaining() {
        let tag = reader.u8()?;
        let key = reader.cstring("key")?;
        let Some(element_type) = ElementType::from_tag(tag) else {
            return Err(CodecError::UnknownType { tag, key });
        };
        let value = read_value(&mut reader, element_type, depth)?;
        sink(key, value);
    }
    Ok(())
}

fn read_value(
    reader: &mut Reader<'_>,
    element_type: ElementType,
    depth: usize,
) -> Result<Bson, CodecError> {
    Ok(match element_type {
        ElementType::Double => Bson::Double(reader.f64()?),
        ElementType::String => Bson::String(reader.string()?),
        ElementType::Document => Bson::Document(read_document(reader.embedded()?, depth + 1)?),
        ElementType::Array => Bson::Array(read_array(reader.embedded()?, depth + 1)?),
        ElementType::Binary => {
            let len = reader.i32()?;
            if len < 0 {
                return Err(CodecError::InvalidLength(len));
            }
            let subtype = reader.u8()?;
            let bytes = reader.take(len as usize)?.to_vec();
            Bson::Binary(Binary { subtype, bytes })
        }
        ElementType::ObjectId => {
            let mut bytes = [0u8; OBJECT_ID_LEN];
            bytes.copy_from_slice(reader.take(OBJECT_ID_LEN)?);
            Bson::ObjectId(ObjectId::from_bytes(bytes))
        }
        ElementType::Boolean => match reader.u8()? {
            0 => Bson::Boolean(false),
            1 => Bson::Boolean(true),
            other => return Err(CodecError::InvalidBoolean(other)),
        },
        ElementType::DateTime => Bson::DateTime(DateTime::from_millis(reader.i64()?)),
        ElementType::Null => Bson::Null,
        ElementType::Regex => {
            let pattern = reader.cstring("regex pattern")?;
            let options = reader.cstring("regex options")?;
            Bson::Regex(Regex { pattern, options })
        }
        ElementType::Int32 => Bson::Int32(reader.i32()?),
        ElementType::Timestamp => {
            let increment = reader.u32()?;
            let time = reader.u32()?;
            Bson::Timestamp(Timestamp { time, increment })
        }
        ElementType::Int64 => Bson::Int64(reader.i64()?),
    })
}
