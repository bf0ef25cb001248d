//! Length-validated raw documents.
//!
//! A [`RawDocumentBuf`] owns the bytes of exactly one encoded document.
//! Only the outer framing is checked on construction; elements are decoded
//! on demand with [`RawDocumentBuf::decode`].

use crate::codec::{self, read_length_prefix};
use crate::document::Document;
use crate::error::CodecError;
use bytes::{Bytes, BytesMut};

/// An owned, encoded document.
#[derive(Clone, PartialEq, Eq)]
pub struct RawDocumentBuf {
    bytes: Bytes,
}

impl RawDocumentBuf {
    /// Wraps `bytes`, checking the length prefix and terminator.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, CodecError> {
        let bytes = bytes.into();
        let declared = read_length_prefix(&bytes)?;
        if declared != bytes.len() {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        if bytes[declared - 1] != 0 {
            return Err(CodecError::MissingTerminator);
        }
        Ok(Self { bytes })
    }

    /// Encodes a document.
    pub fn from_document(doc: &Document) -> Result<Self, CodecError> {
        let mut buf = BytesMut::new();
        codec::encode_to(doc, &mut buf)?;
        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Splits the next complete document off the front of `buf`.
    ///
    /// Returns `Ok(Some(doc))` if a complete document was available,
    /// `Ok(None)` if more data is needed, or `Err` if the framing is
    /// invalid.
    pub fn read_from(buf: &mut BytesMut) -> Result<Option<Self>, CodecError> {
        let declared = match read_length_prefix(buf) {
            Ok(len) => len,
            Err(CodecError::Truncated { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let bytes = buf.split_to(declared).freeze();
        if bytes[declared - 1] != 0 {
            return Err(CodecError::MissingTerminator);
        }
        Ok(Some(Self { bytes }))
    }

    /// Decodes the elements into an owned document.
    pub fn decode(&self) -> Result<Document, CodecError> {
        codec::decode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: the smallest valid document is five bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for RawDocumentBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDocumentBuf")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AsRef<[u8]> for RawDocumentBuf {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Cuts a byte stream into documents as the bytes arrive.
///
/// Input is fed in arbitrary pieces with [`push`](Self::push). Each
/// [`next_raw`](Self::next_raw) call hands back one complete document,
/// and [`finish`](Self::finish) reports a stream that stopped partway
/// through a document.
#[derive(Debug, Default)]
pub struct DocumentSplitter {
    pending: BytesMut,
    consumed: u64,
    emitted: u64,
}

impl DocumentSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next piece of the stream.
    pub fn push(&mut self, chunk: impl AsRef<[u8]>) {
        self.pending.extend_from_slice(chunk.as_ref());
    }

    /// Takes the next complete document, or `Ok(None)` until more bytes arrive.
    ///
    /// A framing error leaves the offending bytes in place, so
    /// [`offset`](Self::offset) still points at the bad document.
    pub fn next_raw(&mut self) -> Result<Option<RawDocumentBuf>, CodecError> {
        let doc = RawDocumentBuf::read_from(&mut self.pending)?;
        if let Some(ref raw) = doc {
            self.consumed += raw.len() as u64;
            self.emitted += 1;
        }
        Ok(doc)
    }

    /// Like [`next_raw`](Self::next_raw), decoding the document as well.
    pub fn next_document(&mut self) -> Result<Option<Document>, CodecError> {
        self.next_raw()?.map(|raw| raw.decode()).transpose()
    }

    /// Bytes received but not yet part of a complete document.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Stream offset of the first byte not yet handed out.
    pub fn offset(&self) -> u64 {
        self.consumed
    }

    /// Number of documents handed out so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Ends the stream. Fails if any bytes are still buffered.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // Complete documents left unread also count as trailing bytes
        let declared = read_length_prefix(&self.pending)?;
        Err(CodecError::LengthMismatch {
            declared,
            actual: self.pending.len(),
        })
    }
}

/// Splits a concatenation of encoded documents, as found in dump files.
///
/// Fails if the data ends partway through a document.
pub fn split_documents(data: impl AsRef<[u8]>) -> Result<Vec<RawDocumentBuf>, CodecError> {
    let mut splitter = DocumentSplitter::new();
    splitter.push(data);
    let mut docs = Vec::new();
    while let Some(raw) = splitter.next_raw()? {
        docs.push(raw);
    }
    splitter.finish()?;
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_from_bytes_valid() {
        let encoded = codec::encode(&doc! { "a": 1 }).unwrap();
        let raw = RawDocumentBuf::from_bytes(encoded.clone()).unwrap();
        assert_eq!(raw.as_bytes(), &encoded[..]);
        assert_eq!(raw.len(), encoded.len());
        assert!(!raw.is_empty());
        assert_eq!(raw.decode().unwrap().get_i32("a"), Some(1));
    }

    #[test]
    fn test_from_bytes_rejects_bad_framing() {
        let encoded = codec::encode(&doc! { "a": 1 }).unwrap();

        let short = encoded[..encoded.len() - 1].to_vec();
        assert!(matches!(
            RawDocumentBuf::from_bytes(short),
            Err(CodecError::Truncated { needed: 1 })
        ));

        let mut long = encoded.clone();
        long.push(0);
        assert!(matches!(
            RawDocumentBuf::from_bytes(long),
            Err(CodecError::LengthMismatch { .. })
        ));

        let mut unterminated = encoded;
        let last = unterminated.len() - 1;
        unterminated[last] = 9;
        assert!(matches!(
            RawDocumentBuf::from_bytes(unterminated),
            Err(CodecError::MissingTerminator)
        ));
    }

    #[test]
    fn test_from_bytes_defers_element_validation() {
        // Framing is valid but the element tag is unknown
        let bytes = vec![8, 0, 0, 0, 0x42, b'k', 0, 0];
        let raw = RawDocumentBuf::from_bytes(bytes).unwrap();
        assert!(matches!(
            raw.decode(),
            Err(CodecError::UnknownType { tag: 0x42, .. })
        ));
    }

    #[test]
    fn test_from_document() {
        let d = doc! { "x": "y" };
        let raw = RawDocumentBuf::from_document(&d).unwrap();
        assert_eq!(raw.decode().unwrap(), d);
    }

    #[test]
    fn test_read_from_incomplete() {
        let encoded = codec::encode(&doc! { "a": 1 }).unwrap();
        let mut buf = BytesMut::from(&encoded[..6]);
        assert!(RawDocumentBuf::read_from(&mut buf).unwrap().is_none());
        // Nothing consumed
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_split_documents() {
        let mut data = Vec::new();
        for i in 0..3 {
            data.extend(codec::encode(&doc! { "i": i }).unwrap());
        }
        let docs = split_documents(data).unwrap();
        assert_eq!(docs.len(), 3);
        for (i, raw) in docs.iter().enumerate() {
            assert_eq!(raw.decode().unwrap().get_i32("i"), Some(i as i32));
        }
    }

    #[test]
    fn test_split_documents_truncated_tail() {
        let mut data = codec::encode(&doc! { "i": 1 }).unwrap();
        let second = codec::encode(&doc! { "i": 2 }).unwrap();
        data.extend(&second[..second.len() - 2]);
        assert!(matches!(
            split_documents(data),
            Err(CodecError::Truncated { needed: 2 })
        ));
    }

    #[test]
    fn test_splitter_across_chunks() {
        let first = codec::encode(&doc! { "i": 1 }).unwrap();
        let second = codec::encode(&doc! { "s": "two" }).unwrap();
        let mut stream = first.clone();
        stream.extend(&second);

        let mut splitter = DocumentSplitter::new();
        splitter.push(&stream[..3]);
        assert!(splitter.next_raw().unwrap().is_none());
        splitter.push(&stream[3..first.len() + 5]);
        assert_eq!(splitter.next_document().unwrap(), Some(doc! { "i": 1 }));
        assert!(splitter.next_document().unwrap().is_none());
        assert_eq!(splitter.pending(), 5);
        assert_eq!(splitter.offset(), first.len() as u64);

        splitter.push(&stream[first.len() + 5..]);
        assert_eq!(splitter.next_document().unwrap(), Some(doc! { "s": "two" }));
        assert_eq!(splitter.emitted(), 2);
        assert_eq!(splitter.offset(), stream.len() as u64);
        assert!(splitter.finish().is_ok());
    }

    #[test]
    fn test_splitter_finish_reports_leftovers() {
        let encoded = codec::encode(&doc! { "a": 1 }).unwrap();

        let mut splitter = DocumentSplitter::new();
        splitter.push(&encoded[..2]);
        assert_eq!(splitter.finish(), Err(CodecError::Truncated { needed: 2 }));

        let mut splitter = DocumentSplitter::new();
        splitter.push(&encoded[..encoded.len() - 3]);
        assert!(splitter.next_raw().unwrap().is_none());
        assert_eq!(splitter.finish(), Err(CodecError::Truncated { needed: 3 }));

        let mut splitter = DocumentSplitter::new();
        splitter.push(&encoded);
        assert!(matches!(
            splitter.finish(),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_splitter_bad_framing_keeps_offset() {
        let good = codec::encode(&doc! { "a": 1 }).unwrap();
        let mut splitter = DocumentSplitter::new();
        splitter.push(&good);
        splitter.push([2, 0, 0, 0]);
        assert!(splitter.next_raw().unwrap().is_some());
        assert_eq!(splitter.next_raw(), Err(CodecError::InvalidLength(2)));
        assert_eq!(splitter.offset(), good.len() as u64);
        assert_eq!(splitter.pending(), 4);
    }

    #[test]
    fn test_split_documents_rejects_bad_length() {
        let mut data = codec::encode(&doc! { "i": 1 }).unwrap();
        data.extend([1, 0, 0, 0, 0]);
        assert_eq!(split_documents(data), Err(CodecError::InvalidLength(1)));
    }

    #[test]
    fn test_split_documents_empty() {
        assert!(split_documents(Vec::<u8>::new()).unwrap().is_empty());
    }
}
