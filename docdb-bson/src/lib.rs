//! # docdb-bson
//!
//! Binary document format for docdb.
//!
//! This crate provides:
//! - Ordered documents with typed values, including extended types
//! - Encoding and decoding with length prefix and terminator validation
//! - Raw (undecoded) documents for lazy decoding of result batches
//! - Relaxed extended JSON rendering

pub mod codec;
pub mod document;
pub mod error;
pub mod extjson;
pub mod oid;
pub mod raw;
pub mod types;

pub use codec::{decode, encode, encode_to};
pub use document::{Bson, Document, ElementType};
pub use error::CodecError;
pub use oid::ObjectId;
pub use raw::{split_documents, DocumentSplitter, RawDocumentBuf};
pub use types::{Binary, DateTime, Regex, Timestamp};

/// Maximum encoded document size (16 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Smallest valid document: length prefix plus terminator.
pub const MIN_DOCUMENT_SIZE: usize = 5;

/// Maximum depth of nested documents and arrays.
pub const MAX_NESTING_DEPTH: usize = 100;
