//! # docdb
//!
//! Driver core for a document database: a binary document codec and
//! lazily fetched result cursors.
//!
//! - [`bson`]: documents, extended value types, encoding and decoding
//! - [`driver`]: cursors, the transport seam, error translation
//!
//! Most applications only need the re-exports below.

pub use docdb_bson as bson;
pub use docdb_driver as driver;

pub use docdb_bson::{doc, Bson, CodecError, Document, ObjectId, RawDocumentBuf};
pub use docdb_driver::{
    Cursor, CursorHandle, CursorOptions, CursorState, DriverError, ErrorKind, ErrorRecord,
    ServerVersion, Transport,
};
