//! # docdb-driver
//!
//! Result cursors for docdb.
//!
//! This crate provides:
//! - The [`Transport`] seam a connection/session implements
//! - [`Cursor`], a lazily fetched, single-consumer result sequence that
//!   releases its server-side handle exactly once
//! - Translation of raw `{domain, code, message}` records into [`DriverError`]
//! - An in-memory transport for tools and tests
//!
//! ```no_run
//! # async fn run() -> Result<(), docdb_driver::DriverError> {
//! use docdb_driver::{CursorOptions, MemoryTransport, MemoryTransportConfig};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(MemoryTransport::new(MemoryTransportConfig::default()));
//! let handle = transport.open_documents("shop.orders", &[docdb_bson::doc! { "n": 1 }])?;
//! let mut cursor = transport.cursor(handle, CursorOptions::new().with_batch_size(50));
//! while let Some(doc) = cursor.next().await? {
//!     println!("{}", doc);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod error;
pub mod memory;
pub mod stream;
pub mod transport;
pub mod version;

pub use cursor::{Cursor, CursorOptions, CursorState, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use error::{translate, DriverError, ErrorKind, ErrorRecord};
pub use memory::{MemoryTransport, MemoryTransportConfig};
pub use transport::{BatchResult, CursorHandle, GetMore, Transport};
pub use version::{ParseVersionError, ServerVersion};
