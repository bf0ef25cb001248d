//! The transport seam consumed by cursors.
//!
//! A transport owns the connection/session used to talk to the server. It
//! is shared (usually behind an `Arc`) between any number of cursors; each
//! cursor only borrows it weakly and only ever touches its own handle.

use crate::error::ErrorRecord;
use async_trait::async_trait;
use docdb_bson::RawDocumentBuf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Server-side iteration handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorHandle {
    /// Server-assigned cursor id.
    pub id: i64,
    /// `database.collection` the cursor iterates.
    pub namespace: String,
}

impl CursorHandle {
    pub fn new(id: i64, namespace: impl Into<String>) -> Self {
        Self {
            id,
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for CursorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.id)
    }
}

/// Request for the next batch of a cursor.
#[derive(Debug, Clone)]
pub struct GetMore {
    pub handle: CursorHandle,
    /// Maximum number of documents the cursor wants in this batch.
    pub batch_size: u32,
    /// How long the server may wait for new data (tailable cursors).
    pub max_await_time: Option<Duration>,
}

/// Outcome of one advance.
#[derive(Debug, Clone)]
pub enum BatchResult {
    /// The next batch, in server order.
    Documents(Vec<RawDocumentBuf>),
    /// No more results.
    Exhausted,
    /// The fetch failed.
    Error(ErrorRecord),
}

/// Connection/session object that cursors fetch batches through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Advances the server-side iteration and returns the next batch.
    async fn advance(&self, request: &GetMore) -> BatchResult;

    /// Releases the server-side handle.
    ///
    /// Called exactly once per cursor, possibly from `Drop`, so it must not
    /// block. Implementations should tolerate handles the server has
    /// already discarded.
    fn release(&self, handle: &CursorHandle) -> Result<(), ErrorRecord>;
}
