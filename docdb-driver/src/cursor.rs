//! Result cursors.
//!
//! A [`Cursor`] owns one server-side iteration handle. It buffers at most
//! one batch of raw documents and decodes each document only when it is
//! handed to the caller.
//!
//! ```text
//!            next() -> Some                 next() -> None
//!          +--------+                   +-------------------+
//!          |        v                   |                   v
//!        +-----------+  fetch error  +--------+        +-----------+
//!        |  Active   | ------------> | Failed |        | Exhausted |
//!        +-----------+               +--------+        +-----------+
//!              |   \________________________|__________________|
//!              |            close() / drop  |                  |
//!              v                            v                  v
//!        +--------------------------------------------------------+
//!        |                         Closed                          |
//!        +--------------------------------------------------------+
//! ```
//!
//! The handle is released exactly once: on exhaustion, on `close()`, or
//! when the cursor is dropped, whichever comes first. A failed fetch does
//! not release it; the cursor stops yielding and waits for `close()` or
//! drop.
//!
//! Each `next()` performs at most one round-trip. When the server answers
//! with an empty batch but keeps the handle open (tailable and awaitData
//! cursors do this until new data arrives), `next()` returns `Ok(None)`
//! and the cursor stays [`CursorState::Active`]; [`Cursor::is_alive`]
//! tells the two kinds of `None` apart.
//!
//! A cursor is single-consumer. `next()` takes `&mut self`; sharing one
//! cursor between tasks requires external synchronization.

use crate::error::{translate, DriverError, ErrorRecord};
use crate::transport::{BatchResult, CursorHandle, GetMore, Transport};
use docdb_bson::{Document, RawDocumentBuf};
use std::collections::VecDeque;
use std::sync::Weak;
use std::time::Duration;

/// Default number of documents requested per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 101;

/// Largest batch size a cursor will request.
pub const MAX_BATCH_SIZE: u32 = 100_000;

/// Cursor options.
#[derive(Debug, Clone)]
pub struct CursorOptions {
    /// Documents requested per batch.
    pub batch_size: u32,
    /// Total documents to yield before the cursor reports exhaustion.
    pub limit: Option<u64>,
    /// Forwarded to the transport with every fetch.
    pub max_await_time: Option<Duration>,
    /// Upper bound on a single fetch.
    pub fetch_timeout: Option<Duration>,
}

impl CursorOptions {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            limit: None,
            max_await_time: None,
            fetch_timeout: None,
        }
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_max_await_time(mut self, time: Duration) -> Self {
        self.max_await_time = Some(time);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// The handle is live; documents may be buffered.
    Active,
    /// The server has no more results.
    Exhausted,
    /// A fetch failed or was abandoned mid-flight. Nothing more is yielded.
    Failed,
    /// `close()` was called.
    Closed,
}

/// Owns the server-side handle and releases it exactly once.
struct HandleGuard {
    handle: CursorHandle,
    transport: Weak<dyn Transport>,
    released: bool,
}

impl HandleGuard {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let Some(transport) = self.transport.upgrade() else {
            tracing::debug!(cursor = %self.handle, "transport gone, nothing to release");
            return;
        };
        match transport.release(&self.handle) {
            Ok(()) => tracing::debug!(cursor = %self.handle, "released cursor"),
            Err(record) => {
                tracing::warn!(cursor = %self.handle, error = %record, "failed to release cursor")
            }
        }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// A lazily materialized sequence of documents backed by a server-side
/// cursor.
pub struct Cursor {
    guard: HandleGuard,
    options: CursorOptions,
    buffer: VecDeque<RawDocumentBuf>,
    state: CursorState,
    yielded: u64,
}

impl Cursor {
    /// Creates a cursor over `handle` with nothing buffered; the first
    /// `next()` fetches.
    ///
    /// The transport is held weakly: the cursor never keeps it alive.
    pub fn new(transport: Weak<dyn Transport>, handle: CursorHandle, options: CursorOptions) -> Self {
        Self::with_initial_batch(transport, handle, Vec::new(), options)
    }

    /// Creates a cursor seeded with the first batch returned by the query
    /// command.
    pub fn with_initial_batch(
        transport: Weak<dyn Transport>,
        handle: CursorHandle,
        initial_batch: Vec<RawDocumentBuf>,
        options: CursorOptions,
    ) -> Self {
        tracing::debug!(
            cursor = %handle,
            initial = initial_batch.len(),
            batch_size = options.batch_size,
            "opened cursor"
        );
        Self {
            guard: HandleGuard {
                handle,
                transport,
                released: false,
            },
            options,
            buffer: initial_batch.into(),
            state: CursorState::Active,
            yielded: 0,
        }
    }

    pub fn handle(&self) -> &CursorHandle {
        &self.guard.handle
    }

    pub fn id(&self) -> i64 {
        self.guard.handle.id
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn options(&self) -> &CursorOptions {
        &self.options
    }

    /// Returns whether further `next()` calls may yield documents.
    pub fn is_alive(&self) -> bool {
        self.state == CursorState::Active
    }

    /// Documents left in the current batch.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Documents handed out so far, including ones that failed to decode.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Returns the next document.
    ///
    /// - `Ok(Some(doc))`: the next document in server order.
    /// - `Ok(None)`: the cursor is exhausted or has failed earlier, or this
    ///   call's round-trip returned an empty batch on a live handle. Check
    ///   [`Cursor::is_alive`] to see whether calling again may yield more.
    /// - `Err(e)`: this call's fetch failed (the cursor is now
    ///   [`CursorState::Failed`]), the current document could not be
    ///   decoded (the cursor stays active and moves past it), or the
    ///   cursor was closed.
    pub async fn next(&mut self) -> Result<Option<Document>, DriverError> {
        match self.state {
            CursorState::Closed => {
                return Err(DriverError::InvalidState("cursor is closed".to_string()))
            }
            CursorState::Exhausted | CursorState::Failed => return Ok(None),
            CursorState::Active => {}
        }

        if self.limit_reached() {
            self.mark_exhausted();
            return Ok(None);
        }

        if self.buffer.is_empty() {
            self.fetch_batch().await?;
            if self.state != CursorState::Active {
                return Ok(None);
            }
        }

        match self.buffer.pop_front() {
            Some(raw) => {
                self.yielded += 1;
                raw.decode().map(Some).map_err(DriverError::from)
            }
            None => Ok(None),
        }
    }

    /// Releases the server-side handle and discards buffered documents.
    /// Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.state == CursorState::Closed {
            return;
        }
        self.buffer.clear();
        self.guard.release();
        self.state = CursorState::Closed;
        tracing::debug!(cursor = %self.guard.handle, yielded = self.yielded, "closed cursor");
    }

    /// Drains the remaining documents, then closes the cursor.
    ///
    /// Stops at the first error. Empty batches on a live handle are skipped,
    /// so this does not return for a cursor the server keeps open forever.
    pub async fn try_collect(mut self) -> Result<Vec<Document>, DriverError> {
        let mut docs = Vec::new();
        let result = loop {
            match self.next().await {
                Ok(Some(doc)) => docs.push(doc),
                Ok(None) if self.is_alive() => continue,
                Ok(None) => break Ok(docs),
                Err(e) => break Err(e),
            }
        };
        self.close();
        result
    }

    fn limit_reached(&self) -> bool {
        self.options.limit.is_some_and(|limit| self.yielded >= limit)
    }

    fn mark_exhausted(&mut self) {
        self.buffer.clear();
        self.state = CursorState::Exhausted;
        self.guard.release();
        tracing::debug!(cursor = %self.guard.handle, yielded = self.yielded, "cursor exhausted");
    }

    fn next_batch_size(&self) -> u32 {
        match self.options.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.yielded);
                remaining.min(u64::from(self.options.batch_size)).max(1) as u32
            }
            None => self.options.batch_size,
        }
    }

    /// Fetches one batch into the buffer.
    ///
    /// The state is `Failed` while the fetch is in flight, so dropping the
    /// `next()` future mid-fetch leaves a cursor that yields nothing more
    /// instead of one that silently skipped a batch.
    async fn fetch_batch(&mut self) -> Result<(), DriverError> {
        let Some(transport) = self.guard.transport.upgrade() else {
            self.state = CursorState::Failed;
            let err = translate(ErrorRecord::transport_closed());
            tracing::warn!(cursor = %self.guard.handle, error = %err, "cursor fetch failed");
            return Err(err);
        };

        let request = GetMore {
            handle: self.guard.handle.clone(),
            batch_size: self.next_batch_size(),
            max_await_time: self.options.max_await_time,
        };
        tracing::debug!(cursor = %request.handle, batch_size = request.batch_size, "fetching batch");

        self.state = CursorState::Failed;
        let result = match self.options.fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, transport.advance(&request))
                .await
                .unwrap_or_else(|_| BatchResult::Error(ErrorRecord::fetch_timeout(timeout))),
            None => transport.advance(&request).await,
        };
        drop(transport);

        match result {
            BatchResult::Documents(docs) => {
                tracing::debug!(cursor = %self.guard.handle, count = docs.len(), "received batch");
                self.state = CursorState::Active;
                self.buffer.extend(docs);
                Ok(())
            }
            BatchResult::Exhausted => {
                self.mark_exhausted();
                Ok(())
            }
            BatchResult::Error(record) => {
                let err = translate(record);
                tracing::warn!(cursor = %self.guard.handle, error = %err, "cursor fetch failed");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("handle", &self.guard.handle)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("yielded", &self.yielded)
            .finish()
    }
}
