//! In-process transport serving preloaded result sets.
//!
//! Used by the dump tool, the benchmarks and tests. Every result set is
//! addressed by a [`CursorHandle`]; the transport records how it was
//! driven so callers can check that cursors advance and release the way
//! they should.

use crate::cursor::{Cursor, CursorOptions};
use crate::error::{code, domain, ErrorRecord};
use crate::transport::{BatchResult, CursorHandle, GetMore, Transport};
use async_trait::async_trait;
use dashmap::DashMap;
use docdb_bson::{CodecError, Document, RawDocumentBuf};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Memory transport configuration.
#[derive(Debug, Clone)]
pub struct MemoryTransportConfig {
    /// Upper bound on documents per batch, applied on top of the size the
    /// cursor requests.
    pub batch_size: usize,
    /// Simulated round-trip time for each advance.
    pub latency: Duration,
}

impl MemoryTransportConfig {
    pub fn new() -> Self {
        Self {
            batch_size: usize::MAX,
            latency: Duration::ZERO,
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for MemoryTransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ResultSet {
    remaining: VecDeque<RawDocumentBuf>,
    advances: u64,
    releases: u64,
    batch_sizes: Vec<u32>,
    failure: Option<(u64, ErrorRecord)>,
    released: bool,
}

/// Transport backed by in-memory result sets.
pub struct MemoryTransport {
    config: MemoryTransportConfig,
    result_sets: DashMap<i64, ResultSet>,
    released: Mutex<Vec<CursorHandle>>,
    next_id: AtomicI64,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new(config: MemoryTransportConfig) -> Self {
        Self {
            config,
            result_sets: DashMap::new(),
            released: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MemoryTransportConfig {
        &self.config
    }

    /// Registers a result set and returns the handle addressing it.
    pub fn open(&self, namespace: &str, documents: Vec<RawDocumentBuf>) -> CursorHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = CursorHandle::new(id, namespace);
        tracing::debug!(cursor = %handle, documents = documents.len(), "opened result set");
        self.result_sets.insert(
            id,
            ResultSet {
                remaining: documents.into(),
                advances: 0,
                releases: 0,
                batch_sizes: Vec::new(),
                failure: None,
                released: false,
            },
        );
        handle
    }

    /// Encodes `documents` and registers them as a result set.
    pub fn open_documents(
        &self,
        namespace: &str,
        documents: &[Document],
    ) -> Result<CursorHandle, CodecError> {
        let raw = documents
            .iter()
            .map(RawDocumentBuf::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.open(namespace, raw))
    }

    /// Creates a cursor over `handle` that fetches through this transport.
    pub fn cursor(self: &Arc<Self>, handle: CursorHandle, options: CursorOptions) -> Cursor {
        let transport: Weak<dyn Transport> = Arc::downgrade(self) as Weak<Self>;
        Cursor::new(transport, handle, options)
    }

    /// Makes the `advance_no`-th advance (1-based) on `handle` fail with
    /// `record`.
    pub fn inject_error(&self, handle: &CursorHandle, advance_no: u64, record: ErrorRecord) {
        if let Some(mut set) = self.result_sets.get_mut(&handle.id) {
            set.failure = Some((advance_no, record));
        }
    }

    /// Number of advances served for `handle`.
    pub fn advance_count(&self, handle: &CursorHandle) -> u64 {
        self.result_sets
            .get(&handle.id)
            .map(|set| set.advances)
            .unwrap_or(0)
    }

    /// Number of release calls received for `handle`, duplicates included.
    pub fn release_count(&self, handle: &CursorHandle) -> u64 {
        self.result_sets
            .get(&handle.id)
            .map(|set| set.releases)
            .unwrap_or(0)
    }

    /// Batch sizes requested for `handle`, in call order.
    pub fn requested_batch_sizes(&self, handle: &CursorHandle) -> Vec<u32> {
        self.result_sets
            .get(&handle.id)
            .map(|set| set.batch_sizes.clone())
            .unwrap_or_default()
    }

    /// Handles released so far, in release order.
    pub fn released_handles(&self) -> Vec<CursorHandle> {
        self.released.lock().clone()
    }

    /// Number of result sets that have not been released.
    pub fn live_cursors(&self) -> usize {
        self.result_sets.iter().filter(|set| !set.released).count()
    }

    /// Fails every later advance as if the connection had gone away.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn cursor_not_found(handle: &CursorHandle) -> ErrorRecord {
    ErrorRecord::new(
        domain::SERVER,
        code::CURSOR_NOT_FOUND,
        format!("cursor id {} not found", handle.id),
    )
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn advance(&self, request: &GetMore) -> BatchResult {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        if self.is_shutdown() {
            return BatchResult::Error(ErrorRecord::new(
                domain::STREAM,
                code::STREAM_NOT_ESTABLISHED,
                "transport is shut down",
            ));
        }

        let Some(mut set) = self.result_sets.get_mut(&request.handle.id) else {
            return BatchResult::Error(cursor_not_found(&request.handle));
        };
        if set.released {
            return BatchResult::Error(cursor_not_found(&request.handle));
        }

        set.advances += 1;
        set.batch_sizes.push(request.batch_size);

        if let Some((at, record)) = &set.failure {
            if *at == set.advances {
                return BatchResult::Error(record.clone());
            }
        }

        if set.remaining.is_empty() {
            return BatchResult::Exhausted;
        }

        let count = (request.batch_size as usize)
            .min(self.config.batch_size)
            .min(set.remaining.len());
        BatchResult::Documents(set.remaining.drain(..count).collect())
    }

    fn release(&self, handle: &CursorHandle) -> Result<(), ErrorRecord> {
        let Some(mut set) = self.result_sets.get_mut(&handle.id) else {
            return Err(cursor_not_found(handle));
        };
        set.releases += 1;
        if !set.released {
            set.released = true;
            set.remaining.clear();
            self.released.lock().push(handle.clone());
        }
        Ok(())
    }
}
