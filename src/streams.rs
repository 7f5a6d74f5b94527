//! [`StreamFactory`]: event-aware read/write stream wrappers (spec.md
//! §4.4/C5). Mirrors the teacher's `StreamWriter`/`ReadTask` pairing of a
//! byte pipe with explicit lifecycle events, generalized to emit IGFS
//! events instead of NFS replies.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::collab::data::DataManager;
use crate::collab::events::{Event, EventBus, EventKind};
use crate::error::Result;
use crate::model::FileInfo;
use crate::writer_registry::Batch;

/// Local counters surfaced through [`crate::metrics::LocalMetrics`].
#[derive(Default)]
pub struct StreamCounters {
    pub reads_open: AtomicU64,
    pub writes_open: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
}

/// Produces read/write streams that emit open/close events and update
/// shared counters. Holds no state of its own beyond what it hands to the
/// streams it creates; one instance is shared by the whole coordinator.
pub struct StreamFactory {
    data: Arc<dyn DataManager>,
    events: Arc<dyn EventBus>,
    counters: Arc<StreamCounters>,
    prefetch_blocks: u32,
}

impl StreamFactory {
    pub fn new(data: Arc<dyn DataManager>, events: Arc<dyn EventBus>, prefetch_blocks: u32) -> Self {
        Self { data, events, counters: Arc::new(StreamCounters::default()), prefetch_blocks }
    }

    pub fn counters(&self) -> Arc<StreamCounters> {
        self.counters.clone()
    }

    /// Opens a read stream over `info`, emitting `file-opened-read`.
    pub async fn open_read(&self, path: &str, info: FileInfo) -> ReadStream {
        if self.events.is_recordable(EventKind::FileOpenedRead) {
            self.events.record(Event::new(EventKind::FileOpenedRead, path)).await;
        }
        self.counters.reads_open.fetch_add(1, Ordering::AcqRel);
        ReadStream {
            data: self.data.clone(),
            events: self.events.clone(),
            counters: self.counters.clone(),
            info,
            path: path.to_string(),
            position: 0,
            bytes_read: 0,
            closed: AtomicBool::new(false),
            prefetch_blocks: self.prefetch_blocks,
        }
    }

    /// Opens a write stream over `info`, optionally paired with a
    /// secondary-FS [`Batch`] (DUAL modes), emitting `file-opened-write`.
    pub async fn open_write(&self, path: &str, info: FileInfo, batch: Option<Batch>) -> WriteStream {
        if self.events.is_recordable(EventKind::FileOpenedWrite) {
            self.events.record(Event::new(EventKind::FileOpenedWrite, path)).await;
        }
        self.counters.writes_open.fetch_add(1, Ordering::AcqRel);
        WriteStream {
            data: self.data.clone(),
            events: self.events.clone(),
            counters: self.counters.clone(),
            info,
            path: path.to_string(),
            position: 0,
            bytes_written: 0,
            closed: AtomicBool::new(false),
            _batch: batch,
        }
    }
}

/// A read stream over one file's backing blocks. Close-once guarded; a
/// second `close()` call is a no-op (spec.md §4.4/§7).
pub struct ReadStream {
    data: Arc<dyn DataManager>,
    events: Arc<dyn EventBus>,
    counters: Arc<StreamCounters>,
    info: FileInfo,
    path: String,
    position: u64,
    bytes_read: u64,
    closed: AtomicBool,
    prefetch_blocks: u32,
}

impl ReadStream {
    pub async fn read(&mut self, len: u32) -> Result<Vec<u8>> {
        let data = self.data.read(&self.info, self.position, len, self.prefetch_blocks).await?;
        self.position += data.len() as u64;
        self.bytes_read += data.len() as u64;
        Ok(data)
    }

    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.counters.reads_open.fetch_sub(1, Ordering::AcqRel);
        self.counters.bytes_read.fetch_add(self.bytes_read, Ordering::AcqRel);
        if self.events.is_recordable(EventKind::FileClosedRead) {
            self.events.record(Event::new(EventKind::FileClosedRead, self.path.clone()).with_bytes(self.bytes_read)).await;
        }
    }
}

/// A write stream over one file's backing blocks, optionally mirrored
/// through a secondary-FS [`Batch`]. Close-once guarded.
pub struct WriteStream {
    data: Arc<dyn DataManager>,
    events: Arc<dyn EventBus>,
    counters: Arc<StreamCounters>,
    info: FileInfo,
    path: String,
    position: u64,
    bytes_written: u64,
    closed: AtomicBool,
    _batch: Option<Batch>,
}

impl WriteStream {
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.data.write(&self.info, self.position, bytes).await?;
        self.position += bytes.len() as u64;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.counters.writes_open.fetch_sub(1, Ordering::AcqRel);
        self.counters.bytes_written.fetch_add(self.bytes_written, Ordering::AcqRel);
        if self.events.is_recordable(EventKind::FileClosedWrite) {
            self.events
                .record(Event::new(EventKind::FileClosedWrite, self.path.clone()).with_bytes(self.bytes_written))
                .await;
        }
    }
}
