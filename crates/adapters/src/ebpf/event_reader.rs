#![allow(unsafe_code)] // Required for perf record parsing (read_unaligned)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aya::maps::perf::AsyncPerfEventArray;
use aya::maps::MapData;
use aya::util::online_cpus;
use aya::Ebpf;
use bytes::BytesMut;
use ebpf_common::event::BanEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ebpf::error::GuardError;

/// Cumulative lost-sample count that triggers the buffer-sizing ERROR
/// and a counter reset, so the next burst of the same size alerts again.
const LOST_ERROR_THRESHOLD: u64 = 100;

/// Per-read batch size and per-record buffer capacity. Records are a
/// fixed 8-byte `BanEvent` plus perf framing.
const EVENTS_PER_READ: usize = 10;
const EVENT_BUF_CAPACITY: usize = 1024;

/// Reads ban notifications from the per-CPU `EVENTS` perf rings.
///
/// One reader task per online CPU; each drains its ring in batches and
/// forwards decoded events into a bounded channel. The channel send
/// blocks when the supervisor falls behind, so no decoded event is ever
/// dropped on the userspace side; the capacity is the backpressure budget.
pub struct BanEventReader {
    events: AsyncPerfEventArray<MapData>,
    page_count: usize,
}

impl BanEventReader {
    /// Take ownership of the `EVENTS` map. Each per-CPU ring will be
    /// sized `page_count` pages.
    pub fn new(ebpf: &mut Ebpf, page_count: usize) -> Result<Self, GuardError> {
        let map = ebpf
            .take_map("EVENTS")
            .ok_or_else(|| GuardError::table("EVENTS", "not found in eBPF object"))?;
        let events =
            AsyncPerfEventArray::try_from(map).map_err(|e| GuardError::table("EVENTS", e))?;
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        info!(
            page_count,
            ring_bytes = page_count * page_size,
            "EVENTS perf reader initialized"
        );
        Ok(Self { events, page_count })
    }

    /// Spawn one reader task per online CPU. Tasks run until `cancel`
    /// fires or the event channel closes.
    pub fn spawn(
        mut self,
        tx: mpsc::Sender<BanEvent>,
        cancel: CancellationToken,
    ) -> Result<Vec<JoinHandle<()>>, GuardError> {
        let cpus = online_cpus().map_err(|(msg, e)| GuardError::Ring(format!("{msg}: {e}")))?;
        let lost = Arc::new(LossTracker::new(LOST_ERROR_THRESHOLD));

        let mut handles = Vec::with_capacity(cpus.len());
        for cpu_id in cpus {
            let buf = self
                .events
                .open(cpu_id, Some(self.page_count))
                .map_err(|e| GuardError::Ring(format!("cpu {cpu_id}: {e}")))?;
            handles.push(tokio::spawn(read_loop(
                cpu_id,
                buf,
                tx.clone(),
                cancel.clone(),
                Arc::clone(&lost),
            )));
        }
        Ok(handles)
    }
}

async fn read_loop(
    cpu_id: u32,
    mut buf: aya::maps::perf::AsyncPerfEventArrayBuffer<MapData>,
    tx: mpsc::Sender<BanEvent>,
    cancel: CancellationToken,
    lost: Arc<LossTracker>,
) {
    let mut buffers = (0..EVENTS_PER_READ)
        .map(|_| BytesMut::with_capacity(EVENT_BUF_CAPACITY))
        .collect::<Vec<_>>();

    loop {
        let events = tokio::select! {
            () = cancel.cancelled() => break,
            result = buf.read_events(&mut buffers) => match result {
                Ok(events) => events,
                Err(e) => {
                    // A single failed read leaves the ring usable.
                    warn!(cpu_id, error = %e, "perf read failed");
                    continue;
                }
            },
        };

        if events.lost > 0 {
            let (total, crossed) = lost.record(events.lost as u64);
            warn!(
                cpu_id,
                lost = events.lost,
                total_lost = total,
                "lost ban events"
            );
            if crossed {
                error!(
                    total_lost = total,
                    "event loss crossed threshold, consider increasing --perf-pages"
                );
            }
        }

        for bytes in buffers.iter().take(events.read) {
            match decode_event(bytes) {
                Some(event) => {
                    // Receiver gone means the supervisor already exited.
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                None => warn!(cpu_id, len = bytes.len(), "undersized ban event record"),
            }
        }
    }

    debug!(cpu_id, "ban event reader stopped");
}

/// Decode a raw perf record as a little-endian `BanEvent`.
fn decode_event(bytes: &[u8]) -> Option<BanEvent> {
    if bytes.len() < std::mem::size_of::<BanEvent>() {
        return None;
    }
    // SAFETY: BanEvent is #[repr(C)] with a known 8-byte layout and the
    // kernel writes exactly that layout. Length is checked above;
    // read_unaligned handles any alignment.
    Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<BanEvent>()) })
}

/// Cumulative lost-sample accounting shared by all per-CPU readers.
///
/// `record` adds a delta and reports the running total; crossing the
/// threshold resets the total to zero so the next burst alerts again.
struct LossTracker {
    total: AtomicU64,
    threshold: u64,
}

impl LossTracker {
    fn new(threshold: u64) -> Self {
        Self {
            total: AtomicU64::new(0),
            threshold,
        }
    }

    /// Returns the cumulative total including `delta` and whether the
    /// threshold was crossed (which resets the counter).
    fn record(&self, delta: u64) -> (u64, bool) {
        let total = self.total.fetch_add(delta, Ordering::Relaxed) + delta;
        if total >= self.threshold {
            self.total.store(0, Ordering::Relaxed);
            (total, true)
        } else {
            (total, false)
        }
    }
}
