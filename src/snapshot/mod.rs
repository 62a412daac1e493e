/*!
 * Snapshot Driver
 * Interval-gated, numbered stats file sequence
 *
 * The sequence number is process-global and only ever moves forward; one
 * due snapshot writes every requested format under the same number.
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct SnapshotDriver {
    interval_sec: AtomicU64,
    last: Mutex<Option<Instant>>,
    seq: AtomicU64,
}

pub(crate) static SNAPSHOTS: SnapshotDriver = SnapshotDriver::new();

impl SnapshotDriver {
    pub const fn new() -> Self {
        Self {
            interval_sec: AtomicU64::new(0),
            last: Mutex::new(None),
            seq: AtomicU64::new(0),
        }
    }

    pub fn configure(&self, interval: Duration) {
        self.interval_sec.store(interval.as_secs(), Ordering::SeqCst);
    }

    pub fn interval_sec(&self) -> u64 {
        self.interval_sec.load(Ordering::SeqCst)
    }

    /// True when a snapshot is due: the interval is non-zero and has
    /// elapsed (monotonic clock) since the last one. A `true` return
    /// claims the slot; the caller is expected to write the files.
    pub fn should_write(&self) -> bool {
        let interval = self.interval_sec.load(Ordering::SeqCst);
        if interval == 0 {
            return false;
        }
        let mut last = self.last.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev).as_secs() < interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Claims the next file number
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// `<prefix>.NNNN.<ext>` with a zero-padded sequence number
    pub fn snapshot_path(prefix: &str, seq: u64, extension: &str) -> String {
        format!("{prefix}.{seq:04}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_disables_snapshots() {
        let d = SnapshotDriver::new();
        assert!(!d.should_write());
        d.configure(Duration::ZERO);
        assert!(!d.should_write());
    }

    #[test]
    fn first_snapshot_is_due_immediately_then_gated() {
        let d = SnapshotDriver::new();
        d.configure(Duration::from_secs(60));
        assert!(d.should_write());
        assert!(!d.should_write());
    }

    #[test]
    fn sequence_is_monotonic_and_zero_padded() {
        let d = SnapshotDriver::new();
        assert_eq!(d.next_seq(), 0);
        assert_eq!(d.next_seq(), 1);
        assert_eq!(SnapshotDriver::snapshot_path("/tmp/snap", 7, "json"), "/tmp/snap.0007.json");
        assert_eq!(SnapshotDriver::snapshot_path("/tmp/snap", 123, "dot"), "/tmp/snap.0123.dot");
    }
}
