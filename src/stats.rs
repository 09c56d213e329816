//! Synchronization counters
//!
//! Tracks how much traffic a mirror generates towards its device, so callers
//! can check that batching actually keeps uploads small.

/// Per-object transfer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Calls to `flush`, including no-op ones
    pub flushes: u64,
    /// Device write calls issued (ranged writes or per-field sets)
    pub device_writes: u64,
    /// Total bytes handed to the device
    pub bytes_uploaded: u64,
    /// Device resources allocated, including the first
    pub allocations: u64,
}

impl SyncStats {
    pub fn record_flush(&mut self) {
        self.flushes += 1;
    }

    pub fn record_write(&mut self, bytes: u64) {
        self.device_writes += 1;
        self.bytes_uploaded += bytes;
    }

    pub fn record_allocation(&mut self) {
        self.allocations += 1;
    }

    /// Average bytes per device write
    pub fn avg_write_size(&self) -> f64 {
        if self.device_writes == 0 {
            0.0
        } else {
            self.bytes_uploaded as f64 / self.device_writes as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = SyncStats::default();
        assert_eq!(stats.avg_write_size(), 0.0);

        stats.record_flush();
        stats.record_write(64);
        stats.record_write(16);
        stats.record_allocation();

        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.device_writes, 2);
        assert_eq!(stats.bytes_uploaded, 80);
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.avg_write_size(), 40.0);
    }
}
