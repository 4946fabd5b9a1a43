/// Counters of a [`TrafficScheduler`](crate::TrafficScheduler). Never reset during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Total units sent
    sent: u64,
    /// Total units received
    received: u64,
    /// Total payload bytes sent
    bytes_tx: u64,
    /// Total payload bytes received
    bytes_rx: u64,
}

impl Stats {
    #[inline]
    pub(crate) fn increment_tx(&mut self, bytes: usize) {
        self.sent += 1;
        self.bytes_tx += bytes as u64;
    }

    #[inline]
    pub(crate) fn increment_rx(&mut self, bytes: usize) {
        self.received += 1;
        self.bytes_rx += bytes as u64;
    }

    #[inline]
    pub fn sent(&self) -> u64 {
        self.sent
    }

    #[inline]
    pub fn received(&self) -> u64 {
        self.received
    }

    #[inline]
    pub fn bytes_tx(&self) -> u64 {
        self.bytes_tx
    }

    #[inline]
    pub fn bytes_rx(&self) -> u64 {
        self.bytes_rx
    }
}
