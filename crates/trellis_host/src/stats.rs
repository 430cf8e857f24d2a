//! Per-block decoding statistics.
//!
//! Collects block service times and bit errors during a benchmark run.
//! Workers accumulate their own `BlockStats` and the results are merged at
//! the end, so the hot path never shares state between threads.

/// Latency histogram bucket width in nanoseconds.
const BUCKET_NS: u64 = 50_000;
const NUM_BUCKETS: usize = 20;

/// Tracks block latency and error statistics.
#[derive(Debug, Clone)]
pub struct BlockStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    pub buckets: [u64; NUM_BUCKETS],
    pub bits: u64,
    pub bit_errors: u64,
    pub block_errors: u64,
}

impl Default for BlockStats {
    fn default() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            buckets: [0; NUM_BUCKETS],
            bits: 0,
            bit_errors: 0,
            block_errors: 0,
        }
    }
}

impl BlockStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the service time of one block in nanoseconds.
    pub fn record_latency(&mut self, nanos: u64) {
        self.min = self.min.min(nanos);
        self.max = self.max.max(nanos);
        self.sum += nanos;
        self.count += 1;

        let idx = ((nanos / BUCKET_NS) as usize).min(NUM_BUCKETS - 1);
        self.buckets[idx] += 1;
    }

    /// Records the comparison of one decoded block against its reference.
    pub fn record_errors(&mut self, bits: usize, errors: usize) {
        self.bits += bits as u64;
        self.bit_errors += errors as u64;
        if errors > 0 {
            self.block_errors += 1;
        }
    }

    /// Folds another worker's statistics into this one.
    pub fn merge(mut self, other: Self) -> Self {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
        for (a, b) in self.buckets.iter_mut().zip(other.buckets) {
            *a += b;
        }
        self.bits += other.bits;
        self.bit_errors += other.bit_errors;
        self.block_errors += other.block_errors;
        self
    }

    /// Average latency in nanoseconds, 0.0 when nothing was recorded.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    pub fn bit_error_rate(&self) -> Option<f64> {
        (self.bits > 0).then(|| self.bit_errors as f64 / self.bits as f64)
    }

    pub fn print_report(&self) {
        println!("\nLatency Metrics (per block)");
        println!("Count: {}", self.count);
        if self.count == 0 {
            return;
        }

        let avg_ns = self.avg();
        if avg_ns < 1000.0 {
            println!("Min:   {:.2} ns", self.min as f64);
            println!("Avg:   {:.2} ns", avg_ns);
            println!("Max:   {:.2} ns", self.max as f64);
        } else {
            println!("Min:   {:.2} us", self.min as f64 / 1000.0);
            println!("Avg:   {:.2} us", avg_ns / 1000.0);
            println!("Max:   {:.2} us", self.max as f64 / 1000.0);
        }

        let width_us = BUCKET_NS / 1000;
        println!("Distribution ({}us buckets):", width_us);
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let open = if i == NUM_BUCKETS - 1 { ">" } else { "" };
                let lower = i as u64 * width_us;
                let upper = (i as u64 + 1) * width_us;
                println!("[{:4}-{:4}{} us]: {}", lower, upper, open, count);
            }
        }

        if let Some(ber) = self.bit_error_rate() {
            println!("\nBit errors:   {}/{} (BER {:.3e})", self.bit_errors, self.bits, ber);
            println!("Block errors: {}/{}", self.block_errors, self.count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_combines_workers() {
        let mut a = BlockStats::new();
        a.record_latency(10_000);
        a.record_errors(100, 0);
        let mut b = BlockStats::new();
        b.record_latency(2_000_000);
        b.record_latency(60_000);
        b.record_errors(100, 3);

        let m = a.merge(b);
        assert_eq!(m.count, 3);
        assert_eq!(m.min, 10_000);
        assert_eq!(m.max, 2_000_000);
        assert_eq!(m.buckets[0], 1);
        assert_eq!(m.buckets[1], 1);
        assert_eq!(m.buckets[NUM_BUCKETS - 1], 1);
        assert_eq!(m.block_errors, 1);
        assert_eq!(m.bit_error_rate(), Some(0.015));
    }

    #[test]
    fn empty_stats_have_no_rate() {
        let s = BlockStats::new();
        assert_eq!(s.avg(), 0.0);
        assert_eq!(s.bit_error_rate(), None);
    }
}
