//! Metrics for the accelerator. Recorded only with the `metrics` feature enabled.

/// Container for the accelerator metric identifiers.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of receipt cache hits.
    pub const RECEIPT_CACHE_HITS: &'static str = "bridge_rpc_receipt_cache_hits_total";
    /// Identifier for the counter of receipt cache misses.
    pub const RECEIPT_CACHE_MISSES: &'static str = "bridge_rpc_receipt_cache_misses_total";
    /// Identifier for the counter of receipts written to the cache.
    pub const RECEIPT_CACHE_WRITES: &'static str = "bridge_rpc_receipt_cache_writes_total";
    /// Identifier for the counter of receipts rejected by the admission policy.
    pub const RECEIPT_CACHE_REJECTIONS: &'static str = "bridge_rpc_receipt_cache_rejections_total";
    /// Identifier for the counter of failed cache writes.
    pub const RECEIPT_CACHE_WRITE_ERRORS: &'static str =
        "bridge_rpc_receipt_cache_write_errors_total";
    /// Identifier for the histogram of outbound batch sizes.
    pub const BATCH_SIZE: &'static str = "bridge_rpc_batch_size";

    /// Describes and zeroes all accelerator metrics.
    ///
    /// Should be called once at startup, after the global recorder is installed.
    pub fn init() {
        #[cfg(feature = "metrics")]
        {
            Self::describe();
            Self::zero();
        }
    }

    #[cfg(feature = "metrics")]
    fn describe() {
        metrics::describe_counter!(
            Self::RECEIPT_CACHE_HITS,
            metrics::Unit::Count,
            "Receipts served from the persistent cache"
        );
        metrics::describe_counter!(
            Self::RECEIPT_CACHE_MISSES,
            metrics::Unit::Count,
            "Receipt lookups that fell through to the network"
        );
        metrics::describe_counter!(
            Self::RECEIPT_CACHE_WRITES,
            metrics::Unit::Count,
            "Receipts written to the persistent cache"
        );
        metrics::describe_counter!(
            Self::RECEIPT_CACHE_REJECTIONS,
            metrics::Unit::Count,
            "Fetched receipts rejected by the cache admission policy"
        );
        metrics::describe_counter!(
            Self::RECEIPT_CACHE_WRITE_ERRORS,
            metrics::Unit::Count,
            "Receipt cache writes that failed"
        );
        metrics::describe_histogram!(
            Self::BATCH_SIZE,
            metrics::Unit::Count,
            "Number of sub-requests per outbound request of the batching transport"
        );
    }

    #[cfg(feature = "metrics")]
    fn zero() {
        metrics::counter!(Self::RECEIPT_CACHE_HITS).increment(0);
        metrics::counter!(Self::RECEIPT_CACHE_MISSES).increment(0);
        metrics::counter!(Self::RECEIPT_CACHE_WRITES).increment(0);
        metrics::counter!(Self::RECEIPT_CACHE_REJECTIONS).increment(0);
        metrics::counter!(Self::RECEIPT_CACHE_WRITE_ERRORS).increment(0);
    }

    pub(crate) fn record_cache_hit(chain_id: u64) {
        #[cfg(feature = "metrics")]
        metrics::counter!(Self::RECEIPT_CACHE_HITS, "chain_id" => chain_id.to_string())
            .increment(1);
        #[cfg(not(feature = "metrics"))]
        let _ = chain_id;
    }

    pub(crate) fn record_cache_miss(chain_id: u64) {
        #[cfg(feature = "metrics")]
        metrics::counter!(Self::RECEIPT_CACHE_MISSES, "chain_id" => chain_id.to_string())
            .increment(1);
        #[cfg(not(feature = "metrics"))]
        let _ = chain_id;
    }

    pub(crate) fn record_cache_write(chain_id: u64, result: &Result<(), crate::CacheError>) {
        #[cfg(feature = "metrics")]
        {
            let name = if result.is_ok() {
                Self::RECEIPT_CACHE_WRITES
            } else {
                Self::RECEIPT_CACHE_WRITE_ERRORS
            };
            metrics::counter!(name, "chain_id" => chain_id.to_string()).increment(1);
        }
        #[cfg(not(feature = "metrics"))]
        let _ = (chain_id, result);
    }

    pub(crate) fn record_rejection(chain_id: u64, reason: &'static str) {
        #[cfg(feature = "metrics")]
        metrics::counter!(
            Self::RECEIPT_CACHE_REJECTIONS,
            "chain_id" => chain_id.to_string(),
            "reason" => reason,
        )
        .increment(1);
        #[cfg(not(feature = "metrics"))]
        let _ = (chain_id, reason);
    }

    pub(crate) fn record_batch(size: usize) {
        #[cfg(feature = "metrics")]
        metrics::histogram!(Self::BATCH_SIZE).record(size as f64);
        #[cfg(not(feature = "metrics"))]
        let _ = size;
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use parking_lot::Mutex;

    /// Records the name of every registered counter.
    #[derive(Debug, Default)]
    struct CounterNames(Mutex<Vec<String>>);

    impl Recorder for CounterNames {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.0.lock().push(key.name().to_string());
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_init_zeroes_every_counter() {
        let recorder = CounterNames::default();
        metrics::with_local_recorder(&recorder, Metrics::init);

        let registered = recorder.0.lock();
        for name in [
            Metrics::RECEIPT_CACHE_HITS,
            Metrics::RECEIPT_CACHE_MISSES,
            Metrics::RECEIPT_CACHE_WRITES,
            Metrics::RECEIPT_CACHE_REJECTIONS,
            Metrics::RECEIPT_CACHE_WRITE_ERRORS,
        ] {
            assert!(registered.iter().any(|registered| registered == name), "{name} not zeroed");
        }
    }
}
