#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bridge-rpc/bridge-rpc/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

mod config;
pub use config::{
    ARBITRUM_SEPOLIA_MIN_CONFIRMATIONS, AcceleratorConfig, BatchConfig, ChainThreshold,
    ConfirmationThresholds, DEFAULT_BATCH_MAX_SIZE, DEFAULT_BATCH_WINDOW_MS, DEFAULT_CACHE_KEY,
    DEFAULT_HEAD_MAX_AGE_MS, MAINNET_MIN_CONFIRMATIONS,
};

mod errors;
pub use errors::{CacheError, ProviderError, ProviderResult, StorageError};

mod receipt;
pub use receipt::{ReceiptLog, RpcReceipt, TransactionReceipt, big_number, confirmations};

mod policy;
pub use policy::{Admission, admission, should_cache};

mod storage;
pub use storage::{FileStore, KeyValueStore, MemoryStore};

mod cache;
pub use cache::{CachedReceipts, ReceiptCache};

mod transport;
pub use transport::{BatchingTransport, RequestDispatcher, TransportMode};

mod provider;
pub use provider::{AcceleratedProvider, AcceleratorBuilder, EthProvider, RpcProvider};

mod metrics;
pub use metrics::Metrics;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
