//! Contains the configuration for the [`AcceleratedProvider`](crate::AcceleratedProvider).

use alloy_chains::NamedChain;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// The default storage key under which the receipt cache is persisted.
pub const DEFAULT_CACHE_KEY: &str = "bridge-rpc:tx-receipts-cache";

/// The default window during which outbound requests are coalesced into a single batch.
pub const DEFAULT_BATCH_WINDOW_MS: u64 = 10;

/// The default maximum number of sub-requests carried by a single batch.
pub const DEFAULT_BATCH_MAX_SIZE: usize = 100;

/// The default maximum age of a chain head reused across receipt lookups.
pub const DEFAULT_HEAD_MAX_AGE_MS: u64 = 1_000;

/// Minimum confirmations required before a mainnet receipt is cached.
pub const MAINNET_MIN_CONFIRMATIONS: u64 = 65;

/// Minimum confirmations required before an Arbitrum Sepolia receipt is cached.
pub const ARBITRUM_SEPOLIA_MIN_CONFIRMATIONS: u64 = 5;

/// The accelerator configuration.
///
/// Every field has a default, so partial configurations (e.g. a TOML file that only
/// sets `enable_batching = false`) deserialize into a complete config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcceleratorConfig {
    /// Whether receipts are read from and written to the persistent store.
    ///
    /// When disabled the store is never touched, not even read.
    pub enable_caching: bool,
    /// Whether outbound requests are coalesced by the batching transport.
    pub enable_batching: bool,
    /// The storage key under which the receipt cache is persisted.
    pub cache_key: String,
    /// Batching transport tuning.
    pub batch: BatchConfig,
    /// How long, in milliseconds, a fetched block number is reused to derive the
    /// confirmations of further receipts. Zero fetches the head for every lookup.
    ///
    /// A stale head only under-counts confirmations, so it never admits a receipt early.
    pub head_max_age_ms: u64,
    /// Per-chain minimum confirmation counts gating cache admission.
    pub confirmations: ConfirmationThresholds,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            enable_batching: true,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            batch: BatchConfig::default(),
            head_max_age_ms: DEFAULT_HEAD_MAX_AGE_MS,
            confirmations: ConfirmationThresholds::default(),
        }
    }
}

impl AcceleratorConfig {
    /// Sets whether caching is enabled.
    pub const fn with_caching(mut self, enable_caching: bool) -> Self {
        self.enable_caching = enable_caching;
        self
    }

    /// Sets whether batching is enabled.
    pub const fn with_batching(mut self, enable_batching: bool) -> Self {
        self.enable_batching = enable_batching;
        self
    }

    /// Sets the storage key of the receipt cache.
    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }

    /// Sets how long a fetched block number is reused, in milliseconds.
    pub const fn with_head_max_age_ms(mut self, head_max_age_ms: u64) -> Self {
        self.head_max_age_ms = head_max_age_ms;
        self
    }

    /// Returns the maximum age of a reused block number as a [`Duration`].
    pub const fn head_max_age(&self) -> Duration {
        Duration::from_millis(self.head_max_age_ms)
    }

    /// Sets the minimum confirmations for the given chain.
    pub fn with_min_confirmations(mut self, chain_id: u64, minimum: u64) -> Self {
        self.confirmations.set(chain_id, minimum);
        self
    }
}

/// Tuning for the [`BatchingTransport`](crate::BatchingTransport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// How long, in milliseconds, the transport waits for more requests after the first
    /// request of a batch arrives. Zero flushes on the next scheduler tick.
    pub window_ms: u64,
    /// The maximum number of sub-requests in one outbound request.
    pub max_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { window_ms: DEFAULT_BATCH_WINDOW_MS, max_size: DEFAULT_BATCH_MAX_SIZE }
    }
}

impl BatchConfig {
    /// Returns the coalescing window as a [`Duration`].
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// A single entry of the [`ConfirmationThresholds`] table, as it appears in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainThreshold {
    /// The chain the threshold applies to.
    pub chain_id: u64,
    /// The minimum number of confirmations.
    pub minimum: u64,
}

/// The table of per-chain minimum confirmation counts.
///
/// Chains without an entry are not gated on confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ChainThreshold>", into = "Vec<ChainThreshold>")]
pub struct ConfirmationThresholds(BTreeMap<u64, u64>);

impl Default for ConfirmationThresholds {
    fn default() -> Self {
        Self::from_iter([
            (NamedChain::Mainnet as u64, MAINNET_MIN_CONFIRMATIONS),
            (NamedChain::ArbitrumSepolia as u64, ARBITRUM_SEPOLIA_MIN_CONFIRMATIONS),
        ])
    }
}

impl ConfirmationThresholds {
    /// Returns an empty table, under which every chain is ungated.
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the minimum confirmations configured for the given chain, if any.
    pub fn minimum(&self, chain_id: u64) -> Option<u64> {
        self.0.get(&chain_id).copied()
    }

    /// Sets the minimum confirmations for the given chain, replacing any previous entry.
    pub fn set(&mut self, chain_id: u64, minimum: u64) {
        self.0.insert(chain_id, minimum);
    }

    /// Removes the entry for the given chain, returning its previous minimum.
    pub fn remove(&mut self, chain_id: u64) -> Option<u64> {
        self.0.remove(&chain_id)
    }

    /// Returns an iterator over `(chain_id, minimum)` pairs in chain id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.0.iter().map(|(chain_id, minimum)| (*chain_id, *minimum))
    }
}

impl FromIterator<(u64, u64)> for ConfirmationThresholds {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<ChainThreshold>> for ConfirmationThresholds {
    fn from(entries: Vec<ChainThreshold>) -> Self {
        entries.into_iter().map(|entry| (entry.chain_id, entry.minimum)).collect()
    }
}

impl From<ConfirmationThresholds> for Vec<ChainThreshold> {
    fn from(thresholds: ConfirmationThresholds) -> Self {
        thresholds.iter().map(|(chain_id, minimum)| ChainThreshold { chain_id, minimum }).collect()
    }
}
