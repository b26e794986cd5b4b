//! Providers answering the JSON-RPC calls used by the bridge.

use crate::{
    AcceleratorConfig, FileStore, KeyValueStore, Metrics, ProviderResult, ReceiptCache,
    RequestDispatcher, RpcReceipt, TransactionReceipt, admission,
};
use alloy_primitives::{B256, U64, U256};
use alloy_rpc_client::RpcClient;
use alloy_transport::TransportResult;
use async_trait::async_trait;
use derive_more::Constructor;
use serde_json::Value;
use std::{
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use url::Url;

/// The subset of the Ethereum JSON-RPC API used by the bridge.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EthProvider: Debug + Send + Sync {
    /// Returns the number of the most recent block.
    async fn get_block_number(&self) -> ProviderResult<u64>;

    /// Returns the current gas price in wei.
    async fn get_gas_price(&self) -> ProviderResult<U256>;

    /// Returns the chain id reported by the node.
    async fn get_chain_id(&self) -> ProviderResult<u64>;

    /// Returns the receipt of the given transaction, or `None` if it is unknown or pending.
    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> ProviderResult<Option<TransactionReceipt>>;

    /// Sends an arbitrary JSON-RPC request and returns its raw result.
    async fn send(&self, method: String, params: Value) -> ProviderResult<Value>;
}

/// A block number fetched to derive receipt confirmations.
#[derive(Debug, Clone, Copy)]
struct ChainHead {
    number: u64,
    fetched_at: Instant,
}

/// An [`EthProvider`] backed directly by an [`RpcClient`].
///
/// Receipt lookups share the block number used to derive confirmations: concurrent lookups
/// wait on one in-flight `eth_blockNumber` request, and its result is reused until it is
/// older than the configured maximum age.
#[derive(Debug, Clone)]
pub struct RpcProvider {
    client: RpcClient,
    head: Arc<Mutex<Option<ChainHead>>>,
    head_max_age: Duration,
}

impl RpcProvider {
    /// Creates a new [`RpcProvider`] reusing the chain head for
    /// [`DEFAULT_HEAD_MAX_AGE_MS`](crate::DEFAULT_HEAD_MAX_AGE_MS).
    pub fn new(client: RpcClient) -> Self {
        Self {
            client,
            head: Arc::default(),
            head_max_age: Duration::from_millis(crate::DEFAULT_HEAD_MAX_AGE_MS),
        }
    }

    /// Creates a new [`RpcProvider`] talking HTTP to `url` through the transport selected by
    /// `dispatcher`.
    pub fn new_http(url: Url, dispatcher: &RequestDispatcher) -> Self {
        Self::new(dispatcher.http_client(url))
    }

    /// Sets how long a fetched chain head is reused for receipt confirmations.
    pub const fn with_head_max_age(mut self, head_max_age: Duration) -> Self {
        self.head_max_age = head_max_age;
        self
    }

    /// Returns the underlying client.
    pub const fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Returns the latest block number, reusing a recent one if available.
    async fn chain_head(&self) -> TransportResult<u64> {
        let mut head = self.head.lock().await;
        if let Some(cached) = head.filter(|head| head.fetched_at.elapsed() < self.head_max_age) {
            return Ok(cached.number);
        }
        let number: U64 = self.client.request_noparams("eth_blockNumber").await?;
        let number = number.to();
        *head = Some(ChainHead { number, fetched_at: Instant::now() });
        Ok(number)
    }
}

#[async_trait]
impl EthProvider for RpcProvider {
    async fn get_block_number(&self) -> ProviderResult<u64> {
        let number: U64 = self.client.request_noparams("eth_blockNumber").await?;
        Ok(number.to())
    }

    async fn get_gas_price(&self) -> ProviderResult<U256> {
        Ok(self.client.request_noparams("eth_gasPrice").await?)
    }

    async fn get_chain_id(&self) -> ProviderResult<u64> {
        let chain_id: U64 = self.client.request_noparams("eth_chainId").await?;
        Ok(chain_id.to())
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> ProviderResult<Option<TransactionReceipt>> {
        // Both requests are issued together so a batching transport sends them in one batch.
        let (receipt, head) = tokio::try_join!(
            async {
                self.client
                    .request::<_, Option<RpcReceipt>>("eth_getTransactionReceipt", (hash,))
                    .await
            },
            self.chain_head(),
        )?;
        Ok(receipt.map(|receipt| TransactionReceipt::from_rpc(receipt, head)))
    }

    async fn send(&self, method: String, params: Value) -> ProviderResult<Value> {
        Ok(self.client.request::<_, Value>(method, params).await?)
    }
}

/// An [`EthProvider`] serving transaction receipts from a persistent cache.
///
/// Receipt lookups consult the cache first and fall back to the inner provider. Fetched
/// receipts are persisted when they pass the admission policy. Every other call is
/// delegated unchanged.
///
/// Concurrent lookups of the same uncached receipt are not de-duplicated: each one reaches
/// the network and the last write wins.
#[derive(Constructor, Debug, Clone)]
pub struct AcceleratedProvider<P = RpcProvider> {
    inner: P,
    chain_id: u64,
    cache: ReceiptCache,
    config: AcceleratorConfig,
}

impl<P: EthProvider> AcceleratedProvider<P> {
    /// Returns the wrapped provider.
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    /// Returns the chain id receipts are cached under.
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Returns the receipt cache.
    pub const fn cache(&self) -> &ReceiptCache {
        &self.cache
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &AcceleratorConfig {
        &self.config
    }

    fn persist(&self, receipt: &TransactionReceipt) {
        let decision = admission(self.chain_id, receipt, &self.config);
        if !decision.is_admitted() {
            debug!(
                target: "accelerator::provider",
                hash = %receipt.transaction_hash,
                reason = decision.as_str(),
                "Receipt not admitted to cache"
            );
            Metrics::record_rejection(self.chain_id, decision.as_str());
            return;
        }

        let result = self.cache.insert(self.chain_id, receipt.clone());
        Metrics::record_cache_write(self.chain_id, &result);
        match result {
            Ok(()) => trace!(
                target: "accelerator::provider",
                hash = %receipt.transaction_hash,
                "Cached receipt"
            ),
            Err(err) => warn!(
                target: "accelerator::provider",
                hash = %receipt.transaction_hash,
                %err,
                "Failed to cache receipt"
            ),
        }
    }
}

#[async_trait]
impl<P: EthProvider> EthProvider for AcceleratedProvider<P> {
    async fn get_block_number(&self) -> ProviderResult<u64> {
        self.inner.get_block_number().await
    }

    async fn get_gas_price(&self) -> ProviderResult<U256> {
        self.inner.get_gas_price().await
    }

    async fn get_chain_id(&self) -> ProviderResult<u64> {
        self.inner.get_chain_id().await
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> ProviderResult<Option<TransactionReceipt>> {
        if self.config.enable_caching {
            if let Some(receipt) = self.cache.get(self.chain_id, &hash) {
                trace!(target: "accelerator::provider", %hash, "Receipt cache hit");
                Metrics::record_cache_hit(self.chain_id);
                return Ok(Some(receipt));
            }
            Metrics::record_cache_miss(self.chain_id);
        }

        let receipt = self.inner.get_transaction_receipt(hash).await?;
        if let Some(receipt) = receipt.as_ref().filter(|_| self.config.enable_caching) {
            self.persist(receipt);
        }
        Ok(receipt)
    }

    async fn send(&self, method: String, params: Value) -> ProviderResult<Value> {
        self.inner.send(method, params).await
    }
}

#[derive(Debug, Clone, Default)]
enum StoreSelection {
    #[default]
    Default,
    Custom(Arc<dyn KeyValueStore>),
    Disabled,
}

/// Builder for an [`AcceleratedProvider`] talking HTTP to a node.
#[derive(Debug, Clone)]
pub struct AcceleratorBuilder {
    url: Url,
    chain_id: u64,
    config: AcceleratorConfig,
    store: StoreSelection,
}

impl AcceleratorBuilder {
    /// Creates a builder for the node at `url` serving `chain_id`.
    pub fn new(url: Url, chain_id: u64) -> Self {
        Self { url, chain_id, config: AcceleratorConfig::default(), store: StoreSelection::Default }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: AcceleratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Persists receipts in `store` instead of the default file store.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = StoreSelection::Custom(store);
        self
    }

    /// Keeps no persistent store. Lookups always miss and writes are discarded.
    pub fn without_store(mut self) -> Self {
        self.store = StoreSelection::Disabled;
        self
    }

    /// Builds the provider.
    ///
    /// With batching enabled this spawns the batching task and so must be called inside a
    /// Tokio runtime.
    pub fn build(self) -> AcceleratedProvider<RpcProvider> {
        let store = match self.store {
            StoreSelection::Custom(store) => Some(store),
            StoreSelection::Disabled => None,
            StoreSelection::Default => match FileStore::default_location() {
                Some(store) => Some(Arc::new(store) as Arc<dyn KeyValueStore>),
                None => {
                    warn!(
                        target: "accelerator::provider",
                        "No cache directory available, receipts will not be persisted"
                    );
                    None
                }
            },
        };
        let dispatcher = RequestDispatcher::from_config(&self.config);
        let inner = RpcProvider::new_http(self.url, &dispatcher)
            .with_head_max_age(self.config.head_max_age());
        let cache = ReceiptCache::new(store, self.config.cache_key.clone());
        AcceleratedProvider::new(inner, self.chain_id, cache, self.config)
    }
}
