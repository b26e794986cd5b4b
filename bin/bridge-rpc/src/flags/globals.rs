//! Global arguments for the CLI.

use crate::flags::AcceleratorArgs;
use alloy_chains::Chain;
use bridge_rpc_accelerator::{
    AcceleratedProvider, AcceleratorBuilder, AcceleratorConfig, KeyValueStore, ReceiptCache,
};
use bridge_rpc_cli::{LogArgs, MetricsArgs};
use clap::Parser;
use std::sync::Arc;
use url::Url;

/// Global arguments for the CLI.
#[derive(Parser, Default, Clone, Debug)]
pub struct GlobalArgs {
    /// Logging arguments.
    #[command(flatten)]
    pub log_args: LogArgs,
    /// URL of the JSON-RPC endpoint.
    #[arg(long, global = true, env = "BRIDGE_RPC_URL")]
    pub rpc_url: Option<Url>,
    /// The chain served by the endpoint, as a name or an id. Receipts are cached under it.
    #[arg(long, short = 'c', global = true, default_value = "1", env = "BRIDGE_RPC_CHAIN_ID")]
    pub chain_id: Chain,
    /// Accelerator arguments.
    #[command(flatten)]
    pub accelerator: AcceleratorArgs,
    /// Prometheus CLI arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
}

impl GlobalArgs {
    /// Returns the RPC endpoint, failing if none was given.
    pub fn rpc_url(&self) -> anyhow::Result<&Url> {
        self.rpc_url.as_ref().ok_or_else(|| {
            anyhow::anyhow!("No RPC endpoint given, set --rpc-url or BRIDGE_RPC_URL")
        })
    }

    /// Returns the receipt cache selected by the flags.
    pub fn receipt_cache(&self, config: &AcceleratorConfig) -> ReceiptCache {
        let store = self.accelerator.store().map(|store| Arc::new(store) as Arc<dyn KeyValueStore>);
        ReceiptCache::new(store, config.cache_key.clone())
    }

    /// Builds the accelerated provider for the configured endpoint and chain.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn provider(&self) -> anyhow::Result<AcceleratedProvider> {
        let config = self.accelerator.load_config()?;
        let builder = AcceleratorBuilder::new(self.rpc_url()?.clone(), self.chain_id.id());
        let builder = match self.accelerator.store() {
            Some(store) => builder.with_store(Arc::new(store)),
            None => builder.without_store(),
        };
        Ok(builder.with_config(config).build())
    }
}
