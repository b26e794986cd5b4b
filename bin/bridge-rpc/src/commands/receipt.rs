//! Receipt Subcommand

use crate::flags::GlobalArgs;
use alloy_primitives::B256;
use bridge_rpc_accelerator::{EthProvider, TransactionReceipt};
use clap::Parser;
use futures::future::try_join_all;
use serde_json::{Map, Value};

/// The `receipt` Subcommand
///
/// Fetches transaction receipts through the accelerator and prints them as JSON. Receipts
/// are looked up concurrently, so with batching enabled a single request reaches the node.
///
/// # Usage
///
/// ```sh
/// bridge-rpc receipt [FLAGS] [OPTIONS] <HASH>...
/// ```
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(about = "Fetches transaction receipts through the receipt cache")]
pub struct ReceiptCommand {
    /// The transaction hashes to look up.
    #[arg(required = true, num_args = 1..)]
    pub hashes: Vec<B256>,
}

impl ReceiptCommand {
    /// Runs the subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let provider = args.provider()?;
        let receipts =
            try_join_all(self.hashes.iter().map(|hash| provider.get_transaction_receipt(*hash)))
                .await?;
        debug!(target: "bridge_rpc::receipt", count = receipts.len(), "Fetched receipts");
        println!("{}", serde_json::to_string_pretty(&Self::render(&self.hashes, receipts)?)?);
        Ok(())
    }

    /// Renders a single receipt as itself, and several as an object keyed by hash.
    fn render(
        hashes: &[B256],
        mut receipts: Vec<Option<TransactionReceipt>>,
    ) -> serde_json::Result<Value> {
        if receipts.len() == 1 {
            return serde_json::to_value(receipts.pop().flatten());
        }
        let mut rendered = Map::with_capacity(hashes.len());
        for (hash, receipt) in hashes.iter().zip(receipts) {
            rendered.insert(hash.to_string(), serde_json::to_value(receipt)?);
        }
        Ok(Value::Object(rendered))
    }
}
