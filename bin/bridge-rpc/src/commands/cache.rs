//! Cache Subcommand

use crate::flags::GlobalArgs;
use clap::Subcommand;

/// The `cache` Subcommand
///
/// Inspects or clears the persistent receipt cache without contacting the node.
///
/// # Usage
///
/// ```sh
/// bridge-rpc cache stats [FLAGS] [OPTIONS]
/// bridge-rpc cache clear [FLAGS] [OPTIONS]
/// ```
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Prints the number of cached receipts per chain.
    Stats,
    /// Removes every cached receipt.
    Clear,
}

impl CacheCommand {
    /// Runs the subcommand.
    pub fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let config = args.accelerator.load_config()?;
        let cache = args.receipt_cache(&config);
        if !cache.is_persistent() {
            anyhow::bail!("No cache directory available, set --cache-dir");
        }

        match self {
            Self::Stats => {
                let stats = cache.stats();
                println!("Cache key: {}", cache.key());
                for (chain, count) in &stats {
                    println!("Chain {chain}: {count} receipts");
                }
                println!("Total: {} receipts", stats.values().sum::<usize>());
            }
            Self::Clear => {
                cache.clear()?;
                info!(target: "bridge_rpc::cache", key = cache.key(), "Cleared receipt cache");
                println!("Cleared receipt cache '{}'", cache.key());
            }
        }
        Ok(())
    }
}
