//! Contains the bridge-rpc CLI.

use crate::{
    commands::{BlockNumberCommand, CacheCommand, GasPriceCommand, ReceiptCommand},
    flags::GlobalArgs,
};
use anyhow::Result;
use bridge_rpc_accelerator::Metrics;
use bridge_rpc_cli::cli_styles;
use clap::{Parser, Subcommand};

/// Subcommands for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Fetches transaction receipts through the receipt cache.
    Receipt(ReceiptCommand),
    /// Prints the number of the most recent block.
    BlockNumber(BlockNumberCommand),
    /// Prints the current gas price in wei.
    GasPrice(GasPriceCommand),
    /// Inspects or clears the persistent receipt cache.
    #[command(subcommand)]
    Cache(CacheCommand),
}

/// The bridge-rpc CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The subcommand to run.
    #[command(subcommand)]
    pub subcommand: Commands,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        self.init_stack()?;

        match self.subcommand {
            Commands::Cache(cache) => cache.run(&self.global),
            Commands::Receipt(receipt) => Self::block_on(receipt.run(&self.global)),
            Commands::BlockNumber(block_number) => Self::block_on(block_number.run(&self.global)),
            Commands::GasPrice(gas_price) => Self::block_on(gas_price.run(&self.global)),
        }
    }

    /// Initializes the tracing subscriber and, if enabled, the Prometheus exporter.
    fn init_stack(&self) -> Result<()> {
        self.global.log_args.init_tracing_subscriber(None)?;
        if self.global.metrics.init_metrics()?.is_some() {
            Metrics::init();
        }
        Ok(())
    }

    /// Runs the future to completion on a new multi-threaded Tokio runtime.
    fn block_on<F>(fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()?.block_on(fut)
    }
}
