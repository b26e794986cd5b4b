//! Passthrough Subcommands

use crate::flags::GlobalArgs;
use bridge_rpc_accelerator::EthProvider;
use clap::Parser;

/// The `block-number` Subcommand
///
/// Prints the number of the most recent block.
///
/// # Usage
///
/// ```sh
/// bridge-rpc block-number [FLAGS] [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(about = "Prints the number of the most recent block")]
pub struct BlockNumberCommand {}

impl BlockNumberCommand {
    /// Runs the subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        println!("{}", args.provider()?.get_block_number().await?);
        Ok(())
    }
}

/// The `gas-price` Subcommand
///
/// Prints the current gas price in wei.
///
/// # Usage
///
/// ```sh
/// bridge-rpc gas-price [FLAGS] [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(about = "Prints the current gas price in wei")]
pub struct GasPriceCommand {}

impl GasPriceCommand {
    /// Runs the subcommand.
    pub async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        println!("{}", args.provider()?.get_gas_price().await?);
        Ok(())
    }
}
