//! Subcommands for the `bridge-rpc` binary.

mod receipt;
pub use receipt::ReceiptCommand;

mod chain;
pub use chain::{BlockNumberCommand, GasPriceCommand};

mod cache;
pub use cache::CacheCommand;
