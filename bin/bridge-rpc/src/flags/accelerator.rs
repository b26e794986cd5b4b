//! Flags configuring the accelerator.

use alloy_chains::Chain;
use anyhow::Context;
use bridge_rpc_accelerator::{AcceleratorConfig, FileStore};
use clap::Args;
use std::{fs, path::PathBuf};

/// Accelerator configuration arguments.
///
/// Flags override the values read from `--config`, which in turn override the defaults.
#[derive(Args, Default, Clone, Debug, PartialEq, Eq)]
pub struct AcceleratorArgs {
    /// Path to a TOML accelerator configuration file.
    #[arg(long, global = true, env = "BRIDGE_RPC_CONFIG")]
    pub config: Option<PathBuf>,
    /// Directory holding the persistent receipt cache. Defaults to the platform cache
    /// directory.
    #[arg(long, global = true, env = "BRIDGE_RPC_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
    /// Disables the receipt cache. The persistent store is neither read nor written.
    #[arg(long, global = true, env = "BRIDGE_RPC_NO_CACHE")]
    pub no_cache: bool,
    /// Sends every request on its own instead of coalescing them into batches.
    #[arg(long, global = true, env = "BRIDGE_RPC_NO_BATCH")]
    pub no_batch: bool,
    /// Window, in milliseconds, during which requests are coalesced into one batch.
    #[arg(long = "batch.window-ms", global = true)]
    pub batch_window_ms: Option<u64>,
    /// Maximum number of requests carried by one batch.
    #[arg(long = "batch.max-size", global = true)]
    pub batch_max_size: Option<usize>,
    /// Minimum confirmations before a receipt of the given chain is cached, as
    /// `<chain>=<count>`. The chain is a name or an id. May be repeated.
    #[arg(long = "min-confirmations", global = true, value_parser = parse_threshold)]
    pub min_confirmations: Vec<(u64, u64)>,
}

impl AcceleratorArgs {
    /// Returns the effective [`AcceleratorConfig`].
    pub fn load_config(&self) -> anyhow::Result<AcceleratorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path).with_context(|| {
                    format!("Failed to read config file '{}'", path.display())
                })?;
                toml::from_str(&raw).with_context(|| {
                    format!("Failed to parse config file '{}'", path.display())
                })?
            }
            None => AcceleratorConfig::default(),
        };

        if self.no_cache {
            config.enable_caching = false;
        }
        if self.no_batch {
            config.enable_batching = false;
        }
        if let Some(window_ms) = self.batch_window_ms {
            config.batch.window_ms = window_ms;
        }
        if let Some(max_size) = self.batch_max_size {
            config.batch.max_size = max_size;
        }
        for (chain_id, minimum) in &self.min_confirmations {
            config.confirmations.set(*chain_id, *minimum);
        }
        Ok(config)
    }

    /// Returns the file store holding the receipt cache, if a location is known.
    pub fn store(&self) -> Option<FileStore> {
        self.cache_dir.as_ref().map(FileStore::new).or_else(FileStore::default_location)
    }
}

/// Parses a `<chain>=<count>` confirmation threshold.
fn parse_threshold(s: &str) -> Result<(u64, u64), String> {
    let (chain, minimum) =
        s.split_once('=').ok_or_else(|| format!("expected <chain>=<count>, got '{s}'"))?;
    let chain: Chain =
        chain.trim().parse().map_err(|_| format!("invalid chain '{}'", chain.trim()))?;
    let minimum =
        minimum.trim().parse().map_err(|_| format!("invalid count '{}'", minimum.trim()))?;
    Ok((chain.id(), minimum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_rpc_accelerator::{ARBITRUM_SEPOLIA_MIN_CONFIRMATIONS, BatchConfig};
    use clap::Parser;
    use rstest::rstest;
    use std::io::Write;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        accelerator: AcceleratorArgs,
    }

    fn parse(args: &[&str]) -> AcceleratorArgs {
        TestCli::try_parse_from(std::iter::once("test").chain(args.iter().copied()))
            .unwrap()
            .accelerator
    }

    #[rstest]
    #[case::by_id("1=70", (1, 70))]
    #[case::by_name("mainnet=70", (1, 70))]
    #[case::rollup_name("arbitrum-sepolia=3", (421614, 3))]
    #[case::unknown_id("999999=2", (999999, 2))]
    #[case::spaces(" 10 = 12 ", (10, 12))]
    fn test_parse_threshold(#[case] input: &str, #[case] expected: (u64, u64)) {
        assert_eq!(parse_threshold(input).unwrap(), expected);
    }

    #[rstest]
    #[case::missing_separator("1:70")]
    #[case::bad_chain("not-a-chain=5")]
    #[case::bad_count("1=many")]
    fn test_parse_threshold_invalid(#[case] input: &str) {
        assert!(parse_threshold(input).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).load_config().unwrap();
        assert_eq!(config, AcceleratorConfig::default());
    }

    #[test]
    fn test_flag_overrides() {
        let config = parse(&[
            "--no-cache",
            "--no-batch",
            "--batch.window-ms",
            "0",
            "--batch.max-size",
            "8",
            "--min-confirmations",
            "1=12",
            "--min-confirmations",
            "10=3",
        ])
        .load_config()
        .unwrap();

        assert!(!config.enable_caching);
        assert!(!config.enable_batching);
        assert_eq!(config.batch, BatchConfig { window_ms: 0, max_size: 8 });
        assert_eq!(config.confirmations.minimum(1), Some(12));
        assert_eq!(config.confirmations.minimum(10), Some(3));
        assert_eq!(config.confirmations.minimum(421614), Some(ARBITRUM_SEPOLIA_MIN_CONFIRMATIONS));
    }

    #[test]
    fn test_config_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
enable_batching = false
cache_key = "custom:key"

[batch]
window_ms = 25

[[confirmations]]
chain_id = 42161
minimum = 20
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path, "--min-confirmations", "42161=30"])
            .load_config()
            .unwrap();
        assert!(config.enable_caching);
        assert!(!config.enable_batching);
        assert_eq!(config.cache_key, "custom:key");
        assert_eq!(config.batch.window_ms, 25);
        assert_eq!(config.confirmations.minimum(42161), Some(30));
        // A table in the file replaces the default thresholds.
        assert_eq!(config.confirmations.minimum(1), None);
    }

    #[test]
    fn test_invalid_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "enable_turbo = true").unwrap();
        let path = file.path().to_str().unwrap();
        assert!(parse(&["--config", path]).load_config().is_err());
        assert!(parse(&["--config", "/nonexistent/bridge-rpc.toml"]).load_config().is_err());
    }

    #[test]
    fn test_cache_dir() {
        let args = parse(&["--cache-dir", "/tmp/receipts"]);
        assert_eq!(args.store().unwrap().dir(), std::path::Path::new("/tmp/receipts"));
    }
}
