//! Logging flags and tracing subscriber setup.

use crate::CliError;
use clap::{ArgAction, Args};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging arguments.
#[derive(Args, Default, Clone, Debug, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level (0-3). Logs `WARN` and above by default; each `-v` adds a level.
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub v: u8,
    /// Disables ANSI colors in log output.
    #[arg(long = "log.no-color", global = true, env = "BRIDGE_RPC_LOG_NO_COLOR")]
    pub no_color: bool,
}

impl LogArgs {
    /// Returns the log level selected by the verbosity flag.
    pub const fn level(&self) -> Level {
        match self.v {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Installs the global tracing subscriber.
    pub fn init_tracing_subscriber(&self, filter: Option<EnvFilter>) -> Result<(), CliError> {
        init_tracing_subscriber(self.level(), !self.no_color, filter)
    }
}

/// Installs a global fmt subscriber writing to stderr.
///
/// Directives from `filter` (or `RUST_LOG` when `None`) take precedence over `level`, which
/// only sets the default.
pub fn init_tracing_subscriber(
    level: Level,
    ansi: bool,
    filter: Option<EnvFilter>,
) -> Result<(), CliError> {
    let filter = filter.unwrap_or_else(|| {
        EnvFilter::builder().with_default_directive(level.into()).from_env_lossy()
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(ansi).with_target(true))
        .with(filter)
        .try_init()?;
    Ok(())
}
