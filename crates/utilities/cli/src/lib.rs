#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bridge-rpc/bridge-rpc/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod log;
pub use log::{LogArgs, init_tracing_subscriber};

pub mod metrics_args;
pub use metrics_args::MetricsArgs;

mod prometheus;
pub use prometheus::init_prometheus_server;

mod styles;
pub use styles::cli_styles;

mod error;
pub use error::{CliError, CliResult, PrometheusError};
