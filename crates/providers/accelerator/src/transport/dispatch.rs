//! Selection between the direct and the batching transport.

use crate::{AcceleratorConfig, BatchConfig, BatchingTransport};
use alloy_rpc_client::RpcClient;
use alloy_transport::Transport;
use alloy_transport_http::{Client, Http};
use url::Url;

/// How outbound requests reach the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Every request is sent immediately, on its own.
    Direct,
    /// Concurrent requests are coalesced into batches.
    Batched(BatchConfig),
}

impl TransportMode {
    /// Returns the mode selected by the given config.
    pub const fn from_config(config: &AcceleratorConfig) -> Self {
        if config.enable_batching { Self::Batched(config.batch) } else { Self::Direct }
    }
}

/// Routes every outbound call through the transport selected at construction.
///
/// The dispatcher only chooses a transport. Call semantics, ordering and error propagation
/// are those of the selected transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDispatcher {
    mode: TransportMode,
}

impl RequestDispatcher {
    /// Creates a new [`RequestDispatcher`] for the given mode.
    pub const fn new(mode: TransportMode) -> Self {
        Self { mode }
    }

    /// Creates a new [`RequestDispatcher`] from the given config.
    pub const fn from_config(config: &AcceleratorConfig) -> Self {
        Self::new(TransportMode::from_config(config))
    }

    /// Returns the selected mode.
    pub const fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Builds an [`RpcClient`] sending requests through `transport`.
    ///
    /// In batched mode this spawns the batching task and so must be called inside a Tokio
    /// runtime.
    pub fn client<T: Transport + Clone>(&self, transport: T) -> RpcClient {
        match self.mode {
            TransportMode::Direct => {
                debug!(target: "accelerator::dispatch", "Using direct transport");
                RpcClient::new(transport, false)
            }
            TransportMode::Batched(config) => {
                debug!(
                    target: "accelerator::dispatch",
                    window_ms = config.window_ms,
                    max_size = config.max_size,
                    "Using batching transport"
                );
                RpcClient::new(BatchingTransport::new(transport, config), false)
            }
        }
    }

    /// Builds an [`RpcClient`] talking HTTP to `url`.
    pub fn http_client(&self, url: Url) -> RpcClient {
        self.client(Http::with_client(Client::new(), url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;
    use alloy_primitives::U64;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_mode_from_config() {
        let config = AcceleratorConfig::default();
        assert_eq!(TransportMode::from_config(&config), TransportMode::Batched(config.batch));

        let config = config.with_batching(false);
        assert_eq!(TransportMode::from_config(&config), TransportMode::Direct);
    }

    #[rstest]
    #[case::batched(true, vec![4])]
    #[case::direct(false, vec![1, 1, 1, 1])]
    #[tokio::test]
    async fn test_outbound_requests(#[case] enable_batching: bool, #[case] expected: Vec<usize>) {
        let mock = MockTransport::new(|_, _| Ok(json!("0x2a")));
        let config = AcceleratorConfig::default().with_batching(enable_batching);
        let client = RequestDispatcher::from_config(&config).client(mock.clone());

        let calls = (0..4).map(|_| {
            let client = client.clone();
            async move { client.request_noparams::<U64>("eth_blockNumber").await }
        });
        for result in futures::future::join_all(calls).await {
            assert_eq!(result.unwrap(), U64::from(42));
        }

        assert_eq!(mock.batch_sizes(), expected);
    }
}
