//! Test utilities for the accelerator.

use crate::TransactionReceipt;
use alloy_json_rpc::{RequestPacket, Response, ResponsePacket, SerializedRequest};
use alloy_primitives::{Address, B256, Bloom, U256};
use alloy_transport::{TransportError, TransportErrorKind, TransportFut};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::{
    fmt,
    sync::Arc,
    task::{Context, Poll},
};
use tower::Service;

/// The answer of a [`MockTransport`] handler: a result value, or a JSON-RPC error code
/// and message.
pub type MockResult = Result<Value, (i64, String)>;

type Handler = dyn Fn(&str, &Value) -> MockResult + Send + Sync;

type Failure = dyn Fn() -> TransportError + Send + Sync;

/// A transport answering requests from a handler function and recording every outbound
/// packet it receives.
#[derive(Clone)]
pub struct MockTransport {
    handler: Arc<Handler>,
    packets: Arc<Mutex<Vec<RequestPacket>>>,
    failure: Arc<Mutex<Option<Arc<Failure>>>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport").field("packets", &self.packet_count()).finish()
    }
}

impl MockTransport {
    /// Creates a transport answering each request with `handler(method, params)`.
    pub fn new(handler: impl Fn(&str, &Value) -> MockResult + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            packets: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::default(),
        }
    }

    /// When offline, every packet fails at the transport level.
    pub fn set_offline(&self, offline: bool) {
        if offline {
            self.fail_with(|| TransportErrorKind::custom_str("connection refused"));
        } else {
            *self.failure.lock() = None;
        }
    }

    /// Fails every following packet with the error built by `make_error`.
    pub fn fail_with(&self, make_error: impl Fn() -> TransportError + Send + Sync + 'static) {
        *self.failure.lock() = Some(Arc::new(make_error));
    }

    /// Returns every packet received so far.
    pub fn packets(&self) -> Vec<RequestPacket> {
        self.packets.lock().clone()
    }

    /// Returns the number of outbound packets, i.e. HTTP requests, received so far.
    pub fn packet_count(&self) -> usize {
        self.packets.lock().len()
    }

    /// Returns the number of sub-requests carried by each packet.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.packets
            .lock()
            .iter()
            .map(|packet| match packet {
                RequestPacket::Single(_) => 1,
                RequestPacket::Batch(requests) => requests.len(),
            })
            .collect()
    }

    /// Returns how many sub-requests for `method` were received across all packets.
    pub fn method_count(&self, method: &str) -> usize {
        self.packets
            .lock()
            .iter()
            .flat_map(|packet| match packet {
                RequestPacket::Single(request) => std::slice::from_ref(request),
                RequestPacket::Batch(requests) => requests.as_slice(),
            })
            .filter(|request| request.method() == method)
            .count()
    }

    fn answer(&self, request: &SerializedRequest) -> Response {
        let envelope: Value =
            serde_json::from_str(request.serialized().get()).expect("valid request json");
        let params = envelope.get("params").cloned().unwrap_or(Value::Null);
        let id = envelope.get("id").cloned().unwrap_or(Value::Null);
        let body = match (self.handler)(request.method(), &params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err((code, message)) => {
                json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
            }
        };
        serde_json::from_str(&body.to_string()).expect("valid response json")
    }
}

impl Service<RequestPacket> for MockTransport {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, packet: RequestPacket) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            this.packets.lock().push(packet.clone());
            let failure = this.failure.lock().clone();
            if let Some(make_error) = failure {
                return Err(make_error());
            }
            Ok(match &packet {
                RequestPacket::Single(request) => ResponsePacket::Single(this.answer(request)),
                RequestPacket::Batch(requests) => ResponsePacket::Batch(
                    requests.iter().map(|request| this.answer(request)).collect(),
                ),
            })
        })
    }
}

/// Returns the wire shape of a receipt for `hash` mined in `block_number`.
pub fn receipt_json(hash: B256, block_number: u64, status: u8) -> Value {
    json!({
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0xbb),
        "blockNumber": format!("{block_number:#x}"),
        "from": Address::repeat_byte(0x01),
        "to": Address::repeat_byte(0x02),
        "contractAddress": null,
        "gasUsed": "0x5208",
        "cumulativeGasUsed": "0xa410",
        "effectiveGasPrice": "0x3b9aca00",
        "logsBloom": Bloom::ZERO,
        "logs": [{
            "address": Address::repeat_byte(0x03),
            "topics": [B256::repeat_byte(0x04)],
            "data": "0x",
            "blockNumber": format!("{block_number:#x}"),
            "transactionHash": hash,
            "transactionIndex": "0x0",
            "logIndex": "0x0",
            "removed": false
        }],
        "status": format!("{status:#x}"),
        "type": "0x2"
    })
}

/// Returns a receipt for `hash` with the given confirmations and status.
pub fn sample_receipt(hash: B256, confirmations: u64, status: u8) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        transaction_index: 0,
        block_hash: Some(B256::repeat_byte(0xbb)),
        block_number: Some(100),
        from: Address::repeat_byte(0x01),
        to: Some(Address::repeat_byte(0x02)),
        contract_address: None,
        gas_used: U256::from(21_000),
        cumulative_gas_used: U256::from(42_000),
        effective_gas_price: Some(U256::from(1_000_000_000u64)),
        gas_used_for_l1: Some(U256::from(1_234)),
        logs_bloom: Bloom::ZERO,
        logs: Vec::new(),
        status: Some(status),
        root: None,
        transaction_type: Some(2),
        confirmations,
    }
}
