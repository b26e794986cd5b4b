//! A transport coalescing concurrent requests into JSON-RPC batches.

use crate::BatchConfig;
use alloy_json_rpc::{Id, RequestPacket, Response, ResponsePacket, RpcError, SerializedRequest};
use alloy_transport::{Transport, TransportError, TransportErrorKind, TransportFut};
use std::{
    collections::HashMap,
    task::{Context, Poll},
};
use tokio::sync::{mpsc, oneshot};
use tower::Service;

/// A request waiting for its batch to be flushed.
#[derive(Debug)]
struct Queued {
    request: SerializedRequest,
    tx: oneshot::Sender<Result<Response, TransportError>>,
}

/// A [`Transport`] that coalesces single requests into batches.
///
/// Every single request is queued. A background task takes the first queued request,
/// waits for the configured window, drains whatever else has been queued (up to the
/// maximum batch size), and sends everything as one outbound request. Responses are
/// routed back to their callers by JSON-RPC id.
///
/// Batches built by the caller bypass the queue and are forwarded as they are.
///
/// Must be constructed inside a Tokio runtime.
#[derive(Debug, Clone)]
pub struct BatchingTransport<T> {
    inner: T,
    queue: mpsc::UnboundedSender<Queued>,
}

impl<T> BatchingTransport<T>
where
    T: Transport + Clone,
{
    /// Wraps `inner`, spawning the task that flushes batches to it.
    pub fn new(inner: T, config: BatchConfig) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(BatchTask { inner: inner.clone(), config, rx }.run());
        Self { inner, queue }
    }

    /// Returns a reference to the wrapped transport.
    pub const fn inner(&self) -> &T {
        &self.inner
    }

    async fn dispatch(self, packet: RequestPacket) -> Result<ResponsePacket, TransportError> {
        match packet {
            RequestPacket::Single(request) => {
                let (tx, rx) = oneshot::channel();
                self.queue
                    .send(Queued { request, tx })
                    .map_err(|_| TransportErrorKind::backend_gone())?;
                let response = rx.await.map_err(|_| TransportErrorKind::backend_gone())??;
                Ok(ResponsePacket::Single(response))
            }
            batch @ RequestPacket::Batch(_) => {
                let mut inner = self.inner;
                inner.call(batch).await
            }
        }
    }
}

impl<T> Service<RequestPacket> for BatchingTransport<T>
where
    T: Transport + Clone,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, packet: RequestPacket) -> Self::Future {
        Box::pin(self.clone().dispatch(packet))
    }
}

/// The background task draining the request queue.
#[derive(Debug)]
struct BatchTask<T> {
    inner: T,
    config: BatchConfig,
    rx: mpsc::UnboundedReceiver<Queued>,
}

impl<T> BatchTask<T>
where
    T: Transport + Clone,
{
    async fn run(mut self) {
        let max_size = self.config.max_size.max(1);
        while let Some(first) = self.rx.recv().await {
            let mut pending = vec![first];
            if self.config.window_ms == 0 {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.config.window()).await;
            }
            while pending.len() < max_size {
                match self.rx.try_recv() {
                    Ok(next) => pending.push(next),
                    Err(_) => break,
                }
            }
            tokio::spawn(flush(self.inner.clone(), pending));
        }
        trace!(target: "accelerator::batch", "All transport handles dropped, stopping batch task");
    }
}

/// Sends the pending requests as one outbound request and answers every caller.
async fn flush<T: Transport>(mut inner: T, pending: Vec<Queued>) {
    let size = pending.len();
    crate::Metrics::record_batch(size);

    let mut requests = Vec::with_capacity(size);
    let mut waiters = Vec::with_capacity(size);
    for Queued { request, tx } in pending {
        waiters.push((request.id().clone(), tx));
        requests.push(request);
    }

    let packet = if size == 1 {
        RequestPacket::Single(requests.remove(0))
    } else {
        RequestPacket::Batch(requests)
    };
    debug!(target: "accelerator::batch", size, "Flushing request batch");

    let result = inner.call(packet).await;
    let responses = match result {
        Ok(ResponsePacket::Single(response)) => vec![response],
        Ok(ResponsePacket::Batch(responses)) => responses,
        Err(err) if waiters.len() == 1 => {
            let (_, tx) = waiters.remove(0);
            let _ = tx.send(Err(err));
            return;
        }
        Err(err) => {
            warn!(target: "accelerator::batch", size, %err, "Batch request failed");
            for (_, tx) in waiters {
                let _ = tx.send(Err(replicate_error(&err)));
            }
            return;
        }
    };

    let mut by_id: HashMap<Id, Response> =
        responses.into_iter().map(|response| (response.id.clone(), response)).collect();
    for (id, tx) in waiters {
        let response = by_id.remove(&id).ok_or_else(|| {
            warn!(target: "accelerator::batch", ?id, "Missing response in batch");
            RpcError::Transport(TransportErrorKind::MissingBatchResponse(id))
        });
        let _ = tx.send(response);
    }
}

/// Rebuilds `err` for one of the callers of a failed batch.
///
/// Transport errors are not [`Clone`]. Variants callers may act on, such as HTTP status
/// codes, are reconstructed; the rest keep their message.
fn replicate_error(err: &TransportError) -> TransportError {
    match err {
        RpcError::Transport(TransportErrorKind::HttpError(http)) => {
            TransportErrorKind::http_error(http.status, http.body.clone())
        }
        RpcError::Transport(TransportErrorKind::MissingBatchResponse(id)) => {
            TransportErrorKind::missing_batch_response(id.clone())
        }
        RpcError::Transport(TransportErrorKind::BackendGone) => TransportErrorKind::backend_gone(),
        RpcError::Transport(TransportErrorKind::PubsubUnavailable) => {
            TransportErrorKind::pubsub_unavailable()
        }
        RpcError::ErrorResp(payload) => RpcError::ErrorResp(payload.clone()),
        RpcError::NullResp => RpcError::NullResp,
        RpcError::UnsupportedFeature(feature) => RpcError::UnsupportedFeature(*feature),
        other => TransportErrorKind::custom_str(&other.to_string()),
    }
}
