//! Outbound request transports.

mod batch;
pub use batch::BatchingTransport;

mod dispatch;
pub use dispatch::{RequestDispatcher, TransportMode};
