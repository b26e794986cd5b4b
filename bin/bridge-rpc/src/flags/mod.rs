//! CLI flags for the `bridge-rpc` binary.

mod globals;
pub use globals::GlobalArgs;

mod accelerator;
pub use accelerator::AcceleratorArgs;
