//! The cache admission policy.
//!
//! Decides whether a freshly fetched receipt is safe to persist. Only successful
//! transactions are admitted, and on chains with a configured confirmation threshold the
//! receipt must be buried deep enough that a reorg is no longer a practical concern.

use crate::{AcceleratorConfig, TransactionReceipt};

/// The outcome of evaluating the admission policy against a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The receipt may be cached.
    Admitted,
    /// Caching is disabled by configuration.
    CachingDisabled,
    /// The transaction failed; it may be resubmitted, so its receipt is not cached.
    Failed,
    /// The receipt does not yet have enough confirmations for its chain.
    Unconfirmed {
        /// The configured minimum.
        required: u64,
        /// The confirmations observed on the receipt.
        observed: u64,
    },
}

impl Admission {
    /// Returns true if the receipt was admitted.
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }

    /// A short label for logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::CachingDisabled => "caching_disabled",
            Self::Failed => "failed",
            Self::Unconfirmed { .. } => "unconfirmed",
        }
    }
}

/// Evaluates the admission rules in order, returning the first rejection.
pub fn admission(
    chain_id: u64,
    receipt: &TransactionReceipt,
    config: &AcceleratorConfig,
) -> Admission {
    if !config.enable_caching {
        return Admission::CachingDisabled;
    }
    if receipt.is_failed() {
        return Admission::Failed;
    }
    match config.confirmations.minimum(chain_id) {
        Some(required) if receipt.confirmations < required => {
            Admission::Unconfirmed { required, observed: receipt.confirmations }
        }
        _ => Admission::Admitted,
    }
}

/// Returns true if the receipt may be cached for the given chain.
pub fn should_cache(
    chain_id: u64,
    receipt: &TransactionReceipt,
    config: &AcceleratorConfig,
) -> bool {
    admission(chain_id, receipt, config).is_admitted()
}
