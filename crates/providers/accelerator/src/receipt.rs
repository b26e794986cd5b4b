//! Transaction receipt types.
//!
//! Receipts arrive over JSON-RPC as an [`RpcReceipt`] and are handed to callers as a
//! [`TransactionReceipt`], which additionally carries the number of confirmations observed
//! at fetch time. The serde representation of [`TransactionReceipt`] is the persisted
//! shape of the receipt cache.

use alloy_primitives::{Address, B256, Bloom, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A log emitted by a transaction. Carried opaquely inside receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLog {
    /// The emitting contract.
    pub address: Address,
    /// The indexed topics.
    pub topics: Vec<B256>,
    /// The non-indexed data.
    pub data: Bytes,
    /// The hash of the block containing the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    /// The number of the block containing the log.
    #[serde(default, with = "alloy_serde::quantity::opt", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// The hash of the transaction that emitted the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    /// The index of the emitting transaction within its block.
    #[serde(default, with = "alloy_serde::quantity::opt", skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    /// The index of the log within its block.
    #[serde(default, with = "alloy_serde::quantity::opt", skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    /// Whether the log was removed by a reorg.
    #[serde(default)]
    pub removed: bool,
}

/// The wire shape of an `eth_getTransactionReceipt` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// The transaction hash.
    pub transaction_hash: B256,
    /// The index of the transaction within its block.
    #[serde(with = "alloy_serde::quantity")]
    pub transaction_index: u64,
    /// The hash of the containing block.
    #[serde(default)]
    pub block_hash: Option<B256>,
    /// The number of the containing block.
    #[serde(default, with = "alloy_serde::quantity::opt")]
    pub block_number: Option<u64>,
    /// The sender.
    pub from: Address,
    /// The recipient, absent for contract creations.
    #[serde(default)]
    pub to: Option<Address>,
    /// The created contract, if any.
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Gas used by this transaction alone.
    pub gas_used: U256,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: U256,
    /// The price paid per unit of gas.
    #[serde(default)]
    pub effective_gas_price: Option<U256>,
    /// Gas spent on L1 data posting. Only present on Arbitrum chains.
    #[serde(default, rename = "gasUsedForL1")]
    pub gas_used_for_l1: Option<U256>,
    /// The bloom filter of the receipt logs.
    pub logs_bloom: Bloom,
    /// The receipt logs.
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
    /// The execution status: `1` for success, `0` for failure. Absent before byzantium.
    #[serde(default, with = "alloy_serde::quantity::opt")]
    pub status: Option<u8>,
    /// The post-transaction state root. Only present before byzantium.
    #[serde(default)]
    pub root: Option<B256>,
    /// The EIP-2718 transaction type.
    #[serde(default, rename = "type", with = "alloy_serde::quantity::opt")]
    pub transaction_type: Option<u8>,
}

/// A transaction receipt as handed to callers.
///
/// Serializes to the persisted cache shape: camelCase keys, plain JSON numbers for small
/// integers, and every big-integer field tagged as
/// `{ "_type": "BigNumber", "_data": "<decimal>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// The transaction hash.
    pub transaction_hash: B256,
    /// The index of the transaction within its block.
    pub transaction_index: u64,
    /// The hash of the containing block.
    #[serde(default)]
    pub block_hash: Option<B256>,
    /// The number of the containing block.
    #[serde(default)]
    pub block_number: Option<u64>,
    /// The sender.
    pub from: Address,
    /// The recipient, absent for contract creations.
    #[serde(default)]
    pub to: Option<Address>,
    /// The created contract, if any.
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Gas used by this transaction alone.
    #[serde(with = "big_number")]
    pub gas_used: U256,
    /// Gas used by the block up to and including this transaction.
    #[serde(with = "big_number")]
    pub cumulative_gas_used: U256,
    /// The price paid per unit of gas.
    #[serde(default, with = "big_number::opt", skip_serializing_if = "Option::is_none")]
    pub effective_gas_price: Option<U256>,
    /// Gas spent on L1 data posting. Only present on Arbitrum chains.
    #[serde(
        default,
        rename = "gasUsedForL1",
        with = "big_number::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub gas_used_for_l1: Option<U256>,
    /// The bloom filter of the receipt logs.
    pub logs_bloom: Bloom,
    /// The receipt logs.
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
    /// The execution status: `1` for success, `0` for failure. Absent before byzantium.
    #[serde(default)]
    pub status: Option<u8>,
    /// The post-transaction state root. Only present before byzantium.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<B256>,
    /// The EIP-2718 transaction type.
    #[serde(default, rename = "type")]
    pub transaction_type: Option<u8>,
    /// The number of blocks on top of, and including, the containing block when the
    /// receipt was fetched.
    pub confirmations: u64,
}

impl TransactionReceipt {
    /// Builds a [`TransactionReceipt`] from its wire shape, given the chain head observed
    /// alongside it.
    pub fn from_rpc(receipt: RpcReceipt, head: u64) -> Self {
        let confirmations = receipt.block_number.map_or(0, |number| confirmations(number, head));
        Self {
            transaction_hash: receipt.transaction_hash,
            transaction_index: receipt.transaction_index,
            block_hash: receipt.block_hash,
            block_number: receipt.block_number,
            from: receipt.from,
            to: receipt.to,
            contract_address: receipt.contract_address,
            gas_used: receipt.gas_used,
            cumulative_gas_used: receipt.cumulative_gas_used,
            effective_gas_price: receipt.effective_gas_price,
            gas_used_for_l1: receipt.gas_used_for_l1,
            logs_bloom: receipt.logs_bloom,
            logs: receipt.logs,
            status: receipt.status,
            root: receipt.root,
            transaction_type: receipt.transaction_type,
            confirmations,
        }
    }

    /// Returns true if the receipt reports a failed (reverted) execution.
    ///
    /// Receipts without a status field (pre-byzantium) are not considered failed.
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, Some(0))
    }
}

/// Returns the confirmation count of a block given the current head.
///
/// A block at the head has one confirmation. A head behind the block, as reported by a
/// lagging node, still counts the block itself.
pub const fn confirmations(block_number: u64, head: u64) -> u64 {
    head.saturating_sub(block_number) + 1
}

/// Serde helpers tagging [`U256`] values as `{ "_type": "BigNumber", "_data": "<decimal>" }`.
///
/// Decoding also accepts an untagged hex or decimal string, as written by older cache layouts.
pub mod big_number {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

    /// The type marker of a tagged big integer.
    pub const BIG_NUMBER_TYPE: &str = "BigNumber";

    #[derive(Serialize, Deserialize)]
    struct Tagged {
        #[serde(rename = "_type")]
        ty: String,
        #[serde(rename = "_data")]
        data: String,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Tagged(Tagged),
        Plain(String),
    }

    impl Encoded {
        fn into_value<E: Error>(self) -> Result<U256, E> {
            match self {
                Self::Plain(value) => value.parse().map_err(E::custom),
                Self::Tagged(Tagged { ty, .. }) if ty != BIG_NUMBER_TYPE => {
                    Err(E::custom(format!("unexpected big number type marker: {ty}")))
                }
                Self::Tagged(Tagged { data, .. }) => {
                    U256::from_str_radix(&data, 10).map_err(E::custom)
                }
            }
        }
    }

    /// Serializes a [`U256`] as a tagged big number.
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        Tagged { ty: BIG_NUMBER_TYPE.to_string(), data: value.to_string() }.serialize(serializer)
    }

    /// Deserializes a [`U256`] from a tagged big number.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        Encoded::deserialize(deserializer)?.into_value()
    }

    /// The same encoding for optional fields.
    pub mod opt {
        use super::Encoded;
        use alloy_primitives::U256;
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serializes an optional [`U256`] as a tagged big number or `null`.
        pub fn serialize<S: Serializer>(
            value: &Option<U256>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes an optional [`U256`] from a tagged big number or `null`.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<U256>, D::Error> {
            Option::<Encoded>::deserialize(deserializer)?.map(Encoded::into_value).transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{receipt_json, sample_receipt};
    use alloy_primitives::b256;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_rpc_receipt_decodes_wire_shape() {
        let hash = b256!("0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b");
        let rpc: RpcReceipt = serde_json::from_value(receipt_json(hash, 0x10, 1)).unwrap();
        assert_eq!(rpc.transaction_hash, hash);
        assert_eq!(rpc.block_number, Some(0x10));
        assert_eq!(rpc.status, Some(1));
        assert_eq!(rpc.gas_used, U256::from(0x5208));
        assert_eq!(rpc.transaction_type, Some(2));
        assert_eq!(rpc.logs.len(), 1);
        assert_eq!(rpc.logs[0].log_index, Some(0));
    }

    #[test]
    fn test_confirmations_from_head() {
        assert_eq!(confirmations(100, 100), 1);
        assert_eq!(confirmations(100, 164), 65);
        assert_eq!(confirmations(100, 90), 1);

        let hash = B256::repeat_byte(0x11);
        let rpc: RpcReceipt = serde_json::from_value(receipt_json(hash, 100, 1)).unwrap();
        assert_eq!(TransactionReceipt::from_rpc(rpc.clone(), 104).confirmations, 5);

        let pending = RpcReceipt { block_number: None, ..rpc };
        assert_eq!(TransactionReceipt::from_rpc(pending, 104).confirmations, 0);
    }

    #[test]
    fn test_is_failed() {
        let mut receipt = sample_receipt(B256::ZERO, 1, 1);
        assert!(!receipt.is_failed());
        receipt.status = Some(0);
        assert!(receipt.is_failed());
        receipt.status = None;
        assert!(!receipt.is_failed());
    }

    #[test]
    fn test_persisted_shape_tags_big_numbers() {
        let mut receipt = sample_receipt(B256::repeat_byte(0x22), 10, 1);
        receipt.gas_used = U256::from(21_000);
        receipt.effective_gas_price = Some(U256::from(1_000_000_000u64));
        receipt.gas_used_for_l1 = None;

        let value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(value["gasUsed"], json!({ "_type": "BigNumber", "_data": "21000" }));
        assert_eq!(
            value["effectiveGasPrice"],
            json!({ "_type": "BigNumber", "_data": "1000000000" })
        );
        assert!(value.get("gasUsedForL1").is_none());
        assert_eq!(value["confirmations"], json!(10));
        assert_eq!(value["status"], json!(1));
    }

    #[test]
    fn test_big_number_rejects_foreign_type_marker() {
        let mut value = serde_json::to_value(sample_receipt(B256::ZERO, 1, 1)).unwrap();
        value["gasUsed"] = json!({ "_type": "Decimal", "_data": "1" });
        assert!(serde_json::from_value::<TransactionReceipt>(value).is_err());
    }

    #[test]
    fn test_big_number_accepts_untagged_values() {
        let mut value = serde_json::to_value(sample_receipt(B256::ZERO, 1, 1)).unwrap();
        value["gasUsed"] = json!("0x5208");
        value["cumulativeGasUsed"] = json!("42000");
        let receipt: TransactionReceipt = serde_json::from_value(value).unwrap();
        assert_eq!(receipt.gas_used, U256::from(21_000));
        assert_eq!(receipt.cumulative_gas_used, U256::from(42_000));
    }

    proptest! {
        #[test]
        fn test_big_number_fields_survive_persistence(
            gas_used in any::<[u64; 4]>(),
            cumulative in any::<[u64; 4]>(),
            price in proptest::option::of(any::<[u64; 4]>()),
            l1 in proptest::option::of(any::<[u64; 4]>()),
        ) {
            let mut receipt = sample_receipt(B256::repeat_byte(0x33), 7, 1);
            receipt.gas_used = U256::from_limbs(gas_used);
            receipt.cumulative_gas_used = U256::from_limbs(cumulative);
            receipt.effective_gas_price = price.map(U256::from_limbs);
            receipt.gas_used_for_l1 = l1.map(U256::from_limbs);

            let encoded = serde_json::to_string(&receipt).unwrap();
            let decoded: TransactionReceipt = serde_json::from_str(&encoded).unwrap();
            prop_assert_eq!(decoded, receipt);
        }
    }
}
