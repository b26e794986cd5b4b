//! The persistent receipt cache.
//!
//! The whole cache is one JSON object stored under a single key:
//!
//! ```json
//! { "<chain id>": { "<tx hash>": <TransactionReceipt> } }
//! ```
//!
//! Every write reads the current object, merges the new receipt into it and writes the
//! whole object back in one [`KeyValueStore::update`], so caches sharing a store never
//! drop each other's entries. Entries are never evicted.

use crate::{CacheError, KeyValueStore, TransactionReceipt};
use alloy_primitives::{B256, hex};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// The decoded contents of the receipt cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedReceipts {
    chains: BTreeMap<String, BTreeMap<String, TransactionReceipt>>,
}

impl CachedReceipts {
    /// Decodes the persisted cache object.
    ///
    /// Every record of every chain is decoded. A record that fails to decode is dropped
    /// with a warning; the remaining records are kept.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(raw)?;
        let mut chains = BTreeMap::new();
        for (chain, records) in raw {
            let mut decoded = BTreeMap::new();
            for (hash, record) in records {
                match serde_json::from_value::<TransactionReceipt>(record) {
                    Ok(receipt) => {
                        decoded.insert(hash, receipt);
                    }
                    Err(err) => {
                        warn!(
                            target: "accelerator::cache",
                            chain = %chain,
                            hash = %hash,
                            %err,
                            "Dropping undecodable cached receipt"
                        );
                    }
                }
            }
            chains.insert(chain, decoded);
        }
        Ok(Self { chains })
    }

    /// Encodes the cache into its persisted JSON form.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.chains)
    }

    /// Returns the receipt cached for the given chain and transaction hash.
    pub fn get(&self, chain_id: u64, hash: &B256) -> Option<&TransactionReceipt> {
        self.chains.get(&chain_key(chain_id))?.get(&hash_key(hash))
    }

    /// Inserts a receipt, overwriting any previous entry for the same transaction.
    pub fn insert(&mut self, chain_id: u64, receipt: TransactionReceipt) {
        self.chains
            .entry(chain_key(chain_id))
            .or_default()
            .insert(hash_key(&receipt.transaction_hash), receipt);
    }

    /// Returns the total number of cached receipts.
    pub fn len(&self) -> usize {
        self.chains.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no receipts are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of cached receipts per chain, keyed by the chain as stored.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.chains.iter().map(|(chain, records)| (chain.clone(), records.len())).collect()
    }
}

fn chain_key(chain_id: u64) -> String {
    chain_id.to_string()
}

fn hash_key(hash: &B256) -> String {
    hex::encode_prefixed(hash)
}

/// A receipt cache persisted in a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct ReceiptCache {
    store: Option<Arc<dyn KeyValueStore>>,
    key: String,
}

impl ReceiptCache {
    /// Creates a [`ReceiptCache`] persisted under `key`.
    ///
    /// A `None` store yields a cache that never hits and silently discards writes.
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    /// Returns true if the cache has a backing store.
    pub const fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the storage key of the cache.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the full cache.
    ///
    /// Never fails: a missing store, an absent key, a storage read error or malformed
    /// contents all yield an empty cache.
    pub fn load(&self) -> CachedReceipts {
        let Some(store) = &self.store else {
            return CachedReceipts::default();
        };
        let raw = match store.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return CachedReceipts::default(),
            Err(err) => {
                warn!(
                    target: "accelerator::cache",
                    key = %self.key,
                    %err,
                    "Failed to read receipt cache"
                );
                return CachedReceipts::default();
            }
        };
        self.decode_lossy(&raw)
    }

    /// Decodes `raw`, treating malformed contents as an empty cache.
    fn decode_lossy(&self, raw: &str) -> CachedReceipts {
        CachedReceipts::decode(raw).unwrap_or_else(|err| {
            warn!(
                target: "accelerator::cache",
                key = %self.key,
                %err,
                "Malformed receipt cache, treating as empty"
            );
            CachedReceipts::default()
        })
    }

    /// Returns the cached receipt for the given chain and transaction hash, if any.
    pub fn get(&self, chain_id: u64, hash: &B256) -> Option<TransactionReceipt> {
        self.load().get(chain_id, hash).cloned()
    }

    /// Returns the number of cached receipts per chain.
    pub fn stats(&self) -> BTreeMap<String, usize> {
        self.load().counts()
    }

    /// Persists a receipt, merging it into the receipts already cached for every chain.
    ///
    /// The merge runs inside a single store update. If the current contents cannot be read
    /// the write is abandoned and the stored cache is left as is.
    pub fn insert(&self, chain_id: u64, receipt: TransactionReceipt) -> Result<(), CacheError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let mut receipt = Some(receipt);
        let mut encode_error = None;
        store.update(&self.key, &mut |current| {
            let mut cached = current.map(|raw| self.decode_lossy(&raw)).unwrap_or_default();
            cached.insert(chain_id, receipt.take()?);
            cached.encode().map_err(|err| encode_error = Some(err)).ok()
        })?;
        encode_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Removes the persisted cache entirely.
    pub fn clear(&self) -> Result<(), CacheError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.remove_item(&self.key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, StorageError, test_utils::sample_receipt};
    use alloy_primitives::U256;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    fn memory_cache() -> (Arc<MemoryStore>, ReceiptCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = ReceiptCache::new(Some(store.clone() as Arc<dyn KeyValueStore>), "test:cache");
        (store, cache)
    }

    #[derive(Debug)]
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("read".to_string()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("remove".to_string()))
        }

        fn update(
            &self,
            _key: &str,
            _f: &mut dyn FnMut(Option<String>) -> Option<String>,
        ) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read".to_string()))
        }
    }

    /// A [`MemoryStore`] that stalls inside every update and can fail the next read.
    #[derive(Debug, Default)]
    struct SlowStore {
        inner: MemoryStore,
        fail_next_read: AtomicBool,
    }

    impl SlowStore {
        fn check_read(&self) -> Result<(), StorageError> {
            if self.fail_next_read.swap(false, Ordering::SeqCst) {
                return Err(StorageError::Unavailable("read timed out".to_string()));
            }
            Ok(())
        }
    }

    impl KeyValueStore for SlowStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.check_read()?;
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }

        fn update(
            &self,
            key: &str,
            f: &mut dyn FnMut(Option<String>) -> Option<String>,
        ) -> Result<(), StorageError> {
            self.check_read()?;
            self.inner.update(key, &mut |current| {
                std::thread::sleep(Duration::from_millis(20));
                f(current)
            })
        }
    }

    #[test]
    fn test_insert_and_get() {
        let (_, cache) = memory_cache();
        let hash = B256::repeat_byte(0xaa);
        assert_eq!(cache.get(1, &hash), None);

        let receipt = sample_receipt(hash, 70, 1);
        cache.insert(1, receipt.clone()).unwrap();
        assert_eq!(cache.get(1, &hash), Some(receipt));
        assert_eq!(cache.get(10, &hash), None);
    }

    #[test]
    fn test_insert_merges_across_chains() {
        let (_, cache) = memory_cache();
        let a = sample_receipt(B256::repeat_byte(0x01), 70, 1);
        let b = sample_receipt(B256::repeat_byte(0x02), 70, 1);
        let c = sample_receipt(B256::repeat_byte(0x03), 70, 1);

        cache.insert(1, a.clone()).unwrap();
        cache.insert(1, b.clone()).unwrap();
        cache.insert(421614, c.clone()).unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(1, &a.transaction_hash), Some(&a));
        assert_eq!(loaded.get(1, &b.transaction_hash), Some(&b));
        assert_eq!(loaded.get(421614, &c.transaction_hash), Some(&c));
        assert_eq!(loaded.counts().get("1"), Some(&2));
        assert_eq!(
            cache.stats(),
            BTreeMap::from([("1".to_string(), 2), ("421614".to_string(), 1)])
        );
    }

    #[test]
    fn test_insert_overwrites_whole_entry() {
        let (_, cache) = memory_cache();
        let hash = B256::repeat_byte(0x04);
        cache.insert(1, sample_receipt(hash, 65, 1)).unwrap();
        cache.insert(1, sample_receipt(hash, 90, 1)).unwrap();
        assert_eq!(cache.get(1, &hash).map(|r| r.confirmations), Some(90));
        assert_eq!(cache.load().len(), 1);
    }

    #[test]
    fn test_persisted_layout() {
        let (store, cache) = memory_cache();
        let hash = B256::repeat_byte(0x05);
        let mut receipt = sample_receipt(hash, 70, 1);
        receipt.gas_used = U256::from(123_456u64);
        cache.insert(42161, receipt).unwrap();

        let raw = store.get_item("test:cache").unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        let record = &value["42161"][hex::encode_prefixed(hash)];
        assert_eq!(record["gasUsed"]["_type"], "BigNumber");
        assert_eq!(record["gasUsed"]["_data"], "123456");
    }

    #[test]
    fn test_malformed_store_is_empty() {
        let (store, cache) = memory_cache();
        store.set_item("test:cache", "{not json").unwrap();
        assert!(cache.load().is_empty());

        store.set_item("test:cache", "[1, 2, 3]").unwrap();
        assert!(cache.load().is_empty());

        // A write replaces the unreadable blob.
        let receipt = sample_receipt(B256::repeat_byte(0x06), 70, 1);
        cache.insert(1, receipt.clone()).unwrap();
        assert_eq!(cache.get(1, &receipt.transaction_hash), Some(receipt));
    }

    #[test]
    fn test_undecodable_record_is_dropped() {
        let (store, cache) = memory_cache();
        let good = sample_receipt(B256::repeat_byte(0x07), 70, 1);
        let mut raw: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        let chain = raw.entry("1".to_string()).or_default();
        chain.insert(
            hex::encode_prefixed(good.transaction_hash),
            serde_json::to_value(&good).unwrap(),
        );
        chain.insert(
            hex::encode_prefixed(B256::repeat_byte(0x08)),
            serde_json::json!({ "bogus": true }),
        );
        store.set_item("test:cache", &serde_json::to_string(&raw).unwrap()).unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(1, &good.transaction_hash), Some(&good));
    }

    #[test]
    fn test_without_store() {
        let cache = ReceiptCache::new(None, "test:cache");
        let receipt = sample_receipt(B256::repeat_byte(0x09), 70, 1);
        assert!(!cache.is_persistent());
        cache.insert(1, receipt.clone()).unwrap();
        assert_eq!(cache.get(1, &receipt.transaction_hash), None);
        cache.clear().unwrap();
    }

    #[test]
    fn test_broken_store() {
        let cache = ReceiptCache::new(Some(Arc::new(BrokenStore)), "test:cache");
        let receipt = sample_receipt(B256::repeat_byte(0x0a), 70, 1);
        assert!(cache.load().is_empty());
        assert!(matches!(cache.insert(1, receipt), Err(CacheError::Storage(_))));
    }

    #[test]
    fn test_clear() {
        let (store, cache) = memory_cache();
        cache.insert(1, sample_receipt(B256::repeat_byte(0x0b), 70, 1)).unwrap();
        assert!(store.contains_key("test:cache"));
        cache.clear().unwrap();
        assert!(!store.contains_key("test:cache"));
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_caches_sharing_a_store_keep_each_others_entries() {
        let store = Arc::new(SlowStore::default());
        let mainnet = ReceiptCache::new(Some(store.clone()), "test:cache");
        let rollup = ReceiptCache::new(Some(store.clone()), "test:cache");
        let a = sample_receipt(B256::repeat_byte(0x0c), 70, 1);
        let b = sample_receipt(B256::repeat_byte(0x0d), 10, 1);

        std::thread::scope(|scope| {
            scope.spawn(|| mainnet.insert(1, a.clone()).unwrap());
            scope.spawn(|| rollup.insert(421614, b.clone()).unwrap());
        });

        let loaded = mainnet.load();
        assert_eq!(loaded.get(1, &a.transaction_hash), Some(&a));
        assert_eq!(loaded.get(421614, &b.transaction_hash), Some(&b));
        assert_eq!(
            rollup.stats(),
            BTreeMap::from([("1".to_string(), 1), ("421614".to_string(), 1)])
        );
    }

    #[test]
    fn test_insert_after_failed_read_keeps_stored_receipts() {
        let store = Arc::new(SlowStore::default());
        let cache = ReceiptCache::new(Some(store.clone()), "test:cache");
        cache.insert(1, sample_receipt(B256::repeat_byte(0x0e), 70, 1)).unwrap();
        cache.insert(42161, sample_receipt(B256::repeat_byte(0x0f), 70, 1)).unwrap();
        let before = cache.stats();

        store.fail_next_read.store(true, Ordering::SeqCst);
        let result = cache.insert(10, sample_receipt(B256::repeat_byte(0x10), 70, 1));

        assert!(matches!(result, Err(CacheError::Storage(StorageError::Unavailable(_)))));
        assert_eq!(cache.stats(), before);
        assert_eq!(before.len(), 2);
    }
}
