//! Descriptor store: enrolled identities persisted as one JSON array.
//!
//! Every mutation runs load → modify → write → reload against the
//! key-value backend. The in-memory cache is always re-derived from the
//! persisted copy after a write, so records written by another handle
//! on the same backend are picked up by the next mutation.

use crate::kv::{KeyValueStore, KvError};
use crate::types::{Descriptor, DimensionMismatch, Identity};
use thiserror::Error;

/// Key under which the identity array is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "face-auth-users";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identity name must not be empty")]
    EmptyName,
    #[error("descriptor must not be empty")]
    EmptyDescriptor,
    #[error("descriptor contains non-finite values")]
    NonFiniteDescriptor,
    #[error(transparent)]
    Dimension(#[from] DimensionMismatch),
    #[error("no identity at position {0}")]
    NotFound(usize),
    #[error("persistence failed: {0}")]
    Persistence(#[from] KvError),
    #[error("malformed identity data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("identity at position {0} has an empty name")]
    UnnamedRecord(usize),
}

pub struct DescriptorStore {
    kv: Box<dyn KeyValueStore>,
    key: String,
    cache: Vec<Identity>,
}

impl DescriptorStore {
    /// Open the store under [`DEFAULT_STORAGE_KEY`] and load the cache.
    pub fn open(kv: Box<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(kv: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let mut store = Self {
            kv,
            key: key.into(),
            cache: Vec::new(),
        };
        store.refresh();
        tracing::info!(key = %store.key, count = store.cache.len(), "loaded enrolled identities");
        store
    }

    /// Read the persisted identities.
    ///
    /// Never fails: unreadable or malformed data is logged and treated as
    /// an empty store.
    pub fn load(&self) -> Vec<Identity> {
        match self.read() {
            Ok(identities) => identities,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "failed to load enrolled identities; starting empty");
                Vec::new()
            }
        }
    }

    /// Cached identities in enrollment order.
    pub fn identities(&self) -> &[Identity] {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Descriptor length shared by every enrolled identity, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.cache.first().map(|i| i.descriptor.len())
    }

    /// Re-derive the cache from persisted state.
    pub fn refresh(&mut self) {
        self.cache = self.load();
    }

    /// Persist a new identity and refresh the cache.
    ///
    /// If the persisted data is malformed it is replaced by a fresh array
    /// holding only the new record.
    pub fn append(&mut self, name: &str, descriptor: Descriptor) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }
        if descriptor.is_empty() {
            return Err(StoreError::EmptyDescriptor);
        }
        // JSON has no NaN; it would come back as null and poison the array.
        if descriptor.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(StoreError::NonFiniteDescriptor);
        }

        let mut records = self.load();
        if let Some(first) = records.first() {
            if first.descriptor.len() != descriptor.len() {
                return Err(DimensionMismatch {
                    expected: first.descriptor.len(),
                    actual: descriptor.len(),
                }
                .into());
            }
        }

        records.push(Identity::new(name, descriptor));
        self.write(&records)?;
        self.refresh();

        tracing::info!(name, count = self.cache.len(), "identity enrolled");
        Ok(())
    }

    /// Remove the identity at `position` (enrollment order) and refresh.
    pub fn remove(&mut self, position: usize) -> Result<Identity, StoreError> {
        let mut records = self.load();
        if position >= records.len() {
            return Err(StoreError::NotFound(position));
        }
        let removed = records.remove(position);
        self.write(&records)?;
        self.refresh();

        tracing::info!(name = %removed.name, position, "identity removed");
        Ok(removed)
    }

    /// Drop every enrolled identity.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.kv.remove(&self.key)?;
        self.refresh();
        tracing::info!(key = %self.key, "enrolled identities cleared");
        Ok(())
    }

    fn read(&self) -> Result<Vec<Identity>, StoreError> {
        let Some(raw) = self.kv.get(&self.key)? else {
            return Ok(Vec::new());
        };
        let identities: Vec<Identity> = serde_json::from_str(&raw)?;
        validate(&identities)?;
        Ok(identities)
    }

    fn write(&mut self, records: &[Identity]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)?;
        self.kv.set(&self.key, &raw)?;
        Ok(())
    }
}

/// Stored records must be named and share one descriptor length.
fn validate(identities: &[Identity]) -> Result<(), StoreError> {
    let Some(first) = identities.first() else {
        return Ok(());
    };
    let expected = first.descriptor.len();
    for (i, identity) in identities.iter().enumerate() {
        if identity.name.trim().is_empty() {
            return Err(StoreError::UnnamedRecord(i));
        }
        if identity.descriptor.len() != expected {
            return Err(DimensionMismatch {
                expected,
                actual: identity.descriptor.len(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{MemoryKv, SqliteKv};

    fn descriptor(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[test]
    fn test_open_empty_backend() {
        let store = DescriptorStore::open(Box::new(MemoryKv::new()));
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn test_append_then_load_roundtrip() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        store.append("Alice", descriptor(&[0.1, 0.2, 0.3])).unwrap();
        let before = store.load().len();

        let d = descriptor(&[0.4, 0.5, 0.6]);
        store.append("Bob", d.clone()).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), before + 1);
        let last = loaded.last().unwrap();
        assert_eq!(last.name, "Bob");
        assert!(last.descriptor.approx_eq(&d, 1e-6));
        assert_eq!(store.identities(), loaded.as_slice());
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        store.append("Alice", descriptor(&[0.1, 0.2])).unwrap();
        store.append("Alice", descriptor(&[0.2, 0.1])).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.identities().iter().all(|i| i.name == "Alice"));
    }

    #[test]
    fn test_malformed_data_loads_empty() {
        let mut kv = MemoryKv::new();
        kv.set(DEFAULT_STORAGE_KEY, "{not json").unwrap();
        let store = DescriptorStore::open(Box::new(kv));
        assert!(store.is_empty());
    }

    #[test]
    fn test_mixed_dimensions_load_empty() {
        let mut kv = MemoryKv::new();
        kv.set(
            DEFAULT_STORAGE_KEY,
            r#"[{"name":"a","descriptor":[0.1,0.2]},{"name":"b","descriptor":[0.1]}]"#,
        )
        .unwrap();
        let store = DescriptorStore::open(Box::new(kv));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unnamed_record_loads_empty() {
        let mut kv = MemoryKv::new();
        kv.set(DEFAULT_STORAGE_KEY, r#"[{"name":"  ","descriptor":[0.1]}]"#).unwrap();
        let store = DescriptorStore::open(Box::new(kv));
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_replaces_malformed_data() {
        let mut kv = MemoryKv::new();
        kv.set(DEFAULT_STORAGE_KEY, "garbage").unwrap();
        let mut store = DescriptorStore::open(Box::new(kv.clone()));

        store.append("Alice", descriptor(&[0.5])).unwrap();

        assert_eq!(store.len(), 1);
        let raw = kv.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"[{"name":"Alice","descriptor":[0.5]}]"#);
    }

    #[test]
    fn test_append_rejects_empty_name() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        let err = store.append("   ", descriptor(&[0.1])).unwrap_err();
        assert!(matches!(err, StoreError::EmptyName));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_append_rejects_empty_descriptor() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        let err = store.append("Alice", descriptor(&[])).unwrap_err();
        assert!(matches!(err, StoreError::EmptyDescriptor));
    }

    #[test]
    fn test_append_rejects_nan() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        let err = store.append("Alice", descriptor(&[0.1, f32::NAN])).unwrap_err();
        assert!(matches!(err, StoreError::NonFiniteDescriptor));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_append_rejects_dimension_mismatch() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        store.append("Alice", descriptor(&[0.1, 0.2])).unwrap();
        let err = store.append("Bob", descriptor(&[0.1, 0.2, 0.3])).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Dimension(DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_picks_up_external_writer() {
        let kv = MemoryKv::new();
        let mut tab_a = DescriptorStore::open(Box::new(kv.clone()));
        let mut tab_b = DescriptorStore::open(Box::new(kv));

        tab_b.append("Bob", descriptor(&[0.9, 0.9])).unwrap();
        // tab_a's cache is stale until its next mutation or refresh.
        assert!(tab_a.is_empty());

        tab_a.append("Alice", descriptor(&[0.1, 0.1])).unwrap();
        let names: Vec<_> = tab_a.identities().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Bob", "Alice"]);
    }

    #[test]
    fn test_remove_by_position() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        store.append("Alice", descriptor(&[0.1])).unwrap();
        store.append("Bob", descriptor(&[0.2])).unwrap();

        let removed = store.remove(0).unwrap();
        assert_eq!(removed.name, "Alice");
        assert_eq!(store.identities()[0].name, "Bob");
        assert!(matches!(store.remove(5), Err(StoreError::NotFound(5))));
    }

    #[test]
    fn test_clear() {
        let mut store = DescriptorStore::open(Box::new(MemoryKv::new()));
        store.append("Alice", descriptor(&[0.1])).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_sqlite_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.db");

        {
            let mut store = DescriptorStore::open(Box::new(SqliteKv::open(&path).unwrap()));
            store.append("Alice", descriptor(&[0.25, 0.75])).unwrap();
        }

        let store = DescriptorStore::open(Box::new(SqliteKv::open(&path).unwrap()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.identities()[0].name, "Alice");
        assert_eq!(store.dimension(), Some(2));
    }

    #[test]
    fn test_custom_key_is_isolated() {
        let kv = MemoryKv::new();
        let mut a = DescriptorStore::with_key(Box::new(kv.clone()), "site-a");
        let b = DescriptorStore::with_key(Box::new(kv), "site-b");
        a.append("Alice", descriptor(&[0.1])).unwrap();
        assert!(b.load().is_empty());
    }
}
