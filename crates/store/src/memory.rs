use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::repository::{Record, Repository};

/// Process-local repository. Contents are lost on drop.
pub struct MemoryRepository<T> {
    records: RwLock<BTreeMap<String, T>>,
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let map = records.into_iter().map(|r| (r.key(), r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Poisoning is ignored: a map left by a panicking writer is still well-formed.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

impl<T: Record> Repository<T> for MemoryRepository<T> {
    fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(read(&self.records).get(key).cloned())
    }

    fn put(&self, record: &T) -> Result<(), StoreError> {
        write(&self.records).insert(record.key(), record.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(write(&self.records).remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<T>, StoreError> {
        Ok(read(&self.records).values().cloned().collect())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(read(&self.records).len())
    }

    fn replace_all(&self, records: &[T]) -> Result<usize, StoreError> {
        let next: BTreeMap<String, T> = records.iter().map(|r| (r.key(), r.clone())).collect();
        let mut map = write(&self.records);
        let removed = map.keys().filter(|k| !next.contains_key(*k)).count();
        *map = next;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Broker {
        id: String,
        name: String,
    }

    impl Record for Broker {
        const COLLECTION: &'static str = "brokers";
        fn key(&self) -> String {
            self.id.clone()
        }
    }

    fn broker(id: &str, name: &str) -> Broker {
        Broker { id: id.into(), name: name.into() }
    }

    #[test]
    fn put_get_delete() {
        let repo = MemoryRepository::new();
        repo.put(&broker("b1", "Alpha")).unwrap();
        assert_eq!(repo.get("b1").unwrap(), Some(broker("b1", "Alpha")));
        assert!(repo.delete("b1").unwrap());
        assert!(!repo.delete("b1").unwrap());
        assert_eq!(repo.get("b1").unwrap(), None);
    }

    #[test]
    fn put_is_upsert() {
        let repo = MemoryRepository::new();
        repo.put(&broker("b1", "Alpha")).unwrap();
        repo.put(&broker("b1", "Beta")).unwrap();
        assert_eq!(repo.len().unwrap(), 1);
        assert_eq!(repo.get("b1").unwrap().unwrap().name, "Beta");
    }

    #[test]
    fn list_is_key_ordered() {
        let repo = MemoryRepository::with_records(vec![
            broker("c", "C"),
            broker("a", "A"),
            broker("b", "B"),
        ]);
        let keys: Vec<String> = repo.list().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn usable_as_trait_object() {
        let repo: Box<dyn Repository<Broker>> = Box::new(MemoryRepository::new());
        assert!(repo.is_empty().unwrap());
        repo.put_all(&[broker("x", "X"), broker("y", "Y")]).unwrap();
        assert_eq!(repo.len().unwrap(), 2);
    }

    #[test]
    fn replace_all_drops_absent_keys() {
        let repo = MemoryRepository::with_records(vec![broker("a", "A"), broker("b", "B")]);
        let removed = repo.replace_all(&[broker("b", "B2"), broker("c", "C")]).unwrap();
        assert_eq!(removed, 1);
        let keys: Vec<String> = repo.list().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert_eq!(repo.get("b").unwrap().unwrap().name, "B2");
    }
}
