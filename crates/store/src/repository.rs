use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// A value that lives in a named collection under a string key.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name. Distinct record types must use distinct names.
    const COLLECTION: &'static str;

    /// Stable primary key within the collection.
    fn key(&self) -> String;
}

/// get/put/delete over one typed collection.
///
/// `put` is an upsert. `list` returns records ordered by key.
pub trait Repository<T: Record>: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<T>, StoreError>;

    fn put(&self, record: &T) -> Result<(), StoreError>;

    /// Returns `true` if a record was removed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    fn list(&self) -> Result<Vec<T>, StoreError>;

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.list()?.len())
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn put_all(&self, records: &[T]) -> Result<(), StoreError> {
        for r in records {
            self.put(r)?;
        }
        Ok(())
    }

    /// Make the collection hold exactly `records`. Returns how many stored
    /// keys were absent from `records` and so removed.
    ///
    /// The default is not atomic; both bundled backends override it.
    fn replace_all(&self, records: &[T]) -> Result<usize, StoreError> {
        let incoming: HashSet<String> = records.iter().map(|r| r.key()).collect();
        let mut removed = 0;
        for stored in self.list()? {
            let key = stored.key();
            if !incoming.contains(&key) && self.delete(&key)? {
                removed += 1;
            }
        }
        self.put_all(records)?;
        Ok(removed)
    }
}
