//! In-process [`Repository`] backend.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockflow_core::{Repository, RepositoryError};

/// Key/value store held in memory, for development and tests.
///
/// Keys iterate in sorted order, so `all()` is deterministic. Values are
/// cloned in and out: callers never share state with the store.
#[derive(Debug)]
pub struct InMemoryRepository<T> {
    resource: &'static str,
    inner: RwLock<BTreeMap<String, T>>,
}

impl<T> InMemoryRepository<T> {
    /// `resource` names the store in errors (e.g. `"products"`).
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    fn poisoned(&self) -> RepositoryError {
        RepositoryError::Poisoned {
            resource: self.resource,
        }
    }
}

#[async_trait]
impl<T> Repository<T> for InMemoryRepository<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &str, value: T) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| self.poisoned())?;
        map.insert(key.to_owned(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let map = self.inner.read().map_err(|_| self.poisoned())?;
        Ok(map.get(key).cloned())
    }

    async fn all(&self) -> Result<Vec<T>, RepositoryError> {
        let map = self.inner.read().map_err(|_| self.poisoned())?;
        Ok(map.values().cloned().collect())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| self.poisoned())?;
        map.remove(key);
        Ok(())
    }
}
