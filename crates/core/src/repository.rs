//! Storage contract consumed by the workflow handlers.
//!
//! Physical persistence is an infrastructure concern; domain code only sees
//! this trait. Implementations live in `stockflow-infra`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RepositoryError;

/// Keyed store for one resource kind (articles, products, ...).
///
/// - Reads return **independent copies**: mutating a returned value does not
///   touch stored state until `set` is called again.
/// - Writes are all-or-nothing.
/// - Last write wins; there is no version check.
#[async_trait]
pub trait Repository<T>: Send + Sync {
    async fn set(&self, key: &str, value: T) -> Result<(), RepositoryError>;

    async fn get(&self, key: &str) -> Result<Option<T>, RepositoryError>;

    /// All stored values, in no particular order.
    async fn all(&self) -> Result<Vec<T>, RepositoryError>;

    async fn delete(&self, key: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<T, R> Repository<T> for Arc<R>
where
    T: Send + 'static,
    R: Repository<T> + ?Sized,
{
    async fn set(&self, key: &str, value: T) -> Result<(), RepositoryError> {
        (**self).set(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        (**self).get(key).await
    }

    async fn all(&self) -> Result<Vec<T>, RepositoryError> {
        (**self).all().await
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        (**self).delete(key).await
    }
}
