//! Domain foundation building blocks.
//!
//! Identifiers, errors, value objects and the storage contract. No IO lives
//! here.

pub mod error;
pub mod id;
pub mod repository;
pub mod value_object;

pub use error::{DomainError, DomainResult, RepositoryError};
pub use id::{ArticleId, ProductId};
pub use repository::Repository;
pub use value_object::{Money, ValueObject};
