use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockflow_core::{ArticleId, ProductId, RepositoryError};

/// Business failure inside a workflow handler.
///
/// Never returned to the bus: handlers turn it into a failure event.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("product {0} not found")]
    NotFoundProduct(ProductId),

    #[error("product {product_id} has {available} available, {requested} requested")]
    NotEnoughProductAmount {
        product_id: ProductId,
        available: i64,
        requested: u32,
    },

    #[error("product {0} not found for recalculation")]
    NotFound(ProductId),

    #[error("product {product_id} references missing articles {missing:?}")]
    ArticlesIncomplete {
        product_id: ProductId,
        missing: Vec<ArticleId>,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError {
    pub fn reason(&self) -> FailureReason {
        match self {
            WorkflowError::NotFoundProduct(_) => FailureReason::NotFoundProduct,
            WorkflowError::NotEnoughProductAmount { .. } => FailureReason::NotEnoughProductAmount,
            WorkflowError::NotFound(_) => FailureReason::NotFound,
            WorkflowError::ArticlesIncomplete { .. } => FailureReason::ArticlesIncomplete,
            WorkflowError::Repository(_) => FailureReason::Storage,
        }
    }
}

/// Machine-readable reason carried by failure events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    NotFoundProduct,
    NotEnoughProductAmount,
    NotFound,
    ArticlesIncomplete,
    Storage,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::NotFoundProduct => "NOT_FOUND_PRODUCT",
            FailureReason::NotEnoughProductAmount => "NOT_ENOUGH_PRODUCT_AMOUNT",
            FailureReason::NotFound => "NOT_FOUND",
            FailureReason::ArticlesIncomplete => "ARTICLES_INCOMPLETE",
            FailureReason::Storage => "STORAGE",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
