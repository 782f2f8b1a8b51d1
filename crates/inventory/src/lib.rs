//! Inventory workflow: products assembled from stocked articles.
//!
//! Handlers never call each other; the sale cascade runs entirely over the
//! bus:
//!
//! ```text
//! SellProduct ──► ProductSold ──► (adjust inventory) ──► RecalculateProductsAvailability
//!      └──► SellProductFailed                                   └──► RecalculateProductsAvailabilityFailed
//! ```

pub mod availability;
pub mod catalog;
pub mod context;
pub mod error;
pub mod kind;
pub mod model;
pub mod sales;
pub mod workflow;

pub use availability::{
    ArticleStock, RecalculateAllProductsAvailability, RecalculateProductsAvailability,
    RecalculateProductsAvailabilityFailed, available_amount,
};
pub use catalog::{GetAllAvailableProducts, is_available_product};
pub use context::{AppContext, InventoryBus};
pub use error::{FailureReason, WorkflowError};
pub use kind::InventoryKind;
pub use model::{Article, ArticleAmount, Product};
pub use sales::{ProductSold, SellProduct, SellProductFailed};
pub use workflow::register;
