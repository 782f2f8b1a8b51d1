//! Application context shared by every workflow handler.

use std::sync::Arc;

use stockflow_bus::Bus;
use stockflow_core::Repository;

use crate::kind::InventoryKind;
use crate::model::{Article, Product};

/// A bus carrying inventory messages, usable from spawned handler tasks.
pub trait InventoryBus: Bus<InventoryKind> + 'static {}

impl<B> InventoryBus for B where B: Bus<InventoryKind> + 'static {}

/// Dependencies handed to handler factories.
///
/// Built once at startup and shared by `Arc`; handlers reach each other only
/// through `bus`.
pub struct AppContext<B> {
    bus: B,
    products: Arc<dyn Repository<Product>>,
    articles: Arc<dyn Repository<Article>>,
}

impl<B: InventoryBus> AppContext<B> {
    pub fn new(
        bus: B,
        products: Arc<dyn Repository<Product>>,
        articles: Arc<dyn Repository<Article>>,
    ) -> Self {
        Self {
            bus,
            products,
            articles,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn products(&self) -> &dyn Repository<Product> {
        self.products.as_ref()
    }

    pub fn articles(&self) -> &dyn Repository<Article> {
        self.articles.as_ref()
    }
}

impl<B> core::fmt::Debug for AppContext<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}
