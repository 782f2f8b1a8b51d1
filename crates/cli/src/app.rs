//! Process bootstrap: bus, repositories, handlers, and the initial catalog.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

use stockflow_bus::{Bus, HandlerError, InMemoryBus, LoggingBus, Subscription};
use stockflow_core::{ProductId, Repository};
use stockflow_infra::{AppConfig, InMemoryRepository, initialize_from_dir};
use stockflow_inventory::{
    AppContext, Article, GetAllAvailableProducts, InventoryKind, Product,
    RecalculateAllProductsAvailability, SellProduct, SellProductFailed,
};

pub type AppBus = LoggingBus<InMemoryBus<InventoryKind>>;

/// A wired application, ready to serve operations.
pub struct App {
    context: Arc<AppContext<AppBus>>,
    _subscriptions: Vec<Subscription<InventoryKind>>,
}

/// Result of [`App::sell`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaleOutcome {
    Sold { product: Product },
    Rejected { failure: SellProductFailed },
}

/// Build the application for `config`.
///
/// In development the catalog is seeded from `config.data_dir` and every
/// product's availability is computed before this returns.
pub async fn bootstrap(config: &AppConfig) -> anyhow::Result<App> {
    let bus: AppBus = LoggingBus::new(InMemoryBus::new(Handle::current()));
    let products: Arc<dyn Repository<Product>> = Arc::new(InMemoryRepository::new("products"));
    let articles: Arc<dyn Repository<Article>> = Arc::new(InMemoryRepository::new("articles"));
    let context = Arc::new(AppContext::new(bus, products, articles));
    let subscriptions = stockflow_inventory::register(&context);

    if config.environment.is_development() {
        let summary = initialize_from_dir(&config.data_dir, context.products(), context.articles())
            .await
            .with_context(|| format!("seeding from {}", config.data_dir.display()))?;
        context
            .bus()
            .tell(RecalculateAllProductsAvailability)
            .context("scheduling the initial recalculation")?;
        context.bus().idle().await;
        info!(products = summary.product_ids.len(), "catalog ready");
    }

    Ok(App {
        context,
        _subscriptions: subscriptions,
    })
}

impl App {
    pub fn context(&self) -> &AppContext<AppBus> {
        &self.context
    }

    pub async fn articles(&self) -> anyhow::Result<Vec<Article>> {
        Ok(self.context.articles().all().await?)
    }

    pub async fn products(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.context.products().all().await?)
    }

    pub async fn available(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.context.bus().ask(GetAllAvailableProducts).await?)
    }

    /// Find a product by id, or else by exact name.
    pub async fn resolve(&self, selector: &str) -> anyhow::Result<ProductId> {
        if let Some(product) = self.context.products().get(selector).await? {
            return Ok(product.product_id);
        }
        self.products()
            .await?
            .into_iter()
            .find(|product| product.name == selector)
            .map(|product| product.product_id)
            .ok_or_else(|| anyhow!("no product with id or name {selector:?}"))
    }

    /// Sell and wait for the whole cascade to settle.
    pub async fn sell(&self, product_id: ProductId, amount: u32) -> anyhow::Result<SaleOutcome> {
        let bus = self.context.bus();
        let (tx, mut failures) = mpsc::unbounded_channel();
        let watch = product_id.clone();
        let subscription = bus.consume(move |failure: SellProductFailed| {
            if failure.command.product_id == watch {
                let _ = tx.send(failure);
            }
            async { Ok::<_, HandlerError>(()) }
        });

        bus.tell(SellProduct {
            product_id: product_id.clone(),
            amount,
        })?;
        bus.idle().await;
        subscription.unsubscribe();

        if let Ok(failure) = failures.try_recv() {
            return Ok(SaleOutcome::Rejected { failure });
        }
        let product = self
            .context
            .products()
            .get(product_id.as_str())
            .await?
            .with_context(|| format!("product {product_id} vanished after the sale"))?;
        Ok(SaleOutcome::Sold { product })
    }
}
