//! Selling products and the stock adjustment that follows a sale.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stockflow_bus::HandlerResult;
use stockflow_core::ProductId;

use crate::availability::RecalculateProductsAvailability;
use crate::context::{AppContext, InventoryBus};
use crate::error::{FailureReason, WorkflowError};
use crate::kind::inventory_message;
use crate::model::Product;

/// Sell `amount` units of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellProduct {
    pub product_id: ProductId,
    pub amount: u32,
}

inventory_message!(command SellProduct);

/// A [`SellProduct`] was rejected; nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellProductFailed {
    pub command: SellProduct,
    pub reason: FailureReason,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

inventory_message!(event SellProductFailed);

/// A sale was recorded. `product` is the state after the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSold {
    pub command: SellProduct,
    pub product: Product,
    pub occurred_at: DateTime<Utc>,
}

inventory_message!(event ProductSold);

pub fn sell_product<B: InventoryBus>(
    app: Arc<AppContext<B>>,
) -> impl Fn(SellProduct) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static {
    move |command| {
        let app = Arc::clone(&app);
        async move { handle_sell(&app, command).await }.boxed()
    }
}

/// Business failures become [`SellProductFailed`]; the handler itself
/// succeeds either way.
async fn handle_sell<B: InventoryBus>(app: &AppContext<B>, command: SellProduct) -> HandlerResult {
    match sell(app, &command).await {
        Ok(product) => {
            info!(product_id = %command.product_id, amount = command.amount, "product sold");
            app.bus().emit(ProductSold {
                command,
                product,
                occurred_at: Utc::now(),
            });
        }
        Err(error) => {
            warn!(product_id = %command.product_id, reason = %error.reason(), %error, "sale rejected");
            app.bus().emit(SellProductFailed {
                reason: error.reason(),
                detail: error.to_string(),
                command,
                occurred_at: Utc::now(),
            });
        }
    }
    Ok(())
}

async fn sell<B: InventoryBus>(
    app: &AppContext<B>,
    command: &SellProduct,
) -> Result<Product, WorkflowError> {
    let mut product = app
        .products()
        .get(command.product_id.as_str())
        .await?
        .ok_or_else(|| WorkflowError::NotFoundProduct(command.product_id.clone()))?;

    let requested = i64::from(command.amount);
    if product.available_amount < requested {
        return Err(WorkflowError::NotEnoughProductAmount {
            product_id: command.product_id.clone(),
            available: product.available_amount,
            requested: command.amount,
        });
    }

    product.available_amount -= requested;
    app.products()
        .set(command.product_id.as_str(), product.clone())
        .await?;
    Ok(product)
}

/// Reacts to [`ProductSold`]: takes the sold articles out of stock, then asks
/// for every product sharing those articles to be recalculated.
pub fn adjust_inventory<B: InventoryBus>(
    app: Arc<AppContext<B>>,
) -> impl Fn(ProductSold) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static {
    move |event| {
        let app = Arc::clone(&app);
        async move { adjust(&app, event).await }.boxed()
    }
}

async fn adjust<B: InventoryBus>(app: &AppContext<B>, event: ProductSold) -> HandlerResult {
    let sold = i64::from(event.command.amount);
    let mut affected = Vec::new();
    let mut seen = HashSet::new();

    // Sequential: a product may list the same article twice.
    for part in &event.product.contain_articles {
        let Some(mut article) = app.articles().get(part.article_id.as_str()).await? else {
            debug!(article_id = %part.article_id, "sold article missing, skipped");
            continue;
        };
        article.stock -= i64::from(part.amount_of) * sold;
        for product_id in &article.used_in_products {
            if seen.insert(product_id.clone()) {
                affected.push(product_id.clone());
            }
        }
        app.articles()
            .set(part.article_id.as_str(), article)
            .await?;
    }

    app.bus().tell(RecalculateProductsAvailability {
        product_ids: affected,
    })?;
    Ok(())
}
