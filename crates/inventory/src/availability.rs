//! Product availability: the pure formula and the recalculation commands.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stockflow_bus::HandlerResult;
use stockflow_core::ProductId;

use crate::context::{AppContext, InventoryBus};
use crate::error::{FailureReason, WorkflowError};
use crate::kind::inventory_message;

/// One contained article as seen by the availability formula.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArticleStock {
    pub amount_of: u32,
    pub stock: i64,
}

/// How many whole product units the given article stock allows.
///
/// Minimum over `stock / amount_of` (truncating), floored at zero. An empty
/// set yields zero. Entries with `amount_of == 0` impose no constraint.
pub fn available_amount(parts: impl IntoIterator<Item = ArticleStock>) -> i64 {
    parts
        .into_iter()
        .filter(|part| part.amount_of > 0)
        .map(|part| part.stock / i64::from(part.amount_of))
        .min()
        .unwrap_or(0)
        .max(0)
}

/// Recompute availability of every stored product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculateAllProductsAvailability;

inventory_message!(command RecalculateAllProductsAvailability);

/// Recompute availability of the listed products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculateProductsAvailability {
    pub product_ids: Vec<ProductId>,
}

inventory_message!(command RecalculateProductsAvailability);

/// Recalculation of a single product failed; the rest of its batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculateProductsAvailabilityFailed {
    pub product_id: ProductId,
    pub reason: FailureReason,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

inventory_message!(event RecalculateProductsAvailabilityFailed);

pub fn recalculate_all_products_availability<B: InventoryBus>(
    app: Arc<AppContext<B>>,
) -> impl Fn(RecalculateAllProductsAvailability) -> BoxFuture<'static, HandlerResult>
+ Send
+ Sync
+ 'static {
    move |_command| {
        let app = Arc::clone(&app);
        async move { recalculate_all(&app).await }.boxed()
    }
}

async fn recalculate_all<B: InventoryBus>(app: &AppContext<B>) -> HandlerResult {
    let product_ids = app
        .products()
        .all()
        .await?
        .into_iter()
        .map(|product| product.product_id)
        .collect();
    app.bus()
        .tell(RecalculateProductsAvailability { product_ids })?;
    Ok(())
}

pub fn recalculate_products_availability<B: InventoryBus>(
    app: Arc<AppContext<B>>,
) -> impl Fn(RecalculateProductsAvailability) -> BoxFuture<'static, HandlerResult>
+ Send
+ Sync
+ 'static {
    move |command| {
        let app = Arc::clone(&app);
        async move { recalculate_batch(&app, command).await }.boxed()
    }
}

async fn recalculate_batch<B: InventoryBus>(
    app: &AppContext<B>,
    command: RecalculateProductsAvailability,
) -> HandlerResult {
    let outcomes = future::join_all(
        command
            .product_ids
            .iter()
            .map(|product_id| recalculate_one(app, product_id)),
    )
    .await;

    for (product_id, outcome) in command.product_ids.into_iter().zip(outcomes) {
        if let Err(error) = outcome {
            warn!(%product_id, reason = %error.reason(), %error, "availability recalculation failed");
            app.bus().emit(RecalculateProductsAvailabilityFailed {
                product_id,
                reason: error.reason(),
                detail: error.to_string(),
                occurred_at: Utc::now(),
            });
        }
    }
    Ok(())
}

async fn recalculate_one<B: InventoryBus>(
    app: &AppContext<B>,
    product_id: &ProductId,
) -> Result<(), WorkflowError> {
    let mut product = app
        .products()
        .get(product_id.as_str())
        .await?
        .ok_or_else(|| WorkflowError::NotFound(product_id.clone()))?;

    let mut parts = Vec::with_capacity(product.contain_articles.len());
    let mut missing = Vec::new();
    for part in &product.contain_articles {
        match app.articles().get(part.article_id.as_str()).await? {
            Some(article) => parts.push(ArticleStock {
                amount_of: part.amount_of,
                stock: article.stock,
            }),
            None => missing.push(part.article_id.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(WorkflowError::ArticlesIncomplete {
            product_id: product_id.clone(),
            missing,
        });
    }

    product.available_amount = available_amount(parts);
    debug!(%product_id, available_amount = product.available_amount, "availability recalculated");
    app.products().set(product_id.as_str(), product).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn part(amount_of: u32, stock: i64) -> ArticleStock {
        ArticleStock { amount_of, stock }
    }

    #[test]
    fn takes_the_scarcest_article() {
        // legs 12/4, screws 17/8, seat 2/1
        assert_eq!(available_amount([part(4, 12), part(8, 17), part(1, 2)]), 2);
        // legs 12/4, screws 17/8, table top 1/1
        assert_eq!(available_amount([part(4, 12), part(8, 17), part(1, 1)]), 1);
    }

    #[test]
    fn empty_set_is_unavailable() {
        assert_eq!(available_amount([]), 0);
    }

    #[test]
    fn negative_stock_floors_at_zero() {
        assert_eq!(available_amount([part(4, -4), part(1, 10)]), 0);
        assert_eq!(available_amount([part(3, -2)]), 0);
    }

    #[test]
    fn zero_amount_of_imposes_no_constraint() {
        assert_eq!(available_amount([part(0, 0), part(2, 9)]), 4);
        assert_eq!(available_amount([part(0, 5)]), 0);
    }

    proptest! {
        #[test]
        fn equals_the_scarcest_ratio_floored_at_zero(
            parts in prop::collection::vec((1u32..50, -1_000i64..1_000), 1..8)
        ) {
            let parts: Vec<_> = parts.into_iter().map(|(a, s)| part(a, s)).collect();
            let amount = available_amount(parts.iter().copied());
            let scarcest = parts
                .iter()
                .map(|p| p.stock / i64::from(p.amount_of))
                .min()
                .unwrap();
            prop_assert_eq!(amount, scarcest.max(0));
            for p in &parts {
                prop_assert!(amount * i64::from(p.amount_of) <= p.stock.max(0));
            }
            // One more unit would overdraw some article.
            prop_assert!(parts
                .iter()
                .any(|p| (amount + 1) * i64::from(p.amount_of) > p.stock));
        }

        #[test]
        fn order_does_not_matter(
            parts in prop::collection::vec((1u32..50, 0i64..1_000), 0..8)
        ) {
            let forward: Vec<_> = parts.iter().map(|&(a, s)| part(a, s)).collect();
            let mut backward = forward.clone();
            backward.reverse();
            prop_assert_eq!(available_amount(forward), available_amount(backward));
        }
    }
}
