use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use stockflow_bus::HandlerError;

use crate::context::{AppContext, InventoryBus};
use crate::kind::inventory_message;
use crate::model::Product;

pub fn is_available_product(product: &Product) -> bool {
    product.is_available()
}

/// Every product that can currently be sold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllAvailableProducts;

inventory_message!(query GetAllAvailableProducts => Vec<Product>);

pub fn get_all_available_products<B: InventoryBus>(
    app: Arc<AppContext<B>>,
) -> impl Fn(GetAllAvailableProducts) -> BoxFuture<'static, Result<Vec<Product>, HandlerError>>
+ Send
+ Sync
+ 'static {
    move |_query| {
        let app = Arc::clone(&app);
        async move { available_products(&app).await }.boxed()
    }
}

async fn available_products<B: InventoryBus>(
    app: &AppContext<B>,
) -> Result<Vec<Product>, HandlerError> {
    let products = app.products().all().await?;
    Ok(products.into_iter().filter(is_available_product).collect())
}
