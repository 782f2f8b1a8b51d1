use serde::{Deserialize, Serialize};

use stockflow_core::{ArticleId, Money, ProductId};

/// A stocked part.
///
/// `stock` is signed and never clamped: over-selling can drive it below zero,
/// availability computation absorbs that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub article_id: ArticleId,
    pub name: String,
    pub stock: i64,
    /// Reverse index: products that contain this article.
    #[serde(default)]
    pub used_in_products: Vec<ProductId>,
}

impl Article {
    pub fn new(article_id: ArticleId, name: impl Into<String>, stock: i64) -> Self {
        Self {
            article_id,
            name: name.into(),
            stock,
            used_in_products: Vec::new(),
        }
    }

    /// Record that `product_id` consumes this article (idempotent).
    pub fn link_product(&mut self, product_id: &ProductId) {
        if !self.used_in_products.contains(product_id) {
            self.used_in_products.push(product_id.clone());
        }
    }
}

/// How many units of an article one product unit needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleAmount {
    pub article_id: ArticleId,
    pub amount_of: u32,
}

/// A sellable product assembled from articles.
///
/// `available_amount` is a cache of what the current article stock allows;
/// the workflow recomputes it, nothing else should write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub available_amount: i64,
    pub contain_articles: Vec<ArticleAmount>,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.available_amount > 0
    }

    pub fn article_ids(&self) -> impl Iterator<Item = &ArticleId> {
        self.contain_articles.iter().map(|part| &part.article_id)
    }
}
