//! Loading the initial catalog from `inventory.json` and `products.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use stockflow_core::{ArticleId, DomainError, Money, ProductId, Repository, RepositoryError};
use stockflow_inventory::{Article, ArticleAmount, Product};

pub const INVENTORY_FILE: &str = "inventory.json";
pub const PRODUCTS_FILE: &str = "products.json";

/// Price given to every seeded product, in cents.
pub const DEFAULT_PRICE_CENTS: u64 = 10_000;
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("unable to load data from {0}")]
    MissingDir(PathBuf),

    #[error("unable to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file}: field `{field}` is not a valid number: {value:?}")]
    InvalidNumber {
        file: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{file}: product {product:?} needs a positive `amount_of` for article {article_id}")]
    ZeroAmount {
        file: &'static str,
        product: String,
        article_id: ArticleId,
    },

    #[error("{file}: article {article_id} is listed more than once")]
    DuplicateArticle {
        file: &'static str,
        article_id: ArticleId,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A JSON number that some files write as a string (`"12"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(i64),
    Text(String),
}

impl Numeric {
    fn parse(&self, file: &'static str, field: &'static str) -> Result<i64, SeedError> {
        match self {
            Numeric::Number(n) => Ok(*n),
            Numeric::Text(text) => text.trim().parse().map_err(|_| SeedError::InvalidNumber {
                file,
                field,
                value: text.clone(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    inventory: Vec<InventoryRecord>,
}

#[derive(Debug, Deserialize)]
struct InventoryRecord {
    art_id: String,
    name: String,
    stock: Numeric,
}

#[derive(Debug, Deserialize)]
struct ProductsFile {
    products: Vec<ProductRecord>,
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    name: String,
    contain_articles: Vec<ProductPartRecord>,
}

#[derive(Debug, Deserialize)]
struct ProductPartRecord {
    art_id: String,
    amount_of: Numeric,
}

/// What [`initialize_from_dir`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub articles: usize,
    pub product_ids: Vec<ProductId>,
}

/// Load articles and products from `dir` into the repositories.
///
/// Products get fresh ids, the default price and `available_amount = 0`;
/// a recalculation is needed afterwards. Each article's `used_in_products`
/// lists the seeded products containing it. Both files are parsed and
/// validated before anything is written.
pub async fn initialize_from_dir(
    dir: impl AsRef<Path>,
    products: &dyn Repository<Product>,
    articles: &dyn Repository<Article>,
) -> Result<SeedSummary, SeedError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(SeedError::MissingDir(dir.to_path_buf()));
    }

    let inventory: InventoryFile = read_json(&dir.join(INVENTORY_FILE))?;
    let catalog: ProductsFile = read_json(&dir.join(PRODUCTS_FILE))?;

    let mut stocked = BTreeMap::new();
    for record in inventory.inventory {
        let article_id: ArticleId = record.art_id.parse()?;
        let stock = record.stock.parse(INVENTORY_FILE, "stock")?;
        if stocked.contains_key(&article_id) {
            return Err(SeedError::DuplicateArticle {
                file: INVENTORY_FILE,
                article_id,
            });
        }
        stocked.insert(
            article_id.clone(),
            Article::new(article_id, record.name, stock),
        );
    }

    let price = Money::new(DEFAULT_PRICE_CENTS, DEFAULT_CURRENCY)?;
    let mut seeded = Vec::with_capacity(catalog.products.len());
    for record in catalog.products {
        let product_id = ProductId::generate();
        let mut contain_articles = Vec::with_capacity(record.contain_articles.len());
        for part in record.contain_articles {
            let article_id: ArticleId = part.art_id.parse()?;
            let amount_of = part.amount_of.parse(PRODUCTS_FILE, "amount_of")?;
            let amount_of = u32::try_from(amount_of)
                .ok()
                .filter(|amount| *amount > 0)
                .ok_or_else(|| SeedError::ZeroAmount {
                    file: PRODUCTS_FILE,
                    product: record.name.clone(),
                    article_id: article_id.clone(),
                })?;

            match stocked.get_mut(&article_id) {
                Some(article) => article.link_product(&product_id),
                None => {
                    warn!(%article_id, product = %record.name, "product references an unknown article")
                }
            }
            contain_articles.push(ArticleAmount {
                article_id,
                amount_of,
            });
        }
        seeded.push(Product {
            product_id,
            name: record.name,
            price: price.clone(),
            available_amount: 0,
            contain_articles,
        });
    }

    let summary = SeedSummary {
        articles: stocked.len(),
        product_ids: seeded.iter().map(|p| p.product_id.clone()).collect(),
    };
    for (article_id, article) in stocked {
        articles.set(article_id.as_str(), article).await?;
    }
    for product in seeded {
        let key = product.product_id.to_string();
        products.set(&key, product).await?;
    }

    info!(
        articles = summary.articles,
        products = summary.product_ids.len(),
        dir = %dir.display(),
        "seeded catalog"
    );
    Ok(summary)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SeedError> {
    let raw = fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
