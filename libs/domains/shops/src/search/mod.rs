//! Secondary search index holding a non-authoritative copy of every shop

mod config;
mod elastic;
mod memory;

pub use config::SearchConfig;
pub use elastic::ElasticShopIndex;
pub use memory::InMemoryShopIndex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SearchResult;
use crate::models::{OpeningHours, Page, PageRequest, Shop};

/// Shop as stored in the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopDocument {
    pub id: i64,
    pub name: String,
    pub created_at: NaiveDate,
    pub in_vacations: bool,
    #[serde(default)]
    pub nb_products: i64,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
}

impl From<&Shop> for ShopDocument {
    fn from(shop: &Shop) -> Self {
        Self {
            id: shop.id,
            name: shop.name.clone(),
            created_at: shop.created_at,
            in_vacations: shop.in_vacations,
            nb_products: shop.nb_products,
            opening_hours: shop.opening_hours.clone(),
        }
    }
}

impl From<ShopDocument> for Shop {
    fn from(doc: ShopDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            created_at: doc.created_at,
            in_vacations: doc.in_vacations,
            nb_products: doc.nb_products,
            opening_hours: doc.opening_hours,
        }
    }
}

/// Text search with a strict creation-date window and a vacation flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSearchQuery {
    /// Case-insensitive substring of the shop name
    pub name: String,
    pub created_after: NaiveDate,
    pub created_before: NaiveDate,
    pub in_vacations: bool,
}

impl ShopSearchQuery {
    pub fn matches(&self, doc: &ShopDocument) -> bool {
        doc.name.to_lowercase().contains(&self.name.to_lowercase())
            && doc.created_at > self.created_after
            && doc.created_at < self.created_before
            && doc.in_vacations == self.in_vacations
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopSearchIndex: Send + Sync {
    /// Create the index with its mapping if it does not exist yet
    async fn ensure_index(&self) -> SearchResult<()>;

    /// Insert or overwrite the document with `doc.id`
    async fn upsert(&self, doc: ShopDocument) -> SearchResult<()>;

    /// `false` when there was nothing to delete
    async fn delete(&self, id: i64) -> SearchResult<bool>;

    /// Matching documents ordered by id
    async fn search(&self, query: ShopSearchQuery, page: PageRequest) -> SearchResult<Page<ShopDocument>>;

    async fn count(&self) -> SearchResult<u64>;
}
