//! Products as seen from the shop side: who references a shop, and how to
//! let go of it before the shop is deleted.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Value,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::entity::product;
use crate::error::StoreResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub shop_id: Option<i64>,
}

/// Product collaborator the delete path must notify
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductDirectory: Send + Sync {
    /// Ids of the products currently referencing `shop_id`
    async fn product_ids_for_shop(&self, shop_id: i64) -> StoreResult<Vec<i64>>;

    /// Clear the shop reference of one product
    async fn detach_shop(&self, product_id: i64) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct PgProductDirectory {
    db: DatabaseConnection,
}

impl PgProductDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductDirectory for PgProductDirectory {
    async fn product_ids_for_shop(&self, shop_id: i64) -> StoreResult<Vec<i64>> {
        let ids = product::Entity::find()
            .select_only()
            .column(product::Column::Id)
            .filter(product::Column::ShopId.eq(shop_id))
            .order_by_asc(product::Column::Id)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;

        Ok(ids)
    }

    async fn detach_shop(&self, product_id: i64) -> StoreResult<()> {
        product::Entity::update_many()
            .col_expr(product::Column::ShopId, Expr::value(Value::BigInt(None)))
            .filter(product::Column::Id.eq(product_id))
            .exec(&self.db)
            .await?;

        debug!(product_id, "Detached product from shop");
        Ok(())
    }
}

/// In-memory products, shared with [`crate::repository::InMemoryShopRepository`]
/// so product counts stay consistent.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductDirectory {
    products: Arc<RwLock<BTreeMap<i64, Product>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryProductDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, name: impl Into<String>, shop_id: Option<i64>) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let product = Product {
            id,
            name: name.into(),
            shop_id,
        };
        self.products.write().await.insert(id, product);
        id
    }

    pub async fn get(&self, product_id: i64) -> Option<Product> {
        self.products.read().await.get(&product_id).cloned()
    }

    /// Product count per referenced shop
    pub async fn counts_by_shop(&self) -> HashMap<i64, i64> {
        let mut counts = HashMap::new();
        for shop_id in self.products.read().await.values().filter_map(|p| p.shop_id) {
            *counts.entry(shop_id).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl ProductDirectory for InMemoryProductDirectory {
    async fn product_ids_for_shop(&self, shop_id: i64) -> StoreResult<Vec<i64>> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| p.shop_id == Some(shop_id))
            .map(|p| p.id)
            .collect())
    }

    async fn detach_shop(&self, product_id: i64) -> StoreResult<()> {
        if let Some(product) = self.products.write().await.get_mut(&product_id) {
            product.shop_id = None;
        }
        Ok(())
    }
}
