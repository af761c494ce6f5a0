use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::{Page, PageRequest, Shop, ShopFilter, ShopInput, SortKey};
use crate::products::InMemoryProductDirectory;

/// Primary (authoritative) store for shops and their opening hours
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopRepository: Send + Sync {
    /// Insert a shop and its opening hours in one transaction
    async fn create(&self, input: ShopInput) -> StoreResult<Shop>;

    /// Replace every client-owned field of an existing shop, keeping
    /// `created_at`. `None` when the id does not exist.
    async fn replace(&self, id: i64, input: ShopInput) -> StoreResult<Option<Shop>>;

    /// Fetch a shop with a freshly computed product count
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Shop>>;

    /// Delete a shop; its opening hours go with it
    async fn delete_by_id(&self, id: i64) -> StoreResult<bool>;

    /// Every shop ordered by `sort` (ties broken by id)
    async fn list_sorted(&self, sort: SortKey, page: PageRequest) -> StoreResult<Page<Shop>>;

    /// Shops matching `filter`, ordered by id
    async fn list_filtered(&self, filter: ShopFilter, page: PageRequest) -> StoreResult<Page<Shop>>;

    /// Every shop, unpaginated, ordered by id
    async fn list_all(&self) -> StoreResult<Vec<Shop>>;

    async fn count(&self) -> StoreResult<u64>;
}

/// In-memory implementation of ShopRepository (for development/testing)
#[derive(Debug, Clone, Default)]
pub struct InMemoryShopRepository {
    shops: Arc<RwLock<BTreeMap<i64, Shop>>>,
    next_id: Arc<AtomicI64>,
    products: InMemoryProductDirectory,
}

impl InMemoryShopRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share `products` so product counts and the delete guard see the same data
    pub fn with_products(products: InMemoryProductDirectory) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    /// Seed a shop with a chosen id and creation date
    pub async fn insert_existing(&self, shop: Shop) -> Shop {
        self.next_id.fetch_max(shop.id, Ordering::SeqCst);
        self.shops.write().await.insert(shop.id, shop.clone());
        shop
    }

    async fn snapshot(&self) -> Vec<Shop> {
        let counts = self.products.counts_by_shop().await;
        self.shops
            .read()
            .await
            .values()
            .cloned()
            .map(|mut shop| {
                shop.nb_products = counts.get(&shop.id).copied().unwrap_or(0);
                shop
            })
            .collect()
    }
}

#[async_trait]
impl ShopRepository for InMemoryShopRepository {
    async fn create(&self, input: ShopInput) -> StoreResult<Shop> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let shop = Shop {
            id,
            name: input.name,
            created_at: Utc::now().date_naive(),
            in_vacations: input.in_vacations,
            nb_products: 0,
            opening_hours: input.opening_hours,
        };

        self.shops.write().await.insert(id, shop.clone());
        tracing::info!(shop_id = id, "Created shop");
        Ok(shop)
    }

    async fn replace(&self, id: i64, input: ShopInput) -> StoreResult<Option<Shop>> {
        let mut shops = self.shops.write().await;
        let Some(shop) = shops.get_mut(&id) else {
            return Ok(None);
        };

        shop.name = input.name;
        shop.in_vacations = input.in_vacations;
        shop.opening_hours = input.opening_hours;
        drop(shops);

        tracing::info!(shop_id = id, "Replaced shop");
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Shop>> {
        let Some(mut shop) = self.shops.read().await.get(&id).cloned() else {
            return Ok(None);
        };

        shop.nb_products = self
            .products
            .counts_by_shop()
            .await
            .get(&id)
            .copied()
            .unwrap_or(0);
        Ok(Some(shop))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        // Same guarantee the products foreign key gives in Postgres
        if self.products.counts_by_shop().await.contains_key(&id) {
            return Err(StoreError::Database(DbErr::Custom(format!(
                "shop {id} is still referenced by products"
            ))));
        }

        let removed = self.shops.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(shop_id = id, "Deleted shop");
        }
        Ok(removed)
    }

    async fn list_sorted(&self, sort: SortKey, page: PageRequest) -> StoreResult<Page<Shop>> {
        let mut shops = self.snapshot().await;
        match sort {
            SortKey::Name => shops.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
            SortKey::CreatedAt => {
                shops.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            }
            SortKey::NbProducts => {
                shops.sort_by(|a, b| a.nb_products.cmp(&b.nb_products).then(a.id.cmp(&b.id)))
            }
        }

        Ok(Page::from_vec(shops, page))
    }

    async fn list_filtered(&self, filter: ShopFilter, page: PageRequest) -> StoreResult<Page<Shop>> {
        let shops = self
            .snapshot()
            .await
            .into_iter()
            .filter(|shop| filter.matches(shop))
            .collect();

        Ok(Page::from_vec(shops, page))
    }

    async fn list_all(&self) -> StoreResult<Vec<Shop>> {
        Ok(self.snapshot().await)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.shops.read().await.len() as u64)
    }
}
