use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{ShopError, ShopResult, StoreError};
use crate::mirror::{IndexMirror, ShopMirror};
use crate::models::{Page, PageRequest, Shop, ShopInput, ShopQuery};
use crate::products::ProductDirectory;
use crate::repository::ShopRepository;
use crate::router::{QueryPlan, route};
use crate::search::ShopSearchIndex;
use crate::validation::{check_opening_hours, validate_shop};

/// Coordinates the primary store, the search mirror and validation.
///
/// The primary store is authoritative. Mirror writes happen after the primary
/// commit; when they fail the caller gets [`ShopError::PartialSync`] and the
/// primary write stands.
pub struct ShopService<R, P, I, M = IndexMirror<I>> {
    repository: Arc<R>,
    products: Arc<P>,
    index: Arc<I>,
    mirror: Arc<M>,
}

impl<R, P, I, M> Clone for ShopService<R, P, I, M> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            products: self.products.clone(),
            index: self.index.clone(),
            mirror: self.mirror.clone(),
        }
    }
}

impl<R, P, I> ShopService<R, P, I, IndexMirror<I>>
where
    R: ShopRepository,
    P: ProductDirectory,
    I: ShopSearchIndex,
{
    /// Mirror writes go straight to `index`
    pub fn new(repository: R, products: P, index: I) -> Self {
        let index = Arc::new(index);
        let mirror = IndexMirror::new(index.clone());

        Self {
            repository: Arc::new(repository),
            products: Arc::new(products),
            index,
            mirror: Arc::new(mirror),
        }
    }
}

impl<R, P, I, M> ShopService<R, P, I, M>
where
    R: ShopRepository,
    P: ProductDirectory,
    I: ShopSearchIndex,
    M: ShopMirror,
{
    pub fn with_mirror(repository: R, products: P, index: I, mirror: M) -> Self {
        Self {
            repository: Arc::new(repository),
            products: Arc::new(products),
            index: Arc::new(index),
            mirror: Arc::new(mirror),
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub async fn create_shop(&self, input: ShopInput) -> ShopResult<Shop> {
        validate_shop(&input)?;

        let created = self.repository.create(input).await?;
        let shop = self.refresh(created).await?;
        self.mirror_upsert(&shop).await?;

        Ok(shop)
    }

    /// Full replace: fields missing from `input` take their defaults.
    /// `created_at` is kept.
    pub async fn update_shop(&self, id: i64, input: ShopInput) -> ShopResult<Shop> {
        validate_shop(&input)?;
        self.get_shop(id).await?;

        let replaced = self
            .repository
            .replace(id, input)
            .await?
            .ok_or(ShopError::NotFound(id))?;
        let shop = self.refresh(replaced).await?;
        self.mirror_upsert(&shop).await?;

        Ok(shop)
    }

    /// Detach every product, delete the shop, then drop its search document.
    ///
    /// Detachment is not transactional: a failure partway leaves the earlier
    /// products detached.
    pub async fn delete_shop(&self, id: i64) -> ShopResult<()> {
        self.get_shop(id).await?;

        for product_id in self.products.product_ids_for_shop(id).await? {
            self.products.detach_shop(product_id).await?;
            debug!(shop_id = id, product_id, "Detached product before shop deletion");
        }

        if !self.repository.delete_by_id(id).await? {
            return Err(ShopError::NotFound(id));
        }

        self.mirror
            .remove(id)
            .await
            .map_err(|source| self.partial_sync(id, source))
    }

    pub async fn get_shop(&self, id: i64) -> ShopResult<Shop> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ShopError::NotFound(id))
    }

    pub async fn list_shops(&self, query: &ShopQuery, page: PageRequest) -> ShopResult<Page<Shop>> {
        let plan = route(query);
        debug!(?plan, page = page.page(), size = page.size(), "Listing shops");

        let shops = match plan {
            QueryPlan::Sorted(sort) => self.repository.list_sorted(sort, page).await?,
            QueryPlan::Filtered(filter) => self.repository.list_filtered(filter, page).await?,
            QueryPlan::Search(search) => self
                .index
                .search(search, page)
                .await
                .map_err(StoreError::from)?
                .map(Shop::from),
        };

        Ok(shops)
    }

    /// Every shop in the primary store, unpaginated
    pub async fn all_shops(&self) -> ShopResult<Vec<Shop>> {
        Ok(self.repository.list_all().await?)
    }

    /// Re-read `shop`, re-check its opening hours and push it to the mirror.
    /// The write path minus the primary write; used by the backfill.
    pub async fn reindex_shop(&self, shop: &Shop) -> ShopResult<Shop> {
        let current = self.get_shop(shop.id).await?;
        check_opening_hours(&current.opening_hours)?;
        self.mirror_upsert(&current).await?;

        Ok(current)
    }

    pub async fn count_shops(&self) -> ShopResult<u64> {
        Ok(self.repository.count().await?)
    }

    pub async fn count_indexed(&self) -> ShopResult<u64> {
        Ok(self.index.count().await?)
    }

    /// Re-read after a write so the product count reflects the database.
    /// The write has committed by now, so a failed read is a partial sync.
    async fn refresh(&self, written: Shop) -> ShopResult<Shop> {
        match self.repository.find_by_id(written.id).await {
            Ok(current) => Ok(current.unwrap_or(written)),
            Err(source) => Err(self.partial_sync(written.id, source)),
        }
    }

    async fn mirror_upsert(&self, shop: &Shop) -> ShopResult<()> {
        self.mirror
            .upsert(shop)
            .await
            .map_err(|source| self.partial_sync(shop.id, source))?;

        info!(shop_id = shop.id, "Shop mirrored to search index");
        Ok(())
    }

    fn partial_sync(&self, shop_id: i64, source: StoreError) -> ShopError {
        error!(shop_id, error = %source, "Search mirror out of sync with primary store");
        ShopError::PartialSync { shop_id, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SearchError, ValidationError};
    use crate::mirror::MockShopMirror;
    use crate::models::{OpeningHours, ShopFilter, SortKey, Weekday};
    use crate::products::{InMemoryProductDirectory, MockProductDirectory};
    use crate::repository::{InMemoryShopRepository, MockShopRepository};
    use crate::search::{InMemoryShopIndex, MockShopSearchIndex};
    use chrono::{NaiveDate, NaiveTime};
    use sea_orm::DbErr;

    type MemoryService = ShopService<InMemoryShopRepository, InMemoryProductDirectory, InMemoryShopIndex>;

    fn memory_service() -> (MemoryService, InMemoryProductDirectory, InMemoryShopIndex) {
        let products = InMemoryProductDirectory::new();
        let index = InMemoryShopIndex::new();
        let service = ShopService::new(
            InMemoryShopRepository::with_products(products.clone()),
            products.clone(),
            index.clone(),
        );
        (service, products, index)
    }

    fn slot(day: Weekday, open: u32, close: u32) -> OpeningHours {
        OpeningHours::new(
            day,
            NaiveTime::from_hms_opt(open, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(close, 0, 0).unwrap(),
        )
    }

    fn stored(id: i64) -> Shop {
        Shop {
            id,
            name: "Stored".to_string(),
            created_at: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            in_vacations: false,
            nb_products: 0,
            opening_hours: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_then_read_back() {
        let (service, _, index) = memory_service();
        let input = ShopInput::new("Bakery", true)
            .with_opening_hours(vec![slot(Weekday::Monday, 9, 12), slot(Weekday::Monday, 13, 18)]);

        let created = service.create_shop(input).await.unwrap();
        let fetched = service.get_shop(created.id).await.unwrap();

        assert_eq!(fetched.name, "Bakery");
        assert!(fetched.in_vacations);
        assert_eq!(fetched.nb_products, 0);
        assert_eq!(fetched.opening_hours.len(), 2);

        let doc = index.get(created.id).await.unwrap();
        assert_eq!(doc.name, "Bakery");
        assert_eq!(doc.created_at, fetched.created_at);
    }

    #[tokio::test]
    async fn test_overlap_rejected_before_any_store() {
        let mut repository = MockShopRepository::new();
        repository.expect_create().never();
        let mut mirror = MockShopMirror::new();
        mirror.expect_upsert().never();

        let service = ShopService::with_mirror(
            repository,
            MockProductDirectory::new(),
            MockShopSearchIndex::new(),
            mirror,
        );

        let input = ShopInput::new("Bakery", false)
            .with_opening_hours(vec![slot(Weekday::Monday, 9, 12), slot(Weekday::Monday, 12, 15)]);

        let err = service.create_shop(input).await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::Validation(ValidationError::OverlappingHours { .. })
        ));
    }

    #[tokio::test]
    async fn test_primary_failure_leaves_index_untouched() {
        let mut repository = MockShopRepository::new();
        repository
            .expect_create()
            .returning(|_| Err(StoreError::Database(DbErr::Custom("insert failed".to_string()))));
        let mut mirror = MockShopMirror::new();
        mirror.expect_upsert().never();

        let service = ShopService::with_mirror(
            repository,
            MockProductDirectory::new(),
            MockShopSearchIndex::new(),
            mirror,
        );

        let err = service.create_shop(ShopInput::new("Bakery", false)).await.unwrap_err();
        assert!(matches!(err, ShopError::Store(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_index_failure_after_commit_is_partial_sync() {
        let (service, _, index) = memory_service();
        index.set_unavailable(true);

        let err = service
            .create_shop(ShopInput::new("Bakery", false))
            .await
            .unwrap_err();

        let ShopError::PartialSync { shop_id, source } = err else {
            panic!("expected partial sync");
        };
        assert!(matches!(source, StoreError::Search(SearchError::Unavailable(_))));

        // The primary write stands
        assert_eq!(service.get_shop(shop_id).await.unwrap().name, "Bakery");
    }

    #[tokio::test]
    async fn test_create_refreshes_product_count() {
        let mut repository = MockShopRepository::new();
        repository.expect_create().returning(|_| Ok(stored(5)));
        repository.expect_find_by_id().returning(|id| {
            let mut shop = stored(id);
            shop.nb_products = 2;
            Ok(Some(shop))
        });
        let mut mirror = MockShopMirror::new();
        mirror
            .expect_upsert()
            .withf(|shop| shop.id == 5 && shop.nb_products == 2)
            .times(1)
            .returning(|_| Ok(()));

        let service = ShopService::with_mirror(
            repository,
            MockProductDirectory::new(),
            MockShopSearchIndex::new(),
            mirror,
        );

        let shop = service.create_shop(ShopInput::new("Stored", false)).await.unwrap();
        assert_eq!(shop.nb_products, 2);
    }

    #[tokio::test]
    async fn test_failed_reread_after_commit_is_partial_sync() {
        let mut repository = MockShopRepository::new();
        repository.expect_create().times(1).returning(|_| Ok(stored(5)));
        repository
            .expect_find_by_id()
            .returning(|_| Err(StoreError::Database(DbErr::Custom("connection reset".to_string()))));
        let mut mirror = MockShopMirror::new();
        mirror.expect_upsert().never();

        let service = ShopService::with_mirror(
            repository,
            MockProductDirectory::new(),
            MockShopSearchIndex::new(),
            mirror,
        );

        let err = service.create_shop(ShopInput::new("Stored", false)).await.unwrap_err();
        let ShopError::PartialSync { shop_id, source } = err else {
            panic!("expected partial sync");
        };
        assert_eq!(shop_id, 5);
        assert!(matches!(source, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn test_zero_page_size_from_query_string() {
        let (service, _, _) = memory_service();
        service.create_shop(ShopInput::new("Bakery", false)).await.unwrap();
        service.create_shop(ShopInput::new("Deli", false)).await.unwrap();

        let page: PageRequest = serde_json::from_str(r#"{"page":0,"size":0}"#).unwrap();
        let result = service.list_shops(&ShopQuery::default(), page).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.total_items, 2);
        assert_eq!(result.total_pages, 2);
    }

    #[tokio::test]
    async fn test_update_missing_shop_is_not_found() {
        let (service, _, _) = memory_service();

        let err = service
            .update_shop(404, ShopInput::new("Nowhere", false))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_replaces_everything_but_created_at() {
        let (service, _, index) = memory_service();
        let created = service
            .create_shop(
                ShopInput::new("Bakery", false)
                    .with_opening_hours(vec![slot(Weekday::Tuesday, 8, 12)]),
            )
            .await
            .unwrap();

        let updated = service
            .update_shop(created.id, ShopInput::new("Patisserie", true))
            .await
            .unwrap();

        assert_eq!(updated.name, "Patisserie");
        assert!(updated.in_vacations);
        assert!(updated.opening_hours.is_empty());
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(index.get(created.id).await.unwrap().name, "Patisserie");
    }

    #[tokio::test]
    async fn test_delete_detaches_products_and_removes_document() {
        let (service, products, index) = memory_service();
        let shop = service.create_shop(ShopInput::new("Grocer", false)).await.unwrap();
        let apple = products.add_product("Apple", Some(shop.id)).await;
        let pear = products.add_product("Pear", Some(shop.id)).await;

        service.delete_shop(shop.id).await.unwrap();

        assert!(service.get_shop(shop.id).await.unwrap_err().is_not_found());
        assert_eq!(products.get(apple).await.unwrap().shop_id, None);
        assert_eq!(products.get(pear).await.unwrap().shop_id, None);
        assert!(index.get(shop.id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_shop_touches_nothing() {
        let mut repository = MockShopRepository::new();
        repository.expect_find_by_id().returning(|_| Ok(None));
        repository.expect_delete_by_id().never();
        let mut products = MockProductDirectory::new();
        products.expect_product_ids_for_shop().never();

        let service = ShopService::with_mirror(
            repository,
            products,
            MockShopSearchIndex::new(),
            MockShopMirror::new(),
        );

        assert!(service.delete_shop(8).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_index_failure_is_partial_sync() {
        let mut repository = MockShopRepository::new();
        repository.expect_find_by_id().returning(|id| Ok(Some(stored(id))));
        repository.expect_delete_by_id().times(1).returning(|_| Ok(true));
        let mut products = MockProductDirectory::new();
        products
            .expect_product_ids_for_shop()
            .returning(|_| Ok(vec![11, 12]));
        products.expect_detach_shop().times(2).returning(|_| Ok(()));
        let mut mirror = MockShopMirror::new();
        mirror
            .expect_remove()
            .returning(|_| Err(StoreError::Search(SearchError::Unavailable("down".to_string()))));

        let service = ShopService::with_mirror(
            repository,
            products,
            MockShopSearchIndex::new(),
            mirror,
        );

        let err = service.delete_shop(3).await.unwrap_err();
        assert!(matches!(err, ShopError::PartialSync { shop_id: 3, .. }));
    }

    #[tokio::test]
    async fn test_sort_wins_over_name_search() {
        let mut repository = MockShopRepository::new();
        repository
            .expect_list_sorted()
            .withf(|sort, _| *sort == SortKey::CreatedAt)
            .times(1)
            .returning(|_, page| Ok(Page::new(vec![], page, 0)));
        let mut index = MockShopSearchIndex::new();
        index.expect_search().never();

        let service = ShopService::with_mirror(
            repository,
            MockProductDirectory::new(),
            index,
            MockShopMirror::new(),
        );

        let query = ShopQuery {
            sort_by: Some("createdAt".to_string()),
            name: Some("bake".to_string()),
            ..Default::default()
        };
        service.list_shops(&query, PageRequest::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_vacation_after_uses_combined_filter() {
        let after = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut repository = MockShopRepository::new();
        repository
            .expect_list_filtered()
            .withf(move |filter, _| {
                *filter
                    == ShopFilter::VacationCreatedAfter {
                        in_vacations: true,
                        after,
                    }
            })
            .times(1)
            .returning(|_, page| Ok(Page::new(vec![], page, 0)));

        let service = ShopService::with_mirror(
            repository,
            MockProductDirectory::new(),
            MockShopSearchIndex::new(),
            MockShopMirror::new(),
        );

        let query = ShopQuery {
            in_vacations: Some(true),
            created_after: Some(after),
            ..Default::default()
        };
        service.list_shops(&query, PageRequest::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_name_search_reads_from_index() {
        let (service, _, _) = memory_service();
        service.create_shop(ShopInput::new("Corner Bakery", false)).await.unwrap();
        service.create_shop(ShopInput::new("Butcher", false)).await.unwrap();
        service.create_shop(ShopInput::new("Bakery on holiday", true)).await.unwrap();

        let query = ShopQuery {
            name: Some("bakery".to_string()),
            ..Default::default()
        };
        let page = service.list_shops(&query, PageRequest::default()).await.unwrap();

        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Corner Bakery");
    }

    #[tokio::test]
    async fn test_search_failure_is_store_error() {
        let (service, _, index) = memory_service();
        index.set_unavailable(true);

        let query = ShopQuery {
            name: Some("x".to_string()),
            ..Default::default()
        };
        let err = service.list_shops(&query, PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, ShopError::Store(StoreError::Search(_))));
    }

    #[tokio::test]
    async fn test_reindex_rejects_stored_overlap() {
        let mut repository = MockShopRepository::new();
        repository.expect_find_by_id().returning(|id| {
            let mut shop = stored(id);
            shop.opening_hours = vec![slot(Weekday::Sunday, 10, 14), slot(Weekday::Sunday, 13, 16)];
            Ok(Some(shop))
        });
        let mut mirror = MockShopMirror::new();
        mirror.expect_upsert().never();

        let service = ShopService::with_mirror(
            repository,
            MockProductDirectory::new(),
            MockShopSearchIndex::new(),
            mirror,
        );

        let err = service.reindex_shop(&stored(1)).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }
}
