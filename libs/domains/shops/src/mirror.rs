use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::StoreResult;
use crate::models::Shop;
use crate::search::{ShopDocument, ShopSearchIndex};

/// Propagates committed primary writes to the search side.
///
/// Runs strictly after the primary commit and never rolls it back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopMirror: Send + Sync {
    async fn upsert(&self, shop: &Shop) -> StoreResult<()>;

    async fn remove(&self, shop_id: i64) -> StoreResult<()>;
}

/// Writes straight into the search index
pub struct IndexMirror<I> {
    index: Arc<I>,
}

impl<I> IndexMirror<I> {
    pub fn new(index: Arc<I>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl<I: ShopSearchIndex> ShopMirror for IndexMirror<I> {
    async fn upsert(&self, shop: &Shop) -> StoreResult<()> {
        self.index.upsert(ShopDocument::from(shop)).await?;
        Ok(())
    }

    async fn remove(&self, shop_id: i64) -> StoreResult<()> {
        if !self.index.delete(shop_id).await? {
            debug!(shop_id, "No search document to remove");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SearchError, StoreError};
    use crate::search::MockShopSearchIndex;
    use chrono::NaiveDate;

    fn shop() -> Shop {
        Shop {
            id: 12,
            name: "Tea room".to_string(),
            created_at: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            in_vacations: true,
            nb_products: 3,
            opening_hours: vec![],
        }
    }

    #[tokio::test]
    async fn test_upsert_sends_document() {
        let mut index = MockShopSearchIndex::new();
        index
            .expect_upsert()
            .withf(|doc| doc.id == 12 && doc.in_vacations && doc.nb_products == 3)
            .times(1)
            .returning(|_| Ok(()));

        let mirror = IndexMirror::new(Arc::new(index));
        assert!(mirror.upsert(&shop()).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_document() {
        let mut index = MockShopSearchIndex::new();
        index.expect_delete().times(1).returning(|_| Ok(false));

        let mirror = IndexMirror::new(Arc::new(index));
        assert!(mirror.remove(12).await.is_ok());
    }

    #[tokio::test]
    async fn test_index_failure_is_store_error() {
        let mut index = MockShopSearchIndex::new();
        index
            .expect_upsert()
            .returning(|_| Err(SearchError::Unavailable("down".to_string())));

        let mirror = IndexMirror::new(Arc::new(index));
        assert!(matches!(
            mirror.upsert(&shop()).await,
            Err(StoreError::Search(SearchError::Unavailable(_)))
        ));
    }
}
