use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{ShopDocument, ShopSearchIndex, ShopSearchQuery};
use crate::error::{SearchError, SearchResult};
use crate::models::{Page, PageRequest};

/// In-memory search index with the same matching rules as the Elasticsearch
/// query (for development/testing).
#[derive(Debug, Clone, Default)]
pub struct InMemoryShopIndex {
    documents: Arc<RwLock<BTreeMap<i64, ShopDocument>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryShopIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`SearchError::Unavailable`] until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn get(&self, id: i64) -> Option<ShopDocument> {
        self.documents.read().await.get(&id).cloned()
    }

    fn ensure_available(&self) -> SearchResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable("in-memory index switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ShopSearchIndex for InMemoryShopIndex {
    async fn ensure_index(&self) -> SearchResult<()> {
        self.ensure_available()
    }

    async fn upsert(&self, doc: ShopDocument) -> SearchResult<()> {
        self.ensure_available()?;
        self.documents.write().await.insert(doc.id, doc);
        Ok(())
    }

    async fn delete(&self, id: i64) -> SearchResult<bool> {
        self.ensure_available()?;
        Ok(self.documents.write().await.remove(&id).is_some())
    }

    async fn search(&self, query: ShopSearchQuery, page: PageRequest) -> SearchResult<Page<ShopDocument>> {
        self.ensure_available()?;
        let matching = self
            .documents
            .read()
            .await
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();

        Ok(Page::from_vec(matching, page))
    }

    async fn count(&self) -> SearchResult<u64> {
        self.ensure_available()?;
        Ok(self.documents.read().await.len() as u64)
    }
}
