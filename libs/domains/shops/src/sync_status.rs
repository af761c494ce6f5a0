//! Durable completion markers for one-shot data migrations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::entity::sync_status;
use crate::error::StoreResult;

/// Name and version of a data migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MigrationKey {
    pub name: &'static str,
    pub version: i32,
}

impl MigrationKey {
    pub const fn new(name: &'static str, version: i32) -> Self {
        Self { name, version }
    }
}

impl fmt::Display for MigrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.name, self.version)
    }
}

/// Copies every primary-store shop into the search index
pub const SHOPS_SEARCH_BACKFILL: MigrationKey = MigrationKey::new("shops_search_backfill", 1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub name: String,
    pub version: i32,
    pub sync_completed: bool,
    pub completed_at: DateTime<Utc>,
}

impl From<sync_status::Model> for SyncStatus {
    fn from(model: sync_status::Model) -> Self {
        Self {
            name: model.name,
            version: model.version,
            sync_completed: model.sync_completed,
            completed_at: model.completed_at.with_timezone(&Utc),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncStatusStore: Send + Sync {
    async fn has_completed_sync(&self, key: MigrationKey) -> StoreResult<bool>;

    /// Record completion once. `true` when this call created the record,
    /// `false` when it already existed.
    async fn mark_completed(&self, key: MigrationKey) -> StoreResult<bool>;

    async fn get(&self, key: MigrationKey) -> StoreResult<Option<SyncStatus>>;
}

#[derive(Clone)]
pub struct PgSyncStatusStore {
    db: DatabaseConnection,
}

impl PgSyncStatusStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncStatusStore for PgSyncStatusStore {
    async fn has_completed_sync(&self, key: MigrationKey) -> StoreResult<bool> {
        Ok(self
            .get(key)
            .await?
            .is_some_and(|status| status.sync_completed))
    }

    async fn mark_completed(&self, key: MigrationKey) -> StoreResult<bool> {
        let record = sync_status::ActiveModel {
            name: Set(key.name.to_string()),
            version: Set(key.version),
            sync_completed: Set(true),
            completed_at: Set(Utc::now().into()),
        };

        let inserted = sync_status::Entity::insert(record)
            .on_conflict(
                OnConflict::columns([sync_status::Column::Name, sync_status::Column::Version])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match inserted {
            Ok(rows) => Ok(rows > 0),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, key: MigrationKey) -> StoreResult<Option<SyncStatus>> {
        let model = sync_status::Entity::find_by_id((key.name.to_string(), key.version))
            .one(&self.db)
            .await?;

        Ok(model.map(SyncStatus::from))
    }
}

/// In-memory implementation of SyncStatusStore (for development/testing)
#[derive(Debug, Clone, Default)]
pub struct InMemorySyncStatusStore {
    records: Arc<RwLock<HashMap<MigrationKey, SyncStatus>>>,
}

impl InMemorySyncStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncStatusStore for InMemorySyncStatusStore {
    async fn has_completed_sync(&self, key: MigrationKey) -> StoreResult<bool> {
        Ok(self
            .records
            .read()
            .await
            .get(&key)
            .is_some_and(|status| status.sync_completed))
    }

    async fn mark_completed(&self, key: MigrationKey) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Ok(false);
        }

        records.insert(
            key,
            SyncStatus {
                name: key.name.to_string(),
                version: key.version,
                sync_completed: true,
                completed_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: MigrationKey) -> StoreResult<Option<SyncStatus>> {
        Ok(self.records.read().await.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_key() {
        assert_eq!(SHOPS_SEARCH_BACKFILL.to_string(), "shops_search_backfill@v1");
    }

    #[tokio::test]
    async fn test_mark_completed_once() {
        let store = InMemorySyncStatusStore::new();
        assert!(!store.has_completed_sync(SHOPS_SEARCH_BACKFILL).await.unwrap());

        assert!(store.mark_completed(SHOPS_SEARCH_BACKFILL).await.unwrap());
        let first = store.get(SHOPS_SEARCH_BACKFILL).await.unwrap().unwrap();

        assert!(!store.mark_completed(SHOPS_SEARCH_BACKFILL).await.unwrap());
        let second = store.get(SHOPS_SEARCH_BACKFILL).await.unwrap().unwrap();

        assert!(store.has_completed_sync(SHOPS_SEARCH_BACKFILL).await.unwrap());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_versions_are_independent() {
        let store = InMemorySyncStatusStore::new();
        let next = MigrationKey::new("shops_search_backfill", 2);

        store.mark_completed(SHOPS_SEARCH_BACKFILL).await.unwrap();

        assert!(!store.has_completed_sync(next).await.unwrap());
        assert!(store.get(next).await.unwrap().is_none());
    }
}
