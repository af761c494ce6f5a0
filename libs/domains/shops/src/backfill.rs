//! One-time copy of pre-existing shops into the search index.
//!
//! Gated by a [`MigrationKey`] record: once recorded, later runs are no-ops
//! unless forced. The record is written after every pass, even when some
//! shops failed to index; those stay missing until a forced run.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ShopResult;
use crate::mirror::ShopMirror;
use crate::products::ProductDirectory;
use crate::repository::ShopRepository;
use crate::search::ShopSearchIndex;
use crate::service::ShopService;
use crate::sync_status::{MigrationKey, SHOPS_SEARCH_BACKFILL, SyncStatusStore};

/// Outcome of one backfill invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub migration: String,
    /// Already recorded, nothing copied
    pub skipped: bool,
    pub forced: bool,
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    /// This run created the completion record
    pub newly_recorded: bool,
}

impl BackfillReport {
    fn skipped(migration: MigrationKey) -> Self {
        Self {
            migration: migration.to_string(),
            skipped: true,
            forced: false,
            total: 0,
            indexed: 0,
            failed: 0,
            newly_recorded: false,
        }
    }
}

pub struct BackfillJob<R, P, I, M, S> {
    service: ShopService<R, P, I, M>,
    status: Arc<S>,
    migration: MigrationKey,
}

impl<R, P, I, M, S> BackfillJob<R, P, I, M, S>
where
    R: ShopRepository,
    P: ProductDirectory,
    I: ShopSearchIndex,
    M: ShopMirror,
    S: SyncStatusStore,
{
    pub fn new(service: ShopService<R, P, I, M>, status: S) -> Self {
        Self {
            service,
            status: Arc::new(status),
            migration: SHOPS_SEARCH_BACKFILL,
        }
    }

    pub fn with_migration(mut self, migration: MigrationKey) -> Self {
        self.migration = migration;
        self
    }

    pub fn migration(&self) -> MigrationKey {
        self.migration
    }

    pub fn status_store(&self) -> &S {
        &self.status
    }

    /// Copy every shop unless the migration is already recorded
    pub async fn run(&self) -> ShopResult<BackfillReport> {
        if self.status.has_completed_sync(self.migration).await? {
            info!(migration = %self.migration, "Search backfill already completed, skipping");
            return Ok(BackfillReport::skipped(self.migration));
        }

        self.copy_all(false).await
    }

    /// Copy every shop even if the migration is recorded. Does not create a
    /// second record.
    pub async fn run_forced(&self) -> ShopResult<BackfillReport> {
        self.copy_all(true).await
    }

    async fn copy_all(&self, forced: bool) -> ShopResult<BackfillReport> {
        let shops = self.service.all_shops().await?;
        info!(migration = %self.migration, total = shops.len(), forced, "Starting search backfill");

        let mut indexed = 0;
        let mut failed = 0;
        for shop in &shops {
            match self.service.reindex_shop(shop).await {
                Ok(_) => indexed += 1,
                Err(e) => {
                    failed += 1;
                    warn!(shop_id = shop.id, error = %e, "Failed to index shop during backfill");
                }
            }
        }

        let newly_recorded = self.status.mark_completed(self.migration).await?;

        info!(
            migration = %self.migration,
            total = shops.len(),
            indexed,
            failed,
            newly_recorded,
            "Search backfill finished"
        );

        Ok(BackfillReport {
            migration: self.migration.to_string(),
            skipped: false,
            forced,
            total: shops.len(),
            indexed,
            failed,
            newly_recorded,
        })
    }
}
