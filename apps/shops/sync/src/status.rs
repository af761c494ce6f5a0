use database::postgres::HealthStatus;
use domain_shops::SyncStatus;
use serde::Serialize;

/// Output of the `status` command
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub migration: String,
    /// `null` until the backfill has completed once
    pub record: Option<SyncStatus>,
    pub shops: u64,
    pub indexed_documents: u64,
    /// Documents the index is missing relative to the primary store
    pub missing_documents: u64,
    pub database: HealthStatus,
}

impl StatusReport {
    pub fn new(
        migration: String,
        record: Option<SyncStatus>,
        shops: u64,
        indexed_documents: u64,
        database: HealthStatus,
    ) -> Self {
        Self {
            migration,
            record,
            shops,
            indexed_documents,
            missing_documents: shops.saturating_sub(indexed_documents),
            database,
        }
    }
}
