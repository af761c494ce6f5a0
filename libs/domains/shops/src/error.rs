use sea_orm::DbErr;
use thiserror::Error;

use crate::models::{OpeningHours, Weekday};

/// Failures talking to the search backend
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Search backend unavailable: {0}")]
    Unavailable(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Failure of either backing store, with the driver error kept as the source
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Primary store error: {0}")]
    Database(#[from] DbErr),

    #[error("Search index error: {0}")]
    Search(#[from] SearchError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Input rejected before any store is touched
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Opening hours overlap on {day}: {first} and {second}")]
    OverlappingHours {
        day: Weekday,
        first: OpeningHours,
        second: OpeningHours,
    },

    #[error("Invalid shop fields: {0}")]
    Fields(#[from] validator::ValidationErrors),

    #[error("Invalid date for '{field}': {value}")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Shop not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    /// The primary write committed but the search mirror did not follow.
    /// Retry the mirror step, not the write.
    #[error("Shop {shop_id} was saved but its search document is out of sync")]
    PartialSync {
        shop_id: i64,
        #[source]
        source: StoreError,
    },
}

impl ShopError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShopError::NotFound(_))
    }
}

impl From<DbErr> for ShopError {
    fn from(err: DbErr) -> Self {
        ShopError::Store(StoreError::Database(err))
    }
}

impl From<SearchError> for ShopError {
    fn from(err: SearchError) -> Self {
        ShopError::Store(StoreError::Search(err))
    }
}

pub type ShopResult<T> = Result<T, ShopError>;
