//! Shops Domain
//!
//! Keeps a shop's relational record and its search-index copy in agreement,
//! enforces the opening-hours invariant before any write, and routes list
//! requests to the store that can answer them.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐      ┌──────────────┐
//! │     ShopService       │─────▶│ QueryRouter  │  ← sort / search / filter
//! │ (write coordinator)   │      └──────────────┘
//! └──┬─────────┬───────┬──┘
//!    │         │       │
//! ┌──▼───┐ ┌───▼────┐ ┌▼──────────┐
//! │ Repo │ │Products│ │ ShopMirror│  ← after commit, best effort
//! │ (PG) │ │        │ └─────┬─────┘
//! └──────┘ └────────┘ ┌─────▼─────┐
//!                     │SearchIndex│
//!                     └───────────┘
//! ```
//!
//! [`BackfillJob`] copies pre-existing shops into the index once, gated by a
//! durable [`sync_status`] record.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_shops::{
//!     InMemoryProductDirectory, InMemoryShopIndex, InMemoryShopRepository, ShopInput,
//!     ShopService,
//! };
//!
//! # async fn example() -> domain_shops::ShopResult<()> {
//! let products = InMemoryProductDirectory::new();
//! let service = ShopService::new(
//!     InMemoryShopRepository::with_products(products.clone()),
//!     products,
//!     InMemoryShopIndex::new(),
//! );
//!
//! let shop = service.create_shop(ShopInput::new("Bakery", false)).await?;
//! service.delete_shop(shop.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod backfill;
pub mod entity;
pub mod error;
pub mod mirror;
pub mod models;
pub mod postgres;
pub mod products;
pub mod repository;
pub mod router;
pub mod search;
pub mod service;
pub mod sync_status;
pub mod validation;

// Re-export commonly used types
pub use backfill::{BackfillJob, BackfillReport};
pub use error::{SearchError, ShopError, ShopResult, StoreError, StoreResult, ValidationError};
pub use mirror::{IndexMirror, ShopMirror};
pub use models::{
    OpeningHours, Page, PageRequest, Shop, ShopFilter, ShopInput, ShopListParams, ShopQuery,
    SortKey, Weekday,
};
pub use postgres::PgShopRepository;
pub use products::{InMemoryProductDirectory, PgProductDirectory, ProductDirectory};
pub use repository::{InMemoryShopRepository, ShopRepository};
pub use router::{QueryPlan, route};
pub use search::{
    ElasticShopIndex, InMemoryShopIndex, SearchConfig, ShopDocument, ShopSearchIndex,
    ShopSearchQuery,
};
pub use service::ShopService;
pub use sync_status::{
    InMemorySyncStatusStore, MigrationKey, PgSyncStatusStore, SHOPS_SEARCH_BACKFILL, SyncStatus,
    SyncStatusStore,
};

/// Production wiring: Postgres primary store, Elasticsearch mirror
pub type PgShopService = ShopService<PgShopRepository, PgProductDirectory, ElasticShopIndex>;

/// Backfill over the production wiring
pub type PgBackfillJob = BackfillJob<
    PgShopRepository,
    PgProductDirectory,
    ElasticShopIndex,
    IndexMirror<ElasticShopIndex>,
    PgSyncStatusStore,
>;
