//! Shared test utilities for the shop crates
//!
//! - `TestDatabase`: PostgreSQL container with the workspace migrations applied
//!   (feature: "postgres")
//! - `TestDataBuilder`: deterministic test data generation (always available)
//! - `assertions`: custom assertion helpers (always available)
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let shop_name = builder.shop_name("main");
//!     let shop_id = db.insert_shop(&shop_name, builder.date(0), false).await;
//!     db.insert_product(&builder.product_name("apple"), Some(shop_id)).await;
//! }
//! ```

use chrono::{Days, NaiveDate};

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_shop");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Unique shop name, e.g. `"test-shop-12345-main"`
    pub fn shop_name(&self, suffix: &str) -> String {
        format!("test-shop-{}-{}", self.seed, suffix)
    }

    pub fn product_name(&self, suffix: &str) -> String {
        format!("test-product-{}-{}", self.seed, suffix)
    }

    /// Seed-derived date on or after 2000-01-01, shifted by `offset_days`
    pub fn date(&self, offset_days: u64) -> NaiveDate {
        let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
        base.checked_add_days(Days::new(self.seed % 10_000 + offset_days))
            .unwrap_or(base)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that ids come back in ascending order
    pub fn assert_ascending(ids: &[i64], context: &str) {
        assert!(
            ids.windows(2).all(|pair| pair[0] < pair[1]),
            "{}: expected ascending ids, got {:?}",
            context,
            ids
        );
    }
}
