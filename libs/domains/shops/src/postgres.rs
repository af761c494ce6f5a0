use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::{Expr, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    TransactionTrait,
};
use std::collections::HashMap;
use tracing::info;

use crate::entity::{opening_hours, product, shop};
use crate::error::StoreResult;
use crate::models::{OpeningHours, Page, PageRequest, Shop, ShopFilter, ShopInput, SortKey};
use crate::repository::ShopRepository;

/// Correlated sub-select projected as `nb_products` on every shop read
const PRODUCT_COUNT: &str = "(SELECT COUNT(*) FROM products WHERE products.shop_id = shops.id)";

#[derive(Debug, FromQueryResult)]
struct ShopRow {
    id: i64,
    name: String,
    created_at: NaiveDate,
    in_vacations: bool,
    nb_products: i64,
}

impl ShopRow {
    fn into_shop(self, opening_hours: Vec<OpeningHours>) -> Shop {
        Shop {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            in_vacations: self.in_vacations,
            nb_products: self.nb_products,
            opening_hours,
        }
    }
}

#[derive(Clone)]
pub struct PgShopRepository {
    db: DatabaseConnection,
}

impl PgShopRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn with_product_count(query: Select<shop::Entity>) -> Select<shop::Entity> {
        query.column_as(Expr::cust(PRODUCT_COUNT), "nb_products")
    }

    async fn insert_opening_hours<C: ConnectionTrait>(
        db: &C,
        shop_id: i64,
        slots: &[OpeningHours],
    ) -> Result<(), DbErr> {
        if slots.is_empty() {
            return Ok(());
        }

        opening_hours::Entity::insert_many(
            slots
                .iter()
                .map(|slot| opening_hours::active_model(shop_id, slot)),
        )
        .exec(db)
        .await?;

        Ok(())
    }

    /// Attach opening hours to rows in one query, preserving row order
    async fn hydrate(&self, rows: Vec<ShopRow>) -> StoreResult<Vec<Shop>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let slots = opening_hours::Entity::find()
            .filter(opening_hours::Column::ShopId.is_in(ids))
            .order_by_asc(opening_hours::Column::Id)
            .all(&self.db)
            .await?;

        let mut by_shop: HashMap<i64, Vec<OpeningHours>> = HashMap::new();
        for slot in slots {
            by_shop.entry(slot.shop_id).or_default().push(slot.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let hours = by_shop.remove(&row.id).unwrap_or_default();
                row.into_shop(hours)
            })
            .collect())
    }

    async fn fetch_page(
        &self,
        ordered: Select<shop::Entity>,
        page: PageRequest,
        total_items: u64,
    ) -> StoreResult<Page<Shop>> {
        let rows = ordered
            .limit(page.size())
            .offset(page.offset())
            .into_model::<ShopRow>()
            .all(&self.db)
            .await?;

        Ok(Page::new(self.hydrate(rows).await?, page, total_items))
    }
}

fn apply_filter(query: Select<shop::Entity>, filter: ShopFilter) -> Select<shop::Entity> {
    use shop::Column;

    match filter {
        ShopFilter::VacationCreatedBetween {
            in_vacations,
            after,
            before,
        } => query
            .filter(Column::InVacations.eq(in_vacations))
            .filter(Column::CreatedAt.gt(after))
            .filter(Column::CreatedAt.lt(before)),
        ShopFilter::VacationCreatedBefore {
            in_vacations,
            before,
        } => query
            .filter(Column::InVacations.eq(in_vacations))
            .filter(Column::CreatedAt.lt(before)),
        ShopFilter::VacationCreatedAfter {
            in_vacations,
            after,
        } => query
            .filter(Column::InVacations.eq(in_vacations))
            .filter(Column::CreatedAt.gt(after)),
        ShopFilter::Vacation(in_vacations) => query.filter(Column::InVacations.eq(in_vacations)),
        ShopFilter::CreatedBetween { after, before } => {
            query.filter(Column::CreatedAt.between(after, before))
        }
        ShopFilter::CreatedBefore(before) => query.filter(Column::CreatedAt.lt(before)),
        ShopFilter::CreatedAfter(after) => query.filter(Column::CreatedAt.gt(after)),
        ShopFilter::All => query,
    }
}

#[async_trait]
impl ShopRepository for PgShopRepository {
    async fn create(&self, input: ShopInput) -> StoreResult<Shop> {
        let txn = self.db.begin().await?;

        // created_at is left to the column default
        let model = shop::ActiveModel {
            id: NotSet,
            name: Set(input.name),
            created_at: NotSet,
            in_vacations: Set(input.in_vacations),
        }
        .insert(&txn)
        .await?;

        Self::insert_opening_hours(&txn, model.id, &input.opening_hours).await?;
        txn.commit().await?;

        info!(shop_id = model.id, "Created shop");
        Ok(Shop {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            in_vacations: model.in_vacations,
            nb_products: 0,
            opening_hours: input.opening_hours,
        })
    }

    async fn replace(&self, id: i64, input: ShopInput) -> StoreResult<Option<Shop>> {
        let txn = self.db.begin().await?;

        let Some(existing) = shop::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };

        let mut active: shop::ActiveModel = existing.into();
        active.name = Set(input.name);
        active.in_vacations = Set(input.in_vacations);
        let model = active.update(&txn).await?;

        opening_hours::Entity::delete_many()
            .filter(opening_hours::Column::ShopId.eq(id))
            .exec(&txn)
            .await?;
        Self::insert_opening_hours(&txn, id, &input.opening_hours).await?;

        let nb_products = product::Entity::find()
            .filter(product::Column::ShopId.eq(id))
            .count(&txn)
            .await?;

        txn.commit().await?;

        info!(shop_id = id, "Replaced shop");
        Ok(Some(Shop {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            in_vacations: model.in_vacations,
            nb_products: nb_products as i64,
            opening_hours: input.opening_hours,
        }))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Shop>> {
        let row = Self::with_product_count(shop::Entity::find_by_id(id))
            .into_model::<ShopRow>()
            .one(&self.db)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        let txn = self.db.begin().await?;
        let result = shop::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        let deleted = result.rows_affected > 0;
        if deleted {
            info!(shop_id = id, "Deleted shop");
        }
        Ok(deleted)
    }

    async fn list_sorted(&self, sort: SortKey, page: PageRequest) -> StoreResult<Page<Shop>> {
        let total_items = shop::Entity::find().count(&self.db).await?;

        let query = Self::with_product_count(shop::Entity::find());
        let ordered = match sort {
            SortKey::Name => query.order_by_asc(shop::Column::Name),
            SortKey::CreatedAt => query.order_by_asc(shop::Column::CreatedAt),
            SortKey::NbProducts => query.order_by(Expr::cust("nb_products"), Order::Asc),
        }
        .order_by_asc(shop::Column::Id);

        self.fetch_page(ordered, page, total_items).await
    }

    async fn list_filtered(&self, filter: ShopFilter, page: PageRequest) -> StoreResult<Page<Shop>> {
        let filtered = apply_filter(shop::Entity::find(), filter);
        let total_items = filtered.clone().count(&self.db).await?;

        let ordered = Self::with_product_count(filtered).order_by_asc(shop::Column::Id);
        self.fetch_page(ordered, page, total_items).await
    }

    async fn list_all(&self) -> StoreResult<Vec<Shop>> {
        let rows = Self::with_product_count(shop::Entity::find())
            .order_by_asc(shop::Column::Id)
            .into_model::<ShopRow>()
            .all(&self.db)
            .await?;

        self.hydrate(rows).await
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(shop::Entity::find().count(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sql(filter: ShopFilter) -> String {
        apply_filter(shop::Entity::find(), filter)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_product_count_projection() {
        let statement = PgShopRepository::with_product_count(shop::Entity::find())
            .build(DbBackend::Postgres)
            .to_string();

        assert!(statement.contains(
            "(SELECT COUNT(*) FROM products WHERE products.shop_id = shops.id) AS \"nb_products\""
        ));
    }

    #[test]
    fn test_vacation_and_dates_are_strict() {
        let statement = sql(ShopFilter::VacationCreatedBetween {
            in_vacations: true,
            after: date(2020, 1, 1),
            before: date(2021, 1, 1),
        });

        assert!(statement.contains("\"shops\".\"in_vacations\" = TRUE"));
        assert!(statement.contains("\"shops\".\"created_at\" > '2020-01-01'"));
        assert!(statement.contains("\"shops\".\"created_at\" < '2021-01-01'"));
    }

    #[test]
    fn test_date_range_without_vacation_is_inclusive() {
        let statement = sql(ShopFilter::CreatedBetween {
            after: date(2020, 1, 1),
            before: date(2021, 1, 1),
        });

        let (_, predicate) = statement.split_once("WHERE").unwrap();
        assert_eq!(
            predicate.trim(),
            "\"shops\".\"created_at\" BETWEEN '2020-01-01' AND '2021-01-01'"
        );
    }

    #[test]
    fn test_no_filter_selects_everything() {
        assert!(!sql(ShopFilter::All).contains("WHERE"));
    }
}
