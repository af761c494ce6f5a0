use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::{OpeningHours, Weekday};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "opening_hours_shops")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub shop_id: i64,
    pub day: Weekday,
    pub open_at: Time,
    pub close_at: Time,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shop::Entity",
        from = "Column::ShopId",
        to = "super::shop::Column::Id",
        on_delete = "Cascade"
    )]
    Shop,
}

impl Related<super::shop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shop.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for OpeningHours {
    fn from(model: Model) -> Self {
        OpeningHours::new(model.day, model.open_at, model.close_at)
    }
}

/// Row to insert for `shop_id`
pub fn active_model(shop_id: i64, slot: &OpeningHours) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        shop_id: Set(shop_id),
        day: Set(slot.day),
        open_at: Set(slot.open_at),
        close_at: Set(slot.close_at),
    }
}
