use sea_orm::entity::prelude::*;

/// `shops` table. The product count is not a column; it is projected at read
/// time by the repository.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "shops")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub created_at: Date,
    pub in_vacations: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::opening_hours::Entity")]
    OpeningHours,
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::opening_hours::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OpeningHours.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
