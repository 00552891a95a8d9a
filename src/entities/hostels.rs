use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hostels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub slug: String,

    /// Assignment policy lives outside this service; the column is carried
    /// for the hostel projection only.
    pub gender: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::hostelers::Entity")]
    Hostelers,
    #[sea_orm(has_many = "super::outpasses::Entity")]
    Outpasses,
}

impl Related<super::hostelers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hostelers.def()
    }
}

impl Related<super::outpasses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Outpasses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
