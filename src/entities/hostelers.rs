use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hostelers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Session identities resolve to a hosteler through this column.
    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub roll_number: String,

    pub hostel_id: i32,

    /// Room of record. May be rewritten as a side effect of out-pass
    /// creation when the submitted room differs and is not "UNKNOWN".
    pub room_number: String,

    pub banned: bool,

    /// Informational only. A set expiry does not clear the flag.
    pub banned_till: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::hostels::Entity",
        from = "Column::HostelId",
        to = "super::hostels::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Hostels,
    #[sea_orm(has_many = "super::outpasses::Entity")]
    Outpasses,
}

impl Related<super::hostels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hostels.def()
    }
}

impl Related<super::outpasses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Outpasses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
