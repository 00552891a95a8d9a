use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "outpasses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub hosteler_id: i32,

    pub hostel_id: i32,

    /// Copied from the hosteler at request time.
    pub room_number: String,

    pub address: String,

    /// Closed enum, see `domain::OutPassReason`. Stored as its string form.
    pub reason: String,

    pub expected_out_time: String,

    pub expected_in_time: String,

    /// Set exactly once, by the exit gate event.
    pub actual_out_time: Option<String>,

    /// Set exactly once, by the entry gate event.
    pub actual_in_time: Option<String>,

    /// Closed enum, see `domain::OutPassStatus`. Stored as its string form;
    /// transitions go through conditional updates keyed on this column.
    pub status: String,

    /// Derived from reason + expected_in_time at creation, never
    /// user-supplied.
    pub valid_till: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::hostelers::Entity",
        from = "Column::HostelerId",
        to = "super::hostelers::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Hostelers,
    #[sea_orm(
        belongs_to = "super::hostels::Entity",
        from = "Column::HostelId",
        to = "super::hostels::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Hostels,
}

impl Related<super::hostelers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hostelers.def()
    }
}

impl Related<super::hostels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hostels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
