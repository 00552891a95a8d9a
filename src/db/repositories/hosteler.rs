use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{hostelers, prelude::*};
use crate::models::Hosteler;

/// New hosteler registration input.
#[derive(Debug, Clone)]
pub struct NewHosteler {
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub hostel_id: i32,
    pub room_number: String,
}

pub struct HostelerRepository {
    conn: DatabaseConnection,
}

impl HostelerRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, new: &NewHosteler) -> Result<Hosteler> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = hostelers::ActiveModel {
            name: Set(new.name.clone()),
            email: Set(new.email.clone()),
            roll_number: Set(new.roll_number.clone()),
            hostel_id: Set(new.hostel_id),
            room_number: Set(new.room_number.clone()),
            banned: Set(false),
            banned_till: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert hosteler")?;

        info!(
            "Registered hosteler {} ({}) in hostel {}",
            model.id, model.roll_number, model.hostel_id
        );

        Ok(Hosteler::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Hosteler>> {
        let model = Hostelers::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query hosteler")?;

        Ok(model.map(Hosteler::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Hosteler>> {
        let model = Hostelers::find()
            .filter(hostelers::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query hosteler by email")?;

        Ok(model.map(Hosteler::from))
    }

    pub async fn list_for_hostel(&self, hostel_id: i32) -> Result<Vec<Hosteler>> {
        let rows = Hostelers::find()
            .filter(hostelers::Column::HostelId.eq(hostel_id))
            .order_by_asc(hostelers::Column::RollNumber)
            .all(&self.conn)
            .await
            .context("Failed to list hostelers")?;

        Ok(rows.into_iter().map(Hosteler::from).collect())
    }

    /// Rewrites the room of record (the out-pass creation side effect).
    pub async fn update_room(&self, id: i32, room_number: &str) -> Result<bool> {
        let result = Hostelers::update_many()
            .col_expr(
                hostelers::Column::RoomNumber,
                sea_orm::sea_query::Expr::value(room_number),
            )
            .col_expr(
                hostelers::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(hostelers::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update hosteler room")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn set_ban(
        &self,
        id: i32,
        banned: bool,
        banned_till: Option<&str>,
    ) -> Result<bool> {
        let result = Hostelers::update_many()
            .col_expr(
                hostelers::Column::Banned,
                sea_orm::sea_query::Expr::value(banned),
            )
            .col_expr(
                hostelers::Column::BannedTill,
                sea_orm::sea_query::Expr::value(banned_till),
            )
            .col_expr(
                hostelers::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(hostelers::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update hosteler ban state")?;

        if result.rows_affected > 0 {
            info!("Hosteler {} ban set to {}", id, banned);
        }

        Ok(result.rows_affected > 0)
    }
}
