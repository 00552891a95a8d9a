use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{hostels, prelude::*};
use crate::models::Hostel;

pub struct HostelRepository {
    conn: DatabaseConnection,
}

impl HostelRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, name: &str, slug: &str, gender: &str) -> Result<Hostel> {
        let active = hostels::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            gender: Set(gender.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert hostel")?;

        info!("Created hostel {} ({})", model.id, model.slug);

        Ok(Hostel::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Hostel>> {
        let model = Hostels::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query hostel")?;

        Ok(model.map(Hostel::from))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Hostel>> {
        let model = Hostels::find()
            .filter(hostels::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query hostel by slug")?;

        Ok(model.map(Hostel::from))
    }

    pub async fn list_all(&self) -> Result<Vec<Hostel>> {
        let rows = Hostels::find()
            .order_by_asc(hostels::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list hostels")?;

        Ok(rows.into_iter().map(Hostel::from).collect())
    }
}
