use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::domain::{GateEvent, OutPassStatus};
use crate::models::{Hostel, Hosteler, HostelPageFilter, NewOutPass, OutPass, OutPassWithRefs};

pub mod migrator;
pub mod repositories;

pub use repositories::hosteler::NewHosteler;
pub use repositories::user::{User, generate_api_key, hash_password};

/// Facade over the SQLite connection and the per-aggregate repositories.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn outpass_repo(&self) -> repositories::outpass::OutPassRepository {
        repositories::outpass::OutPassRepository::new(self.conn.clone())
    }

    fn hosteler_repo(&self) -> repositories::hosteler::HostelerRepository {
        repositories::hosteler::HostelerRepository::new(self.conn.clone())
    }

    fn hostel_repo(&self) -> repositories::hostel::HostelRepository {
        repositories::hostel::HostelRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Out-passes
    // ========================================================================

    pub async fn insert_outpass(&self, new: &NewOutPass) -> Result<OutPass> {
        self.outpass_repo().insert(new).await
    }

    pub async fn get_outpass(&self, id: i32) -> Result<Option<OutPass>> {
        self.outpass_repo().get(id).await
    }

    pub async fn get_outpass_with_refs(&self, id: i32) -> Result<Option<OutPassWithRefs>> {
        self.outpass_repo().get_with_refs(id).await
    }

    pub async fn list_outpasses_for_hosteler(
        &self,
        hosteler_id: i32,
        limit: u64,
    ) -> Result<Vec<OutPass>> {
        self.outpass_repo().list_for_hosteler(hosteler_id, limit).await
    }

    pub async fn list_outpasses_for_hostel(
        &self,
        hostel_id: i32,
        filter: &HostelPageFilter,
    ) -> Result<Vec<OutPassWithRefs>> {
        self.outpass_repo().list_for_hostel(hostel_id, filter).await
    }

    pub async fn transition_outpass_status(
        &self,
        id: i32,
        from: OutPassStatus,
        to: OutPassStatus,
    ) -> Result<bool> {
        self.outpass_repo().transition_status(id, from, to).await
    }

    pub async fn record_outpass_gate_event(
        &self,
        id: i32,
        event: GateEvent,
        stamp: &str,
    ) -> Result<bool> {
        self.outpass_repo().record_gate_event(id, event, stamp).await
    }

    // ========================================================================
    // Hostelers
    // ========================================================================

    pub async fn add_hosteler(&self, new: &NewHosteler) -> Result<Hosteler> {
        self.hosteler_repo().add(new).await
    }

    pub async fn get_hosteler(&self, id: i32) -> Result<Option<Hosteler>> {
        self.hosteler_repo().get(id).await
    }

    pub async fn get_hosteler_by_email(&self, email: &str) -> Result<Option<Hosteler>> {
        self.hosteler_repo().get_by_email(email).await
    }

    pub async fn list_hostelers(&self, hostel_id: i32) -> Result<Vec<Hosteler>> {
        self.hosteler_repo().list_for_hostel(hostel_id).await
    }

    pub async fn update_hosteler_room(&self, id: i32, room_number: &str) -> Result<bool> {
        self.hosteler_repo().update_room(id, room_number).await
    }

    pub async fn set_hosteler_ban(
        &self,
        id: i32,
        banned: bool,
        banned_till: Option<&str>,
    ) -> Result<bool> {
        self.hosteler_repo().set_ban(id, banned, banned_till).await
    }

    // ========================================================================
    // Hostels
    // ========================================================================

    pub async fn add_hostel(&self, name: &str, slug: &str, gender: &str) -> Result<Hostel> {
        self.hostel_repo().add(name, slug, gender).await
    }

    pub async fn get_hostel(&self, id: i32) -> Result<Option<Hostel>> {
        self.hostel_repo().get(id).await
    }

    pub async fn get_hostel_by_slug(&self, slug: &str) -> Result<Option<Hostel>> {
        self.hostel_repo().get_by_slug(slug).await
    }

    pub async fn list_hostels(&self) -> Result<Vec<Hostel>> {
        self.hostel_repo().list_all().await
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password, role, config)
            .await
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_password(
        &self,
        username: &str,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(username, new_password, config)
            .await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn get_user_api_key(&self, username: &str) -> Result<Option<String>> {
        self.user_repo().get_api_key(username).await
    }

    pub async fn regenerate_user_api_key(&self, username: &str) -> Result<String> {
        self.user_repo().regenerate_api_key(username).await
    }
}
