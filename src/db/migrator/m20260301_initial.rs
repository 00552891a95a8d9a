use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Hostels)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Hostelers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Outpasses)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // The hostel listing sorts and paginates on created_at; the status
        // column backs the conditional transition updates.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_outpasses_hostel_created")
                    .table(Outpasses)
                    .col(crate::entities::outpasses::Column::HostelId)
                    .col(crate::entities::outpasses::Column::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_outpasses_status")
                    .table(Outpasses)
                    .col(crate::entities::outpasses::Column::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Outpasses).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Hostelers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Hostels).to_owned())
            .await?;

        Ok(())
    }
}
