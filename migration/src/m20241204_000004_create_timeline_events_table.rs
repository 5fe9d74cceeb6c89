use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No FK to files: events outlive the records they describe.
        manager
            .create_table(
                Table::create()
                    .table(TimelineEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TimelineEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TimelineEvents::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(TimelineEvents::UserId).uuid().not_null())
                    .col(ColumnDef::new(TimelineEvents::EventType).string().not_null())
                    .col(ColumnDef::new(TimelineEvents::EventAction).string().not_null())
                    .col(
                        ColumnDef::new(TimelineEvents::EventData)
                            .json()
                            .not_null()
                            .default(SimpleExpr::Custom("'{}'".to_owned())),
                    )
                    .col(ColumnDef::new(TimelineEvents::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TimelineEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TimelineEvents {
    Table,
    Id,
    ProjectId,
    UserId,
    EventType,
    EventAction,
    EventData,
    CreatedAt,
}
