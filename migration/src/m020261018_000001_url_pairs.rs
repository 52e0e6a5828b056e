use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // short_code 作为主键，数据库层面保证唯一
        manager
            .create_table(
                Table::create()
                    .table(UrlPair::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UrlPair::ShortCode)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UrlPair::OwnerId).string().not_null())
                    .col(ColumnDef::new(UrlPair::OriginalUrl).text().not_null())
                    .col(
                        ColumnDef::new(UrlPair::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UrlPair::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按用户批量查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_url_pairs_owner_id")
                    .table(UrlPair::Table)
                    .col(UrlPair::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_url_pairs_owner_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(UrlPair::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UrlPair {
    #[sea_orm(iden = "url_pairs")]
    Table,
    ShortCode,
    OwnerId,
    OriginalUrl,
    Deleted,
    CreatedAt,
}
