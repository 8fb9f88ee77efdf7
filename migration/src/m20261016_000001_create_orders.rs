use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per customer order, keyed by the short public order id
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::OrderId)
                            .string_len(16)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::Email).text().not_null())
                    .col(ColumnDef::new(Orders::Udid).text().not_null())
                    .col(ColumnDef::new(Orders::Timestamp).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::DownloadLink)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Orders::ReceiptUrl).text().not_null())
                    .to_owned(),
            )
            .await?;

        // Pending orders are looked up by status
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Orders {
    Table,
    OrderId,
    Email,
    Udid,
    Timestamp,
    Status,
    DownloadLink,
    ReceiptUrl,
}
