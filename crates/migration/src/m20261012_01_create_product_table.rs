use sea_orm_migration::{
  prelude::*,
  schema::{string_len, text, timestamp_with_time_zone},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Product::Table)
          .if_not_exists()
          .col(string_len(Product::Id, 36).primary_key())
          .col(text(Product::Title).not_null())
          .col(text(Product::Description).not_null().default(""))
          .col(timestamp_with_time_zone(Product::CreatedAt).not_null().default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(Product::UpdatedAt).not_null().default(Expr::current_timestamp()))
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Product::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Product {
  Table,

  Id,          // opaque catalog id, uuid v7 unless supplied
  Title,
  Description,
  CreatedAt,
  UpdatedAt,
}
