use sea_orm_migration::{
  prelude::*,
  schema::{double, string_len, timestamp_with_time_zone},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Rating::Table)
          .if_not_exists()
          .col(string_len(Rating::UserId, 36).not_null())
          .col(string_len(Rating::ProductId, 36).not_null())
          .col(double(Rating::Rating).not_null())
          .col(timestamp_with_time_zone(Rating::UpdatedAt).not_null().default(Expr::current_timestamp()))
          .primary_key(Index::create().col(Rating::UserId).col(Rating::ProductId))
          .to_owned(),
      )
      .await?;

    // Product-side lookups (ratings of one product, cascade on product delete)
    manager
      .create_index(
        Index::create()
          .name("idx_rating_product_id")
          .table(Rating::Table)
          .col(Rating::ProductId)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Rating::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Rating {
  Table,

  UserId,    // opaque user id
  ProductId, // opaque product id, no FK: ratings may reference unknown products
  Rating,    // bounded value, checked by the application
  UpdatedAt,
}
