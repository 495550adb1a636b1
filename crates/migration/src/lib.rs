pub use sea_orm_migration::*;

mod m20261012_01_create_product_table;
mod m20261012_02_create_rating_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261012_01_create_product_table::Migration),
      Box::new(m20261012_02_create_rating_table::Migration),
    ]
  }
}
