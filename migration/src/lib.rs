pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m020261018_000001_url_pairs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m020261018_000001_url_pairs::Migration)]
    }
}
