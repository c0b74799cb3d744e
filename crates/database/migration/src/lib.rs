//! Database migrations for the Postman message store.

pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_message_table;
mod m20250601_000002_create_watermark_table;
mod m20250601_000003_create_anchoring_table;
mod m20250601_000004_add_message_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_message_table::Migration),
            Box::new(m20250601_000002_create_watermark_table::Migration),
            Box::new(m20250601_000003_create_anchoring_table::Migration),
            Box::new(m20250601_000004_add_message_indexes::Migration),
        ]
    }
}
