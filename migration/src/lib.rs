pub use sea_orm_migration::prelude::*;

mod m20241201_000001_create_profiles_table;
mod m20241202_000002_create_projects_table;
mod m20241204_000003_create_files_table;
mod m20241204_000004_create_timeline_events_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241201_000001_create_profiles_table::Migration),
            Box::new(m20241202_000002_create_projects_table::Migration),
            Box::new(m20241204_000003_create_files_table::Migration),
            Box::new(m20241204_000004_create_timeline_events_table::Migration),
        ]
    }
}
