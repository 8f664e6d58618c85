pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_tenancy_tables;
mod m20250301_000002_create_credit_tables;
mod m20250301_000003_create_turma_tables;
mod m20250315_000004_add_refund_policy_to_billing_plans;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_tenancy_tables::Migration),
            Box::new(m20250301_000002_create_credit_tables::Migration),
            Box::new(m20250301_000003_create_turma_tables::Migration),
            Box::new(m20250315_000004_add_refund_policy_to_billing_plans::Migration),
        ]
    }
}
