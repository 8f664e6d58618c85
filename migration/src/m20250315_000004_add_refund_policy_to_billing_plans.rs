use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_tenancy_tables::BillingPlans;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One column per statement so SQLite can apply it too
        manager
            .alter_table(
                Table::alter()
                    .table(BillingPlans::Table)
                    .add_column(boolean(RefundPolicy::AllowRefund).default(false).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(BillingPlans::Table)
                    .add_column(integer_null(RefundPolicy::RefundDaysBeforeExp))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(BillingPlans::Table)
                    .drop_column(RefundPolicy::RefundDaysBeforeExp)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(BillingPlans::Table)
                    .drop_column(RefundPolicy::AllowRefund)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum RefundPolicy {
    AllowRefund,
    RefundDaysBeforeExp,
}
