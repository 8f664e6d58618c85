use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Organizations are the tenant boundary (FIRST - everything references them)
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(pk_uuid(Organizations::Id))
                    .col(string(Organizations::Name).not_null())
                    .col(string(Organizations::Slug).not_null().unique_key())
                    .col(boolean(Organizations::IsActive).default(true).not_null())
                    .col(
                        timestamp_with_time_zone(Organizations::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(pk_uuid(Students::Id))
                    .col(uuid(Students::OrganizationId).not_null())
                    .col(string(Students::FullName).not_null())
                    .col(string_null(Students::Email))
                    .col(boolean(Students::IsActive).default(true).not_null())
                    .col(
                        timestamp_with_time_zone(Students::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_students_organization_id")
                            .from(Students::Table, Students::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_students_organization_id")
                    .table(Students::Table)
                    .col(Students::OrganizationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BillingPlans::Table)
                    .if_not_exists()
                    .col(pk_uuid(BillingPlans::Id))
                    .col(uuid(BillingPlans::OrganizationId).not_null())
                    .col(string(BillingPlans::Name).not_null())
                    .col(big_integer(BillingPlans::PriceCents).default(0).not_null())
                    .col(integer_null(BillingPlans::CreditQuantity))
                    .col(integer_null(BillingPlans::CreditValidityDays))
                    .col(
                        boolean(BillingPlans::AutoRenewCredits)
                            .default(false)
                            .not_null(),
                    )
                    .col(integer_null(BillingPlans::MaxAutoRenewals))
                    .col(integer_null(BillingPlans::RenewalIntervalDays))
                    .col(boolean(BillingPlans::IsActive).default(true).not_null())
                    .col(
                        timestamp_with_time_zone(BillingPlans::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_billing_plans_organization_id")
                            .from(BillingPlans::Table, BillingPlans::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BillingPlans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Organizations {
    Table,
    Id,
    Name,
    Slug,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Students {
    Table,
    Id,
    OrganizationId,
    FullName,
    Email,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum BillingPlans {
    Table,
    Id,
    OrganizationId,
    Name,
    PriceCents,
    CreditQuantity,
    CreditValidityDays,
    AutoRenewCredits,
    MaxAutoRenewals,
    RenewalIntervalDays,
    IsActive,
    CreatedAt,
}
