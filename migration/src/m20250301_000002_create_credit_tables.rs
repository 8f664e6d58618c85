use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_tenancy_tables::{BillingPlans, Organizations, Students};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Credit lots granted by plan purchases and renewals
        manager
            .create_table(
                Table::create()
                    .table(StudentCredits::Table)
                    .if_not_exists()
                    .col(pk_uuid(StudentCredits::Id))
                    .col(uuid(StudentCredits::OrganizationId).not_null())
                    .col(uuid(StudentCredits::StudentId).not_null())
                    .col(uuid_null(StudentCredits::PlanId))
                    .col(integer(StudentCredits::TotalCredits).not_null())
                    .col(integer(StudentCredits::CreditsUsed).default(0).not_null())
                    .col(
                        string_len(StudentCredits::Status, 20)
                            .default("ACTIVE")
                            .not_null(),
                    )
                    .col(boolean(StudentCredits::AutoRenew).default(false).not_null())
                    .col(integer(StudentCredits::RenewalCount).default(0).not_null())
                    .col(timestamp_with_time_zone_null(StudentCredits::NextRenewalDate))
                    .col(timestamp_with_time_zone(StudentCredits::PurchasedAt).not_null())
                    .col(timestamp_with_time_zone_null(StudentCredits::ExpiresAt))
                    .col(uuid_null(StudentCredits::PreviousCreditId))
                    .col(
                        timestamp_with_time_zone(StudentCredits::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(StudentCredits::UpdatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .check(Expr::col(StudentCredits::CreditsUsed).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_credits_organization_id")
                            .from(StudentCredits::Table, StudentCredits::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_credits_student_id")
                            .from(StudentCredits::Table, StudentCredits::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_credits_plan_id")
                            .from(StudentCredits::Table, StudentCredits::PlanId)
                            .to(BillingPlans::Table, BillingPlans::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups are always (organization, student, status)
        manager
            .create_index(
                Index::create()
                    .name("idx_student_credits_org_student_status")
                    .table(StudentCredits::Table)
                    .col(StudentCredits::OrganizationId)
                    .col(StudentCredits::StudentId)
                    .col(StudentCredits::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_student_credits_expires_at")
                    .table(StudentCredits::Table)
                    .col(StudentCredits::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditUsages::Table)
                    .if_not_exists()
                    .col(pk_uuid(CreditUsages::Id))
                    .col(uuid(CreditUsages::OrganizationId).not_null())
                    .col(uuid(CreditUsages::StudentId).not_null())
                    .col(uuid(CreditUsages::CreditId).not_null())
                    .col(uuid(CreditUsages::AttendanceId).not_null())
                    .col(integer(CreditUsages::CreditsUsed).not_null())
                    .col(string(CreditUsages::Description).not_null())
                    .col(timestamp_with_time_zone(CreditUsages::UsedAt).not_null())
                    .col(timestamp_with_time_zone_null(CreditUsages::RefundedAt))
                    .col(string_null(CreditUsages::RefundReason))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_usages_credit_id")
                            .from(CreditUsages::Table, CreditUsages::CreditId)
                            .to(StudentCredits::Table, StudentCredits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_credit_usages_credit_id")
                    .table(CreditUsages::Table)
                    .col(CreditUsages::CreditId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditRenewals::Table)
                    .if_not_exists()
                    .col(pk_uuid(CreditRenewals::Id))
                    .col(uuid(CreditRenewals::OrganizationId).not_null())
                    .col(uuid(CreditRenewals::StudentId).not_null())
                    .col(uuid(CreditRenewals::OriginalCreditId).not_null())
                    .col(uuid(CreditRenewals::RenewedCreditId).not_null())
                    .col(timestamp_with_time_zone(CreditRenewals::RenewalDate).not_null())
                    .col(string(CreditRenewals::RenewalReason).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_renewals_original_credit_id")
                            .from(CreditRenewals::Table, CreditRenewals::OriginalCreditId)
                            .to(StudentCredits::Table, StudentCredits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_renewals_renewed_credit_id")
                            .from(CreditRenewals::Table, CreditRenewals::RenewedCreditId)
                            .to(StudentCredits::Table, StudentCredits::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_credit_renewals_org_student")
                    .table(CreditRenewals::Table)
                    .col(CreditRenewals::OrganizationId)
                    .col(CreditRenewals::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditRenewals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CreditUsages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudentCredits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StudentCredits {
    Table,
    Id,
    OrganizationId,
    StudentId,
    PlanId,
    TotalCredits,
    CreditsUsed,
    Status,
    AutoRenew,
    RenewalCount,
    NextRenewalDate,
    PurchasedAt,
    ExpiresAt,
    PreviousCreditId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CreditUsages {
    Table,
    Id,
    OrganizationId,
    StudentId,
    CreditId,
    AttendanceId,
    CreditsUsed,
    Description,
    UsedAt,
    RefundedAt,
    RefundReason,
}

#[derive(DeriveIden)]
enum CreditRenewals {
    Table,
    Id,
    OrganizationId,
    StudentId,
    OriginalCreditId,
    RenewedCreditId,
    RenewalDate,
    RenewalReason,
}
