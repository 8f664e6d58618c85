use super::sea_orm_active_enums::CreditStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A lot of prepaid class credits granted to a student by a plan purchase or renewal.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_credits")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub student_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub total_credits: i32,
    pub credits_used: i32,
    pub status: CreditStatus,
    pub auto_renew: bool,
    pub renewal_count: i32,
    pub next_renewal_date: Option<TimeDateTimeWithTimeZone>,
    pub purchased_at: TimeDateTimeWithTimeZone,
    pub expires_at: Option<TimeDateTimeWithTimeZone>,
    pub previous_credit_id: Option<Uuid>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::billing_plans::Entity",
        from = "Column::PlanId",
        to = "super::billing_plans::Column::Id"
    )]
    BillingPlan,
    #[sea_orm(has_many = "super::credit_usages::Entity")]
    CreditUsages,
}

impl Related<super::billing_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillingPlan.def()
    }
}

impl Related<super::credit_usages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
