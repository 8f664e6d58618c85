use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_plans")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub credit_quantity: Option<i32>,
    pub credit_validity_days: Option<i32>,
    pub auto_renew_credits: bool,
    pub max_auto_renewals: Option<i32>,
    pub renewal_interval_days: Option<i32>,
    pub allow_refund: bool,
    pub refund_days_before_exp: Option<i32>,
    pub is_active: bool,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::student_credits::Entity")]
    StudentCredits,
}

impl Related<super::student_credits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentCredits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
