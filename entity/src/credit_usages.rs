use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One debit against a credit lot, tied to the attendance that caused it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_usages")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub student_id: Uuid,
    pub credit_id: Uuid,
    pub attendance_id: Uuid,
    pub credits_used: i32,
    pub description: String,
    pub used_at: TimeDateTimeWithTimeZone,
    pub refunded_at: Option<TimeDateTimeWithTimeZone>,
    pub refund_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student_credits::Entity",
        from = "Column::CreditId",
        to = "super::student_credits::Column::Id"
    )]
    StudentCredit,
}

impl Related<super::student_credits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentCredit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
