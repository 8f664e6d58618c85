use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable link between a credit lot and the lot that replaced it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_renewals")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub student_id: Uuid,
    pub original_credit_id: Uuid,
    pub renewed_credit_id: Uuid,
    pub renewal_date: TimeDateTimeWithTimeZone,
    pub renewal_reason: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
