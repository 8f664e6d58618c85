use super::sea_orm_active_enums::TurmaStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A recurring class group.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "turmas")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub course_name: String,
    pub instructor_name: String,
    pub room: String,
    pub max_students: i32,
    pub status: TurmaStatus,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::turma_lessons::Entity")]
    TurmaLessons,
    #[sea_orm(has_many = "super::turma_students::Entity")]
    TurmaStudents,
}

impl Related<super::turma_lessons::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TurmaLessons.def()
    }
}

impl Related<super::turma_students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TurmaStudents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
