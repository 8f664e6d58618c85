use super::sea_orm_active_enums::LessonStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One dated occurrence of a turma. `start_time` is academy local wall clock.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "turma_lessons")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub turma_id: Uuid,
    pub lesson_number: i32,
    pub title: String,
    pub lesson_date: TimeDate,
    pub start_time: TimeTime,
    pub duration_minutes: i32,
    pub status: LessonStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::turmas::Entity",
        from = "Column::TurmaId",
        to = "super::turmas::Column::Id"
    )]
    Turma,
}

impl Related<super::turmas::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Turma.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
