//! SeaORM entities for the academy schema.
//!
//! Every tenant-owned table carries an `organization_id` column (directly, or
//! through its turma) and all service queries filter on it.

pub mod prelude;

pub mod billing_plans;
pub mod credit_renewals;
pub mod credit_usages;
pub mod organizations;
pub mod sea_orm_active_enums;
pub mod student_credits;
pub mod students;
pub mod turma_attendances;
pub mod turma_lessons;
pub mod turma_students;
pub mod turmas;
