pub use super::billing_plans::Entity as BillingPlans;
pub use super::credit_renewals::Entity as CreditRenewals;
pub use super::credit_usages::Entity as CreditUsages;
pub use super::organizations::Entity as Organizations;
pub use super::student_credits::Entity as StudentCredits;
pub use super::students::Entity as Students;
pub use super::turma_attendances::Entity as TurmaAttendances;
pub use super::turma_lessons::Entity as TurmaLessons;
pub use super::turma_students::Entity as TurmaStudents;
pub use super::turmas::Entity as Turmas;
