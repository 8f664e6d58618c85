// Service modules
pub mod availability;
pub mod checkin_service;
pub mod credits_service;
pub mod turmas_service;

pub use checkin_service::CheckInService;
pub use credits_service::{CreditDebit, CreditsService};
pub use turmas_service::TurmasService;
