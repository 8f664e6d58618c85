// Request/Response models
pub mod common;
pub mod credits;
pub mod student_credits_ext; // Extension methods for entity::student_credits
pub mod tenant;
pub mod turmas;
