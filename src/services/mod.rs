pub mod health_service;
pub mod retry_policy;
pub mod submission_service;
