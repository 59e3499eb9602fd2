use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub email_provider: String,
    pub dry_run_mode: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigStatus {
    pub smtp_configured: bool,
    pub email_from_set: bool,
    pub email_to_set: bool,
    pub dry_run: bool,
    pub cors_origins: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedHealth {
    #[serde(flatten)]
    pub status: ServiceStatus,
    pub config: ConfigStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub storage: String,
}
