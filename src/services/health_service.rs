use crate::adapters::storage::DailyLogStore;
use crate::api::schemas::health::{ConfigStatus, ServiceStatus};
use crate::config::Config;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub const SERVICE_NAME: &str = "Contact Relay";

const STORAGE_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("contact-relay");
        Self {
            status: meter
                .i64_gauge("contact_relay_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    store: Arc<DailyLogStore>,
    config: Config,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(store: Arc<DailyLogStore>, config: Config) -> Self {
        Self { store, config, metrics: Metrics::new() }
    }

    /// Checks that the data directory accepts writes.
    ///
    /// # Errors
    /// Returns a string describing the failure if the directory is unwritable or the probe hangs.
    pub async fn check_storage(&self) -> Result<(), String> {
        match timeout(STORAGE_CHECK_TIMEOUT, self.store.probe()).await {
            Ok(Ok(())) => {
                self.metrics.status.record(1, &[KeyValue::new("component", "storage")]);
                Ok(())
            }
            Ok(Err(e)) => {
                self.metrics.status.record(0, &[KeyValue::new("component", "storage")]);
                Err(format!("Data directory check failed: {e}"))
            }
            Err(_) => {
                self.metrics.status.record(0, &[KeyValue::new("component", "storage")]);
                Err("Data directory check timed out".to_string())
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            email_provider: "smtp".to_string(),
            dry_run_mode: self.config.smtp.dry_run,
        }
    }

    /// Non-sensitive view of the delivery configuration.
    #[must_use]
    pub fn config_status(&self) -> ConfigStatus {
        let smtp = &self.config.smtp;
        let is_set = |v: Option<&str>| v.is_some_and(|v| !v.trim().is_empty());

        ConfigStatus {
            smtp_configured: smtp.is_configured(),
            email_from_set: is_set(smtp.from.as_deref()),
            email_to_set: is_set(smtp.to.as_deref()),
            dry_run: smtp.dry_run,
            cors_origins: self.config.cors.origins().len(),
        }
    }
}
