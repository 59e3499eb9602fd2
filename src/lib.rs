#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::mail::{MailTransport, SmtpMailTransport};
use crate::adapters::storage::{DailyLogStore, RecordStore};
use crate::api::ServiceContainer;
use crate::config::Config;
use crate::services::health_service::HealthService;
use crate::services::retry_policy::RetryPolicy;
use crate::services::submission_service::SubmissionService;
use crate::workers::SubmissionDispatcher;
use std::sync::Arc;
use tokio::sync::watch;

/// Fully wired application components.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
}

/// Wires components from an explicit `Config`.
///
/// The SMTP transport defaults to `SmtpMailTransport`; tests substitute their own.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    transport: Option<Arc<dyn MailTransport>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, transport: None }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn build(self) -> App {
        let config = self.config;

        let store = Arc::new(DailyLogStore::new(config.storage.data_dir.clone()));
        let transport =
            self.transport.unwrap_or_else(|| Arc::new(SmtpMailTransport::new(config.smtp.clone())));

        let record_store: Arc<dyn RecordStore> = Arc::clone(&store) as Arc<dyn RecordStore>;
        let submission_service = SubmissionService::new(
            record_store,
            transport,
            RetryPolicy::from_config(&config.delivery),
            config.smtp.clone(),
        );
        let dispatcher = SubmissionDispatcher::new(submission_service, config.delivery.concurrency);
        let health_service = HealthService::new(store, config);

        App { services: ServiceContainer { dispatcher, health_service } }
    }
}

/// Logs the effective delivery mode at startup without exposing credentials.
pub fn log_startup(config: &Config) {
    tracing::info!(
        data_dir = %config.storage.data_dir.display(),
        dry_run = config.smtp.dry_run,
        smtp_configured = config.smtp.is_configured(),
        smtp_port = config.smtp.port,
        cors_origins = ?config.cors.origins(),
        "Contact relay starting"
    );
    if !config.smtp.dry_run && !config.smtp.is_configured() {
        tracing::warn!(missing = ?config.smtp.missing_fields(), "SMTP is not fully configured; submissions will only be recorded");
    }
}

/// Flips `shutdown_tx` on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through `tracing` so they reach structured log sinks.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        tracing::error!(panic = %info, location = %location, "Process panicked");
        default_hook(info);
    }));
}
