#![allow(dead_code)]
use async_trait::async_trait;
use clap::Parser;
use contact_relay::adapters::mail::{MailTransport, TransportError};
use contact_relay::api::{MgmtState, app_router, mgmt_router};
use contact_relay::config::Config;
use contact_relay::domain::delivery::OutboundMessage;
use contact_relay::workers::SubmissionDispatcher;
use contact_relay::AppBuilder;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;
use tokio::net::TcpListener;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("contact_relay=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Config pointing at `data_dir`, with fast retries and a complete (fake) SMTP setup.
pub fn get_test_config(data_dir: &std::path::Path, dry_run: bool) -> Config {
    let data_dir = data_dir.to_string_lossy().to_string();
    let mut args = vec![
        "contact-relay",
        "--host",
        "127.0.0.1",
        "--port",
        "0",
        "--mgmt-port",
        "0",
        "--data-dir",
        data_dir.as_str(),
        "--smtp-host",
        "smtp.example.com",
        "--smtp-port",
        "587",
        "--smtp-user",
        "relay@example.com",
        "--smtp-password",
        "secret",
        "--email-from",
        "site@example.com",
        "--email-to",
        "owner@example.com",
        "--delivery-min-delay-ms",
        "1",
        "--delivery-max-delay-ms",
        "5",
        "--cors-allow-origin",
        "*",
    ];
    if dry_run {
        args.push("--email-dry-run");
    }
    Config::try_parse_from(args).unwrap()
}

/// Transport stub that records every message and fails the first `fail_first` attempts.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub calls: AtomicU32,
    fail_first: u32,
    permanent: bool,
}

impl RecordingTransport {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_first(n: u32) -> Arc<Self> {
        Arc::new(Self { fail_first: n, ..Self::default() })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing_first(u32::MAX)
    }

    pub fn rejecting_message() -> Arc<Self> {
        Arc::new(Self { fail_first: u32::MAX, permanent: true, ..Self::default() })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_first {
            return Err(if self.permanent {
                TransportError::Message("malformed message".to_string())
            } else {
                TransportError::Unavailable(format!("connection refused (attempt {call})"))
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub config: Config,
    pub data_dir: TempDir,
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub transport: Arc<RecordingTransport>,
    pub dispatcher: SubmissionDispatcher,
}

impl TestApp {
    pub async fn spawn(dry_run: bool) -> Self {
        Self::spawn_with_transport(dry_run, RecordingTransport::succeeding()).await
    }

    pub async fn spawn_with_transport(dry_run: bool, transport: Arc<RecordingTransport>) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let config = get_test_config(data_dir.path(), dry_run);
        Self::spawn_with_config(config, data_dir, transport).await
    }

    pub async fn spawn_with_config(config: Config, data_dir: TempDir, transport: Arc<RecordingTransport>) -> Self {
        setup_tracing();

        let app = AppBuilder::new(config.clone()).with_transport(Arc::clone(&transport) as Arc<dyn MailTransport>).build();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let router = app_router(config.clone(), &app.services);
        let mgmt = mgmt_router(MgmtState { health_service: app.services.health_service.clone() });

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt).await.unwrap();
        });

        Self {
            config,
            data_dir,
            server_url,
            mgmt_url,
            client: reqwest::Client::new(),
            transport,
            dispatcher: app.services.dispatcher,
        }
    }

    pub async fn send_contact(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client.post(format!("{}/send", self.server_url)).json(body).send().await.unwrap()
    }
}
