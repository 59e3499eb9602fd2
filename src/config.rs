use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Port on which SMTP relays expect an implicitly encrypted (TLS-wrapped) session.
pub const SMTP_SSL_PORT: u16 = 465;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub cors: CorsConfig,

    #[command(flatten)]
    pub storage: StorageConfig,

    #[command(flatten)]
    pub smtp: SmtpConfig,

    #[command(flatten)]
    pub delivery: DeliveryConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "RELAY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Port for the management (liveness/readiness) server
    #[arg(long, env = "RELAY_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// How long to wait for in-flight submissions on shutdown
    #[arg(long, env = "RELAY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*` for any origin
    #[arg(long = "cors-allow-origin", env = "CORS_ALLOW_ORIGIN", default_value = "*", value_delimiter = ',')]
    pub allow_origin: Vec<String>,
}

impl CorsConfig {
    /// Origins with surrounding whitespace and empty entries removed.
    #[must_use]
    pub fn origins(&self) -> Vec<String> {
        self.allow_origin.iter().map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect()
    }

    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.origins().iter().any(|o| o == "*")
    }
}

#[derive(Clone, Debug, Args)]
pub struct StorageConfig {
    /// Directory holding the daily contact partitions
    #[arg(long = "data-dir", env = "RELAY_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct SmtpConfig {
    /// SMTP relay hostname
    #[arg(id = "smtp_host", long = "smtp-host", env = "SMTP_HOST")]
    pub host: Option<String>,

    /// SMTP relay port (465 selects implicit TLS, anything else STARTTLS)
    #[arg(id = "smtp_port", long = "smtp-port", env = "SMTP_PORT", default_value_t = 587)]
    pub port: u16,

    /// SMTP username
    #[arg(id = "smtp_user", long = "smtp-user", env = "SMTP_USER")]
    pub user: Option<String>,

    /// SMTP password
    #[arg(long = "smtp-password", env = "SMTP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Sender address (defaults to the SMTP username)
    #[arg(long = "email-from", env = "EMAIL_FROM")]
    pub from: Option<String>,

    /// Recipient of relayed contact messages
    #[arg(long = "email-to", env = "EMAIL_TO")]
    pub to: Option<String>,

    /// Record submissions without sending any email
    #[arg(
        long = "email-dry-run",
        env = "EMAIL_DRY_RUN",
        default_value_t = false,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub dry_run: bool,

    /// Per-attempt connect and I/O timeout
    #[arg(long = "smtp-timeout-secs", env = "SMTP_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

impl SmtpConfig {
    /// Names of the settings that must be present before a message can be relayed.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("SMTP_HOST", &self.host),
            ("SMTP_USER", &self.user),
            ("SMTP_PASSWORD", &self.password),
            ("EMAIL_TO", &self.to),
        ];

        required
            .into_iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// The envelope sender, falling back to the authenticating user.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().filter(|f| !f.trim().is_empty()).or(self.user.as_deref())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Args)]
pub struct DeliveryConfig {
    /// Total send attempts per submission, including the first
    #[arg(long = "delivery-max-attempts", env = "RELAY_DELIVERY_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: usize,

    /// Backoff before the first retry
    #[arg(long = "delivery-min-delay-ms", env = "RELAY_DELIVERY_MIN_DELAY_MS", default_value_t = 1000)]
    pub min_delay_ms: u64,

    /// Upper bound on any single backoff
    #[arg(long = "delivery-max-delay-ms", env = "RELAY_DELIVERY_MAX_DELAY_MS", default_value_t = 10_000)]
    pub max_delay_ms: u64,

    /// Maximum number of submissions processed concurrently
    #[arg(long = "delivery-concurrency", env = "RELAY_DELIVERY_CONCURRENCY", default_value_t = 16)]
    pub concurrency: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, min_delay_ms: 1000, max_delay_ms: 10_000, concurrency: 16 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long = "log-format", env = "RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP/HTTP collector endpoint for traces and metrics
    #[arg(long = "otlp-endpoint", env = "RELAY_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["contact-relay"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_smtp_missing_fields_reported_by_name() {
        let config = parse(&["--smtp-host", "smtp.example.com", "--smtp-user", "relay"]);
        assert_eq!(config.smtp.missing_fields(), vec!["SMTP_PASSWORD", "EMAIL_TO"]);
        assert!(!config.smtp.is_configured());
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let config = parse(&[
            "--smtp-host",
            " ",
            "--smtp-user",
            "relay",
            "--smtp-password",
            "secret",
            "--email-to",
            "owner@example.com",
        ]);
        assert_eq!(config.smtp.missing_fields(), vec!["SMTP_HOST"]);
    }

    #[test]
    fn test_sender_falls_back_to_user() {
        let config = parse(&["--smtp-user", "relay@example.com"]);
        assert_eq!(config.smtp.sender(), Some("relay@example.com"));

        let config = parse(&["--smtp-user", "relay@example.com", "--email-from", "site@example.com"]);
        assert_eq!(config.smtp.sender(), Some("site@example.com"));
    }

    #[test]
    fn test_defaults_parse_without_arguments() {
        let config = parse(&[]);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.smtp.port, 587);
        assert!(config.smtp.host.is_none());
        assert!(config.smtp.user.is_none());
        assert!(!config.smtp.dry_run);
        assert_eq!(config.smtp.missing_fields(), vec!["SMTP_HOST", "SMTP_USER", "SMTP_PASSWORD", "EMAIL_TO"]);
    }

    #[test]
    fn test_server_and_smtp_ports_are_independent() {
        let config = parse(&["--port", "8000", "--smtp-port", "465"]);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.smtp.port, SMTP_SSL_PORT);

        let config = parse(&["--host", "127.0.0.1", "--smtp-host", "smtp.example.com", "--email-dry-run"]);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.smtp.host.as_deref(), Some("smtp.example.com"));
        assert!(config.smtp.dry_run);
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }

    #[test]
    fn test_cors_origin_list() {
        let config = parse(&["--cors-allow-origin", "https://a.example, https://b.example,"]);
        assert_eq!(config.cors.origins(), vec!["https://a.example", "https://b.example"]);
        assert!(!config.cors.allows_any());
    }
}
