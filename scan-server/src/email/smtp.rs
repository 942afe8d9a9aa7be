//! SMTP-based email sender for production

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::EmailSender;

/// Port that uses STARTTLS rather than implicit TLS
const SUBMISSION_PORT: u16 = 587;

const DEFAULT_FROM_NAME: &str = "SCAN App";

/// Configuration for SMTP email sending
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// 465 for implicit TLS, 587 for STARTTLS
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl SmtpConfig {
    /// Create config from environment variables
    ///
    /// Required: `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`.
    /// Optional: `SMTP_PORT` (default 465), `SMTP_FROM_EMAIL` (defaults to
    /// the username), `SMTP_FROM_NAME`.
    pub fn from_env() -> Option<Self> {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        let host = get_env("SMTP_HOST")?;
        let username = get_env("SMTP_USERNAME")?;
        let password = get_env("SMTP_PASSWORD")?;

        Some(Self {
            host,
            port: get_env("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(465),
            from_email: get_env("SMTP_FROM_EMAIL").unwrap_or_else(|| username.clone()),
            from_name: get_env("SMTP_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            username,
            password,
        })
    }
}

/// SMTP email sender for production use
pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build the transport and check the server answers
    pub fn new(config: SmtpConfig) -> Result<Self, String> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| format!("Invalid from address: {}", e))?;

        let builder = if config.port == SUBMISSION_PORT {
            SmtpTransport::starttls_relay(&config.host)
        } else {
            SmtpTransport::relay(&config.host)
        }
        .map_err(|e| format!("Failed to create SMTP transport: {}", e))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        transport
            .test_connection()
            .map_err(|e| format!("SMTP connection test failed: {}", e))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP connection established");

        Ok(Self { transport, from })
    }
}

impl EmailSender for SmtpEmailSender {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let to_addr = to
            .parse::<Mailbox>()
            .map_err(|e| format!("Invalid to address: {}", e))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(&email)
            .map_err(|e| format!("Failed to send email: {}", e))?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}
