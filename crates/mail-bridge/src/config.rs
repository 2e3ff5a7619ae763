use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;

use crate::MailError;

/// How a connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte (IMAP 993, SMTP 465).
    Implicit,
    /// Plaintext greeting upgraded with STARTTLS (local bridges, SMTP 587).
    StartTls,
}

impl FromStr for TlsMode {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "implicit" | "tls" | "ssl" => Ok(TlsMode::Implicit),
            "starttls" => Ok(TlsMode::StartTls),
            other => Err(MailError::Config(format!(
                "unknown TLS mode '{}' (expected implicit or starttls)",
                other
            ))),
        }
    }
}

/// Account and server settings for the monitored mailbox.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// IMAP host (default: imap.gmail.com)
    pub imap_host: String,
    /// IMAP port (default: 993)
    pub imap_port: u16,
    /// IMAP TLS mode (default: implicit)
    pub imap_tls: TlsMode,
    /// SMTP host (default: smtp.gmail.com)
    pub smtp_host: String,
    /// SMTP port (default: 465)
    pub smtp_port: u16,
    /// SMTP TLS mode (default: implicit)
    pub smtp_tls: TlsMode,
    /// Account address, also the sender of outbound notices
    pub username: String,
    /// Account or app password
    password: SecretString,
    /// Accept self-signed certificates (local bridges only)
    pub accept_invalid_certs: bool,
}

impl MailConfig {
    /// Create a new configuration with explicit IMAP values and Gmail-style SMTP defaults.
    pub fn new(
        imap_host: impl Into<String>,
        imap_port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            imap_host: imap_host.into(),
            imap_port,
            imap_tls: TlsMode::Implicit,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            smtp_tls: TlsMode::Implicit,
            username: username.into(),
            password: SecretString::from(password.into()),
            accept_invalid_certs: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `MAIL_USERNAME` - account address
    /// - `MAIL_PASSWORD` - account or app password
    ///
    /// Optional (with defaults):
    /// - `MAIL_IMAP_HOST` - Default: imap.gmail.com
    /// - `MAIL_IMAP_PORT` - Default: 993
    /// - `MAIL_IMAP_TLS` - Default: implicit
    /// - `MAIL_SMTP_HOST` - Default: smtp.gmail.com
    /// - `MAIL_SMTP_PORT` - Default: 465
    /// - `MAIL_SMTP_TLS` - Default: implicit
    /// - `MAIL_ACCEPT_INVALID_CERTS` - Default: false
    pub fn from_env() -> Result<Self, MailError> {
        let imap_host = env::var("MAIL_IMAP_HOST").unwrap_or_else(|_| "imap.gmail.com".to_string());

        let imap_port = env::var("MAIL_IMAP_PORT")
            .unwrap_or_else(|_| "993".to_string())
            .parse::<u16>()
            .map_err(|e| MailError::Config(format!("Invalid MAIL_IMAP_PORT: {}", e)))?;

        let imap_tls = env::var("MAIL_IMAP_TLS")
            .unwrap_or_else(|_| "implicit".to_string())
            .parse::<TlsMode>()?;

        let smtp_host = env::var("MAIL_SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());

        let smtp_port = env::var("MAIL_SMTP_PORT")
            .unwrap_or_else(|_| "465".to_string())
            .parse::<u16>()
            .map_err(|e| MailError::Config(format!("Invalid MAIL_SMTP_PORT: {}", e)))?;

        let smtp_tls = env::var("MAIL_SMTP_TLS")
            .unwrap_or_else(|_| "implicit".to_string())
            .parse::<TlsMode>()?;

        let accept_invalid_certs = env::var("MAIL_ACCEPT_INVALID_CERTS")
            .ok()
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let username =
            env::var("MAIL_USERNAME").map_err(|_| MailError::MissingEnvVar("MAIL_USERNAME".to_string()))?;

        let password =
            env::var("MAIL_PASSWORD").map_err(|_| MailError::MissingEnvVar("MAIL_PASSWORD".to_string()))?;

        Ok(Self {
            imap_host,
            imap_port,
            imap_tls,
            smtp_host,
            smtp_port,
            smtp_tls,
            username,
            password: SecretString::from(password),
            accept_invalid_certs,
        })
    }

    /// Get the password (exposes the secret).
    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Builder method to set the IMAP TLS mode.
    pub fn with_imap_tls(mut self, mode: TlsMode) -> Self {
        self.imap_tls = mode;
        self
    }

    /// Builder method to set SMTP host and port.
    pub fn with_smtp(mut self, host: impl Into<String>, port: u16, mode: TlsMode) -> Self {
        self.smtp_host = host.into();
        self.smtp_port = port;
        self.smtp_tls = mode;
        self
    }

    /// Builder method to accept self-signed certificates.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_mode_parse() {
        assert_eq!("implicit".parse::<TlsMode>().unwrap(), TlsMode::Implicit);
        assert_eq!("SSL".parse::<TlsMode>().unwrap(), TlsMode::Implicit);
        assert_eq!("StartTLS".parse::<TlsMode>().unwrap(), TlsMode::StartTls);
        assert!(matches!("plain".parse::<TlsMode>(), Err(MailError::Config(_))));
    }

    #[test]
    fn test_builder_defaults() {
        let config = MailConfig::new("127.0.0.1", 1143, "bot@x.com", "hunter2")
            .with_imap_tls(TlsMode::StartTls)
            .with_accept_invalid_certs(true);

        assert_eq!(config.imap_port, 1143);
        assert_eq!(config.imap_tls, TlsMode::StartTls);
        assert_eq!(config.smtp_port, 465);
        assert!(config.accept_invalid_certs);
        assert_eq!(config.password(), "hunter2");
        // Debug output never reveals the password
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
