//! Outgoing email: settings from the environment and an SMTP [`Mailer`].

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, instrument, warn};

/// Transport security for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465).
    Ssl,
    /// Plain connection upgraded with STARTTLS (usually port 587).
    StartTls,
    /// No encryption at all.
    None,
}

impl SmtpSecurity {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("starttls") => SmtpSecurity::StartTls,
            Some("ssl") => SmtpSecurity::Ssl,
            Some("none") => SmtpSecurity::None,
            Some(other) => {
                warn!(security = other, "unknown SMTP_SECURITY, using starttls");
                SmtpSecurity::StartTls
            }
        }
    }

    fn default_port(self) -> u16 {
        match self {
            SmtpSecurity::Ssl => 465,
            SmtpSecurity::StartTls | SmtpSecurity::None => 587,
        }
    }
}

/// SMTP settings. Only ever read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `SMTP_FROM`, falling back to `SMTP_USERNAME`.
    pub from: Option<String>,
    /// `SMTP_TO`, falling back to `SMTP_TEST_TO`. Tool arguments never
    /// override it.
    pub to: Option<String>,
}

impl SmtpSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let security = SmtpSecurity::parse(get("SMTP_SECURITY").as_deref());
        let port = match get("SMTP_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(port = %raw, "invalid SMTP_PORT, using default");
                security.default_port()
            }),
            None => security.default_port(),
        };
        let username = get("SMTP_USERNAME");
        Self {
            host: get("SMTP_HOST"),
            port,
            security,
            from: get("SMTP_FROM").or_else(|| username.clone()),
            password: get("SMTP_PASSWORD"),
            username,
            to: get("SMTP_TO").or_else(|| get("SMTP_TEST_TO")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl EmailAttachment {
    /// Build an attachment named after `path`, guessing its MIME type.
    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        Self {
            filename,
            content_type: guess_mime(path),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Delivery seam for `send_email`.
pub trait Mailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Blocking SMTP delivery through `lettre`.
pub struct SmtpMailer {
    settings: SmtpSettings,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let host = self
            .settings
            .host
            .as_deref()
            .ok_or_else(|| anyhow!("SMTP_HOST is not set"))?;
        let builder = match self.settings.security {
            SmtpSecurity::Ssl => SmtpTransport::relay(host).context("configure ssl relay")?,
            SmtpSecurity::StartTls => {
                SmtpTransport::starttls_relay(host).context("configure starttls relay")?
            }
            SmtpSecurity::None => SmtpTransport::builder_dangerous(host),
        };
        let mut builder = builder
            .port(self.settings.port)
            .timeout(Some(self.timeout));
        if let (Some(user), Some(password)) = (&self.settings.username, &self.settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        Ok(builder.build())
    }
}

impl Mailer for SmtpMailer {
    #[instrument(skip_all, fields(to = %email.to, attachments = email.attachments.len()))]
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(email)?;
        self.transport()?
            .send(&message)
            .context("smtp send")?;
        info!("email sent");
        Ok(())
    }
}

fn build_message(email: &OutgoingEmail) -> Result<Message> {
    let from: Mailbox = email
        .from
        .parse()
        .with_context(|| format!("parse from address {:?}", email.from))?;
    let to: Mailbox = email
        .to
        .parse()
        .with_context(|| format!("parse to address {:?}", email.to))?;
    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
    for attachment in &email.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .unwrap_or(ContentType::TEXT_PLAIN);
        parts = parts.singlepart(
            Attachment::new(attachment.filename.clone()).body(attachment.data.clone(), content_type),
        );
    }
    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .multipart(parts)
        .context("build email message")
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
