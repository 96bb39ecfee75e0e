//! # Treemail Mailer
//! SMTP delivery of rendered digests.
//!
//! One blocking transport, built once per run. A digest run is a serial
//! batch, so there is no pooling and no async executor; each recipient
//! is one `send` call and its outcome feeds the dispatch report.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use treemail_core::config::SmtpSettings;
use treemail_core::error::{Result, TreemailError};
use treemail_core::traits::Mailer;
use treemail_core::types::User;

/// Blocking SMTP mailer with STARTTLS.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    /// Build the transport from settings. Fails only on a bad host
    /// name; connection errors surface per message at send time.
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let mut builder = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| TreemailError::Mail(format!("SMTP relay: {e}")))?
            .port(settings.port);
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(
        &self,
        from: &str,
        to: &User,
        reply_to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<bool> {
        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|e| TreemailError::Mail(format!("Invalid from: {e}")))?;
        let reply_mailbox: Mailbox = reply_to
            .parse()
            .map_err(|e| TreemailError::Mail(format!("Invalid reply-to: {e}")))?;
        let to_mailbox: Mailbox = format!("{} <{}>", to.real_name, to.email)
            .parse()
            .or_else(|_| to.email.parse())
            .map_err(|e| TreemailError::Mail(format!("Invalid to: {e}")))?;

        let message = Message::builder()
            .from(from_mailbox)
            .reply_to(reply_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text_body.to_string(),
                html_body.to_string(),
            ))
            .map_err(|e| TreemailError::Mail(format!("Build message: {e}")))?;

        match self.transport.send(&message) {
            Ok(response) => {
                tracing::info!(to = %to.email, "Digest sent: {}", response.code());
                Ok(response.is_positive())
            }
            Err(e) => {
                // The caller counts this recipient as failed and moves
                // on; one bad mailbox never aborts the run.
                tracing::warn!(to = %to.email, "SMTP send: {e}");
                Ok(false)
            }
        }
    }
}
