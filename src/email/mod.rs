//! Notification emails, rendered from templates and sent through Mailgun.

use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use async_trait::async_trait;
use mailgun_v3::email::{self, Message, MessageBody};
use mailgun_v3::{Credentials, EmailAddress};

use crate::config::{MailConfig, MailgunConfig};

pub mod account;
pub mod booking;

pub use self::account::{AccountDecisionEmail, NewSignupEmail};
pub use self::booking::{BookingDecisionEmail, NewBookingEmail};

pub trait Email: Template {
    fn subject(&self) -> String;
    fn recipient(&self) -> Recipient;

    fn to_outgoing(&self) -> anyhow::Result<OutgoingEmail> {
        Ok(OutgoingEmail {
            to: self.recipient(),
            subject: self.subject(),
            html: self.render().context("Failed to render email")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub name: Option<String>,
    pub address: String,
}

impl Recipient {
    pub fn named(name: &str, address: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            address: address.to_owned(),
        }
    }

    pub fn address(address: &str) -> Self {
        Self {
            name: None,
            address: address.to_owned(),
        }
    }
}

/// A rendered email, ready to hand to a [`Mailer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Recipient,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

pub struct MailgunMailer {
    mailgun: MailgunConfig,
    from_name: String,
    from_address: String,
}

impl MailgunMailer {
    pub fn new(mailgun: MailgunConfig, from_name: String, from_address: String) -> Self {
        Self {
            mailgun,
            from_name,
            from_address,
        }
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        let creds = Credentials::new(self.mailgun.token.as_str(), self.mailgun.domain.as_str());
        let sender =
            EmailAddress::name_address(self.from_name.as_str(), self.from_address.as_str());
        let to = match &email.to.name {
            Some(name) => EmailAddress::name_address(name.as_str(), email.to.address.as_str()),
            None => EmailAddress::address(email.to.address.as_str()),
        };
        let message = Message {
            to: vec![to],
            subject: email.subject,
            body: MessageBody::Html(email.html),
            ..Default::default()
        };

        email::async_impl::send_email(&creds, &sender, message)
            .await
            .map(|_| ())
            .map_err(|err| anyhow::anyhow!("Failed to send email: {err}"))
    }
}

/// Logs emails instead of sending them, for when Mailgun isn't configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        tracing::info!(
            "not sending email `{}` to {} (mail is not configured)",
            email.subject,
            email.to.address
        );
        Ok(())
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.mailgun {
        Some(mailgun) => Arc::new(MailgunMailer::new(
            mailgun.clone(),
            config.from_name.clone(),
            config.from_address.clone(),
        )),
        None => {
            tracing::warn!("`MAILGUN_TOKEN` not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

/// Sends an email, logging failures rather than returning them: a
/// notification that can't be delivered never undoes the change it announces.
pub async fn notify(mailer: &dyn Mailer, email: impl Email) {
    let outgoing = match email.to_outgoing() {
        Ok(outgoing) => outgoing,
        Err(error) => {
            tracing::error!("Failed to create email `{}`: {error:?}", email.subject());
            return;
        }
    };

    let subject = outgoing.subject.clone();
    let address = outgoing.to.address.clone();
    match mailer.send(outgoing).await {
        Ok(()) => tracing::debug!("sent `{subject}` to {address}"),
        Err(error) => tracing::error!("Failed to send `{subject}` to {address}: {error:?}"),
    }
}
