//! Outbound mail: account verification links over SMTP.

use anyhow::{Context, Result};
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Plain-text body for the signup confirmation mail.
pub struct VerificationEmailTemplate {
    pub full_name: String,
    pub confirm_url: String,
}

impl VerificationEmailTemplate {
    pub fn render(&self) -> String {
        format!(
            "Hi {},\n\n\
             Welcome to Jersey Central. Confirm your email address to activate \
             your account:\n\n{}\n\n\
             The link expires in 24 hours. If you didn't sign up, ignore this \
             mail.\n",
            self.full_name, self.confirm_url
        )
    }
}

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build a mailer if SMTP is configured; `None` disables outbound mail.
    pub fn from_config(config: &SmtpConfig) -> Result<Option<Self>> {
        let Some(host) = &config.host else {
            return Ok(None);
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("Invalid SMTP relay: {}", host))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from
            .parse()
            .with_context(|| format!("Invalid SMTP from address: {}", config.from))?;

        Ok(Some(Self {
            transport: builder.build(),
            from,
        }))
    }

    pub async fn send_verification(
        &self,
        to: &str,
        full_name: &str,
        confirm_url: &str,
    ) -> Result<()> {
        let body = VerificationEmailTemplate {
            full_name: full_name.to_string(),
            confirm_url: confirm_url.to_string(),
        }
        .render();

        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().with_context(|| format!("Invalid recipient: {}", to))?)
            .subject("Confirm your Jersey Central account")
            .body(body)?;

        self.transport
            .send(message)
            .await
            .context("Failed to send verification mail")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_template_contains_link() {
        let template = VerificationEmailTemplate {
            full_name: "Asha".to_string(),
            confirm_url: "http://localhost:8080/api/auth/confirm?token=abc".to_string(),
        };
        let body = template.render();
        assert!(body.contains("Asha"));
        assert!(body.contains("/api/auth/confirm?token=abc"));
    }

    #[test]
    fn test_mailer_disabled_without_host() {
        let mailer = Mailer::from_config(&SmtpConfig::default()).unwrap();
        assert!(mailer.is_none());
    }
}
