//! Email Service
//!
//! SMTP delivery of lifecycle notifications, rendered from embedded Tera
//! templates.

use async_trait::async_trait;
use chrono::Datelike;
use lettre::{
    message::{header, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::{debug, error, info};
use tera::{Context, Tera};

use super::notifier::{NotificationKind, Notifier, NotifyError};
use crate::config::EmailConfig;
use crate::models::Account;

const VERIFICATION_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Verify Your Email Address</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }
        .content { background: white; padding: 30px; border: 1px solid #dee2e6; }
        .button { display: inline-block; padding: 12px 24px; background: #007bff; color: white; text-decoration: none; border-radius: 4px; margin: 20px 0; }
        .footer { padding: 20px; text-align: center; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="content">
        <p>Hello {{ display_name }},</p>
        <p>Please confirm your email address to finish setting up your account.</p>
        <p><a class="button" href="{{ verification_url | safe }}">Verify email</a></p>
        <p>If the button does not work, open this link: {{ verification_url | safe }}</p>
        <p>If you did not create an account, you can ignore this email.</p>
    </div>
    <div class="footer">&copy; {{ current_year }} {{ app_name }}</div>
</body>
</html>
"#;

const VERIFICATION_TEXT: &str = r#"Hello {{ display_name }},

Please confirm your email address to finish setting up your account:

{{ verification_url | safe }}

If you did not create an account, you can ignore this email.

(c) {{ current_year }} {{ app_name }}
"#;

const LOCKED_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Your Account Has Been Locked</title>
</head>
<body style="font-family: Arial, sans-serif; color: #333;">
    <p>Hello {{ display_name }},</p>
    <p>Your account was locked after {{ failed_attempts }} failed sign-in attempts.</p>
    <p>Contact an administrator to unlock it. If these attempts were not yours, consider changing your password once access is restored.</p>
    <p style="font-size: 12px; color: #666;">&copy; {{ current_year }} {{ app_name }}</p>
</body>
</html>
"#;

const LOCKED_TEXT: &str = r#"Hello {{ display_name }},

Your account was locked after {{ failed_attempts }} failed sign-in attempts.

Contact an administrator to unlock it. If these attempts were not yours, consider changing your password once access is restored.

(c) {{ current_year }} {{ app_name }}
"#;

/// Rendered subject and bodies of one email
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: &'static str,
    pub html: String,
    pub text: String,
}

/// Email service delivering notifications over SMTP
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    templates: Tera,
    from: Mailbox,
    app_name: String,
}

impl EmailService {
    /// Create a new email service
    ///
    /// Builds the transport without connecting; delivery errors surface on
    /// the first send.
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
            .map_err(|e| {
                NotifyError::Configuration(format!("Failed to configure SMTP relay: {}", e))
            })?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| NotifyError::Configuration(format!("Invalid from address: {}", e)))?;

        Ok(Self {
            transport,
            templates: Self::embedded_templates()?,
            from,
            app_name: config.from_name.clone(),
        })
    }

    fn embedded_templates() -> Result<Tera, NotifyError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("email_verification.html", VERIFICATION_HTML),
            ("email_verification.txt", VERIFICATION_TEXT),
            ("account_locked.html", LOCKED_HTML),
            ("account_locked.txt", LOCKED_TEXT),
        ])
        .map_err(|e| NotifyError::Template(format!("Failed to add templates: {}", e)))?;
        debug!("Loaded embedded email templates");
        Ok(tera)
    }

    /// Render the email for a notification kind
    pub fn render(
        &self,
        kind: NotificationKind,
        account: &Account,
        verification_url: Option<&str>,
    ) -> Result<RenderedEmail, NotifyError> {
        let (template, subject) = match kind {
            NotificationKind::EmailVerification => {
                ("email_verification", "Verify Your Email Address")
            }
            NotificationKind::AccountLocked => ("account_locked", "Your Account Has Been Locked"),
        };

        let mut context = Context::new();
        context.insert("display_name", &display_name(account));
        context.insert("app_name", &self.app_name);
        context.insert("current_year", &chrono::Utc::now().year());
        context.insert("failed_attempts", &account.failed_login_attempts);
        if let Some(url) = verification_url {
            context.insert("verification_url", url);
        }

        let render = |name: String| {
            self.templates
                .render(&name, &context)
                .map_err(|e| NotifyError::Template(format!("Failed to render {}: {}", name, e)))
        };

        Ok(RenderedEmail {
            subject,
            html: render(format!("{}.html", template))?,
            text: render(format!("{}.txt", template))?,
        })
    }

    async fn deliver(&self, to_email: &str, email: RenderedEmail) -> Result<(), NotifyError> {
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| NotifyError::Delivery(format!("Invalid recipient email: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )
            .map_err(|e| NotifyError::Delivery(format!("Failed to build email message: {}", e)))?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Email '{}' sent", email.subject);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email '{}': {}", email.subject, e);
                Err(NotifyError::Delivery(e.to_string()))
            }
        }
    }
}

fn display_name(account: &Account) -> String {
    match (&account.first_name, &account.last_name) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.clone(),
        _ => account.nickname.clone(),
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send_verification_email(
        &self,
        account: &Account,
        verification_url: &str,
    ) -> Result<(), NotifyError> {
        let email = self.render(
            NotificationKind::EmailVerification,
            account,
            Some(verification_url),
        )?;
        self.deliver(&account.email, email).await
    }

    async fn send_account_locked(&self, account: &Account) -> Result<(), NotifyError> {
        let email = self.render(NotificationKind::AccountLocked, account, None)?;
        self.deliver(&account.email, email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_config() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: "password".to_string(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Account Service".to_string(),
        }
    }

    fn test_account() -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            nickname: "brave_otter_12".to_string(),
            first_name: None,
            last_name: None,
            bio: None,
            profile_picture_url: None,
            linkedin_profile_url: None,
            github_profile_url: None,
            role: UserRole::Anonymous,
            email_verified: false,
            is_locked: true,
            failed_login_attempts: 3,
            is_professional: false,
            professional_status_updated_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_verification_email_contains_link() {
        let service = EmailService::new(&test_config()).unwrap();
        let url = "http://localhost:8000/verify-email/abc/token123";

        let email = service
            .render(NotificationKind::EmailVerification, &test_account(), Some(url))
            .unwrap();

        assert_eq!(email.subject, "Verify Your Email Address");
        assert!(email.text.contains(url));
        assert!(email.html.contains(url));
        assert!(email.text.contains("brave_otter_12"));
    }

    #[tokio::test]
    async fn test_locked_email_mentions_attempts() {
        let service = EmailService::new(&test_config()).unwrap();

        let email = service
            .render(NotificationKind::AccountLocked, &test_account(), None)
            .unwrap();

        assert!(email.text.contains("3 failed sign-in attempts"));
        assert!(email.html.contains("Account Service"));
    }

    #[tokio::test]
    async fn test_invalid_from_address_is_configuration_error() {
        let mut config = test_config();
        config.from_email = "not an address".to_string();
        assert!(matches!(
            EmailService::new(&config),
            Err(NotifyError::Configuration(_))
        ));
    }
}
