// crates/server/src/mailer.rs
//! Fire-and-forget transactional email over a mail-provider HTTP API.
//!
//! The portal never waits on email delivery: `send` spawns a task and
//! failures are logged, not surfaced. Without mail configuration the mailer
//! logs the rendered message at debug level and skips delivery (development
//! mode).

use serde::Serialize;

/// Subject prefix applied to every outgoing message.
const SUBJECT_PREFIX: &str = "[keyport]";

/// Mail provider settings, typically from `MAIL_*` environment variables.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Transactional send endpoint, e.g. `https://api.brevo.com/v3/smtp/email`.
    pub api_url: String,
    pub api_key: String,
    /// Sender address, e.g. `keyport admin <admin@keyport.dev>`.
    pub sender: String,
}

/// The messages this portal sends.
#[derive(Debug, Clone, Copy)]
pub enum MailTemplate {
    ConfirmAccount,
    ResetPassword,
}

impl MailTemplate {
    /// Render the plain-text body. `args` carries `username` and `token`.
    fn render(self, args: &serde_json::Value) -> String {
        let username = args["username"].as_str().unwrap_or("there");
        let token = args["token"].as_str().unwrap_or_default();
        match self {
            MailTemplate::ConfirmAccount => format!(
                "Dear {username},\n\n\
                 Welcome to keyport! To confirm your account please use the \
                 following token:\n\n{token}\n\n\
                 Sincerely,\nThe keyport team"
            ),
            MailTemplate::ResetPassword => format!(
                "Dear {username},\n\n\
                 To reset your password please use the following token:\n\n{token}\n\n\
                 If you have not requested a password reset simply ignore this \
                 message.\n\n\
                 Sincerely,\nThe keyport team"
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    text_content: String,
}

/// Transactional mail client. Cheap to clone; shared via `AppState`.
#[derive(Clone)]
pub struct Mailer {
    config: Option<MailConfig>,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(config: Option<MailConfig>) -> Self {
        if config.is_none() {
            tracing::warn!("mail delivery not configured; outgoing mail will be logged only");
        }
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Queue a message for delivery and return immediately.
    pub fn send(&self, to: &str, subject: &str, template: MailTemplate, args: &serde_json::Value) {
        let subject = format!("{SUBJECT_PREFIX} {subject}");
        let body_text = template.render(args);

        let Some(config) = self.config.clone() else {
            tracing::debug!(%to, %subject, body = %body_text, "mail disabled; skipping delivery");
            return;
        };

        let client = self.client.clone();
        let to = to.to_string();
        tokio::spawn(async move {
            let body = SendEmailBody {
                sender: EmailAddress {
                    email: config.sender,
                },
                to: vec![EmailAddress { email: to.clone() }],
                subject: subject.clone(),
                text_content: body_text,
            };

            let result = client
                .post(&config.api_url)
                .header("api-key", &config.api_key)
                .header("accept", "application/json")
                .json(&body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(%to, %subject, "mail sent");
                }
                Ok(resp) => {
                    let status = resp.status();
                    let detail = resp.text().await.unwrap_or_default();
                    tracing::error!(%to, %status, %detail, "mail provider rejected message");
                }
                Err(e) => {
                    tracing::error!(%to, error = %e, "mail send failed");
                }
            }
        });
    }
}
