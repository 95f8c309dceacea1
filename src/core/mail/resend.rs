use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::EmailConfig;
use crate::error::{MangoDeskError, Result};
use super::mailer::{DeliveryReceipt, Mailer, OutgoingEmail};

const RESEND_BASE_URL: &str = "https://api.resend.com";

/// Factory function to create the configured mailer
pub fn create_mailer(config: &EmailConfig) -> Result<Box<dyn Mailer>> {
    match config.provider.as_str() {
        "resend" => Ok(Box::new(ResendMailer::new(config)?)),
        _ => Err(MangoDeskError::Config(format!(
            "Unsupported email provider: {}",
            config.provider
        ))),
    }
}

/// Resend transactional email API
pub struct ResendMailer {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            MangoDeskError::Config("Resend API key not configured".to_string())
        })?;

        Ok(Self {
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| RESEND_BASE_URL.to_string()),
            client: reqwest::Client::new(),
        })
    }

    fn classify_failure(status: u16, detail: &str) -> MangoDeskError {
        let lower = detail.to_lowercase();
        let message = if status == 401 || status == 403 || lower.contains("api key") {
            "Email service not properly configured"
        } else if status == 429 || lower.contains("quota") {
            "Email service quota exceeded"
        } else if lower.contains("invalid") {
            "Invalid email address provided"
        } else {
            "Failed to send email. Please try again."
        };
        MangoDeskError::Email(message.to_string())
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt> {
        let attachments: Vec<Value> = email
            .attachments
            .iter()
            .map(|a| {
                json!({
                    "filename": a.filename,
                    "content": STANDARD.encode(&a.content),
                })
            })
            .collect();

        let mut payload = json!({
            "from": email.from,
            "to": email.to,
            "subject": email.subject,
            "html": email.html,
        });
        if !attachments.is_empty() {
            payload["attachments"] = Value::Array(attachments);
        }

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Resend request failed: {}", e);
                MangoDeskError::Email("Failed to send email. Please try again.".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Resend API error {}: {}", status, detail);
            return Err(Self::classify_failure(status.as_u16(), &detail));
        }

        let data: Value = response.json().await?;
        let message_id = data["id"]
            .as_str()
            .ok_or_else(|| MangoDeskError::Email("Email provider returned no message id".to_string()))?
            .to_string();

        debug!("Email accepted by Resend: {}", message_id);
        Ok(DeliveryReceipt { message_id })
    }

    fn provider_name(&self) -> &str {
        "Resend"
    }
}
