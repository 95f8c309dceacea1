use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Share request as submitted by the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    #[serde(default)]
    pub recipient_email: String,

    /// Optional personal note shown above the summary notice
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub summary_id: String,

    #[serde(default)]
    pub attach_docx: bool,

    #[serde(default)]
    pub attach_txt: bool,

    /// Base name for attachments, derived from the summary when absent
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Fully composed message handed to a [`Mailer`]
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: String,
}

/// Trait for transactional email providers
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a composed message
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt>;

    /// Get the provider name (e.g., "Resend")
    fn provider_name(&self) -> &str;
}
