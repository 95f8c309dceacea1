use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// An uploaded transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub word_count: i64,
    pub content_sha256: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            original_name: row.get("original_name")?,
            mime_type: row.get("mime_type")?,
            file_size: row.get("file_size")?,
            word_count: row.get("word_count")?,
            content_sha256: row.get("content_sha256")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A summary with its active content and version counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub id: String,
    pub file_id: String,
    pub original_prompt: String,
    pub content: String,
    pub version: i64,
    pub tokens_used: Option<i64>,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            file_id: row.get("file_id")?,
            original_prompt: row.get("original_prompt")?,
            content: row.get("content")?,
            version: row.get("version")?,
            tokens_used: row.get("tokens_used")?,
            model: row.get("model")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Immutable snapshot of a summary at one version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryVersionRecord {
    pub id: String,
    pub summary_id: String,
    pub content: String,
    pub prompt: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl SummaryVersionRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            summary_id: row.get("summary_id")?,
            content: row.get("content")?,
            prompt: row.get("prompt")?,
            version: row.get("version")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(EmailStatus::Pending),
            "sent" => Some(EmailStatus::Sent),
            "failed" => Some(EmailStatus::Failed),
            _ => None,
        }
    }
}

impl ToSql for EmailStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EmailStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        EmailStatus::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown email status: {}", text).into()))
    }
}

/// One attempt to share a summary by email
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub id: String,
    pub summary_id: String,
    pub recipient_email: String,
    pub subject: String,
    pub message: String,
    pub status: EmailStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            summary_id: row.get("summary_id")?,
            recipient_email: row.get("recipient_email")?,
            subject: row.get("subject")?,
            message: row.get("message")?,
            status: row.get("status")?,
            provider_message_id: row.get("provider_message_id")?,
            error: row.get("error")?,
            sent_at: row.get("sent_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Fields supplied when storing an upload
#[derive(Debug, Clone)]
pub struct NewFile {
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub word_count: i64,
    pub content_sha256: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewSummary {
    pub file_id: String,
    pub prompt: String,
    pub content: String,
    pub tokens_used: Option<i64>,
    pub model: Option<String>,
}

/// Outcome of a send attempt, written once the provider has answered
#[derive(Debug, Clone)]
pub struct NewEmailRecord {
    pub summary_id: String,
    pub recipient_email: String,
    pub subject: String,
    pub message: String,
    pub status: EmailStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}
