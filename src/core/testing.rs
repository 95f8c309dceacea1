//! In-process stand-ins for the AI and email providers

use std::sync::{Arc, Mutex};

use crate::error::{MangoDeskError, Result};
use super::llm::{Summarizer, SummaryRequest, SummaryResponse};
use super::mail::{DeliveryReceipt, Mailer, OutgoingEmail};

/// Returns a fixed summary and remembers every request
pub struct StubSummarizer {
    summary: String,
    requests: Arc<Mutex<Vec<SummaryRequest>>>,
}

impl StubSummarizer {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<SummaryRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait::async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, request: SummaryRequest) -> Result<SummaryResponse> {
        self.requests.lock().unwrap().push(request);
        Ok(SummaryResponse {
            summary: self.summary.clone(),
            tokens_used: 42,
            model: "stub-model".to_string(),
        })
    }

    fn provider_name(&self) -> &str {
        "Stub"
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }
}

/// Accepts or rejects every message, keeping the accepted ones
pub struct StubMailer {
    failure: Option<String>,
    outbox: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl StubMailer {
    pub fn accepting() -> Self {
        Self {
            failure: None,
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn outbox(&self) -> Arc<Mutex<Vec<OutgoingEmail>>> {
        Arc::clone(&self.outbox)
    }
}

#[async_trait::async_trait]
impl Mailer for StubMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt> {
        if let Some(message) = &self.failure {
            return Err(MangoDeskError::Email(message.clone()));
        }

        let mut outbox = self.outbox.lock().unwrap();
        outbox.push(email);
        Ok(DeliveryReceipt {
            message_id: format!("stub-{}", outbox.len()),
        })
    }

    fn provider_name(&self) -> &str {
        "Stub"
    }
}
