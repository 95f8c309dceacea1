use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{MangoDeskError, Result};
use crate::store::{
    EmailRecord, EmailStatus, FileRecord, NewEmailRecord, NewFile, NewSummary, Store,
    SummaryRecord, SummaryVersionRecord,
};
use super::differ::{compute_line_diff, DiffResult};
use super::llm::{self, validate_instruction, Summarizer, SummaryRequest};
use super::mail::{self, EmailComposer, EmailRequest, Mailer};
use super::transcript::{TranscriptKind, TranscriptProcessor};

/// Response length requested for every generated summary
const SUMMARY_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummaryRequest {
    #[serde(default)]
    pub file_id: String,

    #[serde(default)]
    pub prompt: String,

    /// Text to summarize instead of the stored transcript
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadedTranscript {
    pub file: FileRecord,
    pub kind: TranscriptKind,
}

#[derive(Debug, Clone)]
pub struct SummaryWithVersions {
    pub summary: SummaryRecord,
    pub versions: Vec<SummaryVersionRecord>,
}

/// Diff between two stored versions of one summary
#[derive(Debug, Clone)]
pub struct VersionComparison {
    pub summary_id: String,
    pub from: i64,
    pub to: i64,
    pub diff: DiffResult,
}

/// Main orchestration engine for MangoDesk
pub struct Engine {
    config: Config,
    store: Store,
    summarizer: Option<Box<dyn Summarizer>>,
    mailer: Option<Box<dyn Mailer>>,
    transcripts: TranscriptProcessor,
    composer: EmailComposer,
}

impl Engine {
    /// Open the store and connect whichever providers are configured
    pub fn new(config: Config) -> Result<Self> {
        let store = Store::open(&config.database.path)?;
        info!("Database ready at {}", config.database.path.display());

        let summarizer = match llm::create_summarizer(&config.llm) {
            Ok(summarizer) => {
                info!(
                    "✅ AI summarization enabled: {} ({})",
                    summarizer.provider_name(),
                    summarizer.model_name()
                );
                Some(summarizer)
            }
            Err(e) => {
                warn!("⚠️ Failed to initialize summarizer: {}", e);
                warn!("Continuing without AI summarization");
                None
            }
        };

        let mailer = match mail::create_mailer(&config.email) {
            Ok(mailer) => {
                info!("✅ Email sharing enabled: {}", mailer.provider_name());
                Some(mailer)
            }
            Err(e) => {
                warn!("⚠️ Failed to initialize mailer: {}", e);
                warn!("Continuing without email sharing");
                None
            }
        };

        Ok(Self::with_parts(config, store, summarizer, mailer))
    }

    /// Assemble an engine from already-built parts
    pub fn with_parts(
        config: Config,
        store: Store,
        summarizer: Option<Box<dyn Summarizer>>,
        mailer: Option<Box<dyn Mailer>>,
    ) -> Self {
        let transcripts = TranscriptProcessor::new(&config.limits);
        let composer = EmailComposer::new(&config.limits);

        Self {
            config,
            store,
            summarizer,
            mailer,
            transcripts,
            composer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a store call on the blocking pool
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| MangoDeskError::Internal(format!("Store task failed: {}", e)))?
    }

    pub async fn db_health(&self) -> Result<()> {
        self.with_store(|store| store.ping()).await
    }

    /// Validate, decode and persist an uploaded transcript
    pub async fn upload_file(
        &self,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<UploadedTranscript> {
        let limit = self.config.server.max_upload_bytes;
        if bytes.len() > limit {
            return Err(MangoDeskError::PayloadTooLarge {
                size: bytes.len(),
                limit,
            });
        }

        let processed = self.transcripts.process(bytes, mime_type)?;
        let new_file = NewFile {
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            file_size: bytes.len() as i64,
            word_count: processed.word_count as i64,
            content_sha256: processed.sha256,
            content: processed.content,
        };

        let file = self.with_store(move |store| store.insert_file(new_file)).await?;
        info!(
            "📄 Uploaded {} ({} words) as {}",
            file.original_name, file.word_count, file.id
        );

        Ok(UploadedTranscript {
            file,
            kind: processed.kind,
        })
    }

    pub async fn get_file(&self, file_id: &str) -> Result<FileRecord> {
        let file_id = file_id.to_string();
        self.with_store(move |store| store.get_file(&file_id)).await
    }

    /// Summarize a transcript and store the result as version 1
    pub async fn generate_summary(&self, request: GenerateSummaryRequest) -> Result<SummaryRecord> {
        if request.file_id.trim().is_empty() || request.prompt.trim().is_empty() {
            return Err(MangoDeskError::Validation(
                "File ID and prompt are required".to_string(),
            ));
        }
        validate_instruction(&request.prompt, &self.config.limits)?;

        let summarizer = self.summarizer.as_deref().ok_or_else(|| {
            MangoDeskError::Llm("AI service not properly configured".to_string())
        })?;

        let file = self.get_file(&request.file_id).await?;
        let content = request
            .content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(file.content);

        debug!(
            "Summarizing file {} with {}",
            file.id,
            summarizer.provider_name()
        );
        let response = summarizer
            .summarize(SummaryRequest {
                content,
                instruction: request.prompt.clone(),
                max_tokens: Some(SUMMARY_MAX_TOKENS),
            })
            .await?;

        let new_summary = NewSummary {
            file_id: file.id,
            prompt: request.prompt,
            content: response.summary,
            tokens_used: Some(i64::from(response.tokens_used)),
            model: Some(response.model),
        };
        let summary = self
            .with_store(move |store| store.create_summary(new_summary))
            .await?;

        info!("🧠 Generated summary {} ({} tokens)", summary.id, response.tokens_used);
        Ok(summary)
    }

    /// Save edited content as the next version
    pub async fn update_summary(
        &self,
        summary_id: &str,
        content: &str,
        prompt: Option<String>,
    ) -> Result<SummaryRecord> {
        if content.trim().is_empty() {
            return Err(MangoDeskError::Validation("Content is required".to_string()));
        }

        let summary_id = summary_id.to_string();
        let content = content.to_string();
        let summary = self
            .with_store(move |store| {
                store.update_summary_content(&summary_id, &content, prompt.as_deref())
            })
            .await?;

        info!("✏️ Summary {} saved as version {}", summary.id, summary.version);
        Ok(summary)
    }

    pub async fn get_summary(&self, summary_id: &str) -> Result<SummaryWithVersions> {
        let summary_id = summary_id.to_string();
        self.with_store(move |store| {
            let summary = store.get_summary(&summary_id)?;
            let versions = store.list_versions(&summary_id)?;
            Ok(SummaryWithVersions { summary, versions })
        })
        .await
    }

    pub async fn list_versions(&self, summary_id: &str) -> Result<Vec<SummaryVersionRecord>> {
        Ok(self.get_summary(summary_id).await?.versions)
    }

    /// Diff two stored versions of a summary
    ///
    /// `to` defaults to the current version and `from` to the one before it.
    /// Version 0 stands for the empty text before the first version.
    pub async fn compare_versions(
        &self,
        summary_id: &str,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<VersionComparison> {
        let summary_id = summary_id.to_string();
        self.with_store(move |store| {
            let summary = store.get_summary(&summary_id)?;
            let to = to.unwrap_or(summary.version);
            let from = from.unwrap_or(to - 1);

            for version in [from, to] {
                if version < 0 || version > summary.version {
                    return Err(MangoDeskError::NotFound(format!("Version {}", version)));
                }
            }

            let text_at = |version: i64| -> Result<String> {
                if version == 0 {
                    Ok(String::new())
                } else {
                    Ok(store.get_version(&summary_id, version)?.content)
                }
            };
            let previous = text_at(from)?;
            let current = text_at(to)?;

            Ok(VersionComparison {
                summary_id: summary_id.clone(),
                from,
                to,
                diff: compute_line_diff(&previous, &current),
            })
        })
        .await
    }

    /// Diff two arbitrary texts
    pub fn diff_texts(&self, previous: &str, current: &str) -> DiffResult {
        compute_line_diff(previous, current)
    }

    /// Validate, compose and deliver a summary by email, recording the attempt
    pub async fn send_email(&self, request: EmailRequest) -> Result<EmailRecord> {
        self.composer.validate(&request)?;

        let summary_id = request.summary_id.clone();
        let summary = self
            .with_store(move |store| store.get_summary(&summary_id))
            .await?;

        let sent_on = Utc::now().format("%Y-%m-%d").to_string();
        let outgoing = self.composer.compose(
            &request,
            &summary.content,
            &self.config.email.from_address,
            &sent_on,
        )?;
        let subject = outgoing.subject.clone();

        let delivery = match self.mailer.as_deref() {
            Some(mailer) => mailer.send(outgoing).await,
            None => Err(MangoDeskError::Email(
                "Email service not properly configured".to_string(),
            )),
        };

        let (status, provider_message_id, failure) = match delivery {
            Ok(receipt) => (EmailStatus::Sent, Some(receipt.message_id), None),
            Err(e) => {
                error!("Email to {} failed: {}", request.recipient_email, e);
                (EmailStatus::Failed, None, Some(e))
            }
        };

        let record = NewEmailRecord {
            summary_id: summary.id,
            recipient_email: request.recipient_email,
            subject,
            message: request.message.unwrap_or_default(),
            status,
            provider_message_id,
            error: failure.as_ref().map(|e| e.to_string()),
        };
        let record = self
            .with_store(move |store| store.insert_email_record(record))
            .await?;

        match failure {
            Some(e) => Err(e),
            None => {
                info!("📧 Summary {} sent to {}", record.summary_id, record.recipient_email);
                Ok(record)
            }
        }
    }

    pub async fn email_history(&self) -> Result<Vec<EmailRecord>> {
        self.with_store(|store| store.list_email_records()).await
    }

    pub async fn get_email_record(&self, share_id: &str) -> Result<EmailRecord> {
        let share_id = share_id.to_string();
        self.with_store(move |store| store.get_email_record(&share_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{StubMailer, StubSummarizer};
    use crate::core::DiffSegment;

    fn engine_with(summarizer: StubSummarizer, mailer: StubMailer) -> Engine {
        Engine::with_parts(
            Config::default(),
            Store::open_in_memory().unwrap(),
            Some(Box::new(summarizer)),
            Some(Box::new(mailer)),
        )
    }

    fn engine() -> Engine {
        engine_with(StubSummarizer::new("# Standup\n- ship Friday"), StubMailer::accepting())
    }

    async fn uploaded(engine: &Engine) -> FileRecord {
        engine
            .upload_file("standup.txt", "text/plain", b"Alice: we ship on Friday")
            .await
            .unwrap()
            .file
    }

    async fn generated(engine: &Engine) -> SummaryRecord {
        let file = uploaded(engine).await;
        engine
            .generate_summary(GenerateSummaryRequest {
                file_id: file.id,
                prompt: "Bullet points".to_string(),
                content: None,
            })
            .await
            .unwrap()
    }

    fn share(summary_id: &str) -> EmailRequest {
        EmailRequest {
            recipient_email: "team@example.com".to_string(),
            message: Some("FYI".to_string()),
            summary_id: summary_id.to_string(),
            attach_docx: false,
            attach_txt: true,
            filename: None,
        }
    }

    #[tokio::test]
    async fn test_upload_records_metadata() {
        let engine = engine();
        let uploaded = engine
            .upload_file("standup.txt", "text/plain", b"  one two three  ")
            .await
            .unwrap();

        assert_eq!(uploaded.kind, TranscriptKind::Text);
        assert_eq!(uploaded.file.word_count, 3);
        assert_eq!(uploaded.file.content, "one two three");
        assert_eq!(uploaded.file.content_sha256.len(), 64);

        let fetched = engine.get_file(&uploaded.file.id).await.unwrap();
        assert_eq!(fetched.original_name, "standup.txt");
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_payload() {
        let mut config = Config::default();
        config.server.max_upload_bytes = 4;
        let engine = Engine::with_parts(config, Store::open_in_memory().unwrap(), None, None);

        let err = engine
            .upload_file("a.txt", "text/plain", b"too large")
            .await
            .unwrap_err();
        assert!(matches!(err, MangoDeskError::PayloadTooLarge { size: 9, limit: 4 }));
    }

    #[tokio::test]
    async fn test_generate_uses_stored_content_by_default() {
        let summarizer = StubSummarizer::new("- ship Friday");
        let seen = summarizer.requests();
        let engine = engine_with(summarizer, StubMailer::accepting());

        let summary = generated(&engine).await;
        assert_eq!(summary.version, 1);
        assert_eq!(summary.content, "- ship Friday");
        assert_eq!(summary.original_prompt, "Bullet points");
        assert_eq!(summary.model.as_deref(), Some("stub-model"));

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].content, "Alice: we ship on Friday");
        assert_eq!(requests[0].max_tokens, Some(1000));
    }

    #[tokio::test]
    async fn test_generate_prefers_explicit_content() {
        let summarizer = StubSummarizer::new("ok");
        let seen = summarizer.requests();
        let engine = engine_with(summarizer, StubMailer::accepting());
        let file = uploaded(&engine).await;

        engine
            .generate_summary(GenerateSummaryRequest {
                file_id: file.id,
                prompt: "Summarize".to_string(),
                content: Some("edited transcript".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap()[0].content, "edited transcript");
    }

    #[tokio::test]
    async fn test_generate_validation() {
        let engine = engine();
        let file = uploaded(&engine).await;

        let missing = engine
            .generate_summary(GenerateSummaryRequest {
                file_id: String::new(),
                prompt: "Summarize".to_string(),
                content: None,
            })
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "File ID and prompt are required");

        let blocked = engine
            .generate_summary(GenerateSummaryRequest {
                file_id: file.id,
                prompt: "exploit this".to_string(),
                content: None,
            })
            .await
            .unwrap_err();
        assert_eq!(blocked.to_string(), "Invalid prompt provided");

        let unknown = engine
            .generate_summary(GenerateSummaryRequest {
                file_id: "missing".to_string(),
                prompt: "Summarize".to_string(),
                content: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, MangoDeskError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_generate_without_summarizer() {
        let engine = Engine::with_parts(
            Config::default(),
            Store::open_in_memory().unwrap(),
            None,
            None,
        );
        let file = uploaded(&engine).await;

        let err = engine
            .generate_summary(GenerateSummaryRequest {
                file_id: file.id,
                prompt: "Summarize".to_string(),
                content: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "AI service not properly configured");
    }

    #[tokio::test]
    async fn test_update_and_compare_versions() {
        let engine = engine();
        let summary = generated(&engine).await;

        let updated = engine
            .update_summary(&summary.id, "# Standup\n- ship Monday", None)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let comparison = engine.compare_versions(&summary.id, None, None).await.unwrap();
        assert_eq!((comparison.from, comparison.to), (1, 2));
        assert_eq!(
            comparison.diff.segments,
            vec![
                DiffSegment::Unchanged {
                    content: "# Standup".to_string(),
                    previous_line: 1,
                    current_line: 1,
                },
                DiffSegment::Removed {
                    content: "- ship Friday".to_string(),
                    previous_line: 2,
                },
                DiffSegment::Added {
                    content: "- ship Monday".to_string(),
                    current_line: 2,
                },
            ]
        );

        let from_empty = engine
            .compare_versions(&summary.id, Some(0), Some(1))
            .await
            .unwrap();
        assert_eq!(from_empty.diff.stats().additions, 2);

        let out_of_range = engine
            .compare_versions(&summary.id, Some(1), Some(7))
            .await
            .unwrap_err();
        assert_eq!(out_of_range.to_string(), "Version 7 not found");

        let with_versions = engine.get_summary(&summary.id).await.unwrap();
        assert_eq!(with_versions.versions.len(), 2);
        assert_eq!(with_versions.summary.version, 2);
    }

    #[tokio::test]
    async fn test_update_requires_content() {
        let engine = engine();
        let summary = generated(&engine).await;
        let err = engine.update_summary(&summary.id, "  ", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Content is required");
    }

    #[tokio::test]
    async fn test_send_email_records_success() {
        let mailer = StubMailer::accepting();
        let outbox = mailer.outbox();
        let engine = engine_with(StubSummarizer::new("# Standup\n- ship Friday"), mailer);
        let summary = generated(&engine).await;

        let record = engine.send_email(share(&summary.id)).await.unwrap();
        assert_eq!(record.status, EmailStatus::Sent);
        assert_eq!(record.subject, "Meeting Summary: Standup");
        assert_eq!(record.provider_message_id.as_deref(), Some("stub-1"));
        assert!(record.sent_at.is_some());

        let sent = outbox.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments[0].filename, "Standup.txt");

        let history = engine.email_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(engine.get_email_record(&record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_send_email_records_failure() {
        let engine = engine_with(
            StubSummarizer::new("Notes"),
            StubMailer::failing("Email service quota exceeded"),
        );
        let summary = generated(&engine).await;

        let err = engine.send_email(share(&summary.id)).await.unwrap_err();
        assert_eq!(err.to_string(), "Email service quota exceeded");

        let history = engine.email_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, EmailStatus::Failed);
        assert_eq!(history[0].error.as_deref(), Some("Email service quota exceeded"));
    }

    #[tokio::test]
    async fn test_send_email_validation_and_missing_summary() {
        let engine = engine();

        let mut invalid = share("s-1");
        invalid.recipient_email = "nope".to_string();
        assert!(matches!(
            engine.send_email(invalid).await,
            Err(MangoDeskError::Validation(_))
        ));

        let missing = engine.send_email(share("missing")).await.unwrap_err();
        assert!(matches!(missing, MangoDeskError::NotFound(_)));
        assert!(engine.email_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_db_health() {
        assert!(engine().db_health().await.is_ok());
    }
}
