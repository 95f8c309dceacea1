use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::error::{MangoDeskError, Result};
use super::db;
use super::migrations::apply_migrations;
use super::models::{
    EmailRecord, EmailStatus, FileRecord, NewEmailRecord, NewFile, NewSummary, SummaryRecord,
    SummaryVersionRecord,
};

/// Synchronous handle to the relational store
///
/// Cloning is cheap; all clones share one connection behind a mutex.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and bring the schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut conn = db::open(path)?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MangoDeskError::Internal("Database connection lock poisoned".to_string()))
    }

    /// Round-trip a trivial query
    pub fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn insert_file(&self, file: NewFile) -> Result<FileRecord> {
        let record = FileRecord {
            id: Uuid::new_v4().to_string(),
            original_name: file.original_name,
            mime_type: file.mime_type,
            file_size: file.file_size,
            word_count: file.word_count,
            content_sha256: file.content_sha256,
            content: file.content,
            created_at: Utc::now(),
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO files (id, original_name, mime_type, file_size, word_count, content_sha256, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.original_name,
                record.mime_type,
                record.file_size,
                record.word_count,
                record.content_sha256,
                record.content,
                record.created_at,
            ],
        )?;

        debug!("Stored file {} ({})", record.id, record.original_name);
        Ok(record)
    }

    pub fn get_file(&self, id: &str) -> Result<FileRecord> {
        let conn = self.lock()?;
        conn.query_row("SELECT * FROM files WHERE id = ?1", [id], FileRecord::from_row)
            .optional()?
            .ok_or_else(|| MangoDeskError::NotFound("File".to_string()))
    }

    /// Create a summary together with its first version
    pub fn create_summary(&self, summary: NewSummary) -> Result<SummaryRecord> {
        let now = Utc::now();
        let record = SummaryRecord {
            id: Uuid::new_v4().to_string(),
            file_id: summary.file_id,
            original_prompt: summary.prompt,
            content: summary.content,
            version: 1,
            tokens_used: summary.tokens_used,
            model: summary.model,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let file_exists = tx
            .query_row("SELECT 1 FROM files WHERE id = ?1", [&record.file_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !file_exists {
            return Err(MangoDeskError::NotFound("File".to_string()));
        }

        tx.execute(
            "INSERT INTO summaries (id, file_id, original_prompt, content, version, tokens_used, model, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.file_id,
                record.original_prompt,
                record.content,
                record.version,
                record.tokens_used,
                record.model,
                record.created_at,
                record.updated_at,
            ],
        )?;
        insert_version(&tx, &record.id, &record.content, &record.original_prompt, 1)?;
        tx.commit()?;

        debug!("Created summary {} for file {}", record.id, record.file_id);
        Ok(record)
    }

    pub fn get_summary(&self, id: &str) -> Result<SummaryRecord> {
        let conn = self.lock()?;
        fetch_summary(&conn, id)
    }

    /// Replace the active content and append the next version
    ///
    /// The new version row reuses the original prompt when none is given.
    pub fn update_summary_content(
        &self,
        id: &str,
        content: &str,
        prompt: Option<&str>,
    ) -> Result<SummaryRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = fetch_summary(&tx, id)?;
        let next_version = current.version + 1;
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&current.original_prompt)
            .to_string();
        let now = Utc::now();

        tx.execute(
            "UPDATE summaries SET content = ?1, version = ?2, updated_at = ?3 WHERE id = ?4",
            params![content, next_version, now, id],
        )?;
        insert_version(&tx, id, content, &prompt, next_version)?;
        tx.commit()?;

        debug!("Summary {} advanced to version {}", id, next_version);
        Ok(SummaryRecord {
            content: content.to_string(),
            version: next_version,
            updated_at: now,
            ..current
        })
    }

    /// All versions of a summary, oldest first
    pub fn list_versions(&self, summary_id: &str) -> Result<Vec<SummaryVersionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM summary_versions WHERE summary_id = ?1 ORDER BY version ASC",
        )?;
        let versions = stmt
            .query_map([summary_id], SummaryVersionRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    pub fn get_version(&self, summary_id: &str, version: i64) -> Result<SummaryVersionRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM summary_versions WHERE summary_id = ?1 AND version = ?2",
            params![summary_id, version],
            SummaryVersionRecord::from_row,
        )
        .optional()?
        .ok_or_else(|| MangoDeskError::NotFound(format!("Version {}", version)))
    }

    /// Append the outcome of one send attempt
    pub fn insert_email_record(&self, email: NewEmailRecord) -> Result<EmailRecord> {
        let now = Utc::now();
        let record = EmailRecord {
            id: Uuid::new_v4().to_string(),
            summary_id: email.summary_id,
            recipient_email: email.recipient_email,
            subject: email.subject,
            message: email.message,
            sent_at: (email.status == EmailStatus::Sent).then_some(now),
            status: email.status,
            provider_message_id: email.provider_message_id,
            error: email.error,
            created_at: now,
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO email_requests (id, summary_id, recipient_email, subject, message, status, provider_message_id, error, sent_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.summary_id,
                record.recipient_email,
                record.subject,
                record.message,
                record.status,
                record.provider_message_id,
                record.error,
                record.sent_at,
                record.created_at,
            ],
        )?;

        Ok(record)
    }

    /// Every send attempt, newest first
    pub fn list_email_records(&self) -> Result<Vec<EmailRecord>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT * FROM email_requests ORDER BY created_at DESC, rowid DESC")?;
        let records = stmt
            .query_map([], EmailRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn get_email_record(&self, id: &str) -> Result<EmailRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM email_requests WHERE id = ?1",
            [id],
            EmailRecord::from_row,
        )
        .optional()?
        .ok_or_else(|| MangoDeskError::NotFound("Email share".to_string()))
    }
}

fn fetch_summary(conn: &Connection, id: &str) -> Result<SummaryRecord> {
    conn.query_row("SELECT * FROM summaries WHERE id = ?1", [id], SummaryRecord::from_row)
        .optional()?
        .ok_or_else(|| MangoDeskError::NotFound("Summary".to_string()))
}

fn insert_version(
    conn: &Connection,
    summary_id: &str,
    content: &str,
    prompt: &str,
    version: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO summary_versions (id, summary_id, content, prompt, version, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            Uuid::new_v4().to_string(),
            summary_id,
            content,
            prompt,
            version,
            Utc::now()
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn new_file() -> NewFile {
        NewFile {
            original_name: "standup.txt".to_string(),
            mime_type: "text/plain".to_string(),
            file_size: 42,
            word_count: 7,
            content_sha256: "abc".to_string(),
            content: "Alice will ship the release on Friday".to_string(),
        }
    }

    fn new_summary(file_id: &str) -> NewSummary {
        NewSummary {
            file_id: file_id.to_string(),
            prompt: "Bullet points".to_string(),
            content: "- ship Friday".to_string(),
            tokens_used: Some(12),
            model: Some("gemini-2.0-flash".to_string()),
        }
    }

    fn email(summary_id: &str, status: EmailStatus) -> NewEmailRecord {
        NewEmailRecord {
            summary_id: summary_id.to_string(),
            recipient_email: "team@example.com".to_string(),
            subject: "Meeting Summary: Standup".to_string(),
            message: String::new(),
            status,
            provider_message_id: None,
            error: None,
        }
    }

    #[test]
    fn test_ping() {
        assert!(store().ping().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let store = store();
        let stored = store.insert_file(new_file()).unwrap();
        let fetched = store.get_file(&stored.id).unwrap();
        assert_eq!(stored, fetched);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = store().get_file("nope").unwrap_err();
        assert!(matches!(err, MangoDeskError::NotFound(_)));
    }

    #[test]
    fn test_create_summary_writes_first_version() {
        let store = store();
        let file = store.insert_file(new_file()).unwrap();
        let summary = store.create_summary(new_summary(&file.id)).unwrap();

        assert_eq!(summary.version, 1);
        let versions = store.list_versions(&summary.id).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[0].content, "- ship Friday");
        assert_eq!(versions[0].prompt, "Bullet points");
    }

    #[test]
    fn test_create_summary_for_unknown_file() {
        let err = store().create_summary(new_summary("missing")).unwrap_err();
        assert!(matches!(err, MangoDeskError::NotFound(_)));
    }

    #[test]
    fn test_update_increments_version_and_appends_history() {
        let store = store();
        let file = store.insert_file(new_file()).unwrap();
        let summary = store.create_summary(new_summary(&file.id)).unwrap();

        let updated = store
            .update_summary_content(&summary.id, "- ship Monday", None)
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, "- ship Monday");

        let again = store
            .update_summary_content(&summary.id, "- ship Tuesday", Some("Shorter"))
            .unwrap();
        assert_eq!(again.version, 3);

        let versions = store.list_versions(&summary.id).unwrap();
        let numbers: Vec<i64> = versions.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(versions[1].prompt, "Bullet points");
        assert_eq!(versions[2].prompt, "Shorter");

        let current = store.get_summary(&summary.id).unwrap();
        assert_eq!(current.version, 3);
        assert_eq!(current.content, "- ship Tuesday");
        assert_eq!(store.get_version(&summary.id, 1).unwrap().content, "- ship Friday");
    }

    #[test]
    fn test_update_missing_summary() {
        let err = store()
            .update_summary_content("missing", "x", None)
            .unwrap_err();
        assert!(matches!(err, MangoDeskError::NotFound(_)));
    }

    #[test]
    fn test_get_version_out_of_range() {
        let store = store();
        let file = store.insert_file(new_file()).unwrap();
        let summary = store.create_summary(new_summary(&file.id)).unwrap();

        let err = store.get_version(&summary.id, 5).unwrap_err();
        assert_eq!(err.to_string(), "Version 5 not found");
    }

    #[test]
    fn test_email_records_are_appended() {
        let store = store();
        let file = store.insert_file(new_file()).unwrap();
        let summary = store.create_summary(new_summary(&file.id)).unwrap();

        let mut sent = email(&summary.id, EmailStatus::Sent);
        sent.provider_message_id = Some("msg_1".to_string());
        let sent = store.insert_email_record(sent).unwrap();
        assert!(sent.sent_at.is_some());

        let mut failed = email(&summary.id, EmailStatus::Failed);
        failed.error = Some("Email service quota exceeded".to_string());
        let failed = store.insert_email_record(failed).unwrap();
        assert!(failed.sent_at.is_none());

        let all = store.list_email_records().unwrap();
        assert_eq!(all.len(), 2);

        let fetched = store.get_email_record(&failed.id).unwrap();
        assert_eq!(fetched.status, EmailStatus::Failed);
        assert_eq!(fetched.error.as_deref(), Some("Email service quota exceeded"));
    }

    #[test]
    fn test_clones_share_connection() {
        let store = store();
        let clone = store.clone();
        let file = store.insert_file(new_file()).unwrap();
        assert!(clone.get_file(&file.id).is_ok());
    }
}
