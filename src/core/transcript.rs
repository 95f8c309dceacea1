use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read};
use tracing::debug;

use crate::config::LimitsConfig;
use crate::error::{MangoDeskError, Result};

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    Text,
    Docx,
    Doc,
}

impl TranscriptKind {
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        // ignore parameters such as "; charset=utf-8"
        let essence = mime_type.split(';').next().unwrap_or("").trim();
        match essence {
            MIME_TEXT => Some(TranscriptKind::Text),
            MIME_DOCX => Some(TranscriptKind::Docx),
            MIME_DOC => Some(TranscriptKind::Doc),
            _ => None,
        }
    }

    /// Fallback for clients that send a generic content type
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(TranscriptKind::Text),
            "docx" => Some(TranscriptKind::Docx),
            "doc" => Some(TranscriptKind::Doc),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            TranscriptKind::Text => MIME_TEXT,
            TranscriptKind::Docx => MIME_DOCX,
            TranscriptKind::Doc => MIME_DOC,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptKind::Text => "text",
            TranscriptKind::Docx => "docx",
            TranscriptKind::Doc => "doc",
        }
    }
}

/// Decoded transcript ready to be stored
#[derive(Debug, Clone)]
pub struct ProcessedTranscript {
    pub content: String,
    pub kind: TranscriptKind,
    pub word_count: usize,
    pub sha256: String,
}

/// Turns uploaded bytes into validated transcript text
pub struct TranscriptProcessor {
    max_words: usize,
    max_document_bytes: u64,

    /// Matches text runs, paragraph ends, tabs and breaks in WordprocessingML
    docx_token_regex: Regex,
}

impl TranscriptProcessor {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_words: limits.max_words,
            max_document_bytes: limits.max_document_bytes,
            docx_token_regex: Regex::new(
                r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|(</w:p>)|(<w:tab\s*/>)|(<w:br\s*/>)",
            )
            .expect("Invalid docx token regex"),
        }
    }

    /// Decode and validate an uploaded transcript
    pub fn process(&self, bytes: &[u8], mime_type: &str) -> Result<ProcessedTranscript> {
        let kind = TranscriptKind::from_mime(mime_type)
            .ok_or_else(|| MangoDeskError::UnsupportedFileType(mime_type.to_string()))?;

        let raw = match kind {
            TranscriptKind::Text => String::from_utf8(bytes.to_vec()).map_err(|_| {
                MangoDeskError::Validation("Text file is not valid UTF-8".to_string())
            })?,
            TranscriptKind::Docx => self.extract_docx_text(bytes)?,
            TranscriptKind::Doc => String::from_utf8_lossy(bytes).into_owned(),
        };

        let content = raw.trim().to_string();
        if content.is_empty() {
            return Err(MangoDeskError::Validation(
                "File appears to be empty".to_string(),
            ));
        }

        let word_count = count_words(&content);
        if word_count > self.max_words {
            return Err(MangoDeskError::Validation(format!(
                "File is too long. Maximum {} words allowed.",
                self.max_words
            )));
        }

        debug!("Processed {} transcript: {} words", kind.as_str(), word_count);

        Ok(ProcessedTranscript {
            content,
            kind,
            word_count,
            sha256: format!("{:x}", Sha256::digest(bytes)),
        })
    }

    fn extract_docx_text(&self, bytes: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| MangoDeskError::Document(format!("Not a valid .docx file: {}", e)))?;

        let body = archive
            .by_name("word/document.xml")
            .map_err(|e| MangoDeskError::Document(format!("Missing document body: {}", e)))?;

        let cap = self.max_document_bytes;
        let too_large = || {
            MangoDeskError::Document(format!(
                "Document body exceeds the {} byte limit",
                cap
            ))
        };
        if body.size() > cap {
            return Err(too_large());
        }

        // the declared size can lie, so bound the actual read too
        let mut raw = Vec::new();
        body.take(cap + 1).read_to_end(&mut raw)?;
        if raw.len() as u64 > cap {
            return Err(too_large());
        }
        let xml = String::from_utf8(raw)
            .map_err(|_| MangoDeskError::Document("Document body is not valid UTF-8".to_string()))?;

        let mut text = String::new();
        for caps in self.docx_token_regex.captures_iter(&xml) {
            if let Some(run) = caps.get(1) {
                text.push_str(&html_escape::decode_html_entities(run.as_str()));
            } else if caps.get(2).is_some() || caps.get(4).is_some() {
                text.push('\n');
            } else if caps.get(3).is_some() {
                text.push('\t');
            }
        }

        Ok(text)
    }
}

pub fn count_words(content: &str) -> usize {
    content.split_whitespace().count()
}
