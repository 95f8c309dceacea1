use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MangoDeskError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Relational store settings
    pub database: DatabaseConfig,

    /// Summarization provider settings
    pub llm: LlmConfig,

    /// Outgoing email settings
    pub email: EmailConfig,

    /// Input validation limits
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Frontend origin allowed by CORS
    pub cors_origin: String,

    /// Maximum accepted request body (in bytes)
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider (gemini, openai)
    pub provider: String,

    /// Models to try in order; the first available one is used
    pub models: Vec<String>,

    /// API key for the provider
    pub api_key: Option<String>,

    /// Base URL override (for proxies and tests)
    pub base_url: Option<String>,

    /// Maximum tokens for generated summaries
    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 to 1.0)
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Email provider (resend)
    pub provider: String,

    /// API key for the provider
    pub api_key: Option<String>,

    /// Sender address
    pub from_address: String,

    /// Base URL override
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum words in an uploaded transcript
    pub max_words: usize,

    /// Maximum characters in a summary instruction
    pub max_prompt_chars: usize,

    /// Maximum characters in a personal email message
    pub max_message_chars: usize,

    /// Maximum decompressed size of a .docx document body
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
}

fn default_max_document_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
                cors_origin: "http://localhost:3000".to_string(),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                path: PathBuf::from("mangodesk.db"),
            },
            llm: LlmConfig {
                provider: "gemini".to_string(),
                models: vec![
                    "gemini-2.0-flash-exp".to_string(),
                    "gemini-2.0-flash".to_string(),
                    "gemini-1.5-flash".to_string(),
                    "gemini-1.5-pro".to_string(),
                ],
                api_key: None,
                base_url: None,
                max_tokens: Some(1000),
                temperature: Some(0.3),
            },
            email: EmailConfig {
                provider: "resend".to_string(),
                api_key: None,
                from_address: "noreply@yourdomain.com".to_string(),
                base_url: None,
            },
            limits: LimitsConfig {
                max_words: 10_000,
                max_prompt_chars: 500,
                max_message_chars: 500,
                max_document_bytes: default_max_document_bytes(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| MangoDeskError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MangoDeskError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = ["MangoDesk.toml", "mangodesk.toml", ".mangodesk.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            let path = url
                .strip_prefix("sqlite://")
                .or_else(|| url.strip_prefix("sqlite:"))
                .unwrap_or(&url);
            self.database.path = PathBuf::from(path);
        }

        let llm_key = match self.llm.provider.as_str() {
            "openai" => lookup("OPENAI_API_KEY"),
            _ => lookup("GEMINI_API_KEY"),
        };
        if llm_key.is_some() {
            self.llm.api_key = llm_key;
        }

        if let Some(key) = lookup("RESEND_API_KEY") {
            self.email.api_key = Some(key);
        }
        if let Some(from) = lookup("FROM_EMAIL") {
            self.email.from_address = from;
        }
        if let Some(origin) = lookup("FRONTEND_URL") {
            self.server.cors_origin = origin;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| MangoDeskError::Config(format!("Invalid PORT value: {}", port)))?;
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
