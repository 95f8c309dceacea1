use regex::Regex;
use tera::{Context, Tera};

use crate::config::LimitsConfig;
use crate::error::{MangoDeskError, Result};
use super::mailer::{Attachment, EmailRequest, OutgoingEmail};

const DEFAULT_ATTACHMENT_NAME: &str = "Meeting Summary";

const EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Meeting Summary</title>
    <style>
      body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
      .container { max-width: 600px; margin: 0 auto; padding: 20px; }
      .header { background: #f8f9fa; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
      .content { background: white; padding: 20px; border: 1px solid #e9ecef; border-radius: 8px; }
      .footer { text-align: center; margin-top: 20px; color: #6c757d; font-size: 14px; }
    </style>
  </head>
  <body>
    <div class="container">
      <div class="header">
        <h1>Meeting Summary</h1>
        <p>Generated by MangoDesk</p>
      </div>
      <div class="content">
        {% if message %}<p><strong>Personal Message:</strong> {{ message }}</p>{% endif %}
        <p><strong>Summary Attached</strong></p>
        <p>The complete meeting summary is attached to this email for your convenience.</p>
        {% if attachments %}
        <h3>Attachments:</h3>
        <ul>
          {% for name in attachments %}<li>{{ name }}</li>{% endfor %}
        </ul>
        {% endif %}
      </div>
      <div class="footer">
        <p>This summary was generated using AI technology.</p>
        <p>Sent on {{ sent_on }}</p>
      </div>
    </div>
  </body>
</html>
"#;

/// Validates share requests and turns them into outgoing messages
pub struct EmailComposer {
    max_message_chars: usize,

    /// Loose address shape check: something@something.tld
    email_regex: Regex,

    /// Characters stripped from attachment names
    unsafe_name_regex: Regex,
}

impl EmailComposer {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_message_chars: limits.max_message_chars,
            email_regex: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"),
            unsafe_name_regex: Regex::new(r"[^A-Za-z0-9_\s-]")
                .expect("Invalid attachment name regex"),
        }
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email_regex.is_match(email)
    }

    /// Check a share request, reporting every problem at once
    pub fn validate(&self, request: &EmailRequest) -> Result<()> {
        let mut errors = Vec::new();

        if request.summary_id.trim().is_empty() {
            errors.push("Summary ID is required".to_string());
        }

        if request.recipient_email.trim().is_empty() {
            errors.push("Recipient email is required".to_string());
        } else if !self.is_valid_email(&request.recipient_email) {
            errors.push(format!("Invalid recipient email: {}", request.recipient_email));
        }

        if let Some(message) = &request.message {
            if message.chars().count() > self.max_message_chars {
                errors.push(format!(
                    "Message is too long (max {} characters)",
                    self.max_message_chars
                ));
            }
        }

        if !request.attach_docx && !request.attach_txt {
            errors.push("At least one attachment type must be selected".to_string());
        }
        if request.attach_docx {
            errors.push("DOCX attachments are not supported".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MangoDeskError::Validation(format!(
                "Validation failed: {}",
                errors.join(", ")
            )))
        }
    }

    /// Attachment base name: explicit, derived from the summary, or the default
    pub fn attachment_name(&self, requested: Option<&str>, summary: &str) -> String {
        let base = requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.derive_name(summary));

        let safe = self.strip_unsafe(&base);
        if safe.is_empty() {
            DEFAULT_ATTACHMENT_NAME.to_string()
        } else {
            safe
        }
    }

    fn derive_name(&self, summary: &str) -> String {
        let Some(first) = summary.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return DEFAULT_ATTACHMENT_NAME.to_string();
        };

        if let Some(title) = first.strip_prefix("# ") {
            return self.strip_unsafe(title);
        }

        let looks_like_title = first.chars().count() < 50
            && first.chars().next().is_some_and(|c| c.is_ascii_uppercase());
        if looks_like_title {
            return self.strip_unsafe(first);
        }

        DEFAULT_ATTACHMENT_NAME.to_string()
    }

    fn strip_unsafe(&self, name: &str) -> String {
        self.unsafe_name_regex.replace_all(name, "").trim().to_string()
    }

    /// Build the outgoing message for a validated request
    pub fn compose(
        &self,
        request: &EmailRequest,
        summary_content: &str,
        from: &str,
        sent_on: &str,
    ) -> Result<OutgoingEmail> {
        let name = self.attachment_name(request.filename.as_deref(), summary_content);

        let mut attachments = Vec::new();
        if request.attach_txt {
            attachments.push(Attachment {
                filename: format!("{}.txt", name),
                content_type: "text/plain".to_string(),
                content: summary_content.as_bytes().to_vec(),
            });
        }

        let mut context = Context::new();
        context.insert(
            "message",
            &request.message.as_deref().filter(|m| !m.trim().is_empty()),
        );
        context.insert(
            "attachments",
            &attachments.iter().map(|a| a.filename.as_str()).collect::<Vec<_>>(),
        );
        context.insert("sent_on", sent_on);

        let html = Tera::one_off(EMAIL_TEMPLATE, &context, true)?;

        Ok(OutgoingEmail {
            from: from.to_string(),
            to: vec![request.recipient_email.clone()],
            subject: subject_for(&name),
            html,
            attachments,
        })
    }
}

pub fn subject_for(attachment_name: &str) -> String {
    format!("Meeting Summary: {}", attachment_name)
}
