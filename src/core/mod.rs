mod engine;
mod differ;
mod diff_view;
mod transcript;
mod llm;
mod mail;

#[cfg(test)]
pub(crate) mod testing;

pub use differ::{compute_line_diff, DiffResult, DiffSegment, DiffStats};
pub use diff_view::render_diff;
pub use transcript::TranscriptKind;
pub use mail::EmailRequest;

// Export the main engine
pub use engine::{Engine, GenerateSummaryRequest};
