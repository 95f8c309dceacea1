//! Sharing summaries by email
//!
//! Composition and validation live in [`EmailComposer`]; delivery goes
//! through the [`Mailer`] trait so providers can be swapped.

mod compose;
mod mailer;
mod resend;

pub use compose::{subject_for, EmailComposer};
pub use mailer::{Attachment, DeliveryReceipt, EmailRequest, Mailer, OutgoingEmail};
pub use resend::{create_mailer, ResendMailer};
