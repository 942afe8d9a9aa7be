//! Email sending abstractions

pub mod console;
pub mod notifier;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use notifier::Notifier;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// Trait for delivering plain-text email
pub trait EmailSender: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        (**self).send(to, subject, body)
    }
}
