//! Console mailer used when no SMTP server is configured

use super::EmailSender;

/// Prints every message to stdout instead of delivering it
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let rule = "=".repeat(60);
        println!("\n{rule}\n  To:      {to}\n  Subject: {subject}\n{}", "-".repeat(60));
        for line in body.lines() {
            println!("  {line}");
        }
        println!("{rule}\n");

        tracing::info!(to = %to, subject = %subject, "Email written to console");
        Ok(())
    }
}
