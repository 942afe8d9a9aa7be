//! Account and help request notifications
//!
//! Every message is best effort: delivery failures are logged and never
//! reach the caller, so a flaky mail server cannot undo a state change that
//! has already been committed.

use scan_core::{Assignment, HelpDetails};

use super::EmailSender;

const SUPPORT_ADDRESS: &str = "scanserviceandhelp@gmail.com";

/// Builds plain-text notifications and hands them to an [`EmailSender`]
pub struct Notifier<E> {
    sender: E,
    client_url: String,
}

impl<E: EmailSender> Notifier<E> {
    pub fn new(sender: E, client_url: impl Into<String>) -> Self {
        Self {
            sender,
            client_url: client_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn deliver(&self, to: &str, subject: &str, body: String) {
        if let Err(e) = self.sender.send(to, subject, &body) {
            tracing::warn!(to = %to, subject = %subject, error = %e, "Failed to send notification");
        }
    }

    pub fn verification(&self, to: &str, name: &str, raw_token: &str) {
        let body = format!(
            "Hello {name},\n\n\
             Thank you for signing up for SCAN. Please verify your email by opening the link below:\n\n\
             {}/verify-email?token={raw_token}\n\n\
             This link expires in 24 hours.",
            self.client_url
        );
        self.deliver(to, "Verify your email for SCAN", body);
    }

    pub fn password_reset(&self, to: &str, name: &str, raw_token: &str) {
        let body = format!(
            "Hello {name},\n\n\
             We received a request to reset your SCAN password. Open the link below to choose a new one:\n\n\
             {}/reset-password/{raw_token}\n\n\
             This link expires in 1 hour. If you didn't request this, you can safely ignore this email.",
            self.client_url
        );
        self.deliver(to, "Password Reset Request - SCAN", body);
    }

    pub fn request_accepted(&self, to: &str, name: &str, details: &HelpDetails, assignment: &Assignment) {
        let body = format!(
            "Hello {name},\n\n\
             Good news! A volunteer has accepted your help request.\n\n\
             Volunteer:\n  Name: {}\n  Contact: {}\n\n\
             Your completion code: {}\n\
             Please give this code to the volunteer once they have helped you.\n\n\
             Request details:\n  Help type: {}\n  Date: {}\n  Time: {}\n  Location: {}\n\n\
             You can log in to view more details: {}/login\n\n\
             Thank you for using SCAN!",
            assignment.volunteer_name,
            assignment.volunteer_contact,
            assignment.completion_code,
            details.title,
            details.requested_date,
            details.requested_time,
            details.location,
            self.client_url
        );
        self.deliver(to, "Help Request Accepted - SCAN", body);
    }

    pub fn request_completed(&self, to: &str, name: &str, details: &HelpDetails, assignment: &Assignment) {
        let body = format!(
            "Hello {name},\n\n\
             Your help request \"{}\" on {} at {} has been marked as completed by {}.\n\n\
             Thank you for using SCAN!",
            details.title, details.requested_date, details.requested_time, assignment.volunteer_name
        );
        self.deliver(to, "Help Request Completed - SCAN", body);
    }

    pub fn request_expired(&self, to: &str, name: &str, details: &HelpDetails) {
        let body = format!(
            "Hello {name},\n\n\
             Your help request \"{}\" for {} at {} in {} expired because no volunteer accepted it \
             before the requested time.\n\n\
             You are welcome to submit a new request at any time.",
            details.title, details.requested_date, details.requested_time, details.location
        );
        self.deliver(to, "Help Request Expired - SCAN", body);
    }

    pub fn volunteer_approved(&self, to: &str, name: &str) {
        let body = format!(
            "Hello {name},\n\n\
             Your volunteer account for SCAN has been approved by an administrator.\n\
             You can now log in to your account and start helping: {}/login",
            self.client_url
        );
        self.deliver(to, "Your Volunteer Account has been Approved!", body);
    }

    pub fn volunteer_rejected(&self, to: &str, name: &str) {
        let body = format!(
            "Hello {name},\n\n\
             Your volunteer account request on SCAN has been rejected by an administrator.\n\
             If you believe this was a mistake, please contact support at {SUPPORT_ADDRESS}"
        );
        self.deliver(to, "Your Volunteer Account Request Has Been Rejected", body);
    }

    pub fn account_terminated(&self, to: &str, name: &str) {
        let body = format!(
            "Hello {name},\n\n\
             Your account on SCAN has been terminated by an administrator.\n\
             If you would like to use our services again, you will need to sign up for a new account."
        );
        self.deliver(to, "Your SCAN Account Has Been Terminated", body);
    }

    pub fn account_suspended(&self, to: &str, name: &str) {
        let body = format!(
            "Hello {name},\n\n\
             Your account on SCAN has been suspended by an administrator. \
             You will not be able to log in until further notice.\n\
             If you believe this was a mistake, please contact support at {SUPPORT_ADDRESS}"
        );
        self.deliver(to, "Your SCAN Account Has Been Suspended", body);
    }

    pub fn account_restored(&self, to: &str, name: &str) {
        let body = format!(
            "Hello {name},\n\n\
             Your account on SCAN has been restored by an administrator. \
             You can now log in and use the platform again: {}/login",
            self.client_url
        );
        self.deliver(to, "Your SCAN Account Has Been Restored", body);
    }
}
