//! Outbound notifications (webmaster alerts, user emails).
//!
//! Every call site treats notifications as best-effort: they are dispatched
//! from detached tasks and failures only reach the log.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::domain::EmailInfo;

/// Template names understood by the notifier backend.
pub mod templates {
    /// Webmaster alert for new comments and replies.
    pub const COMMENT: &str = "comment";
    /// Tells an author their comment or reply was approved.
    pub const USER_COMMENT_APPROVAL: &str = "user-comment-approval";
    /// Tells a user somebody replied to them.
    pub const USER_COMMENT_REPLY: &str = "user-comment-reply";
}

/// Template argument carrying the post link.
pub const ARG_POST_URL: &str = "PostUrl";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification '{template}' failed: {message}")]
    Delivery { template: String, message: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_webmaster(&self, template: &str) -> Result<(), NotifyError>;

    async fn notify_user(
        &self,
        template: &str,
        emails: &[String],
        args: &HashMap<String, String>,
    ) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Default for the standalone binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_webmaster(&self, template: &str) -> Result<(), NotifyError> {
        info!(template = %template, "Webmaster notification");
        Ok(())
    }

    async fn notify_user(
        &self,
        template: &str,
        emails: &[String],
        args: &HashMap<String, String>,
    ) -> Result<(), NotifyError> {
        info!(template = %template, recipients = emails.len(), ?args, "User notification");
        Ok(())
    }
}

/// Send a webmaster alert from a detached task.
pub fn webmaster_detached(notifier: &Arc<dyn Notifier>, template: &'static str) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify_webmaster(template).await {
            error!(template = %template, error = %e, "Webmaster notification failed");
        }
    });
}

/// Send one user notification per recipient from a detached task.
pub fn users_detached(
    notifier: &Arc<dyn Notifier>,
    template: &'static str,
    recipients: Vec<EmailInfo>,
) {
    if recipients.is_empty() {
        return;
    }
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        for EmailInfo { email, post_url } in recipients {
            let args = HashMap::from([(ARG_POST_URL.to_string(), post_url)]);
            if let Err(e) = notifier
                .notify_user(template, std::slice::from_ref(&email), &args)
                .await
            {
                error!(
                    template = %template,
                    email = %email,
                    error = %e,
                    "User notification failed"
                );
            }
        }
    });
}
