//! Fire-and-forget notifications sent after an upload completes.
//!
//! The upload path only ever calls `Notifier::notify`, which enqueues on a
//! bounded channel without waiting. A single background task started from
//! `main.rs` with `start_notifier` drains the channel and hands each message
//! to a `Mailer`. Delivery failures are logged and dropped; they never reach
//! the uploader.

use crate::error::NotificationError;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Result summary mailed to the admin who submitted an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadNotification {
    pub job_id: String,
    pub recipient: String,
    pub title: String,
    pub valid_count: u32,
    pub invalid_count: u32,
    pub has_error_report: bool,
}

impl UploadNotification {
    pub fn upload_result(
        job_id: &str,
        recipient: &str,
        valid_count: u32,
        invalid_count: u32,
        has_error_report: bool,
    ) -> Self {
        UploadNotification {
            job_id: job_id.to_string(),
            recipient: recipient.to_string(),
            title: "Upload Result".to_string(),
            valid_count,
            invalid_count,
            has_error_report,
        }
    }
}

/// Sending half of the notification queue. Cheap to clone.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<UploadNotification>,
}

impl Notifier {
    pub fn channel(capacity: usize) -> (Notifier, mpsc::Receiver<UploadNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Notifier { tx }, rx)
    }

    /// Never blocks; safe to call from the blocking thread pool.
    pub fn notify(&self, notification: UploadNotification) -> Result<(), NotificationError> {
        self.tx.try_send(notification).map_err(|e| match e {
            TrySendError::Full(_) => NotificationError::QueueFull,
            TrySendError::Closed(_) => NotificationError::QueueClosed,
        })
    }
}

pub trait Mailer: Send + Sync {
    fn send(&self, notification: &UploadNotification) -> Result<(), NotificationError>;
}

/// Writes notifications to the log instead of delivering them.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, n: &UploadNotification) -> Result<(), NotificationError> {
        info!(
            "{} for {}: upload {} created {} accounts, rejected {} rows{}",
            n.title,
            n.recipient,
            n.job_id,
            n.valid_count,
            n.invalid_count,
            if n.has_error_report { " (error report attached)" } else { "" }
        );
        Ok(())
    }
}

/// Drains the queue until every `Notifier` has been dropped.
pub async fn start_notifier(mut rx: mpsc::Receiver<UploadNotification>, mailer: Arc<dyn Mailer>) {
    while let Some(notification) = rx.recv().await {
        if let Err(e) = mailer.send(&notification) {
            warn!(
                "Dropping notification for upload {}: {}",
                notification.job_id, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        sent: Mutex<Vec<String>>,
    }

    impl Mailer for Recording {
        fn send(&self, n: &UploadNotification) -> Result<(), NotificationError> {
            if n.recipient.starts_with("broken") {
                return Err(NotificationError::Delivery("smtp down".into()));
            }
            self.sent.lock().unwrap().push(n.job_id.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_delivery_does_not_stop_the_queue() {
        let (notifier, rx) = Notifier::channel(8);
        let mailer = Arc::new(Recording {
            sent: Mutex::new(Vec::new()),
        });

        notifier
            .notify(UploadNotification::upload_result("1", "broken@x.io", 1, 0, false))
            .unwrap();
        notifier
            .notify(UploadNotification::upload_result("2", "ok@x.io", 0, 1, true))
            .unwrap();
        drop(notifier);

        start_notifier(rx, mailer.clone()).await;
        assert_eq!(*mailer.sent.lock().unwrap(), vec!["2".to_string()]);
    }

    #[test]
    fn full_queue_is_reported_without_blocking() {
        let (notifier, _rx) = Notifier::channel(1);
        let n = UploadNotification::upload_result("1", "a@x.io", 0, 0, false);
        notifier.notify(n.clone()).unwrap();
        assert!(matches!(notifier.notify(n), Err(NotificationError::QueueFull)));
    }

    #[test]
    fn closed_queue_is_reported() {
        let (notifier, rx) = Notifier::channel(1);
        drop(rx);
        let n = UploadNotification::upload_result("1", "a@x.io", 0, 0, false);
        assert!(matches!(notifier.notify(n), Err(NotificationError::QueueClosed)));
    }
}
