//! Fatal failure alerts
//!
//! When a run ends on a fatal error the binary builds an [`Alert`] and hands
//! it to an [`AlertSink`]. Delivery is best effort: [`dispatch`] logs a
//! failed delivery and never returns an error.

use crate::config::AlertConfig;
use chrono::{DateTime, Local};
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while delivering an alert
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// A subject/body pair describing a fatal failure
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
    pub raised_at: DateTime<Local>,
}

impl Alert {
    /// Builds the alert for a run that stopped on `error`
    pub fn fatal(error: &dyn Display, run_id: &str) -> Self {
        let raised_at = Local::now();
        let body = format!(
            "The directory harvest stopped on a fatal error.\n\n\
             Run: {}\n\
             Time: {}\n\
             Error: {}\n\n\
             Documents written before the failure are complete and usable.\n",
            run_id,
            raised_at.format("%Y-%m-%d %H:%M:%S"),
            error
        );
        Self {
            subject: "Directory harvest crashed".to_string(),
            body,
            raised_at,
        }
    }
}

/// Delivers alerts to an operator
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Writes alerts to the log only
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        tracing::error!("ALERT: {}\n{}", alert.subject, alert.body);
        Ok(())
    }
}

/// Writes alerts as RFC 822 style messages into a directory an external
/// mailer picks up from
#[derive(Debug, Clone)]
pub struct OutboxAlertSink {
    dir: PathBuf,
    sender: String,
    recipient: String,
}

impl OutboxAlertSink {
    pub fn new(dir: impl Into<PathBuf>, sender: &str, recipient: &str) -> Self {
        Self {
            dir: dir.into(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
        }
    }

    fn render(&self, alert: &Alert) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.sender,
            self.recipient,
            alert.subject,
            alert.raised_at.to_rfc2822(),
            alert.body
        )
    }
}

impl AlertSink for OutboxAlertSink {
    fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        fs::create_dir_all(&self.dir)?;

        let stamp = alert.raised_at.format("%Y%m%d_%H%M%S");
        let mut path = self.dir.join(format!("alert_{}.eml", stamp));
        let mut counter = 1;
        while path.exists() {
            path = self.dir.join(format!("alert_{}-{}.eml", stamp, counter));
            counter += 1;
        }

        fs::write(&path, self.render(alert))?;
        tracing::info!("Alert queued for {}: {}", self.recipient, path.display());
        Ok(())
    }
}

/// Sink for the configured alert channel
pub fn sink_from_config(config: &AlertConfig) -> Box<dyn AlertSink> {
    match &config.outbox_dir {
        Some(dir) => Box::new(OutboxAlertSink::new(
            dir.clone(),
            &config.sender,
            &config.recipient,
        )),
        None => Box::new(LogAlertSink),
    }
}

/// Delivers `alert`, logging instead of failing when delivery does not work
pub fn dispatch(sink: &dyn AlertSink, alert: &Alert) {
    match sink.deliver(alert) {
        Ok(()) => tracing::info!("Alert sent: {}", alert.subject),
        Err(e) => tracing::warn!("Failed to send alert '{}': {}", alert.subject, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FailingSink {
        attempts: Mutex<u32>,
    }

    impl AlertSink for FailingSink {
        fn deliver(&self, _alert: &Alert) -> Result<(), AlertError> {
            *self.attempts.lock().unwrap() += 1;
            Err(AlertError::Delivery("smtp unreachable".to_string()))
        }
    }

    #[test]
    fn test_fatal_alert_describes_error() {
        let alert = Alert::fatal(&"disk full", "20240131_142501");
        assert!(alert.body.contains("disk full"));
        assert!(alert.body.contains("20240131_142501"));
        assert!(!alert.subject.is_empty());
    }

    #[test]
    fn test_outbox_writes_message_files() {
        let dir = TempDir::new().unwrap();
        let sink = OutboxAlertSink::new(dir.path().join("outbox"), "from@test", "to@test");
        let alert = Alert::fatal(&"boom", "run");

        sink.deliver(&alert).unwrap();
        sink.deliver(&alert).unwrap();

        let files: Vec<_> = fs::read_dir(dir.path().join("outbox"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 2);
        let message = fs::read_to_string(&files[0]).unwrap();
        assert!(message.starts_with("From: from@test\r\nTo: to@test\r\n"));
        assert!(message.contains("Subject: Directory harvest crashed"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_dispatch_swallows_delivery_failure() {
        let sink = FailingSink {
            attempts: Mutex::new(0),
        };
        dispatch(&sink, &Alert::fatal(&"boom", "run"));
        assert_eq!(*sink.attempts.lock().unwrap(), 1);
    }

    #[test]
    fn test_sink_from_config() {
        let dir = TempDir::new().unwrap();
        let config = AlertConfig {
            outbox_dir: Some(dir.path().to_path_buf()),
            ..AlertConfig::default()
        };
        sink_from_config(&config)
            .deliver(&Alert::fatal(&"boom", "run"))
            .unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        assert!(sink_from_config(&AlertConfig::default())
            .deliver(&Alert::fatal(&"boom", "run"))
            .is_ok());
    }
}
