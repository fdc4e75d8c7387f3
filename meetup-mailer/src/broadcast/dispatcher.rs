//! Per-recipient delivery with failure isolation.

use serde::Serialize;
use tracing::{info, warn};

use crate::broadcast::transport::MailTransport;
use crate::error::{Error, Result};
use crate::sheet::EmailSet;

/// A recipient whose delivery failed, with the captured reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedDelivery {
    pub email: String,
    pub error: String,
}

/// Aggregate outcome of a broadcast.
///
/// Every input address lands in exactly one of `sent` or `failed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BroadcastResult {
    pub sent: Vec<String>,
    pub failed: Vec<FailedDelivery>,
}

impl BroadcastResult {
    /// One-line report of the counts and failed addresses.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Emails sent: {}. Failures: {}.",
            self.sent.len(),
            self.failed.len()
        );
        if !self.failed.is_empty() {
            let addresses: Vec<&str> = self.failed.iter().map(|f| f.email.as_str()).collect();
            text.push_str(&format!(" Failed addresses: {}.", addresses.join(", ")));
        }
        text
    }
}

/// Result of a broadcast request.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastOutcome {
    /// The recipient set was empty; nothing was sent.
    NoRecipients,
    /// At least one delivery was attempted.
    Delivered(BroadcastResult),
}

/// Send `message` to every address, one at a time, in set order.
///
/// A blank message is rejected before any send. A failed delivery is recorded
/// and the loop moves on; partial success is not an error.
pub async fn broadcast<T>(
    transport: &T,
    message: &str,
    recipients: &EmailSet,
) -> Result<BroadcastOutcome>
where
    T: MailTransport + ?Sized,
{
    if message.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "The message field must not be empty.".to_string(),
        ));
    }

    if recipients.is_empty() {
        info!("broadcast_no_recipients");
        return Ok(BroadcastOutcome::NoRecipients);
    }

    info!(
        recipients = recipients.len(),
        message_length = message.len(),
        "broadcast_start"
    );

    let mut result = BroadcastResult::default();
    for email in recipients {
        match transport.send(email, message).await {
            Ok(()) => {
                info!(recipient = %email, "broadcast_delivery_sent");
                result.sent.push(email.clone());
            }
            Err(e) => {
                let error = match e {
                    Error::DeliveryFailed { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(recipient = %email, error = %error, "broadcast_delivery_failed");
                result.failed.push(FailedDelivery {
                    email: email.clone(),
                    error,
                });
            }
        }
    }

    info!(
        sent = result.sent.len(),
        failed = result.failed.len(),
        "broadcast_complete"
    );

    Ok(BroadcastOutcome::Delivered(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call; fails for addresses in `reject`.
    #[derive(Default)]
    struct RecordingTransport {
        reject: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, to: &str, _message: &str) -> Result<()> {
            self.calls.lock().unwrap().push(to.to_string());
            if self.reject.iter().any(|r| r == to) {
                return Err(Error::DeliveryFailed {
                    address: to.to_string(),
                    reason: "mailbox unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    fn set(addresses: &[&str]) -> EmailSet {
        addresses.iter().map(|a| a.to_string()).collect()
    }

    #[tokio::test]
    async fn test_blank_message_sends_nothing() {
        let transport = RecordingTransport::default();
        let result = broadcast(&transport, "  \n ", &set(&["a@x.io"])).await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_set_is_no_recipients() {
        let transport = RecordingTransport::default();
        let outcome = broadcast(&transport, "hello", &EmailSet::new()).await.unwrap();

        assert_eq!(outcome, BroadcastOutcome::NoRecipients);
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_sends() {
        let transport = RecordingTransport {
            reject: vec!["b@x.io".to_string()],
            ..Default::default()
        };
        let recipients = set(&["a@x.io", "b@x.io", "c@x.io"]);

        let outcome = broadcast(&transport, "hello", &recipients).await.unwrap();
        let BroadcastOutcome::Delivered(result) = outcome else {
            panic!("expected deliveries");
        };

        assert_eq!(result.sent, vec!["a@x.io", "c@x.io"]);
        assert_eq!(
            result.failed,
            vec![FailedDelivery {
                email: "b@x.io".to_string(),
                error: "mailbox unavailable".to_string(),
            }]
        );
        assert_eq!(
            *transport.calls.lock().unwrap(),
            vec!["a@x.io", "b@x.io", "c@x.io"]
        );
    }

    #[tokio::test]
    async fn test_every_address_accounted_for() {
        for k in 0..6 {
            let addresses: Vec<String> = (0..k).map(|i| format!("user{}@x.io", i)).collect();
            let recipients: EmailSet = addresses.iter().cloned().collect();
            let transport = RecordingTransport {
                reject: addresses.iter().step_by(2).cloned().collect(),
                ..Default::default()
            };

            match broadcast(&transport, "hi", &recipients).await.unwrap() {
                BroadcastOutcome::NoRecipients => assert_eq!(k, 0),
                BroadcastOutcome::Delivered(result) => {
                    assert_eq!(result.sent.len() + result.failed.len(), k);
                }
            }
        }
    }

    #[test]
    fn test_summary() {
        let ok = BroadcastResult {
            sent: vec!["a@x.io".to_string()],
            failed: vec![],
        };
        assert_eq!(ok.summary(), "Emails sent: 1. Failures: 0.");

        let mixed = BroadcastResult {
            sent: vec!["a@x.io".to_string()],
            failed: vec![
                FailedDelivery {
                    email: "b@x.io".to_string(),
                    error: "x".to_string(),
                },
                FailedDelivery {
                    email: "c@x.io".to_string(),
                    error: "y".to_string(),
                },
            ],
        };
        assert_eq!(
            mixed.summary(),
            "Emails sent: 1. Failures: 2. Failed addresses: b@x.io, c@x.io."
        );
    }
}
