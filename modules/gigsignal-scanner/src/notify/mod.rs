//! Notification dispatch: pluggable backend, Markdown formatting with
//! escaping, and batch delivery semantics.

pub mod noop;
pub mod telegram;

pub use noop::NoopNotifier;
pub use telegram::TelegramNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use gigsignal_common::Opportunity;

/// Pluggable delivery backend. One call, one message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}

/// Escape characters the Markdown renderer treats specially.
pub fn escape_markdown(text: &str) -> String {
    text.replace('*', "\\*")
        .replace('_', "\\_")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

/// Amounts additionally need `$` escaped.
fn escape_amount(text: &str) -> String {
    escape_markdown(text).replace('$', "\\$")
}

pub struct Dispatcher {
    backend: Arc<dyn Notifier>,
    max_per_message: usize,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Notifier>, max_per_message: usize) -> Self {
        Self {
            backend,
            max_per_message: max_per_message.max(1),
        }
    }

    /// Render records into messages of at most `max_per_message` entries.
    pub fn format_batches(&self, opps: &[Opportunity]) -> Vec<String> {
        opps.chunks(self.max_per_message)
            .map(format_message)
            .collect()
    }

    /// Send every batch. Returns true only when all messages were
    /// accepted; on any failure the caller must not mark the records as
    /// sent, so they go out again next tick (at-least-once).
    pub async fn deliver(&self, opps: &[Opportunity]) -> bool {
        if opps.is_empty() {
            return true;
        }

        let mut all_ok = true;
        for message in self.format_batches(opps) {
            if let Err(e) = self.backend.send(&message).await {
                warn!(error = %e, "Notification send failed");
                all_ok = false;
            }
        }
        if all_ok {
            info!(records = opps.len(), "Notifications delivered");
        }
        all_ok
    }
}

fn format_message(opps: &[Opportunity]) -> String {
    let mut message = String::from("*New remote opportunities*\n\n");
    for opp in opps {
        message.push_str(&format!("*{}*\n", escape_markdown(&opp.title)));

        let by = opp.company.as_deref().unwrap_or(opp.platform.as_str());
        message.push_str(&format!("Company: {}\n", escape_markdown(by)));

        if let Some(location) = &opp.location {
            message.push_str(&format!("Location: {}\n", escape_markdown(location)));
        }
        if let Some(posted_at) = opp.posted_at {
            message.push_str(&format!("Posted: {}\n", posted_at.format("%Y-%m-%d")));
        }
        if let Some(budget) = opp.budget_display() {
            message.push_str(&format!("Budget: {}\n", escape_amount(&budget)));
        }
        if let Some(score) = opp.score {
            message.push_str(&format!("Score: {score}/100\n"));
        }
        message.push_str(&format!("[View job]({})\n", opp.source_url));
        message.push_str(&format!("Source: {}\n\n", escape_markdown(opp.platform.as_str())));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gigsignal_common::{BudgetType, JobPost, Platform};
    use std::sync::Mutex;

    struct Recording {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn send(&self, text: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                anyhow::bail!("simulated send failure");
            }
            Ok(())
        }
    }

    fn opp(id: &str, title: &str) -> Opportunity {
        let mut opp = Opportunity::from_post(
            JobPost {
                platform: Platform::Remotive,
                platform_id: id.to_string(),
                title: title.to_string(),
                company: Some("Acme & Sons".to_string()),
                location: Some("Remote (US)".to_string()),
                description: "desc".to_string(),
                url: format!("https://example.com/{id}"),
                budget_min: Some(80.0),
                budget_max: Some(120.0),
                budget_type: BudgetType::Hourly,
                skills: vec![],
                client_country: None,
                client_rating: None,
                posted_at: None,
            },
            Utc::now(),
        );
        opp.score = Some(82);
        opp
    }

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(
            escape_markdown("a*b_c[d]e"),
            "a\\*b\\_c\\[d\\]e"
        );
        assert_eq!(escape_amount("$100"), "\\$100");
    }

    #[test]
    fn formats_record_fields() {
        let dispatcher = Dispatcher::new(
            Arc::new(Recording {
                sent: Mutex::new(vec![]),
                fail: false,
            }),
            10,
        );
        let messages =
            dispatcher.format_batches(&[opp("1", "Senior Java_Developer [urgent]")]);
        assert_eq!(messages.len(), 1);
        let text = &messages[0];
        assert!(text.contains("Senior Java\\_Developer \\[urgent\\]"));
        assert!(text.contains("Company: Acme & Sons"));
        assert!(text.contains("Budget: \\$80-120/hr"));
        assert!(text.contains("Score: 82/100"));
        assert!(text.contains("[View job](https://example.com/1)"));
    }

    #[test]
    fn batches_overflow_into_additional_messages() {
        let dispatcher = Dispatcher::new(
            Arc::new(Recording {
                sent: Mutex::new(vec![]),
                fail: false,
            }),
            2,
        );
        let opps: Vec<Opportunity> = (0..5).map(|i| opp(&i.to_string(), "T")).collect();
        assert_eq!(dispatcher.format_batches(&opps).len(), 3);
    }

    #[tokio::test]
    async fn deliver_reports_overall_failure() {
        let backend = Arc::new(Recording {
            sent: Mutex::new(vec![]),
            fail: true,
        });
        let dispatcher = Dispatcher::new(backend.clone(), 10);
        assert!(!dispatcher.deliver(&[opp("1", "T")]).await);
        assert_eq!(backend.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_trivially_delivered() {
        let backend = Arc::new(Recording {
            sent: Mutex::new(vec![]),
            fail: true,
        });
        let dispatcher = Dispatcher::new(backend.clone(), 10);
        assert!(dispatcher.deliver(&[]).await);
        assert!(backend.sent.lock().unwrap().is_empty());
    }
}
