use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::models::notification::NotificationEvent;

/// Out-of-band delivery of a synthesized notification (the desktop
/// notification of the browser app). Failures never affect the feed.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &NotificationEvent) -> Result<()>;
}

/// Writes every notification to the log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<()> {
        info!(
            kind = ?event.kind,
            priority = ?event.priority,
            "Notification: {}: {}",
            event.title,
            event.message
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a configured endpoint.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .context("notification webhook request failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("notification webhook returned {status}");
        }
        Ok(())
    }
}

/// Delivers to every inner sink; one failing sink does not stop the others.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<()> {
        let mut failures = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(event).await {
                warn!("Notification sink failed for {}: {e:#}", event.id);
                failures += 1;
            }
        }
        if failures > 0 {
            anyhow::bail!("{failures} notification sink(s) failed");
        }
        Ok(())
    }
}

/// Fire-and-forget delivery on a background task.
pub fn dispatch(sink: Arc<dyn NotificationSink>, events: Vec<NotificationEvent>) {
    if events.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for event in &events {
            if let Err(e) = sink.deliver(event).await {
                warn!("Failed to deliver notification {}: {e:#}", event.id);
            }
        }
    });
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::notification::{NotificationKind, NotificationPriority};
    use chrono::Utc;

    fn event() -> NotificationEvent {
        NotificationEvent::new(
            NotificationKind::NewAnalysis,
            NotificationPriority::Medium,
            "New Analysis Complete",
            "cv scored 80/100",
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_fanout_continues_past_failures() {
        let recorder = Arc::new(RecordingSink::default());
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(FailingSink), recorder.clone()];
        let fanout = FanoutSink::new(sinks);
        assert!(fanout.deliver(&event()).await.is_err());
        assert_eq!(recorder.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let recorder = Arc::new(RecordingSink::default());
        dispatch(recorder.clone(), vec![event(), event()]);
        for _ in 0..50 {
            if recorder.delivered.lock().unwrap().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.delivered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_log_sink_never_fails() {
        assert!(LogSink.deliver(&event()).await.is_ok());
    }
}
