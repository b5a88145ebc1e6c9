use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewAnalysis,
    ScoreImprovement,
    Milestone,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

/// Ephemeral alert derived from a change in the résumé list. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<Uuid>,
    pub is_read: bool,
    pub priority: NotificationPriority,
}

impl NotificationEvent {
    pub fn new(
        kind: NotificationKind,
        priority: NotificationPriority,
        title: impl Into<String>,
        message: impl Into<String>,
        resume_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: notification_id(now),
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: now,
            resume_id,
            is_read: false,
            priority,
        }
    }
}

/// `{millis}-{9 alphanumerics}`: unique per emission, never derived from content.
pub fn notification_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("{}-{}", now.timestamp_millis(), suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_for_same_instant() {
        let now = Utc::now();
        let a = notification_id(now);
        let b = notification_id(now);
        assert_ne!(a, b);
        assert!(a.starts_with(&now.timestamp_millis().to_string()));
    }

    #[test]
    fn test_event_serializes_type_and_priority() {
        let event = NotificationEvent::new(
            NotificationKind::ScoreImprovement,
            NotificationPriority::High,
            "Score Improved!",
            "up 8 points",
            None,
            Utc::now(),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "score_improvement");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["isRead"], false);
        assert!(json.get("resumeId").is_none());
    }
}
