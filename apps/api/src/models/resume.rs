use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an uploaded résumé: `uploaded → analyzing → analyzed`, or `error`.
/// `error` is re-enterable by uploading again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Uploaded,
    Analyzing,
    Analyzed,
    Error,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Uploaded => "uploaded",
            ResumeStatus::Analyzing => "analyzing",
            ResumeStatus::Analyzed => "analyzed",
            ResumeStatus::Error => "error",
        }
    }

    /// Parses the status column. Unknown values map to `Error` so a bad row
    /// never masquerades as analyzed.
    pub fn parse(value: &str) -> Self {
        match value {
            "uploaded" => ResumeStatus::Uploaded,
            "analyzing" => ResumeStatus::Analyzing,
            "analyzed" => ResumeStatus::Analyzed,
            _ => ResumeStatus::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryFeedback {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

/// Structured AI output. Field names follow the provider's JSON contract.
/// Scores are expected in [0, 100] but are taken as returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    #[serde(rename = "overallScore")]
    pub overall_score: f64,
    #[serde(rename = "ATS")]
    pub ats: CategoryFeedback,
    #[serde(rename = "toneAndStyle")]
    pub tone_and_style: CategoryFeedback,
    pub content: CategoryFeedback,
    pub structure: CategoryFeedback,
    pub skills: CategoryFeedback,
}

/// Questionnaire answers attached to an upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub image_path: Option<String>,
    pub file_size: u64,
    pub status: ResumeStatus,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub job: JobContext,
    pub uploaded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResumeRecord {
    pub fn score(&self) -> Option<f64> {
        self.feedback.as_ref().map(|f| f.overall_score)
    }

    /// `Analyzed` iff feedback is attached.
    pub fn is_consistent(&self) -> bool {
        (self.status == ResumeStatus::Analyzed) == self.feedback.is_some()
    }

    #[cfg(test)]
    pub fn mark_analyzing(&mut self, now: DateTime<Utc>) {
        self.status = ResumeStatus::Analyzing;
        self.feedback = None;
        self.updated_at = now;
    }

    #[cfg(test)]
    pub fn mark_analyzed(&mut self, feedback: Feedback, now: DateTime<Utc>) {
        self.status = ResumeStatus::Analyzed;
        self.feedback = Some(feedback);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, now: DateTime<Utc>) {
        self.status = ResumeStatus::Error;
        self.feedback = None;
        self.updated_at = now;
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_feedback_uses_provider_keys() {
        let json = serde_json::to_value(feedback(81.0)).unwrap();
        assert_eq!(json["overallScore"], 81.0);
        assert!(json.get("ATS").is_some());
        assert!(json.get("toneAndStyle").is_some());
        assert_eq!(json["content"]["tips"][0]["type"], "improve");
        assert!(json["content"]["tips"][0].get("explanation").is_none());
    }

    #[test]
    fn test_feedback_parses_detailed_tips() {
        let raw = r#"{
            "overallScore": 74,
            "ATS": {"score": 70, "tips": [{"type": "good", "tip": "Clear headings"}]},
            "toneAndStyle": {"score": 80, "tips": [{"type": "improve", "tip": "Active voice", "explanation": "Prefer verbs"}]},
            "content": {"score": 72, "tips": []},
            "structure": {"score": 75, "tips": []},
            "skills": {"score": 68}
        }"#;
        let parsed: Feedback = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.overall_score, 74.0);
        assert_eq!(parsed.tone_and_style.tips[0].explanation.as_deref(), Some("Prefer verbs"));
        assert!(parsed.skills.tips.is_empty());
    }

    #[test]
    fn test_status_transitions_keep_invariant() {
        let now = Utc::now();
        let mut record = record_at(Uuid::new_v4(), None, now);
        assert!(record.is_consistent());

        record.mark_analyzing(now);
        assert_eq!(record.status, ResumeStatus::Analyzing);
        assert!(record.is_consistent());

        record.mark_analyzed(feedback(88.0), now);
        assert_eq!(record.score(), Some(88.0));
        assert!(record.is_consistent());

        record.mark_failed(now);
        assert_eq!(record.status, ResumeStatus::Error);
        assert!(record.score().is_none());
        assert!(record.is_consistent());
    }

    #[test]
    fn test_unknown_status_is_error() {
        assert_eq!(ResumeStatus::parse("analyzed"), ResumeStatus::Analyzed);
        assert_eq!(ResumeStatus::parse("bogus"), ResumeStatus::Error);
    }

    #[test]
    fn test_record_local_form_is_camel_case() {
        let record = record_at(Uuid::new_v4(), Some(90.0), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("fileName").is_some());
        assert_eq!(json["status"], "analyzed");
    }
}
