use serde::Serialize;

use crate::models::resume::{Feedback, ResumeRecord};
use crate::store::AppStore;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverages {
    pub ats: f64,
    pub tone_and_style: f64,
    pub content: f64,
    pub structure: f64,
    pub skills: f64,
}

/// Derived view over the store; recomputed on every request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_resumes: usize,
    pub latest_resume_name: Option<String>,
    pub analyzed_resumes: usize,
    pub average_score: Option<f64>,
    pub best_score: Option<f64>,
    pub latest_score: Option<f64>,
    /// Latest scored résumé minus the one before it.
    pub score_trend: Option<f64>,
    pub score_band: Option<&'static str>,
    pub category_averages: Option<CategoryAverages>,
    pub unread_notifications: usize,
    pub is_online: bool,
    pub is_loading: bool,
    pub is_uploading: bool,
    pub is_analyzing: bool,
}

pub fn score_band(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "Excellent",
        s if s >= 80.0 => "Great",
        s if s >= 70.0 => "Good",
        s if s >= 50.0 => "Fair",
        _ => "Needs Work",
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| round1(sum / count as f64))
}

pub fn compute(store: &AppStore) -> DashboardMetrics {
    // Newest first.
    let mut scored: Vec<&ResumeRecord> = store
        .resumes()
        .iter()
        .filter(|r| r.score().is_some())
        .collect();
    scored.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let scores: Vec<f64> = scored.iter().filter_map(|r| r.score()).collect();
    let latest_score = scores.first().copied();
    let score_trend = match scores.as_slice() {
        [latest, previous, ..] => Some(round1(latest - previous)),
        _ => None,
    };

    let feedback: Vec<_> = scored.iter().filter_map(|r| r.feedback.as_ref()).collect();
    let category_averages = (!feedback.is_empty()).then(|| {
        let avg = |pick: fn(&Feedback) -> f64| {
            mean(feedback.iter().map(|f| pick(f))).unwrap_or_default()
        };
        CategoryAverages {
            ats: avg(|f| f.ats.score),
            tone_and_style: avg(|f| f.tone_and_style.score),
            content: avg(|f| f.content.score),
            structure: avg(|f| f.structure.score),
            skills: avg(|f| f.skills.score),
        }
    });

    let average_score = mean(scores.iter().copied());
    DashboardMetrics {
        total_resumes: store.resumes().len(),
        latest_resume_name: store.latest().map(|r| r.name.clone()),
        analyzed_resumes: scores.len(),
        average_score,
        best_score: scores.iter().copied().reduce(f64::max),
        latest_score,
        score_trend,
        score_band: average_score.map(score_band),
        category_averages,
        unread_notifications: store.feed().unread_count(),
        is_online: store.is_online(),
        is_loading: store.is_loading(),
        is_uploading: store.is_uploading(),
        is_analyzing: store.is_analyzing(),
    }
}
