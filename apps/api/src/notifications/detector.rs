//! Change detection over the résumé list.
//!
//! Each observed list is compared against the previous snapshot and turned
//! into zero or more notification events:
//!
//! 1. The first observation only primes the snapshot.
//! 2. Ids new to the list emit `new_analysis`, plus a milestone at ≥ 90 (high)
//!    or ≥ 80 (medium).
//! 3. Ids whose `updated_at` changed compare overall scores: a delta above +5
//!    is an improvement, below −5 a warning. Smaller deltas are silent.
//! 4. With at least five résumés, a five-most-recent average ≥ 85 emits
//!    "Consistent Excellence", at most once per trailing 24 hours. An unscored
//!    résumé counts as 0 in that average.
//!
//! Records without a score are deferred: the pass in which a record first
//! gains a score treats it as a new analysis rather than a delta. The snapshot
//! keeps a record's last known score while it is re-analyzed, so the new score
//! is compared against the old one.
//!
//! The weekly digest is timer driven and lives in [`weekly_digest`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::notification::{NotificationEvent, NotificationKind, NotificationPriority};
use crate::models::resume::ResumeRecord;
use crate::notifications::feed::NotificationFeed;

pub const SCORE_CHANGE_THRESHOLD: f64 = 5.0;
pub const TOP_TIER_SCORE: f64 = 90.0;
pub const GREAT_SCORE: f64 = 80.0;
pub const STREAK_LENGTH: usize = 5;
pub const STREAK_AVERAGE: f64 = 85.0;

pub const STREAK_TITLE: &str = "Consistent Excellence";
pub const WEEKLY_TITLE: &str = "Weekly Summary";

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    score: Option<f64>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ChangeDetector {
    previous: Option<HashMap<Uuid, Snapshot>>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }

    /// Forgets the snapshot so the next observation primes again.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Diffs `current` against the previous snapshot, then replaces it.
    /// `feed` is read only, for the streak guard.
    pub fn observe(
        &mut self,
        current: &[ResumeRecord],
        feed: &NotificationFeed,
        now: DateTime<Utc>,
    ) -> Vec<NotificationEvent> {
        let previous = self.previous.take();
        let snapshot = current
            .iter()
            .map(|r| {
                let last_known = previous
                    .as_ref()
                    .and_then(|p| p.get(&r.id))
                    .and_then(|s| s.score);
                (
                    r.id,
                    Snapshot {
                        score: r.score().or(last_known),
                        updated_at: r.updated_at,
                    },
                )
            })
            .collect();
        self.previous = Some(snapshot);

        let Some(previous) = previous else {
            return Vec::new();
        };

        let mut events = Vec::new();

        for record in current {
            match previous.get(&record.id) {
                None => {
                    if let Some(score) = record.score() {
                        analysis_events(record, score, now, &mut events);
                    }
                }
                Some(before) if before.updated_at != record.updated_at => {
                    match (before.score, record.score()) {
                        (Some(old), Some(new)) => {
                            if let Some(event) = score_change_event(record, old, new, now) {
                                events.push(event);
                            }
                        }
                        (None, Some(new)) => analysis_events(record, new, now, &mut events),
                        _ => {}
                    }
                }
                Some(_) => {}
            }
        }

        if let Some(event) = streak_event(current, feed, now) {
            events.push(event);
        }

        events
    }
}

fn analysis_events(
    record: &ResumeRecord,
    score: f64,
    now: DateTime<Utc>,
    events: &mut Vec<NotificationEvent>,
) {
    events.push(NotificationEvent::new(
        NotificationKind::NewAnalysis,
        NotificationPriority::Medium,
        "New Analysis Complete",
        format!("{} scored {:.0}/100", record.name, score),
        Some(record.id),
        now,
    ));

    if score >= TOP_TIER_SCORE {
        events.push(NotificationEvent::new(
            NotificationKind::Milestone,
            NotificationPriority::High,
            "Top 10% Resume!",
            format!(
                "{} scored {:.0}, placing it in the top 10% of résumés",
                record.name, score
            ),
            Some(record.id),
            now,
        ));
    } else if score >= GREAT_SCORE {
        events.push(NotificationEvent::new(
            NotificationKind::Milestone,
            NotificationPriority::Medium,
            "Great Score!",
            format!("{} scored {:.0}. Keep it up!", record.name, score),
            Some(record.id),
            now,
        ));
    }
}

fn score_change_event(
    record: &ResumeRecord,
    old: f64,
    new: f64,
    now: DateTime<Utc>,
) -> Option<NotificationEvent> {
    let delta = new - old;
    if delta > SCORE_CHANGE_THRESHOLD {
        Some(NotificationEvent::new(
            NotificationKind::ScoreImprovement,
            NotificationPriority::High,
            "Score Improved!",
            format!(
                "{} improved by {:.0} points (now {:.0}/100)",
                record.name, delta, new
            ),
            Some(record.id),
            now,
        ))
    } else if delta < -SCORE_CHANGE_THRESHOLD {
        Some(NotificationEvent::new(
            NotificationKind::Warning,
            NotificationPriority::High,
            "Score Decreased",
            format!(
                "{} dropped by {:.0} points (now {:.0}/100)",
                record.name,
                delta.abs(),
                new
            ),
            Some(record.id),
            now,
        ))
    } else {
        None
    }
}

fn streak_event(
    records: &[ResumeRecord],
    feed: &NotificationFeed,
    now: DateTime<Utc>,
) -> Option<NotificationEvent> {
    if records.len() < STREAK_LENGTH {
        return None;
    }

    let mut recent: Vec<&ResumeRecord> = records.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let average = recent
        .iter()
        .take(STREAK_LENGTH)
        .map(|r| r.score().unwrap_or(0.0))
        .sum::<f64>()
        / STREAK_LENGTH as f64;
    if average < STREAK_AVERAGE {
        return None;
    }
    if feed.has_recent(NotificationKind::Milestone, STREAK_TITLE, Duration::hours(24), now) {
        return None;
    }

    Some(NotificationEvent::new(
        NotificationKind::Milestone,
        NotificationPriority::High,
        STREAK_TITLE,
        format!(
            "Your last {STREAK_LENGTH} résumés averaged {:.0}/100",
            average
        ),
        None,
        now,
    ))
}

/// Low-priority summary of the trailing seven days, at most once per week.
/// Returns `None` when nothing was created in the window.
pub fn weekly_digest(
    records: &[ResumeRecord],
    feed: &NotificationFeed,
    now: DateTime<Utc>,
) -> Option<NotificationEvent> {
    let window = Duration::days(7);
    if feed.has_recent(NotificationKind::Milestone, WEEKLY_TITLE, window, now) {
        return None;
    }

    let cutoff = now - window;
    let recent: Vec<&ResumeRecord> = records.iter().filter(|r| r.created_at >= cutoff).collect();
    if recent.is_empty() {
        return None;
    }

    let scores: Vec<f64> = recent.iter().filter_map(|r| r.score()).collect();
    let average = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    Some(NotificationEvent::new(
        NotificationKind::Milestone,
        NotificationPriority::Low,
        WEEKLY_TITLE,
        format!(
            "This week: {} résumé(s) analyzed with an average score of {:.0}",
            recent.len(),
            average
        ),
        None,
        now,
    ))
}
