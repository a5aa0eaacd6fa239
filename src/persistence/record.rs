//! Persisted session record types

use serde::{Deserialize, Serialize};

use crate::sim::{EndReason, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Completed,
    /// Player left mid-session
    Exited,
}

impl SessionStatus {
    pub fn for_end_reason(reason: Option<EndReason>) -> Self {
        match reason {
            Some(EndReason::Exited) => SessionStatus::Exited,
            _ => SessionStatus::Completed,
        }
    }
}

/// One play-through as stored by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// External user identity
    pub identity: String,
    /// External game/content identifier
    pub content_id: Option<String>,
    pub seed: u64,
    /// Unix timestamp (ms)
    pub started_at: f64,
    pub ended_at: Option<f64>,
    pub final_score: Option<u64>,
    pub blocks_built: Option<usize>,
    pub verdict: Option<Verdict>,
    pub end_reason: Option<EndReason>,
    pub status: SessionStatus,
    #[serde(default)]
    pub survey_completed: bool,
}

/// Fields supplied when a session record is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub content_id: Option<String>,
    pub seed: u64,
    pub started_at: f64,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub ended_at: Option<f64>,
    pub final_score: Option<u64>,
    pub blocks_built: Option<usize>,
    pub verdict: Option<Verdict>,
    pub end_reason: Option<EndReason>,
    pub status: Option<SessionStatus>,
    pub survey_completed: Option<bool>,
}

impl SessionUpdate {
    pub fn apply(&self, record: &mut SessionRecord) {
        if let Some(ended_at) = self.ended_at {
            record.ended_at = Some(ended_at);
        }
        if let Some(score) = self.final_score {
            record.final_score = Some(score);
        }
        if let Some(blocks) = self.blocks_built {
            record.blocks_built = Some(blocks);
        }
        if let Some(verdict) = self.verdict {
            record.verdict = Some(verdict);
        }
        if let Some(reason) = self.end_reason {
            record.end_reason = Some(reason);
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(done) = self.survey_completed {
            record.survey_completed = done;
        }
    }
}

/// Query filter; `None` matches anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub survey_completed: Option<bool>,
}

impl SessionFilter {
    pub fn survey_completed() -> Self {
        Self {
            survey_completed: Some(true),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &SessionRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self
                .survey_completed
                .is_none_or(|done| record.survey_completed == done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            id: "session-1".into(),
            identity: "learner".into(),
            content_id: Some("unit-3".into()),
            seed: 1,
            started_at: 1000.0,
            ended_at: None,
            final_score: None,
            blocks_built: None,
            verdict: None,
            end_reason: None,
            status: SessionStatus::Active,
            survey_completed: false,
        }
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut rec = record();
        SessionUpdate {
            final_score: Some(450),
            status: Some(SessionStatus::Completed),
            ..Default::default()
        }
        .apply(&mut rec);
        assert_eq!(rec.final_score, Some(450));
        assert_eq!(rec.status, SessionStatus::Completed);
        assert_eq!(rec.ended_at, None);
        assert_eq!(rec.started_at, 1000.0);
    }

    #[test]
    fn test_filter() {
        let mut rec = record();
        assert!(SessionFilter::default().matches(&rec));
        assert!(!SessionFilter::survey_completed().matches(&rec));
        rec.survey_completed = true;
        assert!(SessionFilter::survey_completed().matches(&rec));
        let exited = SessionFilter {
            status: Some(SessionStatus::Exited),
            ..Default::default()
        };
        assert!(!exited.matches(&rec));
    }

    #[test]
    fn test_status_for_end_reason() {
        assert_eq!(
            SessionStatus::for_end_reason(Some(EndReason::Exited)),
            SessionStatus::Exited
        );
        assert_eq!(
            SessionStatus::for_end_reason(Some(EndReason::TimeUp)),
            SessionStatus::Completed
        );
    }
}
