use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TransitionError;
use crate::models::Status;

/// Ledger kind recorded for the first completion of a submission.
pub const COMPLETION_AWARD: &str = "completed-award";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Set `started_at` unless it is already set.
    StampStarted,
    /// Set `completed_at` to the transition time, replacing any earlier value.
    StampCompleted,
    ClearCompleted,
    AwardPoints,
}

/// Every status write goes through this table. Any status may move to any
/// other; the previous status only decides the side effects.
///
/// `AwardPoints` fires on every entry into completed, including a re-entry
/// after reopening. The once-per-lifetime limit is the `point_awards`
/// ledger keyed by `(submission_id, COMPLETION_AWARD)`, not this table.
pub fn effects(from: &Status, to: &Status) -> &'static [Effect] {
    match (from, to) {
        (Status::Completed, Status::Completed) => &[Effect::StampCompleted],
        (_, Status::Completed) => &[Effect::StampCompleted, Effect::AwardPoints],
        (_, Status::InProgress) => &[Effect::StampStarted, Effect::ClearCompleted],
        (_, Status::Pending) => &[Effect::ClearCompleted],
        (_, Status::Unrecognized(_)) => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionState {
    pub student_id: Uuid,
    pub status: Status,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub submission_id: Uuid,
    pub new_status: Status,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointAward {
    pub submission_id: Uuid,
    pub student_id: Uuid,
    pub points: i32,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub previous: Status,
    pub state: SubmissionState,
    pub award: Option<PointAward>,
}

pub fn apply(
    prior: &SubmissionState,
    request: &TransitionRequest,
    at: DateTime<Utc>,
    points: i32,
) -> Result<TransitionOutcome, TransitionError> {
    if let Status::Unrecognized(raw) = &request.new_status {
        return Err(TransitionError::UnwritableStatus(raw.clone()));
    }

    let mut state = prior.clone();
    state.status = request.new_status.clone();
    if let Some(note) = &request.note {
        state.notes = Some(note.clone());
    }

    let mut award = None;
    for effect in effects(&prior.status, &request.new_status) {
        match effect {
            Effect::StampStarted => {
                state.started_at.get_or_insert(at);
            }
            Effect::StampCompleted => state.completed_at = Some(at),
            Effect::ClearCompleted => state.completed_at = None,
            Effect::AwardPoints => {
                award = Some(PointAward {
                    submission_id: request.submission_id,
                    student_id: prior.student_id,
                    points,
                });
            }
        }
    }

    Ok(TransitionOutcome {
        previous: prior.status.clone(),
        state,
        award,
    })
}
