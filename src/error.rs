use thiserror::Error;
use uuid::Uuid;

/// Inconsistencies found in fetched submission data. These never abort a
/// computation; they are reported next to the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataWarning {
    #[error("submission {0} has a completion time but is not completed")]
    CompletedAtWithoutCompletion(Uuid),

    #[error("submission {0} is completed but has no completion time")]
    CompletionWithoutTimestamp(Uuid),

    #[error("submission {submission_id} references missing assignment {assignment_id}")]
    MissingAssignment {
        submission_id: Uuid,
        assignment_id: Uuid,
    },

    #[error("submission {submission_id} has unrecognized status {status:?}")]
    UnrecognizedStatus { submission_id: Uuid, status: String },
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("submission {0} not found")]
    SubmissionNotFound(Uuid),

    #[error("status {0:?} cannot be written")]
    UnwritableStatus(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
