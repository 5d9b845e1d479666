use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::calendar::WeekKey;

pub const PLACEHOLDER_TITLE: &str = "Unknown Assignment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Subject {
    Reading,
    Writing,
    Listening,
    Speaking,
    #[serde(rename = "Grammar & Vocabulary")]
    GrammarVocabulary,
    Other,
}

impl Subject {
    /// Maps stored subject text onto a bucket. "Grammar" is an alias of
    /// "Grammar & Vocabulary"; missing or unknown text lands in `Other`.
    pub fn parse_lenient(raw: Option<&str>) -> Subject {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Subject::Other;
        };

        match raw.to_ascii_lowercase().as_str() {
            "reading" => Subject::Reading,
            "writing" => Subject::Writing,
            "listening" => Subject::Listening,
            "speaking" => Subject::Speaking,
            "grammar" | "grammar & vocabulary" | "grammar and vocabulary" => {
                Subject::GrammarVocabulary
            }
            _ => Subject::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Reading => "Reading",
            Subject::Writing => "Writing",
            Subject::Listening => "Listening",
            Subject::Speaking => "Speaking",
            Subject::GrammarVocabulary => "Grammar & Vocabulary",
            Subject::Other => "Other",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Unrecognized(String),
}

impl Status {
    pub fn parse(raw: &str) -> Status {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Status::Pending,
            "in-progress" | "in_progress" | "started" => Status::InProgress,
            "completed" => Status::Completed,
            _ => Status::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
            Status::Unrecognized(raw) => raw,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A submission row as stored, before it is joined with its assignment.
#[derive(Debug, Clone)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct AssignmentRef {
    pub title: String,
    pub subject: Option<String>,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub submission_id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub subject: Subject,
    pub status: Status,
    pub due_date: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(skip)]
    pub assignment_missing: bool,
}

impl SubmissionRecord {
    /// Merges a submission with its parent assignment. A missing parent
    /// keeps the submission, with a placeholder title, subject `Other`
    /// and the submission's creation time standing in for the due date.
    pub fn join(row: SubmissionRow, assignment: Option<AssignmentRef>) -> Self {
        let assignment_missing = assignment.is_none();
        let (title, subject, due_date) = match assignment {
            Some(assignment) => (
                assignment.title,
                Subject::parse_lenient(assignment.subject.as_deref()),
                assignment.due_date,
            ),
            None => (PLACEHOLDER_TITLE.to_string(), Subject::Other, row.created_at),
        };

        SubmissionRecord {
            submission_id: row.id,
            assignment_id: row.assignment_id,
            student_id: row.student_id,
            title,
            subject,
            status: Status::parse(&row.status),
            due_date,
            started_at: row.started_at,
            completed_at: row.completed_at,
            updated_at: row.updated_at,
            notes: row.notes,
            assignment_missing,
        }
    }

    /// Completion time used for ordering and windows. Only meaningful for
    /// completed submissions; falls back to the last update time.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        if !self.status.is_completed() {
            return None;
        }
        self.completed_at.or(self.updated_at)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completion_rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub weekly_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStat {
    pub subject: Subject,
    pub total: usize,
    pub completed: usize,
    pub progress_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProgress {
    pub week_start: NaiveDate,
    pub week: WeekKey,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub level: Option<String>,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total_students: i64,
    pub total_assignments: i64,
    pub completed_submissions: i64,
    pub pending_submissions: i64,
}
