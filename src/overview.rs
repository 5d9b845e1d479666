use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate;
use crate::config::EngineSettings;
use crate::models::{
    AggregateStats, StudentProfile, SubjectStat, SubmissionRecord, WeeklyProgress,
};
use crate::relevance;
use crate::streak;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    pub student: StudentProfile,
    pub stats: AggregateStats,
    pub by_subject: Vec<SubjectStat>,
    pub weekly: Vec<WeeklyProgress>,
    pub recent_assignments: Vec<SubmissionRecord>,
    pub warnings: Vec<String>,
}

pub fn build_overview(
    student: StudentProfile,
    submissions: &[SubmissionRecord],
    now: DateTime<Utc>,
    settings: &EngineSettings,
) -> StudentOverview {
    let warnings = aggregate::audit(submissions);
    for warning in &warnings {
        tracing::warn!(student = %student.email, "{warning}");
    }

    let completed_dates = aggregate::completion_times(submissions);
    let stats = AggregateStats {
        counts: aggregate::aggregate(submissions),
        weekly_streak: streak::compute_weekly_streak(
            &completed_dates,
            now,
            settings.streak_safety_cap,
        ),
    };

    StudentOverview {
        student,
        stats,
        by_subject: aggregate::by_subject(submissions),
        weekly: aggregate::weekly_progress(submissions, now, settings.weekly_progress_weeks),
        recent_assignments: relevance::select_relevant(
            submissions,
            now,
            settings.relevance_window_days,
            settings.relevant_limit,
        ),
        warnings: warnings.iter().map(ToString::to_string).collect(),
    }
}
