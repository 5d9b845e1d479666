use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::overview::StudentOverview;

pub fn build_report(overview: &StudentOverview, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let student = &overview.student;
    let stats = &overview.stats;

    let _ = writeln!(output, "# Homework Progress Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        student.full_name,
        student.email,
        generated_at.date_naive()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- {} assignments: {} completed, {} in progress, {} pending",
        stats.counts.total, stats.counts.completed, stats.counts.in_progress, stats.counts.pending
    );
    let _ = writeln!(output, "- Completion rate: {}%", stats.counts.completion_rate);
    let _ = writeln!(output, "- Weekly streak: {} week(s)", stats.weekly_streak);
    let _ = writeln!(output, "- Points: {}", student.points);

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Subject");
    if overview.by_subject.is_empty() {
        let _ = writeln!(output, "No assignments yet.");
    } else {
        for subject in &overview.by_subject {
            let _ = writeln!(
                output,
                "- {}: {}/{} completed ({}%)",
                subject.subject, subject.completed, subject.total, subject.progress_percent
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Completions");
    if overview.weekly.is_empty() {
        let _ = writeln!(output, "No completions in recent weeks.");
    } else {
        for week in &overview.weekly {
            let _ = writeln!(
                output,
                "- {} (from {}): {} completed",
                week.week, week.week_start, week.completed
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Assignments");
    if overview.recent_assignments.is_empty() {
        let _ = writeln!(output, "Nothing pending or recently completed.");
    } else {
        for submission in &overview.recent_assignments {
            let when = match submission.finished_at() {
                Some(finished) => format!("completed {}", finished.date_naive()),
                None => format!("due {}", submission.due_date.date_naive()),
            };
            let _ = writeln!(
                output,
                "- [{}] {} ({}), {}",
                submission.status, submission.title, submission.subject, when
            );
        }
    }

    if !overview.warnings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Data Warnings");
        for warning in &overview.warnings {
            let _ = writeln!(output, "- {warning}");
        }
    }

    output
}
