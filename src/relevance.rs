use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::calendar::days_before;
use crate::models::{Status, Subject, SubmissionRecord};

/// Pending work plus anything completed inside the window, pending first
/// by due date, then completed work most recently finished first.
///
/// In-progress submissions never appear here even though they are
/// counted in the aggregates.
pub fn select_relevant(
    submissions: &[SubmissionRecord],
    now: DateTime<Utc>,
    window_days: i64,
    limit: usize,
) -> Vec<SubmissionRecord> {
    let since = days_before(now, window_days);

    let mut relevant: Vec<SubmissionRecord> = submissions
        .iter()
        .filter(|submission| is_relevant(submission, since))
        .cloned()
        .collect();

    relevant.sort_by(relevance_order);
    relevant.truncate(limit);
    relevant
}

fn is_relevant(submission: &SubmissionRecord, since: DateTime<Utc>) -> bool {
    match submission.status {
        Status::Pending => true,
        Status::Completed => {
            submission.due_date >= since
                || submission
                    .finished_at()
                    .is_some_and(|finished| finished >= since)
        }
        Status::InProgress | Status::Unrecognized(_) => false,
    }
}

fn relevance_order(a: &SubmissionRecord, b: &SubmissionRecord) -> Ordering {
    match (a.status.is_completed(), b.status.is_completed()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, false) => a.due_date.cmp(&b.due_date),
        (true, true) => b.finished_at().cmp(&a.finished_at()),
    }
}

/// The student's assignment list: optional status and subject filters,
/// soonest due first.
pub fn list_assignments(
    submissions: &[SubmissionRecord],
    status: Option<&Status>,
    subject: Option<Subject>,
) -> Vec<SubmissionRecord> {
    let mut listed: Vec<SubmissionRecord> = submissions
        .iter()
        .filter(|submission| status.is_none_or(|status| &submission.status == status))
        .filter(|submission| subject.is_none_or(|subject| submission.subject == subject))
        .cloned()
        .collect();

    listed.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    listed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::fixtures::*;

    const WINDOW: i64 = 7;

    fn finished(due: DateTime<Utc>, completed_at: DateTime<Utc>) -> SubmissionRecord {
        let mut record = submission(Subject::Reading, Status::Completed, due);
        record.completed_at = Some(completed_at);
        record
    }

    #[test]
    fn pending_is_always_relevant() {
        let old = submission(Subject::Writing, Status::Pending, at(2025, 9, 1));
        let picked = select_relevant(&[old.clone()], at(2026, 1, 20), WINDOW, 10);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].submission_id, old.submission_id);
    }

    #[test]
    fn stale_completed_work_is_excluded() {
        let stale = finished(at(2026, 1, 2), at(2026, 1, 3));
        let picked = select_relevant(&[stale], at(2026, 1, 20), WINDOW, 10);
        assert!(picked.is_empty());
    }

    #[test]
    fn completed_within_window_by_either_date() {
        let now = at(2026, 1, 20);
        let recent_due = finished(at(2026, 1, 18), at(2026, 1, 1));
        let recent_finish = finished(at(2026, 1, 1), at(2026, 1, 19));
        let picked = select_relevant(&[recent_due, recent_finish], now, WINDOW, 10);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn negative_window_behaves_like_zero() {
        let now = at(2026, 1, 20);
        let just_now = finished(at(2026, 1, 1), now);
        let yesterday = finished(at(2026, 1, 1), at(2026, 1, 19));
        let all = [just_now.clone(), yesterday];

        let picked = select_relevant(&all, now, -7, 10);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].submission_id, just_now.submission_id);
        assert_eq!(select_relevant(&all, now, 0, 10).len(), 1);
    }

    #[test]
    fn huge_window_keeps_all_completed_work() {
        let stale = finished(at(2020, 1, 2), at(2020, 1, 3));
        let picked = select_relevant(&[stale], at(2026, 1, 20), 9_999_999_999_999, 10);
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn in_progress_is_left_out() {
        let working = submission(Subject::Reading, Status::InProgress, at(2026, 1, 21));
        let picked = select_relevant(&[working], at(2026, 1, 20), WINDOW, 10);
        assert!(picked.is_empty());
    }

    #[test]
    fn orders_pending_by_due_then_completed_by_recency() {
        let now = at(2026, 1, 20);
        let later_due = submission(Subject::Reading, Status::Pending, at(2026, 1, 25));
        let sooner_due = submission(Subject::Writing, Status::Pending, at(2026, 1, 21));
        let finished_early = finished(at(2026, 1, 16), at(2026, 1, 14));
        let finished_late = finished(at(2026, 1, 16), at(2026, 1, 19));

        let picked = select_relevant(
            &[
                finished_early.clone(),
                later_due.clone(),
                finished_late.clone(),
                sooner_due.clone(),
            ],
            now,
            WINDOW,
            10,
        );

        let order: Vec<_> = picked.iter().map(|s| s.submission_id).collect();
        assert_eq!(
            order,
            vec![
                sooner_due.submission_id,
                later_due.submission_id,
                finished_late.submission_id,
                finished_early.submission_id,
            ]
        );
    }

    #[test]
    fn completed_without_timestamp_orders_by_update_time() {
        let now = at(2026, 1, 20);
        let mut updated_only = submission(Subject::Reading, Status::Completed, at(2026, 1, 19));
        updated_only.updated_at = Some(at(2026, 1, 19));
        let older = finished(at(2026, 1, 18), at(2026, 1, 15));

        let picked = select_relevant(&[older.clone(), updated_only.clone()], now, WINDOW, 10);
        assert_eq!(picked[0].submission_id, updated_only.submission_id);
        assert_eq!(picked[1].submission_id, older.submission_id);
    }

    #[test]
    fn truncates_to_limit() {
        let now = at(2026, 1, 20);
        let submissions: Vec<_> = (1..=15)
            .map(|day| submission(Subject::Reading, Status::Pending, at(2026, 2, day)))
            .collect();

        let picked = select_relevant(&submissions, now, WINDOW, 10);
        assert_eq!(picked.len(), 10);
        assert_eq!(picked[0].due_date, at(2026, 2, 1));
        assert_eq!(picked[9].due_date, at(2026, 2, 10));
        assert!(select_relevant(&submissions, now, WINDOW, 0).is_empty());
    }

    #[test]
    fn lists_with_filters_sorted_by_due_date() {
        let late = submission(Subject::Reading, Status::Pending, at(2026, 2, 1));
        let early = submission(Subject::Reading, Status::Pending, at(2026, 1, 5));
        let writing = submission(Subject::Writing, Status::Pending, at(2026, 1, 1));
        let done = finished(at(2026, 1, 2), at(2026, 1, 2));
        let all = vec![late.clone(), writing.clone(), done.clone(), early.clone()];

        let listed = list_assignments(&all, None, None);
        assert_eq!(listed.len(), 4);
        assert_eq!(listed[0].submission_id, writing.submission_id);

        let reading_pending =
            list_assignments(&all, Some(&Status::Pending), Some(Subject::Reading));
        let ids: Vec<_> = reading_pending.iter().map(|s| s.submission_id).collect();
        assert_eq!(ids, vec![early.submission_id, late.submission_id]);

        let completed = list_assignments(&all, Some(&Status::Completed), None);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].submission_id, done.submission_id);
    }
}
