use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::calendar::{days_before, week_start, WeekKey};
use crate::error::DataWarning;
use crate::models::{Status, StatusCounts, Subject, SubjectStat, SubmissionRecord, WeeklyProgress};

/// Whole-number percentage, rounding halves up. Zero when `total` is zero.
pub fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * part + total) / (2 * total)) as u32
}

pub fn aggregate(submissions: &[SubmissionRecord]) -> StatusCounts {
    let mut counts = StatusCounts {
        total: submissions.len(),
        ..StatusCounts::default()
    };

    for submission in submissions {
        match submission.status {
            Status::Completed => counts.completed += 1,
            Status::Pending => counts.pending += 1,
            Status::InProgress => counts.in_progress += 1,
            Status::Unrecognized(_) => {}
        }
    }

    counts.completion_rate = percent(counts.completed, counts.total);
    counts
}

/// One entry per subject present, in subject order.
pub fn by_subject(submissions: &[SubmissionRecord]) -> Vec<SubjectStat> {
    let mut map: BTreeMap<Subject, (usize, usize)> = BTreeMap::new();

    for submission in submissions {
        let entry = map.entry(submission.subject).or_insert((0, 0));
        entry.0 += 1;
        if submission.status.is_completed() {
            entry.1 += 1;
        }
    }

    map.into_iter()
        .map(|(subject, (total, completed))| SubjectStat {
            subject,
            total,
            completed,
            progress_percent: percent(completed, total),
        })
        .collect()
}

/// Completions per ISO week over the trailing `weeks * 7` days, oldest
/// week first. Weeks without completions are left out.
pub fn weekly_progress(
    submissions: &[SubmissionRecord],
    now: DateTime<Utc>,
    weeks: i64,
) -> Vec<WeeklyProgress> {
    let since = days_before(now, weeks.saturating_mul(7));
    let mut buckets: HashMap<WeekKey, WeeklyProgress> = HashMap::new();

    for completed_at in completion_times(submissions) {
        if completed_at < since {
            continue;
        }
        let day = completed_at.date_naive();
        let week = WeekKey::of_date(day);
        buckets
            .entry(week)
            .or_insert_with(|| WeeklyProgress {
                week_start: week_start(day),
                week,
                completed: 0,
            })
            .completed += 1;
    }

    let mut values: Vec<WeeklyProgress> = buckets.into_values().collect();
    values.sort_by(|a, b| a.week_start.cmp(&b.week_start));
    values
}

/// Completion timestamps of submissions whose status is `completed`.
/// Status wins over a stray timestamp on any other status.
pub fn completion_times(submissions: &[SubmissionRecord]) -> Vec<DateTime<Utc>> {
    submissions
        .iter()
        .filter(|submission| submission.status.is_completed())
        .filter_map(|submission| submission.completed_at)
        .collect()
}

pub fn audit(submissions: &[SubmissionRecord]) -> Vec<DataWarning> {
    let mut warnings = Vec::new();

    for submission in submissions {
        let id = submission.submission_id;
        match (&submission.status, submission.completed_at) {
            (Status::Completed, None) => {
                warnings.push(DataWarning::CompletionWithoutTimestamp(id));
            }
            (Status::Unrecognized(status), _) => {
                warnings.push(DataWarning::UnrecognizedStatus {
                    submission_id: id,
                    status: status.clone(),
                });
                if submission.completed_at.is_some() {
                    warnings.push(DataWarning::CompletedAtWithoutCompletion(id));
                }
            }
            (Status::Pending | Status::InProgress, Some(_)) => {
                warnings.push(DataWarning::CompletedAtWithoutCompletion(id));
            }
            _ => {}
        }

        if submission.assignment_missing {
            warnings.push(DataWarning::MissingAssignment {
                submission_id: id,
                assignment_id: submission.assignment_id,
            });
        }
    }

    warnings
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn aggregates_the_reading_scenario() {
        let submissions = vec![
            completed(Subject::Reading, at(2026, 1, 12)),
            submission(Subject::Reading, Status::Pending, at(2026, 1, 20)),
        ];

        let counts = aggregate(&submissions);
        assert_eq!(
            counts,
            StatusCounts {
                total: 2,
                completed: 1,
                pending: 1,
                in_progress: 0,
                completion_rate: 50,
            }
        );

        let subjects = by_subject(&submissions);
        assert_eq!(
            subjects,
            vec![SubjectStat {
                subject: Subject::Reading,
                total: 2,
                completed: 1,
                progress_percent: 50,
            }]
        );
    }

    #[test]
    fn empty_input_has_zero_rate() {
        let counts = aggregate(&[]);
        assert_eq!(counts.total, 0);
        assert_eq!(counts.completion_rate, 0);
        assert!(by_subject(&[]).is_empty());
    }

    #[test]
    fn unrecognized_status_counts_toward_total_only() {
        let submissions = vec![
            submission(Subject::Writing, Status::InProgress, at(2026, 1, 5)),
            submission(
                Subject::Writing,
                Status::Unrecognized("archived".to_string()),
                at(2026, 1, 5),
            ),
        ];

        let counts = aggregate(&submissions);
        assert_eq!(counts.total, 2);
        assert_eq!(counts.in_progress, 1);
        assert!(counts.completed + counts.pending + counts.in_progress < counts.total);
    }

    #[test]
    fn groups_subjects_including_other() {
        let submissions = vec![
            completed(Subject::Speaking, at(2026, 1, 2)),
            submission(Subject::Speaking, Status::Pending, at(2026, 1, 9)),
            submission(Subject::Speaking, Status::Pending, at(2026, 1, 9)),
            completed(Subject::Other, at(2026, 1, 3)),
        ];

        let subjects = by_subject(&submissions);
        assert_eq!(subjects.len(), 2);
        let speaking = subjects
            .iter()
            .find(|stat| stat.subject == Subject::Speaking)
            .unwrap();
        assert_eq!((speaking.total, speaking.completed), (3, 1));
        assert_eq!(speaking.progress_percent, 33);
        let other = subjects
            .iter()
            .find(|stat| stat.subject == Subject::Other)
            .unwrap();
        assert_eq!(other.progress_percent, 100);
    }

    #[test]
    fn weekly_progress_buckets_trailing_weeks() {
        let now = at(2026, 1, 28);
        let submissions = vec![
            completed(Subject::Reading, at(2026, 1, 26)),
            completed(Subject::Writing, at(2026, 1, 27)),
            completed(Subject::Reading, at(2026, 1, 14)),
            completed(Subject::Reading, at(2025, 12, 20)),
            submission(Subject::Reading, Status::Pending, at(2026, 1, 27)),
        ];

        let weekly = weekly_progress(&submissions, now, 4);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].week.to_string(), "2026-W03");
        assert_eq!(weekly[0].week_start, at(2026, 1, 12).date_naive());
        assert_eq!(weekly[0].completed, 1);
        assert_eq!(weekly[1].week.to_string(), "2026-W05");
        assert_eq!(weekly[1].completed, 2);
    }

    #[test]
    fn weekly_progress_tolerates_out_of_range_spans() {
        let now = at(2026, 1, 28);
        let submissions = vec![
            completed(Subject::Reading, at(2026, 1, 26)),
            completed(Subject::Reading, at(2025, 12, 20)),
        ];

        assert!(weekly_progress(&submissions, now, -3).is_empty());
        let everything = weekly_progress(&submissions, now, i64::MAX);
        assert_eq!(everything.len(), 2);
        assert_eq!(everything[0].week.to_string(), "2025-W51");
    }

    #[test]
    fn completion_times_trust_status_over_timestamp() {
        let mut stray = submission(Subject::Reading, Status::Pending, at(2026, 1, 9));
        stray.completed_at = Some(at(2026, 1, 8));
        let submissions = vec![stray, completed(Subject::Reading, at(2026, 1, 7))];

        assert_eq!(completion_times(&submissions), vec![at(2026, 1, 7)]);
    }

    #[test]
    fn audit_reports_each_inconsistency() {
        let mut stray = submission(Subject::Reading, Status::InProgress, at(2026, 1, 9));
        stray.completed_at = Some(at(2026, 1, 8));
        let missing_time = submission(Subject::Reading, Status::Completed, at(2026, 1, 9));
        let mut orphan = submission(Subject::Other, Status::Pending, at(2026, 1, 9));
        orphan.assignment_missing = true;
        let clean = completed(Subject::Writing, at(2026, 1, 9));

        let warnings = audit(&[stray.clone(), missing_time.clone(), orphan.clone(), clean]);
        assert_eq!(
            warnings,
            vec![
                DataWarning::CompletedAtWithoutCompletion(stray.submission_id),
                DataWarning::CompletionWithoutTimestamp(missing_time.submission_id),
                DataWarning::MissingAssignment {
                    submission_id: orphan.submission_id,
                    assignment_id: orphan.assignment_id,
                },
            ]
        );
    }
}
