use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::TransitionError;
use crate::models::{
    AssignmentRef, DashboardCounts, Status, StudentProfile, SubmissionRecord, SubmissionRow,
};
use crate::transition::{
    self, PointAward, SubmissionState, TransitionOutcome, TransitionRequest, COMPLETION_AWARD,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_user(
    pool: &PgPool,
    email: &str,
    full_name: &str,
    role: &str,
    level: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO homework_tracker.users (id, email, full_name, role, level)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name, level = COALESCE(EXCLUDED.level, users.level)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(full_name)
    .bind(role)
    .bind(level)
    .fetch_one(pool)
    .await?
    .try_get("id")?;

    Ok(id)
}

async fn upsert_assignment(
    pool: &PgPool,
    source_key: &str,
    title: &str,
    subject: Option<&str>,
    due_date: DateTime<Utc>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO homework_tracker.assignments (id, source_key, title, subject, due_date)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (source_key) DO UPDATE
        SET title = EXCLUDED.title, subject = EXCLUDED.subject, due_date = EXCLUDED.due_date
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(source_key)
    .bind(title)
    .bind(subject)
    .bind(due_date)
    .fetch_one(pool)
    .await?
    .try_get("id")?;

    Ok(id)
}

/// Returns true when a new submission row was created.
async fn insert_submission(
    pool: &PgPool,
    assignment_id: Uuid,
    student_id: Uuid,
    status: &Status,
    completed_at: Option<DateTime<Utc>>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO homework_tracker.submissions
        (id, assignment_id, student_id, status, completed_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (assignment_id, student_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(assignment_id)
    .bind(student_id)
    .bind(status.as_str())
    .bind(completed_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let now = Utc::now();

    upsert_user(pool, "teacher@homework.local", "Dana Cho", "admin", None).await?;
    let students = vec![
        ("mina.park@homework.local", "Mina Park", "B1"),
        ("leo.santos@homework.local", "Leo Santos", "A2"),
    ];
    let mut student_ids = Vec::new();
    for (email, name, level) in students {
        student_ids.push(upsert_user(pool, email, name, "student", Some(level)).await?);
    }

    let assignments = vec![
        ("seed-reading-01", "Short story summary", "Reading", 15),
        ("seed-grammar-01", "Past continuous drills", "Grammar", 8),
        ("seed-listening-01", "Podcast comprehension", "Listening", 1),
        ("seed-writing-01", "Opinion essay draft", "Writing", -3),
        ("seed-speaking-01", "Self-introduction recording", "Speaking", -10),
    ];

    for (index, (key, title, subject, days_ago)) in assignments.into_iter().enumerate() {
        let due_date = now - Duration::days(days_ago);
        let assignment_id = upsert_assignment(pool, key, title, Some(subject), due_date).await?;

        for (student_index, student_id) in student_ids.iter().enumerate() {
            let completes = days_ago > 0 && (student_index == 0 || index == 0);
            let (status, completed_at) = if completes {
                (Status::Completed, Some(due_date - Duration::hours(6)))
            } else if index == 3 {
                (Status::InProgress, None)
            } else {
                (Status::Pending, None)
            };
            insert_submission(pool, assignment_id, *student_id, &status, completed_at).await?;
        }
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        level: Option<String>,
        assignment_key: String,
        title: String,
        subject: Option<String>,
        due_date: DateTime<Utc>,
        status: String,
        completed_at: Option<DateTime<Utc>>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV record {}", line + 1))?;
        let student_id = upsert_user(
            pool,
            &row.email,
            &row.full_name,
            "student",
            row.level.as_deref(),
        )
        .await?;
        let assignment_id = upsert_assignment(
            pool,
            &row.assignment_key,
            &row.title,
            row.subject.as_deref(),
            row.due_date,
        )
        .await?;

        let status = Status::parse(&row.status);
        if insert_submission(pool, assignment_id, student_id, &status, row.completed_at).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn fetch_student(pool: &PgPool, email: &str) -> anyhow::Result<StudentProfile> {
    let row = sqlx::query(
        r#"
        SELECT id, full_name, email, level, points
        FROM homework_tracker.users
        WHERE email = $1 AND role = 'student'
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student with email {email}"))?;

    Ok(StudentProfile {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        level: row.try_get("level")?,
        points: row.try_get("points")?,
    })
}

pub async fn fetch_submissions(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Vec<SubmissionRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.assignment_id, s.student_id, s.status, s.started_at,
               s.completed_at, s.notes, s.created_at, s.updated_at,
               a.id AS joined_assignment_id, a.title, a.subject, a.due_date
        FROM homework_tracker.submissions s
        LEFT JOIN homework_tracker.assignments a ON a.id = s.assignment_id
        WHERE s.student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut submissions = Vec::with_capacity(rows.len());
    for row in rows {
        submissions.push(submission_from_row(&row)?);
    }

    Ok(submissions)
}

fn submission_from_row(row: &PgRow) -> Result<SubmissionRecord, sqlx::Error> {
    let submission = SubmissionRow {
        id: row.try_get("id")?,
        assignment_id: row.try_get("assignment_id")?,
        student_id: row.try_get("student_id")?,
        status: row.try_get("status")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };

    let joined_id: Option<Uuid> = row.try_get("joined_assignment_id")?;
    let assignment = match joined_id {
        Some(_) => Some(AssignmentRef {
            title: row.try_get("title")?,
            subject: row.try_get("subject")?,
            due_date: row.try_get("due_date")?,
        }),
        None => None,
    };

    Ok(SubmissionRecord::join(submission, assignment))
}

pub async fn dashboard_counts(pool: &PgPool) -> anyhow::Result<DashboardCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM homework_tracker.users WHERE role = 'student') AS total_students,
            (SELECT COUNT(*) FROM homework_tracker.assignments) AS total_assignments,
            (SELECT COUNT(*) FROM homework_tracker.submissions WHERE status = 'completed')
                AS completed_submissions,
            (SELECT COUNT(*) FROM homework_tracker.submissions WHERE status = 'pending')
                AS pending_submissions
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DashboardCounts {
        total_students: row.try_get("total_students")?,
        total_assignments: row.try_get("total_assignments")?,
        completed_submissions: row.try_get("completed_submissions")?,
        pending_submissions: row.try_get("pending_submissions")?,
    })
}

#[derive(Debug)]
pub struct AppliedTransition {
    pub outcome: TransitionOutcome,
    pub points_credited: bool,
}

/// Writes a status change. The prior state is read under a row lock so
/// concurrent writers to one submission are serialized; the award itself
/// is guarded again by the ledger key, and a failed credit leaves the
/// committed status in place.
pub async fn update_status(
    pool: &PgPool,
    request: &TransitionRequest,
    at: DateTime<Utc>,
    points: i32,
) -> Result<AppliedTransition, TransitionError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT student_id, status, started_at, completed_at, notes
        FROM homework_tracker.submissions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(request.submission_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(TransitionError::SubmissionNotFound(request.submission_id))?;

    let status: String = row.try_get("status")?;
    let prior = SubmissionState {
        student_id: row.try_get("student_id")?,
        status: Status::parse(&status),
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        notes: row.try_get("notes")?,
    };

    let outcome = transition::apply(&prior, request, at, points)?;

    sqlx::query(
        r#"
        UPDATE homework_tracker.submissions
        SET status = $2, started_at = $3, completed_at = $4, notes = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(request.submission_id)
    .bind(outcome.state.status.as_str())
    .bind(outcome.state.started_at)
    .bind(outcome.state.completed_at)
    .bind(outcome.state.notes.as_deref())
    .bind(at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        submission_id = %request.submission_id,
        from = %outcome.previous,
        to = %outcome.state.status,
        "submission status updated"
    );

    let mut points_credited = false;
    if let Some(award) = outcome.award {
        match credit_award(pool, &award).await {
            Ok(true) => {
                points_credited = true;
                tracing::info!(
                    submission_id = %award.submission_id,
                    student_id = %award.student_id,
                    points = award.points,
                    "completion points credited"
                );
            }
            Ok(false) => {
                tracing::debug!(
                    submission_id = %award.submission_id,
                    "completion points already credited"
                );
            }
            Err(err) => {
                tracing::warn!(
                    submission_id = %award.submission_id,
                    error = %err,
                    "status saved but completion points were not credited"
                );
            }
        }
    }

    Ok(AppliedTransition {
        outcome,
        points_credited,
    })
}

/// Records the award in the ledger and credits the student, once per
/// submission. Returns false when the ledger already holds the award.
async fn credit_award(pool: &PgPool, award: &PointAward) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO homework_tracker.point_awards (submission_id, kind, student_id, points)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (submission_id, kind) DO NOTHING
        "#,
    )
    .bind(award.submission_id)
    .bind(COMPLETION_AWARD)
    .bind(award.student_id)
    .bind(award.points)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    if inserted {
        sqlx::query("UPDATE homework_tracker.users SET points = points + $1 WHERE id = $2")
            .bind(award.points)
            .bind(award.student_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(inserted)
}
