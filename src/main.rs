use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod aggregate;
mod calendar;
mod config;
mod db;
mod error;
mod models;
mod overview;
mod relevance;
mod report;
mod streak;
mod transition;

use config::Config;
use models::{Status, Subject};
use transition::TransitionRequest;

#[derive(Parser)]
#[command(name = "homework-progress")]
#[command(about = "Homework completion, streak and points tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import students, assignments and submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show completion stats, subjects, weekly progress and streak
    Stats {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// List a student's assignments, soonest due first
    Assignments {
        #[arg(long)]
        email: String,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Pending and recently completed assignments
    Relevant {
        #[arg(long)]
        email: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Change a submission's status
    SetStatus {
        #[arg(long)]
        submission: Uuid,
        #[arg(long, value_enum)]
        status: StatusArg,
        #[arg(long)]
        note: Option<String>,
    },
    /// Totals across all students
    Dashboard,
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    InProgress,
    Completed,
}

impl From<StatusArg> for Status {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => Status::Pending,
            StatusArg::InProgress => Status::InProgress,
            StatusArg::Completed => Status::Completed,
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

async fn load_overview(
    pool: &PgPool,
    config: &Config,
    email: &str,
) -> anyhow::Result<overview::StudentOverview> {
    let student = db::fetch_student(pool, email).await?;
    let submissions = db::fetch_submissions(pool, student.id).await?;
    tracing::debug!(student = %student.email, count = submissions.len(), "submissions loaded");
    Ok(overview::build_overview(
        student,
        &submissions,
        Utc::now(),
        &config.engine,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homework_progress=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let pool = connect(&config).await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        Commands::Stats { email, json } => {
            let overview = load_overview(&pool, &config, &email).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
                return Ok(());
            }

            let stats = &overview.stats;
            println!(
                "{}: {} assignments, {} completed, {} in progress, {} pending ({}% complete)",
                overview.student.full_name,
                stats.counts.total,
                stats.counts.completed,
                stats.counts.in_progress,
                stats.counts.pending,
                stats.counts.completion_rate
            );
            println!(
                "Weekly streak: {} | Points: {}",
                stats.weekly_streak, overview.student.points
            );
            for subject in &overview.by_subject {
                println!(
                    "- {}: {}/{} ({}%)",
                    subject.subject, subject.completed, subject.total, subject.progress_percent
                );
            }
            for week in &overview.weekly {
                println!("  {} {} completed", week.week, week.completed);
            }
        }
        Commands::Assignments {
            email,
            status,
            subject,
        } => {
            let student = db::fetch_student(&pool, &email).await?;
            let submissions = db::fetch_submissions(&pool, student.id).await?;
            let status = status.map(Status::from);
            let subject = subject.as_deref().map(|raw| Subject::parse_lenient(Some(raw)));
            let listed = relevance::list_assignments(&submissions, status.as_ref(), subject);

            if listed.is_empty() {
                println!("No assignments match.");
                return Ok(());
            }
            for submission in listed {
                println!(
                    "- {} [{}] {} ({}) due {}",
                    submission.submission_id,
                    submission.status,
                    submission.title,
                    submission.subject,
                    submission.due_date.date_naive()
                );
            }
        }
        Commands::Relevant { email, limit } => {
            let student = db::fetch_student(&pool, &email).await?;
            let submissions = db::fetch_submissions(&pool, student.id).await?;
            let relevant = relevance::select_relevant(
                &submissions,
                Utc::now(),
                config.engine.relevance_window_days,
                limit.unwrap_or(config.engine.relevant_limit),
            );

            if relevant.is_empty() {
                println!("Nothing pending or recently completed.");
                return Ok(());
            }
            for submission in relevant {
                println!(
                    "- [{}] {} ({}) due {}",
                    submission.status,
                    submission.title,
                    submission.subject,
                    submission.due_date.date_naive()
                );
            }
        }
        Commands::SetStatus {
            submission,
            status,
            note,
        } => {
            let request = TransitionRequest {
                submission_id: submission,
                new_status: status.into(),
                note,
            };
            let applied = db::update_status(
                &pool,
                &request,
                Utc::now(),
                config.engine.points_per_completion,
            )
            .await
            .with_context(|| format!("failed to update submission {submission}"))?;

            println!(
                "Submission {submission}: {} -> {}.",
                applied.outcome.previous, applied.outcome.state.status
            );
            if applied.points_credited {
                println!("Credited {} points.", config.engine.points_per_completion);
            }
        }
        Commands::Dashboard => {
            let counts = db::dashboard_counts(&pool).await?;
            println!("Students: {}", counts.total_students);
            println!("Assignments: {}", counts.total_assignments);
            println!("Completed submissions: {}", counts.completed_submissions);
            println!("Pending submissions: {}", counts.pending_submissions);
        }
        Commands::Report { email, out } => {
            let overview = load_overview(&pool, &config, &email).await?;
            let report = report::build_report(&overview, Utc::now());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
