use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;

mod db;
mod models;
mod rank;
mod report;
mod scoring;

use rank::Rank;
use scoring::Category;

#[derive(Parser)]
#[command(name = "belt-exam-ledger")]
#[command(about = "Belt examination scoring and archive ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Register a student for an examination
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        current_rank: Rank,
        /// Defaults to the next rank on the ladder
        #[arg(long)]
        target_rank: Option<Rank>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record or update one category mark for a student
    Mark {
        #[arg(long)]
        email: String,
        #[arg(long)]
        category: Category,
        #[arg(long)]
        score: f64,
        #[arg(long)]
        examiner: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the live result for a student's examination
    Result {
        #[arg(long)]
        email: String,
    },
    /// Snapshot a completed examination into the archive
    Finalize {
        #[arg(long)]
        email: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Browse archived examinations
    #[command(group(
        ArgGroup::new("scope")
            .args(["rank", "email"])
            .multiple(false)
    ))]
    Archive {
        #[arg(long)]
        rank: Option<Rank>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Import marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export archived examinations to JSON or CSV
    #[command(group(
        ArgGroup::new("scope")
            .args(["rank", "email"])
            .multiple(false)
    ))]
    Export {
        #[arg(long)]
        rank: Option<Rank>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
        #[arg(long, default_value = "archive.json")]
        out: PathBuf,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["rank", "email"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        rank: Option<Rank>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Register {
            name,
            email,
            current_rank,
            target_rank,
            date,
        } => {
            let target_rank = match target_rank {
                Some(rank) => rank,
                None => current_rank
                    .successor()
                    .context("already at the top of the ladder; pass --target-rank explicitly")?,
            };
            anyhow::ensure!(
                target_rank.is_promotable(),
                "branca is not an examination target"
            );
            anyhow::ensure!(
                target_rank > current_rank,
                "target rank {target_rank} is not above current rank {current_rank}"
            );

            let registered_on = date.unwrap_or_else(|| Utc::now().date_naive());
            db::upsert_student(
                &pool,
                None,
                &name,
                &email,
                current_rank,
                target_rank,
                registered_on,
            )
            .await?;
            println!("Registered {name} ({email}) for the {target_rank} examination.");
        }
        Commands::Mark {
            email,
            category,
            score,
            examiner,
            date,
        } => {
            anyhow::ensure!(
                (0.0..=10.0).contains(&score),
                "score {score} outside 0.0-10.0"
            );
            anyhow::ensure!(!examiner.trim().is_empty(), "examiner name is empty");

            let student = db::fetch_student(&pool, &email)
                .await?
                .with_context(|| format!("no student registered with email {email}"))?;
            anyhow::ensure!(
                scoring::applicable_categories(student.target_rank).contains(&category),
                "category {category} does not apply to a {} examination",
                student.target_rank
            );

            let recorded_on = date.unwrap_or_else(|| Utc::now().date_naive());
            db::record_mark(&pool, student.id, category, score, &examiner, recorded_on).await?;

            let marks = db::fetch_marks(&pool, student.id).await?;
            let sheet = models::mark_sheet(&marks);
            let missing = scoring::missing_categories(student.target_rank, &sheet);
            if missing.is_empty() {
                println!(
                    "Recorded {category} {score:.1} for {}. All categories scored; ready to finalize.",
                    student.full_name
                );
            } else {
                let waiting: Vec<String> =
                    missing.iter().map(|category| category.to_string()).collect();
                println!(
                    "Recorded {category} {score:.1} for {}. Still waiting on: {}.",
                    student.full_name,
                    waiting.join(", ")
                );
            }
        }
        Commands::Result { email } => {
            let student = db::fetch_student(&pool, &email)
                .await?
                .with_context(|| format!("no student registered with email {email}"))?;
            let marks = db::fetch_marks(&pool, student.id).await?;
            let sheet = models::mark_sheet(&marks);
            let result = scoring::compute_result(student.target_rank, &sheet);

            println!(
                "{} ({}): {} toward {}",
                student.full_name, student.email, student.current_rank, student.target_rank
            );
            for category in scoring::applicable_categories(student.target_rank) {
                let mark = sheet.get(*category);
                match (&mark.score, &mark.examiner) {
                    (Some(score), Some(examiner)) => {
                        println!("- {category}: {score:.1} ({examiner})");
                    }
                    _ => println!("- {category}: not yet scored"),
                }
            }
            let verdict = if result.passed { "PASS" } else { "FAIL" };
            println!("Average {:.1} ({verdict})", result.average);

            let missing = scoring::missing_categories(student.target_rank, &sheet);
            if !missing.is_empty() {
                println!("Applicable categories still unscored: {}.", missing.len());
            }
        }
        Commands::Finalize { email, date } => {
            let student = db::fetch_student(&pool, &email)
                .await?
                .with_context(|| format!("no student registered with email {email}"))?;
            let marks = db::fetch_marks(&pool, student.id).await?;
            let sheet = models::mark_sheet(&marks);

            let missing = scoring::missing_categories(student.target_rank, &sheet);
            if !missing.is_empty() {
                let waiting: Vec<String> =
                    missing.iter().map(|category| category.to_string()).collect();
                anyhow::bail!(
                    "cannot finalize: unscored categories for {}: {}",
                    student.full_name,
                    waiting.join(", ")
                );
            }

            let result = scoring::compute_result(student.target_rank, &sheet);
            let examined_on = date.unwrap_or_else(|| Utc::now().date_naive());
            db::archive_exam(&pool, student.id, student.target_rank, result, examined_on).await?;

            if result.passed {
                db::promote_student(&pool, student.id, student.target_rank).await?;
                println!(
                    "{} passed the {} examination with average {:.1}; promoted.",
                    student.full_name, student.target_rank, result.average
                );
            } else {
                println!(
                    "{} failed the {} examination with average {:.1}; archived.",
                    student.full_name, student.target_rank, result.average
                );
            }
        }
        Commands::Archive {
            rank,
            email,
            year,
            limit,
        } => {
            let rank = rank.map(|rank| rank.to_string());
            let exams =
                db::fetch_archive(&pool, rank.as_deref(), email.as_deref(), year).await?;

            if exams.is_empty() {
                println!("No archived examinations found.");
                return Ok(());
            }

            println!("Archived examinations:");
            for exam in exams.iter().take(limit) {
                let verdict = if exam.passed { "passed" } else { "failed" };
                println!(
                    "- {} ({}) for {} on {}: average {:.1}, {}",
                    exam.student_name,
                    exam.student_email,
                    exam.target_rank,
                    exam.examined_on,
                    exam.average,
                    verdict
                );
            }
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} marks from {}.", csv.display());
        }
        Commands::Export {
            rank,
            email,
            year,
            format,
            out,
        } => {
            let rank = rank.map(|rank| rank.to_string());
            let exams =
                db::fetch_archive(&pool, rank.as_deref(), email.as_deref(), year).await?;

            match format {
                ExportFormat::Json => {
                    let json = serde_json::to_string_pretty(&exams)?;
                    std::fs::write(&out, json)?;
                }
                ExportFormat::Csv => {
                    let mut writer = csv::Writer::from_path(&out)?;
                    for exam in &exams {
                        writer.serialize(exam)?;
                    }
                    writer.flush()?;
                }
            }
            println!("Exported {} examinations to {}.", exams.len(), out.display());
        }
        Commands::Report { rank, email, out } => {
            let rank = rank.map(|rank| rank.to_string());
            let scope = rank.clone().or_else(|| email.clone());
            let exams = db::fetch_archive(&pool, rank.as_deref(), email.as_deref(), None).await?;
            let marks = db::fetch_mark_rows(&pool, rank.as_deref(), email.as_deref()).await?;
            let report = report::build_report(
                scope.as_deref(),
                Utc::now().date_naive(),
                &exams,
                &marks,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
