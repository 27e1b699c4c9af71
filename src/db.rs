use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ArchivedExam, MarkRecord, StudentRecord};
use crate::rank::Rank;
use crate::scoring::{self, Category};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7b1e6f5a-41c8-4a6e-9f02-d3a2b8c91e47")?,
            "Ana Ribeiro",
            "ana.ribeiro@example.com",
            Rank::Branca,
            Rank::Amarela,
        ),
        (
            Uuid::parse_str("2f9c4d3e-8a71-4b20-b6e5-0c1d7a85f392")?,
            "Carlos Mendes",
            "carlos.mendes@example.com",
            Rank::Roxa,
            Rank::Marrom,
        ),
        (
            Uuid::parse_str("c4a8e210-5d6b-4f93-8e17-9b0f3c62a7d1")?,
            "Beatriz Nakamura",
            "beatriz.nakamura@example.com",
            Rank::Marrom,
            Rank::Preta,
        ),
    ];

    let registered_on = NaiveDate::from_ymd_opt(2026, 3, 2).context("invalid date")?;
    for (id, name, email, current, target) in students {
        upsert_student(pool, Some(id), name, email, current, target, registered_on).await?;
    }

    let marks = vec![
        ("ana.ribeiro@example.com", Category::BasicTechnique, 8.0, "Mestre Oliveira"),
        ("ana.ribeiro@example.com", Category::Form, 7.0, "Mestre Oliveira"),
        ("carlos.mendes@example.com", Category::BasicTechnique, 6.5, "Professora Santos"),
        ("carlos.mendes@example.com", Category::Sparring, 7.2, "Mestre Oliveira"),
        ("beatriz.nakamura@example.com", Category::BasicTechnique, 9.1, "Professora Santos"),
        ("beatriz.nakamura@example.com", Category::Form, 8.4, "Professora Santos"),
        ("beatriz.nakamura@example.com", Category::Sparring, 8.0, "Mestre Oliveira"),
        ("beatriz.nakamura@example.com", Category::WrittenKnowledge, 7.5, "Professora Santos"),
    ];

    let recorded_on = NaiveDate::from_ymd_opt(2026, 3, 14).context("invalid date")?;
    for (email, category, score, examiner) in marks {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM belt_exams.students WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        record_mark(pool, student_id, category, score, examiner, recorded_on).await?;
    }

    Ok(())
}

pub async fn upsert_student(
    pool: &PgPool,
    id: Option<Uuid>,
    full_name: &str,
    email: &str,
    current_rank: Rank,
    target_rank: Rank,
    registered_on: NaiveDate,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO belt_exams.students
        (id, full_name, email, current_rank, target_rank, registered_on)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            current_rank = EXCLUDED.current_rank,
            target_rank = EXCLUDED.target_rank
        RETURNING id
        "#,
    )
    .bind(id.unwrap_or_else(Uuid::new_v4))
    .bind(full_name)
    .bind(email)
    .bind(current_rank.to_string())
    .bind(target_rank.to_string())
    .bind(registered_on)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn fetch_student(pool: &PgPool, email: &str) -> anyhow::Result<Option<StudentRecord>> {
    let row = sqlx::query(
        "SELECT id, full_name, email, current_rank, target_rank, registered_on \
         FROM belt_exams.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let current_rank: String = row.get("current_rank");
    let target_rank: String = row.get("target_rank");
    Ok(Some(StudentRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        current_rank: current_rank
            .parse()
            .with_context(|| format!("corrupt current_rank for {email}"))?,
        target_rank: target_rank
            .parse()
            .with_context(|| format!("corrupt target_rank for {email}"))?,
        registered_on: row.get("registered_on"),
    }))
}

pub async fn record_mark(
    pool: &PgPool,
    student_id: Uuid,
    category: Category,
    score: f64,
    examiner_name: &str,
    recorded_on: NaiveDate,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO belt_exams.marks
        (id, student_id, category, score, examiner_name, recorded_on)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, category) DO UPDATE
        SET score = EXCLUDED.score,
            examiner_name = EXCLUDED.examiner_name,
            recorded_on = EXCLUDED.recorded_on
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(category.to_string())
    .bind(score)
    .bind(examiner_name)
    .bind(recorded_on)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_marks(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Vec<MarkRecord>> {
    let rows = sqlx::query(
        "SELECT student_id, category, score, examiner_name, recorded_on \
         FROM belt_exams.marks WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut marks = Vec::new();
    for row in rows {
        let category: String = row.get("category");
        marks.push(MarkRecord {
            student_id: row.get("student_id"),
            category: category
                .parse()
                .with_context(|| format!("corrupt category for student {student_id}"))?,
            score: row.get("score"),
            examiner_name: row.get("examiner_name"),
            recorded_on: row.get("recorded_on"),
        });
    }

    Ok(marks)
}

pub async fn archive_exam(
    pool: &PgPool,
    student_id: Uuid,
    target_rank: Rank,
    result: scoring::ExamResult,
    examined_on: NaiveDate,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO belt_exams.exam_archive
        (id, student_id, target_rank, average, passed, examined_on)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, target_rank) DO UPDATE
        SET average = EXCLUDED.average,
            passed = EXCLUDED.passed,
            examined_on = EXCLUDED.examined_on
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(target_rank.to_string())
    .bind(result.average)
    .bind(result.passed)
    .bind(examined_on)
    .execute(pool)
    .await?;

    Ok(())
}

/// Promotion after a passed exam: held rank becomes the examined target and
/// the next ladder step (when one exists) becomes the new target.
pub async fn promote_student(
    pool: &PgPool,
    student_id: Uuid,
    new_current: Rank,
) -> anyhow::Result<()> {
    let new_target = new_current.successor().unwrap_or(new_current);
    sqlx::query(
        "UPDATE belt_exams.students SET current_rank = $2, target_rank = $3 WHERE id = $1",
    )
    .bind(student_id)
    .bind(new_current.to_string())
    .bind(new_target.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_archive(
    pool: &PgPool,
    rank: Option<&str>,
    email: Option<&str>,
    year: Option<i32>,
) -> anyhow::Result<Vec<ArchivedExam>> {
    let mut query = String::from(
        "SELECT s.full_name, s.email, a.target_rank, a.average, a.passed, a.examined_on \
         FROM belt_exams.exam_archive a \
         JOIN belt_exams.students s ON s.id = a.student_id \
         WHERE 1 = 1",
    );

    let mut next_param = 1;
    if rank.is_some() {
        query.push_str(&format!(" AND a.target_rank = ${next_param}"));
        next_param += 1;
    } else if email.is_some() {
        query.push_str(&format!(" AND s.email = ${next_param}"));
        next_param += 1;
    }
    if year.is_some() {
        query.push_str(&format!(
            " AND date_part('year', a.examined_on)::int = ${next_param}"
        ));
    }
    query.push_str(" ORDER BY a.examined_on DESC, s.full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = rank {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }
    if let Some(value) = year {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut exams = Vec::new();

    for row in records {
        exams.push(ArchivedExam {
            student_name: row.get("full_name"),
            student_email: row.get("email"),
            target_rank: row.get("target_rank"),
            average: row.get("average"),
            passed: row.get("passed"),
            examined_on: row.get("examined_on"),
        });
    }

    Ok(exams)
}

/// All recorded marks within an optional scope, for the category breakdown
/// in reports.
pub async fn fetch_mark_rows(
    pool: &PgPool,
    rank: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<MarkRecord>> {
    let mut query = String::from(
        "SELECT m.student_id, m.category, m.score, m.examiner_name, m.recorded_on \
         FROM belt_exams.marks m \
         JOIN belt_exams.students s ON s.id = m.student_id \
         WHERE 1 = 1",
    );

    if rank.is_some() {
        query.push_str(" AND s.target_rank = $1");
    } else if email.is_some() {
        query.push_str(" AND s.email = $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = rank {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut marks = Vec::new();

    for row in records {
        let category: String = row.get("category");
        let student_id: Uuid = row.get("student_id");
        marks.push(MarkRecord {
            student_id,
            category: category
                .parse()
                .with_context(|| format!("corrupt category for student {student_id}"))?,
            score: row.get("score"),
            examiner_name: row.get("examiner_name"),
            recorded_on: row.get("recorded_on"),
        });
    }

    Ok(marks)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        current_rank: String,
        target_rank: String,
        category: String,
        score: f64,
        examiner_name: String,
        recorded_on: NaiveDate,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let context = || format!("row {} ({})", line + 1, row.email);

        let current_rank: Rank = row.current_rank.parse().with_context(context)?;
        let target_rank: Rank = row.target_rank.parse().with_context(context)?;
        let category: Category = row.category.parse().with_context(context)?;
        anyhow::ensure!(
            target_rank.is_promotable(),
            "{}: branca is not an examination target",
            context()
        );
        anyhow::ensure!(
            (0.0..=10.0).contains(&row.score),
            "{}: score {} outside 0.0-10.0",
            context(),
            row.score
        );
        anyhow::ensure!(
            !row.examiner_name.trim().is_empty(),
            "{}: examiner name is empty",
            context()
        );
        anyhow::ensure!(
            scoring::applicable_categories(target_rank).contains(&category),
            "{}: category {} does not apply to a {} examination",
            context(),
            category,
            target_rank
        );

        let student_id = upsert_student(
            pool,
            None,
            &row.full_name,
            &row.email,
            current_rank,
            target_rank,
            row.recorded_on,
        )
        .await?;

        record_mark(
            pool,
            student_id,
            category,
            row.score,
            &row.examiner_name,
            row.recorded_on,
        )
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}
