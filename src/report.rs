use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ArchivedExam, CategorySummary, MarkRecord};

pub fn summarize_categories(marks: &[MarkRecord]) -> Vec<CategorySummary> {
    let mut map: std::collections::HashMap<crate::scoring::Category, (usize, f64)> =
        std::collections::HashMap::new();

    for mark in marks {
        let entry = map.entry(mark.category).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += mark.score;
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (count, total))| CategorySummary {
            category,
            count,
            avg_score: if count == 0 { 0.0 } else { total / count as f64 },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.to_string().cmp(&b.category.to_string()))
    });
    summaries
}

pub fn build_report(
    scope: Option<&str>,
    generated_on: NaiveDate,
    exams: &[ArchivedExam],
    marks: &[MarkRecord],
) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all examinations");

    let _ = writeln!(output, "# Belt Examination Report");
    let _ = writeln!(output, "Generated for {} on {}", scope_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Outcomes");

    if exams.is_empty() {
        let _ = writeln!(output, "No archived examinations for this scope.");
    } else {
        let passed = exams.iter().filter(|exam| exam.passed).count();
        let rate = 100.0 * passed as f64 / exams.len() as f64;
        let _ = writeln!(
            output,
            "{} of {} examinations passed ({:.0}%).",
            passed,
            exams.len(),
            rate
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Averages");

    let summaries = summarize_categories(marks);
    if summaries.is_empty() {
        let _ = writeln!(output, "No marks recorded for this scope.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} marks (avg score {:.1})",
                summary.category, summary.count, summary.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Examinations");

    if exams.is_empty() {
        let _ = writeln!(output, "No archived examinations for this scope.");
    } else {
        for exam in exams.iter().take(10) {
            let verdict = if exam.passed { "passed" } else { "failed" };
            let _ = writeln!(
                output,
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

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Category;
    use uuid::Uuid;

    fn mark(category: Category, score: f64) -> MarkRecord {
        MarkRecord {
            student_id: Uuid::new_v4(),
            category,
            score,
            examiner_name: "Mestre Oliveira".to_string(),
            recorded_on: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        }
    }

    fn exam(name: &str, rank: &str, average: f64, passed: bool) -> ArchivedExam {
        ArchivedExam {
            student_name: name.to_string(),
            student_email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            target_rank: rank.to_string(),
            average,
            passed,
            examined_on: NaiveDate::from_ymd_opt(2026, 4, 5).unwrap(),
        }
    }

    #[test]
    fn summaries_group_and_average_by_category() {
        let marks = vec![
            mark(Category::Form, 8.0),
            mark(Category::Form, 6.0),
            mark(Category::Sparring, 5.5),
        ];

        let summaries = summarize_categories(&marks);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].category, Category::Form);
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].avg_score - 7.0).abs() < 0.001);
        assert_eq!(summaries[1].count, 1);
    }

    #[test]
    fn report_counts_pass_rate() {
        let exams = vec![
            exam("Ana Ribeiro", "amarela", 7.5, true),
            exam("Carlos Mendes", "marrom", 5.0, false),
        ];
        let report = build_report(
            None,
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            &exams,
            &[],
        );

        assert!(report.contains("# Belt Examination Report"));
        assert!(report.contains("Generated for all examinations"));
        assert!(report.contains("1 of 2 examinations passed (50%)."));
        assert!(report.contains("average 7.5, passed"));
        assert!(report.contains("average 5.0, failed"));
    }

    #[test]
    fn report_rounds_averages_for_display_only() {
        // 5.95 shows as 6.0 yet keeps its failed verdict from the snapshot.
        let exams = vec![exam("Ana Ribeiro", "amarela", 5.95, false)];
        let report = build_report(
            Some("amarela"),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            &exams,
            &[],
        );
        assert!(report.contains("average 6.0, failed"));
    }

    #[test]
    fn empty_scope_falls_back_cleanly() {
        let report = build_report(
            Some("dan3"),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            &[],
            &[],
        );
        assert!(report.contains("No archived examinations for this scope."));
        assert!(report.contains("No marks recorded for this scope."));
    }
}
