use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::rank::Rank;
use crate::scoring::Category;

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub current_rank: Rank,
    pub target_rank: Rank,
    pub registered_on: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct MarkRecord {
    pub student_id: Uuid,
    pub category: Category,
    pub score: f64,
    pub examiner_name: String,
    pub recorded_on: NaiveDate,
}

/// Snapshot written at finalization; live verdicts are always recomputed
/// from the marks, never read back from here.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedExam {
    pub student_name: String,
    pub student_email: String,
    pub target_rank: String,
    pub average: f64,
    pub passed: bool,
    pub examined_on: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub avg_score: f64,
}

pub fn mark_sheet(marks: &[MarkRecord]) -> crate::scoring::MarkSheet {
    let mut sheet = crate::scoring::MarkSheet::default();
    for mark in marks {
        sheet.set(
            mark.category,
            crate::scoring::Mark::scored(mark.score, &mark.examiner_name),
        );
    }
    sheet
}
