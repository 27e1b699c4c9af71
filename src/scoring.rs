use std::fmt;
use std::str::FromStr;

use crate::rank::Rank;

pub const PASS_THRESHOLD: f64 = 6.0;

/// The four fixed evaluation categories of a belt examination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    BasicTechnique,
    Form,
    Sparring,
    WrittenKnowledge,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::BasicTechnique,
        Category::Form,
        Category::Sparring,
        Category::WrittenKnowledge,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::BasicTechnique => write!(f, "basic_technique"),
            Category::Form => write!(f, "form"),
            Category::Sparring => write!(f, "sparring"),
            Category::WrittenKnowledge => write!(f, "written_knowledge"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCategoryError(pub String);

impl fmt::Display for InvalidCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized category '{}' (expected basic_technique, form, sparring, or written_knowledge)",
            self.0
        )
    }
}

impl std::error::Error for InvalidCategoryError {}

impl FromStr for Category {
    type Err = InvalidCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "basic_technique" => Ok(Category::BasicTechnique),
            "form" => Ok(Category::Form),
            "sparring" => Ok(Category::Sparring),
            "written_knowledge" => Ok(Category::WrittenKnowledge),
            _ => Err(InvalidCategoryError(s.to_string())),
        }
    }
}

/// One recorded (or not yet recorded) category evaluation. A missing score
/// means "not yet scored", never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mark {
    pub score: Option<f64>,
    pub examiner: Option<String>,
}

impl Mark {
    pub fn scored(score: f64, examiner: &str) -> Mark {
        Mark {
            score: Some(score),
            examiner: Some(examiner.to_string()),
        }
    }
}

/// One mark slot per category for a single student.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkSheet {
    pub basic_technique: Mark,
    pub form: Mark,
    pub sparring: Mark,
    pub written_knowledge: Mark,
}

impl MarkSheet {
    pub fn get(&self, category: Category) -> &Mark {
        match category {
            Category::BasicTechnique => &self.basic_technique,
            Category::Form => &self.form,
            Category::Sparring => &self.sparring,
            Category::WrittenKnowledge => &self.written_knowledge,
        }
    }

    pub fn set(&mut self, category: Category, mark: Mark) {
        match category {
            Category::BasicTechnique => self.basic_technique = mark,
            Category::Form => self.form = mark,
            Category::Sparring => self.sparring = mark,
            Category::WrittenKnowledge => self.written_knowledge = mark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamResult {
    pub average: f64,
    pub passed: bool,
}

/// Categories required for an examination toward `target`. Exhaustive over
/// the ladder so a new rank cannot silently inherit a default:
/// basic technique and form always apply, sparring applies to every target
/// above amarela, written knowledge only to preta and the dan grades.
pub fn applicable_categories(target: Rank) -> &'static [Category] {
    const BASE: &[Category] = &[Category::BasicTechnique, Category::Form];
    const WITH_SPARRING: &[Category] = &[
        Category::BasicTechnique,
        Category::Form,
        Category::Sparring,
    ];
    const FULL: &[Category] = &[
        Category::BasicTechnique,
        Category::Form,
        Category::Sparring,
        Category::WrittenKnowledge,
    ];

    match target {
        Rank::Amarela => BASE,
        Rank::Branca
        | Rank::Laranja
        | Rank::Verde
        | Rank::Azul
        | Rank::Roxa
        | Rank::Marrom => WITH_SPARRING,
        Rank::Preta | Rank::Dan(_) => FULL,
    }
}

/// Derive the exam verdict from the recorded marks. Stateless: the average
/// is the unrounded mean over applicable categories that have a score, and
/// the pass comparison uses that unrounded value. Display rounding belongs
/// to callers. No applicable category scored is a defined edge case, not an
/// error: average 0.0, failed.
pub fn compute_result(target: Rank, sheet: &MarkSheet) -> ExamResult {
    let mut sum = 0.0;
    let mut count = 0usize;

    for category in applicable_categories(target) {
        if let Some(score) = sheet.get(*category).score {
            sum += score;
            count += 1;
        }
    }

    if count == 0 {
        return ExamResult {
            average: 0.0,
            passed: false,
        };
    }

    let average = sum / count as f64;
    ExamResult {
        average,
        passed: average >= PASS_THRESHOLD,
    }
}

/// Applicable categories still waiting on a score.
pub fn missing_categories(target: Rank, sheet: &MarkSheet) -> Vec<Category> {
    applicable_categories(target)
        .iter()
        .copied()
        .filter(|category| sheet.get(*category).score.is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(marks: &[(Category, f64)]) -> MarkSheet {
        let mut sheet = MarkSheet::default();
        for (category, score) in marks {
            sheet.set(*category, Mark::scored(*score, "Mestre Ana"));
        }
        sheet
    }

    #[test]
    fn amarela_needs_no_sparring_or_written() {
        assert_eq!(
            applicable_categories(Rank::Amarela),
            &[Category::BasicTechnique, Category::Form]
        );
    }

    #[test]
    fn mid_ladder_targets_add_sparring_only() {
        for target in [Rank::Laranja, Rank::Verde, Rank::Azul, Rank::Roxa, Rank::Marrom] {
            let categories = applicable_categories(target);
            assert!(categories.contains(&Category::Sparring));
            assert!(!categories.contains(&Category::WrittenKnowledge));
        }
    }

    #[test]
    fn preta_and_dan_targets_require_all_four() {
        assert_eq!(applicable_categories(Rank::Preta).len(), 4);
        assert_eq!(applicable_categories(Rank::Dan(2)).len(), 4);
    }

    #[test]
    fn no_scored_categories_is_a_zero_fail() {
        for target in [Rank::Amarela, Rank::Marrom, Rank::Preta, Rank::Dan(1)] {
            let result = compute_result(target, &MarkSheet::default());
            assert_eq!(result.average, 0.0);
            assert!(!result.passed);
        }
    }

    #[test]
    fn sparring_never_counts_toward_amarela() {
        // A recorded sparring mark must be ignored for the exempt target.
        let mut marks = sheet(&[(Category::BasicTechnique, 8.0), (Category::Form, 7.0)]);
        marks.set(Category::Sparring, Mark::scored(1.0, "Mestre Ana"));
        let result = compute_result(Rank::Amarela, &marks);
        assert!((result.average - 7.5).abs() < 1e-9);
        assert!(result.passed);
    }

    #[test]
    fn written_knowledge_counts_only_for_top_tiers() {
        let marks = sheet(&[
            (Category::BasicTechnique, 6.0),
            (Category::Form, 6.0),
            (Category::Sparring, 6.0),
            (Category::WrittenKnowledge, 10.0),
        ]);

        // Included for preta and dan targets.
        let top = compute_result(Rank::Preta, &marks);
        assert!((top.average - 7.0).abs() < 1e-9);
        let dan = compute_result(Rank::Dan(3), &marks);
        assert!((dan.average - 7.0).abs() < 1e-9);

        // Ignored everywhere else, even when recorded.
        let mid = compute_result(Rank::Verde, &marks);
        assert!((mid.average - 6.0).abs() < 1e-9);
    }

    #[test]
    fn pass_uses_the_unrounded_mean() {
        // 5.9 and 6.0 average to 5.95, which displays as "6.0" at one
        // decimal but must still fail.
        let marks = sheet(&[(Category::BasicTechnique, 5.9), (Category::Form, 6.0)]);
        let result = compute_result(Rank::Amarela, &marks);
        assert_eq!(format!("{:.1}", result.average), "6.0");
        assert!(!result.passed);

        // Exactly 6.0 passes: the threshold is inclusive.
        let marks = sheet(&[(Category::BasicTechnique, 6.0), (Category::Form, 6.0)]);
        assert!(compute_result(Rank::Amarela, &marks).passed);
    }

    #[test]
    fn partial_sheets_average_only_what_is_scored() {
        let marks = sheet(&[(Category::BasicTechnique, 9.0)]);
        let result = compute_result(Rank::Marrom, &marks);
        assert!((result.average - 9.0).abs() < 1e-9);
        assert!(result.passed);
    }

    #[test]
    fn recording_order_never_changes_the_result() {
        let forward = sheet(&[
            (Category::BasicTechnique, 7.3),
            (Category::Form, 5.1),
            (Category::Sparring, 8.8),
            (Category::WrittenKnowledge, 6.4),
        ]);
        let reversed = sheet(&[
            (Category::WrittenKnowledge, 6.4),
            (Category::Sparring, 8.8),
            (Category::Form, 5.1),
            (Category::BasicTechnique, 7.3),
        ]);

        let a = compute_result(Rank::Dan(1), &forward);
        let b = compute_result(Rank::Dan(1), &reversed);
        assert!((a.average - b.average).abs() < 1e-9);
        assert_eq!(a.passed, b.passed);
    }

    #[test]
    fn scenario_amarela_two_marks() {
        let marks = sheet(&[(Category::BasicTechnique, 8.0), (Category::Form, 7.0)]);
        let result = compute_result(Rank::Amarela, &marks);
        assert!((result.average - 7.5).abs() < 1e-9);
        assert!(result.passed);
    }

    #[test]
    fn scenario_marrom_straight_fives() {
        let marks = sheet(&[
            (Category::BasicTechnique, 5.0),
            (Category::Form, 5.0),
            (Category::Sparring, 5.0),
        ]);
        let result = compute_result(Rank::Marrom, &marks);
        assert!((result.average - 5.0).abs() < 1e-9);
        assert!(!result.passed);
    }

    #[test]
    fn scenario_preta_straight_sixes() {
        let marks = sheet(&[
            (Category::BasicTechnique, 6.0),
            (Category::Form, 6.0),
            (Category::Sparring, 6.0),
            (Category::WrittenKnowledge, 6.0),
        ]);
        let result = compute_result(Rank::Preta, &marks);
        assert!((result.average - 6.0).abs() < 1e-9);
        assert!(result.passed);
    }

    #[test]
    fn scenario_preta_empty_sheet() {
        let result = compute_result(Rank::Preta, &MarkSheet::default());
        assert_eq!(result.average, 0.0);
        assert!(!result.passed);
    }

    #[test]
    fn missing_categories_tracks_the_applicable_set() {
        let marks = sheet(&[(Category::BasicTechnique, 7.0)]);
        assert_eq!(missing_categories(Rank::Amarela, &marks), vec![Category::Form]);
        assert_eq!(
            missing_categories(Rank::Preta, &marks),
            vec![Category::Form, Category::Sparring, Category::WrittenKnowledge]
        );
        assert!(missing_categories(Rank::Amarela, &sheet(&[
            (Category::BasicTechnique, 7.0),
            (Category::Form, 6.5),
        ]))
        .is_empty());
    }

    #[test]
    fn category_tokens_round_trip() {
        for category in Category::ALL {
            assert_eq!(
                category.to_string().parse::<Category>().unwrap(),
                category
            );
        }
        assert_eq!(
            "basic-technique".parse::<Category>().unwrap(),
            Category::BasicTechnique
        );
        assert!("kata".parse::<Category>().is_err());
    }
}
