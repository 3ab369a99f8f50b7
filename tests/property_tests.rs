//! Property-based tests for planning and grading invariants
//!
//! Run with ProptestConfig::with_cases(64); nothing here touches gcc.

use ctrainer::bank::repository::QuestionPool;
use ctrainer::planner::progress::CategoryScore;
use ctrainer::planner::CORE_CATEGORIES;
use ctrainer::{
    AdaptiveSessionPlanner, CodeRunner, ExecutionOutcome, FailureKind, GradingEngine,
    MemoryProgressStore, Question, QuestionType, Result,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

struct Unreachable;

impl CodeRunner for Unreachable {
    fn compile_and_run(&self, _: &str, _: &str) -> Result<ExecutionOutcome> {
        Ok(ExecutionOutcome::failed(FailureKind::SpawnFailed, "no runner"))
    }
}

// ============================================================================
// Generators
// ============================================================================

fn make_pool(sizes: &[(String, usize)]) -> QuestionPool {
    sizes
        .iter()
        .map(|(category, n)| {
            let questions = (0..*n)
                .map(|i| Question {
                    id: format!("{}-{}", category, i),
                    category: category.clone(),
                    ..Default::default()
                })
                .collect();
            (category.clone(), questions)
        })
        .collect()
}

/// Pool over the core categories, 0..6 questions each
fn arb_core_pool() -> impl Strategy<Value = QuestionPool> {
    proptest::collection::vec(0usize..6, CORE_CATEGORIES.len()).prop_map(|sizes| {
        let sizes: Vec<(String, usize)> = CORE_CATEGORIES
            .iter()
            .zip(sizes)
            .map(|(c, n)| (c.to_string(), n))
            .collect();
        make_pool(&sizes)
    })
}

/// Scores for a random subset of the core categories
fn arb_scores() -> impl Strategy<Value = Vec<(usize, u32, u32)>> {
    proptest::collection::vec(
        (0..CORE_CATEGORIES.len(), 1u32..20).prop_flat_map(|(idx, attempted)| {
            (Just(idx), Just(attempted), 0..=attempted)
        }),
        0..5,
    )
}

fn store_with(user: &str, scores: &[(usize, u32, u32)]) -> Arc<MemoryProgressStore> {
    let store = Arc::new(MemoryProgressStore::new());
    for (idx, attempted, correct) in scores {
        store
            .set_score(
                user,
                CategoryScore {
                    attempted: *attempted,
                    correct: *correct,
                    ..CategoryScore::new(CORE_CATEGORIES[*idx])
                },
            )
            .unwrap();
    }
    store
}

// ============================================================================
// Planner properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: a plan never repeats a question and never exceeds the target
    #[test]
    fn prop_plan_has_no_duplicates(
        pool in arb_core_pool(),
        scores in arb_scores(),
        target in 0usize..30,
        seed in any::<u64>()
    ) {
        let planner = AdaptiveSessionPlanner::new("ana", store_with("ana", &scores));
        let plan = planner
            .generate_session(&pool, target, &mut StdRng::seed_from_u64(seed))
            .unwrap();

        let ids: HashSet<String> = plan.ids().into_iter().collect();
        prop_assert_eq!(ids.len(), plan.len());
        prop_assert!(plan.len() <= target);

        let available: usize = pool.values().map(Vec::len).sum();
        prop_assert_eq!(plan.len(), target.min(available));
    }

    /// Property: seeded plans are reproducible
    #[test]
    fn prop_plan_is_deterministic_for_a_seed(
        pool in arb_core_pool(),
        target in 1usize..20,
        seed in any::<u64>()
    ) {
        let planner = AdaptiveSessionPlanner::new("ana", store_with("ana", &[]));
        let a = planner.generate_session(&pool, target, &mut StdRng::seed_from_u64(seed)).unwrap();
        let b = planner.generate_session(&pool, target, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(a.ids(), b.ids());
    }

    /// Property: the three weakest categories get exactly 70% of a plentiful session
    #[test]
    fn prop_weak_categories_get_seventy_percent(seed in any::<u64>()) {
        let categories: Vec<String> = ["A", "B", "C", "D"].iter().map(|c| c.to_string()).collect();
        let store = Arc::new(MemoryProgressStore::new());
        for (category, correct) in [("A", 0), ("B", 90), ("C", 10), ("D", 50)] {
            store
                .set_score(
                    "ana",
                    CategoryScore { attempted: 100, correct, ..CategoryScore::new(category) },
                )
                .unwrap();
        }

        let planner = AdaptiveSessionPlanner::with_categories("ana", store, categories.clone());
        prop_assert_eq!(planner.weak_categories().unwrap(), vec!["A", "C", "D"]);

        let sizes: Vec<(String, usize)> = categories.iter().map(|c| (c.clone(), 20)).collect();
        let plan = planner
            .generate_session(&make_pool(&sizes), 10, &mut StdRng::seed_from_u64(seed))
            .unwrap();

        let weak = plan.questions.iter().filter(|q| q.category != "B").count();
        prop_assert_eq!(plan.len(), 10);
        prop_assert_eq!(weak, 7);
    }
}

// ============================================================================
// Grading properties
// ============================================================================

fn arb_padding() -> impl Strategy<Value = String> {
    proptest::collection::vec(prop_oneof![Just(' '), Just('\t'), Just('\n')], 0..4)
        .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: multiple choice ignores case and surrounding whitespace
    #[test]
    fn prop_multiple_choice_case_and_trim_insensitive(
        answer in "[A-Da-d]",
        left in arb_padding(),
        right in arb_padding()
    ) {
        let question: Question = serde_json::from_value(json!({
            "id": "mc", "type": "multiple_choice", "correct_answer": answer.to_uppercase()
        })).unwrap();
        prop_assert_eq!(question.question_type, QuestionType::MultipleChoice);

        let engine = GradingEngine::new(Arc::new(Unreachable));
        let submitted = format!("{}{}{}", left, answer.to_lowercase(), right);
        prop_assert!(engine.grade(&question, &submitted).unwrap().correct);
    }

    /// Property: output prediction ignores the shape of whitespace runs
    #[test]
    fn prop_output_prediction_whitespace_insensitive(
        words in proptest::collection::vec("[a-z0-9]{1,6}", 1..6),
        gaps in proptest::collection::vec(arb_padding(), 6)
    ) {
        let expected = words.join(" ");
        let mut submitted = String::new();
        for (i, word) in words.iter().enumerate() {
            submitted.push_str(word);
            submitted.push_str(&gaps[i]);
            if gaps[i].is_empty() && i + 1 < words.len() {
                submitted.push(' ');
            }
        }

        let question: Question = serde_json::from_value(json!({
            "id": "out", "type": "code_output", "correct_answer": expected
        })).unwrap();
        let engine = GradingEngine::new(Arc::new(Unreachable));
        prop_assert!(engine.grade(&question, &submitted).unwrap().correct);
    }

    /// Property: grading the same submission twice gives the same verdict
    #[test]
    fn prop_grade_is_idempotent(answer in ".{0,40}") {
        let question: Question = serde_json::from_value(json!({
            "id": "bug", "type": "bug_finding", "correct_answer": [3, 7]
        })).unwrap();
        let engine = GradingEngine::new(Arc::new(Unreachable));
        let first = engine.grade(&question, &answer).unwrap();
        let second = engine.grade(&question, &answer).unwrap();
        prop_assert_eq!(first, second);
    }
}
