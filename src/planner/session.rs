/// Adaptive session planning for one learner
use crate::bank::question::Question;
use crate::bank::repository::QuestionPool;
use crate::config::types::Result;
use crate::planner::progress::{percentage, CategoryScore, ProgressStore};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Categories every learner is tracked in
pub const CORE_CATEGORIES: [&str; 7] = [
    "memory_management",
    "integer_division",
    "strings",
    "structs",
    "pointers",
    "recursion",
    "control_flow",
];

const WEAK_CATEGORY_COUNT: usize = 3;
const RECOMMENDATION_COUNT: usize = 2;

/// Ordered, duplicate-free list of questions for one session
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
}

impl SessionPlan {
    pub fn ids(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Progress of one category in a summary
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryProgress {
    pub attempted: u32,
    pub correct: u32,
    pub accuracy: u32,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl From<&CategoryScore> for CategoryProgress {
    fn from(score: &CategoryScore) -> Self {
        Self {
            attempted: score.attempted,
            correct: score.correct,
            accuracy: score.accuracy(),
            last_practiced: score.last_practiced,
        }
    }
}

/// Dashboard view of a learner's progress
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressSummary {
    pub overall_accuracy: u32,
    pub total_attempted: u32,
    pub total_correct: u32,
    pub category_progress: BTreeMap<String, CategoryProgress>,
    pub weak_areas: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Picks sessions weighted 70/30 toward a learner's three weakest categories
pub struct AdaptiveSessionPlanner {
    user: String,
    store: Arc<dyn ProgressStore>,
    categories: Vec<String>,
}

impl AdaptiveSessionPlanner {
    pub fn new(user: impl Into<String>, store: Arc<dyn ProgressStore>) -> Self {
        Self::with_categories(
            user,
            store,
            CORE_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        )
    }

    /// Planner tracking `categories` instead of the core list
    pub fn with_categories(
        user: impl Into<String>,
        store: Arc<dyn ProgressStore>,
        categories: Vec<String>,
    ) -> Self {
        Self {
            user: user.into(),
            store,
            categories,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Tracked categories, then any other recorded category by name; each with its accuracy
    fn ranked_scores(&self) -> Result<Vec<CategoryScore>> {
        let recorded: BTreeMap<String, CategoryScore> = self
            .store
            .category_scores(&self.user)?
            .into_iter()
            .map(|score| (score.category.clone(), score))
            .collect();

        let mut scores: Vec<CategoryScore> = self
            .categories
            .iter()
            .map(|c| recorded.get(c).cloned().unwrap_or_else(|| CategoryScore::new(c.clone())))
            .collect();
        scores.extend(
            recorded
                .values()
                .filter(|s| !self.categories.contains(&s.category))
                .cloned(),
        );
        Ok(scores)
    }

    /// The three weakest categories, weakest first; ties keep candidate order
    pub fn weak_categories(&self) -> Result<Vec<String>> {
        let mut scores = self.ranked_scores()?;
        scores.sort_by_key(|s| s.accuracy());
        Ok(scores
            .into_iter()
            .take(WEAK_CATEGORY_COUNT)
            .map(|s| s.category)
            .collect())
    }

    /// Plan up to `target_size` distinct questions from `pool`
    pub fn generate_session<R: Rng + ?Sized>(
        &self,
        pool: &QuestionPool,
        target_size: usize,
        rng: &mut R,
    ) -> Result<SessionPlan> {
        let weak = self.weak_categories()?;
        let weak_count = target_size * 7 / 10;
        let review_count = target_size - weak_count;

        let review: Vec<String> = self
            .categories
            .iter()
            .filter(|c| !weak.contains(c))
            .cloned()
            .collect();

        let mut picker = UniquePicker::new(pool);
        let mut questions = picker.pick(&weak, weak_count, rng);
        questions.extend(picker.pick(&review, review_count, rng));

        if questions.len() < target_size {
            let shortfall = target_size - questions.len();
            questions.extend(picker.pick(&self.categories, shortfall, rng));
        }

        questions.shuffle(rng);
        questions.truncate(target_size);

        log::debug!(
            "Session for {}: {} of {} requested, weak areas {:?}",
            self.user,
            questions.len(),
            target_size,
            weak
        );
        Ok(SessionPlan { questions })
    }

    /// Record one graded attempt in `category`
    pub fn update_progress(&self, category: &str, correct: bool) -> Result<CategoryScore> {
        self.store
            .increment_progress(&self.user, category, correct, Utc::now())
    }

    pub fn progress_summary(&self) -> Result<ProgressSummary> {
        let scores = self.ranked_scores()?;

        let total_attempted: u32 = scores.iter().map(|s| s.attempted).sum();
        let total_correct: u32 = scores.iter().map(|s| s.correct).sum();

        let category_progress: BTreeMap<String, CategoryProgress> = scores
            .iter()
            .map(|s| (s.category.clone(), CategoryProgress::from(s)))
            .collect();

        let weak_areas = self.weak_categories()?;
        let recommendations = weak_areas
            .iter()
            .take(RECOMMENDATION_COUNT)
            .map(|c| {
                let accuracy = category_progress.get(c).map(|p| p.accuracy).unwrap_or(0);
                recommendation(c, accuracy)
            })
            .collect();

        Ok(ProgressSummary {
            overall_accuracy: percentage(total_correct, total_attempted),
            total_attempted,
            total_correct,
            category_progress,
            weak_areas,
            recommendations,
        })
    }
}

/// Draws questions without repeats across calls
struct UniquePicker<'a> {
    remaining: BTreeMap<&'a str, Vec<&'a Question>>,
    used: HashSet<&'a str>,
}

impl<'a> UniquePicker<'a> {
    fn new(pool: &'a QuestionPool) -> Self {
        Self {
            remaining: pool
                .iter()
                .map(|(category, questions)| (category.as_str(), questions.iter().collect()))
                .collect(),
            used: HashSet::new(),
        }
    }

    /// Choose a category uniformly among those with unused questions, then a question uniformly
    fn pick<R: Rng + ?Sized>(
        &mut self,
        categories: &[String],
        count: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        let mut picks = Vec::new();
        let mut available: Vec<&str> = categories
            .iter()
            .map(String::as_str)
            .filter(|c| self.remaining.get(c).map_or(false, |qs| !qs.is_empty()))
            .collect();

        while picks.len() < count && !available.is_empty() {
            let slot = rng.gen_range(0..available.len());
            let category = available[slot];

            let Some(questions) = self.remaining.get_mut(category) else {
                available.remove(slot);
                continue;
            };

            let candidates: Vec<usize> = questions
                .iter()
                .enumerate()
                .filter(|(_, q)| !self.used.contains(q.id.as_str()))
                .map(|(i, _)| i)
                .collect();

            if candidates.is_empty() {
                available.remove(slot);
                continue;
            }

            let chosen = candidates[rng.gen_range(0..candidates.len())];
            let question = questions.remove(chosen);
            self.used.insert(question.id.as_str());
            picks.push(question.clone());

            if questions.is_empty() {
                available.remove(slot);
            }
        }

        picks
    }
}

/// "memory_management" -> "Memory Management"
pub fn display_name(category: &str) -> String {
    category
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn recommendation(category: &str, accuracy: u32) -> String {
    let name = display_name(category);
    if accuracy == 0 {
        format!("Start practicing {} (not yet attempted)", name)
    } else if accuracy < 50 {
        format!("Focus on {} (current: {}%)", name, accuracy)
    } else {
        format!("Improve {} (current: {}%)", name, accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::progress::MemoryProgressStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(sizes: &[(&str, usize)]) -> QuestionPool {
        sizes.iter()
            .map(|(category, n)| {
                let questions = (0..*n)
                    .map(|i| Question {
                        id: format!("{}-{}", category, i),
                        category: category.to_string(),
                        ..Default::default()
                    })
                    .collect();
                (category.to_string(), questions)
            })
            .collect()
    }

    fn seeded_store(scores: &[(&str, u32, u32)]) -> Arc<MemoryProgressStore> {
        let store = Arc::new(MemoryProgressStore::new());
        for (category, attempted, correct) in scores {
            store
                .set_score(
                    "ana",
                    CategoryScore {
                        attempted: *attempted,
                        correct: *correct,
                        ..CategoryScore::new(*category)
                    },
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_weak_categories_stable_order() {
        let store = seeded_store(&[("strings", 10, 9), ("pointers", 10, 2)]);
        let planner = AdaptiveSessionPlanner::new("ana", store);
        assert_eq!(
            planner.weak_categories().unwrap(),
            vec!["memory_management", "integer_division", "structs"]
        );
    }

    #[test]
    fn test_extra_recorded_categories_are_candidates() {
        let store = seeded_store(&[("a", 1, 1), ("b", 1, 1), ("file_io", 4, 1)]);
        let planner = AdaptiveSessionPlanner::with_categories(
            "ana",
            store,
            vec!["a".to_string(), "b".to_string()],
        );
        assert_eq!(planner.weak_categories().unwrap(), vec!["file_io", "a", "b"]);
    }

    #[test]
    fn test_session_never_repeats_and_respects_size() {
        let store = seeded_store(&[]);
        let planner = AdaptiveSessionPlanner::new("ana", store);
        let pool = pool(&[("memory_management", 2), ("strings", 1), ("recursion", 30)]);
        let mut rng = StdRng::seed_from_u64(42);

        let plan = planner.generate_session(&pool, 10, &mut rng).unwrap();
        assert_eq!(plan.len(), 10);
        let ids: HashSet<_> = plan.ids().into_iter().collect();
        assert_eq!(ids.len(), 10);

        let plan = planner.generate_session(&pool, 0, &mut rng).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_small_pool_returns_everything_once() {
        let planner = AdaptiveSessionPlanner::new("ana", seeded_store(&[]));
        let pool = pool(&[("strings", 2), ("pointers", 1)]);
        let mut rng = StdRng::seed_from_u64(1);

        let plan = planner.generate_session(&pool, 10, &mut rng).unwrap();
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_duplicate_ids_across_categories_used_once() {
        let planner = AdaptiveSessionPlanner::new("ana", seeded_store(&[]));
        let mut pool = pool(&[("strings", 1)]);
        pool.insert(
            "pointers".to_string(),
            vec![Question {
                id: "strings-0".to_string(),
                category: "pointers".to_string(),
                ..Default::default()
            }],
        );
        let mut rng = StdRng::seed_from_u64(3);
        let plan = planner.generate_session(&pool, 5, &mut rng).unwrap();
        assert_eq!(plan.ids(), vec!["strings-0".to_string()]);
    }

    #[test]
    fn test_seeded_sessions_reproducible() {
        let planner = AdaptiveSessionPlanner::new("ana", seeded_store(&[("strings", 4, 1)]));
        let pool = pool(&[("strings", 8), ("pointers", 8), ("recursion", 8), ("structs", 8)]);

        let a = planner
            .generate_session(&pool, 6, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = planner
            .generate_session(&pool, 6, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn test_progress_summary() {
        let store = seeded_store(&[]);
        let planner = AdaptiveSessionPlanner::new("ana", store);
        planner.update_progress("strings", true).unwrap();
        planner.update_progress("strings", false).unwrap();
        planner.update_progress("strings", false).unwrap();
        planner.update_progress("pointers", true).unwrap();

        let summary = planner.progress_summary().unwrap();
        assert_eq!(summary.total_attempted, 4);
        assert_eq!(summary.total_correct, 2);
        assert_eq!(summary.overall_accuracy, 50);
        assert_eq!(summary.category_progress.len(), CORE_CATEGORIES.len());
        assert_eq!(summary.category_progress["strings"].accuracy, 33);
        assert!(summary.category_progress["recursion"].last_practiced.is_none());
        assert_eq!(summary.recommendations.len(), 2);
        assert_eq!(
            summary.recommendations[0],
            "Start practicing Memory Management (not yet attempted)"
        );
    }

    #[test]
    fn test_recommendation_wording() {
        assert_eq!(recommendation("strings", 33), "Focus on Strings (current: 33%)");
        assert_eq!(
            recommendation("control_flow", 75),
            "Improve Control Flow (current: 75%)"
        );
        assert_eq!(display_name("integer_division"), "Integer Division");
    }
}
