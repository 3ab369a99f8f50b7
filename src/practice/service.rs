use crate::bank::question::Question;
use crate::bank::repository::{random_questions, QuestionRepository};
use crate::config::types::{ExecutionOutcome, Result, TrainerError};
use crate::core::sandbox::CodeRunner;
use crate::grading::engine::GradingEngine;
use crate::planner::progress::{practice_stats, AttemptRecord, PracticeStats, ProgressStore};
use crate::planner::session::{AdaptiveSessionPlanner, SessionPlan};
use crate::practice::wire::{GradeRequest, GradeResponse, RunRequest};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const MIN_SESSION_SIZE: usize = 1;
pub const MAX_SESSION_SIZE: usize = 50;

/// How a session's questions are chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeMode {
    /// Adaptive planner
    Smart,
    /// Random questions from one category
    Category(String),
    /// Uniform sample over every unique question
    Mixed,
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeMode::Smart => write!(f, "smart"),
            PracticeMode::Category(category) => write!(f, "category:{}", category),
            PracticeMode::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for PracticeMode {
    type Err = TrainerError;

    /// `smart`, `mixed`, or `category:<name>`; anything else is mixed
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "smart" => Ok(PracticeMode::Smart),
            "mixed" => Ok(PracticeMode::Mixed),
            other => match other.strip_prefix("category:") {
                Some(category) if !category.trim().is_empty() => {
                    Ok(PracticeMode::Category(category.trim().to_string()))
                }
                Some(_) => Err(TrainerError::Config(
                    "Please select a category before starting".to_string(),
                )),
                None => {
                    log::debug!("Practice mode '{}' not recognised, using mixed", other);
                    Ok(PracticeMode::Mixed)
                }
            },
        }
    }
}

/// Outcome of a finished session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub total_questions: usize,
    pub answered: usize,
    pub correct_count: usize,
    pub total_time_secs: u64,
    /// Questions whose latest attempt was wrong
    pub incorrect_question_ids: Vec<String>,
}

/// Starts sessions, grades submissions and records the results
pub struct PracticeService {
    repository: Arc<dyn QuestionRepository>,
    engine: GradingEngine,
    store: Arc<dyn ProgressStore>,
}

impl PracticeService {
    pub fn new(
        repository: Arc<dyn QuestionRepository>,
        runner: Arc<dyn CodeRunner>,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self {
            repository,
            engine: GradingEngine::new(runner),
            store,
        }
    }

    pub fn engine(&self) -> &GradingEngine {
        &self.engine
    }

    pub fn planner(&self, user: &str) -> AdaptiveSessionPlanner {
        AdaptiveSessionPlanner::new(user, self.store.clone())
    }

    /// Pick questions for a new session; `requested` is clamped to 1..=50
    pub fn start_session<R: Rng + ?Sized>(
        &self,
        user: &str,
        mode: &PracticeMode,
        requested: usize,
        rng: &mut R,
    ) -> Result<SessionPlan> {
        let count = requested.clamp(MIN_SESSION_SIZE, MAX_SESSION_SIZE);

        let plan = match mode {
            PracticeMode::Smart => {
                let pool = self.repository.load_all();
                self.planner(user).generate_session(&pool, count, rng)?
            }
            PracticeMode::Category(category) => SessionPlan {
                questions: random_questions(self.repository.as_ref(), category, count, rng),
            },
            PracticeMode::Mixed => {
                let pool = self.repository.load_all();
                let mut seen = HashSet::new();
                let unique: Vec<&Question> = pool
                    .values()
                    .flatten()
                    .filter(|q| seen.insert(q.id.as_str()))
                    .collect();
                SessionPlan {
                    questions: unique
                        .choose_multiple(rng, count)
                        .map(|q| (*q).clone())
                        .collect(),
                }
            }
        };

        log::info!(
            "Started {} session for {} with {} questions",
            mode,
            user,
            plan.len()
        );
        Ok(plan)
    }

    /// Grade a submission, record the attempt and update progress
    pub fn submit(
        &self,
        user: &str,
        request: &GradeRequest,
        time_spent_secs: u64,
    ) -> Result<GradeResponse> {
        let question = self
            .repository
            .get_by_id(&request.question_id)
            .ok_or_else(|| TrainerError::QuestionNotFound(request.question_id.clone()))?;

        let result = self.engine.grade(&question, &request.answer)?;

        self.store.record_attempt(AttemptRecord {
            user: user.to_string(),
            question_id: question.id.clone(),
            category: question.category.clone(),
            correct: result.correct,
            time_spent_secs,
            submitted_answer: request.answer.clone(),
            hints_used: request.hints_used,
            timestamp: Utc::now(),
        })?;
        self.planner(user)
            .update_progress(&question.category, result.correct)?;

        Ok(GradeResponse::from(result))
    }

    /// Compile and run arbitrary code outside any question
    pub fn run_code(&self, request: &RunRequest) -> Result<ExecutionOutcome> {
        self.engine.runner().compile_and_run(&request.code, &request.input)
    }

    /// Category breakdown, average time and the recent daily trend for `user`
    pub fn stats(&self, user: &str) -> Result<PracticeStats> {
        let attempts = self.store.attempts(user)?;
        Ok(practice_stats(&attempts, Utc::now().date_naive()))
    }

    /// Totals over the latest attempt of each question in `question_ids`
    pub fn session_summary(&self, user: &str, question_ids: &[String]) -> Result<SessionSummary> {
        let attempts = self.store.attempts(user)?;
        let wanted: HashSet<&str> = question_ids.iter().map(String::as_str).collect();

        let mut seen = HashSet::new();
        let latest: Vec<&AttemptRecord> = attempts
            .iter()
            .filter(|a| wanted.contains(a.question_id.as_str()))
            .filter(|a| seen.insert(a.question_id.as_str()))
            .collect();

        Ok(SessionSummary {
            total_questions: question_ids.len(),
            answered: latest.len(),
            correct_count: latest.iter().filter(|a| a.correct).count(),
            total_time_secs: latest.iter().map(|a| a.time_spent_secs).sum(),
            incorrect_question_ids: latest
                .iter()
                .filter(|a| !a.correct)
                .map(|a| a.question_id.clone())
                .collect(),
        })
    }
}
