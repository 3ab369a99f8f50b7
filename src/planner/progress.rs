/// Per-user progress records and the persistence seam behind them
use crate::config::types::{Result, TrainerError};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Running totals of one user in one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    pub category: String,
    pub attempted: u32,
    pub correct: u32,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl CategoryScore {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            attempted: 0,
            correct: 0,
            last_practiced: None,
        }
    }

    /// Integer percentage, rounded down; 0 when never attempted
    pub fn accuracy(&self) -> u32 {
        percentage(self.correct, self.attempted)
    }
}

pub(crate) fn percentage(correct: u32, attempted: u32) -> u32 {
    if attempted == 0 {
        0
    } else {
        ((correct as u64 * 100) / attempted as u64) as u32
    }
}

/// One graded submission as handed to the persistence layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    pub user: String,
    pub question_id: String,
    pub category: String,
    pub correct: bool,
    pub time_spent_secs: u64,
    pub submitted_answer: String,
    pub hints_used: u32,
    pub timestamp: DateTime<Utc>,
}

/// Persistence collaborator for progress and attempts.
/// Implementations must apply `increment_progress` atomically per (user, category).
pub trait ProgressStore: Send + Sync {
    /// Every category with recorded progress for `user`
    fn category_scores(&self, user: &str) -> Result<Vec<CategoryScore>>;

    /// attempted += 1, correct += 1 when `correct`, last practiced = `at`
    fn increment_progress(
        &self,
        user: &str,
        category: &str,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<CategoryScore>;

    fn record_attempt(&self, attempt: AttemptRecord) -> Result<()>;

    /// Attempts of `user`, newest first
    fn attempts(&self, user: &str) -> Result<Vec<AttemptRecord>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    scores: BTreeMap<(String, String), CategoryScore>,
    attempts: Vec<AttemptRecord>,
}

/// In-process store; one mutex serialises every read-modify-write
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    state: Mutex<MemoryState>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a score directly
    pub fn set_score(&self, user: &str, score: CategoryScore) -> Result<()> {
        let mut state = self.lock()?;
        state
            .scores
            .insert((user.to_string(), score.category.clone()), score);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| TrainerError::Store("progress store lock poisoned".to_string()))
    }
}

impl ProgressStore for MemoryProgressStore {
    fn category_scores(&self, user: &str) -> Result<Vec<CategoryScore>> {
        let state = self.lock()?;
        Ok(state
            .scores
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|(_, score)| score.clone())
            .collect())
    }

    fn increment_progress(
        &self,
        user: &str,
        category: &str,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<CategoryScore> {
        let mut state = self.lock()?;
        let score = state
            .scores
            .entry((user.to_string(), category.to_string()))
            .or_insert_with(|| CategoryScore::new(category));

        score.attempted += 1;
        if correct {
            score.correct += 1;
        }
        score.last_practiced = Some(at);
        Ok(score.clone())
    }

    fn record_attempt(&self, attempt: AttemptRecord) -> Result<()> {
        self.lock()?.attempts.push(attempt);
        Ok(())
    }

    fn attempts(&self, user: &str) -> Result<Vec<AttemptRecord>> {
        let state = self.lock()?;
        let mut attempts: Vec<AttemptRecord> = state
            .attempts
            .iter()
            .filter(|a| a.user == user)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(attempts)
    }
}

/// Consecutive days ending `today` with at least one attempt; 0 without practice today
pub fn practice_streak(attempts: &[AttemptRecord], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = attempts.iter().map(|a| a.timestamp.date_naive()).collect();

    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Days covered by the trend in `PracticeStats`, ending today
pub const TREND_DAYS: u32 = 14;

/// Attempts, accuracy and time in one category
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CategoryBreakdown {
    pub correct: u32,
    pub total: u32,
    pub time_spent_secs: u64,
}

impl CategoryBreakdown {
    pub fn accuracy(&self) -> u32 {
        percentage(self.correct, self.total)
    }
}

/// One day of the trend; `accuracy` is `None` when nothing was attempted
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayTrend {
    pub day: NaiveDate,
    pub attempts: u32,
    pub accuracy: Option<u32>,
}

/// Aggregate view over a user's full attempt history
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PracticeStats {
    pub attempts_count: usize,
    pub total_time_secs: u64,
    pub avg_time_secs: f64,
    /// See `practice_streak`
    pub streak: u32,
    pub categories: BTreeMap<String, CategoryBreakdown>,
    /// Oldest first, last entry is `today`
    pub trend: Vec<DayTrend>,
}

pub fn practice_stats(attempts: &[AttemptRecord], today: NaiveDate) -> PracticeStats {
    let total_time_secs: u64 = attempts.iter().map(|a| a.time_spent_secs).sum();
    let avg_time_secs = if attempts.is_empty() {
        0.0
    } else {
        total_time_secs as f64 / attempts.len() as f64
    };

    let mut categories: BTreeMap<String, CategoryBreakdown> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
    for attempt in attempts {
        let entry = categories.entry(attempt.category.clone()).or_default();
        entry.total += 1;
        entry.time_spent_secs += attempt.time_spent_secs;

        let day = by_day.entry(attempt.timestamp.date_naive()).or_default();
        day.0 += 1;
        if attempt.correct {
            entry.correct += 1;
            day.1 += 1;
        }
    }

    let trend = (0..TREND_DAYS)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back as i64);
            let (total, correct) = by_day.get(&day).copied().unwrap_or_default();
            DayTrend {
                day,
                attempts: total,
                accuracy: (total > 0).then(|| percentage(correct, total)),
            }
        })
        .collect();

    PracticeStats {
        attempts_count: attempts.len(),
        total_time_secs,
        avg_time_secs,
        streak: practice_streak(attempts, today),
        categories,
        trend,
    }
}
