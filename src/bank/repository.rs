/// Read-only question bank backed by `<dir>/<category>.json` files
use crate::bank::question::Question;
use crate::bank::BANK_CATEGORIES;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Questions grouped by category, in file order within a category
pub type QuestionPool = BTreeMap<String, Vec<Question>>;

/// Source of questions consumed by the planner and the practice service
pub trait QuestionRepository: Send + Sync {
    /// Every category with its questions
    fn load_all(&self) -> Arc<QuestionPool>;

    /// Look a question up by its id across all categories
    fn get_by_id(&self, id: &str) -> Option<Question> {
        self.load_all()
            .values()
            .flat_map(|questions| questions.iter())
            .find(|q| q.id == id)
            .cloned()
    }

    /// Questions of one category (empty when unknown)
    fn load_category(&self, name: &str) -> Vec<Question> {
        self.load_all().get(name).cloned().unwrap_or_default()
    }
}

/// Up to `count` distinct questions of `category`, sampled without replacement
pub fn random_questions<R: Rng + ?Sized>(
    repository: &dyn QuestionRepository,
    category: &str,
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    let mut seen = HashSet::new();
    let unique: Vec<Question> = repository
        .load_category(category)
        .into_iter()
        .filter(|q| seen.insert(q.id.clone()))
        .collect();

    unique.choose_multiple(rng, count).cloned().collect()
}

/// Explicit cache of the parsed pool, owned by the repository
#[derive(Debug, Default)]
pub struct QuestionCache {
    pool: RwLock<Option<Arc<QuestionPool>>>,
}

impl QuestionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<QuestionPool>> {
        match self.pool.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn store(&self, pool: Arc<QuestionPool>) {
        match self.pool.write() {
            Ok(mut guard) => *guard = Some(pool),
            Err(poisoned) => *poisoned.into_inner() = Some(pool),
        }
    }

    pub fn invalidate(&self) {
        match self.pool.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

/// One category file as seen by `verify`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BankFileReport {
    pub category: String,
    pub path: PathBuf,
    pub present: bool,
    pub question_count: usize,
    pub issues: Vec<String>,
}

/// Bank health report
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BankReport {
    pub files: Vec<BankFileReport>,
    /// Ids used by more than one question
    pub duplicate_ids: Vec<String>,
}

impl BankReport {
    pub fn total_questions(&self) -> usize {
        self.files.iter().map(|f| f.question_count).sum()
    }

    /// Every file present and parsed without issues, ids unique
    pub fn is_clean(&self) -> bool {
        self.duplicate_ids.is_empty() && self.files.iter().all(|f| f.present && f.issues.is_empty())
    }
}

/// Result of parsing one category file
struct ParsedFile {
    present: bool,
    questions: Vec<Question>,
    issues: Vec<String>,
}

/// File-backed bank; the parsed pool is cached until `invalidate` or `reload`
pub struct FileQuestionRepository {
    dir: PathBuf,
    categories: Vec<String>,
    cache: QuestionCache,
}

impl FileQuestionRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_categories(dir, BANK_CATEGORIES.iter().map(|c| c.to_string()).collect())
    }

    pub fn with_categories(dir: impl Into<PathBuf>, categories: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            categories,
            cache: QuestionCache::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn cache(&self) -> &QuestionCache {
        &self.cache
    }

    /// Drop the cached pool; the next `load_all` reads the files again
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Re-read every file and replace the cached pool
    pub fn reload(&self) -> Arc<QuestionPool> {
        let pool = Arc::new(self.read_pool());
        self.cache.store(pool.clone());
        pool
    }

    /// Parse every category file without touching the cache
    pub fn verify(&self) -> BankReport {
        let mut report = BankReport::default();
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();

        for category in &self.categories {
            let path = self.category_path(category);
            let parsed = self.parse_file(category);

            for question in &parsed.questions {
                if !seen.insert(question.id.clone()) && !duplicates.contains(&question.id) {
                    duplicates.push(question.id.clone());
                }
            }

            report.files.push(BankFileReport {
                category: category.clone(),
                path,
                present: parsed.present,
                question_count: parsed.questions.len(),
                issues: parsed.issues,
            });
        }

        duplicates.sort();
        report.duplicate_ids = duplicates;
        report
    }

    fn category_path(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{}.json", category))
    }

    fn read_pool(&self) -> QuestionPool {
        let mut pool = QuestionPool::new();
        for category in &self.categories {
            let parsed = self.parse_file(category);
            for issue in &parsed.issues {
                log::warn!("Question bank {}: {}", category, issue);
            }
            pool.insert(category.clone(), parsed.questions);
        }

        let total: usize = pool.values().map(Vec::len).sum();
        log::info!(
            "Loaded {} questions from {} categories in {}",
            total,
            pool.len(),
            self.dir.display()
        );
        pool
    }

    fn parse_file(&self, category: &str) -> ParsedFile {
        let path = self.category_path(category);
        let mut parsed = ParsedFile {
            present: path.exists(),
            questions: Vec::new(),
            issues: Vec::new(),
        };

        if !parsed.present {
            parsed.issues.push(format!("file {} not found", path.display()));
            return parsed;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                parsed.issues.push(format!("failed to read {}: {}", path.display(), e));
                return parsed;
            }
        };

        let root: Value = match serde_json::from_str(&content) {
            Ok(root) => root,
            Err(e) => {
                parsed.issues.push(format!("invalid JSON in {}: {}", path.display(), e));
                return parsed;
            }
        };

        let entries = match root.get("questions").and_then(Value::as_array) {
            Some(entries) => entries.clone(),
            None => {
                parsed
                    .issues
                    .push(format!("{} has no 'questions' array", path.display()));
                return parsed;
            }
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let mut question: Question = match serde_json::from_value(entry) {
                Ok(q) => q,
                Err(e) => {
                    parsed.issues.push(format!("entry {} skipped: {}", index, e));
                    continue;
                }
            };

            if question.category.is_empty() {
                question.category = category.to_string();
            }

            if let Err(reason) = question.validate() {
                parsed.issues.push(format!("entry {} skipped: {}", index, reason));
                continue;
            }

            parsed.questions.push(question);
        }

        parsed
    }
}

impl QuestionRepository for FileQuestionRepository {
    fn load_all(&self) -> Arc<QuestionPool> {
        match self.cache.get() {
            Some(pool) => pool,
            None => self.reload(),
        }
    }
}

/// Fixed in-memory bank, grouped by each question's `category`
#[derive(Debug, Clone, Default)]
pub struct MemoryQuestionRepository {
    pool: Arc<QuestionPool>,
}

impl MemoryQuestionRepository {
    pub fn new(questions: Vec<Question>) -> Self {
        let mut pool = QuestionPool::new();
        for question in questions {
            pool.entry(question.category.clone()).or_default().push(question);
        }
        Self { pool: Arc::new(pool) }
    }
}

impl QuestionRepository for MemoryQuestionRepository {
    fn load_all(&self) -> Arc<QuestionPool> {
        self.pool.clone()
    }
}
