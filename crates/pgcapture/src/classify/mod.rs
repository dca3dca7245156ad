//! Classification of captured statements.
//!
//! [`Classifier::classify`] turns the ordered list recorded by a scope into a
//! [`ClassifiedResult`]: read/write counts, total time, duplicate groups (same
//! interpolated SQL), similar groups (same raw SQL) and slow statements.
//!
//! ```
//! use pgcapture::{CapturedStatement, CaptureConfig, Classifier};
//! use std::time::Duration;
//!
//! let statements: Vec<_> = (0..3)
//!     .map(|_| CapturedStatement::new("SELECT 1", vec![], Duration::from_millis(1)))
//!     .collect();
//!
//! let config = CaptureConfig::default().with_duplicate_min_count(Some(2));
//! let result = Classifier::new(&config)?.classify(&statements);
//! assert_eq!(result.read, 3);
//! assert!(result.has_over_threshold);
//! # Ok::<(), pgcapture::CaptureError>(())
//! ```

use crate::capture::CapturedStatement;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;


/// Reporting thresholds. `None` disables the corresponding check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Statements strictly slower than this many seconds are slow.
    pub slow_min_second: Option<f64>,
    /// Duplicate groups with a count strictly above this are reported.
    pub duplicate_min_count: Option<u64>,
    /// Similar groups with a count strictly above this are reported.
    pub similar_min_count: Option<u64>,
}

impl Thresholds {
    /// All checks disabled.
    pub const DISABLED: Self = Self {
        slow_min_second: None,
        duplicate_min_count: None,
        similar_min_count: None,
    };

    fn is_slow(&self, statement: &CapturedStatement) -> bool {
        self.slow_min_second
            .is_some_and(|limit| statement.duration_secs() > limit)
    }

    fn duplicate_exceeded(&self, count: u64) -> bool {
        self.duplicate_min_count.is_some_and(|limit| count > limit)
    }

    fn similar_exceeded(&self, count: u64) -> bool {
        self.similar_min_count.is_some_and(|limit| count > limit)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        CaptureConfig::default().thresholds()
    }
}

/// Grouping key of a [`StatementCounter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementKey {
    /// Interpolated SQL; equal keys are duplicates.
    Interpolated(String),
    /// Raw SQL with placeholders; equal keys are similar.
    Raw(String),
}

impl StatementKey {
    /// Duplicate key of a statement.
    pub fn duplicate_of(statement: &CapturedStatement) -> Self {
        Self::Interpolated(statement.sql().to_string())
    }

    /// Similar key of a statement.
    pub fn similar_of(statement: &CapturedStatement) -> Self {
        Self::Raw(statement.raw_sql().to_string())
    }

    /// The SQL text of the key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Interpolated(sql) | Self::Raw(sql) => sql,
        }
    }
}

impl fmt::Display for StatementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One group of a [`StatementCounter`]: the first statement seen for the key and how many
/// statements share it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementGroup {
    pub key: StatementKey,
    pub representative: CapturedStatement,
    pub count: u64,
}

/// Counts statements per key, keeping groups in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementCounter {
    groups: Vec<StatementGroup>,
    index: HashMap<StatementKey, usize>,
}

impl StatementCounter {
    fn count_by<'a, I, F>(statements: I, key_of: F) -> Self
    where
        I: IntoIterator<Item = &'a CapturedStatement>,
        F: Fn(&CapturedStatement) -> StatementKey,
    {
        let mut counter = Self::default();
        for statement in statements {
            counter.add(key_of(statement), statement);
        }
        counter
    }

    fn add(&mut self, key: StatementKey, statement: &CapturedStatement) {
        match self.index.get(&key) {
            Some(&pos) => self.groups[pos].count += 1,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(StatementGroup {
                    key,
                    representative: statement.clone(),
                    count: 1,
                });
            }
        }
    }

    fn filtered<F>(&self, keep: F) -> Self
    where
        F: Fn(&StatementGroup) -> bool,
    {
        let mut counter = Self::default();
        for group in self.groups.iter().filter(|g| keep(g)) {
            counter.index.insert(group.key.clone(), counter.groups.len());
            counter.groups.push(group.clone());
        }
        counter
    }

    /// Group for `key`, if any statement produced it.
    pub fn get(&self, key: &StatementKey) -> Option<&StatementGroup> {
        self.index.get(key).map(|&pos| &self.groups[pos])
    }

    /// Count for `key`; zero when absent.
    pub fn count_of(&self, key: &StatementKey) -> u64 {
        self.get(key).map_or(0, |group| group.count)
    }

    /// Groups in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &StatementGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group with the highest count; ties go to the first-seen group.
    pub fn most_common(&self) -> Option<&StatementGroup> {
        self.groups.iter().fold(None, |best, group| match best {
            Some(b) if b.count >= group.count => Some(b),
            _ => Some(group),
        })
    }
}

/// Derived view over the statements captured by one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedResult {
    pub read: usize,
    pub writes: usize,
    pub total: usize,
    /// Exact sum of the durations of the classified statements.
    pub total_duration: Duration,
    pub duplicates_counter: StatementCounter,
    pub duplicates_counter_over_threshold: StatementCounter,
    pub similar_counter: StatementCounter,
    /// Similar groups above threshold, excluding groups whose representative is already a
    /// reported duplicate.
    pub similar_counter_over_threshold: StatementCounter,
    pub most_common_duplicate: Option<StatementGroup>,
    pub most_common_similar: Option<StatementGroup>,
    /// Slow statements in capture order.
    pub slow_captured_queries: Vec<CapturedStatement>,
    pub has_over_threshold: bool,
    /// Every captured statement, including ignored ones.
    pub captured_queries: Vec<CapturedStatement>,
    pub thresholds: Thresholds,
}

impl ClassifiedResult {
    /// `total_duration` in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration.as_secs_f64()
    }
}

/// Classifies captured statements against thresholds and ignore patterns.
#[derive(Debug, Clone)]
pub struct Classifier {
    thresholds: Thresholds,
    ignore_patterns: Vec<Regex>,
}

impl Classifier {
    /// Build a classifier from the configured thresholds and ignore patterns.
    ///
    /// Fails with [`CaptureError::IgnorePattern`] on a malformed pattern.
    pub fn new(config: &CaptureConfig) -> CaptureResult<Self> {
        Self {
            thresholds: config.thresholds(),
            ignore_patterns: Vec::new(),
        }
        .with_ignore_patterns(&config.ignore_sql_patterns)
    }

    /// Replace the ignore patterns.
    pub fn with_ignore_patterns<I, S>(mut self, patterns: I) -> CaptureResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| CaptureError::IgnorePattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<CaptureResult<_>>()?;
        Ok(self)
    }

    /// Replace the thresholds.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Whether `sql` matches none of the ignore patterns.
    pub fn is_allowed(&self, sql: &str) -> bool {
        !self.ignore_patterns.iter().any(|re| re.is_match(sql))
    }

    /// Classify `statements`. Ignored statements only appear in `captured_queries`.
    pub fn classify(&self, statements: &[CapturedStatement]) -> ClassifiedResult {
        let filtered: Vec<&CapturedStatement> = statements
            .iter()
            .filter(|s| self.is_allowed(s.sql()))
            .collect();
        let thresholds = self.thresholds;

        let read = filtered.iter().filter(|s| s.is_read()).count();
        let total = filtered.len();
        let total_duration: Duration = filtered.iter().map(|s| s.duration()).sum();

        let slow_captured_queries: Vec<CapturedStatement> = filtered
            .iter()
            .filter(|s| thresholds.is_slow(s))
            .map(|s| (*s).clone())
            .collect();

        let duplicates_counter =
            StatementCounter::count_by(filtered.iter().copied(), StatementKey::duplicate_of);
        let duplicates_counter_over_threshold =
            duplicates_counter.filtered(|g| thresholds.duplicate_exceeded(g.count));

        let similar_counter =
            StatementCounter::count_by(filtered.iter().copied(), StatementKey::similar_of);
        let similar_counter_over_threshold = similar_counter.filtered(|g| {
            let duplicates =
                duplicates_counter.count_of(&StatementKey::duplicate_of(&g.representative));
            !thresholds.duplicate_exceeded(duplicates) && thresholds.similar_exceeded(g.count)
        });

        let has_over_threshold = !slow_captured_queries.is_empty()
            || !duplicates_counter_over_threshold.is_empty()
            || !similar_counter_over_threshold.is_empty();

        ClassifiedResult {
            read,
            writes: total - read,
            total,
            total_duration,
            most_common_duplicate: duplicates_counter.most_common().cloned(),
            most_common_similar: similar_counter.most_common().cloned(),
            duplicates_counter,
            duplicates_counter_over_threshold,
            similar_counter,
            similar_counter_over_threshold,
            slow_captured_queries,
            has_over_threshold,
            captured_queries: statements.to_vec(),
            thresholds,
        }
    }
}
