use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors raised while building a run configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("enter at least one page count, e.g. \"3, 3, 5\"")]
    Empty,

    #[error("task {task} must have at least one page, got {value}")]
    NonPositive { task: usize, value: i64 },

    #[error("page count is too large: {raw}")]
    TooLarge { raw: String },
}

//
// ─── PARSED INPUT ─────────────────────────────────────────────────────────────
//

/// Result of parsing free-text operator input.
///
/// `ignored` keeps the fragments that were dropped so the caller can show them
/// instead of coercing silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub value: T,
    pub ignored: Vec<String>,
}

impl<T> Parsed<T> {
    #[must_use]
    pub fn has_ignored(&self) -> bool {
        !self.ignored.is_empty()
    }
}

//
// ─── RUN CONFIG ───────────────────────────────────────────────────────────────
//

/// Page counts per task, in task order.
///
/// Always non-empty and every entry is at least one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pages: Vec<u32>,
}

impl RunConfig {
    /// Build a configuration from raw page counts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Empty` when no counts are given,
    /// `ConfigError::NonPositive` for zero or negative counts and
    /// `ConfigError::TooLarge` for counts that do not fit in `u32`.
    pub fn new<I>(counts: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut pages = Vec::new();
        for (idx, value) in counts.into_iter().enumerate() {
            if value <= 0 {
                return Err(ConfigError::NonPositive {
                    task: idx + 1,
                    value,
                });
            }
            let count = u32::try_from(value).map_err(|_| ConfigError::TooLarge {
                raw: value.to_string(),
            })?;
            pages.push(count);
        }

        if pages.is_empty() {
            return Err(ConfigError::Empty);
        }

        Ok(Self { pages })
    }

    /// Parse comma-separated page counts such as `"3, 3, 4, 3, 5"`.
    ///
    /// Tokens that are not plain digits are dropped and reported in
    /// `Parsed::ignored`. Blank tokens (e.g. a trailing comma) are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if nothing usable remains, or if a digit token is
    /// zero or too large.
    pub fn parse(text: &str) -> Result<Parsed<Self>, ConfigError> {
        let mut counts = Vec::new();
        let mut ignored = Vec::new();

        for token in text.split(',').map(str::trim) {
            if token.is_empty() {
                continue;
            }
            if !token.bytes().all(|b| b.is_ascii_digit()) {
                ignored.push(token.to_owned());
                continue;
            }
            let value: i64 = token.parse().map_err(|_| ConfigError::TooLarge {
                raw: token.to_owned(),
            })?;
            counts.push(value);
        }

        Ok(Parsed {
            value: Self::new(counts)?,
            ignored,
        })
    }

    #[must_use]
    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.pages.len()
    }

    /// Page count for a 0-based task index.
    #[must_use]
    pub fn pages_in_task(&self, task_index: usize) -> Option<u32> {
        self.pages.get(task_index).copied()
    }

    /// Number of steps a complete run records.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.pages.iter().map(|&p| u64::from(p)).sum()
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, pages) in self.pages.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{pages}")?;
        }
        Ok(())
    }
}
