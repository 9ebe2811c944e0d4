use std::collections::BTreeMap;

use crate::model::config::Parsed;

/// Shown when the guide has no entry for the current page.
pub const DEFAULT_INSTRUCTION: &str = "Follow the scenario for this page.";

/// Composite guide key, both parts 1-based as typed by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuideKey {
    pub task: u32,
    pub page: u32,
}

impl GuideKey {
    #[must_use]
    pub fn new(task: u32, page: u32) -> Self {
        Self { task, page }
    }

    /// Parses `"<task>-<page>"`; both parts must be positive integers.
    fn parse(raw: &str) -> Option<Self> {
        let (task, page) = raw.split_once('-')?;
        let task: u32 = task.trim().parse().ok()?;
        let page: u32 = page.trim().parse().ok()?;
        (task > 0 && page > 0).then_some(Self { task, page })
    }
}

/// Per-page instructions read out to the respondent.
///
/// Display-only; the tracker never consults it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioGuide {
    entries: BTreeMap<GuideKey, String>,
}

impl ScenarioGuide {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one `"<task>-<page> : <instruction>"` entry per line.
    ///
    /// Lines without a colon are skipped. Lines with a colon whose key or
    /// instruction is unusable are skipped and reported in `ignored`.
    /// A repeated key keeps the last instruction.
    #[must_use]
    pub fn parse(text: &str) -> Parsed<Self> {
        let mut guide = Self::new();
        let mut ignored = Vec::new();

        for line in text.lines().map(str::trim) {
            let Some((key, instruction)) = line.split_once(':') else {
                continue;
            };
            let instruction = instruction.trim();
            match GuideKey::parse(key) {
                Some(key) if !instruction.is_empty() => guide.insert(key, instruction),
                _ => ignored.push(line.to_owned()),
            }
        }

        Parsed {
            value: guide,
            ignored,
        }
    }

    pub fn insert(&mut self, key: GuideKey, instruction: impl Into<String>) {
        self.entries.insert(key, instruction.into());
    }

    #[must_use]
    pub fn get(&self, key: GuideKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    /// Instruction for a 0-based task index and 1-based page index.
    #[must_use]
    pub fn instruction(&self, task_index: usize, page_index: u32) -> &str {
        u32::try_from(task_index + 1)
            .ok()
            .and_then(|task| self.get(GuideKey::new(task, page_index)))
            .unwrap_or(DEFAULT_INSTRUCTION)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
