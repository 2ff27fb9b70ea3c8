use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use super::{launch::Launch, result::Test, stats::Summary};

/// Immutable per-run problem settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub name: String,
    pub problem_dir: PathBuf,
    pub input_dir: PathBuf,
    pub answer_dir: PathBuf,
    pub checker: PathBuf,
    pub time_limit: Duration,
    /// Bytes.
    pub memory_limit: u64,
}

/// Category a solution is declared to fall into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ExpectedResult {
    #[strum(to_string = "main-ac", serialize = "main-accepted")]
    MainAc,
    #[strum(to_string = "alternative-ac", serialize = "alternative-accepted")]
    AlternativeAc,
    WrongAnswer,
    TimeLimit,
    MemoryLimit,
    PresentationError,
    RuntimeError,
    #[strum(to_string = "time-limit-or-ac", serialize = "time-limit-or-accepted")]
    TimeLimitOrAc,
    TimeLimitOrMemoryLimit,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub name: String,
    pub expected: ExpectedResult,
    pub launch: Launch,
    /// Extra bytes granted on top of the problem's memory limit (interpreter/VM footprint).
    pub memory_overhead: u64,
    pub output_dir: PathBuf,
    pub tests: BTreeMap<usize, Test>,
    pub summary: Option<Summary>,
}

impl Solution {
    pub fn new(
        name: impl Into<String>,
        expected: ExpectedResult,
        launch: Launch,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            expected,
            launch,
            memory_overhead: 0,
            output_dir: output_dir.into(),
            tests: BTreeMap::new(),
            summary: None,
        }
    }

    pub fn memory_overhead(mut self, bytes: u64) -> Self {
        self.memory_overhead = bytes;
        self
    }

    /// The ceiling the watchdog enforces for this solution.
    pub fn memory_ceiling(&self, problem: &Problem) -> u64 {
        problem.memory_limit.saturating_add(self.memory_overhead)
    }
}
