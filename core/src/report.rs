//! Machine-readable dump of a run, written by `judgebox run --json`.

use std::path::Path;

use serde::Serialize;

use crate::serdable::duration_secs;
use crate::testing::{Problem, Solution, Summary, Test};

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub problem: &'a str,
    #[serde(serialize_with = "duration_secs::serialize")]
    pub time_limit: std::time::Duration,
    /// Bytes.
    pub memory_limit: u64,
    pub solutions: Vec<SolutionReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SolutionReport<'a> {
    pub name: &'a str,
    pub expected: String,
    pub launch: String,
    #[serde(flatten)]
    pub summary: Option<&'a Summary>,
    pub tests: Vec<&'a Test>,
}

impl<'a> Report<'a> {
    pub fn new(problem: &'a Problem, solutions: &'a [Solution]) -> Self {
        Self {
            problem: &problem.name,
            time_limit: problem.time_limit,
            memory_limit: problem.memory_limit,
            solutions: solutions.iter().map(SolutionReport::new).collect(),
        }
    }

    pub fn write_json(&self, filepath: impl AsRef<Path>) -> fsutil::Result<()> {
        fsutil::write_json_with_mkdir(filepath, self)
    }
}

impl<'a> SolutionReport<'a> {
    fn new(solution: &'a Solution) -> Self {
        Self {
            name: &solution.name,
            expected: solution.expected.to_string(),
            launch: solution.launch.to_string(),
            summary: solution.summary.as_ref(),
            tests: solution.tests.values().collect(),
        }
    }
}
