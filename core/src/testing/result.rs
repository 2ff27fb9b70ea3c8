use std::time::Duration;

use serde::Serialize;

use crate::serdable::duration_secs;

/// Outcome classification of a single test execution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Status {
    #[strum(serialize = "AC")]
    #[serde(rename = "AC")]
    Accepted,
    #[strum(serialize = "WA")]
    #[serde(rename = "WA")]
    WrongAnswer,
    #[strum(serialize = "RE")]
    #[serde(rename = "RE")]
    RuntimeError,
    #[strum(serialize = "MLE")]
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,
    #[strum(serialize = "TLE")]
    #[serde(rename = "TLE")]
    HardTimeLimitExceeded,
    /// Passed the checker, but slower than the declared limit.
    #[strum(serialize = "STLE")]
    #[serde(rename = "STLE")]
    SoftTimeLimitExceeded,
    #[strum(serialize = "PE")]
    #[serde(rename = "PE")]
    PresentationError,
    #[strum(serialize = "TMLE")]
    #[serde(rename = "TMLE")]
    TimeAndMemoryExceeded,
    /// The checker (or the jury answer) is suspect.
    #[strum(serialize = "FAIL")]
    #[serde(rename = "FAIL")]
    Failure,
}

impl Status {
    pub fn description(self) -> &'static str {
        use Status::*;
        match self {
            Accepted => "Accepted",
            WrongAnswer => "Wrong answer",
            RuntimeError => "Runtime error",
            MemoryLimitExceeded => "Memory limit exceeded",
            HardTimeLimitExceeded => "Time limit exceeded",
            SoftTimeLimitExceeded => "Time limit exceeded (soft: passed the checker)",
            PresentationError => "Presentation error",
            TimeAndMemoryExceeded => "Time and memory limits exceeded",
            Failure => "Checker failure",
        }
    }
}

/// Result of running one solution on one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Test {
    pub index: usize,
    pub name: String,
    #[serde(serialize_with = "duration_secs::serialize")]
    pub exec_time: Duration,
    /// Peak resident memory in bytes.
    pub memory_usage: u64,
    pub status: Status,
    /// The checker's message, or the solution's stderr when the checker was skipped.
    pub diagnostic: Option<String>,
}

impl Test {
    pub fn failure(
        index: usize,
        name: impl Into<String>,
        exec_time: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            exec_time,
            memory_usage: 0,
            status: Status::Failure,
            diagnostic: Some(reason.into()),
        }
    }
}
