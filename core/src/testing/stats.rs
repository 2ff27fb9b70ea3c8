use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use once_cell::sync::Lazy;
use serde::Serialize;

use super::{
    problem::{ExpectedResult, Solution},
    result::{Status, Test},
};
use crate::serdable::duration_secs;

/// Whether a solution behaved as its declared category says it should.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Wrong,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistic {
    pub ac_count: usize,
    #[serde(serialize_with = "duration_secs::serialize")]
    pub max_exec_time: Duration,
    /// Bytes, clamped to the problem's memory limit.
    pub max_memory_usage: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub statistic: Statistic,
    pub frequencies: BTreeMap<Status, usize>,
    pub verdict: Verdict,
}

static ACCEPTED_STATUSES: Lazy<BTreeMap<ExpectedResult, BTreeSet<Status>>> = Lazy::new(|| {
    use super::result::Status::*;
    use ExpectedResult as E;
    maplit::btreemap! {
        E::MainAc => maplit::btreeset! { Accepted },
        E::AlternativeAc => maplit::btreeset! { Accepted },
        E::WrongAnswer => maplit::btreeset! { WrongAnswer },
        E::TimeLimit => maplit::btreeset! { HardTimeLimitExceeded, SoftTimeLimitExceeded },
        E::TimeLimitOrAc => maplit::btreeset! {
            Accepted, SoftTimeLimitExceeded, HardTimeLimitExceeded
        },
        E::TimeLimitOrMemoryLimit => maplit::btreeset! {
            SoftTimeLimitExceeded, HardTimeLimitExceeded, MemoryLimitExceeded
        },
        E::RuntimeError => maplit::btreeset! { RuntimeError },
        E::MemoryLimit => maplit::btreeset! { MemoryLimitExceeded },
        E::PresentationError => maplit::btreeset! { PresentationError },
    }
});

/// Statuses that count as expected behavior for `category`.
pub fn accepted_statuses(category: ExpectedResult) -> &'static BTreeSet<Status> {
    &ACCEPTED_STATUSES[&category]
}

/// Correct iff every non-AC status is expected and at least one expected status shows up.
pub fn derive_verdict<'a>(
    category: ExpectedResult,
    statuses: impl IntoIterator<Item = &'a Status>,
) -> Verdict {
    let expected = accepted_statuses(category);
    let mut any_expected = false;
    for status in statuses {
        if expected.contains(status) {
            any_expected = true;
        } else if *status != Status::Accepted {
            return Verdict::Wrong;
        }
    }
    if any_expected {
        Verdict::Correct
    } else {
        Verdict::Wrong
    }
}

pub fn summarize<'a>(
    category: ExpectedResult,
    tests: impl IntoIterator<Item = &'a Test>,
    memory_limit: u64,
) -> Summary {
    let mut statistic = Statistic::default();
    let mut frequencies = BTreeMap::new();
    for t in tests {
        *frequencies.entry(t.status).or_insert(0) += 1;
        if t.status == Status::Accepted {
            statistic.ac_count += 1;
        }
        statistic.max_exec_time = statistic.max_exec_time.max(t.exec_time);
        statistic.max_memory_usage = statistic.max_memory_usage.max(t.memory_usage);
    }
    statistic.max_memory_usage = statistic.max_memory_usage.min(memory_limit);

    let verdict = derive_verdict(category, frequencies.keys());
    Summary {
        statistic,
        frequencies,
        verdict,
    }
}

/// Stores the batch results on the solution and computes its summary.
pub fn aggregate(
    solution: &mut Solution,
    tests: BTreeMap<usize, Test>,
    memory_limit: u64,
) -> &Summary {
    let summary = summarize(solution.expected, tests.values(), memory_limit);
    solution.tests = tests;
    solution.summary.insert(summary)
}
