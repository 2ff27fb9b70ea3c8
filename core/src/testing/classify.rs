//! Pure mapping from execution signals to a [`Status`].

use std::{process::ExitStatus, time::Duration};

use super::{result::Status, watchdog::MemoryReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    /// Killed by a signal (including the watchdog's SIGKILL).
    Signaled,
    /// Still running at the hard cutoff and killed by the runner.
    HardTimeout,
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Termination::Exited(code),
            None => Termination::Signaled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub termination: Termination,
    pub stderr_empty: bool,
    pub elapsed: Duration,
    pub memory: MemoryReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Final(Status),
    /// The process looked healthy; the checker decides.
    NeedsChecker,
}

pub fn classify_execution(
    exec: &Execution,
    time_limit: Duration,
    memory_ceiling: u64,
) -> Classification {
    if exec.memory.killed || exec.memory.peak > memory_ceiling {
        return Classification::Final(if exec.elapsed > time_limit {
            Status::TimeAndMemoryExceeded
        } else {
            Status::MemoryLimitExceeded
        });
    }
    match exec.termination {
        Termination::HardTimeout => Classification::Final(Status::HardTimeLimitExceeded),
        Termination::Exited(0) if exec.stderr_empty => Classification::NeedsChecker,
        Termination::Exited(_) | Termination::Signaled => {
            Classification::Final(Status::RuntimeError)
        }
    }
}

/// Folds the soft time limit into the checker's verdict.
pub fn apply_checker_verdict(checker: Status, elapsed: Duration, time_limit: Duration) -> Status {
    if checker == Status::Accepted && elapsed > time_limit {
        Status::SoftTimeLimitExceeded
    } else {
        checker
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TL: Duration = Duration::from_secs(1);
    const ML: u64 = 64 << 20;

    fn exec(termination: Termination, stderr_empty: bool, elapsed_ms: u64, peak: u64) -> Execution {
        Execution {
            termination,
            stderr_empty,
            elapsed: Duration::from_millis(elapsed_ms),
            memory: MemoryReport {
                peak,
                killed: false,
            },
        }
    }

    #[test]
    fn clean_exit_goes_to_checker() {
        let e = exec(Termination::Exited(0), true, 500, 1 << 20);
        assert_eq!(classify_execution(&e, TL, ML), Classification::NeedsChecker);

        // Slow but clean still asks the checker; the soft limit applies afterwards.
        let e = exec(Termination::Exited(0), true, 1800, 1 << 20);
        assert_eq!(classify_execution(&e, TL, ML), Classification::NeedsChecker);
    }

    #[test]
    fn abnormal_exit_is_runtime_error() {
        let re = Classification::Final(Status::RuntimeError);
        let e = exec(Termination::Exited(1), true, 10, 0);
        assert_eq!(classify_execution(&e, TL, ML), re);
        let e = exec(Termination::Exited(-1), true, 10, 0);
        assert_eq!(classify_execution(&e, TL, ML), re);
        let e = exec(Termination::Signaled, true, 10, 0);
        assert_eq!(classify_execution(&e, TL, ML), re);
        let e = exec(Termination::Exited(0), false, 10, 0);
        assert_eq!(classify_execution(&e, TL, ML), re);
    }

    #[test]
    fn hard_timeout() {
        let e = exec(Termination::HardTimeout, true, 2000, 1 << 20);
        assert_eq!(
            classify_execution(&e, TL, ML),
            Classification::Final(Status::HardTimeLimitExceeded)
        );
    }

    #[test]
    fn memory_overrides_everything_else() {
        let mut e = exec(Termination::Signaled, true, 300, 200 << 20);
        assert_eq!(
            classify_execution(&e, TL, ML),
            Classification::Final(Status::MemoryLimitExceeded)
        );

        e.memory.peak = 10 << 20;
        e.memory.killed = true;
        assert_eq!(
            classify_execution(&e, TL, ML),
            Classification::Final(Status::MemoryLimitExceeded)
        );

        let e = exec(Termination::HardTimeout, true, 2000, 65 << 20);
        assert_eq!(
            classify_execution(&e, TL, ML),
            Classification::Final(Status::TimeAndMemoryExceeded)
        );

        let e = exec(Termination::Exited(0), true, 1500, 65 << 20);
        assert_eq!(
            classify_execution(&e, TL, ML),
            Classification::Final(Status::TimeAndMemoryExceeded)
        );
    }

    #[test]
    fn peak_equal_to_ceiling_is_fine() {
        let e = exec(Termination::Exited(0), true, 10, ML);
        assert_eq!(classify_execution(&e, TL, ML), Classification::NeedsChecker);
    }

    #[test]
    fn soft_time_limit_only_upgrades_accepted() {
        let slow = Duration::from_millis(1800);
        let fast = Duration::from_millis(500);
        assert_eq!(
            apply_checker_verdict(Status::Accepted, slow, TL),
            Status::SoftTimeLimitExceeded
        );
        assert_eq!(apply_checker_verdict(Status::Accepted, fast, TL), Status::Accepted);
        assert_eq!(apply_checker_verdict(Status::Accepted, TL, TL), Status::Accepted);
        assert_eq!(
            apply_checker_verdict(Status::WrongAnswer, slow, TL),
            Status::WrongAnswer
        );
        assert_eq!(
            apply_checker_verdict(Status::PresentationError, slow, TL),
            Status::PresentationError
        );
    }
}
