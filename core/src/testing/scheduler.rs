use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use tokio::sync::mpsc;

use super::{
    checker::Checker,
    problem::{ExpectedResult, Problem, Solution},
    result::Test,
    runner::TestRunner,
    testcase::FsTestcase,
    watchdog::Watchdog,
};
use crate::error::Result;

/// Knobs shared by every batch of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub workers: usize,
    /// Multiplier applied to the time limit to get the kill deadline.
    pub hard_limit_factor: f64,
    /// Memory sampling period. Shorter catches briefer spikes but costs more `/proc` reads.
    pub poll_interval: Duration,
    pub checker_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            hard_limit_factor: 2.0,
            poll_interval: Duration::from_millis(100),
            checker_timeout: Duration::from_secs(10),
        }
    }
}

impl RunSettings {
    /// Saturates at `Duration::MAX`.
    pub fn hard_limit(&self, time_limit: Duration) -> Duration {
        // `max` also maps NaN to 1.0.
        let secs = time_limit.as_secs_f64() * self.hard_limit_factor.max(1.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Main-ac solutions always run sequentially so their timings are not skewed.
pub fn lane_count(expected: ExpectedResult, workers: usize, n_tests: usize) -> usize {
    if expected == ExpectedResult::MainAc {
        return 1;
    }
    workers.clamp(1, n_tests.max(1))
}

/// Indices handled by `lane`: `lane, lane + lanes, lane + 2 * lanes, ...`
pub fn lane_indices(lane: usize, lanes: usize, n_tests: usize) -> impl Iterator<Item = usize> {
    (lane..n_tests).step_by(lanes.max(1))
}

/// Runs `solution` on every test case and returns exactly one result per index.
///
/// `on_test` sees each result as soon as its lane reports it, in completion order.
/// A spawn failure in any lane is returned after the remaining lanes finish.
pub async fn run_batch(
    problem: &Problem,
    solution: &Solution,
    testcases: &[FsTestcase],
    settings: &RunSettings,
    mut on_test: impl FnMut(&Test),
) -> Result<BTreeMap<usize, Test>> {
    fsutil::mkdir_all(&solution.output_dir)?;

    let n = testcases.len();
    let lanes = lane_count(solution.expected, settings.workers, n);
    let ceiling = solution.memory_ceiling(problem);
    log::debug!(
        "Running '{}' on {} tests with {} lane(s), memory ceiling {} bytes",
        solution.name,
        n,
        lanes,
        ceiling
    );

    let watchdog = Watchdog::spawn(ceiling, settings.poll_interval);
    let checker = Checker::new(&problem.checker).timeout(settings.checker_timeout);
    let runner = TestRunner::new(
        solution.launch.clone(),
        &solution.output_dir,
        checker,
        watchdog.handle(),
    )
    .time_limit(problem.time_limit)
    .hard_limit(settings.hard_limit(problem.time_limit))
    .memory_ceiling(ceiling);

    let run_one = move |i: usize, testcases: Arc<[FsTestcase]>| {
        let runner = runner.clone();
        async move { runner.run(i, &testcases[i]).await }
    };
    let results = drive_lanes(&solution.name, testcases, lanes, run_one, &mut on_test).await;
    watchdog.shutdown().await;
    results
}

/// Spreads `testcases` over `lanes` tasks and collects one result per index.
///
/// Indices left unreported by a panicked lane are filled with `Failure` tests.
async fn drive_lanes<F, Fut>(
    solution_name: &str,
    testcases: &[FsTestcase],
    lanes: usize,
    run_one: F,
    on_test: &mut impl FnMut(&Test),
) -> Result<BTreeMap<usize, Test>>
where
    F: Fn(usize, Arc<[FsTestcase]>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Test>> + Send + 'static,
{
    let run_one = Arc::new(run_one);
    let shared: Arc<[FsTestcase]> = testcases.into();
    let (tx, mut rx) = mpsc::unbounded_channel::<Test>();
    let handles: Vec<_> = (0..lanes)
        .map(|lane| {
            let run_one = Arc::clone(&run_one);
            let testcases = Arc::clone(&shared);
            let tx = tx.clone();
            tokio::spawn(async move {
                for i in lane_indices(lane, lanes, testcases.len()) {
                    let test = run_one(i, Arc::clone(&testcases)).await?;
                    if tx.send(test).is_err() {
                        break;
                    }
                }
                Result::Ok(())
            })
        })
        .collect();
    drop(tx);

    let mut results = BTreeMap::new();
    while let Some(test) = rx.recv().await {
        on_test(&test);
        results.insert(test.index, test);
    }

    let mut fatal = None;
    for (lane, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                fatal.get_or_insert(e);
            }
            Err(e) => log::error!("Lane {} of '{}' aborted: {}", lane, solution_name, e),
        }
    }
    if let Some(e) = fatal {
        return Err(e);
    }

    for (i, testcase) in testcases.iter().enumerate() {
        results.entry(i).or_insert_with(|| {
            let test = Test::failure(
                i,
                &testcase.name,
                Duration::ZERO,
                "lane aborted before running this test",
            );
            on_test(&test);
            test
        });
    }
    Ok(results)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{error::JudgeError, testing::result::Status};

    #[test]
    fn main_ac_runs_in_a_single_lane() {
        assert_eq!(lane_count(ExpectedResult::MainAc, 8, 20), 1);
        assert_eq!(lane_count(ExpectedResult::AlternativeAc, 8, 20), 8);
    }

    #[test]
    fn lane_count_is_clamped() {
        assert_eq!(lane_count(ExpectedResult::WrongAnswer, 8, 3), 3);
        assert_eq!(lane_count(ExpectedResult::WrongAnswer, 0, 3), 1);
        assert_eq!(lane_count(ExpectedResult::WrongAnswer, 4, 0), 1);
    }

    #[test]
    fn lanes_are_strided_and_disjoint() {
        let lanes: Vec<Vec<usize>> = (0..3).map(|k| lane_indices(k, 3, 8).collect()).collect();
        assert_eq!(lanes, vec![vec![0, 3, 6], vec![1, 4, 7], vec![2, 5]]);

        let mut all: Vec<usize> = lanes.into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn hard_limit_scales_time_limit() {
        let tl = Duration::from_millis(1500);
        assert_eq!(RunSettings::default().hard_limit(tl), Duration::from_secs(3));

        let s = RunSettings {
            hard_limit_factor: 0.5,
            ..Default::default()
        };
        assert_eq!(s.hard_limit(tl), tl);
    }

    #[test]
    fn hard_limit_saturates_instead_of_overflowing() {
        let s = RunSettings {
            hard_limit_factor: f64::INFINITY,
            ..Default::default()
        };
        assert_eq!(s.hard_limit(Duration::from_secs(1)), Duration::MAX);
        assert_eq!(RunSettings::default().hard_limit(Duration::MAX), Duration::MAX);
    }

    fn testcases(n: usize) -> Vec<FsTestcase> {
        (0..n)
            .map(|i| FsTestcase::new(i.to_string(), format!("in/{}", i), format!("out/{}", i)))
            .collect()
    }

    fn accepted(i: usize, testcases: &[FsTestcase]) -> Test {
        Test {
            index: i,
            name: testcases[i].name.clone(),
            exec_time: Duration::from_millis(1),
            memory_usage: 0,
            status: Status::Accepted,
            diagnostic: None,
        }
    }

    #[tokio::test]
    async fn panicked_lane_leaves_failures_behind() {
        let tcs = testcases(6);
        // Lane 1 of 2 owns indices 1, 3, 5 and dies on 3.
        let run_one = |i: usize, tcs: Arc<[FsTestcase]>| async move {
            if i == 3 {
                panic!("lane blew up");
            }
            Result::Ok(accepted(i, &tcs))
        };

        let mut seen = Vec::new();
        let results = drive_lanes("sol", &tcs, 2, run_one, &mut |t: &Test| seen.push(t.index))
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        for i in [0, 1, 2, 4] {
            assert_eq!(results[&i].status, Status::Accepted, "test {}", i);
        }
        for i in [3, 5] {
            assert_eq!(results[&i].status, Status::Failure, "test {}", i);
            assert_eq!(results[&i].name, i.to_string());
        }
        seen.sort();
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn lane_error_is_returned_after_siblings_finish() {
        let tcs = testcases(4);
        let finished = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let run_one = move |i: usize, tcs: Arc<[FsTestcase]>| {
            let counter = Arc::clone(&counter);
            async move {
                if i == 0 {
                    return Err(JudgeError::Spawn(
                        "sol".into(),
                        std::io::Error::from(std::io::ErrorKind::NotFound),
                    ));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Result::Ok(accepted(i, &tcs))
            }
        };

        let err = drive_lanes("sol", &tcs, 2, run_one, &mut |_: &Test| {})
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Spawn(..)));
        // Lane 1 runs indices 1 and 3 to completion.
        assert_eq!(finished.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
