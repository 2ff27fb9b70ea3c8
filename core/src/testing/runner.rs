use std::{io, path::PathBuf, process::Stdio, time::Duration};

use tokio::{io::AsyncReadExt, process::ChildStderr, time::Instant};

use super::{checker::*, classify::*, launch::Launch, result::*, testcase::FsTestcase, watchdog::*};
use crate::error::{JudgeError, Result};

/// Runs one solution on one test case at a time.
///
/// Cloned into every lane of a batch; clones share the watchdog.
#[derive(Debug, Clone)]
pub struct TestRunner {
    launch: Launch,
    output_dir: PathBuf,
    checker: Checker,
    watchdog: WatchdogHandle,
    time_limit: Duration,
    hard_limit: Duration,
    memory_ceiling: u64,
}

const STDERR_CAPTURE_LIMIT: u64 = 64 << 10;

impl TestRunner {
    const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(1000);

    pub fn new(
        launch: Launch,
        output_dir: impl Into<PathBuf>,
        checker: Checker,
        watchdog: WatchdogHandle,
    ) -> Self {
        Self {
            launch,
            output_dir: output_dir.into(),
            checker,
            watchdog,
            time_limit: Self::DEFAULT_TIME_LIMIT,
            hard_limit: Self::DEFAULT_TIME_LIMIT * 2,
            memory_ceiling: u64::MAX,
        }
    }

    /// The soft limit: slower runs that pass the checker become STLE.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// The wall-clock cutoff after which the process is killed.
    pub fn hard_limit(mut self, limit: Duration) -> Self {
        self.hard_limit = limit;
        self
    }

    pub fn memory_ceiling(mut self, bytes: u64) -> Self {
        self.memory_ceiling = bytes;
        self
    }

    pub fn output_path(&self, testcase: &FsTestcase) -> PathBuf {
        self.output_dir.join(&testcase.name)
    }

    /// Only a spawn failure is an `Err`; every other problem becomes a `Failure` test.
    pub async fn run(&self, index: usize, testcase: &FsTestcase) -> Result<Test> {
        let output_path = self.output_path(testcase);
        let streams = fsutil::open(&testcase.input_path)
            .and_then(|input| Ok((input, fsutil::create(&output_path)?)));
        let (input, output) = match streams {
            Ok(v) => v,
            Err(e) => {
                log::error!("Test {}: {}", testcase.name, e);
                return Ok(Test::failure(index, &testcase.name, Duration::ZERO, e.to_string()));
            }
        };

        let start_at = Instant::now();
        let mut child = self
            .launch
            .command()
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(output))
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| JudgeError::Spawn(self.launch.to_string(), e))?;

        let pid = child.id();
        let memory = pid.map(|pid| self.watchdog.track(pid));
        let reaped = |pid: Option<u32>| {
            if let Some(pid) = pid {
                kill_process_group(pid);
                self.watchdog.release(pid);
            }
        };

        let Some(mut stderr) = child.stderr.take() else {
            let _ = child.kill().await;
            reaped(pid);
            let reason = "stderr of the solution was not captured";
            return Ok(Test::failure(index, &testcase.name, start_at.elapsed(), reason));
        };

        let mut stderr_buf = Vec::new();
        let waited = {
            // Descendants left behind by the solution would hold stderr open.
            let wait = async {
                let status = child.wait().await;
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                status
            };
            let fut = async { tokio::join!(read_stderr(&mut stderr, &mut stderr_buf), wait) };
            tokio::time::timeout(self.hard_limit, fut).await
        };

        let termination = match waited {
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                child
                    .kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill TLE process: {:#}", e));
                Termination::HardTimeout
            }
            Ok((Ok(()), Ok(status))) => Termination::from(status),
            Ok((Err(e), _)) | Ok((_, Err(e))) => {
                let _ = child.kill().await;
                reaped(pid);
                log::error!("Test {}: failed to communicate with solution: {}", testcase.name, e);
                return Ok(Test::failure(
                    index,
                    &testcase.name,
                    start_at.elapsed(),
                    format!("failed to communicate with solution: {}", e),
                ));
            }
        };
        let elapsed = start_at.elapsed();
        reaped(pid);

        let memory = match memory {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                log::warn!("Test {}: no memory report from the watchdog", testcase.name);
                MemoryReport::default()
            }),
            None => MemoryReport::default(),
        };

        let exec = Execution {
            termination,
            stderr_empty: stderr_buf.is_empty(),
            elapsed,
            memory,
        };

        let (status, diagnostic) =
            match classify_execution(&exec, self.time_limit, self.memory_ceiling) {
                Classification::Final(status) => {
                    let diag = (!stderr_buf.is_empty())
                        .then(|| String::from_utf8_lossy(&stderr_buf).trim_end().to_owned());
                    (status, diag)
                }
                Classification::NeedsChecker => {
                    let out = self
                        .checker
                        .check(&testcase.input_path, &output_path, &testcase.answer_path)
                        .await;
                    let status = apply_checker_verdict(out.status, elapsed, self.time_limit);
                    (status, Some(out.message))
                }
            };

        log::debug!(
            "Test {}: {} in {}ms, {} KiB",
            testcase.name,
            status,
            elapsed.as_millis(),
            memory.peak >> 10
        );

        Ok(Test {
            index,
            name: testcase.name.clone(),
            exec_time: elapsed,
            memory_usage: memory.peak,
            status,
            diagnostic,
        })
    }
}

/// Keeps enough stderr for a diagnostic and discards the rest so the writer never blocks.
async fn read_stderr(stderr: &mut ChildStderr, buf: &mut Vec<u8>) -> io::Result<()> {
    (&mut *stderr).take(STDERR_CAPTURE_LIMIT).read_to_end(buf).await?;
    tokio::io::copy(stderr, &mut tokio::io::sink()).await?;
    Ok(())
}

fn kill_process_group(pgid: u32) {
    use nix::{
        errno::Errno,
        sys::signal::{killpg, Signal},
        unistd::Pid,
    };
    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::debug!("Failed to kill process group {}: {}", pgid, e),
    }
}
