use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::process::Command;

use super::result::Status;

/// Parsed checker diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerOutput {
    pub status: Status,
    pub message: String,
}

impl CheckerOutput {
    /// Classifies the checker's diagnostic stream by its leading text.
    ///
    /// - `ok` -> Accepted
    /// - `wrong answer` -> WrongAnswer
    /// - `FAIL` -> Failure
    /// - anything else -> PresentationError
    pub fn parse(output: &str) -> Self {
        let status = if output.starts_with("ok") {
            Status::Accepted
        } else if output.starts_with("wrong answer") {
            Status::WrongAnswer
        } else if output.starts_with("FAIL") {
            Status::Failure
        } else {
            Status::PresentationError
        };
        Self {
            status,
            message: output.trim_end().to_owned(),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            status: Status::Failure,
            message,
        }
    }
}

/// External comparison program, invoked as `checker <input> <output> <answer>`.
#[derive(Debug, Clone)]
pub struct Checker {
    program: PathBuf,
    timeout: Duration,
}

impl Checker {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Never fails: a checker that cannot run is itself a `Failure` verdict.
    pub async fn check(&self, input: &Path, output: &Path, answer: &Path) -> CheckerOutput {
        let fname = input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let run = Command::new(&self.program)
            .args([input, output, answer])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let res = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(out)) => CheckerOutput::parse(&String::from_utf8_lossy(&out.stderr)),
            Ok(Err(e)) => {
                log::error!(
                    "Input {}: cannot run checker '{}': {}",
                    fname,
                    self.program.to_string_lossy(),
                    e
                );
                return CheckerOutput::failure(format!("cannot run checker: {}", e));
            }
            Err(_) => {
                log::error!(
                    "Input {}: checker did not finish within {:?}",
                    fname,
                    self.timeout
                );
                return CheckerOutput::failure(format!(
                    "checker timed out after {:?}",
                    self.timeout
                ));
            }
        };

        if res.status == Status::Failure {
            log::warn!(
                "Input {}: FAIL: maybe the jury solution or the checker are not correct",
                fname
            );
        }
        res
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_leading_text() {
        let cases = [
            ("ok 3 numbers\n", Status::Accepted),
            ("ok", Status::Accepted),
            ("wrong answer: token mismatch at line 3", Status::WrongAnswer),
            ("FAIL answer file is empty", Status::Failure),
            ("wrong output format Unexpected end of file", Status::PresentationError),
            ("", Status::PresentationError),
            (" ok", Status::PresentationError),
            ("fail lowercase is not FAIL", Status::PresentationError),
        ];
        for (text, want) in cases {
            assert_eq!(CheckerOutput::parse(text).status, want, "text={:?}", text);
        }
    }

    #[test]
    fn parse_keeps_message_without_trailing_newline() {
        let out = CheckerOutput::parse("wrong answer: expected 3, found 4\n");
        assert_eq!(out.message, "wrong answer: expected 3, found 4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn check_passes_paths_in_order() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let checker = dir.path().join("checker");
        std::fs::write(
            &checker,
            "#!/bin/sh\necho \"wrong answer: in=$(basename $1) out=$(basename $2) ans=$(basename $3)\" >&2\n",
        )
        .unwrap();
        std::fs::set_permissions(&checker, std::fs::Permissions::from_mode(0o755)).unwrap();

        let out = Checker::new(&checker)
            .check(Path::new("/x/in.txt"), Path::new("/x/out.txt"), Path::new("/x/ans.txt"))
            .await;
        assert_eq!(out.status, Status::WrongAnswer);
        assert_eq!(out.message, "wrong answer: in=in.txt out=out.txt ans=ans.txt");
    }

    #[tokio::test]
    async fn missing_checker_is_failure() {
        let out = Checker::new("/no/such/checker")
            .check(Path::new("in"), Path::new("out"), Path::new("ans"))
            .await;
        assert_eq!(out.status, Status::Failure);
        assert!(out.message.starts_with("cannot run checker"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hanging_checker_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let checker = dir.path().join("checker");
        std::fs::write(&checker, "#!/bin/sh\nexec sleep 5\n").unwrap();
        std::fs::set_permissions(&checker, std::fs::Permissions::from_mode(0o755)).unwrap();

        let out = Checker::new(&checker)
            .timeout(Duration::from_millis(200))
            .check(Path::new("in"), Path::new("out"), Path::new("ans"))
            .await;
        assert_eq!(out.status, Status::Failure);
    }
}
