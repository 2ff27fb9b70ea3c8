#![allow(dead_code)]

use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use judgebox_core::testing::{ExpectedResult, FsTestcase, Launch, Problem, RunSettings, Solution};
use tempfile::TempDir;

pub fn script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn python3_available() -> bool {
    std::process::Command::new("python3")
        .args(["-c", "pass"])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A problem directory with `input/`, `output/` and a byte-exact checker.
pub struct Fixture {
    pub dir: TempDir,
    pub problem: Problem,
}

impl Fixture {
    /// `tests` are `(name, input, answer)` triples.
    pub fn new(tests: &[(&str, &str, &str)], time_limit: Duration, memory_limit_mb: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_owned();
        for sub in ["input", "output", "bin"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        for (name, input, answer) in tests {
            std::fs::write(root.join("input").join(name), input).unwrap();
            std::fs::write(root.join("output").join(name), answer).unwrap();
        }
        let checker = root.join("bin/checker");
        script(
            &checker,
            r#"if cmp -s "$2" "$3"; then echo "ok accepted" >&2; else echo "wrong answer: output differs" >&2; fi"#,
        );

        let problem = Problem {
            name: "fixture".into(),
            problem_dir: root.clone(),
            input_dir: root.join("input"),
            answer_dir: root.join("output"),
            checker,
            time_limit,
            memory_limit: memory_limit_mb << 20,
        };
        Self { dir, problem }
    }

    /// `n` tests whose answer is the input itself.
    pub fn echo_tests(n: usize, time_limit: Duration) -> Self {
        let data: Vec<(String, String)> = (1..=n)
            .map(|i| (i.to_string(), format!("{}\n", i * 7)))
            .collect();
        let tests: Vec<(&str, &str, &str)> = data
            .iter()
            .map(|(name, body)| (name.as_str(), body.as_str(), body.as_str()))
            .collect();
        Self::new(&tests, time_limit, 256)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn testcases(&self) -> Vec<FsTestcase> {
        FsTestcase::enumerate(&self.problem.input_dir, &self.problem.answer_dir).unwrap()
    }

    /// Writes `body` as a shell solution run through `sh`.
    ///
    /// Exec'ing a freshly written file races with concurrent forks (ETXTBSY).
    pub fn solution(&self, stem: &str, expected: ExpectedResult, body: &str) -> Solution {
        let program = self.root().join("src").join(format!("{}.sh", stem));
        std::fs::create_dir_all(program.parent().unwrap()).unwrap();
        std::fs::write(&program, body).unwrap();
        let launch = Launch::Interpreted {
            interpreter: "sh".into(),
            args: vec![program.to_string_lossy().into_owned()],
        };
        Solution::new(format!("{}.sh", stem), expected, launch, self.output_dir(stem))
    }

    pub fn output_dir(&self, stem: &str) -> PathBuf {
        self.root().join("tmp").join(stem)
    }
}

pub fn settings(workers: usize) -> RunSettings {
    RunSettings {
        workers,
        poll_interval: Duration::from_millis(20),
        ..Default::default()
    }
}
