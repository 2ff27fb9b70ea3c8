pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use error::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;
use crate::error::JudgeError;
use crate::report::Report;
use crate::style;
use crate::testing::{
    aggregate, resolve_launch, run_batch, Checker, CheckerOutput, ExpectedResult, FsTestcase,
    LaunchDirs, Problem, RunSettings, Solution, Status, Verdict,
};

/// Which of the configured solutions to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    MainAc,
    All,
    Named(String),
}

/// Resolves the selected solutions' launches up front so a missing binary
/// aborts before anything runs.
pub fn select_solutions(cfg: &Config, selection: &Selection) -> Result<Vec<Solution>> {
    let entries = cfg.solution_entries()?;
    let selected: Vec<_> = match selection {
        Selection::MainAc => entries
            .into_iter()
            .filter(|(category, _)| *category == ExpectedResult::MainAc)
            .collect(),
        Selection::All => entries,
        Selection::Named(name) => {
            let found: Vec<_> = entries.into_iter().filter(|(_, f)| f == name).collect();
            if found.is_empty() {
                return Err(JudgeError::UnknownSolution(name.to_owned()).into());
            }
            found
        }
    };
    ensure!(
        !selected.is_empty(),
        "No solution to run: add a main-ac entry to [solutions] in {}",
        Config::FILENAME
    );

    let bin_dir = cfg.bin_dir();
    let src_dir = cfg.src_dir();
    let dirs = LaunchDirs {
        bin_dir: &bin_dir,
        src_dir: &src_dir,
    };
    let output_root = cfg.output_root();

    selected
        .into_iter()
        .map(|(category, name)| -> Result<Solution> {
            let (launch, overhead) = resolve_launch(&name, &cfg.launch, dirs)?;
            let output_dir = self::solution_output_dir(&output_root, &name);
            Ok(Solution::new(name, category, launch, output_dir).memory_overhead(overhead))
        })
        .collect()
}

/// `<output_root>/<ext>/<stem>/`
pub fn solution_output_dir(output_root: &Path, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    let ext = path.extension().map(|s| s.to_string_lossy()).unwrap_or_default();
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    output_root.join(ext.as_ref()).join(stem.as_ref())
}

pub fn ensure_checker_exists(problem: &Problem) -> Result<()> {
    if !problem.checker.is_file() {
        return Err(JudgeError::MissingFile("checker", problem.checker.clone()).into());
    }
    Ok(())
}

pub fn list_testcases(problem: &Problem) -> Result<Vec<FsTestcase>> {
    FsTestcase::enumerate(&problem.input_dir, &problem.answer_dir)
        .context("Failed to find test cases")
}

/// Runs every solution in turn, printing results as they arrive.
/// Returns `true` when every solution behaved as its category expects.
pub async fn run_solutions(
    problem: &Problem,
    solutions: &mut [Solution],
    settings: &RunSettings,
) -> Result<bool> {
    self::ensure_checker_exists(problem)?;
    let testcases = self::list_testcases(problem)?;

    for solution in solutions.iter_mut() {
        self::run_solution(problem, solution, &testcases, settings).await?;
    }
    style::print_solution_table(solutions, problem);

    Ok(solutions
        .iter()
        .all(|s| matches!(&s.summary, Some(sum) if sum.verdict == Verdict::Correct)))
}

async fn run_solution(
    problem: &Problem,
    solution: &mut Solution,
    testcases: &[FsTestcase],
    settings: &RunSettings,
) -> Result<()> {
    let n = testcases.len();
    style::print_solution_header(solution, n);

    let spinner_style = ProgressStyle::default_spinner()
        .template("{spinner} {msg}")
        .context("Invalid progress template")?;
    let bar = ProgressBar::new_spinner()
        .with_style(spinner_style)
        .with_message(format!("{} ... 0/{}", solution.name, n));
    bar.enable_steady_tick(Duration::from_millis(80));

    let mut done = 0;
    let res = run_batch(problem, solution, testcases, settings, |test| {
        done += 1;
        bar.suspend(|| style::print_test_line(test));
        bar.set_message(format!("{} ... {}/{}", solution.name, done, n));
    })
    .await;
    bar.finish_and_clear();
    let tests = res.with_context(|| format!("Failed to run solution '{}'", solution.name))?;

    if log::log_enabled!(log::Level::Debug) {
        tests
            .values()
            .filter(|t| t.status != Status::Accepted)
            .for_each(style::print_test_detail);
    }

    let summary = aggregate(solution, tests, problem.memory_limit);
    style::print_solution_summary(summary, n);
    Ok(())
}

pub fn write_json_report(
    problem: &Problem,
    solutions: &[Solution],
    filepath: impl AsRef<Path>,
) -> Result<()> {
    let filepath = filepath.as_ref();
    Report::new(problem, solutions)
        .write_json(filepath)
        .with_context(|| format!("Failed to write report to {}", filepath.to_string_lossy()))
}

pub async fn check_output(
    problem: &Problem,
    settings: &RunSettings,
    input: &Path,
    output: &Path,
    answer: &Path,
) -> Result<CheckerOutput> {
    self::ensure_checker_exists(problem)?;
    for (what, path) in [("input", input), ("output", output), ("answer", answer)] {
        ensure!(path.is_file(), "Missing {} file '{}'", what, path.to_string_lossy());
    }
    let out = Checker::new(&problem.checker)
        .timeout(settings.checker_timeout)
        .check(input, output, answer)
        .await;

    println!("{} {}", style::status_badge(out.status), out.status.description().bold());
    if !out.message.is_empty() {
        println!("{}", out.message);
    }
    Ok(out)
}

pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(Config::FILENAME);
    let toml = Config::example_toml()?;
    fsutil::mkdir_all(dir.as_ref())?;
    fsutil::write_new(&path, toml).context("Failed to write example config")?;
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;

    fn config_in(dir: &Path, extra: &str) -> Config {
        let toml = format!(
            r##"
            [problem]
            name = "p"
            time_limit = 1.0
            memory_limit = 64

            [[launch]]
            pattern = "*.py"
            interpreter = "python3"
            args = ["#{{filePath}}"]
            memory_overhead_mb = 8

            {}
            "##,
            extra
        );
        let path = dir.join(Config::FILENAME);
        std::fs::write(&path, toml).unwrap();
        Config::from_toml_file(path).unwrap()
    }

    #[test]
    fn output_dir_is_grouped_by_extension() {
        let root = Path::new("/p/tmp");
        assert_eq!(solution_output_dir(root, "ac.cpp"), root.join("cpp/ac"));
        assert_eq!(solution_output_dir(root, "brute.py"), root.join("py/brute"));
    }

    #[test]
    fn selection_filters_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/ac"), "").unwrap();
        let cfg = config_in(
            dir.path(),
            r#"
            [solutions]
            main-ac = "ac.cpp"
            wrong-answer = ["wa.py"]
            "#,
        );

        let main = select_solutions(&cfg, &Selection::MainAc).unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].output_dir, dir.path().join("tmp/cpp/ac"));

        let all = select_solutions(&cfg, &Selection::All).unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ac.cpp", "wa.py"]);
        assert_eq!(all[1].memory_overhead, 8 << 20);

        let one = select_solutions(&cfg, &Selection::Named("wa.py".into())).unwrap();
        assert_eq!(one[0].expected, ExpectedResult::WrongAnswer);

        let err = select_solutions(&cfg, &Selection::Named("nope.rs".into())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JudgeError>(),
            Some(JudgeError::UnknownSolution(_))
        ));
    }

    #[test]
    fn missing_binary_aborts_selection() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path(), "[solutions]\nmain-ac = \"ac.cpp\"\n");
        let err = select_solutions(&cfg, &Selection::MainAc).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JudgeError>(),
            Some(JudgeError::MissingFile(..))
        ));
    }

    #[test]
    fn no_main_ac_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path(), "[solutions]\nwrong-answer = \"wa.py\"\n");
        assert!(select_solutions(&cfg, &Selection::MainAc).is_err());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path()).unwrap();
        assert!(Config::from_toml_file(path).is_ok());
        assert!(init_config(dir.path()).is_err());
    }
}
