use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context as _};
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::testing::{ExpectedResult, LaunchRule, Problem, RunSettings};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub problem: ProblemConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub launch: Vec<LaunchRule>,
    #[serde(default)]
    pub solutions: BTreeMap<String, SolutionFiles>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProblemConfig {
    pub name: String,
    /// Seconds.
    pub time_limit: f64,
    /// MiB.
    pub memory_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input: PathBuf,
    pub answers: PathBuf,
    pub checker: PathBuf,
    pub bin: PathBuf,
    pub src: PathBuf,
    pub output_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: "input".into(),
            answers: "output".into(),
            checker: "bin/checker".into(),
            bin: "bin".into(),
            src: "src".into(),
            output_root: "tmp".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub workers: usize,
    pub hard_limit_factor: f64,
    pub memory_poll_interval_ms: u64,
    /// Seconds.
    pub checker_timeout: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        let s = RunSettings::default();
        Self {
            workers: s.workers,
            hard_limit_factor: s.hard_limit_factor,
            memory_poll_interval_ms: s.poll_interval.as_millis() as u64,
            checker_timeout: s.checker_timeout.as_secs_f64(),
        }
    }
}

/// `category = "a.cpp"` or `category = ["a.cpp", "b.py"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SolutionFiles {
    One(String),
    Many(Vec<String>),
}

impl SolutionFiles {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let files: &[String] = match self {
            SolutionFiles::One(f) => std::slice::from_ref(f),
            SolutionFiles::Many(fs) => fs,
        };
        files.iter().map(String::as_str)
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "judgebox.toml";

    pub fn example_toml() -> anyhow::Result<String> {
        let file = Asset::get(Self::FILENAME).context("Example config is not embedded")?;
        let s = std::str::from_utf8(file.data.as_ref()).context("Example config is not UTF-8")?;
        Ok(s.to_owned())
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.validate()
            .with_context(|| format!("Invalid config: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let cur_dir = cur_dir.as_ref();
        cur_dir
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
            .with_context(|| format!("Not in a problem dir: Cannot find '{}'", Self::FILENAME))
    }

    pub fn from_file_finding_in_ancestors(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_filepath = Config::find_file_in_ancestors(cur_dir)?;
        Self::from_toml_file(config_filepath)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.problem;
        ensure!(
            p.time_limit > 0.0,
            "problem.time_limit must be a positive number of seconds, got {}",
            p.time_limit
        );
        seconds("problem.time_limit", p.time_limit)?;
        ensure!(p.memory_limit > 0, "problem.memory_limit must be positive (MiB)");
        ensure!(
            p.memory_limit <= u64::MAX >> 20,
            "problem.memory_limit is too large: {} MiB",
            p.memory_limit
        );
        ensure!(
            self.judge.hard_limit_factor.is_finite() && self.judge.hard_limit_factor >= 1.0,
            "judge.hard_limit_factor must be a finite number of at least 1.0, got {}",
            self.judge.hard_limit_factor
        );
        seconds(
            "problem.time_limit * judge.hard_limit_factor",
            p.time_limit * self.judge.hard_limit_factor,
        )?;
        ensure!(
            self.judge.checker_timeout > 0.0,
            "judge.checker_timeout must be a positive number of seconds"
        );
        seconds("judge.checker_timeout", self.judge.checker_timeout)?;
        self.solution_entries().map(|_| ())
    }

    /// The directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        self.source_config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir().join(path)
    }

    pub fn problem(&self) -> Problem {
        Problem {
            name: self.problem.name.clone(),
            problem_dir: self.base_dir().to_owned(),
            input_dir: self.resolve(&self.paths.input),
            answer_dir: self.resolve(&self.paths.answers),
            checker: self.resolve(&self.paths.checker),
            time_limit: seconds_or_max(self.problem.time_limit),
            memory_limit: self.problem.memory_limit.saturating_mul(1 << 20),
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            workers: self.judge.workers,
            hard_limit_factor: self.judge.hard_limit_factor,
            poll_interval: Duration::from_millis(self.judge.memory_poll_interval_ms),
            checker_timeout: seconds_or_max(self.judge.checker_timeout),
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.resolve(&self.paths.bin)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.resolve(&self.paths.src)
    }

    pub fn output_root(&self) -> PathBuf {
        self.resolve(&self.paths.output_root)
    }

    /// Every listed solution file with its category, in category order.
    pub fn solution_entries(&self) -> anyhow::Result<Vec<(ExpectedResult, String)>> {
        let mut res = Vec::new();
        for (key, files) in &self.solutions {
            let category = ExpectedResult::from_str(key)
                .with_context(|| format!("Unknown solution category '{}'", key))?;
            res.extend(files.iter().map(|f| (category, f.to_owned())));
        }
        res.sort_by_key(|(category, _)| *category);
        Ok(res)
    }
}

fn seconds(field: &str, secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("{} is not a representable duration: {}", field, secs))
}

/// Values out of `Duration`'s range are rejected by `Config::validate`.
fn seconds_or_max(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
