use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use crate::error::{JudgeError, Result};

/// One input file paired with its expected answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTestcase {
    pub name: String,
    pub input_path: PathBuf,
    pub answer_path: PathBuf,
}

impl FsTestcase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        answer: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_path: input.into(),
            answer_path: answer.into(),
        }
    }

    /// Lists every test case of a problem in run order.
    ///
    /// Files ending in `.interactive` are interactor scripts, not tests.
    pub fn enumerate(input_dir: impl AsRef<Path>, answer_dir: impl AsRef<Path>) -> Result<Vec<Self>> {
        let input_dir = input_dir.as_ref();
        let answer_dir = answer_dir.as_ref();
        if !input_dir.is_dir() {
            return Err(JudgeError::MissingFile("input directory", input_dir.to_owned()));
        }

        let mut names = Vec::new();
        for entry in fsutil::read_dir(input_dir)?.filter_map(std::result::Result::ok) {
            let Ok(ft) = entry.file_type() else {
                continue;
            };
            if ft.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".interactive") {
                continue;
            }
            names.push(name);
        }
        if names.is_empty() {
            return Err(JudgeError::NoTestcases(input_dir.to_owned()));
        }
        names.sort_by(|a, b| length_lex_cmp(a, b));

        names
            .into_iter()
            .map(|name| {
                let answer = answer_dir.join(&name);
                if !answer.is_file() {
                    return Err(JudgeError::MissingFile("answer file", answer));
                }
                Ok(Self::new(name.clone(), input_dir.join(&name), answer))
            })
            .collect()
    }
}

/// Shorter names first, so `2` runs before `10`.
pub fn length_lex_cmp(a: &str, b: &str) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}
