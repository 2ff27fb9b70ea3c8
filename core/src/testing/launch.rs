use std::{
    collections::HashMap,
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
    process::Command as StdCommand,
};

use tokio::process::Command;

use crate::{
    error::{JudgeError, Result},
    serdable::GlobPattern,
    str_interp,
};

/// How a solution gets started. Resolved once per solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Native { program: PathBuf },
    Interpreted { interpreter: String, args: Vec<String> },
}

impl Launch {
    /// The process leads a new process group, so the whole tree can be killed at once.
    pub fn command(&self) -> Command {
        let mut cmd = match self {
            Launch::Native { program } => StdCommand::new(program),
            Launch::Interpreted { interpreter, args } => {
                let mut cmd = StdCommand::new(interpreter);
                cmd.args(args);
                cmd
            }
        };
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);
        Command::from(cmd)
    }
}

impl fmt::Display for Launch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Launch::Native { program } => write!(f, "{}", program.to_string_lossy()),
            Launch::Interpreted { interpreter, args } => {
                write!(f, "{}", interpreter)?;
                args.iter().try_for_each(|a| write!(f, " {}", a))
            }
        }
    }
}

/// Maps solution filenames to an interpreter invocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct LaunchRule {
    pub pattern: GlobPattern,
    pub interpreter: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub memory_overhead_mb: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct LaunchDirs<'a> {
    pub bin_dir: &'a Path,
    pub src_dir: &'a Path,
}

/// Returns the launch and the extra memory (bytes) the matching rule grants.
///
/// Filenames no rule matches are compiled languages: `bin_dir/<stem>`.
pub fn resolve_launch(
    filename: &str,
    rules: &[LaunchRule],
    dirs: LaunchDirs,
) -> Result<(Launch, u64)> {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_owned());

    let Some(rule) = rules.iter().find(|r| r.pattern.matches(filename)) else {
        let program = dirs.bin_dir.join(&stem);
        if !program.is_file() {
            return Err(JudgeError::MissingFile("solution binary", program));
        }
        return Ok((Launch::Native { program }, 0));
    };

    let file_path = dirs.src_dir.join(filename);
    let vars: HashMap<&str, &OsStr> = HashMap::from([
        ("binDir", dirs.bin_dir.as_os_str()),
        ("srcDir", dirs.src_dir.as_os_str()),
        ("fileName", OsStr::new(filename)),
        ("fileStem", OsStr::new(&stem)),
        ("filePath", file_path.as_os_str()),
    ]);
    let args = str_interp::interp_all(&rule.args, &vars)
        .map_err(|e| JudgeError::LaunchTemplate(filename.to_owned(), e))?;

    let launch = Launch::Interpreted {
        interpreter: rule.interpreter.clone(),
        args,
    };
    Ok((launch, rule.memory_overhead_mb << 20))
}
