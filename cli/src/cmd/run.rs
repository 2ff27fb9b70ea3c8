use std::path::PathBuf;

use anyhow::bail;
use judgebox_core::action::{self, Selection};

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Run every solution listed in [solutions]
    #[arg(long, conflicts_with = "solution")]
    pub all: bool,

    /// Run only this solution file (e.g. wa.cpp)
    #[arg(short, long)]
    pub solution: Option<String>,

    /// Parallel lanes per solution (main-ac always runs sequentially)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Also write the results as JSON to this file
    #[arg(long)]
    pub json: Option<PathBuf>,
}

impl Args {
    fn selection(&self) -> Selection {
        match (&self.solution, self.all) {
            (Some(name), _) => Selection::Named(name.to_owned()),
            (None, true) => Selection::All,
            (None, false) => Selection::MainAc,
        }
    }
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = util::load_config(global_args)?;
    let problem = cfg.problem();
    let mut settings = cfg.run_settings();
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }

    let mut solutions = action::select_solutions(&cfg, &args.selection())?;
    log::info!(
        "Judging {} solution(s) of '{}' (TL {:?}, ML {} MiB)",
        solutions.len(),
        problem.name,
        problem.time_limit,
        problem.memory_limit >> 20
    );

    let all_correct = action::run_solutions(&problem, &mut solutions, &settings).await?;

    if let Some(path) = &args.json {
        action::write_json_report(&problem, &solutions, path)?;
        log::info!("Wrote report to {}", path.to_string_lossy());
    }

    if !all_correct {
        bail!("Some solutions did not behave as their category expects");
    }
    Ok(())
}
