use std::path::PathBuf;

use judgebox_core::action;

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub input: PathBuf,
    pub output: PathBuf,
    pub answer: PathBuf,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = util::load_config(global_args)?;
    let _ = action::check_output(
        &cfg.problem(),
        &cfg.run_settings(),
        &args.input,
        &args.output,
        &args.answer,
    )
    .await?;
    Ok(())
}
