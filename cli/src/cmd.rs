pub mod check;
pub mod init;
pub mod run;

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Path to judgebox.toml (default: search the current dir and its ancestors)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logs and checker diagnostics (-vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    #[command(alias("r"))]
    Run(run::Args),

    Check(check::Args),

    Tests(tests::Args),

    Init(init::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Run(args) => run::exec(args, self).await,
            Check(args) => check::exec(args, self).await,
            Tests(args) => tests::exec(args, self),
            Init(args) => init::exec(args, self),
        }
    }
}
