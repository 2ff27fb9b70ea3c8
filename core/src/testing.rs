pub mod checker;
pub mod classify;
pub mod launch;
pub mod problem;
pub mod result;
pub mod runner;
pub mod scheduler;
pub mod stats;
pub mod testcase;
pub mod watchdog;

pub use checker::*;
pub use classify::*;
pub use launch::*;
pub use problem::*;
pub use result::*;
pub use runner::*;
pub use scheduler::*;
pub use stats::*;
pub use testcase::*;
pub use watchdog::*;
