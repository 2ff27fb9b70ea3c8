pub mod action;
pub mod config;
pub mod error;
pub mod report;
pub mod serdable;
pub mod str_interp;
pub mod style;
pub mod testing;

pub use crate::config::Config;
pub use crate::error::JudgeError;
