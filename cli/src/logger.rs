use std::io::Write as _;

use colored::Colorize;
use env_logger::Env;
use judgebox_core::style::ColorTheme;

/// `RUST_LOG` wins over `-v`.
pub fn init(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let level = record.level();
            writeln!(
                buf,
                "{} {}",
                format!("[{}]", level).color(level.color()).bold(),
                record.args()
            )
        })
        .init();
}
