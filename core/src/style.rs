use std::time::Duration;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::testing::{Problem, Solution, Status, Summary, Test, Verdict};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for Status {
    fn color(&self) -> Color {
        use Status::*;
        if !self::is_truecolor_supported() {
            return match self {
                Accepted => Color::Green,
                WrongAnswer | PresentationError => Color::Yellow,
                HardTimeLimitExceeded | SoftTimeLimitExceeded => Color::Red,
                MemoryLimitExceeded | TimeAndMemoryExceeded => Color::Blue,
                RuntimeError => Color::Magenta,
                Failure => Color::BrightRed,
            };
        }

        let (r, g, b) = match self {
            Accepted => (30, 180, 40),
            WrongAnswer => (210, 138, 4),
            PresentationError => (190, 160, 30),
            HardTimeLimitExceeded => (220, 42, 42),
            SoftTimeLimitExceeded => (230, 110, 60),
            MemoryLimitExceeded => (40, 100, 220),
            TimeAndMemoryExceeded => (120, 70, 210),
            RuntimeError => (171, 40, 200),
            Failure => (255, 0, 80),
        };
        Color::TrueColor { r, g, b }
    }
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        match self {
            Verdict::Correct => Color::Green,
            Verdict::Wrong => Color::BrightRed,
        }
    }
}

pub fn status_badge(status: Status) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {:<4} ", status.to_string())
        .on_color(status.color())
        .bold()
        .color(fg)
}

pub fn verdict_mark(verdict: Verdict) -> ColoredString {
    let mark = match verdict {
        Verdict::Correct => "OK",
        Verdict::Wrong => "NG",
    };
    mark.color(verdict.color()).bold()
}

fn kib(bytes: u64) -> u64 {
    bytes >> 10
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1u64 << 20) as f64
}

pub fn print_solution_header(solution: &Solution, n_tests: usize) {
    println!(
        "{} {} ({}) on {} tests: {}",
        "==>".blue().bold(),
        solution.name.bold(),
        solution.expected.to_string().cyan(),
        n_tests,
        solution.launch.to_string().dimmed(),
    );
}

pub fn print_test_line(test: &Test) {
    println!(
        "Test {:>4} ... {} [{}ms, {} KiB]",
        test.name,
        self::status_badge(test.status),
        test.exec_time.as_millis(),
        kib(test.memory_usage),
    );
}

pub fn print_test_detail(test: &Test) {
    let Some(diag) = test.diagnostic.as_deref().filter(|s| !s.is_empty()) else {
        return;
    };
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    const THIN_LINE: &str = "─";

    let title = format!("[{}: {}]", test.name, test.status.description());
    println!(
        "{}{}",
        title.cyan().bold(),
        THIN_LINE
            .repeat((cols as usize).saturating_sub(title.len() + 1))
            .bright_black(),
    );
    println!("{}", diag);
}

pub fn print_solution_summary(summary: &Summary, n_tests: usize) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let num_passed = summary.statistic.ac_count;
    if num_passed == n_tests {
        print!("{}", format!("All {} tests passed", n_tests).green());
    } else {
        let summary_msg = if num_passed > 0 {
            format!("{}/{} tests not accepted", n_tests - num_passed, n_tests)
        } else {
            format!("All {} tests not accepted", n_tests)
        };

        let detail_msg = summary
            .frequencies
            .iter()
            .filter(|(&status, _)| status != Status::Accepted)
            .map(|(&status, &cnt)| {
                format!(
                    "{}{}{}",
                    self::status_badge(status),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    println!(
        " {} {}",
        self::verdict_mark(summary.verdict),
        bar
    );
}

/// Max time is capped at the time limit so timeouts line up.
pub fn print_solution_table(solutions: &[Solution], problem: &Problem) {
    let name_width = solutions
        .iter()
        .map(|s| s.name.len())
        .chain([8])
        .max()
        .unwrap_or(8);

    println!(
        "\n{}",
        format!(
            "{:<name_width$}  {:<26}  {:<4}  {:>6}  {:>8}  {:>10}",
            "Solution", "Expected", "", "AC", "Time(ms)", "Memory(MiB)"
        )
        .bold()
    );

    for sol in solutions {
        let Some(summary) = &sol.summary else {
            continue;
        };
        let st = &summary.statistic;
        let time: Duration = st.max_exec_time.min(problem.time_limit);
        println!(
            "{:<name_width$}  {:<26}  {:<4}  {:>6}  {:>8}  {:>10.1}",
            sol.name,
            sol.expected.to_string(),
            self::verdict_mark(summary.verdict),
            format!("{}/{}", st.ac_count, sol.tests.len()),
            time.as_millis(),
            mib(st.max_memory_usage),
        );
    }
}
