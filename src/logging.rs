use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use colored::{ColoredString, Colorize};
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};

use crate::error::{AppError, AppResult};

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,  // default: warnings and errors
        1 => LevelFilter::Info,  // -v: info and up
        2 => LevelFilter::Debug, // -vv: debug and up
        _ => LevelFilter::Trace, // -vvv: trace and up
    }
}

fn level_label(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERROR".red().bold(),
        Level::Warn  => "WARN ".yellow().bold(),
        Level::Info  => "INFO ".white().bold(),
        Level::Debug => "DEBUG".bright_black(),
        Level::Trace => "TRACE".bright_black(),
    }
}

/// Install the global logger.
///
/// With `log_file`, records are appended to that file without colour and
/// tagged with their module; otherwise they go to stderr.
pub fn init_logger(verbosity: u8, log_file: Option<&Path>) -> AppResult<()> {
    let mut builder = Builder::new();
    builder.filter_level(level_for(verbosity));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AppError::Configuration(format!(
                        "cannot open log file {}: {e}",
                        path.display()
                    ))
                })?;

            builder.target(Target::Pipe(Box::new(file)));
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{} {:<5} [{}] {}",
                    buf.timestamp_seconds(),
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }
        None => {
            builder.format(|buf, record| {
                writeln!(buf, "{} {}", level_label(record.level()), record.args())
            });
        }
    }

    builder
        .try_init()
        .map_err(|e| AppError::Configuration(format!("logger already initialised: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(9), LevelFilter::Trace);
    }
}
