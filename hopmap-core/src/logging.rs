//! Logger initialization shared by the binaries.

use std::io::Write;

use colored::*;
use log::{LevelFilter, SetLoggerError};

/// Initializes `env_logger` from `RUST_LOG`, then applies `level` as the
/// default and to the hopmap crates. HTTP client internals stay at info.
///
/// Uses `try_init`, so a second call returns an error instead of panicking.
pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.filter_module("hopmap_core", level);
    builder.filter_module("hopmap_probe", level);
    builder.filter_module("hopmap_geo", level);

    builder.format(|buf, record| {
        let level = record.level();
        let colored_level = match level {
            log::Level::Error => level.to_string().red(),
            log::Level::Warn => level.to_string().yellow(),
            log::Level::Info => level.to_string().green(),
            log::Level::Debug => level.to_string().blue(),
            log::Level::Trace => level.to_string().purple(),
        };
        writeln!(buf, "[{}] {}", colored_level, record.args())
    });

    builder.try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails_without_panicking() {
        let _ = init_logger(LevelFilter::Info);
        assert!(init_logger(LevelFilter::Debug).is_err());
    }
}
