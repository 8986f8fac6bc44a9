use std::path::Path;

use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use thiserror::Error;

const STDOUT: &str = "stdout";
const PATTERN: &str = "{d(%Y/%m/%d %H:%M:%S)} {h({l:<5})} {t} {m}{n}";

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid logging configuration: {0}")]
    Config(#[from] log4rs::config::runtime::ConfigErrors),
    #[error("failed to load logging configuration from {path}: {reason}")]
    File { path: String, reason: String },
    #[error("logger already installed: {0}")]
    Install(#[from] log::SetLoggerError),
}

/// Console-only configuration writing to stdout at `level`.
pub fn console_config(level: LevelFilter) -> Result<Config, Error> {
    let stdout = ConsoleAppender::builder()
        .target(Target::Stdout)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    Ok(Config::builder()
        .appender(Appender::builder().build(STDOUT, Box::new(stdout)))
        .build(Root::builder().appender(STDOUT).build(level))?)
}

/// Installs the global logger, from `config_file` when given.
pub fn init(level: LevelFilter, config_file: Option<&Path>) -> Result<(), Error> {
    match config_file {
        Some(path) => log4rs::init_file(path, Default::default()).map_err(|e| Error::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?,
        None => {
            log4rs::init_config(console_config(level)?)?;
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_config_uses_requested_level() {
        let config = console_config(LevelFilter::Debug).unwrap();
        assert_eq!(config.root().level(), LevelFilter::Debug);
        assert_eq!(config.appenders().len(), 1);
    }
}
