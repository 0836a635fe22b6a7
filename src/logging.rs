use std::str::FromStr;

use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Target used for per-request access log lines.
pub const HTTP_LOG_TARGET: &str = "foodgram::http";

pub fn parse_level(level: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(level.trim()).ok()
}

/// Installs the global logger. Unknown levels fall back to `info`.
pub fn init(level: &str) -> Result<(), log::SetLoggerError> {
    let filter = parse_level(level).unwrap_or(LevelFilter::Info);

    SimpleLogger::new()
        .with_level(filter)
        .with_module_level("sqlx", LevelFilter::Warn)
        .with_module_level("hyper", LevelFilter::Warn)
        .init()?;

    if parse_level(level).is_none() {
        log::warn!("Unknown log level {level:?}, using info");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }
}
