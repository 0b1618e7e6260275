use std::io::Write;

use log::LevelFilter;

/// Map a `LOG_LEVEL` value to a filter. Unknown values fall back to info.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARNING" | "WARN" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Initialise the global logger. `RUST_LOG`, when set, overrides `level`.
pub fn init_logging(level: &str) {
    let filter = parse_level(level).to_string().to_lowercase();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels_are_case_insensitive() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("INFO"), LevelFilter::Info);
        assert_eq!(parse_level("Warning"), LevelFilter::Warn);
        assert_eq!(parse_level("warn"), LevelFilter::Warn);
        assert_eq!(parse_level("ERROR"), LevelFilter::Error);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
        assert_eq!(parse_level(""), LevelFilter::Info);
    }
}
