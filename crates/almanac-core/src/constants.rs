/// Horizon used when a caller asks for recurrences without an explicit end.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 365;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Optional settings file, resolved relative to the working directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Prefix for settings supplied through the environment
/// (e.g. `ALMANAC_LOGGING__LEVEL=debug`).
pub const ENV_PREFIX: &str = "ALMANAC";
