//! Environment variable overrides
//!
//! Every recognised variable is listed in [`ENV_OPTIONS`] together with its
//! default and whether it must end up set. [`ConfigBuilder`] layers defaults,
//! an optional TOML file and the environment, then validates the result.

use super::import::DEFAULT_USER_AGENT;
use super::Config;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration field an environment variable maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKey {
    Port,
    WebUiPath,
    CorsEnabled,
    TitleDumpUrl,
    FetchTimeout,
    UserAgent,
    ImportInterval,
    ValidateDump,
    MeilisearchUrl,
    MeilisearchKey,
    IndexName,
    MetadataIndex,
    TaskTimeout,
    TaskPollInterval,
    LogLevel,
    LogFormat,
}

/// One recognised environment variable
#[derive(Debug, Clone, Copy)]
pub struct EnvOption {
    pub name: &'static str,
    pub key: EnvKey,
    /// Must be non-empty after the file and environment are applied
    pub required: bool,
    /// Value used when neither the file nor the environment sets it
    pub default: Option<&'static str>,
}

const fn opt(name: &'static str, key: EnvKey, default: &'static str) -> EnvOption {
    EnvOption {
        name,
        key,
        required: false,
        default: Some(default),
    }
}

/// All environment variables michiru reads
pub const ENV_OPTIONS: &[EnvOption] = &[
    opt("PORT", EnvKey::Port, "8080"),
    opt("WEBUI_PATH", EnvKey::WebUiPath, "./static"),
    opt("CORS_ENABLED", EnvKey::CorsEnabled, "false"),
    EnvOption {
        name: "TITLE_DUMP_URL",
        key: EnvKey::TitleDumpUrl,
        required: false,
        default: None,
    },
    opt("FETCH_TIMEOUT", EnvKey::FetchTimeout, "30s"),
    opt("USER_AGENT", EnvKey::UserAgent, DEFAULT_USER_AGENT),
    opt("IMPORT_INTERVAL", EnvKey::ImportInterval, "24h"),
    opt("VALIDATE_DUMP", EnvKey::ValidateDump, "true"),
    EnvOption {
        name: "MEILISEARCH_URL",
        key: EnvKey::MeilisearchUrl,
        required: true,
        default: None,
    },
    EnvOption {
        name: "MEILISEARCH_KEY",
        key: EnvKey::MeilisearchKey,
        required: true,
        default: None,
    },
    opt("INDEX_NAME", EnvKey::IndexName, "titles"),
    opt("METADATA_INDEX", EnvKey::MetadataIndex, "index_metadata"),
    opt("TASK_TIMEOUT", EnvKey::TaskTimeout, "0"),
    opt("TASK_POLL_INTERVAL", EnvKey::TaskPollInterval, "50ms"),
    opt("LOG_LEVEL", EnvKey::LogLevel, "info"),
    opt("LOG_FORMAT", EnvKey::LogFormat, "text"),
];

// ============================================================================
// Value parsing
// ============================================================================

/// Parse a duration such as `30s`, `1h30m`, `500ms` or `0`
///
/// A bare integer is taken as whole seconds. Units: `ns`, `us`/`µs`, `ms`,
/// `s`, `m`, `h`; each component may carry a decimal fraction (`1.5h`).
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let invalid = || format!("invalid duration '{}'", input);
    let is_number = |c: char| c.is_ascii_digit() || c == '.';

    let mut total_nanos: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).ok_or_else(|| {
            format!("missing unit in duration '{}'", input)
        })?;
        if number_end == 0 {
            return Err(invalid());
        }
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail.find(is_number).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        rest = tail;

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3600 * 1_000_000_000,
            _ => return Err(format!("unknown unit '{}' in duration '{}'", unit, input)),
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        total_nanos += whole * unit_nanos;

        if !fraction.is_empty() {
            if fraction.contains('.') || fraction.len() > 18 {
                return Err(invalid());
            }
            let digits: u128 = fraction.parse().map_err(|_| invalid())?;
            total_nanos += digits * unit_nanos / 10u128.pow(fraction.len() as u32);
        }
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000)
        .map_err(|_| format!("duration '{}' is too large", input))?;
    Ok(Duration::new(secs, (total_nanos % 1_000_000_000) as u32))
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("invalid boolean '{}'", other)),
    }
}

/// Whole milliseconds; a non-zero duration shorter than 1ms is rejected
fn duration_millis(raw: &str) -> Result<u64, String> {
    let d = parse_duration(raw)?;
    let millis =
        u64::try_from(d.as_millis()).map_err(|_| format!("duration '{}' is too large", raw))?;
    if millis == 0 && !d.is_zero() {
        return Err(format!("duration '{}' is shorter than 1ms", raw));
    }
    Ok(millis)
}

/// Apply one raw value to the field behind `key`
pub fn apply_value(config: &mut Config, key: EnvKey, raw: &str) -> Result<(), String> {
    let value = raw.trim();
    match key {
        EnvKey::Port => {
            config.server.port = value
                .parse()
                .map_err(|_| format!("invalid port '{}'", value))?;
        }
        EnvKey::WebUiPath => config.server.web_ui_path = PathBuf::from(value),
        EnvKey::CorsEnabled => config.server.cors_enabled = parse_bool(value)?,
        EnvKey::TitleDumpUrl => config.import.dump_url = Some(value.to_string()),
        EnvKey::FetchTimeout => config.import.fetch_timeout_ms = duration_millis(value)?,
        EnvKey::UserAgent => config.import.user_agent = value.to_string(),
        EnvKey::ImportInterval => config.import.min_interval_ms = duration_millis(value)?,
        EnvKey::ValidateDump => config.import.validate_dump = parse_bool(value)?,
        EnvKey::MeilisearchUrl => config.engine.url = value.to_string(),
        EnvKey::MeilisearchKey => config.engine.api_key = value.to_string(),
        EnvKey::IndexName => config.engine.index_name = value.to_string(),
        EnvKey::MetadataIndex => config.engine.metadata_index = value.to_string(),
        EnvKey::TaskTimeout => config.engine.task_timeout_ms = duration_millis(value)?,
        EnvKey::TaskPollInterval => {
            config.engine.task_poll_interval_ms = duration_millis(value)?;
        }
        EnvKey::LogLevel => config.logging.level = value.parse()?,
        EnvKey::LogFormat => config.logging.format = value.parse()?,
    }
    Ok(())
}

fn is_set(config: &Config, key: EnvKey) -> bool {
    match key {
        EnvKey::MeilisearchUrl => !config.engine.url.is_empty(),
        EnvKey::MeilisearchKey => !config.engine.api_key.is_empty(),
        EnvKey::TitleDumpUrl => config.import.dump_url.is_some(),
        _ => true,
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds a [`Config`] from defaults, an optional TOML file and the environment
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML file before applying the environment
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Build using the process environment
    pub fn build(self) -> Result<Config> {
        self.build_with(|name| std::env::var(name).ok())
    }

    /// Build using `lookup` to resolve environment variables
    ///
    /// Empty values count as unset. Every problem found is reported in one
    /// error.
    pub fn build_with<F>(self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.file {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        let mut errors: Vec<String> = Vec::new();

        for option in ENV_OPTIONS {
            let Some(raw) = lookup(option.name).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            if let Err(e) = apply_value(&mut config, option.key, &raw) {
                errors.push(format!("{}: {}", option.name, e));
            }
        }

        for option in ENV_OPTIONS.iter().filter(|o| o.required) {
            if !is_set(&config, option.key) {
                errors.push(format!("{} is required", option.name));
            }
        }

        errors.extend(config.validation_errors());

        if errors.is_empty() {
            Ok(config)
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
