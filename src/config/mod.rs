//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::loaders::Route;
use crate::application::motion::MotionSetting;
use crate::dispatch::UnknownActionPolicy;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "recollect";
const ENV_PREFIX: &str = "RECOLLECT";

/// Command-line arguments for the recollect binary.
#[derive(Debug, Parser)]
#[command(
    name = "recollect",
    version,
    about = "Query key taxonomy and cache tooling for the recollect study client"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "RECOLLECT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the key every builder produces for sample identifiers.
    Taxonomy(TaxonomyArgs),
    /// Print one key.
    Key(KeyArgs),
    /// Load a route against the seeded in-memory study data and report what
    /// was cached.
    Prefetch(PrefetchArgs),
    /// Apply named actions to an empty card draft and print the result.
    Draft(DraftArgs),
    /// Print the resolved reduced-motion preference.
    Motion(MotionArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct TaxonomyArgs {
    /// Print keys as JSON arrays instead of the bracketed display form.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct KeyArgs {
    /// Builder name, e.g. `cards.paginated`.
    #[arg(value_name = "BUILDER")]
    pub builder: String,

    /// Builder arguments.
    #[arg(value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Print the bracketed display form instead of JSON.
    #[arg(long)]
    pub display: bool,
}

#[derive(Debug, Args, Clone)]
pub struct PrefetchArgs {
    /// Route path, e.g. `/decks/3?page=0` or `/lessons/3/review`.
    #[arg(value_name = "ROUTE")]
    pub route: Route,

    /// Number of concurrent loads of the same route.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub loads: u16,

    /// Simulated latency of every repository call.
    #[arg(long = "latency-ms", default_value_t = 0, value_name = "MILLIS")]
    pub latency_ms: u64,
}

#[derive(Debug, Args, Clone)]
pub struct DraftArgs {
    /// Actions as `name` or `name=payload`, e.g. `set_front=猫 add_tag=animals`.
    #[arg(value_name = "ACTION", required = true)]
    pub actions: Vec<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MotionArgs {
    /// Store a new setting (on|off|unset) before printing.
    #[arg(long, value_name = "SETTING")]
    pub set: Option<MotionSetting>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Age in milliseconds after which cached entries count as stale.
    #[arg(long = "stale-after-ms", value_name = "MILLIS", global = true)]
    pub stale_after_ms: Option<u64>,

    /// What dispatching an unregistered action name does (ignore|warn|reject).
    #[arg(long = "unknown-action", value_name = "POLICY", global = true)]
    pub unknown_action: Option<String>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub dispatch: DispatchSettings,
    pub motion: MotionSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    /// `None` keeps entries fresh until they are invalidated.
    pub stale_after: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchSettings {
    pub unknown_action: UnknownActionPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct MotionSettings {
    pub reduce_motion: MotionSetting,
    /// Stand-in for the platform's reduced-motion signal.
    pub system_reduced_motion: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    dispatch: RawDispatchSettings,
    motion: RawMotionSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(age) = overrides.stale_after_ms {
            self.cache.stale_after_ms = Some(age);
        }
        if let Some(policy) = overrides.unknown_action.as_ref() {
            self.dispatch.unknown_action = Some(policy.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            dispatch,
            motion,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            dispatch: build_dispatch_settings(dispatch)?,
            motion: build_motion_settings(motion)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let stale_after = match cache.stale_after_ms {
        Some(0) => {
            return Err(LoadError::invalid(
                "cache.stale_after_ms",
                "must be greater than zero; leave it unset to keep entries until invalidated",
            ));
        }
        Some(millis) => Some(Duration::from_millis(millis)),
        None => None,
    };
    Ok(CacheSettings { stale_after })
}

fn build_dispatch_settings(dispatch: RawDispatchSettings) -> Result<DispatchSettings, LoadError> {
    let unknown_action = match dispatch.unknown_action {
        Some(value) => value
            .parse::<UnknownActionPolicy>()
            .map_err(|err| LoadError::invalid("dispatch.unknown_action", err.to_string()))?,
        None => UnknownActionPolicy::default(),
    };
    Ok(DispatchSettings { unknown_action })
}

fn build_motion_settings(motion: RawMotionSettings) -> Result<MotionSettings, LoadError> {
    let reduce_motion = MotionSetting::from_value(motion.reduce_motion.as_deref())
        .map_err(|err| LoadError::invalid("motion.reduce_motion", err.to_string()))?;
    Ok(MotionSettings {
        reduce_motion,
        system_reduced_motion: motion.system_reduced_motion.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    stale_after_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDispatchSettings {
    unknown_action: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMotionSettings {
    reduce_motion: Option<String>,
    system_reduced_motion: Option<bool>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
