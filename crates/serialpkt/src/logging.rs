use std::str::FromStr;

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Overrides `--log-level` and `--engine-log-level` when set,
/// e.g. `SERIALPKT_LOG=warn,serialpkt_packet=trace`.
pub const LOG_ENV: &str = "SERIALPKT_LOG";

/// Library crates that log from inside the packet engine and transports.
const ENGINE_TARGETS: [&str; 2] = ["serialpkt_packet", "serialpkt_transport"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Per-target filter: `level` for the CLI, `engine` (if given) for the
/// engine and transport crates.
pub fn log_filter(level: LogLevel, engine: Option<LogLevel>) -> Targets {
    let targets = Targets::new().with_default(level);
    match engine {
        Some(engine) => ENGINE_TARGETS
            .into_iter()
            .fold(targets, |targets, target| targets.with_target(target, engine)),
        None => targets,
    }
}

fn resolve_filter(env: Option<&str>, level: LogLevel, engine: Option<LogLevel>) -> Targets {
    match env.map(str::trim).filter(|spec| !spec.is_empty()) {
        Some(spec) => Targets::from_str(spec).unwrap_or_else(|err| {
            eprintln!("warning: ignoring {LOG_ENV}={spec:?}: {err}");
            log_filter(level, engine)
        }),
        None => log_filter(level, engine),
    }
}

/// Send logs to stderr, keeping stdout for packet output.
pub fn init_logging(format: LogFormat, level: LogLevel, engine: Option<LogLevel>) {
    let env = std::env::var(LOG_ENV).ok();
    let filter = resolve_filter(env.as_deref(), level, engine);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = match format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
}
