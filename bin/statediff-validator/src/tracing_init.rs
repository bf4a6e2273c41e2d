//! Sets up the process-wide tracing subscriber from [`Config`]'s log level
//! and optional log file, matching the `EnvFilter` + `fmt` layering pattern
//! used elsewhere in the corpus's tracing setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use validator_service::Config;

/// Keeps the non-blocking file writer alive for the process lifetime; drop
/// it and buffered log lines stop flushing.
pub struct LogGuard(#[allow(dead_code)] Option<tracing_appender::non_blocking::WorkerGuard>);

pub fn init(config: &Config) -> eyre::Result<LogGuard> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let Some(log_file) = &config.log_file else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).try_init()?;
        return Ok(LogGuard(None));
    };

    let directory = log_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
    let file_name = log_file.file_name().ok_or_else(|| eyre::eyre!("log_file has no file name: {}", log_file.display()))?;
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()?;

    Ok(LogGuard(Some(guard)))
}
