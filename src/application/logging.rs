use std::env;
use std::path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

// A subscriber installed earlier, as in tests, keeps receiving events.
fn report_init(res: Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>) {
    if let Err(err) = res {
        tracing::debug!(error = %err, "Keeping the existing log subscriber");
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`. When
/// `log-dir` is configured logs are written there as JSON, otherwise they go to
/// stderr. The returned guard must be held until exit so buffered lines flush.
pub fn init(default_filter: &str) -> Option<WorkerGuard> {
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|filter| return !filter.is_empty())
        .unwrap_or_else(|| return default_filter.to_string());

    let log_dir = Config::get(ConfigKey::LogDir);
    if log_dir.is_empty() {
        let res = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .try_init();
        report_init(res);
        return None;
    }

    let file_appender = tracing_appender::rolling::never(path::PathBuf::from(log_dir), "codeaction.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let res = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(writer)
        .try_init();
    report_init(res);

    return Some(guard);
}
