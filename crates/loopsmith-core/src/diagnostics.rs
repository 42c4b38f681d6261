use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;

/// Keeps the JSON log writer flushing until dropped.
pub struct TelemetryGuard {
    pub session_id: Uuid,
    pub log_file: PathBuf,
    _file_guard: WorkerGuard,
}

/// Console output on stderr, one JSON log file per session under `log_dir`.
/// `RUST_LOG` overrides the configured filter.
pub fn init_tracing(log_dir: &Path, config: &DiagnosticsConfig) -> anyhow::Result<TelemetryGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let file_name = session_log_name(&config.trace_file_prefix, Utc::now(), session_id);
    let log_file = log_dir.join(&file_name);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &file_name));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.rust_log_filter));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_span_list(true)
                .with_writer(file_writer),
        )
        .try_init();

    match installed {
        Ok(()) => info!(%session_id, log_file = %log_file.display(), "tracing initialized"),
        Err(error) => warn!(?error, "tracing subscriber was already installed"),
    }

    Ok(TelemetryGuard {
        session_id,
        log_file,
        _file_guard: file_guard,
    })
}

fn session_log_name(prefix: &str, started: DateTime<Utc>, session_id: Uuid) -> String {
    let short_id = session_id.simple().to_string();
    format!("{prefix}-{}-{}.log", started.format("%Y%m%d-%H%M%S"), &short_id[..8])
}
