use std::path::PathBuf;
use std::sync::{Once, OnceLock};

use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Structured logging backed by `tracing`.
///
/// Initializes a global subscriber once: an ANSI stdout layer plus a
/// daily-rolling plain-text file sink under the platform data dir.

static INIT_LOGGING: Once = Once::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn resolve_log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("askdb")
        .join("logs")
}

fn build_file_appender() -> Option<(RollingFileAppender, PathBuf)> {
    let log_dir = resolve_log_dir();
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "[askdb][WARN] Failed to create log directory {}: {}",
            log_dir.display(),
            err
        );
        return None;
    }

    Some((RollingFileAppender::new(Rotation::DAILY, &log_dir, "askdb.log"), log_dir))
}

pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let (file_layer, log_dir) = if let Some((appender, dir)) = build_file_appender() {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(non_blocking);
            LOG_GUARD.set(guard).ok();
            (Some(layer), Some(dir))
        } else {
            (None, None)
        };

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| {
                EnvFilter::try_new(
                    std::env::var("ASKDB_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
                )
            })
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let stdout_layer = fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_timer(UtcTime::rfc_3339());

        let registry = tracing_subscriber::registry().with(filter).with(stdout_layer);
        if let Some(file_layer) = file_layer {
            registry.with(file_layer).init();
        } else {
            registry.init();
        }

        if let Some(dir) = log_dir {
            app_info(format!(
                "Logging initialized; daily-rotated logs under {}",
                dir.display()
            ));
        } else {
            app_warn("Logging initialized without file sink (stdout only)");
        }
    });
}

pub fn app_info(message: impl AsRef<str>) {
    info!(target: "askdb", "{}", message.as_ref());
}

pub fn app_warn(message: impl AsRef<str>) {
    warn!(target: "askdb", "{}", message.as_ref());
}

pub fn app_error(message: impl AsRef<str>) {
    error!(target: "askdb", "{}", message.as_ref());
}
