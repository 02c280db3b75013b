use tauri::{AppHandle, Runtime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

use crate::{shared::log_dir, LOG_ENV_VAR, LOG_FILE_PREFIX};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("info,lobby_desktop=debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Installs the global subscriber: stderr plus a daily file under the app log
/// directory. The returned guard flushes the file writer and must outlive the app.
pub(crate) fn init<R: Runtime>(app: &AppHandle<R>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match log_dir(app) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
            let installed = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(file_layer)
                .try_init();
            if installed.is_err() {
                return None;
            }
            tracing::info!(dir = %dir.display(), "file logging enabled");
            Some(guard)
        }
        Err(error) => {
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .try_init();
            tracing::warn!("file logging disabled: {error}");
            None
        }
    }
}
