use backtrace::Backtrace;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// When LOG_PATH is set, logs go to a daily-rolling file; otherwise stdout.
pub fn setup_tracing() -> Option<WorkerGuard> {
    let registry = tracing_subscriber::registry().with(EnvFilter::from_env("LOG_LEVEL"));

    let guard = if let Ok(log_path) = std::env::var("LOG_PATH") {
        let file_appender = tracing_appender::rolling::daily(log_path, "app.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(non_blocking);

        registry.with(fmt_layer).init();
        Some(guard)
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
        None
    };

    set_panic_hook();

    guard
}

fn set_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        let b = Backtrace::new();
        if let Some(location) = panic.location() {
            tracing::error!(
                message = %panic,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
                backtrace = ?b,
            );
        } else {
            tracing::error!(message = %panic, backtrace = ?b);
        }
    }));
}
