use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Installs a compact stdout subscriber. Library events show up under the `loadrx` target.
pub fn tracing_init(max_level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_max_level(max_level)
        .with_timer(ShortTime)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ShortTime;

impl FormatTime for ShortTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}
