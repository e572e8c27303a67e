use tracing::Level;
use tracing_subscriber::{filter, fmt::format::Pretty, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LEVEL: Level = Level::DEBUG;

fn target_filter() -> filter::Targets {
    filter::Targets::new()
        .with_target("gltf", Level::INFO)
        .with_default(DEFAULT_LEVEL)
}

/// Route `tracing` to the browser console and the performance timeline.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logger() {
    console_error_panic_hook::set_once();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false) // Only partially supported across browsers
        .without_time() // std::time is not available in browsers
        .with_writer(tracing_web::MakeWebConsoleWriter::new());
    let perf_layer = tracing_web::performance_layer().with_details_from_fields(Pretty::default());

    // A second viewer on the same page finds the subscriber already set
    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(perf_layer)
        .with(target_filter())
        .try_init();
}
