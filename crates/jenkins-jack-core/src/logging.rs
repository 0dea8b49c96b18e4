use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const DEFAULT_LOG_FILTER: &str = "jenkins_jack=info,jenkins_jack_core=info,jenkins_jack_client=info";

pub const VERBOSE_LOG_FILTER: &str =
    "jenkins_jack=debug,jenkins_jack_core=debug,jenkins_jack_client=debug";

pub fn init() {
    init_with_default(DEFAULT_LOG_FILTER);
}

/// `RUST_LOG` wins over `default_filter` when set. Output goes to stderr so
/// console text on stdout stays clean.
pub fn init_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

pub fn init_verbose() {
    init_with_default(VERBOSE_LOG_FILTER);
}
