use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the global logger, `info` unless `RUST_LOG` says otherwise. Safe to call more than
/// once
pub fn init() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .init();
    });
}
