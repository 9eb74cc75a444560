use std::sync::Once;

use tracing_subscriber::filter::Directive;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVES: [&str; 3] = [
    "patient_billing=info",
    "billing_core=info",
    "billing_storage_json=info",
];

/// Initializes the global tracing subscriber. `RUST_LOG` entries are kept and the
/// billing crates default to `info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = DEFAULT_DIRECTIVES
            .iter()
            .filter_map(|raw| raw.parse::<Directive>().ok())
            .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);

        // A host may already own the global subscriber.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
