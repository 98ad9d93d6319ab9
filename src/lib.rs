pub mod config;
pub mod models;
pub mod db;
pub mod session;
pub mod pipeline;
pub mod assistant;

pub use assistant::{AssistantError, ClinicalAssistant};
pub use config::AssistantConfig;
pub use session::SessionContext;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
