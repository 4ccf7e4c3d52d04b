//! Tracing configuration and initialization.

use tracing_subscriber::{
    EnvFilter,
    fmt::format::FmtSpan,
    util::{SubscriberInitExt as _, TryInitError},
};

enum TrcMode {
    /// Plain, verbose output with span enter/close events.
    Verbose,
    /// Compact output without timestamps.
    Compact,
}

pub struct Trc {
    mode: TrcMode,
    env_filter: EnvFilter,
}

impl Default for Trc {
    fn default() -> Self {
        let maybe_env_filter =
            EnvFilter::try_from_env("DIRCACHE_LOG").or_else(|_| EnvFilter::try_from_default_env());

        match maybe_env_filter {
            // An explicit filter means someone is debugging; give them everything.
            Ok(env_filter) => Self {
                mode: TrcMode::Verbose,
                env_filter,
            },
            Err(_) => Self {
                mode: TrcMode::Compact,
                env_filter: EnvFilter::new("info"),
            },
        }
    }
}

impl Trc {
    pub fn init(self) -> Result<(), TryInitError> {
        match self.mode {
            TrcMode::Verbose => tracing_subscriber::fmt()
                .with_env_filter(self.env_filter)
                .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
            TrcMode::Compact => tracing_subscriber::fmt()
                .with_env_filter(self.env_filter)
                .with_target(false)
                .without_time()
                .compact()
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
        }
    }
}
