//! Tracing setup.
//!
//! The subscriber is installed before the config file is read so the
//! loader's own messages are kept. The filter starts from `RUST_LOG` or the
//! built-in default and is swapped for `logging.filter` once the config is
//! known. An explicit `RUST_LOG` always wins.

use telestrator_common::{ConfigError, TelestratorError};
use telestrator_config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

pub struct LogFilter {
    /// `None` when the filter came from `RUST_LOG`.
    handle: Option<FilterHandle>,
}

impl LogFilter {
    /// Install the global subscriber.
    pub fn install() -> Self {
        let (filter, from_env) = match EnvFilter::try_from_default_env() {
            Ok(filter) => (filter, true),
            Err(_) => (EnvFilter::new(LoggingConfig::default().filter), false),
        };
        let (layer, handle) = reload::Layer::new(filter);
        tracing_subscriber::registry()
            .with(layer)
            .with(fmt::layer())
            .init();

        Self {
            handle: (!from_env).then_some(handle),
        }
    }

    /// Replace the active filter with the configured directives.
    pub fn apply(&self, directives: &str) -> Result<(), TelestratorError> {
        let Some(handle) = &self.handle else {
            tracing::debug!("RUST_LOG is set, ignoring logging.filter");
            return Ok(());
        };
        let filter = EnvFilter::try_new(directives).map_err(|e| {
            ConfigError::ValidationError(format!("logging.filter = {directives:?}: {e}"))
        })?;
        handle
            .reload(filter)
            .map_err(|e| TelestratorError::Other(format!("failed to reload log filter: {e}")))
    }
}
