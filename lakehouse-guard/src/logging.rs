//! Logging utilities and subscriber setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary, which uses [`setup::init_logging`].

/// Truncates a string to at most `max_length` bytes, on a character boundary.
///
/// Used to keep offending values quoted in failure details short.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &value[..end];
    format!("{truncated}...(truncated)")
}

/// Maximum length of a data value quoted in an error or log message.
pub const MAX_FIELD_LENGTH: usize = 128;

/// Utilities for setting up structured logging.
pub mod setup {
    use crate::error::{PipelineError, Result};
    use tracing::Level;

    /// Configuration for the logging subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for dependencies and the application
        pub level: Level,
        /// Log level for the pipeline crates specifically
        pub pipeline_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                pipeline_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                pipeline_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::INFO,
                pipeline_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Creates a configuration for structured (JSON) logging.
        pub fn structured() -> Self {
            Self {
                level: Level::INFO,
                pipeline_level: Level::DEBUG,
                json_format: true,
                env_filter: None,
            }
        }

        /// Sets the log level for dependencies.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for the pipeline crates.
        pub fn with_pipeline_level(mut self, level: Level) -> Self {
            self.pipeline_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                let level = self.level.as_str().to_lowercase();
                let pipeline = self.pipeline_level.as_str().to_lowercase();
                format!("{level},lakehouse_guard={pipeline},lakehouse_runner={pipeline}")
            }
        }
    }

    /// Installs a global subscriber. `RUST_LOG` takes precedence over the config.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use lakehouse_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| PipelineError::Configuration(format!("Cannot install logger: {e}")))
    }
}
