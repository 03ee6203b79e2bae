//! Tracing subscriber setup for the CLI
//!
//! The library only emits spans and events (plus `log` records, which the
//! subscriber picks up through `tracing-log`). Applications decide where they
//! go; this module is the CLI's answer.

#[cfg(feature = "tracing-files")]
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Colored, compact human-readable output
    Console,
    /// Plain compact output for CI logs
    Compact,
    /// One JSON object per event
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// stderr
    Console,
    /// Append to a file, never rotated
    #[cfg(feature = "tracing-files")]
    File(PathBuf),
}

/// Keeps background log writers alive; drop it at the end of `main`
#[derive(Default)]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level from repeated `-v` flags
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Explicit filter directives, overriding verbosity
    pub env_filter: Option<String>,
    /// Session ID logged at startup for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Filter directive for the verbosity level
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn,product_studio=info",
            1 => "info,product_studio=debug",
            _ => "debug,product_studio=trace",
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directives
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        use tracing_subscriber::fmt;

        let filter = match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };
        let registry = Registry::default().with(filter);
        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();

        match &self.output {
            TracingOutput::Console => match self.format {
                TracingFormat::Console => registry
                    .with(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_ansi(true)
                            .with_target(false)
                            .compact(),
                    )
                    .try_init()?,
                TracingFormat::Compact => registry
                    .with(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_ansi(false)
                            .with_target(false)
                            .compact(),
                    )
                    .try_init()?,
                #[cfg(feature = "tracing-json")]
                TracingFormat::Json => registry
                    .with(
                        fmt::layer()
                            .json()
                            .with_writer(std::io::stderr)
                            .with_current_span(true)
                            .with_span_list(true),
                    )
                    .try_init()?,
            },

            #[cfg(feature = "tracing-files")]
            TracingOutput::File(path) => {
                use tracing_appender::{non_blocking, rolling};

                let directory = path
                    .parent()
                    .map_or_else(|| PathBuf::from("."), PathBuf::from);
                let file_name = path
                    .file_name()
                    .map_or_else(|| "product-studio.log".into(), |name| name.to_os_string());
                let (writer, file_guard) = non_blocking(rolling::never(directory, file_name));
                guard._file_guard = Some(file_guard);

                match self.format {
                    #[cfg(feature = "tracing-json")]
                    TracingFormat::Json => registry
                        .with(fmt::layer().json().with_writer(writer).with_current_span(true))
                        .try_init()?,
                    _ => registry
                        .with(fmt::layer().with_ansi(false).with_writer(writer).compact())
                        .try_init()?,
                }
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Product studio session started");
        }

        Ok(guard)
    }
}

/// Fresh session ID for log correlation
#[must_use]
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Span helpers for the CLI's top-level operations
pub mod spans {
    use tracing::{Level, Span};

    /// Whole CLI invocation
    pub fn session(session_id: &str, remover: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            remover = %remover
        )
    }

    /// One input file through the pipeline
    pub fn file_processing(file_path: &std::path::Path, aspect_ratio: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "file_processing",
            file_path = %file_path.display(),
            aspect_ratio = %aspect_ratio
        )
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{error, info, warn};

    /// User-facing progress line
    pub fn progress(message: &str) {
        info!("{}", message);
    }

    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(error = %error, context = %context, "Operation failed");
    }

    pub fn warning_with_recommendation(message: &str, recommendation: &str) {
        warn!(recommendation = %recommendation, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(TracingConfig::new().verbosity_to_filter(), "warn,product_studio=info");
        assert_eq!(
            TracingConfig::new().with_verbosity(1).verbosity_to_filter(),
            "info,product_studio=debug"
        );
        assert_eq!(
            TracingConfig::new().with_verbosity(2).verbosity_to_filter(),
            "debug,product_studio=trace"
        );
        assert_eq!(
            TracingConfig::new().with_verbosity(9).verbosity_to_filter(),
            "debug,product_studio=trace"
        );
    }

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::new()
            .with_verbosity(2)
            .with_format(TracingFormat::Compact)
            .with_env_filter("product_studio=trace")
            .with_session_id("test-session");

        assert_eq!(config.verbosity, 2);
        assert_eq!(config.format, TracingFormat::Compact);
        assert_eq!(config.env_filter.as_deref(), Some("product_studio=trace"));
        assert_eq!(config.session_id.as_deref(), Some("test-session"));
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
        assert_eq!(new_session_id().len(), 36);
    }

    #[cfg(feature = "tracing-json")]
    #[test]
    fn test_json_format() {
        let config = TracingConfig::new().with_format(TracingFormat::Json);
        assert_eq!(config.format, TracingFormat::Json);
    }

    #[cfg(feature = "tracing-files")]
    #[test]
    fn test_file_output() {
        let config = TracingConfig::new().with_output(TracingOutput::File(PathBuf::from("studio.log")));
        assert_eq!(config.output, TracingOutput::File(PathBuf::from("studio.log")));
    }

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.format, TracingFormat::Console);
        assert_eq!(config.output, TracingOutput::Console);
        assert!(config.env_filter.is_none());
    }
}
