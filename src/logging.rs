//! Subscriber setup for the wirer's tracing output
//!
//! Every event uses the `autowirer` target: registrations and wiring
//! milestones at DEBUG, per-resolution detail at TRACE, unhandled wiring
//! failures at ERROR.
//!
//! # Features
//!
//! - `logging` - Emit events (default)
//! - `logging-json` - Install a JSON subscriber
//! - `logging-pretty` - Install a human-readable subscriber
//!
//! Without either subscriber feature the `init*` functions do nothing and
//! the application is expected to install its own subscriber.
//!
//! # Example
//!
//! ```rust,ignore
//! use autowirer::logging;
//!
//! logging::init();
//!
//! logging::builder()
//!     .trace()
//!     .wirer_only()
//!     .compact()
//!     .init();
//! ```

use tracing::Level;

/// Event target used by the wirer
pub const TARGET: &str = "autowirer";

/// Environment variable holding filter directives, e.g. `autowirer=trace`
pub const ENV_VAR: &str = "AUTOWIRER_LOG";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event (falls back to the default text layout
    /// without `logging-json`)
    Json,
    /// Multi-line, human-readable
    Pretty,
    /// Single line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(feature = "logging-json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Builder for the global subscriber
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    use_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::default(),
            target: None,
            use_env: true,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum level to record
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Record every resolution step
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    /// Only wiring failures
    pub fn errors_only(self) -> Self {
        self.with_level(Level::ERROR)
    }

    /// Restrict output to one target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Restrict output to the wirer's own events
    pub fn wirer_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Ignore [`ENV_VAR`] and use only the configured level and target
    pub fn ignore_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directives derived from level and target
    #[cfg(any(feature = "logging-json", feature = "logging-pretty", test))]
    fn directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Install the subscriber, failing if one is already set.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let filter = std::env::var(ENV_VAR)
            .ok()
            .filter(|_| self.use_env)
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.directives()));

        let layer = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_target(true);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        };

        tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
    }

    /// Install the subscriber. A subscriber that is already installed is
    /// kept.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// No subscriber feature enabled
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install a subscriber in the default format at DEBUG (or per [`ENV_VAR`])
pub fn init() {
    builder().init();
}

/// Install a JSON subscriber
///
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Wiring completed","singletons":3},"target":"autowirer"}
/// ```
pub fn init_json() {
    builder().json().init();
}

/// Install a pretty subscriber
pub fn init_pretty() {
    builder().pretty().init();
}

/// Install a subscriber that only shows the wirer's events
pub fn init_wirer_only() {
    builder().wirer_only().init();
}
