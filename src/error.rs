//! Error types for wiring and teardown

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error returned by user factories, listeners and lifecycle hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while registering, resolving or tearing down singletons
#[derive(Error, Debug)]
pub enum DiError {
    /// Type does not declare exactly one constructor
    #[error("Auto-wired types need exactly one constructor, {type_name} declares {found}")]
    InvalidConstructorShape {
        type_name: &'static str,
        found: usize,
    },

    /// More than one registered constructor provides the requested type
    #[error("Multiple possible constructors of type {type_name} ({})", .candidates.join(", "))]
    AmbiguousConstructor {
        type_name: &'static str,
        candidates: Vec<&'static str>,
    },

    /// More than one existing singleton satisfies the requested type
    #[error("Found multiple possible instances of type {type_name} ({})", .candidates.join(", "))]
    AmbiguousInstance {
        type_name: &'static str,
        candidates: Vec<&'static str>,
    },

    /// No registered constructor provides the requested type
    #[error("Unknown dependency: {type_name}")]
    UnknownDependency { type_name: &'static str },

    /// Type was requested again while it was still being constructed
    #[error("Circular dependency detected: {type_name} of parent {}", .parent.unwrap_or("<none>"))]
    CircularDependency {
        type_name: &'static str,
        parent: Option<&'static str>,
    },

    /// Resolved argument does not have the type the factory asked for
    #[error("Argument {index} is not a {expected} (found {found})")]
    ArgumentMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// User factory failed to create the service
    #[error("Failed to create {type_name}")]
    FactoryFailed {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    /// Instantiation listener failed
    #[error("Instantiation listener for {type_name} failed")]
    ListenerFailed {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    /// `Initializable::initialize` failed
    #[error("Failed to initialize {type_name}")]
    InitializationFailed {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    /// One or more teardown actions failed
    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    /// The wirer behind a handle was dropped
    #[error("AutoWirer has been dropped")]
    WirerDropped,
}

impl DiError {
    /// Create an InvalidConstructorShape error for a type
    #[inline]
    pub fn invalid_shape<T: ?Sized + 'static>(found: usize) -> Self {
        Self::InvalidConstructorShape {
            type_name: std::any::type_name::<T>(),
            found,
        }
    }

    /// Create an UnknownDependency error
    #[inline]
    pub fn unknown(type_name: &'static str) -> Self {
        Self::UnknownDependency { type_name }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(type_name: &'static str, parent: Option<&'static str>) -> Self {
        Self::CircularDependency { type_name, parent }
    }

    /// Create a FactoryFailed error
    #[inline]
    pub fn factory_failed(type_name: &'static str, source: impl Into<BoxError>) -> Self {
        Self::FactoryFailed {
            type_name,
            source: source.into(),
        }
    }

    /// Whether this error means the dependency graph itself is unusable
    /// (as opposed to user code failing inside it)
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConstructorShape { .. }
                | Self::AmbiguousConstructor { .. }
                | Self::AmbiguousInstance { .. }
                | Self::UnknownDependency { .. }
                | Self::CircularDependency { .. }
        )
    }
}

/// A single failed teardown action.
#[derive(Error, Debug)]
#[error("cleanup of {type_name} failed: {source}")]
pub struct TeardownFailure {
    /// Concrete type of the instance being torn down
    pub type_name: &'static str,
    /// What the hook returned
    #[source]
    pub source: BoxError,
}

/// Aggregated teardown failures: the first one is the primary cause, the
/// rest are carried along as suppressed.
#[derive(Error, Debug)]
#[error("{primary}{}", suppressed_note(.suppressed))]
pub struct CleanupError {
    #[source]
    primary: TeardownFailure,
    suppressed: Vec<TeardownFailure>,
}

impl CleanupError {
    /// Build from failures in occurrence order. Returns `None` when empty.
    pub fn from_failures(failures: Vec<TeardownFailure>) -> Option<Self> {
        let mut failures = failures.into_iter();
        let primary = failures.next()?;
        Some(Self {
            primary,
            suppressed: failures.collect(),
        })
    }

    /// The first failure that occurred
    pub fn primary(&self) -> &TeardownFailure {
        &self.primary
    }

    /// Every failure after the first
    pub fn suppressed(&self) -> &[TeardownFailure] {
        &self.suppressed
    }

    /// All failures, primary first
    pub fn failures(&self) -> impl Iterator<Item = &TeardownFailure> {
        std::iter::once(&self.primary).chain(self.suppressed.iter())
    }

    /// Total number of failures
    pub fn len(&self) -> usize {
        1 + self.suppressed.len()
    }

    /// Always false, an aggregate holds at least one failure
    pub fn is_empty(&self) -> bool {
        false
    }
}

fn suppressed_note(suppressed: &[TeardownFailure]) -> String {
    match suppressed.len() {
        0 => String::new(),
        n => format!(" ({n} more suppressed)"),
    }
}

/// Result type alias for wiring operations
pub type Result<T> = std::result::Result<T, DiError>;
