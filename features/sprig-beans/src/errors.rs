use std::sync::Arc;

use sprig_props::PropsError;
use thiserror::Error;

use crate::types::{DynError, TypeInfo};

/// Coarse classification of a [`BeanError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A definition, bean or property is absent
    NotFound,
    /// Re-registration under an existing name
    Duplicate,
    /// Soft signal, the callee does not apply and the caller moves on
    Continue,
    /// More than one viable candidate where exactly one was required
    Ambiguous,
    /// A prototype was requested again while it was being created
    Circular,
    /// Malformed declaration or unsupported scope
    Invalid,
    /// A constructor or lifecycle callback failed
    Construction,
    /// Pre-instantiation did not finish in time
    Timeout,
}

/// Errors raised while defining, registering or resolving beans
#[derive(Error, Debug, Clone)]
pub enum BeanError {
    /// No definition is registered under the name
    #[error("No bean '{0}' registered")]
    DefinitionNotFound(String),

    /// Typed lookup of a required field found nothing
    #[error("No candidate found for field '{field}' with type {typ}")]
    NoCandidate { field: String, typ: TypeInfo },

    /// Reading a property failed
    #[error(transparent)]
    Property(#[from] PropsError),

    /// A definition is already registered under the name
    #[error("Cannot register bean '{0}': It is already registered")]
    DuplicateDefinition(String),

    /// A singleton is already cached under the name
    #[error("Invalid object under bean name '{0}', it already exists")]
    DuplicateSingleton(String),

    #[error("{count} primary candidates found for field '{field}' with type {typ}")]
    AmbiguousPrimary {
        count: usize,
        field: String,
        typ: TypeInfo,
    },

    #[error("{count} candidates found for field '{field}' with type {typ}")]
    AmbiguousCandidates {
        count: usize,
        field: String,
        typ: TypeInfo,
    },

    #[error("Too many functions '{count}' match the constructor filters for type '{typ}'")]
    AmbiguousConstructor { count: usize, typ: TypeInfo },

    #[error("cannot get bean '{0}' circularly")]
    Circular(String),

    /// Malformed declaration
    #[error("{0}")]
    Invalid(String),

    /// The bean cannot be handed out as the requested type
    #[error("cannot convert bean '{bean}' to '{target}'")]
    Cast { bean: String, target: &'static str },

    /// A field was written twice
    #[error("field '{0}' is already wired")]
    AlreadyWired(String),

    /// The processor or callback does not apply to the given bean
    #[error("{0}")]
    Continue(String),

    /// The bean constructor failed
    #[error("Constructor for '{bean}' failed - error: {error}")]
    Construction { bean: String, error: Arc<DynError> },

    /// A lifecycle callback of the bean failed
    #[error("{stage} of '{bean}' failed - error: {error}")]
    Lifecycle {
        bean: String,
        stage: &'static str,
        error: Arc<DynError>,
    },

    /// Initiation timed out
    #[error("Initiation timed out")]
    Timeout,
}

impl BeanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BeanError::DefinitionNotFound(_) | BeanError::NoCandidate { .. } => ErrorKind::NotFound,
            BeanError::Property(e) if e.is_not_found() => ErrorKind::NotFound,
            BeanError::Property(_) => ErrorKind::Invalid,
            BeanError::DuplicateDefinition(_) | BeanError::DuplicateSingleton(_) => {
                ErrorKind::Duplicate
            }
            BeanError::AmbiguousPrimary { .. }
            | BeanError::AmbiguousCandidates { .. }
            | BeanError::AmbiguousConstructor { .. } => ErrorKind::Ambiguous,
            BeanError::Circular(_) => ErrorKind::Circular,
            BeanError::Invalid(_) | BeanError::Cast { .. } | BeanError::AlreadyWired(_) => {
                ErrorKind::Invalid
            }
            BeanError::Continue(_) => ErrorKind::Continue,
            BeanError::Construction { .. } | BeanError::Lifecycle { .. } => ErrorKind::Construction,
            BeanError::Timeout => ErrorKind::Timeout,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::Duplicate
    }

    pub fn is_continue(&self) -> bool {
        self.kind() == ErrorKind::Continue
    }

    pub(crate) fn construction(bean: &str, error: DynError) -> Self {
        BeanError::Construction {
            bean: bean.to_string(),
            error: Arc::new(error),
        }
    }

    pub(crate) fn lifecycle(bean: &str, stage: &'static str, error: DynError) -> Self {
        BeanError::Lifecycle {
            bean: bean.to_string(),
            stage,
            error: Arc::new(error),
        }
    }
}
