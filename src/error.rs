//! Crate-wide error handling for Pilot Light.
//!
//! A single hand-rolled enum covers the error kinds the core surfaces to
//! callers. Leaf modules with a small, genuinely local error surface (the
//! chunk file reader) define their own `thiserror`-derived type and fold it
//! in via `From` rather than growing this enum forever.

use std::error::Error as StdError;
use std::fmt;
use std::sync::{MutexGuard, PoisonError, RwLockReadGuard, RwLockWriteGuard};

/// Main error type for Pilot Light.
#[derive(Debug)]
pub enum PilotLightError {
    /// API, entity, or component absent. Most call sites treat this as a
    /// local, recoverable condition rather than bubbling it up.
    NotFound {
        what: String,
        key: String,
    },

    /// Benign: the caller attempted to register something that already
    /// exists. API registration replaces in place; component registration
    /// on the same entity returns the existing slot. Surfaced as an error
    /// only where a caller asked to be told.
    DuplicateRegistration {
        what: String,
        key: String,
    },

    /// An API was requested with a minor version higher than anything
    /// registered under that name+major.
    VersionMismatch {
        name: String,
        requested_minor: u32,
        found_minor: u32,
    },

    /// A shared library could not be opened, or a required symbol could
    /// not be resolved inside it.
    LibraryLoadFailure {
        library: String,
        reason: String,
    },

    /// A caller violated an invariant the core maintains: hierarchy cycle,
    /// stale entity handle used for mutation, component access on a
    /// destroyed entity. In debug builds these are additionally checked by
    /// `debug_assert!`; in release builds this variant is the only
    /// signal the caller gets.
    InvariantViolation {
        what: String,
    },

    /// The preprocessor could not read a heightmap or write a chunk file.
    /// Fatal for the preprocessor run.
    IoError {
        path: String,
        error: String,
    },

    /// A chunk file's header or body did not parse.
    ChunkFormat {
        reason: String,
    },

    /// Configuration failed validation.
    InvalidConfig {
        field: String,
        reason: String,
    },

    /// A background/control-thread lock was poisoned by a panicking holder.
    LockPoisoned {
        resource: String,
    },
}

impl fmt::Display for PilotLightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PilotLightError::NotFound { what, key } => {
                write!(f, "{} not found: {}", what, key)
            }
            PilotLightError::DuplicateRegistration { what, key } => {
                write!(f, "{} already registered: {}", what, key)
            }
            PilotLightError::VersionMismatch {
                name,
                requested_minor,
                found_minor,
            } => write!(
                f,
                "API '{}' version mismatch: requested minor {} but highest registered is {}",
                name, requested_minor, found_minor
            ),
            PilotLightError::LibraryLoadFailure { library, reason } => {
                write!(f, "failed to load extension '{}': {}", library, reason)
            }
            PilotLightError::InvariantViolation { what } => {
                write!(f, "invariant violated: {}", what)
            }
            PilotLightError::IoError { path, error } => {
                write!(f, "I/O error for {}: {}", path, error)
            }
            PilotLightError::ChunkFormat { reason } => {
                write!(f, "malformed chunk file: {}", reason)
            }
            PilotLightError::InvalidConfig { field, reason } => {
                write!(f, "invalid config field '{}': {}", field, reason)
            }
            PilotLightError::LockPoisoned { resource } => {
                write!(f, "lock poisoned for resource: {}", resource)
            }
        }
    }
}

impl StdError for PilotLightError {}

/// Standard fallible return type for the crate.
pub type PilotLightResult<T> = Result<T, PilotLightError>;

impl From<std::io::Error> for PilotLightError {
    fn from(error: std::io::Error) -> Self {
        PilotLightError::IoError {
            path: String::new(),
            error: error.to_string(),
        }
    }
}

impl<T> From<PoisonError<MutexGuard<'_, T>>> for PilotLightError {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        PilotLightError::LockPoisoned {
            resource: "mutex".to_string(),
        }
    }
}

impl<T> From<PoisonError<RwLockReadGuard<'_, T>>> for PilotLightError {
    fn from(_: PoisonError<RwLockReadGuard<'_, T>>) -> Self {
        PilotLightError::LockPoisoned {
            resource: "rwlock_read".to_string(),
        }
    }
}

impl<T> From<PoisonError<RwLockWriteGuard<'_, T>>> for PilotLightError {
    fn from(_: PoisonError<RwLockWriteGuard<'_, T>>) -> Self {
        PilotLightError::LockPoisoned {
            resource: "rwlock_write".to_string(),
        }
    }
}

impl From<crate::terrain::chunk_file::ChunkFileError> for PilotLightError {
    fn from(err: crate::terrain::chunk_file::ChunkFileError) -> Self {
        use crate::terrain::chunk_file::ChunkFileError;
        match err {
            ChunkFileError::Io(e) => PilotLightError::IoError {
                path: String::new(),
                error: e.to_string(),
            },
            ChunkFileError::Truncated { expected, got } => PilotLightError::ChunkFormat {
                reason: format!("truncated: expected {} bytes, read {}", expected, got),
            },
            ChunkFileError::BadTreeDepth(depth) => PilotLightError::ChunkFormat {
                reason: format!("invalid tree_depth: {}", depth),
            },
        }
    }
}

/// Convert `Option` to `Result` with a `NotFound` tailored to the caller.
pub trait OptionExt<T> {
    fn ok_or_not_found(self, what: &str, key: &str) -> PilotLightResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, what: &str, key: &str) -> PilotLightResult<T> {
        self.ok_or_else(|| PilotLightError::NotFound {
            what: what.to_string(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PilotLightError::NotFound {
            what: "entity".to_string(),
            key: "42".to_string(),
        };
        assert_eq!(err.to_string(), "entity not found: 42");
    }

    #[test]
    fn test_option_ext() {
        let opt: Option<i32> = None;
        let result = opt.ok_or_not_found("component", "Transform");
        assert!(result.is_err());
    }

    #[test]
    fn test_version_mismatch_display() {
        let err = PilotLightError::VersionMismatch {
            name: "pl_ecs".to_string(),
            requested_minor: 3,
            found_minor: 1,
        };
        assert!(err.to_string().contains("requested minor 3"));
    }
}
