//! Error types for class registration, metadata building and accessor use

use refract_types::TypeError;
use thiserror::Error;

/// Errors raised by the reflection engine
#[derive(Debug, Error)]
pub enum ReflectError {
    /// A getter or setter was requested for a name the class does not expose
    #[error("There is no {kind} for property named '{property}' in '{class}'")]
    NoSuchProperty {
        /// Requested property name
        property: String,
        /// Class the metadata describes
        class: String,
        /// `getter` or `setter`
        kind: &'static str,
    },

    /// The property resolved to structurally unrelated candidates
    #[error("{0}")]
    AmbiguousMember(String),

    /// The class declares no zero-argument constructor
    #[error("There is no default constructor for {class}")]
    NoDefaultConstructor {
        /// Class name
        class: String,
    },

    /// A restricted member was used and the access override is not granted
    #[error("Access denied to {member}")]
    AccessDenied {
        /// Qualified member name
        member: String,
    },

    /// A method name has no `is`/`get`/`set` prefix
    #[error("Error parsing property name '{name}'.  Didn't start with 'is', 'get' or 'set'.")]
    InvalidAccessorName {
        /// Offending method name
        name: String,
    },

    /// The underlying member call failed
    #[error("Error invoking {member}: {reason}")]
    InvocationFailure {
        /// Qualified member name
        member: String,
        /// Failure reported by the member
        reason: String,
    },

    /// No class with this id or name is registered
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// A class with this name is already registered
    #[error("Class already registered: {0}")]
    DuplicateClass(String),

    /// Registration would produce an invalid hierarchy
    #[error("Invalid class hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Permissions for a sealed class cannot change
    #[error("Cannot modify sealed permissions for class {0}")]
    PermissionsSealed(String),

    /// Generic type resolution failed
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading a configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Outcome of a raw member call, before the accessor's retry policy applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The member is not public and has not been made accessible
    IllegalAccess,
    /// The call itself failed
    Target(String),
}

impl InvokeError {
    /// Convert into the public error for `member`
    pub(crate) fn into_reflect(self, member: &str) -> ReflectError {
        match self {
            InvokeError::IllegalAccess => ReflectError::AccessDenied {
                member: member.to_string(),
            },
            InvokeError::Target(reason) => ReflectError::InvocationFailure {
                member: member.to_string(),
                reason,
            },
        }
    }
}
