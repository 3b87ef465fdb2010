//! Type system errors

use thiserror::Error;

/// Errors that can occur while resolving declared types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// A type variable was observed through something that is neither a
    /// declared class nor a parameterized type
    #[error("Source type must be a declared class or a parameterized type, but was: {found}")]
    InvalidSourceType {
        /// Rendering of the offending source type
        found: String,
    },
}
