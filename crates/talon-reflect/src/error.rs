//! Reflection errors

use thiserror::Error;

/// Errors raised by type resolution and casting.
///
/// All variants are raised at the point of detection and propagate to the
/// caller; the one designed soft-fail path is
/// [`Reflection::type_from_name`](crate::Reflection::type_from_name) with
/// `throw_on_error = false`, which converts `TypeLoad` conditions into an
/// absent result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReflectError {
    /// A required argument was absent
    #[error("Value cannot be null. Parameter name: {name}")]
    ArgumentNull {
        /// Name of the absent parameter
        name: &'static str,
    },

    /// A named type could not be resolved under strict resolution
    #[error("Could not load type '{name}'")]
    TypeLoad {
        /// The name that failed to resolve
        name: String,
    },

    /// A runtime value's class is incompatible with the requested class
    #[error("Unable to cast object of type '{from}' to type '{to}'")]
    InvalidCast {
        /// Qualified name of the value's class
        from: String,
        /// Qualified name of the requested class
        to: String,
    },
}

/// Reflection result
pub type ReflectResult<T> = Result<T, ReflectError>;
