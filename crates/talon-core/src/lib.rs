//! Talon Core Object Model
//!
//! This crate provides the host side of Talon's class-based object system:
//! - Tagged-union runtime value representation
//! - Class descriptor graph (single inheritance + declared interface lists)
//! - Fixed numeric primitive table (bit widths, ranges, signedness)
//! - Multicast delegate algebra (combine/remove/invoke)

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod delegate;
pub mod primitive;
pub mod value;

pub use class::{ClassGraph, ClassId, ClassKind, ClassNode, ClassSpec, WellKnown};
pub use delegate::{Callable, Delegate};
pub use primitive::NumericKind;
pub use value::{Instance, Value};

/// Runtime invocation errors
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Null reference dereferenced by a callable
    #[error("Null reference")]
    NullReference,

    /// A callable was invoked with the wrong number of arguments
    #[error("Expected {expected} arguments, got {actual}")]
    Arity {
        /// Number of arguments the callable declares
        expected: usize,
        /// Number of arguments supplied
        actual: usize,
    },

    /// Host-level failure raised inside a callable
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Runtime invocation result
pub type CoreResult<T> = Result<T, CoreError>;
