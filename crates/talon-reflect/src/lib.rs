//! Talon Runtime Reflection
//!
//! Reified type metadata over the Talon class graph: canonical type
//! handles, identity/subtyping/interface queries against runtime values,
//! and the `is`/`as`/`cast` operator family.

#![warn(missing_docs)]

pub mod cast;
pub mod context;
pub mod error;
pub mod handle;
pub mod query;

pub use context::Reflection;
pub use error::{ReflectError, ReflectResult};
pub use handle::TypeHandle;
