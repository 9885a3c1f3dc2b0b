//! Runtime casting: the `is` / `as` / `cast` operator family
//!
//! `is` answers the question, `as` soft-converts to an absent result on
//! mismatch, and `cast` raises `InvalidCast` at the point of failure. A
//! null cast to a value type produces that type's zero default instead of
//! failing; a null cast to a reference type stays null.

use crate::context::Reflection;
use crate::error::{ReflectError, ReflectResult};
use talon_core::{ClassId, ClassKind, Value};

impl Reflection {
    /// The `is` operator: value present and of the target type
    pub fn is(&self, value: &Value, target: ClassId) -> bool {
        !value.is_nil() && self.is_type_of(value, target)
    }

    /// The `as` operator: the value unchanged when `is` holds, absent
    /// otherwise
    pub fn as_type(&self, value: &Value, target: ClassId) -> Option<Value> {
        if self.is(value, target) {
            Some(value.clone())
        } else {
            None
        }
    }

    /// The checked cast operator.
    ///
    /// Nil casts to a value type yield the type's zero default and nil
    /// casts to a reference type stay nil; any other mismatch raises
    /// `InvalidCast` naming both classes.
    pub fn cast(&self, target: ClassId, value: &Value) -> ReflectResult<Value> {
        if value.is_nil() {
            return Ok(self.null_default(target));
        }
        if self.is_type_of(value, target) {
            return Ok(value.clone());
        }
        Err(ReflectError::InvalidCast {
            from: self.value_class_name(value),
            to: self.graph.name(target).to_string(),
        })
    }

    /// Zero default produced by a nil cast: numerics and enums go to zero,
    /// booleans to false. A value type with no numeric backing has no field
    /// template to instantiate here and degrades to nil, as does every
    /// reference type.
    fn null_default(&self, target: ClassId) -> Value {
        let wk = self.graph.well_known();
        let node = self.graph.node(target);
        match node.kind {
            ClassKind::ValueType | ClassKind::Enum => {
                if let Some(kind) = node.numeric {
                    Value::Number(kind.zero())
                } else if target == wk.boolean {
                    Value::Bool(false)
                } else if target == wk.number {
                    Value::Number(0.0)
                } else {
                    Value::Nil
                }
            }
            _ => Value::Nil,
        }
    }

    /// Qualified class name of a value for diagnostics. Foreign values have
    /// no descriptor and report their host kind instead.
    fn value_class_name(&self, value: &Value) -> String {
        match value {
            Value::Foreign(_) => "<foreign>".to_string(),
            Value::Nil => "<nil>".to_string(),
            v => self.get_type(v).full_name().to_string(),
        }
    }
}
