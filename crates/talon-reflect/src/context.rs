//! Reflection context
//!
//! [`Reflection`] owns the process-lifetime memoization state: the canonical
//! handle intern table and the transitive interface-closure cache. Both grow
//! monotonically and are never evicted; the write-once-per-key access
//! pattern makes the concurrent maps sufficient without outer locking.

use crate::error::{ReflectError, ReflectResult};
use crate::handle::TypeHandle;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use talon_core::{ClassGraph, ClassId, ClassKind, Value};

/// Injectable predicate deciding runtime type tests for foreign values.
///
/// Receives the value and the target descriptor id; returns whether the
/// value should be considered an instance of the target.
pub type ForeignProbe = Box<dyn Fn(&Value, ClassId) -> bool + Send + Sync>;

/// Reflection engine over a class graph.
///
/// Pure query layer: the descriptor graph is immutable after declaration
/// and every cache here is monotonic, so queries never observe a type
/// changing shape.
pub struct Reflection {
    pub(crate) graph: Arc<ClassGraph>,
    pub(crate) handles: DashMap<ClassId, Arc<TypeHandle>>,
    pub(crate) iface_closure: DashMap<ClassId, Arc<FxHashSet<ClassId>>>,
    pub(crate) foreign_probe: RwLock<Option<ForeignProbe>>,
}

impl Reflection {
    /// Create a reflection engine over a class graph
    pub fn new(graph: Arc<ClassGraph>) -> Self {
        Self {
            graph,
            handles: DashMap::new(),
            iface_closure: DashMap::new(),
            foreign_probe: RwLock::new(None),
        }
    }

    /// The underlying class graph
    pub fn graph(&self) -> &Arc<ClassGraph> {
        &self.graph
    }

    /// Install the predicate used for type tests on foreign values.
    ///
    /// Without a probe, foreign values pass every type test. This is a
    /// trust boundary: the embedder that introduces foreign values into the
    /// system owns the decision of what they may be cast to.
    pub fn set_foreign_probe(
        &self,
        probe: impl Fn(&Value, ClassId) -> bool + Send + Sync + 'static,
    ) {
        *self.foreign_probe.write() = Some(Box::new(probe));
    }

    /// Descriptor id a handle is interned under: numeric primitives all
    /// display as the unified `System.Number` class. Range and subtype
    /// checks keep the original id; only reflection display unifies.
    pub(crate) fn display_id(&self, id: ClassId) -> ClassId {
        let node = self.graph.node(id);
        if node.kind == ClassKind::ValueType && node.numeric.is_some() {
            self.graph.well_known().number
        } else {
            id
        }
    }

    /// The canonical handle for a descriptor.
    ///
    /// The first call for a descriptor constructs and interns the handle;
    /// every later call returns the same `Arc`.
    pub fn handle_for(&self, id: ClassId) -> Arc<TypeHandle> {
        let id = self.display_id(id);
        if let Some(handle) = self.handles.get(&id) {
            return handle.clone();
        }
        let node = self.graph.node(id);
        let handle = Arc::new(TypeHandle::new(id, node.name.clone(), node.kind));
        self.handles.entry(id).or_insert(handle).value().clone()
    }

    /// The canonical handle for a runtime value's class.
    ///
    /// Panics on `Nil` and on foreign values: a value without a class
    /// descriptor is a host-level contract violation, not a condition this
    /// layer checks.
    pub fn get_type(&self, value: &Value) -> Arc<TypeHandle> {
        let wk = self.graph.well_known();
        let id = match value {
            Value::Nil => panic!("cannot reflect the type of nil"),
            Value::Bool(_) => wk.boolean,
            Value::Number(_) => wk.number,
            Value::Str(_) => wk.string,
            Value::Object(obj) => obj.class,
            Value::Callable(_) => wk.delegate,
            Value::Foreign(_) => panic!("foreign value carries no class descriptor"),
        };
        self.handle_for(id)
    }

    /// Handle of the parent class, absent at roots
    pub fn base_of(&self, handle: &TypeHandle) -> Option<Arc<TypeHandle>> {
        self.graph.parent(handle.id()).map(|p| self.handle_for(p))
    }

    /// Resolve a handle from a qualified name.
    ///
    /// `None` as the name raises `ArgumentNull`. An empty or unknown name
    /// raises `TypeLoad` when `throw_on_error` is set and resolves to an
    /// absent result otherwise. Case-insensitive lookup is not supported;
    /// requesting it is a caller contract violation and panics.
    pub fn type_from_name(
        &self,
        name: Option<&str>,
        throw_on_error: bool,
        ignore_case: bool,
    ) -> ReflectResult<Option<Arc<TypeHandle>>> {
        assert!(
            !ignore_case,
            "case-insensitive type lookup is not supported"
        );
        let name = name.ok_or(ReflectError::ArgumentNull { name: "typeName" })?;
        if name.is_empty() {
            return if throw_on_error {
                Err(ReflectError::TypeLoad { name: name.into() })
            } else {
                Ok(None)
            };
        }
        match self.graph.find(name) {
            Some(id) => Ok(Some(self.handle_for(id))),
            None if throw_on_error => Err(ReflectError::TypeLoad { name: name.into() }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talon_core::NumericKind;

    fn reflection() -> Reflection {
        Reflection::new(Arc::new(ClassGraph::new()))
    }

    #[test]
    fn test_handle_interning_is_stable() {
        let r = reflection();
        let wk = r.graph().well_known().clone();

        let a = r.handle_for(wk.string);
        let b = r.handle_for(wk.string);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_numeric_primitives_unify_to_number() {
        let r = reflection();
        let wk = r.graph().well_known().clone();

        let number = r.handle_for(wk.number);
        for kind in NumericKind::ALL {
            let h = r.handle_for(wk.numeric(kind));
            assert!(Arc::ptr_eq(&h, &number));
        }
        assert_eq!(number.full_name(), "System.Number");
    }

    #[test]
    fn test_get_type_per_value_kind() {
        let r = reflection();
        let wk = r.graph().well_known().clone();

        assert_eq!(r.get_type(&Value::Number(1.0)).id(), wk.number);
        assert_eq!(r.get_type(&Value::str("x")).id(), wk.string);
        assert_eq!(r.get_type(&Value::Bool(true)).id(), wk.boolean);
    }

    #[test]
    #[should_panic(expected = "nil")]
    fn test_get_type_of_nil_is_a_contract_violation() {
        reflection().get_type(&Value::Nil);
    }

    #[test]
    fn test_base_of_walks_parent() {
        let r = reflection();
        let wk = r.graph().well_known().clone();

        let string = r.handle_for(wk.string);
        let base = r.base_of(&string).unwrap();
        assert_eq!(base.id(), wk.object);
        assert!(r.base_of(&base).is_none());
    }

    #[test]
    fn test_type_from_name_resolution() {
        let r = reflection();
        let h = r
            .type_from_name(Some("System.String"), true, false)
            .unwrap()
            .unwrap();
        assert_eq!(h.name(), "String");
    }

    #[test]
    fn test_type_from_name_absent_name() {
        let r = reflection();
        assert_eq!(
            r.type_from_name(None, false, false),
            Err(ReflectError::ArgumentNull { name: "typeName" })
        );
    }

    #[test]
    fn test_type_from_name_empty_name() {
        let r = reflection();
        assert_eq!(
            r.type_from_name(Some(""), true, false),
            Err(ReflectError::TypeLoad { name: String::new() })
        );
        assert_eq!(r.type_from_name(Some(""), false, false), Ok(None));
    }

    #[test]
    fn test_type_from_name_unknown_name() {
        let r = reflection();
        assert!(matches!(
            r.type_from_name(Some("No.Such"), true, false),
            Err(ReflectError::TypeLoad { .. })
        ));
        assert_eq!(r.type_from_name(Some("No.Such"), false, false), Ok(None));
    }

    #[test]
    #[should_panic(expected = "case-insensitive")]
    fn test_ignore_case_is_unsupported() {
        let r = reflection();
        let _ = r.type_from_name(Some("system.string"), false, true);
    }
}
