//! Type query engine
//!
//! Identity, subtyping and interface-implementation queries over handles
//! and runtime values. Everything here is a pure function over the
//! immutable descriptor graph plus the monotonic memoization caches on
//! [`Reflection`].

use crate::context::Reflection;
use crate::handle::TypeHandle;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use talon_core::{ClassId, ClassKind, Value};

impl Reflection {
    /// Transitive closure of declared interfaces: every interface declared
    /// by the descriptor itself and by each ancestor along the parent
    /// chain. Computed once per descriptor and memoized.
    ///
    /// Interface extension is deliberately not expanded here; that walk
    /// happens per query in [`Reflection::implements`].
    pub(crate) fn interface_closure(&self, id: ClassId) -> Arc<FxHashSet<ClassId>> {
        if let Some(cached) = self.iface_closure.get(&id) {
            return cached.clone();
        }
        let mut set = FxHashSet::default();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            set.extend(self.graph.interfaces(current));
            cursor = self.graph.parent(current);
        }
        let set = Arc::new(set);
        self.iface_closure
            .entry(id)
            .or_insert(set)
            .value()
            .clone()
    }

    /// Check if `id` implements `iface`, walking declared interfaces of
    /// the full ancestor chain and the interfaces those interfaces extend.
    pub(crate) fn implements(&self, id: ClassId, iface: ClassId) -> bool {
        let closure = self.interface_closure(id);
        if closure.contains(&iface) {
            return true;
        }
        closure.iter().any(|&declared| self.implements(declared, iface))
    }

    /// Walk the parent chain of `id` looking for `ancestor`; strict, so a
    /// descriptor is never a subclass of itself.
    pub(crate) fn is_subclass(&self, id: ClassId, ancestor: ClassId) -> bool {
        let mut cursor = self.graph.parent(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.graph.parent(current);
        }
        false
    }

    /// All interfaces a handle's type implements through itself and its
    /// ancestors, as canonical handles in declaration order.
    pub fn interfaces_of(&self, handle: &TypeHandle) -> Vec<Arc<TypeHandle>> {
        let closure = self.interface_closure(handle.id());
        let mut ids: Vec<ClassId> = closure.iter().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| self.handle_for(id)).collect()
    }

    /// Check if `handle`'s type transitively implements `iface`
    pub fn implements_interface(&self, handle: &TypeHandle, iface: &TypeHandle) -> bool {
        self.implements(handle.id(), iface.id())
    }

    /// Check if `other` is a strict proper ancestor of `handle`
    pub fn is_subclass_of(&self, handle: &TypeHandle, other: &TypeHandle) -> bool {
        self.is_subclass(handle.id(), other.id())
    }

    /// Assignability: reflexive on identical handles, interface targets
    /// accept implementors, class targets accept subclasses.
    pub fn is_assignable_from(&self, target: &TypeHandle, source: Option<&TypeHandle>) -> bool {
        let source = match source {
            None => return false,
            Some(s) => s,
        };
        if target == source {
            return true;
        }
        if target.is_interface() {
            return self.implements(source.id(), target.id());
        }
        self.is_subclass(source.id(), target.id())
    }

    /// Check a runtime value against a handle's type
    pub fn is_instance_of(&self, target: &TypeHandle, value: &Value) -> bool {
        match value {
            Value::Nil => false,
            v => self.is_assignable_from(target, Some(&self.get_type(v))),
        }
    }

    /// The low-level runtime type test, dispatching on the value's host
    /// representation kind.
    ///
    /// The universal `System.Object` target accepts every present value.
    /// Numbers check the target's declared range (integral kinds reject
    /// fractional values, rangeless floating kinds accept everything, enum
    /// targets check their numeric backing) and fall back to the unified
    /// number class's interface set for interface targets. Strings and
    /// booleans match their own descriptor or an interface it implements.
    /// Objects match exactly, by interface implementation, or by ancestor
    /// walk. Callables match only the shared delegate class. Foreign values
    /// defer to the installed probe and pass permissively without one.
    pub fn is_type_of(&self, value: &Value, target: ClassId) -> bool {
        let wk = self.graph.well_known();
        if target == wk.object {
            return !value.is_nil();
        }
        match value {
            Value::Nil => false,
            Value::Number(n) => self.number_is(*n, target),
            Value::Str(_) => target == wk.string || self.implements(wk.string, target),
            Value::Bool(_) => target == wk.boolean || self.implements(wk.boolean, target),
            Value::Object(obj) => {
                if obj.class == target {
                    return true;
                }
                match self.graph.kind(target) {
                    ClassKind::Interface => self.implements(obj.class, target),
                    _ => self.is_subclass(obj.class, target),
                }
            }
            Value::Callable(_) => target == wk.delegate,
            Value::Foreign(_) => match self.foreign_probe.read().as_ref() {
                Some(probe) => probe(value, target),
                None => true,
            },
        }
    }

    fn number_is(&self, n: f64, target: ClassId) -> bool {
        let wk = self.graph.well_known();
        if target == wk.number {
            return true;
        }
        let node = self.graph.node(target);
        match node.kind {
            ClassKind::Interface => self.implements(wk.number, target),
            _ => node.numeric.map(|kind| kind.accepts(n)).unwrap_or(false),
        }
    }
}
