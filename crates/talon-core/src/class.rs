//! Class descriptor graph
//!
//! Every runtime value's class is described by a descriptor node in a
//! [`ClassGraph`]: a qualified name, an optional parent (single
//! inheritance), the declared interface list, and a kind tag. Nodes are
//! arena-stored and addressed by opaque [`ClassId`] handles; identity is the
//! id, never the name, so two declarations under the same name are distinct
//! types.
//!
//! Edges may only point at already-declared ids, which keeps the graph
//! acyclic by construction. The graph grows monotonically for the process
//! lifetime; there is no eviction.

use crate::primitive::{NumericKind, NUMERIC_KIND_COUNT};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a class descriptor within a graph.
///
/// Ids order by declaration: earlier declarations compare smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Kind tag of a class descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Ordinary reference class
    Class,
    /// Interface
    Interface,
    /// Value type
    ValueType,
    /// Enumeration (numeric backed value type)
    Enum,
}

/// One descriptor node in the graph
#[derive(Debug, Clone)]
pub struct ClassNode {
    /// Dotted qualified name; a trailing `[...]` suffix marks a generic class
    pub name: Arc<str>,
    /// Single-inheritance edge, absent at roots
    pub parent: Option<ClassId>,
    /// Declared (not transitively expanded) interface set
    pub interfaces: Vec<ClassId>,
    /// Kind tag
    pub kind: ClassKind,
    /// Numeric backing, set for primitive numeric descriptors and enums
    pub numeric: Option<NumericKind>,
}

/// Declaration request for [`ClassGraph::declare`]
#[derive(Debug, Clone)]
pub struct ClassSpec {
    name: String,
    parent: Option<ClassId>,
    interfaces: Vec<ClassId>,
    kind: ClassKind,
    numeric: Option<NumericKind>,
}

impl ClassSpec {
    fn new(name: &str, kind: ClassKind) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            interfaces: Vec::new(),
            kind,
            numeric: None,
        }
    }

    /// Declare an ordinary reference class
    pub fn class(name: &str) -> Self {
        Self::new(name, ClassKind::Class)
    }

    /// Declare an interface
    pub fn interface(name: &str) -> Self {
        Self::new(name, ClassKind::Interface)
    }

    /// Declare a value type
    pub fn value_type(name: &str) -> Self {
        Self::new(name, ClassKind::ValueType)
    }

    /// Declare an enumeration, backed by `Int32` unless overridden
    pub fn enumeration(name: &str) -> Self {
        let mut spec = Self::new(name, ClassKind::Enum);
        spec.numeric = Some(NumericKind::Int32);
        spec
    }

    /// Set the parent class
    pub fn parent(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add declared interfaces
    pub fn implements(mut self, interfaces: impl IntoIterator<Item = ClassId>) -> Self {
        self.interfaces.extend(interfaces);
        self
    }

    /// Override the numeric backing (primitives and enums)
    pub fn backed_by(mut self, kind: NumericKind) -> Self {
        self.numeric = Some(kind);
        self
    }
}

/// Well-known descriptor ids seeded into every graph
#[derive(Debug, Clone)]
pub struct WellKnown {
    /// `System.Object`, the universal root
    pub object: ClassId,
    /// `System.ValueType`
    pub value_type: ClassId,
    /// `System.Enum`, base of all enumerations
    pub enum_base: ClassId,
    /// `System.String`
    pub string: ClassId,
    /// `System.Boolean`
    pub boolean: ClassId,
    /// `System.Delegate`, the shared signature-erased delegate class
    pub delegate: ClassId,
    /// `System.Number`, the unified boxed numeric class
    pub number: ClassId,
    /// `System.IComparable`
    pub comparable: ClassId,
    /// `System.IEquatable`
    pub equatable: ClassId,
    /// `System.IFormattable`
    pub formattable: ClassId,
    /// `System.IConvertible`
    pub convertible: ClassId,
    /// Primitive numeric descriptors, indexed by [`NumericKind::index`]
    pub numerics: [ClassId; NUMERIC_KIND_COUNT],
}

impl WellKnown {
    /// Id of the descriptor for a numeric primitive kind
    pub fn numeric(&self, kind: NumericKind) -> ClassId {
        self.numerics[kind.index()]
    }
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: Vec<Arc<ClassNode>>,
    by_name: FxHashMap<Arc<str>, ClassId>,
}

/// Arena of class descriptor nodes.
///
/// Shared as `Arc<ClassGraph>` between the host runtime and the reflection
/// layer. Declarations append under a write lock; all queries take read
/// locks and clone the `Arc`ed node out, so the read-mostly access pattern
/// never holds a lock across caller code.
#[derive(Debug)]
pub struct ClassGraph {
    inner: RwLock<GraphInner>,
    well_known: WellKnown,
}

impl ClassGraph {
    /// Create a graph with the standard descriptors seeded.
    ///
    /// Seeds `System.Object`, `System.ValueType`, `System.Enum`,
    /// `System.String`, `System.Boolean`, `System.Delegate`, the unified
    /// `System.Number` with the primitive numeric descriptors parented
    /// under it, and the core interfaces (`IComparable`, `IEquatable`,
    /// `IFormattable`, `IConvertible`).
    pub fn new() -> Self {
        let mut inner = GraphInner::default();

        let object = Self::push(&mut inner, ClassSpec::class("System.Object"));
        let value_type = Self::push(
            &mut inner,
            ClassSpec::class("System.ValueType").parent(object),
        );
        let enum_base = Self::push(
            &mut inner,
            ClassSpec::class("System.Enum").parent(value_type),
        );

        let comparable = Self::push(&mut inner, ClassSpec::interface("System.IComparable"));
        let equatable = Self::push(&mut inner, ClassSpec::interface("System.IEquatable"));
        let formattable = Self::push(&mut inner, ClassSpec::interface("System.IFormattable"));
        let convertible = Self::push(&mut inner, ClassSpec::interface("System.IConvertible"));

        let number = Self::push(
            &mut inner,
            ClassSpec::value_type("System.Number")
                .parent(value_type)
                .implements([comparable, equatable, formattable, convertible]),
        );
        let string = Self::push(
            &mut inner,
            ClassSpec::class("System.String")
                .parent(object)
                .implements([comparable, equatable, convertible]),
        );
        let boolean = Self::push(
            &mut inner,
            ClassSpec::value_type("System.Boolean")
                .parent(value_type)
                .implements([comparable, equatable, convertible]),
        );
        let delegate = Self::push(
            &mut inner,
            ClassSpec::class("System.Delegate").parent(object),
        );

        let mut numerics = [object; NUMERIC_KIND_COUNT];
        for kind in NumericKind::ALL {
            numerics[kind.index()] = Self::push(
                &mut inner,
                ClassSpec::value_type(kind.qualified_name())
                    .parent(number)
                    .backed_by(kind),
            );
        }

        Self {
            inner: RwLock::new(inner),
            well_known: WellKnown {
                object,
                value_type,
                enum_base,
                string,
                boolean,
                delegate,
                number,
                comparable,
                equatable,
                formattable,
                convertible,
                numerics,
            },
        }
    }

    fn push(inner: &mut GraphInner, spec: ClassSpec) -> ClassId {
        let next = ClassId(inner.nodes.len() as u32);
        if let Some(parent) = spec.parent {
            assert!(
                parent.index() < inner.nodes.len(),
                "parent {} not declared before {}",
                parent,
                spec.name
            );
        }
        for iface in &spec.interfaces {
            let node = inner
                .nodes
                .get(iface.index())
                .unwrap_or_else(|| panic!("interface {} not declared before {}", iface, spec.name));
            assert!(
                node.kind == ClassKind::Interface,
                "{} declares non-interface {} in its interface list",
                spec.name,
                node.name
            );
        }
        let name: Arc<str> = Arc::from(spec.name.as_str());
        inner.nodes.push(Arc::new(ClassNode {
            name: name.clone(),
            parent: spec.parent,
            interfaces: spec.interfaces,
            kind: spec.kind,
            numeric: spec.numeric,
        }));
        // Last declaration of a name wins in the lookup index.
        inner.by_name.insert(name, next);
        next
    }

    /// Declare a new descriptor and return its id.
    ///
    /// Panics if the spec references an undeclared parent or interface id,
    /// or lists a non-interface in its interface slot. Both are integration
    /// bugs, not runtime conditions.
    pub fn declare(&self, spec: ClassSpec) -> ClassId {
        Self::push(&mut self.inner.write(), spec)
    }

    /// Well-known seeded descriptor ids
    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    /// Get a descriptor node, panicking if the id is foreign to this graph
    pub fn node(&self, id: ClassId) -> Arc<ClassNode> {
        self.inner
            .read()
            .nodes
            .get(id.index())
            .cloned()
            .unwrap_or_else(|| panic!("{} not registered in this graph", id))
    }

    /// Qualified name of a descriptor
    pub fn name(&self, id: ClassId) -> Arc<str> {
        self.node(id).name.clone()
    }

    /// Parent descriptor id, absent at roots
    pub fn parent(&self, id: ClassId) -> Option<ClassId> {
        self.node(id).parent
    }

    /// Declared interface ids (not the transitive closure)
    pub fn interfaces(&self, id: ClassId) -> Vec<ClassId> {
        self.node(id).interfaces.clone()
    }

    /// Kind tag of a descriptor
    pub fn kind(&self, id: ClassId) -> ClassKind {
        self.node(id).kind
    }

    /// Resolve a qualified name to the last descriptor declared under it
    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.inner.read().by_name.get(name).copied()
    }

    /// Number of declared descriptors
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Check if the graph holds no descriptors (never true: the standard
    /// descriptors are always seeded)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClassGraph {
    fn default() -> Self {
        Self::new()
    }
}
