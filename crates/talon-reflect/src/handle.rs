//! Canonical type handles
//!
//! A [`TypeHandle`] is the reflection object for one class descriptor.
//! Handles are interned by the [`Reflection`](crate::Reflection) context —
//! one canonical `Arc<TypeHandle>` per descriptor id — and derive their
//! display metadata (short name, namespace) lazily on first access.

use once_cell::sync::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use talon_core::{ClassId, ClassKind};

/// Reflection handle over one class descriptor.
///
/// Equality and hashing key off the descriptor id: two handles are the same
/// type exactly when they reflect the same descriptor.
#[derive(Debug)]
pub struct TypeHandle {
    id: ClassId,
    name: Arc<str>,
    kind: ClassKind,
    short: OnceCell<Box<str>>,
    namespace: OnceCell<Option<Box<str>>>,
}

/// Strip the trailing generic-argument block, if any.
///
/// `Foo.Bar[T]` stems to `Foo.Bar`; dots inside the bracket block never
/// count as namespace separators.
fn stem(name: &str) -> &str {
    if !name.ends_with(']') {
        return name;
    }
    let bytes = name.as_bytes();
    let mut depth = 0usize;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    return &name[..i];
                }
            }
            _ => {}
        }
    }
    name
}

impl TypeHandle {
    pub(crate) fn new(id: ClassId, name: Arc<str>, kind: ClassKind) -> Self {
        Self {
            id,
            name,
            kind,
            short: OnceCell::new(),
            namespace: OnceCell::new(),
        }
    }

    /// Descriptor id this handle reflects
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Fully qualified name
    pub fn full_name(&self) -> &str {
        &self.name
    }

    /// Short name: the segment after the last dot, with any trailing
    /// generic-argument block stripped first. Memoized.
    pub fn name(&self) -> &str {
        self.short.get_or_init(|| {
            let stem = stem(&self.name);
            let cut = stem.rfind('.').map(|i| i + 1).unwrap_or(0);
            stem[cut..].into()
        })
    }

    /// Namespace: the complementary prefix of [`TypeHandle::name`], absent
    /// for root names. Memoized.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace
            .get_or_init(|| {
                let stem = stem(&self.name);
                stem.rfind('.').map(|i| stem[..i].into())
            })
            .as_deref()
    }

    /// Check for a trailing generic-argument block
    pub fn is_generic(&self) -> bool {
        self.name.ends_with(']')
    }

    /// Check the interface kind tag
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Check the value-type kind tag (enums included)
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, ClassKind::ValueType | ClassKind::Enum)
    }

    /// Check the enum kind tag
    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    /// Kind tag of the reflected descriptor
    pub fn kind(&self) -> ClassKind {
        self.kind
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talon_core::ClassGraph;

    fn handle_named(name: &str) -> TypeHandle {
        let graph = ClassGraph::new();
        TypeHandle::new(graph.well_known().object, Arc::from(name), ClassKind::Class)
    }

    #[test]
    fn test_plain_name_split() {
        let h = handle_named("Foo.Bar");
        assert_eq!(h.name(), "Bar");
        assert_eq!(h.namespace(), Some("Foo"));
        assert!(!h.is_generic());
    }

    #[test]
    fn test_root_name_has_no_namespace() {
        let h = handle_named("Foo");
        assert_eq!(h.name(), "Foo");
        assert_eq!(h.namespace(), None);
    }

    #[test]
    fn test_generic_name_strips_argument_block() {
        let h = handle_named("Collections.List[T]");
        assert_eq!(h.name(), "List");
        assert_eq!(h.namespace(), Some("Collections"));
        assert!(h.is_generic());
    }

    #[test]
    fn test_generic_block_dots_do_not_split() {
        let h = handle_named("Collections.Dict[System.String,System.Int32]");
        assert_eq!(h.name(), "Dict");
        assert_eq!(h.namespace(), Some("Collections"));
    }

    #[test]
    fn test_nested_generic_block() {
        let h = handle_named("Collections.List[Collections.List[T]]");
        assert_eq!(h.name(), "List");
        assert_eq!(h.namespace(), Some("Collections"));
    }

    #[test]
    fn test_display_prints_full_name() {
        let h = handle_named("Foo.Bar[T]");
        assert_eq!(format!("{}", h), "Foo.Bar[T]");
    }
}
