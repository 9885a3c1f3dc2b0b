//! Multicast delegate algebra
//!
//! A delegate is either a single callable or a multicast: a flat, ordered
//! invocation list of callables behaving as one combined callable.
//! Multicasts never nest; combining splices the operands' invocation lists
//! together, removal deletes the right-most structural match, and
//! invocation fans out sequentially with the last return value winning.

use crate::value::Value;
use crate::{CoreError, CoreResult};
use std::fmt;
use std::ops::{Add, Sub};
use std::sync::Arc;

/// Native callable signature
pub type NativeFn = dyn Fn(&[Value]) -> CoreResult<Value> + Send + Sync;

/// An atomic invocable unit.
///
/// Identity (and equality) is the allocation: clones of a `Callable` are
/// identical, two separately constructed closures never are.
#[derive(Clone)]
pub struct Callable(Arc<NativeFn>);

impl Callable {
    /// Wrap a host function
    pub fn new(f: impl Fn(&[Value]) -> CoreResult<Value> + Send + Sync + 'static) -> Self {
        Callable(Arc::new(f))
    }

    /// Call with the given arguments
    pub fn invoke(&self, args: &[Value]) -> CoreResult<Value> {
        (self.0)(args)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Callable {}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({:p})", Arc::as_ptr(&self.0))
    }
}

/// A single callable or a multicast invocation list.
///
/// Invariant: a `Multicast` holds at least two elements and never contains
/// another multicast. All constructors flatten.
#[derive(Clone, Debug)]
pub enum Delegate {
    /// One callable
    Single(Callable),
    /// Flattened, ordered invocation list (length >= 2)
    Multicast(Arc<[Callable]>),
}

impl Delegate {
    /// Create a single-callable delegate from a host function
    pub fn new(f: impl Fn(&[Value]) -> CoreResult<Value> + Send + Sync + 'static) -> Self {
        Delegate::Single(Callable::new(f))
    }

    /// Wrap an existing callable
    pub fn from_callable(callable: Callable) -> Self {
        Delegate::Single(callable)
    }

    /// The flattened invocation list
    pub fn invocation_list(&self) -> &[Callable] {
        match self {
            Delegate::Single(c) => std::slice::from_ref(c),
            Delegate::Multicast(list) => list,
        }
    }

    /// Number of callables in the invocation list
    pub fn len(&self) -> usize {
        self.invocation_list().len()
    }

    /// A delegate always holds at least one callable
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if this is a multicast
    pub fn is_multicast(&self) -> bool {
        matches!(self, Delegate::Multicast(_))
    }

    /// Rebuild from a flat list: absent on empty, single on one element.
    fn from_list(mut list: Vec<Callable>) -> Option<Delegate> {
        match list.len() {
            0 => None,
            1 => Some(Delegate::Single(list.remove(0))),
            _ => Some(Delegate::Multicast(list.into())),
        }
    }

    /// Concatenate two present delegates, splicing multicast operands flat.
    fn concat(a: &Delegate, b: &Delegate) -> Delegate {
        let left = a.invocation_list();
        let right = b.invocation_list();
        let mut list = Vec::with_capacity(left.len() + right.len());
        list.extend(left.iter().cloned());
        list.extend(right.iter().cloned());
        // len >= 2 here, so the result is always a multicast
        Delegate::Multicast(list.into())
    }

    /// Combine two optional delegates into one.
    ///
    /// Absent operands pass through: both absent yields absent, one absent
    /// yields the other unchanged. Two present operands concatenate into a
    /// flat multicast.
    pub fn combine(a: Option<&Delegate>, b: Option<&Delegate>) -> Option<Delegate> {
        match (a, b) {
            (None, None) => None,
            (Some(a), None) => Some(a.clone()),
            (None, Some(b)) => Some(b.clone()),
            (Some(a), Some(b)) => Some(Self::concat(a, b)),
        }
    }

    /// Remove the last occurrence of `value`'s invocation list from
    /// `source`.
    ///
    /// Removal targets the right-most match; when no match exists the
    /// source is returned unchanged. That identity on no-match inputs is
    /// what [`Delegate::remove_all`] relies on for termination.
    pub fn remove(source: Option<&Delegate>, value: Option<&Delegate>) -> Option<Delegate> {
        let src = source?;
        let val = match value {
            None => return Some(src.clone()),
            Some(v) => v,
        };
        match (src, val) {
            (Delegate::Single(a), Delegate::Single(b)) => {
                if a == b {
                    None
                } else {
                    Some(src.clone())
                }
            }
            // A single callable can never contain a multicast.
            (Delegate::Single(_), Delegate::Multicast(_)) => Some(src.clone()),
            (Delegate::Multicast(list), Delegate::Single(b)) => {
                match list.iter().rposition(|c| c == b) {
                    None => Some(src.clone()),
                    Some(at) => {
                        let mut rest = list.to_vec();
                        rest.remove(at);
                        Self::from_list(rest)
                    }
                }
            }
            (Delegate::Multicast(list), Delegate::Multicast(pattern)) => {
                if pattern.len() > list.len() {
                    return Some(src.clone());
                }
                let found = (0..=list.len() - pattern.len())
                    .rev()
                    .find(|&at| list[at..at + pattern.len()] == pattern[..]);
                match found {
                    None => Some(src.clone()),
                    Some(at) => {
                        let mut rest = Vec::with_capacity(list.len() - pattern.len());
                        rest.extend(list[..at].iter().cloned());
                        rest.extend(list[at + pattern.len()..].iter().cloned());
                        Self::from_list(rest)
                    }
                }
            }
        }
    }

    /// Repeatedly remove `value` from `source` until a fixed point.
    pub fn remove_all(source: Option<&Delegate>, value: Option<&Delegate>) -> Option<Delegate> {
        let mut current = source.cloned();
        loop {
            let next = Self::remove(current.as_ref(), value);
            if next == current {
                return next;
            }
            current = next;
        }
    }

    /// Invoke the delegate.
    ///
    /// A multicast calls every element in sequence with the same arguments;
    /// the result is the last element's return value. A failing element
    /// aborts the remaining fan-out.
    pub fn invoke(&self, args: &[Value]) -> CoreResult<Value> {
        match self {
            Delegate::Single(c) => c.invoke(args),
            Delegate::Multicast(list) => {
                let mut last = Value::Nil;
                for c in list.iter() {
                    last = c.invoke(args)?;
                }
                Ok(last)
            }
        }
    }

    /// Late-bound invocation; same contract as [`Delegate::invoke`]
    pub fn dynamic_invoke(&self, args: &[Value]) -> CoreResult<Value> {
        self.invoke(args)
    }
}

impl PartialEq for Delegate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Delegate::Single(a), Delegate::Single(b)) => a == b,
            (Delegate::Multicast(a), Delegate::Multicast(b)) => a[..] == b[..],
            // A single and a multicast are never equal, whatever their
            // contents.
            _ => false,
        }
    }
}

impl Eq for Delegate {}

impl Add for Delegate {
    type Output = Delegate;

    fn add(self, rhs: Delegate) -> Delegate {
        Delegate::concat(&self, &rhs)
    }
}

impl Sub for Delegate {
    type Output = Option<Delegate>;

    fn sub(self, rhs: Delegate) -> Option<Delegate> {
        Delegate::remove(Some(&self), Some(&rhs))
    }
}

/// Convenience constructor for a callable that always fails with a
/// host-level message; useful for stubbing unimplemented handlers.
pub fn failing(message: &str) -> Callable {
    let message = message.to_string();
    Callable::new(move |_| Err(CoreError::Runtime(message.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn constant(n: f64) -> Delegate {
        Delegate::new(move |_| Ok(Value::Number(n)))
    }

    fn recording(log: &Arc<Mutex<Vec<i32>>>, tag: i32) -> Delegate {
        let log = log.clone();
        Delegate::new(move |_| {
            log.lock().push(tag);
            Ok(Value::Number(tag as f64))
        })
    }

    #[test]
    fn test_combine_absent_operands() {
        let f = constant(1.0);
        assert_eq!(Delegate::combine(None, None), None);
        assert_eq!(Delegate::combine(Some(&f), None), Some(f.clone()));
        assert_eq!(Delegate::combine(None, Some(&f)), Some(f.clone()));
    }

    #[test]
    fn test_combine_flattens() {
        let f = constant(1.0);
        let g = constant(2.0);
        let h = constant(3.0);

        let nested = Delegate::combine(
            Some(&f),
            Delegate::combine(Some(&g), Some(&h)).as_ref(),
        )
        .unwrap();
        assert_eq!(nested.len(), 3);
        assert!(nested.is_multicast());

        let flat = Delegate::combine(
            Delegate::combine(Some(&f), Some(&g)).as_ref(),
            Some(&h),
        )
        .unwrap();
        assert_eq!(nested, flat);
    }

    #[test]
    fn test_combine_remove_round_trip() {
        let f = constant(1.0);
        let g = constant(2.0);
        let fg = Delegate::combine(Some(&f), Some(&g)).unwrap();

        assert_eq!(Delegate::remove(Some(&fg), Some(&g)), Some(f.clone()));
        assert_eq!(Delegate::remove(Some(&fg), Some(&f)), Some(g.clone()));
    }

    #[test]
    fn test_remove_single_from_single() {
        let f = constant(1.0);
        let g = constant(2.0);

        assert_eq!(Delegate::remove(Some(&f), Some(&f.clone())), None);
        assert_eq!(Delegate::remove(Some(&f), Some(&g)), Some(f.clone()));
    }

    #[test]
    fn test_remove_targets_rightmost() {
        let f = constant(1.0);
        let g = constant(2.0);
        // [f, g, f]
        let list = Delegate::combine(
            Delegate::combine(Some(&f), Some(&g)).as_ref(),
            Some(&f),
        )
        .unwrap();

        let removed = Delegate::remove(Some(&list), Some(&f)).unwrap();
        // Removing f takes the last occurrence: [f, g], not [g, f].
        let fg = Delegate::combine(Some(&f), Some(&g)).unwrap();
        assert_eq!(removed, fg);
    }

    #[test]
    fn test_remove_multicast_subsequence() {
        let f = constant(1.0);
        let g = constant(2.0);
        let h = constant(3.0);
        // [f, g, h, g, h]
        let mut list = Some(f.clone());
        for d in [&g, &h, &g, &h] {
            list = Delegate::combine(list.as_ref(), Some(d));
        }
        let list = list.unwrap();
        let gh = Delegate::combine(Some(&g), Some(&h)).unwrap();

        // Removes the right-most [g, h], leaving [f, g, h].
        let removed = Delegate::remove(Some(&list), Some(&gh)).unwrap();
        assert_eq!(removed.len(), 3);
        let fgh = Delegate::combine(
            Delegate::combine(Some(&f), Some(&g)).as_ref(),
            Some(&h),
        )
        .unwrap();
        assert_eq!(removed, fgh);
    }

    #[test]
    fn test_remove_multicast_from_single_is_identity() {
        let f = constant(1.0);
        let g = constant(2.0);
        let gg = Delegate::combine(Some(&g), Some(&g)).unwrap();

        assert_eq!(Delegate::remove(Some(&f), Some(&gg)), Some(f.clone()));
    }

    #[test]
    fn test_remove_equal_multicasts_yields_absent() {
        let f = constant(1.0);
        let g = constant(2.0);
        let fg = Delegate::combine(Some(&f), Some(&g)).unwrap();

        assert_eq!(Delegate::remove(Some(&fg), Some(&fg.clone())), None);
    }

    #[test]
    fn test_remove_collapses_to_single() {
        let f = constant(1.0);
        let g = constant(2.0);
        let h = constant(3.0);
        let gh = Delegate::combine(Some(&g), Some(&h)).unwrap();
        let fgh = Delegate::combine(Some(&f), Some(&gh)).unwrap();

        let left = Delegate::remove(Some(&fgh), Some(&gh)).unwrap();
        assert_eq!(left, f);
        assert!(!left.is_multicast());
    }

    #[test]
    fn test_remove_all_reaches_fixed_point() {
        let f = constant(1.0);
        // [f, f, f]
        let list = Delegate::combine(
            Delegate::combine(Some(&f), Some(&f)).as_ref(),
            Some(&f),
        )
        .unwrap();

        assert_eq!(Delegate::remove_all(Some(&list), Some(&f)), None);
    }

    #[test]
    fn test_remove_all_no_match_is_identity() {
        let f = constant(1.0);
        let g = constant(2.0);
        let fg = Delegate::combine(Some(&f), Some(&f)).unwrap();

        assert_eq!(Delegate::remove_all(Some(&fg), Some(&g)), Some(fg.clone()));
        assert_eq!(Delegate::remove_all(None, Some(&g)), None);
    }

    #[test]
    fn test_invocation_order_and_last_result() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let f = recording(&log, 1);
        let g = recording(&log, 2);
        let h = recording(&log, 3);

        let all = Delegate::combine(
            Some(&f),
            Delegate::combine(Some(&g), Some(&h)).as_ref(),
        )
        .unwrap();
        let result = all.invoke(&[]).unwrap();

        assert_eq!(result, Value::Number(3.0));
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_invoke_fails_fast() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let f = recording(&log, 1);
        let boom = Delegate::from_callable(failing("boom"));
        let g = recording(&log, 2);

        let all = Delegate::combine(
            Delegate::combine(Some(&f), Some(&boom)).as_ref(),
            Some(&g),
        )
        .unwrap();
        let err = all.invoke(&[]).unwrap_err();

        assert!(matches!(err, CoreError::Runtime(_)));
        // The element after the failure never ran.
        assert_eq!(*log.lock(), vec![1]);
    }

    #[test]
    fn test_structural_equality() {
        let f = constant(1.0);
        let g = constant(2.0);

        let a = Delegate::combine(Some(&f), Some(&g)).unwrap();
        let b = Delegate::combine(Some(&f), Some(&g)).unwrap();
        assert_eq!(a, b);

        // Same behavior, different allocation: not equal.
        assert_ne!(constant(1.0), constant(1.0));
        // A single never equals a multicast.
        assert_ne!(f, a);
    }

    #[test]
    fn test_operator_sugar_matches_combine() {
        let f = constant(1.0);
        let g = constant(2.0);

        let sum = f.clone() + g.clone();
        assert_eq!(sum, Delegate::combine(Some(&f), Some(&g)).unwrap());

        let back = sum - g.clone();
        assert_eq!(back, Some(f));
    }

    #[test]
    fn test_dynamic_invoke_contract() {
        let f = constant(7.0);
        assert_eq!(f.dynamic_invoke(&[]).unwrap(), Value::Number(7.0));
    }
}
