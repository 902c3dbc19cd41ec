use core::cmp::Ordering;

/// A total order over keys of type `K`.
///
/// The tree never inspects keys directly; every comparison goes through the
/// comparator supplied at construction. Implementations must be a total
/// order: `cmp(x, x) == Equal`, `cmp(x, y)` is the reverse of `cmp(y, x)`,
/// and the relation is transitive. Two keys are the same entry exactly when
/// the comparator returns [`Ordering::Equal`]; structural equality of `K` is
/// never consulted.
///
/// Any `Fn(&K, &K) -> Ordering` closure is a comparator, and [`Natural`]
/// adapts the key type's own [`Ord`]:
///
/// ```
/// use berth_tree::{BPlusMap, Natural};
///
/// // Descending order via a closure.
/// let mut map = BPlusMap::with_comparator(4, |x: &i32, y: &i32| y.cmp(x));
/// map.insert(1, "one").unwrap();
/// map.insert(2, "two").unwrap();
/// assert_eq!(map.get(&2).unwrap(), Some("two"));
///
/// // Natural order.
/// let map: BPlusMap<i32, &str, Natural> = BPlusMap::new(4);
/// assert!(map.is_empty());
/// ```
pub trait Comparator<K: ?Sized> {
    /// Compares two keys, returning their ordering under this comparator.
    fn cmp(&self, x: &K, y: &K) -> Ordering;
}

/// The natural order of a key type, as defined by its [`Ord`] impl.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Natural;

impl<K: Ord + ?Sized> Comparator<K> for Natural {
    #[inline]
    fn cmp(&self, x: &K, y: &K) -> Ordering {
        x.cmp(y)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn cmp(&self, x: &K, y: &K) -> Ordering {
        self(x, y)
    }
}
