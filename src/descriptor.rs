//! Type descriptors: the capabilities a tree needs from its key and value types.
//!
//! A descriptor answers "how big is it", "how do two of them order", and
//! optionally "how is one copied, moved into an occupied slot, or destroyed".
//! Only [`TypeDescriptor::compare`] has no default; everything else falls back
//! to what Rust does on its own (clone, replace, drop).

use std::cmp::Ordering;
use std::fmt;

/// Capabilities the tree consumes for one stored type.
pub trait TypeDescriptor<T> {
    /// Declared size of one `T` in a node's payload.
    #[inline]
    fn size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Total order used for every descent decision.
    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// Produce an independently owned duplicate, used when a tree is deep-copied.
    ///
    /// Only callable for `T: Clone`, and [`Tree::try_clone`](crate::Tree::try_clone)
    /// needs both keys and values to be `Clone`. Overriding it changes how a
    /// cloneable type is duplicated (deep vs. shared, counted, rewritten); it
    /// cannot make a non-`Clone` type copyable.
    #[inline]
    fn copy(&self, src: &T) -> T
    where
        T: Clone,
    {
        src.clone()
    }

    /// Move `src` into an occupied slot. The slot's previous occupant is
    /// destroyed first.
    #[inline]
    fn relocate(&self, dest: &mut T, src: T) {
        let old = std::mem::replace(dest, src);
        self.destroy(old);
    }

    /// Release one value. Runs when its node is removed, cleared or dropped.
    #[inline]
    fn destroy(&self, obj: T) {
        drop(obj);
    }

    /// Optional 32-bit hash. The tree never calls this.
    #[inline]
    fn hash(&self, obj: &T) -> Option<u32> {
        let _ = obj;
        None
    }
}

impl<T, D: TypeDescriptor<T> + ?Sized> TypeDescriptor<T> for &D {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn compare(&self, a: &T, b: &T) -> Ordering {
        (**self).compare(a, b)
    }

    fn copy(&self, src: &T) -> T
    where
        T: Clone,
    {
        (**self).copy(src)
    }

    fn relocate(&self, dest: &mut T, src: T) {
        (**self).relocate(dest, src)
    }

    fn destroy(&self, obj: T) {
        (**self).destroy(obj)
    }

    fn hash(&self, obj: &T) -> Option<u32> {
        (**self).hash(obj)
    }
}

/// Orders values by their `Ord` implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Natural;

impl<T: Ord> TypeDescriptor<T> for Natural {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// For payloads that are stored but never ordered, such as values without an
/// `Ord` implementation. Every pair compares equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Opaque;

impl<T> TypeDescriptor<T> for Opaque {
    #[inline]
    fn compare(&self, _: &T, _: &T) -> Ordering {
        Ordering::Equal
    }
}

/// Orders values with a caller-supplied function.
///
/// ```rust
/// use bstree::{Comparator, Flavor, Tree};
///
/// // Longest word first.
/// let by_len = Comparator::new(|a: &&str, b: &&str| b.len().cmp(&a.len()).then(a.cmp(b)));
/// let mut tree = Tree::new(Flavor::Avl, by_len);
/// tree.insert("fir", None).unwrap();
/// tree.insert("hemlock", None).unwrap();
/// assert_eq!(tree.first(), Some(&"hemlock"));
/// ```
#[derive(Clone, Copy)]
pub struct Comparator<F>(F);

impl<F> Comparator<F> {
    pub fn new(f: F) -> Self {
        Comparator(f)
    }
}

impl<F> fmt::Debug for Comparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Comparator(..)")
    }
}

impl<T, F> TypeDescriptor<T> for Comparator<F>
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.0)(a, b)
    }
}
