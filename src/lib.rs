//! # bstree
//!
//! In-memory binary search trees with interchangeable balancing.
//!
//! One [`Tree`] type covers three flavors, chosen when the tree is built:
//!
//! - [`Flavor::Plain`]: an unbalanced BST. Insertion order decides the shape.
//! - [`Flavor::Avl`]: height-balanced, with a balance factor in every node.
//! - [`Flavor::RedBlack`]: a left-leaning red-black (2-3) tree.
//!
//! Keys and values are ordered, copied and destroyed through
//! [`TypeDescriptor`]s, so a tree can order by any function and hook payload
//! teardown without wrapping its element types.
//!
//! ## Example
//!
//! ```rust
//! use bstree::{Flavor, Insert, Natural, Removal, Tree};
//!
//! let mut tree = Tree::with_values(Flavor::RedBlack, Natural, Natural);
//! assert_eq!(tree.set("oak", 0), Ok(Insert::Added));
//! tree.set("birch", 1).unwrap();
//! tree.set("maple", 2).unwrap();
//!
//! assert_eq!(tree.get(&"birch"), Some(&1));
//! assert_eq!(tree.remove(&"birch"), Removal::Removed);
//! assert!(!tree.has(&"birch"));
//! assert_eq!(tree.keys().copied().collect::<Vec<_>>(), ["maple", "oak"]);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

use std::alloc::{self, Layout};
use std::fmt;
use std::ops::ControlFlow;

mod avl;
mod check;
mod descriptor;
mod error;
mod llrb;
mod node;
mod plain;

pub use check::{Stats, Violation};
pub use descriptor::{Comparator, Natural, Opaque, TypeDescriptor};
pub use error::Error;
pub use node::{Balance, Color, Direction, Entry, Meta, NodeLayout};

use node::{extreme, find, find_mut, Link, Node, Schema, Walk};

// =============================================================================
// Configuration
// =============================================================================

/// Balancing strategy of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flavor {
    Plain,
    Avl,
    RedBlack,
}

/// Construction-time settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    flavor: Flavor,
    verify: bool,
}

impl Config {
    /// Verification follows `debug_assertions`.
    pub fn new(flavor: Flavor) -> Self {
        Config {
            flavor,
            verify: cfg!(debug_assertions),
        }
    }

    /// Re-check every invariant after each mutation and panic on a violation.
    /// Costs O(n) per call.
    pub fn verify(mut self, on: bool) -> Self {
        self.verify = on;
        self
    }

    #[inline]
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    #[inline]
    pub fn is_verifying(&self) -> bool {
        self.verify
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a successful insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insert {
    /// A node was created.
    Added,
    /// The key was already stored; its value was replaced if one was given.
    Present,
}

impl Insert {
    /// `1` for a structural change, `0` otherwise.
    #[inline]
    pub fn code(self) -> i32 {
        match self {
            Insert::Added => 1,
            Insert::Present => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotFound,
}

impl Removal {
    /// `1` for a structural change, `0` otherwise.
    #[inline]
    pub fn code(self) -> i32 {
        match self {
            Removal::Removed => 1,
            Removal::NotFound => 0,
        }
    }
}

// =============================================================================
// Tree
// =============================================================================

enum Root<K, V> {
    Plain(Link<K, V, ()>),
    Avl(Link<K, V, Balance>),
    RedBlack(Link<K, V, Color>),
}

/// Run the same expression against whichever root a tree has.
macro_rules! dispatch {
    ($root:expr, |$link:ident| $body:expr) => {
        match $root {
            Root::Plain($link) => $body,
            Root::Avl($link) => $body,
            Root::RedBlack($link) => $body,
        }
    };
}

/// An ordered set or map over `K`, balanced according to its [`Flavor`].
///
/// `KD` orders and manages keys. `VD` manages values; a tree built without a
/// value descriptor ([`Tree::new`]) is a set and rejects values.
pub struct Tree<K, V = (), KD = Natural, VD = Natural>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    root: Root<K, V>,
    count: usize,
    schema: Schema<KD, VD>,
    config: Config,
}

impl<K, KD> Tree<K, (), KD, Natural>
where
    KD: TypeDescriptor<K>,
{
    /// A set: keys only.
    pub fn new(flavor: Flavor, key_type: KD) -> Self {
        Self::with_config(Config::new(flavor), key_type, None)
    }
}

impl<K, V, KD, VD> Tree<K, V, KD, VD>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    pub fn with_values(flavor: Flavor, key_type: KD, value_type: VD) -> Self {
        Self::with_config(Config::new(flavor), key_type, Some(value_type))
    }

    pub fn with_config(config: Config, key_type: KD, value_type: Option<VD>) -> Self {
        let root = match config.flavor {
            Flavor::Plain => Root::Plain(None),
            Flavor::Avl => Root::Avl(None),
            Flavor::RedBlack => Root::RedBlack(None),
        };
        Tree {
            root,
            count: 0,
            schema: Schema {
                key_type,
                value_type,
            },
            config,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn flavor(&self) -> Flavor {
        self.config.flavor
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Insert `key`, or find it if it is already stored.
    ///
    /// A present key keeps its node; its value is replaced only when `value`
    /// is `Some`. On error the tree is unchanged.
    pub fn insert(&mut self, key: K, value: Option<V>) -> Result<Insert, Error> {
        if value.is_some() && self.schema.value_type.is_none() {
            return Err(Error::MissingValueType);
        }
        let outcome = match &mut self.root {
            Root::Plain(root) => plain::insert(root, key, value, &self.schema),
            Root::Avl(root) => avl::insert(root, key, value, &self.schema),
            Root::RedBlack(root) => llrb::insert(root, key, value, &self.schema),
        }?;
        if outcome == Insert::Added {
            self.count += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(flavor = ?self.config.flavor, ?outcome, count = self.count, "tree: insert");

        self.verify("insert");
        Ok(outcome)
    }

    /// Store `value` under `key`, inserting the key if needed.
    #[inline]
    pub fn set(&mut self, key: K, value: V) -> Result<Insert, Error> {
        self.insert(key, Some(value))
    }

    pub fn remove(&mut self, key: &K) -> Removal {
        let removal = match &mut self.root {
            Root::Plain(root) => plain::remove(root, key, &self.schema),
            Root::Avl(root) => avl::remove(root, key, &self.schema),
            Root::RedBlack(root) => llrb::remove(root, key, &self.schema),
        };
        if removal == Removal::Removed {
            self.count -= 1;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(flavor = ?self.config.flavor, ?removal, count = self.count, "tree: remove");

        self.verify("remove");
        removal
    }

    /// Value stored under `key`. `None` when the key is absent or was
    /// inserted without a value.
    pub fn get(&self, key: &K) -> Option<&V> {
        dispatch!(&self.root, |root| {
            find(root, key, &self.schema.key_type).and_then(|n| n.value.as_ref())
        })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        dispatch!(&mut self.root, |root| {
            find_mut(root, key, &self.schema.key_type).and_then(|n| n.value.as_mut())
        })
    }

    pub fn has(&self, key: &K) -> bool {
        dispatch!(&self.root, |root| find(root, key, &self.schema.key_type).is_some())
    }

    pub fn first(&self) -> Option<&K> {
        dispatch!(&self.root, |root| extreme(root, Direction::Forward).map(|n| &n.key))
    }

    pub fn last(&self) -> Option<&K> {
        dispatch!(&self.root, |root| extreme(root, Direction::Reverse).map(|n| &n.key))
    }

    /// Destroy every reachable node and reset the count.
    ///
    /// Runs from `Drop`, possibly while unwinding out of a panicking
    /// comparator, so a count that disagrees with the released nodes is not
    /// an error here.
    pub fn clear(&mut self) {
        let released = dispatch!(&mut self.root, |root| self.schema.teardown(root.take()));

        #[cfg(feature = "tracing")]
        tracing::debug!(flavor = ?self.config.flavor, released, recorded = self.count, "tree: clear");
        #[cfg(not(feature = "tracing"))]
        let _ = released;

        self.count = 0;
    }

    /// Nodes on the longest root-to-leaf path. Walks the whole tree.
    pub fn height(&self) -> usize {
        dispatch!(&self.root, |root| node::height(root))
    }

    /// Byte layout of this tree's nodes.
    pub fn node_layout(&self) -> NodeLayout {
        match self.config.flavor {
            Flavor::Plain => NodeLayout::of::<K, V, ()>(),
            Flavor::Avl => NodeLayout::of::<K, V, Balance>(),
            Flavor::RedBlack => NodeLayout::of::<K, V, Color>(),
        }
    }

    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_layout().node_size
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    /// Visit every node in key order (or reverse). The first `Break` stops the
    /// walk and is returned as is.
    pub fn traverse_nodes<B, F>(&self, direction: Direction, mut f: F) -> ControlFlow<B>
    where
        F: FnMut(Entry<'_, K, V>) -> ControlFlow<B>,
    {
        self.walk(direction).try_for_each(|entry| f(entry))
    }

    pub fn traverse_keys<B, F>(&self, direction: Direction, mut f: F) -> ControlFlow<B>
    where
        F: FnMut(&K) -> ControlFlow<B>,
    {
        self.walk(direction).try_for_each(|entry| f(entry.key))
    }

    /// Like [`Tree::traverse_keys`], over stored values. Keys inserted without
    /// a value are skipped.
    pub fn traverse_values<B, F>(&self, direction: Direction, mut f: F) -> ControlFlow<B>
    where
        F: FnMut(&V) -> ControlFlow<B>,
    {
        self.walk(direction).try_for_each(|entry| match entry.value {
            Some(value) => f(value),
            None => ControlFlow::Continue(()),
        })
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.walk(Direction::Forward)
    }

    pub fn iter_rev(&self) -> Iter<'_, K, V> {
        self.walk(Direction::Reverse)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|entry| entry.key)
    }

    /// Stored values in key order, skipping keys without one.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().filter_map(|entry| entry.value)
    }

    fn walk(&self, direction: Direction) -> Iter<'_, K, V> {
        let walk = match &self.root {
            Root::Plain(root) => Walker::Plain(Walk::new(root, direction)),
            Root::Avl(root) => Walker::Avl(Walk::new(root, direction)),
            Root::RedBlack(root) => Walker::RedBlack(Walk::new(root, direction)),
        };
        Iter {
            walk,
            remaining: self.count,
        }
    }

    // -------------------------------------------------------------------------
    // Invariants
    // -------------------------------------------------------------------------

    /// Check order and count, plus the flavor's balance invariants.
    pub fn validate(&self) -> Result<Stats, Violation> {
        let ordered = dispatch!(&self.root, |root| {
            check::check_order(root, &self.schema.key_type, self.count)
        });
        ordered?;
        match &self.root {
            Root::Plain(_) => {}
            Root::Avl(root) => check::check_avl(root, self.count)?,
            Root::RedBlack(root) => check::check_llrb(root, self.count)?,
        }
        Ok(self.stats())
    }

    /// Shape counters. Does not validate.
    pub fn stats(&self) -> Stats {
        dispatch!(&self.root, |root| check::survey(root))
    }

    /// Whether subtree heights differ by at most one at every node, whatever
    /// the flavor.
    pub fn is_avl_balanced(&self) -> bool {
        dispatch!(&self.root, |root| check::height_balanced(root, self.count))
    }

    fn verify(&self, op: &str) {
        if !self.config.verify {
            return;
        }
        if let Err(violation) = self.validate() {
            panic!(
                "{op} left the {:?} tree invalid: {violation}",
                self.config.flavor
            );
        }
    }
}

impl<K, V, KD, VD> Tree<K, V, KD, VD>
where
    K: Clone,
    V: Clone,
    KD: TypeDescriptor<K> + Clone,
    VD: TypeDescriptor<V> + Clone,
{
    /// Deep copy with the same shape and metadata. Payloads are duplicated
    /// through the descriptors' `copy`.
    pub fn try_clone(&self) -> Result<Self, Error> {
        let root = match &self.root {
            Root::Plain(root) => Root::Plain(self.schema.copy_tree(root)?),
            Root::Avl(root) => Root::Avl(self.schema.copy_tree(root)?),
            Root::RedBlack(root) => Root::RedBlack(self.schema.copy_tree(root)?),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(flavor = ?self.config.flavor, count = self.count, "tree: deep copy");

        Ok(Tree {
            root,
            count: self.count,
            schema: self.schema.clone(),
            config: self.config,
        })
    }
}

impl<K, V, KD, VD> Clone for Tree<K, V, KD, VD>
where
    K: Clone,
    V: Clone,
    KD: TypeDescriptor<K> + Clone,
    VD: TypeDescriptor<V> + Clone,
{
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(tree) => tree,
            Err(_) => alloc::handle_alloc_error(match self.config.flavor {
                Flavor::Plain => Layout::new::<Node<K, V, ()>>(),
                Flavor::Avl => Layout::new::<Node<K, V, Balance>>(),
                Flavor::RedBlack => Layout::new::<Node<K, V, Color>>(),
            }),
        }
    }
}

impl<K, V, KD, VD> fmt::Debug for Tree<K, V, KD, VD>
where
    K: fmt::Debug,
    V: fmt::Debug,
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.value_type.is_none() {
            return f.debug_set().entries(self.keys()).finish();
        }
        f.debug_map()
            .entries(self.iter().map(|entry| (entry.key, entry.value)))
            .finish()
    }
}

impl<K, V, KD, VD> Drop for Tree<K, V, KD, VD>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

enum Walker<'a, K, V> {
    Plain(Walk<'a, K, V, ()>),
    Avl(Walk<'a, K, V, Balance>),
    RedBlack(Walk<'a, K, V, Color>),
}

/// In-order iterator over a tree's entries.
pub struct Iter<'a, K, V> {
    walk: Walker<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = Entry<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match &mut self.walk {
            Walker::Plain(walk) => walk.next().map(Node::entry),
            Walker::Avl(walk) => walk.next().map(Node::entry),
            Walker::RedBlack(walk) => walk.next().map(Node::entry),
        }?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}


#[cfg(test)]
mod proptests;
