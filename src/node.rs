//! Node representation shared by every flavor.
//!
//! A node is a fixed header (two owned child links and the flavor's metadata)
//! followed by its payload: the key and, when the tree carries values, the
//! value. The header comes first (`#[repr(C)]`) so the payload offsets reported
//! by [`NodeLayout`] are stable.

use std::alloc::{self, Layout};
use std::cmp::Ordering;
use std::fmt;
use std::mem;

use crate::descriptor::TypeDescriptor;
use crate::error::Error;
use crate::Flavor;

pub(crate) type Link<K, V, M> = Option<Box<Node<K, V, M>>>;

// =============================================================================
// Flavor metadata
// =============================================================================

/// AVL balance factor: `height(right) - height(left)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balance(pub i8);

/// Colour of the link from a node's parent to the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Flavor-independent view of a node's metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Meta {
    Plain,
    Balance(i8),
    Color(Color),
}

pub(crate) trait Metadata: Copy + fmt::Debug {
    const FLAVOR: Flavor;

    /// Metadata carried by a freshly inserted leaf.
    fn leaf() -> Self;

    fn view(self) -> Meta;
}

impl Metadata for () {
    const FLAVOR: Flavor = Flavor::Plain;

    #[inline]
    fn leaf() -> Self {}

    #[inline]
    fn view(self) -> Meta {
        Meta::Plain
    }
}

impl Metadata for Balance {
    const FLAVOR: Flavor = Flavor::Avl;

    #[inline]
    fn leaf() -> Self {
        Balance(0)
    }

    #[inline]
    fn view(self) -> Meta {
        Meta::Balance(self.0)
    }
}

impl Metadata for Color {
    const FLAVOR: Flavor = Flavor::RedBlack;

    #[inline]
    fn leaf() -> Self {
        Color::Red
    }

    #[inline]
    fn view(self) -> Meta {
        Meta::Color(self)
    }
}

// =============================================================================
// Node
// =============================================================================

#[repr(C)]
pub(crate) struct Node<K, V, M> {
    pub(crate) left: Link<K, V, M>,
    pub(crate) right: Link<K, V, M>,
    pub(crate) meta: M,
    pub(crate) key: K,
    pub(crate) value: Option<V>,
}

impl<K, V, M> Node<K, V, M> {
    /// Allocate a childless node.
    ///
    /// Allocation failure is reported instead of aborting, so callers can leave
    /// the tree untouched.
    pub(crate) fn try_new(key: K, value: Option<V>, meta: M) -> Result<Box<Self>, Error> {
        let layout = Layout::new::<Self>();
        // SAFETY: `layout` is non-zero sized; a node always holds two links.
        let ptr = unsafe { alloc::alloc(layout) }.cast::<Self>();
        if ptr.is_null() {
            return Err(Error::Alloc);
        }
        // SAFETY: `ptr` is non-null, was allocated by the global allocator with
        // `Layout::new::<Self>()`, and is valid for a single write of `Self`.
        // That is exactly the contract `Box::from_raw` requires.
        unsafe {
            ptr.write(Node {
                left: None,
                right: None,
                meta,
                key,
                value,
            });
            Ok(Box::from_raw(ptr))
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

impl<K, V, M: Metadata> Node<K, V, M> {
    #[inline]
    pub(crate) fn entry(&self) -> Entry<'_, K, V> {
        Entry {
            key: &self.key,
            value: self.value.as_ref(),
            meta: self.meta.view(),
        }
    }
}

/// Borrowed view of one stored node, handed to traversal callbacks and
/// yielded by iterators.
#[derive(Debug)]
pub struct Entry<'a, K, V> {
    pub key: &'a K,
    /// `None` when the key was inserted without a value.
    pub value: Option<&'a V>,
    pub meta: Meta,
}

/// Where a node's parts live, in bytes from the start of the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeLayout {
    /// Links plus flavor metadata.
    pub header_size: usize,
    pub key_offset: usize,
    pub value_offset: usize,
    /// Full node size including alignment padding.
    pub node_size: usize,
}

impl NodeLayout {
    pub(crate) fn of<K, V, M>() -> Self {
        NodeLayout {
            header_size: mem::offset_of!(Node<K, V, M>, meta) + mem::size_of::<M>(),
            key_offset: mem::offset_of!(Node<K, V, M>, key),
            value_offset: mem::offset_of!(Node<K, V, M>, value),
            node_size: mem::size_of::<Node<K, V, M>>(),
        }
    }
}

// =============================================================================
// Descriptor plumbing
// =============================================================================

/// The key descriptor and the optional value descriptor of one tree.
#[derive(Clone)]
pub(crate) struct Schema<KD, VD> {
    pub(crate) key_type: KD,
    pub(crate) value_type: Option<VD>,
}

impl<KD, VD> Schema<KD, VD> {
    #[inline]
    pub(crate) fn compare<K>(&self, a: &K, b: &K) -> Ordering
    where
        KD: TypeDescriptor<K>,
    {
        self.key_type.compare(a, b)
    }

    fn destroy_value<V>(&self, value: V)
    where
        VD: TypeDescriptor<V>,
    {
        match &self.value_type {
            Some(vd) => vd.destroy(value),
            None => drop(value),
        }
    }

    /// Store `value` in a node that already holds its key.
    pub(crate) fn assign_value<V>(&self, slot: &mut Option<V>, value: V)
    where
        VD: TypeDescriptor<V>,
    {
        match (slot, &self.value_type) {
            (Some(old), Some(vd)) => vd.relocate(old, value),
            (slot, _) => {
                if let Some(old) = slot.replace(value) {
                    self.destroy_value(old);
                }
            }
        }
    }

    /// Destroy a detached node's payload and free it.
    pub(crate) fn release<K, V, M>(&self, node: Box<Node<K, V, M>>)
    where
        KD: TypeDescriptor<K>,
        VD: TypeDescriptor<V>,
    {
        debug_assert!(node.is_leaf(), "released node must be detached");
        let Node { key, value, .. } = *node;
        self.key_type.destroy(key);
        if let Some(value) = value {
            self.destroy_value(value);
        }
    }

    /// Move the payload of the detached node `src` into `dest`, destroying
    /// `dest`'s previous payload. `src` is consumed without running `destroy`
    /// on the moved payload.
    pub(crate) fn relocate<K, V, M>(&self, dest: &mut Node<K, V, M>, src: Box<Node<K, V, M>>)
    where
        KD: TypeDescriptor<K>,
        VD: TypeDescriptor<V>,
    {
        debug_assert!(src.is_leaf(), "relocation source must be detached");
        let Node { key, value, .. } = *src;
        self.key_type.relocate(&mut dest.key, key);
        match value {
            Some(value) => self.assign_value(&mut dest.value, value),
            None => {
                if let Some(old) = dest.value.take() {
                    self.destroy_value(old);
                }
            }
        }
    }

    /// Release every node under `root` without recursion.
    pub(crate) fn teardown<K, V, M>(&self, root: Link<K, V, M>) -> usize
    where
        KD: TypeDescriptor<K>,
        VD: TypeDescriptor<V>,
    {
        let mut released = 0;
        let mut stack: Vec<Box<Node<K, V, M>>> = root.into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
            self.release(node);
            released += 1;
        }
        released
    }

    /// Deep copy of the subtree under `root`, preserving shape and metadata.
    ///
    /// Built bottom-up from a post-order walk so degenerate trees don't recurse.
    pub(crate) fn copy_tree<K, V, M>(&self, root: &Link<K, V, M>) -> Result<Link<K, V, M>, Error>
    where
        K: Clone,
        V: Clone,
        M: Copy,
        KD: TypeDescriptor<K>,
        VD: TypeDescriptor<V>,
    {
        let mut todo: Vec<(&Node<K, V, M>, bool)> = Vec::new();
        if let Some(root) = root.as_deref() {
            todo.push((root, false));
        }
        let mut built: Vec<Box<Node<K, V, M>>> = Vec::new();

        while let Some((node, expanded)) = todo.pop() {
            if !expanded {
                todo.push((node, true));
                if let Some(right) = node.right.as_deref() {
                    todo.push((right, false));
                }
                if let Some(left) = node.left.as_deref() {
                    todo.push((left, false));
                }
                continue;
            }

            let right = if node.right.is_some() { built.pop() } else { None };
            let left = if node.left.is_some() { built.pop() } else { None };
            let value = node.value.as_ref().map(|v| match &self.value_type {
                Some(vd) => vd.copy(v),
                None => v.clone(),
            });
            let key = self.key_type.copy(&node.key);
            match Node::try_new(key, value, node.meta) {
                Ok(mut copy) => {
                    copy.left = left;
                    copy.right = right;
                    built.push(copy);
                }
                Err(e) => {
                    self.teardown(left);
                    self.teardown(right);
                    for partial in built {
                        self.teardown(Some(partial));
                    }
                    return Err(e);
                }
            }
        }

        debug_assert!(built.len() <= 1);
        Ok(built.pop())
    }
}

// =============================================================================
// Flavor-agnostic reads
// =============================================================================

pub(crate) fn find<'a, K, V, M, KD>(
    root: &'a Link<K, V, M>,
    key: &K,
    key_type: &KD,
) -> Option<&'a Node<K, V, M>>
where
    KD: TypeDescriptor<K>,
{
    let mut current = root.as_deref();
    while let Some(node) = current {
        current = match key_type.compare(key, &node.key) {
            Ordering::Less => node.left.as_deref(),
            Ordering::Greater => node.right.as_deref(),
            Ordering::Equal => return Some(node),
        };
    }
    None
}

pub(crate) fn find_mut<'a, K, V, M, KD>(
    root: &'a mut Link<K, V, M>,
    key: &K,
    key_type: &KD,
) -> Option<&'a mut Node<K, V, M>>
where
    KD: TypeDescriptor<K>,
{
    let mut current = root.as_deref_mut();
    while let Some(node) = current {
        current = match key_type.compare(key, &node.key) {
            Ordering::Less => node.left.as_deref_mut(),
            Ordering::Greater => node.right.as_deref_mut(),
            Ordering::Equal => return Some(node),
        };
    }
    None
}

/// Leftmost (`Forward`) or rightmost (`Reverse`) node.
pub(crate) fn extreme<K, V, M>(root: &Link<K, V, M>, direction: Direction) -> Option<&Node<K, V, M>> {
    let mut node = root.as_deref()?;
    loop {
        let next = match direction {
            Direction::Forward => node.left.as_deref(),
            Direction::Reverse => node.right.as_deref(),
        };
        match next {
            Some(n) => node = n,
            None => return Some(node),
        }
    }
}

/// Number of nodes on the longest root-to-leaf path; `0` for an empty tree.
pub(crate) fn height<K, V, M>(root: &Link<K, V, M>) -> usize {
    let mut max = 0;
    let mut stack: Vec<(&Node<K, V, M>, usize)> = Vec::new();
    if let Some(root) = root.as_deref() {
        stack.push((root, 1));
    }
    while let Some((node, depth)) = stack.pop() {
        max = max.max(depth);
        if let Some(left) = node.left.as_deref() {
            stack.push((left, depth + 1));
        }
        if let Some(right) = node.right.as_deref() {
            stack.push((right, depth + 1));
        }
    }
    max
}

/// Traversal order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Ascending: left, self, right.
    #[default]
    Forward,
    /// Descending: right, self, left.
    Reverse,
}

/// In-order walk over one flavor's nodes with an explicit stack.
pub(crate) struct Walk<'a, K, V, M> {
    stack: Vec<&'a Node<K, V, M>>,
    direction: Direction,
}

impl<'a, K, V, M> Walk<'a, K, V, M> {
    pub(crate) fn new(root: &'a Link<K, V, M>, direction: Direction) -> Self {
        let mut walk = Walk {
            stack: Vec::new(),
            direction,
        };
        walk.push_spine(root.as_deref());
        walk
    }

    fn push_spine(&mut self, mut node: Option<&'a Node<K, V, M>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = match self.direction {
                Direction::Forward => n.left.as_deref(),
                Direction::Reverse => n.right.as_deref(),
            };
        }
    }
}

impl<'a, K, V, M> Iterator for Walk<'a, K, V, M> {
    type Item = &'a Node<K, V, M>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let next = match self.direction {
            Direction::Forward => node.right.as_deref(),
            Direction::Reverse => node.left.as_deref(),
        };
        self.push_spine(next);
        Some(node)
    }
}
