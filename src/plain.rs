//! Unbalanced binary search tree.
//!
//! Nothing bounds the depth of a plain tree (sorted input degenerates it into a
//! list), so every walk here is a loop over `&mut Link` cursors rather than a
//! recursive descent.

use std::cmp::Ordering;

use crate::descriptor::TypeDescriptor;
use crate::error::Error;
use crate::node::{Link, Node, Schema};
use crate::{Insert, Removal};

pub(crate) type PlainLink<K, V> = Link<K, V, ()>;

pub(crate) fn insert<K, V, KD, VD>(
    root: &mut PlainLink<K, V>,
    key: K,
    value: Option<V>,
    schema: &Schema<KD, VD>,
) -> Result<Insert, Error>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    let mut link = root;
    while let Some(node) = link {
        match schema.compare(&key, &node.key) {
            Ordering::Less => link = &mut node.left,
            Ordering::Greater => link = &mut node.right,
            Ordering::Equal => {
                if let Some(value) = value {
                    schema.assign_value(&mut node.value, value);
                }
                return Ok(Insert::Present);
            }
        }
    }
    *link = Some(Node::try_new(key, value, ())?);
    Ok(Insert::Added)
}

pub(crate) fn remove<K, V, KD, VD>(
    root: &mut PlainLink<K, V>,
    key: &K,
    schema: &Schema<KD, VD>,
) -> Removal
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    let mut link = root;
    loop {
        let ord = match link.as_deref() {
            None => return Removal::NotFound,
            Some(node) => schema.compare(key, &node.key),
        };
        if ord == Ordering::Equal {
            break;
        }
        let Some(node) = link else {
            return Removal::NotFound;
        };
        link = if ord == Ordering::Less {
            &mut node.left
        } else {
            &mut node.right
        };
    }

    let Some(mut target) = link.take() else {
        return Removal::NotFound;
    };
    match (target.left.take(), target.right.take()) {
        (None, child) | (child, None) => {
            *link = child;
            schema.release(target);
        }
        (Some(left), Some(right)) => {
            // The successor has no left child, so detaching it only splices
            // its right child into its place.
            let mut right = Some(right);
            if let Some(successor) = take_min(&mut right) {
                schema.relocate(&mut target, successor);
            }
            target.left = Some(left);
            target.right = right;
            *link = Some(target);
        }
    }
    Removal::Removed
}

/// Detach the leftmost node under `link`.
fn take_min<K, V, M>(mut link: &mut Link<K, V, M>) -> Option<Box<Node<K, V, M>>> {
    while link.as_ref()?.left.is_some() {
        link = &mut link.as_mut()?.left;
    }
    let mut min = link.take()?;
    *link = min.right.take();
    Some(min)
}
