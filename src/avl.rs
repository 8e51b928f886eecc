//! AVL engine.
//!
//! Each node stores `Balance(height(right) - height(left))`. Insert and remove
//! report how the height of the subtree they touched changed (`IsTaller`,
//! `IsShorter`), so a parent can update its own balance in O(1) and only
//! repair when it reaches ±2.

use std::cmp::Ordering;

use crate::descriptor::TypeDescriptor;
use crate::error::Error;
use crate::node::{Balance, Link, Metadata, Node, Schema};
use crate::{Insert, Removal};

pub(crate) type AvlLink<K, V> = Link<K, V, Balance>;

struct IsTaller(bool);
struct IsShorter(bool);

pub(crate) fn insert<K, V, KD, VD>(
    root: &mut AvlLink<K, V>,
    key: K,
    value: Option<V>,
    schema: &Schema<KD, VD>,
) -> Result<Insert, Error>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    ins(root, key, value, schema).map(|(outcome, _)| outcome)
}

pub(crate) fn remove<K, V, KD, VD>(root: &mut AvlLink<K, V>, key: &K, schema: &Schema<KD, VD>) -> Removal
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    rm(root, key, schema).0
}

// =============================================================================
// Rotations
// =============================================================================

//     a                b
//    / \              / \
//   x   b     =>     a   z
//      / \          / \
//     y   z        x   y
//
// Balances are derived from the old ones; no subtree height is recomputed.
fn rotate_left<K, V>(slot: &mut AvlLink<K, V>) {
    let Some(mut a) = slot.take() else {
        return;
    };
    let Some(mut b) = a.right.take() else {
        *slot = Some(a);
        return;
    };
    a.right = b.left.take();

    let a_bal = a.meta.0 - 1 - b.meta.0.max(0);
    let b_bal = b.meta.0 - 1 + a_bal.min(0);
    a.meta = Balance(a_bal);
    b.meta = Balance(b_bal);

    b.left = Some(a);
    *slot = Some(b);
}

//       a            b
//      / \          / \
//     b   z   =>   x   a
//    / \              / \
//   x   y            y   z
fn rotate_right<K, V>(slot: &mut AvlLink<K, V>) {
    let Some(mut a) = slot.take() else {
        return;
    };
    let Some(mut b) = a.left.take() else {
        *slot = Some(a);
        return;
    };
    a.left = b.right.take();

    let a_bal = a.meta.0 + 1 - b.meta.0.min(0);
    let b_bal = b.meta.0 + 1 + a_bal.max(0);
    a.meta = Balance(a_bal);
    b.meta = Balance(b_bal);

    b.right = Some(a);
    *slot = Some(b);
}

/// Restore |balance| <= 1 at a node sitting at ±2.
///
/// The subtree ends up one shorter than before the repair, except for a single
/// rotation over a child with balance 0 (only reachable on removal).
fn repair<K, V>(slot: &mut AvlLink<K, V>) -> IsShorter {
    let Some(node) = slot.as_mut() else {
        return IsShorter(false);
    };
    let bal = node.meta.0;
    match bal {
        -2 => {
            let child = node.left.as_ref().map_or(0, |l| l.meta.0);
            if child > 0 {
                rotate_left(&mut node.left);
            }
            rotate_right(slot);
            #[cfg(feature = "tracing")]
            tracing::trace!(balance = bal, child, "avl: repair");
            IsShorter(child != 0)
        }
        2 => {
            let child = node.right.as_ref().map_or(0, |r| r.meta.0);
            if child < 0 {
                rotate_right(&mut node.right);
            }
            rotate_left(slot);
            #[cfg(feature = "tracing")]
            tracing::trace!(balance = bal, child, "avl: repair");
            IsShorter(child != 0)
        }
        _ => IsShorter(false),
    }
}

/// Called after one side of the node at `slot` lost a level and its balance
/// has already been shifted.
fn settle<K, V>(slot: &mut AvlLink<K, V>) -> IsShorter {
    match slot.as_ref().map_or(0, |n| n.meta.0) {
        0 => IsShorter(true),
        -1 | 1 => IsShorter(false),
        _ => repair(slot),
    }
}

// =============================================================================
// Insert
// =============================================================================

fn ins<K, V, KD, VD>(
    slot: &mut AvlLink<K, V>,
    key: K,
    value: Option<V>,
    schema: &Schema<KD, VD>,
) -> Result<(Insert, IsTaller), Error>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    let Some(node) = slot.as_mut() else {
        *slot = Some(Node::try_new(key, value, Balance::leaf())?);
        return Ok((Insert::Added, IsTaller(true)));
    };

    let (outcome, is_taller, shift) = match schema.compare(&key, &node.key) {
        Ordering::Equal => {
            if let Some(value) = value {
                schema.assign_value(&mut node.value, value);
            }
            return Ok((Insert::Present, IsTaller(false)));
        }
        Ordering::Less => {
            let (outcome, is_taller) = ins(&mut node.left, key, value, schema)?;
            (outcome, is_taller, -1)
        }
        Ordering::Greater => {
            let (outcome, is_taller) = ins(&mut node.right, key, value, schema)?;
            (outcome, is_taller, 1)
        }
    };

    if !is_taller.0 {
        return Ok((outcome, IsTaller(false)));
    }

    node.meta.0 += shift;
    let bal = node.meta.0;
    match bal {
        0 => Ok((outcome, IsTaller(false))),
        -1 | 1 => Ok((outcome, IsTaller(true))),
        _ => {
            // An insertion repair always restores the pre-insert height.
            repair(slot);
            Ok((outcome, IsTaller(false)))
        }
    }
}

// =============================================================================
// Remove
// =============================================================================

fn rm<K, V, KD, VD>(slot: &mut AvlLink<K, V>, key: &K, schema: &Schema<KD, VD>) -> (Removal, IsShorter)
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    let Some(node) = slot.as_mut() else {
        return (Removal::NotFound, IsShorter(false));
    };

    match schema.compare(key, &node.key) {
        Ordering::Less => {
            let (removal, is_shorter) = rm(&mut node.left, key, schema);
            if !is_shorter.0 {
                return (removal, is_shorter);
            }
            node.meta.0 += 1;
            (removal, settle(slot))
        }
        Ordering::Greater => {
            let (removal, is_shorter) = rm(&mut node.right, key, schema);
            if !is_shorter.0 {
                return (removal, is_shorter);
            }
            node.meta.0 -= 1;
            (removal, settle(slot))
        }
        Ordering::Equal if node.left.is_some() && node.right.is_some() => {
            let (successor, is_shorter) = remove_min(&mut node.right);
            if let Some(successor) = successor {
                schema.relocate(&mut **node, successor);
            }
            if !is_shorter.0 {
                return (Removal::Removed, is_shorter);
            }
            node.meta.0 -= 1;
            (Removal::Removed, settle(slot))
        }
        Ordering::Equal => {
            let Some(mut target) = slot.take() else {
                return (Removal::NotFound, IsShorter(false));
            };
            *slot = target.left.take().or_else(|| target.right.take());
            schema.release(target);
            (Removal::Removed, IsShorter(true))
        }
    }
}

/// Detach the leftmost node. Always removes exactly one node from a non-empty
/// subtree.
fn remove_min<K, V>(slot: &mut AvlLink<K, V>) -> (Option<Box<Node<K, V, Balance>>>, IsShorter) {
    let Some(node) = slot.as_mut() else {
        return (None, IsShorter(false));
    };

    if node.left.is_some() {
        let (min, is_shorter) = remove_min(&mut node.left);
        if !is_shorter.0 {
            return (min, is_shorter);
        }
        node.meta.0 += 1;
        return (min, settle(slot));
    }

    let Some(mut min) = slot.take() else {
        return (None, IsShorter(false));
    };
    *slot = min.right.take();
    (Some(min), IsShorter(true))
}
