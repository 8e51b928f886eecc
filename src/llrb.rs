//! Left-leaning red-black engine (Sedgewick's 2-3 variant).
//!
//! A red node is glued to its parent: a black node with a red left child is a
//! 3-node. Right-leaning red links and 4-nodes only exist transiently while an
//! operation unwinds; `fix_up` and `balance` remove them on the way back.

use std::cmp::Ordering;

use crate::descriptor::TypeDescriptor;
use crate::error::Error;
use crate::node::{find, Color, Link, Metadata, Node, Schema};
use crate::{Insert, Removal};

pub(crate) type RbLink<K, V> = Link<K, V, Color>;
type RbNode<K, V> = Node<K, V, Color>;

impl Color {
    #[inline]
    fn toggled(self) -> Color {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }
}

pub(crate) fn insert<K, V, KD, VD>(
    root: &mut RbLink<K, V>,
    key: K,
    value: Option<V>,
    schema: &Schema<KD, VD>,
) -> Result<Insert, Error>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    let outcome = put(root, key, value, schema)?;
    paint_root_black(root);
    Ok(outcome)
}

pub(crate) fn remove<K, V, KD, VD>(root: &mut RbLink<K, V>, key: &K, schema: &Schema<KD, VD>) -> Removal
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    // The descent reshapes the tree before it knows whether the key exists.
    if find(root, key, &schema.key_type).is_none() {
        return Removal::NotFound;
    }
    let Some(mut h) = root.take() else {
        return Removal::NotFound;
    };
    if !is_red(&h.left) && !is_red(&h.right) {
        h.meta = Color::Red;
    }
    *root = delete(h, key, schema);
    paint_root_black(root);
    Removal::Removed
}

#[inline]
fn paint_root_black<K, V>(root: &mut RbLink<K, V>) {
    if let Some(root) = root.as_mut() {
        root.meta = Color::Black;
    }
}

#[inline]
pub(crate) fn is_red<K, V>(link: &RbLink<K, V>) -> bool {
    matches!(link.as_deref(), Some(n) if n.meta == Color::Red)
}

#[inline]
fn left_left_red<K, V>(h: &RbNode<K, V>) -> bool {
    h.left.as_ref().is_some_and(|l| is_red(&l.left))
}

#[inline]
fn right_left_red<K, V>(h: &RbNode<K, V>) -> bool {
    h.right.as_ref().is_some_and(|r| is_red(&r.left))
}

// =============================================================================
// Rotations and colour flips
// =============================================================================

//        h                x
//       / \              / \
//      a  (x)   =>     (h)  c
//         / \          / \
//        b   c        a   b
fn rotate_left<K, V>(mut h: Box<RbNode<K, V>>) -> Box<RbNode<K, V>> {
    let Some(mut x) = h.right.take() else {
        return h;
    };
    h.right = x.left.take();
    x.meta = h.meta;
    h.meta = Color::Red;
    x.left = Some(h);
    x
}

//          h            x
//         / \          / \
//       (x)  c   =>   a  (h)
//       / \              / \
//      a   b            b   c
fn rotate_right<K, V>(mut h: Box<RbNode<K, V>>) -> Box<RbNode<K, V>> {
    let Some(mut x) = h.left.take() else {
        return h;
    };
    h.left = x.right.take();
    x.meta = h.meta;
    h.meta = Color::Red;
    x.right = Some(h);
    x
}

fn flip_colors<K, V>(h: &mut RbNode<K, V>) {
    h.meta = h.meta.toggled();
    if let Some(left) = h.left.as_mut() {
        left.meta = left.meta.toggled();
    }
    if let Some(right) = h.right.as_mut() {
        right.meta = right.meta.toggled();
    }
}

/// Insert-side repair. The order of the three steps matters: a red right link
/// over a red left link must become a 4-node before it is split.
fn fix_up<K, V>(mut h: Box<RbNode<K, V>>) -> Box<RbNode<K, V>> {
    if is_red(&h.right) && !is_red(&h.left) {
        h = rotate_left(h);
    }
    if is_red(&h.left) && left_left_red(&h) {
        h = rotate_right(h);
    }
    if is_red(&h.left) && is_red(&h.right) {
        flip_colors(&mut h);
    }
    h
}

/// Delete-side repair. Unlike insert, any red right link is rotated left, since
/// deletion can leave a right-leaning red under a red left child.
fn balance<K, V>(mut h: Box<RbNode<K, V>>) -> Box<RbNode<K, V>> {
    if is_red(&h.right) {
        h = rotate_left(h);
    }
    if is_red(&h.left) && left_left_red(&h) {
        h = rotate_right(h);
    }
    if is_red(&h.left) && is_red(&h.right) {
        flip_colors(&mut h);
    }
    h
}

/// Make `h.left` or one of its children red, borrowing from the right sibling
/// when it is a 3-node.
fn move_red_left<K, V>(mut h: Box<RbNode<K, V>>) -> Box<RbNode<K, V>> {
    flip_colors(&mut h);
    if right_left_red(&h) {
        h.right = h.right.take().map(rotate_right);
        h = rotate_left(h);
        flip_colors(&mut h);
    }
    h
}

/// Mirror of `move_red_left` for the right child.
fn move_red_right<K, V>(mut h: Box<RbNode<K, V>>) -> Box<RbNode<K, V>> {
    flip_colors(&mut h);
    if left_left_red(&h) {
        h = rotate_right(h);
        flip_colors(&mut h);
    }
    h
}

// =============================================================================
// Insert
// =============================================================================

fn put<K, V, KD, VD>(
    slot: &mut RbLink<K, V>,
    key: K,
    value: Option<V>,
    schema: &Schema<KD, VD>,
) -> Result<Insert, Error>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    let Some(node) = slot.as_mut() else {
        *slot = Some(Node::try_new(key, value, Color::leaf())?);
        return Ok(Insert::Added);
    };

    let outcome = match schema.compare(&key, &node.key) {
        Ordering::Less => put(&mut node.left, key, value, schema)?,
        Ordering::Greater => put(&mut node.right, key, value, schema)?,
        Ordering::Equal => {
            if let Some(value) = value {
                schema.assign_value(&mut node.value, value);
            }
            return Ok(Insert::Present);
        }
    };

    if outcome == Insert::Added {
        *slot = slot.take().map(fix_up);
    }
    Ok(outcome)
}

// =============================================================================
// Delete
// =============================================================================

/// Remove `key`, which must be present under `h`.
fn delete<K, V, KD, VD>(mut h: Box<RbNode<K, V>>, key: &K, schema: &Schema<KD, VD>) -> RbLink<K, V>
where
    KD: TypeDescriptor<K>,
    VD: TypeDescriptor<V>,
{
    if schema.compare(key, &h.key) == Ordering::Less {
        if !is_red(&h.left) && !left_left_red(&h) {
            h = move_red_left(h);
        }
        h.left = h.left.take().and_then(|left| delete(left, key, schema));
    } else {
        if is_red(&h.left) {
            h = rotate_right(h);
        }
        if schema.compare(key, &h.key) == Ordering::Equal && h.right.is_none() {
            // A black node with no right child has no left child either.
            schema.release(h);
            return None;
        }
        if !is_red(&h.right) && !right_left_red(&h) {
            h = move_red_right(h);
        }
        if schema.compare(key, &h.key) == Ordering::Equal {
            if let Some(right) = h.right.take() {
                let (right, successor) = remove_min(right);
                h.right = right;
                schema.relocate(&mut *h, successor);
            }
        } else {
            h.right = h.right.take().and_then(|right| delete(right, key, schema));
        }
    }
    Some(balance(h))
}

/// Detach the minimum of the subtree at `h`; returns the new subtree root and
/// the detached node.
fn remove_min<K, V>(mut h: Box<RbNode<K, V>>) -> (RbLink<K, V>, Box<RbNode<K, V>>) {
    if h.left.is_none() {
        return (h.right.take(), h);
    }
    if !is_red(&h.left) && !left_left_red(&h) {
        h = move_red_left(h);
    }
    match h.left.take() {
        Some(left) => {
            let (left, min) = remove_min(left);
            h.left = left;
            (Some(balance(h)), min)
        }
        None => (h.right.take(), h),
    }
}
