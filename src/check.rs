//! Structural invariant checker.
//!
//! Nothing here runs on the engines' own paths. The façade calls in after a
//! mutation when verification is enabled, and `Tree::validate` exposes the same
//! walk to callers and tests.

use std::cmp::Ordering;
use std::fmt;

use crate::descriptor::TypeDescriptor;
use crate::llrb::is_red;
use crate::node::{height, Balance, Color, Direction, Link, Meta, Metadata, Walk};
use crate::Flavor;

/// Shape summary of a valid tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub entries: usize,
    /// Nodes on the longest root-to-leaf path.
    pub height: usize,
    /// Black nodes on any root-to-leaf path, red-black trees only.
    pub black_height: Option<usize>,
    pub red_nodes: usize,
    pub leaves: usize,
}

/// A broken invariant. Depths count from the root at `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    /// The in-order successor at `position` does not compare greater than its
    /// predecessor.
    Disorder { position: usize },
    CountMismatch { recorded: usize, reachable: usize },
    /// The tree is deeper than any balanced tree of its size can be.
    TooTall { height: usize, bound: usize },
    /// A stored AVL balance differs from `height(right) - height(left)`.
    StaleBalance { depth: usize, stored: i8, actual: isize },
    Unbalanced { depth: usize, balance: isize },
    RightLeaningRed { depth: usize },
    ConsecutiveReds { depth: usize },
    UnevenBlackHeight { depth: usize, left: usize, right: usize },
    RedRoot,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Violation::Disorder { position } => {
                write!(f, "key at in-order position {position} is out of order")
            }
            Violation::CountMismatch {
                recorded,
                reachable,
            } => write!(f, "count is {recorded} but {reachable} nodes are reachable"),
            Violation::TooTall { height, bound } => {
                write!(f, "height {height} exceeds the balanced bound {bound}")
            }
            Violation::StaleBalance {
                depth,
                stored,
                actual,
            } => write!(f, "balance {stored} at depth {depth}, subtree heights give {actual}"),
            Violation::Unbalanced { depth, balance } => {
                write!(f, "balance {balance} at depth {depth}")
            }
            Violation::RightLeaningRed { depth } => write!(f, "red right link at depth {depth}"),
            Violation::ConsecutiveReds { depth } => {
                write!(f, "red node under a red parent at depth {depth}")
            }
            Violation::UnevenBlackHeight { depth, left, right } => write!(
                f,
                "black heights {left} and {right} differ below depth {depth}"
            ),
            Violation::RedRoot => f.write_str("root is red"),
        }
    }
}

impl std::error::Error for Violation {}

/// Largest height a balanced tree with `count` nodes may reach. Both AVL
/// (about 1.44 log2 n) and LLRB (2 log2 n) trees stay under it.
fn height_bound(count: usize) -> usize {
    let bits = (usize::BITS - (count + 2).leading_zeros()) as usize;
    2 * bits + 1
}

/// Order and count, in one iterative in-order pass.
pub(crate) fn check_order<K, V, M, KD>(root: &Link<K, V, M>, key_type: &KD, recorded: usize) -> Result<(), Violation>
where
    KD: TypeDescriptor<K>,
{
    let mut reachable = 0;
    let mut prev: Option<&K> = None;
    for node in Walk::new(root, Direction::Forward) {
        if let Some(prev) = prev {
            if key_type.compare(prev, &node.key) != Ordering::Less {
                return Err(Violation::Disorder {
                    position: reachable,
                });
            }
        }
        prev = Some(&node.key);
        reachable += 1;
    }
    if reachable != recorded {
        return Err(Violation::CountMismatch {
            recorded,
            reachable,
        });
    }
    Ok(())
}

/// Rejects degenerate shapes before a recursive check walks them.
fn check_depth<K, V, M>(root: &Link<K, V, M>, count: usize) -> Result<usize, Violation> {
    let height = height(root);
    let bound = height_bound(count);
    if height > bound {
        return Err(Violation::TooTall { height, bound });
    }
    Ok(height)
}

pub(crate) fn check_avl<K, V>(root: &Link<K, V, Balance>, count: usize) -> Result<(), Violation> {
    check_depth(root, count)?;
    avl_height(root, 0).map(drop)
}

fn avl_height<K, V>(link: &Link<K, V, Balance>, depth: usize) -> Result<usize, Violation> {
    let Some(node) = link.as_deref() else {
        return Ok(0);
    };
    let left = avl_height(&node.left, depth + 1)?;
    let right = avl_height(&node.right, depth + 1)?;
    let actual = right as isize - left as isize;
    let stored = node.meta.0;
    if stored as isize != actual {
        return Err(Violation::StaleBalance {
            depth,
            stored,
            actual,
        });
    }
    if !(-1..=1).contains(&actual) {
        return Err(Violation::Unbalanced {
            depth,
            balance: actual,
        });
    }
    Ok(left.max(right) + 1)
}

pub(crate) fn check_llrb<K, V>(root: &Link<K, V, Color>, count: usize) -> Result<(), Violation> {
    if is_red(root) {
        return Err(Violation::RedRoot);
    }
    check_depth(root, count)?;
    black_height(root, false, 0).map(drop)
}

fn black_height<K, V>(link: &Link<K, V, Color>, parent_red: bool, depth: usize) -> Result<usize, Violation> {
    let Some(node) = link.as_deref() else {
        return Ok(0);
    };
    let red = node.meta == Color::Red;
    if red && parent_red {
        return Err(Violation::ConsecutiveReds { depth });
    }
    if is_red(&node.right) {
        return Err(Violation::RightLeaningRed { depth: depth + 1 });
    }
    let left = black_height(&node.left, red, depth + 1)?;
    let right = black_height(&node.right, red, depth + 1)?;
    if left != right {
        return Err(Violation::UnevenBlackHeight { depth, left, right });
    }
    Ok(left + usize::from(!red))
}

/// Whether every node's subtree heights differ by at most one, computed from
/// the shape alone. Meaningful for any flavor.
pub(crate) fn height_balanced<K, V, M>(root: &Link<K, V, M>, count: usize) -> bool {
    fn balanced_height<K, V, M>(link: &Link<K, V, M>) -> Option<usize> {
        let Some(node) = link.as_deref() else {
            return Some(0);
        };
        let left = balanced_height(&node.left)?;
        let right = balanced_height(&node.right)?;
        (left.abs_diff(right) <= 1).then_some(left.max(right) + 1)
    }

    check_depth(root, count).is_ok() && balanced_height(root).is_some()
}

/// Collect [`Stats`] without recursion. Black height is read off the leftmost
/// path, which is only meaningful once the tree has passed `check_llrb`.
pub(crate) fn survey<K, V, M: Metadata>(root: &Link<K, V, M>) -> Stats {
    let mut stats = Stats::default();
    for node in Walk::new(root, Direction::Forward) {
        stats.entries += 1;
        if node.is_leaf() {
            stats.leaves += 1;
        }
        if node.meta.view() == Meta::Color(Color::Red) {
            stats.red_nodes += 1;
        }
    }
    stats.height = height(root);

    if M::FLAVOR == Flavor::RedBlack {
        let mut blacks = 0;
        let mut current = root.as_deref();
        while let Some(node) = current {
            if node.meta.view() == Meta::Color(Color::Black) {
                blacks += 1;
            }
            current = node.left.as_deref();
        }
        stats.black_height = Some(blacks);
    }
    stats
}
