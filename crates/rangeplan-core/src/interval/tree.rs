//! Red-black tree maintenance over arena handles.
//!
//! Standard CLRS insert/delete with parent pointers, plus two
//! domain-specific twists:
//! - every node is threaded into a `next`/`prev` sibling list in lower-bound
//!   order, maintained alongside the tree;
//! - freeing a node releases its continuation reference, cascading the free
//!   when that continuation's share count reaches zero.

use crate::interval::{
    arena::{Handle, IntervalArena},
    node::{Color, cmp_lower},
};
use std::cmp::Ordering;

/// Insert a detached node into the tree rooted at `root`; returns the new
/// root. Interval lower bounds within one tree are unique by construction.
pub(crate) fn insert(arena: &mut IntervalArena, root: Option<Handle>, node: Handle) -> Handle {
    let Some(old_root) = root else {
        arena.node_mut(node).color = Color::Black;
        return node;
    };

    // BST descent by lower bound.
    let mut current = old_root;
    let (parent, left_side) = loop {
        let ord = cmp_lower(&arena.node(node).lower, &arena.node(current).lower);
        debug_assert_ne!(ord, Ordering::Equal, "duplicate interval lower bound");
        if ord == Ordering::Less {
            match arena.node(current).left {
                Some(next) => current = next,
                None => break (current, true),
            }
        } else {
            match arena.node(current).right {
                Some(next) => current = next,
                None => break (current, false),
            }
        }
    };

    {
        let n = arena.node_mut(node);
        n.parent = Some(parent);
        n.left = None;
        n.right = None;
        n.color = Color::Red;
    }
    if left_side {
        arena.node_mut(parent).left = Some(node);
        // New left child: its successor is the parent.
        let prev = arena.node(parent).prev;
        arena.node_mut(node).next = Some(parent);
        arena.node_mut(node).prev = prev;
        arena.node_mut(parent).prev = Some(node);
        if let Some(prev) = prev {
            arena.node_mut(prev).next = Some(node);
        }
    } else {
        arena.node_mut(parent).right = Some(node);
        // New right child: its predecessor is the parent.
        let next = arena.node(parent).next;
        arena.node_mut(node).prev = Some(parent);
        arena.node_mut(node).next = next;
        arena.node_mut(parent).next = Some(node);
        if let Some(next) = next {
            arena.node_mut(next).prev = Some(node);
        }
    }

    let mut root = Some(old_root);
    insert_fixup(arena, &mut root, node);
    match root {
        Some(root) => root,
        None => unreachable!("insert emptied the tree"),
    }
}

/// Detach `node` from the tree and sibling list; returns the new root.
/// The node itself is not freed.
pub(crate) fn remove(arena: &mut IntervalArena, root: Handle, node: Handle) -> Option<Handle> {
    // Unlink from the sibling list first; tree surgery below does not
    // consult it.
    let (prev, next) = {
        let n = arena.node(node);
        (n.prev, n.next)
    };
    if let Some(prev) = prev {
        arena.node_mut(prev).next = next;
    }
    if let Some(next) = next {
        arena.node_mut(next).prev = prev;
    }
    {
        let n = arena.node_mut(node);
        n.prev = None;
        n.next = None;
    }

    let mut root = Some(root);
    let z = node;
    let mut y = z;
    let mut y_color = arena.node(y).color;
    let x: Option<Handle>;
    let x_parent: Option<Handle>;

    let z_left = arena.node(z).left;
    let z_right = arena.node(z).right;
    if z_left.is_none() {
        x = z_right;
        x_parent = arena.node(z).parent;
        transplant(arena, &mut root, z, z_right);
    } else if z_right.is_none() {
        x = z_left;
        x_parent = arena.node(z).parent;
        transplant(arena, &mut root, z, z_left);
    } else {
        let right = match z_right {
            Some(right) => right,
            None => unreachable!("two-child case without right child"),
        };
        y = subtree_min(arena, right);
        y_color = arena.node(y).color;
        x = arena.node(y).right;
        if arena.node(y).parent == Some(z) {
            x_parent = Some(y);
        } else {
            x_parent = arena.node(y).parent;
            let y_right = arena.node(y).right;
            transplant(arena, &mut root, y, y_right);
            let z_right = arena.node(z).right;
            arena.node_mut(y).right = z_right;
            if let Some(z_right) = z_right {
                arena.node_mut(z_right).parent = Some(y);
            }
        }
        transplant(arena, &mut root, z, Some(y));
        let z_left = arena.node(z).left;
        arena.node_mut(y).left = z_left;
        if let Some(z_left) = z_left {
            arena.node_mut(z_left).parent = Some(y);
        }
        let z_color = arena.node(z).color;
        arena.node_mut(y).color = z_color;
    }

    {
        let n = arena.node_mut(z);
        n.parent = None;
        n.left = None;
        n.right = None;
        n.color = Color::Red;
    }

    if y_color == Color::Black {
        delete_fixup(arena, &mut root, x, x_parent);
    }
    root
}

/// Bump the reference count of a tree root.
pub(crate) fn retain(arena: &mut IntervalArena, root: Handle) {
    arena.node_mut(root).share_count += 1;
}

/// Drop one reference to a tree root; frees the whole tree (cascading into
/// continuations) when the count reaches zero.
pub(crate) fn release(arena: &mut IntervalArena, root: Handle) {
    let remaining = {
        let n = arena.node_mut(root);
        debug_assert!(n.share_count > 0, "release of unreferenced tree");
        n.share_count -= 1;
        n.share_count
    };
    if remaining > 0 {
        return;
    }

    for handle in handles(arena, root) {
        free_detached(arena, handle);
    }
}

/// Free one node that is no longer tree-linked, releasing its continuation.
pub(crate) fn free_detached(arena: &mut IntervalArena, node: Handle) {
    if let Some(continuation) = arena.node(node).continuation {
        release(arena, continuation);
    }
    arena.free(node);
}

/// Leftmost (first in interval order) node of a subtree.
pub(crate) fn leftmost(arena: &IntervalArena, mut handle: Handle) -> Handle {
    while let Some(left) = arena.node(handle).left {
        handle = left;
    }
    handle
}

fn subtree_min(arena: &IntervalArena, handle: Handle) -> Handle {
    leftmost(arena, handle)
}

/// All nodes of a tree in ascending interval order, via the sibling list.
pub(crate) fn handles(arena: &IntervalArena, root: Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut current = Some(leftmost(arena, root));
    while let Some(handle) = current {
        out.push(handle);
        current = arena.node(handle).next;
    }
    out
}

fn color_of(arena: &IntervalArena, handle: Option<Handle>) -> Color {
    handle.map_or(Color::Black, |h| arena.node(h).color)
}

fn transplant(
    arena: &mut IntervalArena,
    root: &mut Option<Handle>,
    u: Handle,
    v: Option<Handle>,
) {
    let u_parent = arena.node(u).parent;
    match u_parent {
        None => *root = v,
        Some(parent) => {
            if arena.node(parent).left == Some(u) {
                arena.node_mut(parent).left = v;
            } else {
                arena.node_mut(parent).right = v;
            }
        }
    }
    if let Some(v) = v {
        arena.node_mut(v).parent = u_parent;
    }
}

fn rotate_left(arena: &mut IntervalArena, root: &mut Option<Handle>, x: Handle) {
    let y = match arena.node(x).right {
        Some(y) => y,
        None => unreachable!("rotate_left without right child"),
    };
    let y_left = arena.node(y).left;
    arena.node_mut(x).right = y_left;
    if let Some(y_left) = y_left {
        arena.node_mut(y_left).parent = Some(x);
    }
    let x_parent = arena.node(x).parent;
    arena.node_mut(y).parent = x_parent;
    match x_parent {
        None => *root = Some(y),
        Some(parent) => {
            if arena.node(parent).left == Some(x) {
                arena.node_mut(parent).left = Some(y);
            } else {
                arena.node_mut(parent).right = Some(y);
            }
        }
    }
    arena.node_mut(y).left = Some(x);
    arena.node_mut(x).parent = Some(y);
}

fn rotate_right(arena: &mut IntervalArena, root: &mut Option<Handle>, x: Handle) {
    let y = match arena.node(x).left {
        Some(y) => y,
        None => unreachable!("rotate_right without left child"),
    };
    let y_right = arena.node(y).right;
    arena.node_mut(x).left = y_right;
    if let Some(y_right) = y_right {
        arena.node_mut(y_right).parent = Some(x);
    }
    let x_parent = arena.node(x).parent;
    arena.node_mut(y).parent = x_parent;
    match x_parent {
        None => *root = Some(y),
        Some(parent) => {
            if arena.node(parent).left == Some(x) {
                arena.node_mut(parent).left = Some(y);
            } else {
                arena.node_mut(parent).right = Some(y);
            }
        }
    }
    arena.node_mut(y).right = Some(x);
    arena.node_mut(x).parent = Some(y);
}

fn insert_fixup(arena: &mut IntervalArena, root: &mut Option<Handle>, mut z: Handle) {
    loop {
        let Some(parent) = arena.node(z).parent else {
            break;
        };
        if arena.node(parent).color != Color::Red {
            break;
        }
        // A red parent is never the root, so the grandparent exists.
        let Some(grand) = arena.node(parent).parent else {
            break;
        };

        if arena.node(grand).left == Some(parent) {
            let uncle = arena.node(grand).right;
            if color_of(arena, uncle) == Color::Red {
                let Some(uncle) = uncle else {
                    unreachable!("red uncle without handle");
                };
                arena.node_mut(parent).color = Color::Black;
                arena.node_mut(uncle).color = Color::Black;
                arena.node_mut(grand).color = Color::Red;
                z = grand;
            } else {
                let mut z_top = z;
                let mut parent_top = parent;
                if arena.node(parent).right == Some(z) {
                    z_top = parent;
                    rotate_left(arena, root, z_top);
                    parent_top = match arena.node(z_top).parent {
                        Some(p) => p,
                        None => unreachable!("rotated node lost its parent"),
                    };
                }
                arena.node_mut(parent_top).color = Color::Black;
                arena.node_mut(grand).color = Color::Red;
                rotate_right(arena, root, grand);
                z = z_top;
            }
        } else {
            let uncle = arena.node(grand).left;
            if color_of(arena, uncle) == Color::Red {
                let Some(uncle) = uncle else {
                    unreachable!("red uncle without handle");
                };
                arena.node_mut(parent).color = Color::Black;
                arena.node_mut(uncle).color = Color::Black;
                arena.node_mut(grand).color = Color::Red;
                z = grand;
            } else {
                let mut z_top = z;
                let mut parent_top = parent;
                if arena.node(parent).left == Some(z) {
                    z_top = parent;
                    rotate_right(arena, root, z_top);
                    parent_top = match arena.node(z_top).parent {
                        Some(p) => p,
                        None => unreachable!("rotated node lost its parent"),
                    };
                }
                arena.node_mut(parent_top).color = Color::Black;
                arena.node_mut(grand).color = Color::Red;
                rotate_left(arena, root, grand);
                z = z_top;
            }
        }
    }

    if let Some(root) = *root {
        arena.node_mut(root).color = Color::Black;
    }
}

fn delete_fixup(
    arena: &mut IntervalArena,
    root: &mut Option<Handle>,
    mut x: Option<Handle>,
    mut x_parent: Option<Handle>,
) {
    while x != *root && color_of(arena, x) == Color::Black {
        let Some(parent) = x_parent else {
            break;
        };

        if arena.node(parent).left == x {
            let Some(mut sibling) = arena.node(parent).right else {
                break;
            };
            if arena.node(sibling).color == Color::Red {
                arena.node_mut(sibling).color = Color::Black;
                arena.node_mut(parent).color = Color::Red;
                rotate_left(arena, root, parent);
                sibling = match arena.node(parent).right {
                    Some(s) => s,
                    None => break,
                };
            }
            let s_left = arena.node(sibling).left;
            let s_right = arena.node(sibling).right;
            if color_of(arena, s_left) == Color::Black && color_of(arena, s_right) == Color::Black {
                arena.node_mut(sibling).color = Color::Red;
                x = Some(parent);
                x_parent = arena.node(parent).parent;
            } else {
                if color_of(arena, s_right) == Color::Black {
                    if let Some(s_left) = s_left {
                        arena.node_mut(s_left).color = Color::Black;
                    }
                    arena.node_mut(sibling).color = Color::Red;
                    rotate_right(arena, root, sibling);
                    sibling = match arena.node(parent).right {
                        Some(s) => s,
                        None => break,
                    };
                }
                let parent_color = arena.node(parent).color;
                arena.node_mut(sibling).color = parent_color;
                arena.node_mut(parent).color = Color::Black;
                if let Some(s_right) = arena.node(sibling).right {
                    arena.node_mut(s_right).color = Color::Black;
                }
                rotate_left(arena, root, parent);
                x = *root;
                x_parent = None;
            }
        } else {
            let Some(mut sibling) = arena.node(parent).left else {
                break;
            };
            if arena.node(sibling).color == Color::Red {
                arena.node_mut(sibling).color = Color::Black;
                arena.node_mut(parent).color = Color::Red;
                rotate_right(arena, root, parent);
                sibling = match arena.node(parent).left {
                    Some(s) => s,
                    None => break,
                };
            }
            let s_left = arena.node(sibling).left;
            let s_right = arena.node(sibling).right;
            if color_of(arena, s_left) == Color::Black && color_of(arena, s_right) == Color::Black {
                arena.node_mut(sibling).color = Color::Red;
                x = Some(parent);
                x_parent = arena.node(parent).parent;
            } else {
                if color_of(arena, s_left) == Color::Black {
                    if let Some(s_right) = s_right {
                        arena.node_mut(s_right).color = Color::Black;
                    }
                    arena.node_mut(sibling).color = Color::Red;
                    rotate_left(arena, root, sibling);
                    sibling = match arena.node(parent).left {
                        Some(s) => s,
                        None => break,
                    };
                }
                let parent_color = arena.node(parent).color;
                arena.node_mut(sibling).color = parent_color;
                arena.node_mut(parent).color = Color::Black;
                if let Some(s_left) = arena.node(sibling).left {
                    arena.node_mut(s_left).color = Color::Black;
                }
                rotate_right(arena, root, parent);
                x = *root;
                x_parent = None;
            }
        }
    }

    if let Some(x) = x {
        arena.node_mut(x).color = Color::Black;
    }
}
