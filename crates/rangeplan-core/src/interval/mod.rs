//! Interval graphs: arena-backed red-black trees of per-keypart intervals
//! linked through continuation edges, plus the AND/OR algebra over them.
//!
//! Sharing discipline:
//! - A tree root's `share_count` equals the number of live references to it
//!   (continuation edges plus externally held roots).
//! - A shared tree is never mutated in place; `ensure_exclusive` clones
//!   before mutation.
//! - Trees are freed only when their count reaches zero; the arena is
//!   discarded wholesale when an analysis call unwinds on error.

pub mod algebra;
pub mod arena;
pub mod invariants;
pub mod node;
pub mod tree;

#[cfg(test)]
mod property;

pub(crate) use arena::{Handle, IntervalArena};
pub(crate) use node::IntervalNode;
