//! Lazy flattening of a chosen interval graph into concrete key ranges.
//!
//! The walker keeps one stack frame per keypart depth. Descent into a
//! continuation happens only while the current interval is a single point
//! and the continuation starts at the immediately following keypart, so
//! every emitted range has a concrete, gap-free key prefix. A non-point
//! interval with a continuation, or a continuation that skips a keypart,
//! stops the descent and the prefix range is emitted whole; the result is
//! a superset of the matching rows and relies on residual filtering,
//! never a miss.

use crate::{
    interval::{Handle, IntervalArena, tree},
    value::Value,
};
use std::ops::Bound;

///
/// KeyRange
///
/// One scan range over index key tuples. A side with an empty tuple is
/// unbounded; a side whose tuple is shorter than the index key compares on
/// the provided keyparts only, admitting every extension.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyRange {
    pub start: Vec<Value>,
    pub start_inclusive: bool,
    pub end: Vec<Value>,
    pub end_inclusive: bool,
}

impl KeyRange {
    /// True when both sides pin the same full tuple.
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.start_inclusive
            && self.end_inclusive
            && !self.start.is_empty()
            && self.start == self.end
    }
}

///
/// RangeSequence
///
/// Forward-only cursor over one interval graph. Not restartable; build a
/// new sequence from the root to iterate again.
///

pub struct RangeSequence<'a> {
    arena: &'a IntervalArena,
    stack: Vec<Handle>,
}

impl<'a> RangeSequence<'a> {
    #[must_use]
    pub(crate) fn new(arena: &'a IntervalArena, root: Handle) -> Self {
        let mut sequence = Self {
            arena,
            stack: Vec::new(),
        };
        sequence.stack.push(tree::leftmost(arena, root));
        sequence.descend();
        sequence
    }

    // Push continuation frames while the deepest interval pins one value
    // and the continuation extends the key tuple without a keypart gap.
    fn descend(&mut self) {
        loop {
            let Some(&top) = self.stack.last() else {
                return;
            };
            let node = self.arena.node(top);
            if !node.is_point() {
                return;
            }
            let Some(continuation) = node.continuation else {
                return;
            };
            if self.arena.node(continuation).keypart != node.keypart + 1 {
                return;
            }
            self.stack.push(tree::leftmost(self.arena, continuation));
        }
    }

    // Move to the next interval: advance the deepest frame sideways, popping
    // exhausted frames.
    fn advance(&mut self) {
        while let Some(top) = self.stack.pop() {
            if let Some(next) = self.arena.node(top).next {
                self.stack.push(next);
                self.descend();
                return;
            }
        }
    }

    fn emit(&self) -> KeyRange {
        let mut start = Vec::with_capacity(self.stack.len());
        let mut end = Vec::with_capacity(self.stack.len());
        let mut start_inclusive = true;
        let mut end_inclusive = true;

        // All frames above the deepest are points; they contribute the
        // shared prefix.
        for &handle in &self.stack[..self.stack.len() - 1] {
            let node = self.arena.node(handle);
            let Some(value) = node.point_value() else {
                unreachable!("non-point interval above the deepest frame");
            };
            start.push(value.clone());
            end.push(value.clone());
        }

        let Some(&deepest) = self.stack.last() else {
            unreachable!("emit on an exhausted sequence");
        };
        let node = self.arena.node(deepest);
        match &node.lower {
            Bound::Included(value) => start.push(value.clone()),
            Bound::Excluded(value) => {
                start.push(value.clone());
                start_inclusive = false;
            }
            Bound::Unbounded => {}
        }
        match &node.upper {
            Bound::Included(value) => end.push(value.clone()),
            Bound::Excluded(value) => {
                end.push(value.clone());
                end_inclusive = false;
            }
            Bound::Unbounded => {}
        }

        KeyRange {
            start,
            start_inclusive,
            end,
            end_inclusive,
        }
    }
}

impl Iterator for RangeSequence<'_> {
    type Item = KeyRange;

    fn next(&mut self) -> Option<KeyRange> {
        if self.stack.is_empty() {
            return None;
        }
        let range = self.emit();
        self.advance();
        Some(range)
    }
}
