//! Slot+generation arena owning every interval node of one analysis call.
//!
//! Budget contract:
//! - Every allocation charges the fixed node footprint plus owned heap
//!   bytes of the bound values.
//! - Exceeding the byte budget, the depth cap, or the abort flag returns a
//!   recoverable `RangeError`; the caller discards the arena wholesale, so
//!   nodes orphaned by a mid-operation unwind are never observed.

use crate::{
    config::AbortFlag,
    error::RangeError,
    interval::node::IntervalNode,
};

///
/// Handle
///
/// Generation-checked reference to one arena slot. Stale handles are a
/// logic error and trip a debug assertion rather than aliasing a recycled
/// node.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle {
    slot: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<IntervalNode>,
}

///
/// IntervalArena
///

#[derive(Debug)]
pub struct IntervalArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live_bytes: usize,
    max_bytes: usize,
    max_depth: u32,
    abort: AbortFlag,
}

const NODE_BYTES: usize = std::mem::size_of::<IntervalNode>();

impl IntervalArena {
    #[must_use]
    pub fn new(max_bytes: usize, max_depth: u32, abort: AbortFlag) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live_bytes: 0,
            max_bytes,
            max_depth,
            abort,
        }
    }

    /// Allocate one detached node; its `share_count` starts at one.
    pub fn alloc(&mut self, node: IntervalNode) -> Result<Handle, RangeError> {
        self.check_abort()?;

        let charge = NODE_BYTES + node.heap_bytes();
        if self.live_bytes + charge > self.max_bytes {
            return Err(RangeError::BudgetExceeded {
                budget: self.max_bytes,
            });
        }
        self.live_bytes += charge;

        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            debug_assert!(entry.node.is_none(), "free list points at a live slot");
            entry.node = Some(node);
            return Ok(Handle {
                slot,
                generation: entry.generation,
            });
        }

        let slot = u32::try_from(self.slots.len())
            .map_err(|_| RangeError::BudgetExceeded {
                budget: self.max_bytes,
            })?;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        Ok(Handle {
            slot,
            generation: 0,
        })
    }

    /// Free one node and recycle its slot. Continuation bookkeeping is the
    /// caller's responsibility.
    pub(crate) fn free(&mut self, handle: Handle) {
        let entry = &mut self.slots[handle.slot as usize];
        debug_assert_eq!(entry.generation, handle.generation, "stale interval handle");

        let Some(node) = entry.node.take() else {
            unreachable!("double free of interval node");
        };
        self.live_bytes = self
            .live_bytes
            .saturating_sub(NODE_BYTES + node.heap_bytes());
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.slot);
    }

    #[must_use]
    pub(crate) fn node(&self, handle: Handle) -> &IntervalNode {
        let entry = &self.slots[handle.slot as usize];
        debug_assert_eq!(entry.generation, handle.generation, "stale interval handle");
        match entry.node.as_ref() {
            Some(node) => node,
            None => unreachable!("freed interval handle"),
        }
    }

    #[must_use]
    pub(crate) fn node_mut(&mut self, handle: Handle) -> &mut IntervalNode {
        let entry = &mut self.slots[handle.slot as usize];
        debug_assert_eq!(entry.generation, handle.generation, "stale interval handle");
        match entry.node.as_mut() {
            Some(node) => node,
            None => unreachable!("freed interval handle"),
        }
    }

    /// Cooperative guard called once per recursion step.
    pub(crate) fn step(&self, depth: u32) -> Result<(), RangeError> {
        self.check_abort()?;
        if depth > self.max_depth {
            return Err(RangeError::DepthExceeded {
                cap: self.max_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn check_abort(&self) -> Result<(), RangeError> {
        if self.abort.is_raised() {
            return Err(RangeError::Aborted);
        }
        Ok(())
    }

    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }
}
