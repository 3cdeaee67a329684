use std::collections::HashMap;

use crate::{BlockId, XactId};

/// Reserved parameter under which a displaced owner's residual time is saved.
pub const RESIDUAL_TIME_PARAMETER: &str = "residual-time";

/// The mobile entity of the simulation.
///
/// A transaction is created by a generator block and destroyed by a
/// terminator block. At any point outside an active chain transfer it is a
/// member of exactly one chain: ready, future, one blocked chain, or one
/// preempted chain.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: XactId,
    priority: i32,
    move_time: f32,
    mark_time: f32,
    assembly_set: usize,
    parameters: HashMap<String, f32>,
    current_block: BlockId,
    pending_block: Option<BlockId>,
    ownership_granted: bool,
    restore_to_fec: bool,
}

impl Transaction {
    pub(crate) fn new(id: XactId, priority: i32, move_time: f32, block: BlockId) -> Self {
        Self {
            id,
            priority,
            move_time,
            mark_time: move_time,
            assembly_set: id.into(),
            parameters: HashMap::new(),
            current_block: block,
            pending_block: None,
            ownership_granted: false,
            restore_to_fec: false,
        }
    }

    /// The transaction's unique ID.
    #[must_use]
    pub fn id(&self) -> XactId {
        self.id
    }

    /// Scheduling priority; higher runs first.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The absolute time at which the transaction becomes (or became) ready.
    #[must_use]
    pub fn move_time(&self) -> f32 {
        self.move_time
    }

    pub(crate) fn set_move_time(&mut self, time: f32) {
        self.move_time = time;
    }

    /// The time at which the transaction entered the model, for transit-time
    /// queries.
    #[must_use]
    pub fn mark_time(&self) -> f32 {
        self.mark_time
    }

    /// The assembly set the transaction belongs to.
    #[must_use]
    pub fn assembly_set(&self) -> usize {
        self.assembly_set
    }

    /// The next block this transaction executes.
    #[must_use]
    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    pub(crate) fn set_current_block(&mut self, block: BlockId) {
        self.current_block = block;
    }

    /// Redirect target set by the preemption protocol, honored by the next
    /// delay block the transaction passes through.
    #[must_use]
    pub fn pending_block(&self) -> Option<BlockId> {
        self.pending_block
    }

    pub(crate) fn set_pending_block(&mut self, block: Option<BlockId>) {
        self.pending_block = block;
    }

    pub(crate) fn take_pending_block(&mut self) -> Option<BlockId> {
        self.pending_block.take()
    }

    /// Whether the transaction currently holds (or may re-acquire) ownership
    /// of a contended facility.
    #[must_use]
    pub fn ownership_granted(&self) -> bool {
        self.ownership_granted
    }

    pub(crate) fn set_ownership_granted(&mut self, granted: bool) {
        self.ownership_granted = granted;
    }

    pub(crate) fn set_restore_to_fec(&mut self, restore: bool) {
        self.restore_to_fec = restore;
    }

    /// Consumes the restore flag set when the transaction was displaced from
    /// the future chain with unexpired delay.
    pub(crate) fn take_restore_to_fec(&mut self) -> bool {
        std::mem::replace(&mut self.restore_to_fec, false)
    }

    /// Looks up a named parameter.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters.get(name).copied()
    }

    /// Sets a named parameter.
    pub fn set_parameter<S: Into<String>>(&mut self, name: S, value: f32) {
        self.parameters.insert(name.into(), value);
    }

    /// The saved residual time, if the transaction was ever displaced from
    /// the future chain.
    #[must_use]
    pub fn residual_time(&self) -> Option<f32> {
        self.parameter(RESIDUAL_TIME_PARAMETER)
    }
}
