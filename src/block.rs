//! Block nodes of the process network and their execution semantics.
//!
//! Every block implements the same contract: executed for a transaction
//! popped from the ready chain, it increments its lifetime entry count and
//! either returns the next block to continue scanning with, or returns
//! nothing after having placed the transaction into exactly one other chain
//! (or terminated it).

use rand::Rng;
use std::str::FromStr;

use crate::error::Error;
use crate::transaction::RESIDUAL_TIME_PARAMETER;
use crate::{BlockId, Model, XactId};

/// Mode of a logic-toggle block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
pub enum LogicMode {
    /// Force the switch on (capture).
    #[strum(serialize = "S")]
    Set,
    /// Force the switch off (release).
    #[strum(serialize = "R")]
    Reset,
    /// Toggle the switch.
    #[strum(serialize = "I")]
    Invert,
}

/// Removal/continuation mode of the out-of-service block's `B` and `E`
/// operands. An absent mode (the empty operand) means the default
/// disposition: preemption for the owner, ineligibility for the waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
pub enum RemovalMode {
    /// Remove the transactions from contention for the facility.
    #[strum(serialize = "RE")]
    Remove,
    /// Let the transactions keep contending through the unavailable period.
    #[strum(serialize = "CO")]
    Continue,
}

impl RemovalMode {
    /// Parses an operand string; the empty string is the absent mode.
    ///
    /// # Errors
    ///
    /// Returns the unrecognized keyword.
    pub fn from_operand(operand: &str) -> Result<Option<Self>, String> {
        if operand.is_empty() {
            Ok(None)
        } else {
            Self::from_str(operand).map(Some).map_err(|_| operand.to_string())
        }
    }
}

/// The closed set of block kinds.
///
/// Operands are expression strings resolved through the attribute service at
/// execution time, so they may name clock values, entity statistics, or
/// transaction parameters as well as plain numbers.
#[derive(Debug, Clone)]
pub enum BlockKind {
    /// Source block: creates the transactions of its stream.
    Generate {
        /// Mean inter-arrival time (`A`).
        interval: String,
        /// Uniform half-range around the mean (`B`).
        spread: String,
        /// Offset of the first arrival (`C`).
        start_delay: String,
        /// Creation limit (`D`); empty means unlimited.
        limit: String,
        /// Priority of created transactions (`E`).
        priority: String,
    },
    /// Delay node: parks the transaction in the future chain.
    Advance {
        /// Mean delay (`A`).
        interval: String,
        /// Uniform half-range around the mean (`B`).
        spread: String,
    },
    /// Captures a single-capacity facility, or waits for it.
    Seize {
        /// Facility name (`A`).
        facility: String,
    },
    /// Releases a previously captured facility.
    Release {
        /// Facility name (`A`).
        facility: String,
    },
    /// Enters a waiting line, collecting queue statistics.
    Enqueue {
        /// Queue name (`A`).
        queue: String,
        /// Units to enter (`B`); empty means 1.
        units: String,
    },
    /// Leaves a waiting line.
    Depart {
        /// Queue name (`A`).
        queue: String,
        /// Units to leave (`B`); empty means 1.
        units: String,
    },
    /// Occupies units of a multi-capacity storage, or waits for room.
    Enter {
        /// Storage name (`A`).
        storage: String,
        /// Units to occupy (`B`); empty means 1.
        units: String,
    },
    /// Frees units of a multi-capacity storage.
    Leave {
        /// Storage name (`A`).
        storage: String,
        /// Units to free (`B`); empty means 1.
        units: String,
    },
    /// Operates a named logic switch.
    Logic {
        /// Set, reset, or invert.
        mode: LogicMode,
        /// Switch name (`A`).
        switch: String,
    },
    /// Marks a facility out of service and resolves the fate of its owner,
    /// its preempted transactions, and its waiters.
    Funavail {
        /// Facility name (`A`).
        facility: String,
        /// Owner disposition (`B`).
        owner_mode: Option<RemovalMode>,
        /// Owner destination label (`C`, mandatory).
        owner_dest: String,
        /// Parameter receiving the owner's residual time (`D`).
        residual_param: String,
        /// Preempted-population disposition (`E`).
        preempted_mode: Option<RemovalMode>,
        /// Preempted-population destination label (`F`, mandatory).
        preempted_dest: String,
    },
    /// Destroys the transaction and decrements the termination counter.
    Terminate {
        /// Counter decrement (`A`); empty means 1.
        units: String,
    },
}

impl BlockKind {
    /// Short kind name for logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Generate { .. } => "GENERATE",
            BlockKind::Advance { .. } => "ADVANCE",
            BlockKind::Seize { .. } => "SEIZE",
            BlockKind::Release { .. } => "RELEASE",
            BlockKind::Enqueue { .. } => "QUEUE",
            BlockKind::Depart { .. } => "DEPART",
            BlockKind::Enter { .. } => "ENTER",
            BlockKind::Leave { .. } => "LEAVE",
            BlockKind::Logic { .. } => "LOGIC",
            BlockKind::Funavail { .. } => "FUNAVAIL",
            BlockKind::Terminate { .. } => "TERMINATE",
        }
    }

    /// Whether this kind releases a resource. Removal-mode destinations must
    /// not route displaced transactions into such a block.
    #[must_use]
    pub fn releases_resource(&self) -> bool {
        matches!(self, BlockKind::Release { .. } | BlockKind::Leave { .. })
    }

    /// Whether this kind represents a delay a redirected owner must pass
    /// through before reaching its new destination.
    #[must_use]
    pub fn is_delay(&self) -> bool {
        matches!(self, BlockKind::Advance { .. })
    }

    /// A source block with the given inter-arrival operands.
    pub fn generate<S: Into<String>>(
        interval: S,
        spread: S,
        start_delay: S,
        limit: S,
        priority: S,
    ) -> Self {
        BlockKind::Generate {
            interval: interval.into(),
            spread: spread.into(),
            start_delay: start_delay.into(),
            limit: limit.into(),
            priority: priority.into(),
        }
    }

    /// A delay block.
    pub fn advance<S: Into<String>>(interval: S, spread: S) -> Self {
        BlockKind::Advance {
            interval: interval.into(),
            spread: spread.into(),
        }
    }

    /// A facility-capturing block.
    pub fn seize<S: Into<String>>(facility: S) -> Self {
        BlockKind::Seize {
            facility: facility.into(),
        }
    }

    /// A facility-releasing block.
    pub fn release<S: Into<String>>(facility: S) -> Self {
        BlockKind::Release {
            facility: facility.into(),
        }
    }

    /// A queue-entering block for one unit.
    pub fn enqueue<S: Into<String>>(queue: S) -> Self {
        BlockKind::Enqueue {
            queue: queue.into(),
            units: String::new(),
        }
    }

    /// A queue-leaving block for one unit.
    pub fn depart<S: Into<String>>(queue: S) -> Self {
        BlockKind::Depart {
            queue: queue.into(),
            units: String::new(),
        }
    }

    /// A storage-entering block.
    pub fn enter<S: Into<String>>(storage: S, units: S) -> Self {
        BlockKind::Enter {
            storage: storage.into(),
            units: units.into(),
        }
    }

    /// A storage-leaving block.
    pub fn leave<S: Into<String>>(storage: S, units: S) -> Self {
        BlockKind::Leave {
            storage: storage.into(),
            units: units.into(),
        }
    }

    /// A logic-toggle block.
    pub fn logic<S: Into<String>>(mode: LogicMode, switch: S) -> Self {
        BlockKind::Logic {
            mode,
            switch: switch.into(),
        }
    }

    /// A facility out-of-service block.
    pub fn funavail<S: Into<String>>(
        facility: S,
        owner_mode: Option<RemovalMode>,
        owner_dest: S,
        residual_param: S,
        preempted_mode: Option<RemovalMode>,
        preempted_dest: S,
    ) -> Self {
        BlockKind::Funavail {
            facility: facility.into(),
            owner_mode,
            owner_dest: owner_dest.into(),
            residual_param: residual_param.into(),
            preempted_mode,
            preempted_dest: preempted_dest.into(),
        }
    }

    /// A terminating block.
    pub fn terminate<S: Into<String>>(units: S) -> Self {
        BlockKind::Terminate {
            units: units.into(),
        }
    }
}

/// A block of the network: its kind plus label, owning process, successor
/// link, and observability counters.
#[derive(Debug)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) label: Option<String>,
    pub(crate) process: String,
    pub(crate) next: Option<BlockId>,
    pub(crate) kind: BlockKind,
    pub(crate) entry_count: u64,
    pub(crate) current_count: u64,
    /// Remaining creation budget of a generator; `None` means unlimited.
    pub(crate) remaining: Option<u32>,
}

impl Block {
    /// The block's ID.
    #[must_use]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// The block's label, if it has one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The name of the owning process.
    #[must_use]
    pub fn process(&self) -> &str {
        &self.process
    }

    /// The block's kind.
    #[must_use]
    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    /// Lifetime number of executions.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Number of live transactions whose current block this is, as of the
    /// last recount.
    #[must_use]
    pub fn current_count(&self) -> u64 {
        self.current_count
    }
}

/// A block under construction: an optional label and a kind.
#[derive(Debug)]
pub struct BlockDef {
    pub(crate) label: Option<String>,
    pub(crate) kind: BlockKind,
}

impl BlockDef {
    /// An unlabeled block.
    #[must_use]
    pub fn new(kind: BlockKind) -> Self {
        Self { label: None, kind }
    }

    /// A labeled block, addressable as a destination.
    #[must_use]
    pub fn labeled<S: Into<String>>(label: S, kind: BlockKind) -> Self {
        Self {
            label: Some(label.into()),
            kind,
        }
    }
}

impl Model {
    /// Executes `block_id` for the given transaction. Returns the block to
    /// continue scanning with, or `None` once the transaction has left the
    /// ready chain for this pass.
    pub(crate) fn execute_block(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
    ) -> Result<Option<BlockId>, Error> {
        self.block_mut(block_id).entry_count += 1;
        let kind = self.block(block_id).kind.clone();
        log::debug!(
            "[{}] xact {} enters {} {}",
            self.relative_clock,
            xact_id,
            kind.name(),
            self.block_name(block_id),
        );
        match kind {
            BlockKind::Generate {
                interval,
                spread,
                priority,
                ..
            } => self.exec_generate(block_id, xact_id, &interval, &spread, &priority),
            BlockKind::Advance { interval, spread } => {
                self.exec_advance(block_id, xact_id, &interval, &spread)
            }
            BlockKind::Seize { facility } => self.exec_seize(block_id, xact_id, &facility),
            BlockKind::Release { facility } => self.exec_release(block_id, xact_id, &facility),
            BlockKind::Enqueue { queue, units } => {
                self.exec_waiting_line(block_id, xact_id, &queue, &units, true)
            }
            BlockKind::Depart { queue, units } => {
                self.exec_waiting_line(block_id, xact_id, &queue, &units, false)
            }
            BlockKind::Enter { storage, units } => {
                self.exec_enter(block_id, xact_id, &storage, &units)
            }
            BlockKind::Leave { storage, units } => {
                self.exec_leave(block_id, xact_id, &storage, &units)
            }
            BlockKind::Logic { mode, switch } => self.exec_logic(block_id, xact_id, mode, &switch),
            BlockKind::Funavail {
                facility,
                owner_mode,
                owner_dest,
                residual_param,
                preempted_mode,
                preempted_dest,
            } => self.exec_funavail(
                block_id,
                xact_id,
                &facility,
                owner_mode,
                &owner_dest,
                &residual_param,
                preempted_mode,
                &preempted_dest,
            ),
            BlockKind::Terminate { units } => self.exec_terminate(block_id, xact_id, &units),
        }
    }

    /// Schedules the first arrival of a generator block. Called once per
    /// generator when a run starts; later arrivals are self-scheduled by
    /// [`Self::exec_generate`].
    pub(crate) fn init_generate(&mut self, block_id: BlockId) -> Result<(), Error> {
        let (interval, spread, start_delay, limit, priority) = match &self.block(block_id).kind {
            BlockKind::Generate {
                interval,
                spread,
                start_delay,
                limit,
                priority,
            } => (
                interval.clone(),
                spread.clone(),
                start_delay.clone(),
                limit.clone(),
                priority.clone(),
            ),
            _ => return Ok(()),
        };
        let budget = self.eval_count_opt(&limit, None, block_id, 'D')?;
        self.block_mut(block_id).remaining = budget;
        if budget == Some(0) {
            return Ok(());
        }
        let delay = self.sample_interval(block_id, None, &interval, &spread)?;
        let offset = self
            .eval_num_opt(&start_delay, None, block_id, 'C')?
            .unwrap_or(0.0);
        let priority = self.eval_priority(&priority, None, block_id)?;
        let id = self.spawn_xact(block_id, (delay + offset).max(0.0), priority);
        self.consume_budget(block_id);
        log::debug!(
            "generator {} schedules first arrival {} at {}",
            self.block_name(block_id),
            id,
            self.xact(id).move_time(),
        );
        Ok(())
    }

    fn exec_generate(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        interval: &str,
        spread: &str,
        priority: &str,
    ) -> Result<Option<BlockId>, Error> {
        if self.block(block_id).remaining != Some(0) {
            let delay = self.sample_interval(block_id, Some(xact_id), interval, spread)?;
            let priority = self.eval_priority(priority, Some(xact_id), block_id)?;
            self.spawn_xact(block_id, self.relative_clock + delay, priority);
            self.consume_budget(block_id);
        }
        self.successor(block_id).map(Some)
    }

    fn exec_advance(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        interval: &str,
        spread: &str,
    ) -> Result<Option<BlockId>, Error> {
        let delay = self.sample_interval(block_id, Some(xact_id), interval, spread)?;
        let continuation = match self.xact_mut(xact_id).take_pending_block() {
            Some(dest) => dest,
            None => self.successor(block_id)?,
        };
        if delay <= 0.0 {
            return Ok(Some(continuation));
        }
        let time = self.relative_clock + delay;
        let xact = self.xact_mut(xact_id);
        xact.set_current_block(continuation);
        xact.set_move_time(time);
        self.fec.push(xact_id, time);
        Ok(None)
    }

    fn exec_seize(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        facility: &str,
    ) -> Result<Option<BlockId>, Error> {
        let name = self.evaluate(facility, Some(xact_id))?;
        let now = self.relative_clock;
        let state = self.facilities.entry(name.clone()).or_default();
        if state.can_capture() {
            state.capture(xact_id, now);
            self.xact_mut(xact_id).set_ownership_granted(true);
            self.successor(block_id).map(Some)
        } else {
            log::debug!("[{}] xact {} waits for facility {}", now, xact_id, name);
            let priority = self.xact(xact_id).priority();
            self.bec.entry(name).or_default().push(xact_id, priority);
            Ok(None)
        }
    }

    fn exec_release(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        facility: &str,
    ) -> Result<Option<BlockId>, Error> {
        let name = self.evaluate(facility, Some(xact_id))?;
        let now = self.relative_clock;
        let owner = match self.facilities.get_mut(&name) {
            None => return Err(Error::UnknownFacility(name)),
            Some(state) => {
                let owner = state.owner();
                if owner.is_none() {
                    log::warn!("[{}] release of idle facility {}", now, name);
                } else {
                    state.release(now);
                }
                owner
            }
        };
        if owner == Some(xact_id) {
            self.xact_mut(xact_id).set_ownership_granted(false);
        }
        self.successor(block_id).map(Some)
    }

    fn exec_waiting_line(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        queue: &str,
        units: &str,
        entering: bool,
    ) -> Result<Option<BlockId>, Error> {
        let name = self.evaluate(queue, Some(xact_id))?;
        let units = self
            .eval_count_opt(units, Some(xact_id), block_id, 'B')?
            .unwrap_or(1);
        let now = self.relative_clock;
        let stats = self.queues.entry(name).or_default();
        if entering {
            stats.enter(units, now);
        } else {
            stats.leave(units, now);
        }
        self.successor(block_id).map(Some)
    }

    fn exec_enter(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        storage: &str,
        units: &str,
    ) -> Result<Option<BlockId>, Error> {
        let name = self.evaluate(storage, Some(xact_id))?;
        let units = self
            .eval_count_opt(units, Some(xact_id), block_id, 'B')?
            .unwrap_or(1);
        let now = self.relative_clock;
        let state = self
            .storages
            .get_mut(&name)
            .ok_or_else(|| Error::UnknownStorage(name.clone()))?;
        if state.fits(units) {
            state.enter(units, now);
            self.successor(block_id).map(Some)
        } else {
            log::debug!("[{}] xact {} waits for storage {}", now, xact_id, name);
            let priority = self.xact(xact_id).priority();
            self.bec.entry(name).or_default().push(xact_id, priority);
            Ok(None)
        }
    }

    fn exec_leave(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        storage: &str,
        units: &str,
    ) -> Result<Option<BlockId>, Error> {
        let name = self.evaluate(storage, Some(xact_id))?;
        let units = self
            .eval_count_opt(units, Some(xact_id), block_id, 'B')?
            .unwrap_or(1);
        let now = self.relative_clock;
        self.storages
            .get_mut(&name)
            .ok_or(Error::UnknownStorage(name))?
            .leave(units, now);
        self.successor(block_id).map(Some)
    }

    fn exec_logic(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        mode: LogicMode,
        switch: &str,
    ) -> Result<Option<BlockId>, Error> {
        let name = self.evaluate(switch, Some(xact_id))?;
        let now = self.relative_clock;
        let state = self.facilities.entry(name).or_default();
        // The switch reads as "set" while the facility is out of service.
        match mode {
            LogicMode::Set => {
                state.capture(xact_id, now);
                state.make_unavailable();
            }
            LogicMode::Reset => {
                state.release(now);
                state.make_available();
            }
            LogicMode::Invert => {
                if state.is_available() {
                    state.capture(xact_id, now);
                    state.make_unavailable();
                } else {
                    state.release(now);
                    state.make_available();
                }
            }
        }
        self.successor(block_id).map(Some)
    }

    fn exec_terminate(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        units: &str,
    ) -> Result<Option<BlockId>, Error> {
        let units = self
            .eval_count_opt(units, Some(xact_id), block_id, 'A')?
            .unwrap_or(1);
        self.termination_count = self.termination_count.saturating_sub(units);
        self.xacts.remove(&xact_id);
        log::debug!(
            "[{}] xact {} terminated, termination count {}",
            self.relative_clock,
            xact_id,
            self.termination_count,
        );
        Ok(None)
    }

    /// The out-of-service block. Marks the facility unavailable and resolves
    /// the fate of the owner (`B`-`D`), the already-preempted transactions
    /// (`E`-`F`), and the waiters on the facility's blocked chain. No effect
    /// if the facility is already unavailable.
    #[allow(clippy::too_many_arguments)]
    fn exec_funavail(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        facility: &str,
        owner_mode: Option<RemovalMode>,
        owner_dest: &str,
        residual_param: &str,
        preempted_mode: Option<RemovalMode>,
        preempted_dest: &str,
    ) -> Result<Option<BlockId>, Error> {
        let successor = self.successor(block_id)?;
        let name = self.evaluate(facility, Some(xact_id))?;

        {
            let state = self.facilities.entry(name.clone()).or_default();
            if !state.is_available() {
                log::debug!("facility {} is already out of service", name);
                return Ok(Some(successor));
            }
            state.make_unavailable();
        }
        // A terminated owner that never released leaves a dangling reference
        // behind; treat the facility as ownerless.
        let owner = self
            .facilities
            .get(&name)
            .expect("facility was just inserted")
            .owner()
            .filter(|id| self.xacts.contains_key(id));

        // Both destinations are mandatory and resolved before any chain is
        // touched, so a misconfigured block aborts without partial effects.
        let dest_c = self.resolve_destination(block_id, xact_id, owner_dest, 'C')?;
        let dest_f = self.resolve_destination(block_id, xact_id, preempted_dest, 'F')?;

        match owner_mode {
            Some(RemovalMode::Remove) => {
                if self.block(dest_c).kind.releases_resource() {
                    let (block, process) = self.block_context(block_id);
                    return Err(Error::ReleaseDestination {
                        block,
                        process,
                        operand: 'C',
                    });
                }
                self.facilities
                    .get_mut(&name)
                    .expect("facility was just inserted")
                    .detach_owner();
            }
            Some(RemovalMode::Continue) => {}
            None => {
                // The owner becomes preempted at this facility, unless it is
                // mid-delay; a timed owner is handled below and waits on the
                // blocked chain for restoration instead.
                if let Some(owner_id) = owner {
                    if !self.fec.contains(owner_id) {
                        self.detach_from_chains(owner_id);
                        let priority = self.xact(owner_id).priority();
                        self.preempted
                            .entry(name.clone())
                            .or_default()
                            .push(owner_id, priority);
                    }
                }
            }
        }

        if let Some(owner_id) = owner {
            if self.fec.contains(owner_id) {
                let param = if residual_param.is_empty() {
                    String::new()
                } else {
                    self.evaluate(residual_param, Some(xact_id))?
                };
                let residual = (self.relative_clock - self.xact(owner_id).move_time()).abs();
                let delay_block = self.first_delay_block(block_id);
                self.fec.remove(owner_id);
                let priority = {
                    let owner = self.xact_mut(owner_id);
                    match delay_block {
                        Some(delay) => {
                            owner.set_current_block(delay);
                            owner.set_pending_block(Some(dest_c));
                        }
                        None => owner.set_current_block(dest_c),
                    }
                    if !param.is_empty() {
                        owner.set_parameter(param, residual);
                    }
                    owner.set_parameter(RESIDUAL_TIME_PARAMETER, residual);
                    let restored_at = owner.move_time() - residual;
                    owner.set_move_time(restored_at);
                    owner.set_restore_to_fec(true);
                    owner.priority()
                };
                self.bec
                    .entry(name.clone())
                    .or_default()
                    .push(owner_id, priority);
            } else {
                self.xact_mut(owner_id).set_current_block(dest_c);
            }
        }

        match preempted_mode {
            Some(RemovalMode::Continue) => {
                let preempted: Vec<XactId> = self
                    .preempted
                    .get(&name)
                    .map(|chain| chain.iter().collect())
                    .unwrap_or_default();
                for id in preempted {
                    self.xact_mut(id).set_ownership_granted(true);
                }
            }
            Some(RemovalMode::Remove) => {
                if self.block(dest_f).kind.releases_resource() {
                    let (block, process) = self.block_context(block_id);
                    return Err(Error::ReleaseDestination {
                        block,
                        process,
                        operand: 'F',
                    });
                }
                let mut freed = Vec::new();
                if let Some(chain) = self.bec.get_mut(&name) {
                    while let Some(id) = chain.pop() {
                        freed.push(id);
                    }
                }
                for id in freed {
                    let priority = {
                        let xact = self.xact_mut(id);
                        xact.set_ownership_granted(true);
                        xact.priority()
                    };
                    self.cec.push(id, priority);
                }
            }
            None => {
                let waiting: Vec<XactId> = self
                    .bec
                    .get(&name)
                    .map(|chain| chain.iter().collect())
                    .unwrap_or_default();
                for id in waiting {
                    self.xact_mut(id).set_ownership_granted(false);
                }
            }
        }

        let preempted: Vec<XactId> = self
            .preempted
            .get(&name)
            .map(|chain| chain.iter().collect())
            .unwrap_or_default();
        for id in preempted {
            self.xact_mut(id).set_current_block(dest_f);
        }

        Ok(Some(successor))
    }

    fn sample_interval(
        &mut self,
        block_id: BlockId,
        xact: Option<XactId>,
        interval: &str,
        spread: &str,
    ) -> Result<f32, Error> {
        let mean = self.eval_num_opt(interval, xact, block_id, 'A')?.unwrap_or(0.0);
        let half = self.eval_num_opt(spread, xact, block_id, 'B')?.unwrap_or(0.0);
        let sampled = if half > 0.0 {
            self.rng.gen_range(mean - half..=mean + half)
        } else {
            mean
        };
        Ok(sampled.max(0.0))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn eval_priority(
        &mut self,
        operand: &str,
        xact: Option<XactId>,
        block_id: BlockId,
    ) -> Result<i32, Error> {
        let value = self
            .eval_num_opt(operand, xact, block_id, 'E')?
            .unwrap_or(0.0);
        Ok(value as i32)
    }

    fn spawn_xact(&mut self, block_id: BlockId, time: f32, priority: i32) -> XactId {
        let id = XactId::from(self.next_xact);
        self.next_xact += 1;
        self.xacts
            .insert(id, crate::Transaction::new(id, priority, time, block_id));
        self.fec.push(id, time);
        id
    }

    fn consume_budget(&mut self, block_id: BlockId) {
        if let Some(remaining) = self.block(block_id).remaining {
            self.block_mut(block_id).remaining = Some(remaining.saturating_sub(1));
        }
    }

    /// Removes a transaction from the ready chain and every blocked chain,
    /// keeping the single-chain-membership invariant across a transfer into
    /// the preempted chain.
    fn detach_from_chains(&mut self, id: XactId) {
        self.cec.remove(id);
        for chain in self.bec.values_mut() {
            chain.remove(id);
        }
    }

    /// First delay block of the process owning `block_id`, used to reroute a
    /// timed owner displaced by the out-of-service block.
    fn first_delay_block(&self, block_id: BlockId) -> Option<BlockId> {
        let process = &self.block(block_id).process;
        self.blocks
            .iter()
            .find(|b| &b.process == process && b.kind.is_delay())
            .map(|b| b.id)
    }

    fn resolve_destination(
        &mut self,
        block_id: BlockId,
        xact_id: XactId,
        operand: &str,
        position: char,
    ) -> Result<BlockId, Error> {
        if operand.is_empty() {
            let (block, process) = self.block_context(block_id);
            return Err(Error::MissingOperand {
                block,
                process,
                operand: position,
            });
        }
        let label = self.evaluate(operand, Some(xact_id))?;
        self.find_block(&label).ok_or_else(|| {
            let (block, process) = self.block_context(block_id);
            Error::DestinationNotFound {
                block,
                process,
                label,
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest(
        operand,
        expected,
        case("S", LogicMode::Set),
        case("R", LogicMode::Reset),
        case("I", LogicMode::Invert)
    )]
    fn test_logic_mode_keywords(operand: &str, expected: LogicMode) {
        assert_eq!(LogicMode::from_str(operand).unwrap(), expected);
    }

    #[test]
    fn test_removal_mode_keywords() {
        assert_eq!(
            RemovalMode::from_operand("RE").unwrap(),
            Some(RemovalMode::Remove)
        );
        assert_eq!(
            RemovalMode::from_operand("CO").unwrap(),
            Some(RemovalMode::Continue)
        );
        assert_eq!(RemovalMode::from_operand("").unwrap(), None);
        assert_eq!(RemovalMode::from_operand("XX"), Err(String::from("XX")));
    }

    #[test]
    fn test_release_capability() {
        assert!(BlockKind::release("F1").releases_resource());
        assert!(BlockKind::leave("S1", "").releases_resource());
        assert!(!BlockKind::seize("F1").releases_resource());
        assert!(!BlockKind::advance("1", "").releases_resource());
    }

    #[test]
    fn test_delay_capability() {
        assert!(BlockKind::advance("5", "1").is_delay());
        assert!(!BlockKind::terminate("").is_delay());
    }
}
