//! The model: entities, block graph, event chains, clock, and the
//! scan / clock-advance / wake cycle that drives them.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::block::{Block, BlockDef, BlockKind};
use crate::chains::{PriorityChain, TimeChain};
use crate::config::Config;
use crate::error::Error;
use crate::facility::Facility;
use crate::queue::QueueStats;
use crate::storage::Storage;
use crate::transaction::Transaction;
use crate::{BlockId, XactId};

/// A named process: an ordered list of blocks a transaction flows through.
#[derive(Debug)]
pub struct ProcessDef {
    name: String,
    blocks: Vec<BlockDef>,
}

impl ProcessDef {
    /// Starts an empty process definition.
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    /// Appends an unlabeled block.
    #[must_use]
    pub fn block(mut self, kind: BlockKind) -> Self {
        self.blocks.push(BlockDef::new(kind));
        self
    }

    /// Appends a labeled block, addressable as a destination.
    #[must_use]
    pub fn labeled_block<S: Into<String>>(mut self, label: S, kind: BlockKind) -> Self {
        self.blocks.push(BlockDef::labeled(label, kind));
        self
    }
}

/// Builds a [`Model`] from processes, storages, save values, and run
/// parameters.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    termination_count: u32,
    seed: Option<u64>,
    processes: Vec<ProcessDef>,
    storages: Vec<(String, u32)>,
    save_values: Vec<(String, f32)>,
}

impl ModelBuilder {
    /// Sets the termination counter the run counts down to zero.
    #[must_use]
    pub fn termination_count(mut self, count: u32) -> Self {
        self.termination_count = count;
        self
    }

    /// Seeds the random number generator for a reproducible run.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Applies a loaded [`Config`].
    #[must_use]
    pub fn config(mut self, config: &Config) -> Self {
        self.termination_count = config.termination_count;
        self.seed = config.seed;
        self
    }

    /// Registers a process.
    #[must_use]
    pub fn process(mut self, process: ProcessDef) -> Self {
        self.processes.push(process);
        self
    }

    /// Declares a storage with the given capacity.
    #[must_use]
    pub fn storage<S: Into<String>>(mut self, name: S, capacity: u32) -> Self {
        self.storages.push((name.into(), capacity));
        self
    }

    /// Declares an initial save value.
    #[must_use]
    pub fn save_value<S: Into<String>>(mut self, name: S, value: f32) -> Self {
        self.save_values.push((name.into(), value));
        self
    }

    /// Links the block graph and produces the model.
    ///
    /// # Errors
    ///
    /// Returns a construction error on duplicate block labels or invalid
    /// storage capacities; the model is not created.
    pub fn build(self) -> Result<Model, Error> {
        let mut blocks: Vec<Block> = Vec::new();
        let mut labels = HashMap::new();
        for process in self.processes {
            let count = process.blocks.len();
            for (offset, def) in process.blocks.into_iter().enumerate() {
                let id = BlockId::from(blocks.len());
                if let Some(label) = &def.label {
                    if labels.insert(label.clone(), id).is_some() {
                        return Err(Error::DuplicateLabel(label.clone()));
                    }
                }
                let next = if offset + 1 < count {
                    Some(BlockId::from(blocks.len() + 1))
                } else {
                    None
                };
                blocks.push(Block {
                    id,
                    label: def.label,
                    process: process.name.clone(),
                    next,
                    kind: def.kind,
                    entry_count: 0,
                    current_count: 0,
                    remaining: None,
                });
            }
        }
        let mut storages = HashMap::new();
        for (name, capacity) in self.storages {
            storages.insert(name.clone(), Storage::new(name, capacity)?);
        }
        let rng = match self.seed {
            Some(seed) => ChaChaRng::seed_from_u64(seed),
            None => ChaChaRng::from_entropy(),
        };
        Ok(Model {
            blocks,
            labels,
            xacts: HashMap::new(),
            next_xact: 0,
            cec: PriorityChain::new(),
            fec: TimeChain::new(),
            bec: HashMap::new(),
            preempted: HashMap::new(),
            facilities: HashMap::new(),
            storages,
            queues: HashMap::new(),
            save_values: self.save_values.into_iter().collect(),
            termination_count: self.termination_count,
            absolute_clock: 0.0,
            relative_clock: 0.0,
            rng,
        })
    }
}

/// The simulation model: the only entity that holds and mutates state.
///
/// Owns the transaction arena, the block graph, the four event chains, the
/// shared resource maps, and both clocks. Blocks mutate the chains through
/// the model as a side effect of execution; the phase protocol itself is the
/// concurrency control, so nothing here needs locking.
pub struct Model {
    pub(crate) blocks: Vec<Block>,
    pub(crate) labels: HashMap<String, BlockId>,
    pub(crate) xacts: HashMap<XactId, Transaction>,
    pub(crate) next_xact: usize,
    /// Current event chain: transactions eligible to run now.
    pub(crate) cec: PriorityChain,
    /// Future event chain: transactions scheduled for a later time.
    pub(crate) fec: TimeChain,
    /// Blocked event chains, keyed by resource name.
    pub(crate) bec: HashMap<String, PriorityChain>,
    /// Preempted transactions, keyed by facility name.
    pub(crate) preempted: HashMap<String, PriorityChain>,
    pub(crate) facilities: HashMap<String, Facility>,
    pub(crate) storages: HashMap<String, Storage>,
    pub(crate) queues: HashMap<String, QueueStats>,
    pub(crate) save_values: HashMap<String, f32>,
    pub(crate) termination_count: u32,
    pub(crate) absolute_clock: f32,
    pub(crate) relative_clock: f32,
    pub(crate) rng: ChaChaRng,
}

impl Model {
    /// Starts building a model.
    #[must_use]
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Resets both clocks, schedules every generator's first arrival, and
    /// executes the model: to completion, or for exactly one cycle when
    /// `step_mode` is set (continue with [`Self::step`]).
    ///
    /// # Errors
    ///
    /// Propagates the first fatal configuration error hit by a block; the
    /// run is aborted mid-cycle without rollback.
    pub fn execute(&mut self, step_mode: bool) -> Result<(), Error> {
        self.relative_clock = 0.0;
        self.absolute_clock = 0.0;
        let generators: Vec<BlockId> = self
            .blocks
            .iter()
            .filter(|block| matches!(block.kind, BlockKind::Generate { .. }))
            .map(Block::id)
            .collect();
        for id in generators {
            self.init_generate(id)?;
        }
        if step_mode {
            self.step()
        } else {
            self.run()
        }
    }

    /// Runs scan / clock-advance / wake cycles until the termination counter
    /// reaches zero, then recomputes the per-block live counts.
    ///
    /// A model that stops making progress (nothing runnable, nothing
    /// scheduled) is a caller error, not a fatal condition: the run logs a
    /// warning and returns.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal configuration error hit by a block.
    pub fn run(&mut self) -> Result<(), Error> {
        let mut last_fingerprint = None;
        while self.termination_count > 0 {
            let fingerprint = self.fingerprint();
            if last_fingerprint == Some(fingerprint) {
                log::warn!(
                    "[{}] model stalled with termination count {}: \
                     {} runnable, {} scheduled, {} blocked, {} preempted",
                    self.relative_clock,
                    self.termination_count,
                    self.cec.len(),
                    self.fec.len(),
                    self.blocked_total(),
                    self.preempted_total(),
                );
                break;
            }
            last_fingerprint = Some(fingerprint);
            self.scan_phase()?;
            self.clock_update_phase();
            self.wake_blocked();
        }
        self.update_current_count();
        log::info!("[{}] simulation terminated", self.relative_clock);
        Ok(())
    }

    /// Performs exactly one scan / clock-advance / wake cycle (if the
    /// termination counter is still positive) and recomputes the per-block
    /// live counts.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal configuration error hit by a block.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.termination_count > 0 {
            self.scan_phase()?;
            self.clock_update_phase();
            self.wake_blocked();
        }
        self.update_current_count();
        Ok(())
    }

    /// Scan phase: pops the highest-priority transaction off the ready chain
    /// and executes block after block until one yields no successor, until
    /// the ready chain is empty.
    fn scan_phase(&mut self) -> Result<(), Error> {
        while let Some(xact_id) = self.cec.pop() {
            let mut block_id = self.xact(xact_id).current_block();
            while let Some(next) = self.execute_block(block_id, xact_id)? {
                self.xact_mut(xact_id).set_current_block(next);
                block_id = next;
            }
        }
        Ok(())
    }

    /// Clock-advance phase: moves the clock to the earliest scheduled time
    /// and promotes every transaction scheduled for exactly that time. With
    /// nothing scheduled, the clock stays put.
    #[allow(clippy::float_cmp)]
    fn clock_update_phase(&mut self) {
        let time = match self.fec.peek_time() {
            Some(time) => time,
            None => return,
        };
        self.relative_clock = time;
        self.absolute_clock = time;
        log::debug!("[{}] clock advanced", time);
        while self.fec.peek_time() == Some(time) {
            let id = self.fec.pop().expect("peeked entry is present");
            let priority = self.xact(id).priority();
            self.cec.push(id, priority);
        }
    }

    /// Wake phase: drains every blocked chain in priority order. A
    /// transaction displaced from the future chain with unexpired delay is
    /// reinserted there at `clock + residual`; everything else becomes
    /// ready. Chains of different resources are independent; their relative
    /// order is unspecified.
    fn wake_blocked(&mut self) {
        let names: Vec<String> = self.bec.keys().cloned().collect();
        for name in names {
            let mut woken = Vec::new();
            if let Some(chain) = self.bec.get_mut(&name) {
                while let Some(id) = chain.pop() {
                    woken.push(id);
                }
            }
            for id in woken {
                let restore = self.xact_mut(id).take_restore_to_fec();
                if restore {
                    let residual = self.xact(id).residual_time().unwrap_or(0.0);
                    let time = self.relative_clock + residual;
                    self.xact_mut(id).set_move_time(time);
                    self.fec.push(id, time);
                    log::debug!(
                        "[{}] xact {} restored to the future chain at {}",
                        self.relative_clock,
                        id,
                        time,
                    );
                } else {
                    let priority = self.xact(id).priority();
                    self.cec.push(id, priority);
                }
            }
        }
    }

    /// Recomputes every block's live-transaction count by scanning all
    /// chains. Derived from scratch rather than maintained incrementally, so
    /// chain transfers can never double-count.
    fn update_current_count(&mut self) {
        for block in &mut self.blocks {
            block.current_count = 0;
        }
        let mut live: Vec<XactId> = self.cec.iter().chain(self.fec.iter()).collect();
        for chain in self.bec.values() {
            live.extend(chain.iter());
        }
        for chain in self.preempted.values() {
            live.extend(chain.iter());
        }
        for id in live {
            let block = self.xact(id).current_block();
            self.blocks[usize::from(block)].current_count += 1;
        }
    }

    fn fingerprint(&self) -> (OrderedFloat<f32>, u32, usize, usize, usize, usize) {
        (
            OrderedFloat(self.relative_clock),
            self.termination_count,
            self.cec.len(),
            self.fec.len(),
            self.blocked_total(),
            self.preempted_total(),
        )
    }

    fn blocked_total(&self) -> usize {
        self.bec.values().map(PriorityChain::len).sum()
    }

    fn preempted_total(&self) -> usize {
        self.preempted.values().map(PriorityChain::len).sum()
    }

    /// Resolves a block label.
    #[must_use]
    pub fn find_block(&self, label: &str) -> Option<BlockId> {
        self.labels.get(label).copied()
    }

    /// Iterates over the blocks of the network in definition order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// A live transaction by ID; `None` once terminated.
    #[must_use]
    pub fn transaction(&self, id: XactId) -> Option<&Transaction> {
        self.xacts.get(&id)
    }

    /// A facility by name, once created by a block referencing it.
    #[must_use]
    pub fn facility(&self, name: &str) -> Option<&Facility> {
        self.facilities.get(name)
    }

    /// A declared storage by name.
    #[must_use]
    pub fn storage(&self, name: &str) -> Option<&Storage> {
        self.storages.get(name)
    }

    /// A waiting line's statistics by name, once referenced by a block.
    #[must_use]
    pub fn queue(&self, name: &str) -> Option<&QueueStats> {
        self.queues.get(name)
    }

    /// A save value by name.
    #[must_use]
    pub fn save_value(&self, name: &str) -> Option<f32> {
        self.save_values.get(name).copied()
    }

    /// Sets a save value.
    pub fn set_save_value<S: Into<String>>(&mut self, name: S, value: f32) {
        self.save_values.insert(name.into(), value);
    }

    /// The ready chain.
    #[must_use]
    pub fn ready_chain(&self) -> &PriorityChain {
        &self.cec
    }

    /// The future chain.
    #[must_use]
    pub fn future_chain(&self) -> &TimeChain {
        &self.fec
    }

    /// The blocked chain of the given resource, if any transaction ever
    /// waited on it.
    #[must_use]
    pub fn blocked_chain(&self, resource: &str) -> Option<&PriorityChain> {
        self.bec.get(resource)
    }

    /// The preempted chain of the given facility, if any transaction was
    /// ever preempted there.
    #[must_use]
    pub fn preempted_chain(&self, facility: &str) -> Option<&PriorityChain> {
        self.preempted.get(facility)
    }

    /// The relative clock: time since the current run started.
    #[must_use]
    pub fn clock(&self) -> f32 {
        self.relative_clock
    }

    /// The absolute clock.
    #[must_use]
    pub fn absolute_clock(&self) -> f32 {
        self.absolute_clock
    }

    /// The remaining termination count.
    #[must_use]
    pub fn termination_count(&self) -> u32 {
        self.termination_count
    }

    pub(crate) fn xact(&self, id: XactId) -> &Transaction {
        self.xacts.get(&id).expect("transaction arena out of sync")
    }

    pub(crate) fn xact_mut(&mut self, id: XactId) -> &mut Transaction {
        self.xacts
            .get_mut(&id)
            .expect("transaction arena out of sync")
    }

    pub(crate) fn block(&self, id: BlockId) -> &Block {
        &self.blocks[usize::from(id)]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[usize::from(id)]
    }

    pub(crate) fn block_name(&self, id: BlockId) -> String {
        match &self.block(id).label {
            Some(label) => label.clone(),
            None => format!("#{}", id),
        }
    }

    pub(crate) fn block_context(&self, id: BlockId) -> (String, String) {
        (self.block_name(id), self.block(id).process.clone())
    }

    pub(crate) fn successor(&self, id: BlockId) -> Result<BlockId, Error> {
        self.block(id).next.ok_or_else(|| {
            let (block, process) = self.block_context(id);
            Error::NoSuccessor { block, process }
        })
    }
}
