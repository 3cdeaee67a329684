//! GPSS-style process-interaction simulation kernel.
//!
//! Mobile [`Transaction`]s flow through a static network of blocks, consuming
//! simulated time and competing for shared resources (facilities, storages,
//! logic switches). The [`Model`] owns the event chains and the clock, and
//! drives the scan/clock-advance/wake cycle until the termination counter
//! reaches zero.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

mod block;
pub use block::{Block, BlockDef, BlockKind, LogicMode, RemovalMode};

mod chains;
pub use chains::{PriorityChain, TimeChain};

pub mod config;
pub use config::Config;

mod error;
pub use error::Error;

mod facility;
pub use facility::Facility;

pub mod logger;

mod model;
pub use model::{Model, ModelBuilder, ProcessDef};

mod queue;
pub use queue::QueueStats;

mod sna;

mod storage;
pub use storage::Storage;

mod transaction;
pub use transaction::{Transaction, RESIDUAL_TIME_PARAMETER};

/// Transaction ID, unique for the lifetime of a model.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct XactId(usize);

/// Block ID: the index of a block in the model's block graph.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct BlockId(usize);
