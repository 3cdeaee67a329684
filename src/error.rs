use thiserror::Error;

/// Errors raised while building or executing a model.
///
/// Configuration errors carry the label of the offending block and the name
/// of its owning process. They are fatal: the scan phase propagates them
/// immediately and the run is aborted without any rollback of chain
/// mutations performed earlier in the same cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory operand was left empty.
    #[error("in block {block} of process {process}: missing mandatory operand {operand}")]
    MissingOperand {
        /// Label of the offending block.
        block: String,
        /// Name of the owning process.
        process: String,
        /// Operand position (A through F).
        operand: char,
    },

    /// A destination label did not resolve to any block.
    #[error("in block {block} of process {process}: destination {label} not found")]
    DestinationNotFound {
        /// Label of the offending block.
        block: String,
        /// Name of the owning process.
        process: String,
        /// The unresolved destination label.
        label: String,
    },

    /// A removal-mode destination routed to a resource-releasing block.
    #[error(
        "in block {block} of process {process}: \
         operand {operand} must not route to a releasing block"
    )]
    ReleaseDestination {
        /// Label of the offending block.
        block: String,
        /// Name of the owning process.
        process: String,
        /// Operand position (C or F).
        operand: char,
    },

    /// An operand did not evaluate to a number where one was required.
    #[error("in block {block} of process {process}: operand {operand} value {value:?} is not numeric")]
    MalformedOperand {
        /// Label of the offending block.
        block: String,
        /// Name of the owning process.
        process: String,
        /// Operand position (A through F).
        operand: char,
        /// The evaluated, non-numeric value.
        value: String,
    },

    /// A block that continues the scan had no successor to continue to.
    #[error("in block {block} of process {process}: no successor block to continue to")]
    NoSuccessor {
        /// Label of the offending block.
        block: String,
        /// Name of the owning process.
        process: String,
    },

    /// A transaction-scoped attribute token was evaluated without one.
    #[error("token {0} cannot be evaluated without an active transaction")]
    TokenRequiresTransaction(String),

    /// A label lookup failed outside a destination-operand context.
    #[error("no block labeled {0}")]
    UnknownLabel(String),

    /// A release referenced a facility that was never created.
    #[error("unknown facility {0}")]
    UnknownFacility(String),

    /// A storage block referenced an undeclared storage.
    #[error("unknown storage {0}")]
    UnknownStorage(String),

    /// A storage was declared with a zero capacity.
    #[error("storage {0} must have a capacity of at least 1")]
    InvalidStorageCapacity(String),

    /// Two blocks were declared with the same label.
    #[error("duplicate block label {0}")]
    DuplicateLabel(String),
}
