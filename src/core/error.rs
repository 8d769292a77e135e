use thiserror::Error;

/// Errors raised while building a task graph or searching for a schedule.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("Can't update; graph has been already built")]
    AlreadyBuilt,

    #[error("Node `{0}` is already defined")]
    DuplicateNode(String),

    #[error("Node(s) do not exist for edge `{from}` -> `{to}`")]
    UnknownNode { from: String, to: String },

    #[error("Graph contains a cycle through node `{0}`")]
    Cycle(String),

    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Processor count must be at least one")]
    NoProcessors,

    #[error("Search finished without a complete schedule")]
    NoSchedule,

    #[error("Search produced an invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, Error>;
