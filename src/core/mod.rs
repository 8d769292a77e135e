mod context;
mod error;
mod graph;
mod schedule;

pub use context::*;
pub use error::*;
pub use graph::*;
pub use schedule::*;

/// Schedules the tasks of a context.
pub trait Scheduler {
    /// Finds a schedule of the given context.
    ///
    /// # Errors
    /// - If the search ends without a valid schedule.
    fn schedule(&mut self, context: &SchedulingContext) -> Result<Schedule>;

    /// Returns whether the scheduler is guaranteed to find a minimum makespan.
    fn optimal(&self) -> bool {
        true
    }

    /// Returns the maximum number of tasks the scheduler can handle in reasonable time.
    fn maximum_tasks(&self) -> usize {
        usize::MAX
    }

    /// Returns the name of the scheduler.
    fn name(&self) -> &'static str;
}

/// Level of the search tree a node belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    Allocation,
    Ordering,
}

/// A node of a search tree explored by the branch and bound drivers.
pub trait PartialSolution: Sized + Send {
    /// Returns a lower bound of the makespan of every complete solution below this node.
    /// For a complete node it is the exact makespan.
    fn estimate(&self) -> u64;

    /// Returns whether the node describes a whole schedule.
    fn is_complete(&self) -> bool;

    /// Returns the children of the node. Complete nodes have no children.
    fn expand(&self) -> Vec<Self>;

    /// Materializes the schedule described by the node.
    /// Returns `None` when the node is incomplete or describes no feasible schedule.
    fn make_complete(&self) -> Option<Schedule>;

    /// Returns the level of the node, used for statistics.
    fn kind(&self) -> NodeKind {
        NodeKind::Ordering
    }
}
