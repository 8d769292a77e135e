use crate::cast_u64;
use crate::core::{Error, Result, SchedulingContext};

/// Assignment of every task to a processor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Allocation {
    processor_of: Vec<usize>,
    tasks: Vec<Vec<usize>>,
    local_dependencies: Vec<usize>,
    bound: u64,
}

impl Allocation {
    /// Creates an allocation from the processor of every task (indexed by task).
    ///
    /// # Errors
    /// - If a task is missing or assigned to a processor outside of the context.
    pub fn new(context: &SchedulingContext, processor_of: Vec<usize>) -> Result<Self> {
        let graph = context.graph();

        if processor_of.len() != graph.len() {
            return Err(Error::InvalidAllocation(format!(
                "{} of {} tasks allocated",
                processor_of.len(),
                graph.len()
            )));
        }
        if let Some(&processor) = processor_of.iter().find(|&&p| p >= context.processors()) {
            return Err(Error::InvalidAllocation(format!(
                "processor {processor} of {} does not exist",
                context.processors()
            )));
        }

        let mut tasks = vec![Vec::new(); context.processors()];
        for &task in graph.topological_order() {
            tasks[processor_of[task]].push(task);
        }

        let local_dependencies = (0..graph.len())
            .map(|task| {
                let dependencies = graph.node(task).dependencies().iter();
                dependencies
                    .filter(|&&dependency| processor_of[dependency] == processor_of[task])
                    .count()
            })
            .collect();

        let assigned: Vec<_> = processor_of.iter().copied().map(Some).collect();
        let bound = lower_bound(context, &assigned);

        Ok(Self {
            processor_of,
            tasks,
            local_dependencies,
            bound,
        })
    }

    /// Returns tasks allocated to the processor in topological order.
    /// Processors outside of the context have no tasks.
    #[must_use]
    pub fn tasks_for(&self, processor: usize) -> &[usize] {
        self.tasks.get(processor).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the processor of the task.
    #[must_use]
    pub fn processor_of(&self, task: usize) -> usize {
        self.processor_of[task]
    }

    /// Returns the number of dependencies of the task allocated to its own processor.
    #[must_use]
    pub fn local_dependencies(&self, task: usize) -> usize {
        self.local_dependencies[task]
    }

    /// Returns the number of processors.
    #[must_use]
    pub fn processors(&self) -> usize {
        self.tasks.len()
    }

    /// Returns a lower bound of the makespan of every ordering of this allocation.
    #[must_use]
    pub const fn bound(&self) -> u64 {
        self.bound
    }
}

/// Admissible lower bound of a partial allocation.
/// It is the maximum of the average load, the heaviest processor load and the longest path
/// where communication is counted only between tasks known to be on different processors.
fn lower_bound(context: &SchedulingContext, assigned: &[Option<usize>]) -> u64 {
    let graph = context.graph();

    let mut loads = vec![0; context.processors()];
    for (task, processor) in assigned.iter().enumerate() {
        if let Some(processor) = *processor {
            loads[processor] += graph.node(task).weight();
        }
    }

    let average = graph.total_weight().div_ceil(cast_u64(context.processors()));
    let mut bound = loads.into_iter().max().unwrap_or_default().max(average);

    let mut ready = vec![0; graph.len()];
    for &task in graph.topological_order() {
        let node = graph.node(task);
        let start = node.incoming().iter().map(|&(pred, communication)| {
            let delay = match (assigned[pred], assigned[task]) {
                (Some(first), Some(second)) if first != second => communication,
                _ => 0,
            };
            ready[pred] + graph.node(pred).weight() + delay
        });

        let start = start.max().unwrap_or_default();
        ready[task] = start;
        bound = bound.max(start + graph.bottom_level(task));
    }

    bound
}

/// A partial allocation. Tasks are allocated in topological order.
/// Processors are used in increasing order, so allocations equal up to relabelling of
/// processors are generated once.
#[derive(Clone, Debug)]
pub struct AllocationNode<'a> {
    context: &'a SchedulingContext,
    assigned: Vec<Option<usize>>,
    depth: usize,
    used: usize,
    estimate: u64,
}

impl<'a> AllocationNode<'a> {
    /// Creates the root with no task allocated.
    #[must_use]
    pub fn empty(context: &'a SchedulingContext) -> Self {
        let assigned = vec![None; context.task_count()];
        let estimate = lower_bound(context, &assigned);

        Self {
            context,
            assigned,
            depth: 0,
            used: 0,
            estimate,
        }
    }

    #[must_use]
    pub const fn context(&self) -> &'a SchedulingContext {
        self.context
    }

    /// Returns the lower bound of the allocations below this node.
    #[must_use]
    pub const fn estimate(&self) -> u64 {
        self.estimate
    }

    /// Returns whether every task is allocated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.depth == self.context.task_count()
    }

    /// Allocates the next task to every processor not yet used and to every used one.
    #[must_use]
    pub fn expand(&self) -> Vec<Self> {
        if self.is_complete() {
            return Vec::new();
        }

        let task = self.context.graph().topological_order()[self.depth];
        let processors = (self.used + 1).min(self.context.processors());

        (0..processors)
            .map(|processor| {
                let mut assigned = self.assigned.clone();
                assigned[task] = Some(processor);
                let estimate = lower_bound(self.context, &assigned);

                Self {
                    context: self.context,
                    assigned,
                    depth: self.depth + 1,
                    used: self.used.max(processor + 1),
                    estimate,
                }
            })
            .collect()
    }

    /// Returns the allocation if every task is allocated.
    #[must_use]
    pub fn allocation(&self) -> Option<Allocation> {
        let processor_of: Option<Vec<_>> = self.assigned.iter().copied().collect();
        processor_of
            .filter(|_| self.is_complete())
            .and_then(|processor_of| Allocation::new(self.context, processor_of).ok())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::GraphBuilder;

    fn context(processors: usize, edges: bool) -> anyhow::Result<SchedulingContext> {
        let mut builder = GraphBuilder::new();
        builder.add_node("a", 2)?;
        builder.add_node("b", 3)?;
        builder.add_node("c", 4)?;
        if edges {
            builder.add_edge("a", "b", 5)?;
            builder.add_edge("a", "c", 1)?;
        }
        Ok(SchedulingContext::new(builder.build()?, processors)?)
    }

    fn complete_allocations(context: &SchedulingContext) -> Vec<Allocation> {
        let mut stack = vec![AllocationNode::empty(context)];
        let mut result = Vec::new();
        while let Some(node) = stack.pop() {
            if let Some(allocation) = node.allocation() {
                result.push(allocation);
            }
            stack.extend(node.expand());
        }
        result
    }

    #[test]
    fn allocations_are_unique_up_to_relabelling() -> anyhow::Result<()> {
        // Partitions of a three element set into at most k blocks.
        assert_eq!(complete_allocations(&context(1, false)?).len(), 1);
        assert_eq!(complete_allocations(&context(2, false)?).len(), 4);
        assert_eq!(complete_allocations(&context(3, false)?).len(), 5);
        assert_eq!(complete_allocations(&context(5, false)?).len(), 5);
        Ok(())
    }

    #[test]
    fn tasks_for_follow_topological_order() -> anyhow::Result<()> {
        let context = context(2, true)?;
        let allocation = Allocation::new(&context, vec![0, 1, 0])?;

        assert_eq!(allocation.tasks_for(0), &[0, 2]);
        assert_eq!(allocation.tasks_for(1), &[1]);
        assert!(allocation.tasks_for(2).is_empty());
        assert_eq!(allocation.processor_of(1), 1);
        assert_eq!(allocation.local_dependencies(2), 1);
        assert_eq!(allocation.local_dependencies(1), 0);
        Ok(())
    }

    #[test]
    fn malformed_allocations_are_rejected() -> anyhow::Result<()> {
        let context = context(2, true)?;

        let short = Allocation::new(&context, vec![0, 1]);
        assert!(matches!(short, Err(Error::InvalidAllocation(_))));
        let missing = Allocation::new(&context, vec![0, 2, 1]);
        assert!(matches!(missing, Err(Error::InvalidAllocation(_))));
        Ok(())
    }

    #[test]
    fn bound_counts_known_communication() -> anyhow::Result<()> {
        let context = context(2, true)?;

        // a -> b crosses processors: 2 + 5 + 3.
        assert_eq!(Allocation::new(&context, vec![0, 1, 0])?.bound(), 10);
        // Everything on one processor: the load.
        assert_eq!(Allocation::new(&context, vec![0, 0, 0])?.bound(), 9);
        // Unknown processors only give the critical path and the average load.
        assert_eq!(AllocationNode::empty(&context).estimate(), 6);
        Ok(())
    }

    #[test]
    fn estimates_never_decrease() -> anyhow::Result<()> {
        let context = context(3, true)?;
        let mut stack = vec![AllocationNode::empty(&context)];
        while let Some(node) = stack.pop() {
            for child in node.expand() {
                assert!(child.estimate() >= node.estimate());
                stack.push(child);
            }
        }
        Ok(())
    }
}
