use super::Allocation;
use crate::core::{PartialSolution, Schedule, ScheduledTask, SchedulingContext};
use std::sync::Arc;

/// A task placed by the ordering search. Links back to the previous placement.
#[derive(Debug)]
struct Placement {
    task: usize,
    processor: usize,
    parent: Option<Arc<Self>>,
}

/// A partial ordering of the tasks of a fixed allocation.
///
/// Processors are sequenced one after another: a processor is left only once all of its tasks
/// are ordered, so every combination of per-processor sequences is generated exactly once.
#[derive(Clone, Debug)]
pub struct OrderingNode<'a> {
    context: &'a SchedulingContext,
    allocation: Arc<Allocation>,
    last: Option<Arc<Placement>>,
    depth: usize,
    processor: usize,
}

impl<'a> OrderingNode<'a> {
    /// Creates the root ordering of the allocation.
    #[must_use]
    pub const fn empty(context: &'a SchedulingContext, allocation: Arc<Allocation>) -> Self {
        Self {
            context,
            allocation,
            last: None,
            depth: 0,
            processor: 0,
        }
    }

    /// Returns the allocation the ordering works under.
    #[must_use]
    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Returns the number of ordered tasks.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the task placed by this node, `None` for the root.
    #[must_use]
    pub fn task(&self) -> Option<usize> {
        self.last.as_ref().map(|placement| placement.task)
    }

    /// Returns the processor the last branch was chosen on.
    #[must_use]
    pub const fn processor(&self) -> usize {
        self.processor
    }

    fn placements(&self) -> impl Iterator<Item = &Placement> {
        std::iter::successors(self.last.as_deref(), |placement| placement.parent.as_deref())
    }

    /// Tasks ordered so far, indexed by task.
    fn ordered(&self) -> Vec<bool> {
        let mut ordered = vec![false; self.context.task_count()];
        for placement in self.placements() {
            ordered[placement.task] = true;
        }
        ordered
    }

    /// Returns whether every dependency allocated to `processor` is already ordered.
    fn satisfies_dependencies(&self, task: usize, processor: usize, ordered: &[bool]) -> bool {
        let dependencies = self.context.graph().node(task).dependencies().iter();
        let actual = dependencies
            .filter(|&&dependency| ordered[dependency])
            .filter(|&&dependency| self.allocation.processor_of(dependency) == processor)
            .count();

        actual == self.allocation.local_dependencies(task)
    }

    fn expand_processor(&self, processor: usize, ordered: &[bool]) -> Vec<Self> {
        let tasks = self.allocation.tasks_for(processor).iter();
        tasks
            .filter(|&&task| !ordered[task])
            .filter(|&&task| self.satisfies_dependencies(task, processor, ordered))
            .map(|&task| Self {
                context: self.context,
                allocation: Arc::clone(&self.allocation),
                last: Some(Arc::new(Placement {
                    task,
                    processor,
                    parent: self.last.clone(),
                })),
                depth: self.depth + 1,
                processor,
            })
            .collect()
    }

    /// Splits the ordering into per-processor sequences in placement order.
    fn sequences(&self) -> Vec<Vec<usize>> {
        let mut placements: Vec<_> = self.placements().collect();
        placements.reverse();

        let mut sequences = vec![Vec::new(); self.context.processors()];
        for placement in placements {
            sequences[placement.processor].push(placement.task);
        }
        sequences
    }
}

impl PartialSolution for OrderingNode<'_> {
    fn estimate(&self) -> u64 {
        if self.is_complete() {
            self.make_complete()
                .map_or(u64::MAX, |schedule| schedule.finish_time())
        } else {
            self.allocation.bound()
        }
    }

    fn is_complete(&self) -> bool {
        self.depth == self.context.task_count()
    }

    fn expand(&self) -> Vec<Self> {
        if self.is_complete() {
            return Vec::new();
        }

        let ordered = self.ordered();
        let mut processor = self.processor;
        let mut output = self.expand_processor(processor, &ordered);

        while output.is_empty() && processor + 1 < self.context.processors() {
            processor += 1;
            output = self.expand_processor(processor, &ordered);
        }

        output
    }

    /// Replays the per-processor sequences. A task starts once its processor is free and
    /// every predecessor finished, plus the edge weight when the predecessor ran elsewhere.
    /// Sequences waiting on each other through cross-processor edges give `None`.
    fn make_complete(&self) -> Option<Schedule> {
        if !self.is_complete() {
            return None;
        }

        let graph = self.context.graph();
        let sequences = self.sequences();

        let mut scheduled: Vec<Option<ScheduledTask>> = vec![None; graph.len()];
        let mut free = vec![0; sequences.len()];
        let mut next = vec![0; sequences.len()];
        let mut remaining = graph.len();

        while remaining > 0 {
            let mut progress = false;

            for (processor, sequence) in sequences.iter().enumerate() {
                while let Some(&task) = sequence.get(next[processor]) {
                    let node = graph.node(task);
                    let mut start = free[processor];

                    let mut ready = true;
                    for &(pred, communication) in node.incoming() {
                        let Some(before) = scheduled[pred] else {
                            ready = false;
                            break;
                        };
                        let delay = if before.processor == processor {
                            0
                        } else {
                            communication
                        };
                        start = start.max(before.finish + delay);
                    }

                    if !ready {
                        break;
                    }

                    let placed = ScheduledTask::new(task, processor, start, node.weight());
                    free[processor] = placed.finish;
                    scheduled[task] = Some(placed);
                    next[processor] += 1;
                    remaining -= 1;
                    progress = true;
                }
            }

            if !progress {
                return None;
            }
        }

        let tasks: Option<Vec<_>> = scheduled.into_iter().collect();
        tasks.map(Schedule::new)
    }
}
