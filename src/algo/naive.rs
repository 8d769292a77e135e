use super::exhaustive;
use crate::core::{
    PartialSolution, Result, Schedule, ScheduledTask, Scheduler, SchedulingContext,
};

/// A partial list schedule: tasks appended one at a time to the end of any processor.
/// Unrelated to allocations and orderings, so it can cross-check them.
#[derive(Clone, Debug)]
pub struct ListNode<'a> {
    context: &'a SchedulingContext,
    scheduled: Vec<Option<ScheduledTask>>,
    free: Vec<u64>,
    depth: usize,
}

impl<'a> ListNode<'a> {
    /// Creates the root with no task scheduled.
    #[must_use]
    pub fn empty(context: &'a SchedulingContext) -> Self {
        Self {
            context,
            scheduled: vec![None; context.task_count()],
            free: vec![0; context.processors()],
            depth: 0,
        }
    }

    /// Returns the earliest start of the task on the processor, `None` if a predecessor
    /// is not scheduled yet.
    fn earliest_start(&self, task: usize, processor: usize) -> Option<u64> {
        let node = self.context.graph().node(task);
        node.incoming()
            .iter()
            .try_fold(self.free[processor], |start, &(pred, communication)| {
                let before = self.scheduled[pred]?;
                let delay = if before.processor == processor {
                    0
                } else {
                    communication
                };
                Some(start.max(before.finish + delay))
            })
    }
}

impl PartialSolution for ListNode<'_> {
    fn estimate(&self) -> u64 {
        self.free.iter().copied().max().unwrap_or_default()
    }

    fn is_complete(&self) -> bool {
        self.depth == self.context.task_count()
    }

    fn expand(&self) -> Vec<Self> {
        let graph = self.context.graph();
        let mut output = Vec::new();

        for task in 0..graph.len() {
            if self.scheduled[task].is_some() {
                continue;
            }

            for processor in 0..self.context.processors() {
                let Some(start) = self.earliest_start(task, processor) else {
                    break;
                };

                let mut child = self.clone();
                let placed = ScheduledTask::new(task, processor, start, graph.node(task).weight());
                child.free[processor] = placed.finish;
                child.scheduled[task] = Some(placed);
                child.depth += 1;
                output.push(child);
            }
        }

        output
    }

    fn make_complete(&self) -> Option<Schedule> {
        let tasks: Option<Vec<_>> = self.scheduled.iter().copied().collect();
        tasks.map(Schedule::new)
    }
}

/// Exhaustive search over every list schedule without any pruning.
/// Only usable on tiny graphs, it serves as a reference for the branch and bound schedulers.
#[derive(Clone, Debug, Default)]
pub struct Naive;

impl Scheduler for Naive {
    fn schedule(&mut self, context: &SchedulingContext) -> Result<Schedule> {
        let schedule = exhaustive(ListNode::empty(context))?;
        schedule.verify(context)?;
        Ok(schedule)
    }

    fn maximum_tasks(&self) -> usize {
        8
    }

    fn name(&self) -> &'static str {
        "Naive"
    }
}

#[allow(unsafe_code)]
#[linkme::distributed_slice(super::SCHEDULERS)]
static INSTANCE: fn() -> Box<dyn Scheduler> = || Box::new(Naive);

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::GraphBuilder;
    use crate::data::samples;

    #[test]
    fn test_naive() {
        assert!(samples(true, &mut Naive).is_ok());
    }

    #[test]
    fn expand_only_ready_tasks() -> anyhow::Result<()> {
        let mut builder = GraphBuilder::new();
        builder.add_node("a", 1)?;
        builder.add_node("b", 1)?;
        builder.add_node("c", 1)?;
        builder.add_edge("a", "b", 3)?;
        let context = SchedulingContext::new(builder.build()?, 2)?;

        let root = ListNode::empty(&context);
        // a and c on either processor.
        assert_eq!(root.expand().len(), 4);

        let after_a = root.expand().swap_remove(0);
        let starts: Vec<_> = after_a
            .expand()
            .iter()
            .filter_map(|child| child.scheduled[1])
            .map(|scheduled| scheduled.start)
            .collect();
        assert_eq!(starts, [1, 4]);
        Ok(())
    }
}
