use super::{Error, Result, SchedulingContext};
use serde::{Deserialize, Serialize};

/// A task placed on a processor at a start time.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Serialize, PartialEq)]
pub struct ScheduledTask {
    pub task: usize,
    pub processor: usize,
    pub start: u64,
    pub finish: u64,
}

impl ScheduledTask {
    /// Creates a scheduled task finishing `weight` time units after `start`.
    #[must_use]
    pub const fn new(task: usize, processor: usize, start: u64, weight: u64) -> Self {
        Self {
            task,
            processor,
            start,
            finish: start + weight,
        }
    }
}

/// A complete schedule: one entry per task, indexed by task.
#[derive(Clone, Debug, Default, Deserialize, Eq, Serialize, PartialEq)]
pub struct Schedule {
    tasks: Vec<ScheduledTask>,
    finish_time: u64,
}

impl Schedule {
    /// Creates a schedule from scheduled tasks given in any order.
    #[must_use]
    pub fn new(mut tasks: Vec<ScheduledTask>) -> Self {
        tasks.sort_unstable_by_key(|scheduled| scheduled.task);
        let finish_time = tasks.iter().map(|scheduled| scheduled.finish).max();

        Self {
            tasks,
            finish_time: finish_time.unwrap_or_default(),
        }
    }

    /// Returns the makespan, the finish time of the last task.
    #[must_use]
    pub const fn finish_time(&self) -> u64 {
        self.finish_time
    }

    /// Returns the placement of a task.
    #[must_use]
    pub fn get(&self, task: usize) -> Option<&ScheduledTask> {
        self.tasks.get(task).filter(|scheduled| scheduled.task == task)
    }

    /// Returns all scheduled tasks ordered by task index.
    #[must_use]
    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    /// Iterates over scheduled tasks ordered by task index.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, ScheduledTask> {
        self.tasks.iter()
    }

    /// Returns the number of scheduled tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns whether no task is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Checks the schedule against the context.
    /// Every task must be scheduled exactly once on an existing processor, start after all
    /// predecessors finished (plus communication when on another processor) and not overlap
    /// other tasks of the same processor.
    ///
    /// # Errors
    /// - Describing the first violated constraint.
    pub fn verify(&self, context: &SchedulingContext) -> Result<()> {
        let graph = context.graph();
        let invalid = |message: String| Err(Error::InvalidSchedule(message));

        if self.tasks.len() != graph.len() {
            return invalid(format!("{} of {} tasks scheduled", self.len(), graph.len()));
        }

        let mut processors = vec![Vec::new(); context.processors()];

        for (index, scheduled) in self.tasks.iter().enumerate() {
            let node = graph.node(index);

            if scheduled.task != index {
                return invalid(format!("task `{}` scheduled more than once", node.id()));
            }
            if scheduled.processor >= context.processors() {
                return invalid(format!("task `{}` on missing processor", node.id()));
            }
            if scheduled.finish != scheduled.start + node.weight() {
                return invalid(format!("task `{}` has wrong finish time", node.id()));
            }

            for &(pred, weight) in node.incoming() {
                let before = &self.tasks[pred];
                let delay = if before.processor == scheduled.processor { 0 } else { weight };
                if scheduled.start < before.finish + delay {
                    return invalid(format!("task `{}` starts too early", node.id()));
                }
            }

            processors[scheduled.processor].push((scheduled.start, scheduled.finish));
        }

        for slots in &mut processors {
            slots.sort_unstable();
            if slots.windows(2).any(|pair| pair[0].1 > pair[1].0) {
                return invalid("tasks overlap on a processor".into());
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a ScheduledTask;
    type IntoIter = std::slice::Iter<'a, ScheduledTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::GraphBuilder;

    fn chain() -> anyhow::Result<SchedulingContext> {
        let mut builder = GraphBuilder::new();
        builder.add_node("a", 2)?;
        builder.add_node("b", 3)?;
        builder.add_edge("a", "b", 1)?;
        Ok(SchedulingContext::new(builder.build()?, 2)?)
    }

    #[test]
    fn finish_time_is_makespan() {
        let schedule = Schedule::new(vec![
            ScheduledTask::new(1, 1, 3, 3),
            ScheduledTask::new(0, 0, 0, 2),
        ]);

        assert_eq!(schedule.finish_time(), 6);
        assert_eq!(schedule.get(0).map(|s| s.finish), Some(2));
        assert_eq!(schedule.tasks()[1].task, 1);
        assert_eq!(Schedule::default().finish_time(), 0);

        let tasks: Vec<_> = schedule.iter().map(|s| s.task).collect();
        assert_eq!(tasks, [0, 1]);
        assert_eq!((&schedule).into_iter().count(), 2);
    }

    #[test]
    fn verify_accepts_valid_schedule() -> anyhow::Result<()> {
        let context = chain()?;
        let schedule = Schedule::new(vec![
            ScheduledTask::new(0, 0, 0, 2),
            ScheduledTask::new(1, 1, 3, 3),
        ]);

        schedule.verify(&context)?;
        Ok(())
    }

    #[test]
    fn verify_rejects_missing_communication() -> anyhow::Result<()> {
        let context = chain()?;
        let schedule = Schedule::new(vec![
            ScheduledTask::new(0, 0, 0, 2),
            ScheduledTask::new(1, 1, 2, 3),
        ]);

        assert!(schedule.verify(&context).is_err());
        Ok(())
    }

    #[test]
    fn verify_rejects_overlap_and_duplicates() -> anyhow::Result<()> {
        let context = chain()?;
        let overlap = Schedule::new(vec![
            ScheduledTask::new(0, 0, 0, 2),
            ScheduledTask::new(1, 0, 1, 3),
        ]);
        let duplicate = Schedule::new(vec![
            ScheduledTask::new(0, 0, 0, 2),
            ScheduledTask::new(0, 1, 0, 2),
        ]);

        assert!(overlap.verify(&context).is_err());
        assert!(duplicate.verify(&context).is_err());
        Ok(())
    }
}
